use msgfee_types::CoinError;
use thiserror::Error;

use crate::{fees::FeeError, registry::RegistryError};

/// ABCI-style codes, kept stable for clients that match on them.
pub mod codes {
    pub const TX_DECODE: u32 = 2;
    pub const UNKNOWN_REQUEST: u32 = 6;
    pub const INSUFFICIENT_FEE: u32 = 13;
    pub const INVALID_TYPE: u32 = 29;
    pub const LOGIC: u32 = 35;
    pub const INVALID_COINS: u32 = 10;
    pub const INTERNAL: u32 = 1;
}

/// A route table misconfiguration detected while registering services. Startup must abort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(
        "type_url {type_url} has not been registered yet (method {method}); register every \
         message type with the interface registry before registering services"
    )]
    UnregisteredType { type_url: String, method: String },
    #[error(
        "msg service {method} has already been registered for {type_url}; each service must \
         only be registered once"
    )]
    DuplicateRoute { type_url: String, method: String },
}

/// A fault that means the router was wired into a pipeline that cannot account fees safely.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("gas meter is not a fee gas meter")]
    UnexpectedGasMeter,
    #[error("failed to decode transaction bytes: {0}")]
    TxDecode(#[source] commonware_codec::Error),
    #[error("only fee-bearing transactions are supported")]
    NotFeeTx,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Fatal,
    InsufficientFee,
    Unroutable,
    InvalidType,
    FeeLookup,
    Handler,
    Unpack,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error("unrecognized message type: {type_url}")]
    Unroutable { type_url: String },
    #[error("expecting {expected}, got {got}")]
    InvalidType { expected: &'static str, got: String },
    #[error("failed to look up message fee for {type_url}: {source}")]
    FeeLookup {
        type_url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{type_url} handler failed: {source}")]
    Handler {
        type_url: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Unpack(#[from] RegistryError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Fatal(_) => ErrorKind::Fatal,
            DispatchError::Fee(err) if err.is_insufficient() => ErrorKind::InsufficientFee,
            DispatchError::Fee(_) => ErrorKind::FeeLookup,
            DispatchError::Unroutable { .. } => ErrorKind::Unroutable,
            DispatchError::InvalidType { .. } => ErrorKind::InvalidType,
            DispatchError::FeeLookup { .. } => ErrorKind::FeeLookup,
            DispatchError::Handler { .. } => ErrorKind::Handler,
            DispatchError::Unpack(_) => ErrorKind::Unpack,
        }
    }

    /// Fatal errors abort the transaction path entirely; everything else fails only the
    /// enclosing transaction.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    pub fn code(&self) -> u32 {
        match self {
            DispatchError::Fatal(FatalError::TxDecode(_)) => codes::TX_DECODE,
            DispatchError::Fatal(_) => codes::INTERNAL,
            DispatchError::Fee(FeeError::InsufficientFee { .. }) => codes::INSUFFICIENT_FEE,
            DispatchError::Fee(FeeError::Coins(CoinError::Overflow(_))) => codes::INVALID_COINS,
            DispatchError::Fee(_) => codes::LOGIC,
            DispatchError::Unroutable { .. } => codes::UNKNOWN_REQUEST,
            DispatchError::InvalidType { .. } => codes::INVALID_TYPE,
            DispatchError::FeeLookup { .. } => codes::LOGIC,
            DispatchError::Handler { .. } => codes::LOGIC,
            DispatchError::Unpack(_) => codes::UNKNOWN_REQUEST,
        }
    }
}
