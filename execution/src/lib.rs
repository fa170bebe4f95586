//! msgfee execution layer.
//!
//! This crate routes decoded messages to the handlers that modules register for them and gates
//! every dispatch on an additional per-message fee.
//!
//! ## Lifecycle
//! - At startup every message type is declared on an [InterfaceRegistry], services are
//!   registered on a [MsgServiceRouterBuilder], and the builder is sealed into a
//!   [MsgServiceRouter].
//! - Per transaction the caller builds a [Context] holding a [FeeGasMeter] and the raw
//!   transaction bytes, then calls [MsgServiceRouter::dispatch] (or [run_msgs]) for each message.
//!
//! ## Fee invariants
//! - A message whose fee cannot be covered consumes nothing and its handler never runs.
//! - In simulate mode fees are recorded but never enforced.
//! - A handler's events are kept only if it succeeds.
//!
//! ## Example
//! ```rust,ignore
//! # #[cfg(feature = "mocks")]
//! # {
//! use msgfee_execution::mocks::{bank_service, stake_keeper, test_context, test_registry};
//! use msgfee_execution::MsgServiceRouterBuilder;
//! use std::sync::Arc;
//!
//! let mut builder = MsgServiceRouterBuilder::new(
//!     Arc::new(test_registry()),
//!     Arc::new(msgfee_types::decode_tx),
//!     Arc::new(stake_keeper()),
//! );
//! builder.register_service(bank_service())?;
//! let router = builder.seal();
//! # }
//! ```

mod context;
mod error;
pub mod fees;
pub mod gas;
mod pipeline;
pub mod registry;
pub mod router;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use context::{Context, EventManager, SharedGasMeter};
pub use error::{codes, DispatchError, ErrorKind, FatalError, RegistrationError};
pub use fees::{
    convert_to_fee_denom, ensure_sufficient_fees, FeeError, FeeGate, MemoryMsgFees,
    MsgFeesKeeper, TxDecoder,
};
pub use gas::{BasicGasMeter, FeeGasMeter, FeeSnapshot, Gas, GasError, GasMeter, InfiniteGasMeter};
pub use pipeline::{
    run_msgs, run_tx, MsgFailure, TxResult, ATTRIBUTE_ACTION, ATTRIBUTE_MSG_INDEX, MESSAGE_EVENT,
};
pub use registry::{InterfaceRegistry, MsgDescriptor, RegistryError};
pub use router::{
    Interceptor, MethodDesc, MethodInfo, MsgServiceRouter, MsgServiceRouterBuilder, Next,
    RouteHandler, ServiceDesc, TracingInterceptor,
};
