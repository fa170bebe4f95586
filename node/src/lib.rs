use msgfee_execution::{
    InterfaceRegistry, MemoryMsgFees, MsgServiceRouter, MsgServiceRouterBuilder,
    RegistrationError, ServiceDesc, TracingInterceptor,
};
use msgfee_types::{coin::validate_denom, decode_tx, Coin, CoinError, MsgFee, MsgFeesParams};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;
use tracing::{info, Level};

pub mod sync;

/// Additional message fee schedule.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeesConfig {
    #[serde(default = "default_fee_denom")]
    pub default_fee_denom: String,
    #[serde(default = "default_floor_gas_price")]
    pub floor_gas_price: String,
    #[serde(default = "default_usd_conversion_rate")]
    pub usd_conversion_rate: u64,
    #[serde(default)]
    pub msg_fees: Vec<MsgFeeConfig>,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            default_fee_denom: default_fee_denom(),
            floor_gas_price: default_floor_gas_price(),
            usd_conversion_rate: default_usd_conversion_rate(),
            msg_fees: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MsgFeeConfig {
    pub msg_type_url: String,
    pub additional_fee: String,
}

/// Configuration for the node.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub chain_id: String,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    pub port: u16,
    pub worker_threads: usize,
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default)]
    pub fees: FeesConfig,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_fee_denom() -> String {
    MsgFeesParams::DEFAULT_FEE_DENOM.to_string()
}

fn default_floor_gas_price() -> String {
    format!(
        "{}{}",
        MsgFeesParams::DEFAULT_FLOOR_GAS_PRICE,
        MsgFeesParams::DEFAULT_FEE_DENOM
    )
}

fn default_usd_conversion_rate() -> u64 {
    MsgFeesParams::DEFAULT_USD_CONVERSION_RATE
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("port must be > 0")]
    InvalidPort,
    #[error("invalid listen address: {value}")]
    InvalidAddress { value: String },
    #[error("{field} is not a valid coin: {value}")]
    InvalidCoin {
        field: &'static str,
        value: String,
        #[source]
        source: CoinError,
    },
    #[error("invalid default fee denom: {value}")]
    InvalidDenom {
        value: String,
        #[source]
        source: CoinError,
    },
    #[error("floor gas price {floor} must be denominated in {default_denom}")]
    FloorDenomMismatch { floor: Coin, default_denom: String },
    #[error("msg type url {value} must start with '/'")]
    InvalidTypeUrl { value: String },
    #[error("duplicate additional fee for {msg_type_url}")]
    DuplicateMsgFee { msg_type_url: String },
}

pub struct ValidatedConfig {
    pub chain_id: String,
    pub listen: SocketAddr,
    pub worker_threads: usize,
    pub log_level: Level,
    pub json_logs: bool,
    pub fee_params: MsgFeesParams,
    pub msg_fees: Vec<MsgFee>,
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn parse_coin(field: &'static str, value: &str) -> Result<Coin, ConfigError> {
    Coin::from_str(value).map_err(|source| ConfigError::InvalidCoin {
        field,
        value: value.to_string(),
        source,
    })
}

impl FeesConfig {
    pub fn validate(&self) -> Result<(MsgFeesParams, Vec<MsgFee>), ConfigError> {
        validate_denom(&self.default_fee_denom).map_err(|source| ConfigError::InvalidDenom {
            value: self.default_fee_denom.clone(),
            source,
        })?;
        ensure_nonzero("fees.usd_conversion_rate", self.usd_conversion_rate)?;
        let floor_gas_price = parse_coin("fees.floor_gas_price", &self.floor_gas_price)?;
        if floor_gas_price.denom != self.default_fee_denom {
            return Err(ConfigError::FloorDenomMismatch {
                floor: floor_gas_price,
                default_denom: self.default_fee_denom.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut msg_fees = Vec::with_capacity(self.msg_fees.len());
        for entry in &self.msg_fees {
            if !entry.msg_type_url.starts_with('/') {
                return Err(ConfigError::InvalidTypeUrl {
                    value: entry.msg_type_url.clone(),
                });
            }
            if !seen.insert(entry.msg_type_url.as_str()) {
                return Err(ConfigError::DuplicateMsgFee {
                    msg_type_url: entry.msg_type_url.clone(),
                });
            }
            let additional_fee = parse_coin("fees.msg_fees.additional_fee", &entry.additional_fee)?;
            msg_fees.push(MsgFee::new(entry.msg_type_url.clone(), additional_fee));
        }

        Ok((
            MsgFeesParams {
                floor_gas_price,
                default_fee_denom: self.default_fee_denom.clone(),
                usd_conversion_rate: self.usd_conversion_rate,
            },
            msg_fees,
        ))
    }
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::Empty { field: "chain_id" });
        }
        ensure_nonzero("worker_threads", self.worker_threads as u64)?;
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        let ip = IpAddr::from_str(&self.listen_address).map_err(|_| ConfigError::InvalidAddress {
            value: self.listen_address.clone(),
        })?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        let (fee_params, msg_fees) = self.fees.validate()?;

        Ok(ValidatedConfig {
            chain_id: self.chain_id,
            listen: SocketAddr::new(ip, self.port),
            worker_threads: self.worker_threads,
            log_level,
            json_logs: self.json_logs,
            fee_params,
            msg_fees,
        })
    }
}

impl ValidatedConfig {
    /// Keeper loaded with the configured fee schedule.
    pub fn msg_fees_keeper(&self) -> MemoryMsgFees {
        let mut keeper = MemoryMsgFees::new(self.fee_params.clone());
        for fee in &self.msg_fees {
            keeper.set_msg_fee(fee.clone());
        }
        keeper
    }

    /// Seal a router over `services`, charging fees from the configured schedule.
    pub fn build_router(
        &self,
        registry: InterfaceRegistry,
        services: Vec<ServiceDesc>,
    ) -> Result<MsgServiceRouter, RegistrationError> {
        let mut builder = MsgServiceRouterBuilder::new(
            Arc::new(registry),
            Arc::new(decode_tx),
            Arc::new(self.msg_fees_keeper()),
        )
        .with_interceptor(TracingInterceptor);
        for service in services {
            info!(service = service.service_name(), "registering msg service");
            builder.register_service(service)?;
        }
        Ok(builder.seal())
    }
}

#[cfg(test)]
mod tests;
