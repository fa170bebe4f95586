use serde::{Deserialize, Serialize};

use crate::Coin;

/// Denom that additional fees may be quoted in and converted from.
pub const USD_DENOM: &str = "usd";

/// An additional fee charged for every message of a given type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgFee {
    pub msg_type_url: String,
    pub additional_fee: Coin,
}

impl MsgFee {
    pub fn new(msg_type_url: impl Into<String>, additional_fee: Coin) -> Self {
        Self {
            msg_type_url: msg_type_url.into(),
            additional_fee,
        }
    }
}

/// Chain-wide parameters for additional message fees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgFeesParams {
    /// Minimum price of one unit of gas, in the default fee denom.
    pub floor_gas_price: Coin,
    pub default_fee_denom: String,
    /// Default fee denom units per one thousandth of a US dollar.
    pub usd_conversion_rate: u64,
}

impl MsgFeesParams {
    pub const DEFAULT_FEE_DENOM: &'static str = "nhash";
    pub const DEFAULT_FLOOR_GAS_PRICE: u128 = 1_905;
    pub const DEFAULT_USD_CONVERSION_RATE: u64 = 25_000_000;
}

impl Default for MsgFeesParams {
    fn default() -> Self {
        Self {
            floor_gas_price: Coin {
                denom: Self::DEFAULT_FEE_DENOM.to_string(),
                amount: Self::DEFAULT_FLOOR_GAS_PRICE,
            },
            default_fee_denom: Self::DEFAULT_FEE_DENOM.to_string(),
            usd_conversion_rate: Self::DEFAULT_USD_CONVERSION_RATE,
        }
    }
}
