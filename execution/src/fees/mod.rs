//! Additional per-message fees.
//!
//! The [FeeGate] charges the fee quoted by a [MsgFeesKeeper] for a message type against the
//! transaction's [FeeGasMeter](crate::gas::FeeGasMeter) before the message's handler runs.

use msgfee_types::{Coin, CoinError, Coins, USD_DENOM};
use thiserror::Error;

mod gate;
mod keeper;

pub use gate::{FeeGate, TxDecoder};
pub use keeper::{MemoryMsgFees, MsgFeesKeeper};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error(
        "base fee + additional fee cannot be paid with provided fees: {provided:?}, required: \
         {required:?} = {base:?} (base fee) + {additional:?} (additional fees)"
    )]
    InsufficientFee {
        provided: String,
        required: String,
        base: String,
        additional: String,
    },
    #[error("floor gas price {floor} is not denominated in the default fee denom {default_denom}")]
    FloorDenomMismatch { floor: Coin, default_denom: String },
    #[error("base fee overflows for {gas} gas at floor price {floor}")]
    BaseFeeOverflow { gas: u64, floor: Coin },
    #[error("cannot convert {fee} to {default_denom} at {rate} per usd mil")]
    ConversionOverflow {
        fee: Coin,
        default_denom: String,
        rate: u64,
    },
    #[error(transparent)]
    Coins(#[from] CoinError),
}

impl FeeError {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, FeeError::InsufficientFee { .. })
    }
}

/// Check that `fee_coins` covers the base fee for `gas` at `floor_gas_price` plus every
/// additional fee. Nothing is required when there are no additional fees: the base fee of a
/// transaction is enforced elsewhere.
///
/// The floor price must be denominated in `default_base_denom`; the base fee is the exact
/// product `floor.amount * gas`.
pub fn ensure_sufficient_fees(
    gas: u64,
    fee_coins: &Coins,
    additional_fees: &Coins,
    floor_gas_price: &Coin,
    default_base_denom: &str,
) -> Result<(), FeeError> {
    if additional_fees.is_empty() {
        return Ok(());
    }
    if floor_gas_price.denom != default_base_denom {
        return Err(FeeError::FloorDenomMismatch {
            floor: floor_gas_price.clone(),
            default_denom: default_base_denom.to_string(),
        });
    }

    let base_amount = floor_gas_price
        .amount
        .checked_mul(u128::from(gas))
        .ok_or_else(|| FeeError::BaseFeeOverflow {
            gas,
            floor: floor_gas_price.clone(),
        })?;
    let base_fee = Coin {
        denom: default_base_denom.to_string(),
        amount: base_amount,
    };
    let required = additional_fees.checked_add_coin(&base_fee)?;

    if !fee_coins.is_all_gte(&required) {
        return Err(FeeError::InsufficientFee {
            provided: fee_coins.to_string(),
            required: required.to_string(),
            base: base_fee.to_string(),
            additional: additional_fees.to_string(),
        });
    }
    Ok(())
}

/// Convert a fee quoted in `usd` (thousandths of a dollar) into the default fee denom. Fees in
/// any other denom are returned unchanged. The conversion is an exact integer product, so no
/// rounding is involved.
pub fn convert_to_fee_denom(fee: &Coin, default_denom: &str, usd_rate: u64) -> Result<Coin, FeeError> {
    if fee.denom != USD_DENOM {
        return Ok(fee.clone());
    }
    let amount = fee
        .amount
        .checked_mul(u128::from(usd_rate))
        .ok_or_else(|| FeeError::ConversionOverflow {
            fee: fee.clone(),
            default_denom: default_denom.to_string(),
            rate: usd_rate,
        })?;
    Ok(Coin {
        denom: default_denom.to_string(),
        amount,
    })
}
