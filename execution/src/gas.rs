//! Gas meters.
//!
//! A meter is owned by a single transaction's [Context](crate::Context). The router only accepts
//! a [FeeGasMeter], which layers additional-fee accounting on top of a plain gas meter.

use msgfee_types::{Coin, CoinError, Coins};
use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Debug},
};
use thiserror::Error;

pub type Gas = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GasError {
    #[error("out of gas in location: {descriptor}; gas wanted: {limit}, gas used: {used}")]
    OutOfGas {
        descriptor: String,
        limit: Gas,
        used: Gas,
    },
    #[error("gas overflow in location: {descriptor}")]
    Overflow { descriptor: String },
}

pub trait GasMeter: Debug + 'static {
    fn gas_consumed(&self) -> Gas;

    fn limit(&self) -> Gas;

    /// Consume `amount` gas. Consumption is recorded even when it pushes the meter past its
    /// limit, so callers can report how far over the limit execution went.
    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), GasError>;

    fn is_out_of_gas(&self) -> bool {
        self.gas_consumed() >= self.limit()
    }

    fn gas_remaining(&self) -> Gas {
        self.limit().saturating_sub(self.gas_consumed())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone)]
pub struct BasicGasMeter {
    limit: Gas,
    consumed: Gas,
}

impl BasicGasMeter {
    pub fn new(limit: Gas) -> Self {
        Self { limit, consumed: 0 }
    }
}

impl GasMeter for BasicGasMeter {
    fn gas_consumed(&self) -> Gas {
        self.consumed
    }

    fn limit(&self) -> Gas {
        self.limit
    }

    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), GasError> {
        self.consumed = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| GasError::Overflow {
                descriptor: descriptor.to_string(),
            })?;
        if self.consumed > self.limit {
            return Err(GasError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit: self.limit,
                used: self.consumed,
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Meter without a limit, used for genesis and queries.
#[derive(Debug, Clone, Default)]
pub struct InfiniteGasMeter {
    consumed: Gas,
}

impl InfiniteGasMeter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GasMeter for InfiniteGasMeter {
    fn gas_consumed(&self) -> Gas {
        self.consumed
    }

    fn limit(&self) -> Gas {
        Gas::MAX
    }

    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), GasError> {
        self.consumed = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| GasError::Overflow {
                descriptor: descriptor.to_string(),
            })?;
        Ok(())
    }

    fn is_out_of_gas(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Additional-fee state of a [FeeGasMeter], captured so a failed transaction can be undone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeSnapshot {
    fee_consumed: Coins,
    used_fees: BTreeMap<String, Coins>,
    call_counts: BTreeMap<String, u64>,
}

/// Gas meter that also tracks additional message fees consumed by the transaction.
///
/// In simulate mode gas overruns do not fail and fee sufficiency is not enforced by the router,
/// but consumption is still recorded so the caller can estimate the full cost.
pub struct FeeGasMeter {
    base: Box<dyn GasMeter>,
    simulate: bool,
    fees: FeeSnapshot,
}

impl FeeGasMeter {
    pub fn new(base: Box<dyn GasMeter>, simulate: bool) -> Self {
        Self {
            base,
            simulate,
            fees: FeeSnapshot::default(),
        }
    }

    pub fn with_limit(limit: Gas, simulate: bool) -> Self {
        Self::new(Box::new(BasicGasMeter::new(limit)), simulate)
    }

    pub fn is_simulate(&self) -> bool {
        self.simulate
    }

    /// Add `fee` to the running total, attributed to `msg_type_url`. Nothing changes on error.
    pub fn consume_fee(&mut self, fee: &Coin, msg_type_url: &str) -> Result<(), CoinError> {
        let fee_consumed = self.fees.fee_consumed.checked_add_coin(fee)?;
        let used = self
            .fees
            .used_fees
            .get(msg_type_url)
            .cloned()
            .unwrap_or_default()
            .checked_add_coin(fee)?;

        self.fees.fee_consumed = fee_consumed;
        self.fees.used_fees.insert(msg_type_url.to_string(), used);
        *self
            .fees
            .call_counts
            .entry(msg_type_url.to_string())
            .or_default() += 1;
        Ok(())
    }

    pub fn fee_consumed(&self) -> &Coins {
        &self.fees.fee_consumed
    }

    /// Additional fees consumed by messages of `msg_type_url`.
    pub fn fee_consumed_by_msg(&self, msg_type_url: &str) -> Coins {
        self.fees
            .used_fees
            .get(msg_type_url)
            .cloned()
            .unwrap_or_default()
    }

    pub fn used_fees(&self) -> &BTreeMap<String, Coins> {
        &self.fees.used_fees
    }

    /// Number of charged messages of `msg_type_url`.
    pub fn call_count(&self, msg_type_url: &str) -> u64 {
        self.fees
            .call_counts
            .get(msg_type_url)
            .copied()
            .unwrap_or(0)
    }

    pub fn fee_snapshot(&self) -> FeeSnapshot {
        self.fees.clone()
    }

    pub fn restore_fees(&mut self, snapshot: FeeSnapshot) {
        self.fees = snapshot;
    }
}

impl Debug for FeeGasMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeeGasMeter")
            .field("limit", &self.base.limit())
            .field("consumed", &self.base.gas_consumed())
            .field("simulate", &self.simulate)
            .field("fee_consumed", &self.fees.fee_consumed.to_string())
            .finish()
    }
}

impl GasMeter for FeeGasMeter {
    fn gas_consumed(&self) -> Gas {
        self.base.gas_consumed()
    }

    fn limit(&self) -> Gas {
        self.base.limit()
    }

    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), GasError> {
        match self.base.consume_gas(amount, descriptor) {
            Err(GasError::OutOfGas { .. }) if self.simulate => Ok(()),
            result => result,
        }
    }

    fn is_out_of_gas(&self) -> bool {
        self.base.is_out_of_gas()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
