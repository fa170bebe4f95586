use msgfee_types::{Coin, Tx};
use std::sync::Arc;
use tracing::debug;

use super::{convert_to_fee_denom, ensure_sufficient_fees, FeeError, MsgFeesKeeper};
use crate::{
    error::{DispatchError, FatalError},
    gas::{FeeGasMeter, GasMeter},
    Context,
};

/// Decoder for the raw transaction bytes carried by a [Context].
pub type TxDecoder =
    Arc<dyn Fn(&[u8]) -> Result<Box<dyn Tx>, commonware_codec::Error> + Send + Sync>;

/// Charges additional message fees against the transaction's [FeeGasMeter].
#[derive(Clone)]
pub struct FeeGate {
    keeper: Arc<dyn MsgFeesKeeper>,
    decoder: TxDecoder,
}

impl FeeGate {
    pub fn new(keeper: Arc<dyn MsgFeesKeeper>, decoder: TxDecoder) -> Self {
        Self { keeper, decoder }
    }

    pub fn keeper(&self) -> &Arc<dyn MsgFeesKeeper> {
        &self.keeper
    }

    pub fn decode(&self, tx_bytes: &[u8]) -> Result<Box<dyn Tx>, FatalError> {
        (self.decoder)(tx_bytes).map_err(FatalError::TxDecode)
    }

    /// Charge the additional fee for one message of `msg_type_url`, returning the amount
    /// charged (in the default fee denom for `usd` quotes).
    ///
    /// Sufficiency is checked before anything is consumed, so a rejected message leaves the
    /// meter untouched. Simulation skips the check but still records the fee.
    pub fn charge(&self, ctx: &Context, msg_type_url: &str) -> Result<Option<Coin>, DispatchError> {
        let (gas_limit, simulate, fee_consumed) = {
            let meter = ctx.gas_meter().borrow();
            let fee_meter = meter
                .as_any()
                .downcast_ref::<FeeGasMeter>()
                .ok_or(FatalError::UnexpectedGasMeter)?;
            (
                fee_meter.limit(),
                fee_meter.is_simulate(),
                fee_meter.fee_consumed().clone(),
            )
        };

        let tx = self.decode(ctx.tx_bytes())?;
        let fee_tx = tx.as_fee_tx().ok_or(FatalError::NotFeeTx)?;

        let quote = self
            .keeper
            .get_msg_fee(ctx, msg_type_url)
            .map_err(|source| DispatchError::FeeLookup {
                type_url: msg_type_url.to_string(),
                source,
            })?;
        let Some(quote) = quote.filter(|fee| fee.additional_fee.is_positive()) else {
            return Ok(None);
        };

        let default_denom = self.keeper.default_fee_denom(ctx);
        let fee = convert_to_fee_denom(
            &quote.additional_fee,
            &default_denom,
            self.keeper.usd_conversion_rate(ctx),
        )?;

        if !simulate {
            let additional = fee_consumed
                .checked_add_coin(&fee)
                .map_err(FeeError::from)?;
            ensure_sufficient_fees(
                gas_limit,
                fee_tx.fee(),
                &additional,
                &self.keeper.floor_gas_price(ctx),
                &default_denom,
            )?;
        }

        let mut meter = ctx.gas_meter().borrow_mut();
        let fee_meter = meter
            .as_any_mut()
            .downcast_mut::<FeeGasMeter>()
            .ok_or(FatalError::UnexpectedGasMeter)?;
        fee_meter
            .consume_fee(&fee, msg_type_url)
            .map_err(FeeError::from)?;
        debug!(
            parent: ctx.logger(),
            type_url = msg_type_url,
            quoted = %quote.additional_fee,
            charged = %fee,
            total = %fee_meter.fee_consumed(),
            simulate,
            "charged additional message fee"
        );
        Ok(Some(fee))
    }
}
