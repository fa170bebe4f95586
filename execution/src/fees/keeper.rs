use msgfee_types::{Coin, MsgFee, MsgFeesParams};
use std::collections::BTreeMap;

use crate::Context;

/// Source of additional-fee policy.
pub trait MsgFeesKeeper: Send + Sync {
    /// Fee quote for `msg_type_url`, or `None` if the type carries no additional fee.
    fn get_msg_fee(&self, ctx: &Context, msg_type_url: &str) -> anyhow::Result<Option<MsgFee>>;

    fn floor_gas_price(&self, ctx: &Context) -> Coin;

    fn default_fee_denom(&self, ctx: &Context) -> String;

    /// Amount of the default fee denom worth one `usd` unit (a thousandth of a dollar).
    fn usd_conversion_rate(&self, ctx: &Context) -> u64;
}

/// Keeper backed by a fixed table, loaded from node configuration.
#[derive(Clone, Debug)]
pub struct MemoryMsgFees {
    params: MsgFeesParams,
    fees: BTreeMap<String, MsgFee>,
}

impl MemoryMsgFees {
    pub fn new(params: MsgFeesParams) -> Self {
        Self {
            params,
            fees: BTreeMap::new(),
        }
    }

    /// Set (or replace) the fee for `fee.msg_type_url`, returning the previous entry.
    pub fn set_msg_fee(&mut self, fee: MsgFee) -> Option<MsgFee> {
        self.fees.insert(fee.msg_type_url.clone(), fee)
    }

    pub fn remove_msg_fee(&mut self, msg_type_url: &str) -> Option<MsgFee> {
        self.fees.remove(msg_type_url)
    }

    pub fn params(&self) -> &MsgFeesParams {
        &self.params
    }

    pub fn msg_fees(&self) -> impl Iterator<Item = &MsgFee> {
        self.fees.values()
    }
}

impl Default for MemoryMsgFees {
    fn default() -> Self {
        Self::new(MsgFeesParams::default())
    }
}

impl MsgFeesKeeper for MemoryMsgFees {
    fn get_msg_fee(&self, _: &Context, msg_type_url: &str) -> anyhow::Result<Option<MsgFee>> {
        Ok(self.fees.get(msg_type_url).cloned())
    }

    fn floor_gas_price(&self, _: &Context) -> Coin {
        self.params.floor_gas_price.clone()
    }

    fn default_fee_denom(&self, _: &Context) -> String {
        self.params.default_fee_denom.clone()
    }

    fn usd_conversion_rate(&self, _: &Context) -> u64 {
        self.params.usd_conversion_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::test_context;

    #[test]
    fn lookups_follow_the_table() {
        let mut keeper = MemoryMsgFees::default();
        let ctx = test_context(1_000, false, bytes::Bytes::new());

        assert!(keeper.get_msg_fee(&ctx, "/mod.MsgA").unwrap().is_none());
        let fee = MsgFee::new("/mod.MsgA", Coin::new("nhash", 10).unwrap());
        assert!(keeper.set_msg_fee(fee.clone()).is_none());
        assert_eq!(keeper.get_msg_fee(&ctx, "/mod.MsgA").unwrap(), Some(fee.clone()));
        assert_eq!(keeper.remove_msg_fee("/mod.MsgA"), Some(fee));
        assert_eq!(keeper.msg_fees().count(), 0);

        assert_eq!(keeper.default_fee_denom(&ctx), keeper.params().default_fee_denom);
        assert_eq!(keeper.floor_gas_price(&ctx).denom, keeper.default_fee_denom(&ctx));
    }
}
