use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{DecodeExt, Encode, EncodeSize, Error, Read, ReadExt, Write};
use msgfee_types::{
    codec::{read_string, string_encode_size, write_string},
    genesis_header, AnyMsg, Coin, Event, Fee, Msg, MsgFeesParams, Transaction, Tx, TypedMsg,
};
use std::{cell::RefCell, rc::Rc, sync::Arc};

use crate::{
    fees::{MemoryMsgFees, TxDecoder},
    gas::{BasicGasMeter, FeeGasMeter},
    registry::InterfaceRegistry,
    router::ServiceDesc,
    Context, SharedGasMeter,
};

pub const TEST_CHAIN_ID: &str = "msgfee-test";
const MAX_ADDRESS_LENGTH: usize = 64;

/// Transfer between two accounts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgSend {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl MsgSend {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

impl TypedMsg for MsgSend {
    const TYPE_URL: &'static str = "/bank.v1.MsgSend";
}

impl Write for MsgSend {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.from, writer);
        write_string(&self.to, writer);
        self.amount.write(writer);
    }
}

impl Read for MsgSend {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            from: read_string(reader, MAX_ADDRESS_LENGTH)?,
            to: read_string(reader, MAX_ADDRESS_LENGTH)?,
            amount: u64::read(reader)?,
        })
    }
}

impl EncodeSize for MsgSend {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.from) + string_encode_size(&self.to) + self.amount.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsgSendResponse;

impl TypedMsg for MsgSendResponse {
    const TYPE_URL: &'static str = "/bank.v1.MsgSendResponse";
}

impl Write for MsgSendResponse {
    fn write(&self, _: &mut impl BufMut) {}
}

impl Read for MsgSendResponse {
    type Cfg = ();

    fn read_cfg(_: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self)
    }
}

impl EncodeSize for MsgSendResponse {
    fn encode_size(&self) -> usize {
        0
    }
}

/// Destroys `amount` of the owner's balance. Burning nothing is rejected by the handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgBurn {
    pub owner: String,
    pub amount: u64,
}

impl MsgBurn {
    pub fn new(owner: impl Into<String>, amount: u64) -> Self {
        Self {
            owner: owner.into(),
            amount,
        }
    }
}

impl TypedMsg for MsgBurn {
    const TYPE_URL: &'static str = "/bank.v1.MsgBurn";
}

impl Write for MsgBurn {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.owner, writer);
        self.amount.write(writer);
    }
}

impl Read for MsgBurn {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            owner: read_string(reader, MAX_ADDRESS_LENGTH)?,
            amount: u64::read(reader)?,
        })
    }
}

impl EncodeSize for MsgBurn {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.owner) + self.amount.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsgBurnResponse {
    pub burned: u64,
}

impl TypedMsg for MsgBurnResponse {
    const TYPE_URL: &'static str = "/bank.v1.MsgBurnResponse";
}

impl Write for MsgBurnResponse {
    fn write(&self, writer: &mut impl BufMut) {
        self.burned.write(writer);
    }
}

impl Read for MsgBurnResponse {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            burned: u64::read(reader)?,
        })
    }
}

impl EncodeSize for MsgBurnResponse {
    fn encode_size(&self) -> usize {
        self.burned.encode_size()
    }
}

/// Creates a registry that knows [MsgSend] and [MsgBurn]
pub fn test_registry() -> InterfaceRegistry {
    let mut registry = InterfaceRegistry::new();
    registry
        .register_msg::<MsgSend>()
        .expect("MsgSend registers");
    registry
        .register_msg::<MsgBurn>()
        .expect("MsgBurn registers");
    registry
}

/// Bank service: `Send` emits a `transfer` event, `Burn` emits a `burn` event and fails for zero
/// amounts.
pub fn bank_service() -> ServiceDesc {
    ServiceDesc::new("bank.v1.Msg")
        .method::<MsgSend, MsgSendResponse, _>("Send", |ctx, msg| {
            ctx.emit_event(
                Event::new("transfer")
                    .with_attribute("sender", &msg.from)
                    .with_attribute("recipient", &msg.to)
                    .with_attribute("amount", msg.amount),
            );
            Ok(MsgSendResponse)
        })
        .method::<MsgBurn, MsgBurnResponse, _>("Burn", |ctx, msg| {
            ctx.emit_event(Event::new("burn_attempt").with_attribute("owner", &msg.owner));
            if msg.amount == 0 {
                anyhow::bail!("cannot burn zero");
            }
            ctx.emit_event(
                Event::new("burn")
                    .with_attribute("owner", &msg.owner)
                    .with_attribute("amount", msg.amount),
            );
            Ok(MsgBurnResponse {
                burned: msg.amount,
            })
        })
}

/// Creates a keeper with a floor price of 1stake per gas and 10stake per usd unit
pub fn stake_keeper() -> MemoryMsgFees {
    MemoryMsgFees::new(MsgFeesParams {
        floor_gas_price: Coin::new("stake", 1).expect("valid coin"),
        default_fee_denom: "stake".to_string(),
        usd_conversion_rate: 10,
    })
}

/// Encodes a fee-bearing transaction carrying `msgs`
pub fn fee_tx_bytes(fee: &str, gas_limit: u64, msgs: &[&dyn Msg]) -> Bytes {
    Transaction::new(
        msgs.iter().map(|msg| msg.to_any()).collect(),
        Fee {
            amount: fee.parse().expect("valid fee coins"),
            gas_limit,
        },
    )
    .encode()
    .freeze()
}

/// Creates a context backed by a [FeeGasMeter]
pub fn test_context(gas_limit: u64, simulate: bool, tx_bytes: Bytes) -> Context {
    let meter: SharedGasMeter = Rc::new(RefCell::new(FeeGasMeter::with_limit(gas_limit, simulate)));
    Context::new(genesis_header(), TEST_CHAIN_ID, meter).with_tx_bytes(tx_bytes)
}

/// Creates a context backed by a plain [BasicGasMeter]
pub fn plain_context(gas_limit: u64, tx_bytes: Bytes) -> Context {
    let meter: SharedGasMeter = Rc::new(RefCell::new(BasicGasMeter::new(gas_limit)));
    Context::new(genesis_header(), TEST_CHAIN_ID, meter).with_tx_bytes(tx_bytes)
}

/// Runs `f` against the context's [FeeGasMeter]
pub fn with_fee_meter<T>(ctx: &Context, f: impl FnOnce(&FeeGasMeter) -> T) -> T {
    let meter = ctx.gas_meter().borrow();
    f(meter
        .as_any()
        .downcast_ref::<FeeGasMeter>()
        .expect("context has a fee gas meter"))
}

/// Transaction that carries messages but no fee.
#[derive(Debug)]
pub struct UnsignedTx {
    msgs: Vec<AnyMsg>,
}

impl Tx for UnsignedTx {
    fn msgs(&self) -> &[AnyMsg] {
        &self.msgs
    }
}

/// Decoder that reads a [Transaction] but drops its fee
pub fn unsigned_tx_decoder() -> TxDecoder {
    Arc::new(|bytes: &[u8]| -> Result<Box<dyn Tx>, Error> {
        let tx = Transaction::decode(bytes)?;
        Ok(Box::new(UnsignedTx { msgs: tx.msgs }))
    })
}
