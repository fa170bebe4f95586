use bytes::{Buf, BufMut};
use commonware_codec::{DecodeExt, EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};

use crate::{
    codec::{read_len, read_string, string_encode_size, write_string},
    AnyMsg, Coins,
};

pub const MAX_TX_MSGS: usize = 64;
pub const MAX_MEMO_LENGTH: usize = 256;

/// A decoded transaction as seen by the router.
pub trait Tx {
    fn msgs(&self) -> &[AnyMsg];

    /// The fee-bearing view of this transaction, if it carries a fee.
    fn as_fee_tx(&self) -> Option<&dyn FeeTx> {
        None
    }
}

/// A transaction that declares a total fee and gas limit.
pub trait FeeTx: Tx {
    fn fee(&self) -> &Coins;
    fn gas(&self) -> u64;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    pub amount: Coins,
    pub gas_limit: u64,
}

impl Write for Fee {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount.write(writer);
        self.gas_limit.write(writer);
    }
}

impl Read for Fee {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            amount: Coins::read(reader)?,
            gas_limit: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Fee {
    fn encode_size(&self) -> usize {
        self.amount.encode_size() + self.gas_limit.encode_size()
    }
}

/// The standard fee-bearing transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub msgs: Vec<AnyMsg>,
    pub fee: Fee,
    pub memo: String,
}

impl Transaction {
    pub fn new(msgs: Vec<AnyMsg>, fee: Fee) -> Self {
        Self {
            msgs,
            fee,
            memo: String::new(),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        for msg in &self.msgs {
            hasher.update(msg.type_url.as_bytes());
            hasher.update(&msg.value);
        }
        hasher.update(&self.fee.gas_limit.to_be_bytes());
        hasher.update(self.fee.amount.to_string().as_bytes());
        hasher.update(self.memo.as_bytes());
        hasher.finalize()
    }
}

impl Tx for Transaction {
    fn msgs(&self) -> &[AnyMsg] {
        &self.msgs
    }

    fn as_fee_tx(&self) -> Option<&dyn FeeTx> {
        Some(self)
    }
}

impl FeeTx for Transaction {
    fn fee(&self) -> &Coins {
        &self.fee.amount
    }

    fn gas(&self) -> u64 {
        self.fee.gas_limit
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        (self.msgs.len() as u32).write(writer);
        for msg in &self.msgs {
            msg.write(writer);
        }
        self.fee.write(writer);
        write_string(&self.memo, writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = read_len(reader, MAX_TX_MSGS, "Transaction")?;
        if len == 0 {
            return Err(Error::Invalid("Transaction", "no messages"));
        }
        let mut msgs = Vec::with_capacity(len);
        for _ in 0..len {
            msgs.push(AnyMsg::read(reader)?);
        }
        let fee = Fee::read(reader)?;
        let memo = read_string(reader, MAX_MEMO_LENGTH)?;
        Ok(Self { msgs, fee, memo })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        4 + self.msgs.iter().map(EncodeSize::encode_size).sum::<usize>()
            + self.fee.encode_size()
            + string_encode_size(&self.memo)
    }
}

/// Default transaction decoder: the full input must be one canonical [Transaction].
pub fn decode_tx(bytes: &[u8]) -> Result<Box<dyn Tx>, Error> {
    let tx = Transaction::decode(bytes)?;
    Ok(Box::new(tx))
}
