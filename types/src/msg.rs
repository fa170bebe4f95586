//! Messages and their packed wire form.
//!
//! A message kind is identified by its type URL (for example `/bank.v1.MsgSend`). Concrete
//! message types implement [TypedMsg], which fixes the type URL at compile time; every
//! [TypedMsg] is usable as a type-erased [Msg].

use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{Encode, EncodeSize, Error, Read, Write};
use std::{any::Any, fmt::Debug};

use crate::codec::{read_bytes, read_string, string_encode_size, write_bytes, write_string};

pub const MAX_TYPE_URL_LENGTH: usize = 256;
pub const MAX_MSG_VALUE_LENGTH: usize = 64 * 1024;

/// A message type with a statically known type URL and a canonical encoding.
pub trait TypedMsg: Read<Cfg = ()> + Write + EncodeSize + Debug + Send + Sync + 'static {
    const TYPE_URL: &'static str;
}

/// Type-erased view of a message.
pub trait Msg: Debug + Send + Sync + 'static {
    fn type_url(&self) -> &'static str;

    /// Rust type name, for diagnostics.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Pack into the wire envelope.
    fn to_any(&self) -> AnyMsg;
}

impl<T: TypedMsg> Msg for T {
    fn type_url(&self) -> &'static str {
        T::TYPE_URL
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_any(&self) -> AnyMsg {
        AnyMsg {
            type_url: T::TYPE_URL.to_string(),
            value: self.encode().freeze(),
        }
    }
}

/// Packed message: a type URL plus the encoded message body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnyMsg {
    pub type_url: String,
    pub value: Bytes,
}

impl Write for AnyMsg {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.type_url, writer);
        write_bytes(&self.value, writer);
    }
}

impl Read for AnyMsg {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let type_url = read_string(reader, MAX_TYPE_URL_LENGTH)?;
        if type_url.is_empty() {
            return Err(Error::Invalid("AnyMsg", "empty type url"));
        }
        let value = read_bytes(reader, MAX_MSG_VALUE_LENGTH)?;
        Ok(Self { type_url, value })
    }
}

impl EncodeSize for AnyMsg {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.type_url) + 4 + self.value.len()
    }
}
