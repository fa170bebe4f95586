//! Registry of known message types.
//!
//! Every message type a module can handle must be declared here before its service is
//! registered with the router. The registry also knows how to unpack an [AnyMsg] into the
//! concrete message it carries.

use commonware_codec::DecodeExt;
use msgfee_types::{AnyMsg, Msg, TypedMsg};
use std::{any::type_name, collections::BTreeMap, fmt};
use thiserror::Error;

type DecodeFn = fn(&[u8]) -> Result<Box<dyn Msg>, commonware_codec::Error>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unable to resolve type URL {0}")]
    NotFound(String),
    #[error("type URL {type_url} is already bound to {existing}, cannot bind {new}")]
    Conflict {
        type_url: &'static str,
        existing: &'static str,
        new: &'static str,
    },
    #[error("failed to unpack {type_url}: {source}")]
    Unpack {
        type_url: String,
        #[source]
        source: commonware_codec::Error,
    },
}

/// Structural descriptor of a registered message type.
#[derive(Clone, Copy)]
pub struct MsgDescriptor {
    type_url: &'static str,
    type_name: &'static str,
    decode: DecodeFn,
}

impl MsgDescriptor {
    pub fn type_url(&self) -> &'static str {
        self.type_url
    }

    /// Rust type name of the message, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for MsgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgDescriptor")
            .field("type_url", &self.type_url)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn decode_msg<M: TypedMsg>(bytes: &[u8]) -> Result<Box<dyn Msg>, commonware_codec::Error> {
    Ok(Box::new(M::decode(bytes)?))
}

#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    types: BTreeMap<&'static str, MsgDescriptor>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `M`. Registering the same type twice is a no-op; binding its type URL to a
    /// different Rust type is an error.
    pub fn register_msg<M: TypedMsg>(&mut self) -> Result<(), RegistryError> {
        let descriptor = MsgDescriptor {
            type_url: M::TYPE_URL,
            type_name: type_name::<M>(),
            decode: decode_msg::<M>,
        };
        if let Some(existing) = self.types.get(M::TYPE_URL) {
            if existing.type_name != descriptor.type_name {
                return Err(RegistryError::Conflict {
                    type_url: M::TYPE_URL,
                    existing: existing.type_name,
                    new: descriptor.type_name,
                });
            }
            return Ok(());
        }
        self.types.insert(M::TYPE_URL, descriptor);
        Ok(())
    }

    pub fn resolve(&self, type_url: &str) -> Result<&MsgDescriptor, RegistryError> {
        self.types
            .get(type_url)
            .ok_or_else(|| RegistryError::NotFound(type_url.to_string()))
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.types.contains_key(type_url)
    }

    pub fn type_urls(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// Decode the concrete message packed in `any`.
    pub fn unpack(&self, any: &AnyMsg) -> Result<Box<dyn Msg>, RegistryError> {
        let descriptor = self.resolve(&any.type_url)?;
        (descriptor.decode)(&any.value).map_err(|source| RegistryError::Unpack {
            type_url: any.type_url.clone(),
            source,
        })
    }
}
