use bytes::Bytes;
use commonware_codec::Encode;

use crate::{AnyMsg, Event};

/// Outcome of a successfully dispatched message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgResult {
    /// Encoded [AnyMsg] of the handler's response.
    pub data: Bytes,
    pub response: AnyMsg,
    pub events: Vec<Event>,
}

impl MsgResult {
    pub fn new(response: AnyMsg, events: Vec<Event>) -> Self {
        Self {
            data: response.encode().freeze(),
            response,
            events,
        }
    }
}
