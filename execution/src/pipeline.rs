//! Running every message of a transaction through the router.

use msgfee_types::{AnyMsg, Coins, Event, MsgResult};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    error::DispatchError,
    router::MsgServiceRouter,
    Context,
};

/// Event added ahead of each message's own events.
pub const MESSAGE_EVENT: &str = "message";
pub const ATTRIBUTE_ACTION: &str = "action";
pub const ATTRIBUTE_MSG_INDEX: &str = "msg_index";

#[derive(Debug, Error)]
#[error("failed to execute message; message index: {index}: {source}")]
pub struct MsgFailure {
    pub index: usize,
    #[source]
    pub source: DispatchError,
}

impl MsgFailure {
    pub fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }

    pub fn code(&self) -> u32 {
        self.source.code()
    }
}

/// Outcome of a transaction whose messages all succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResult {
    pub results: Vec<MsgResult>,
    /// Events of every message, in order, each group led by its `message` event.
    pub events: Vec<Event>,
    /// Additional fees consumed by the transaction so far.
    pub fee_consumed: Coins,
}

/// Unpack and dispatch `msgs` in order, stopping at the first failure.
///
/// A failure undoes every additional fee the transaction's messages charged and drops all
/// events collected so far.
pub fn run_msgs(
    router: &MsgServiceRouter,
    ctx: &Context,
    msgs: &[AnyMsg],
) -> Result<TxResult, MsgFailure> {
    let snapshot = ctx.fee_snapshot();
    let mut results = Vec::with_capacity(msgs.len());
    let mut events = Vec::new();

    for (index, any) in msgs.iter().enumerate() {
        let outcome = router
            .registry()
            .unpack(any)
            .map_err(DispatchError::from)
            .and_then(|msg| router.dispatch(ctx, msg.as_ref()));
        match outcome {
            Ok(result) => {
                events.push(
                    Event::new(MESSAGE_EVENT)
                        .with_attribute(ATTRIBUTE_ACTION, &any.type_url)
                        .with_attribute(ATTRIBUTE_MSG_INDEX, index),
                );
                events.extend(result.events.iter().cloned());
                results.push(result);
            }
            Err(source) => {
                ctx.restore_fees(snapshot);
                warn!(
                    parent: ctx.logger(),
                    index,
                    type_url = %any.type_url,
                    code = source.code(),
                    fatal = source.is_fatal(),
                    error = %source,
                    "message failed"
                );
                return Err(MsgFailure { index, source });
            }
        }
    }

    let fee_consumed = ctx.fee_consumed();
    debug!(
        parent: ctx.logger(),
        msgs = msgs.len(),
        events = events.len(),
        fee_consumed = %fee_consumed,
        "executed transaction messages"
    );
    Ok(TxResult {
        results,
        events,
        fee_consumed,
    })
}

/// Decode the context's transaction bytes with the router's decoder and run its messages.
pub fn run_tx(router: &MsgServiceRouter, ctx: &Context) -> Result<TxResult, MsgFailure> {
    let tx = router
        .decode_tx(ctx.tx_bytes())
        .map_err(|err| MsgFailure {
            index: 0,
            source: err.into(),
        })?;
    run_msgs(router, ctx, tx.msgs())
}
