use bytes::Bytes;
use msgfee_types::{Coins, Event, Header};
use std::{cell::RefCell, rc::Rc};
use tracing::Span;

use crate::gas::{FeeGasMeter, FeeSnapshot, GasMeter};

/// Handle to a transaction's gas meter. Every context derived for the same transaction shares
/// it, and it is `!Send`: one transaction's meter stays on one thread.
pub type SharedGasMeter = Rc<RefCell<dyn GasMeter>>;

/// Collects the events emitted within one scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventManager {
    events: Vec<Event>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Execution context passed explicitly to every handler.
#[derive(Clone)]
pub struct Context {
    gas_meter: SharedGasMeter,
    event_manager: EventManager,
    tx_bytes: Bytes,
    header: Header,
    chain_id: String,
    span: Span,
}

impl Context {
    pub fn new(header: Header, chain_id: impl Into<String>, gas_meter: SharedGasMeter) -> Self {
        let chain_id = chain_id.into();
        let span = tracing::debug_span!("tx", chain_id = %chain_id, height = header.height);
        Self {
            gas_meter,
            event_manager: EventManager::new(),
            tx_bytes: Bytes::new(),
            header,
            chain_id,
            span,
        }
    }

    pub fn with_tx_bytes(mut self, tx_bytes: impl Into<Bytes>) -> Self {
        self.tx_bytes = tx_bytes.into();
        self
    }

    pub fn with_event_manager(mut self, event_manager: EventManager) -> Self {
        self.event_manager = event_manager;
        self
    }

    pub fn gas_meter(&self) -> &SharedGasMeter {
        &self.gas_meter
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn event_manager_mut(&mut self) -> &mut EventManager {
        &mut self.event_manager
    }

    pub fn emit_event(&mut self, event: Event) {
        self.event_manager.emit(event);
    }

    pub fn into_events(self) -> Vec<Event> {
        self.event_manager.into_events()
    }

    pub fn tx_bytes(&self) -> &Bytes {
        &self.tx_bytes
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Span that logging within this context is attached to.
    pub fn logger(&self) -> &Span {
        &self.span
    }

    /// Fee state of the meter, if it is a [FeeGasMeter].
    pub(crate) fn fee_snapshot(&self) -> Option<FeeSnapshot> {
        self.gas_meter
            .borrow()
            .as_any()
            .downcast_ref::<FeeGasMeter>()
            .map(FeeGasMeter::fee_snapshot)
    }

    pub(crate) fn fee_consumed(&self) -> Coins {
        self.gas_meter
            .borrow()
            .as_any()
            .downcast_ref::<FeeGasMeter>()
            .map(|meter| meter.fee_consumed().clone())
            .unwrap_or_default()
    }

    /// Roll the meter's fee state back to `snapshot`.
    pub(crate) fn restore_fees(&self, snapshot: Option<FeeSnapshot>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        if let Some(meter) = self
            .gas_meter
            .borrow_mut()
            .as_any_mut()
            .downcast_mut::<FeeGasMeter>()
        {
            meter.restore_fees(snapshot);
        }
    }
}
