//! Economy events recorded during a step.
//!
//! Stages push events into the engine's [`EventLog`]; the caller drains them
//! after each step. Event kinds can be suppressed, in which case nothing is
//! recorded for them.

use crate::fixed::{Fixed64, Ticks};
use crate::id::*;

/// An economy event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EconomyEvent {
    // -- Spawn --
    BusinessSpawned {
        business: BusinessId,
        kind: BusinessKindId,
        colony: ColonyId,
        tick: Ticks,
    },
    FleetSeeded {
        business: BusinessId,
        carrier: CarrierId,
        tick: Ticks,
    },

    // -- Jobs --
    JobStarted {
        business: BusinessId,
        job: JobId,
        completes_at: Ticks,
        tick: Ticks,
    },
    JobCompleted {
        business: BusinessId,
        job: JobId,
        tick: Ticks,
    },
    /// A finished job could not deposit its outputs and stays active.
    JobStalled {
        business: BusinessId,
        job: JobId,
        tick: Ticks,
    },
    NoCandidate {
        business: BusinessId,
        retry_at: Ticks,
        tick: Ticks,
    },

    // -- Transfers --
    Procured {
        business: BusinessId,
        resource: ResourceTypeId,
        amount: Fixed64,
        tick: Ticks,
    },
    Purchased {
        business: BusinessId,
        resource: ResourceTypeId,
        amount: Fixed64,
        tick: Ticks,
    },
    Exported {
        business: BusinessId,
        resource: ResourceTypeId,
        amount: Fixed64,
        tick: Ticks,
    },
    HaulerDelivered {
        hauler: HaulerId,
        colony: ColonyId,
        amount: Fixed64,
        tick: Ticks,
    },
    /// A carrier unloaded directly into a nearby colony's reserves.
    CarrierExported {
        carrier: CarrierId,
        colony: ColonyId,
        amount: Fixed64,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BusinessSpawned,
    FleetSeeded,
    JobStarted,
    JobCompleted,
    JobStalled,
    NoCandidate,
    Procured,
    Purchased,
    Exported,
    HaulerDelivered,
    CarrierExported,
}

const EVENT_KIND_COUNT: usize = 11;

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

impl EconomyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EconomyEvent::BusinessSpawned { .. } => EventKind::BusinessSpawned,
            EconomyEvent::FleetSeeded { .. } => EventKind::FleetSeeded,
            EconomyEvent::JobStarted { .. } => EventKind::JobStarted,
            EconomyEvent::JobCompleted { .. } => EventKind::JobCompleted,
            EconomyEvent::JobStalled { .. } => EventKind::JobStalled,
            EconomyEvent::NoCandidate { .. } => EventKind::NoCandidate,
            EconomyEvent::Procured { .. } => EventKind::Procured,
            EconomyEvent::Purchased { .. } => EventKind::Purchased,
            EconomyEvent::Exported { .. } => EventKind::Exported,
            EconomyEvent::HaulerDelivered { .. } => EventKind::HaulerDelivered,
            EconomyEvent::CarrierExported { .. } => EventKind::CarrierExported,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            EconomyEvent::BusinessSpawned { tick, .. }
            | EconomyEvent::FleetSeeded { tick, .. }
            | EconomyEvent::JobStarted { tick, .. }
            | EconomyEvent::JobCompleted { tick, .. }
            | EconomyEvent::JobStalled { tick, .. }
            | EconomyEvent::NoCandidate { tick, .. }
            | EconomyEvent::Procured { tick, .. }
            | EconomyEvent::Purchased { tick, .. }
            | EconomyEvent::Exported { tick, .. }
            | EconomyEvent::HaulerDelivered { tick, .. }
            | EconomyEvent::CarrierExported { tick, .. } => *tick,
        }
    }
}

/// Buffer of events emitted since the last drain.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<EconomyEvent>,
    suppressed: [bool; EVENT_KIND_COUNT],
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: EconomyEvent) {
        if !self.suppressed[event.kind().index()] {
            self.events.push(event);
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn events(&self) -> &[EconomyEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take every buffered event, oldest first.
    pub fn drain(&mut self) -> Vec<EconomyEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn business() -> BusinessId {
        let mut map = SlotMap::<BusinessId, ()>::with_key();
        map.insert(())
    }

    #[test]
    fn emit_and_drain() {
        let mut log = EventLog::new();
        let b = business();
        log.emit(EconomyEvent::JobCompleted {
            business: b,
            job: JobId(0),
            tick: 6,
        });
        assert_eq!(log.len(), 1);
        let drained = log.drain();
        assert_eq!(drained[0].kind(), EventKind::JobCompleted);
        assert_eq!(drained[0].tick(), 6);
        assert!(log.is_empty());
    }

    #[test]
    fn suppressed_kinds_are_dropped() {
        let mut log = EventLog::new();
        log.suppress(EventKind::NoCandidate);
        log.emit(EconomyEvent::NoCandidate {
            business: business(),
            retry_at: 10,
            tick: 0,
        });
        assert!(log.is_empty());
        assert!(log.is_suppressed(EventKind::NoCandidate));
        log.unsuppress(EventKind::NoCandidate);
        assert!(!log.is_suppressed(EventKind::NoCandidate));
    }
}
