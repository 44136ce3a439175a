/// Callback scope — the completions the player is still waiting on.
///
/// Every awaited fade, cue or timer is registered here. A signal is acted on
/// only if its ticket is still registered; closing the scope hands back the
/// outstanding tickets so the owner can cancel them through the stage.

use rustc_hash::FxHashMap;

use crate::core::stage::{Signal, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    Fade,
    Cue,
    Timer,
}

impl TicketKind {
    fn matches(&self, signal: &Signal) -> bool {
        matches!(
            (self, signal),
            (Self::Fade, Signal::FadeFinished(_))
                | (Self::Cue, Signal::CueFinished(_))
                | (Self::Timer, Signal::TimerFired(_))
        )
    }
}

#[derive(Debug, Default)]
pub struct CallbackScope {
    pending: FxHashMap<Ticket, TicketKind>,
    closed: bool,
}

impl CallbackScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, ticket: Ticket, kind: TicketKind) {
        if !self.closed {
            self.pending.insert(ticket, kind);
        }
    }

    /// Consume the ticket of `signal`. Returns false for signals the scope
    /// is not waiting on, signals of the wrong kind, and anything after close.
    pub fn settle(&mut self, signal: &Signal) -> bool {
        if self.closed {
            return false;
        }
        let ticket = signal.ticket();
        match self.pending.get(&ticket) {
            Some(kind) if kind.matches(signal) => {
                self.pending.remove(&ticket);
                true
            }
            _ => false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the scope and return what was still outstanding, oldest first.
    pub fn close(&mut self) -> Vec<(Ticket, TicketKind)> {
        self.closed = true;
        let mut outstanding: Vec<_> = self.pending.drain().collect();
        outstanding.sort_by_key(|(ticket, _)| *ticket);
        outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_tracked_ticket_once() {
        let mut scope = CallbackScope::new();
        scope.track(Ticket(1), TicketKind::Cue);
        assert!(scope.is_waiting());
        assert!(scope.settle(&Signal::CueFinished(Ticket(1))));
        assert!(!scope.settle(&Signal::CueFinished(Ticket(1))));
        assert!(!scope.is_waiting());
    }

    #[test]
    fn ignores_unknown_and_mismatched_signals() {
        let mut scope = CallbackScope::new();
        scope.track(Ticket(2), TicketKind::Timer);
        assert!(!scope.settle(&Signal::CueFinished(Ticket(9))));
        assert!(!scope.settle(&Signal::FadeFinished(Ticket(2))));
        assert!(scope.settle(&Signal::TimerFired(Ticket(2))));
    }

    #[test]
    fn close_returns_outstanding_and_goes_deaf() {
        let mut scope = CallbackScope::new();
        scope.track(Ticket(5), TicketKind::Timer);
        scope.track(Ticket(3), TicketKind::Fade);
        let outstanding = scope.close();
        assert_eq!(
            outstanding,
            vec![(Ticket(3), TicketKind::Fade), (Ticket(5), TicketKind::Timer)]
        );
        assert!(scope.is_closed());
        assert!(!scope.settle(&Signal::TimerFired(Ticket(5))));

        scope.track(Ticket(6), TicketKind::Cue);
        assert!(!scope.is_waiting());
    }
}
