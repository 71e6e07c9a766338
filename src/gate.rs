//! Movement completion gate: counts tile moves that have started but not reported back.

use std::collections::HashSet;
use tracing::trace;

/// Receipt for one requested move. The mover hands it back exactly once on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveTicket(u64);

impl std::fmt::Display for MoveTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// What a completion did to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// That was the last outstanding move.
    Settled,
    /// Still waiting on this many moves.
    Pending(usize),
    /// Ticket was never issued or already completed; nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
pub struct MovementGate {
    next: u64,
    outstanding: HashSet<MoveTicket>,
}

impl MovementGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a move before it starts.
    pub fn issue(&mut self) -> MoveTicket {
        let ticket = MoveTicket(self.next);
        self.next += 1;
        self.outstanding.insert(ticket);
        trace!(target: "gate", %ticket, pending = self.outstanding.len(), "move_issued");
        ticket
    }

    /// Count a move as finished. A ticket only ever decrements once.
    pub fn complete(&mut self, ticket: MoveTicket) -> GateSignal {
        if !self.outstanding.remove(&ticket) {
            return GateSignal::Ignored;
        }
        let pending = self.outstanding.len();
        trace!(target: "gate", %ticket, pending, "move_completed");
        if pending == 0 {
            GateSignal::Settled
        } else {
            GateSignal::Pending(pending)
        }
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.outstanding.len()
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.outstanding.is_empty()
    }

    #[inline]
    pub fn is_outstanding(&self, ticket: MoveTicket) -> bool {
        self.outstanding.contains(&ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_when_last_move_reports() {
        let mut gate = MovementGate::new();
        assert!(gate.is_settled());
        let a = gate.issue();
        let b = gate.issue();
        assert_eq!(gate.pending(), 2);
        assert_eq!(gate.complete(b), GateSignal::Pending(1));
        assert_eq!(gate.complete(a), GateSignal::Settled);
        assert!(gate.is_settled());
    }

    #[test]
    fn duplicate_completion_cannot_underflow() {
        let mut gate = MovementGate::new();
        let a = gate.issue();
        let b = gate.issue();
        assert_eq!(gate.complete(a), GateSignal::Pending(1));
        assert_eq!(gate.complete(a), GateSignal::Ignored);
        assert_eq!(gate.pending(), 1);
        assert!(gate.is_outstanding(b));
        assert_eq!(gate.complete(b), GateSignal::Settled);
    }
}
