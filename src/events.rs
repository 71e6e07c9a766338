//! Board notifications and explicit subscription.

use crate::color::{GemColor, MatchTier};
use crate::grid::CellPos;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// A group was detected. Fired for every group before any of its tiles leave the grid.
    MatchFound { color: GemColor, tier: MatchTier },
    /// Every tile of one group finished its absorb animation.
    GroupAbsorbed { color: GemColor, tier: MatchTier },
    /// A swap produced no match and is being put back.
    SwapReverted { from: CellPos, to: CellPos },
    /// Detection found nothing after `passes` resolve passes; the board is idle.
    CascadeSettled { passes: u32 },
    /// Cells converted to the inert sentinel.
    CellsDisabled { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&BoardEvent)>;

/// Synchronous fan-out to registered listeners, in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BoardEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Subscribe through a channel. The subscription lapses on its own once the receiver
    /// is dropped.
    pub fn channel(&mut self) -> (SubscriptionId, mpsc::Receiver<BoardEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(*event);
        });
        (id, rx)
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: BoardEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn delivers_in_subscription_order_until_unsubscribed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let a = {
            let log = Rc::clone(&log);
            bus.subscribe(move |_| log.borrow_mut().push('a'))
        };
        {
            let log = Rc::clone(&log);
            bus.subscribe(move |_| log.borrow_mut().push('b'));
        }
        bus.emit(BoardEvent::CascadeSettled { passes: 1 });
        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        bus.emit(BoardEvent::CascadeSettled { passes: 2 });
        assert_eq!(*log.borrow(), vec!['a', 'b', 'b']);
    }

    #[test]
    fn channel_receives_copies() {
        let mut bus = EventBus::new();
        let (_, rx) = bus.channel();
        let event = BoardEvent::MatchFound {
            color: GemColor::Red,
            tier: MatchTier::Three,
        };
        bus.emit(event);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![event]);
    }
}
