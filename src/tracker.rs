//! Pending-group bookkeeping for tiles whose absorb animation has not finished yet.
//!
//! A tile may sit in more than one group (the corner of an L). Each group completes, once,
//! when its own last member reports absorbed.

use crate::arena::TileId;
use crate::color::{GemColor, MatchTier};
use crate::detector::MatchGroup;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A group whose last tile has been absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedGroup {
    pub group: GroupId,
    pub color: GemColor,
    /// Derived from the size the group had when it was detected.
    pub tier: MatchTier,
}

#[derive(Debug, Clone)]
struct PendingGroup {
    color: GemColor,
    tier: MatchTier,
    remaining: HashSet<TileId>,
}

#[derive(Debug, Default)]
pub struct PendingGroups {
    next_id: u64,
    groups: HashMap<GroupId, PendingGroup>,
    memberships: HashMap<TileId, Vec<GroupId>>,
}

impl PendingGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking freshly detected groups. Must run before their tiles leave the grid.
    pub fn register(&mut self, groups: &[MatchGroup]) -> Vec<GroupId> {
        let mut ids = Vec::with_capacity(groups.len());
        for group in groups {
            let id = GroupId(self.next_id);
            self.next_id += 1;
            for &tile in &group.tiles {
                self.memberships.entry(tile).or_default().push(id);
            }
            self.groups.insert(
                id,
                PendingGroup {
                    color: group.color,
                    tier: group.tier(),
                    remaining: group.tiles.iter().copied().collect(),
                },
            );
            debug!(target: "tracker", group = %id, color = %group.color, size = group.len(), "group_registered");
            ids.push(id);
        }
        ids
    }

    /// Consume one absorbed tile from every group still holding it.
    /// Returns the groups this emptied, in registration order.
    /// Unknown, late and duplicate notifications return nothing.
    pub fn notify_absorbed(&mut self, tile: TileId) -> Vec<CompletedGroup> {
        let Some(member_of) = self.memberships.remove(&tile) else {
            trace!(target: "tracker", %tile, "absorb_untracked");
            return Vec::new();
        };
        let mut completed = Vec::new();
        for id in member_of {
            let Some(group) = self.groups.get_mut(&id) else {
                continue;
            };
            group.remaining.remove(&tile);
            if group.remaining.is_empty() {
                if let Some(done) = self.groups.remove(&id) {
                    debug!(target: "tracker", group = %id, color = %done.color, tier = ?done.tier, "group_absorbed");
                    completed.push(CompletedGroup {
                        group: id,
                        color: done.color,
                        tier: done.tier,
                    });
                }
            }
        }
        completed.sort_by_key(|c| c.group);
        completed
    }

    /// Members of `group` still in flight, or `None` once it has completed or was never
    /// registered.
    pub fn remaining(&self, group: GroupId) -> Option<usize> {
        self.groups.get(&group).map(|g| g.remaining.len())
    }

    #[inline]
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn tracked_tiles(&self) -> usize {
        self.memberships.len()
    }

    #[inline]
    pub fn is_tracking(&self, tile: TileId) -> bool {
        self.memberships.contains_key(&tile)
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.groups.is_empty()
    }

    /// Forget every pending group without firing completions. Returns how many were dropped.
    pub fn abandon_all(&mut self) -> usize {
        let dropped = self.groups.len();
        if dropped > 0 {
            debug!(target: "tracker", dropped, "groups_abandoned");
        }
        self.groups.clear();
        self.memberships.clear();
        dropped
    }
}
