//! Cycle suppression: recognising that the user has navigated back to a
//! state already on their current ancestor chain, and pruning the
//! now-redundant tail that led there.

use log::debug;

use crate::position::PositionId;
use crate::session::Session;

impl Session {
    /// Looks for an ancestor of `*current` whose comparing bytes equal
    /// `state`'s. If one is found, `*current` is redirected to it. If the
    /// hop distance from the original `*current` to that ancestor is within
    /// `prunelimit`, the now-redundant chain between them is also deleted
    /// (stopping early at the first node that still has side branches).
    /// Returns whether a cycle was found at all.
    pub fn suppress_cycle(&mut self, current: &mut PositionId, state: &[u8], prunelimit: u32) -> bool {
        if state.len() < self.cmpsize {
            return false;
        }
        let cmp = &state[..self.cmpsize];

        let Some(start_rec) = self.positions.get(*current) else {
            return false;
        };
        let start = *current;
        let start_movecount = start_rec.movecount;

        let mut ancestor = start_rec.prev;
        while let Some(aid) = ancestor {
            let rec = self.positions.get(aid).unwrap();
            if &rec.state[..self.cmpsize] == cmp {
                let hops = start_movecount - rec.movecount;
                if hops <= prunelimit {
                    self.prune_chain(start, aid);
                    self.changed = true;
                }
                *current = aid;
                debug!("suppressed cycle: {start:?} -> {aid:?} ({hops} hops)");
                return true;
            }
            ancestor = rec.prev;
        }
        false
    }

    /// Deletes the chain from `leaf` up towards (and including) the child
    /// of `ancestor`, stopping as soon as a node with side branches of its
    /// own is found.
    fn prune_chain(&mut self, leaf: PositionId, ancestor: PositionId) {
        let mut node = leaf;
        loop {
            if self.positions.get(node).unwrap().next.is_some() {
                break;
            }
            let Some(parent) = self.positions.get(node).unwrap().prev else {
                break;
            };
            let reached_ancestors_child = parent == ancestor;
            self.drop_position(node);
            if reached_ancestors_child {
                break;
            }
            node = parent;
        }
    }
}
