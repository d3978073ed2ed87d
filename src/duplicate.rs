//! Reproducing a known solution path at another, equivalent position.

use crate::position::{Move, PositionId};
use crate::session::{CheckMode, Session};

impl Session {
    /// Copies the sequence of moves leading from `source` to its best
    /// reachable endpoint into `dest`'s subtree, one [`Session::add_position`]
    /// call at a time. Does nothing and returns `false` if `source` has no
    /// solution in its subtree; returns `false` partway (with whatever
    /// prefix was already copied left in place) if a copy step fails.
    pub fn duplicate_path(&mut self, dest: PositionId, source: PositionId) -> bool {
        let Some(source_rec) = self.positions.get(source) else {
            return false;
        };
        if source_rec.solutionsize == 0 {
            return false;
        }
        let target_size = source_rec.solutionsize;

        let Some(moves) = self.collect_solution_moves(source, target_size) else {
            return false;
        };

        let mut cur_dest = dest;
        let mut cur_source = source;
        for mv in moves {
            let Some(next_source) = self.child_by_move(cur_source, mv) else {
                return false;
            };
            let (state, endpoint) = {
                let r = self.positions.get(next_source).unwrap();
                (r.state.clone(), r.endpoint)
            };
            let Some(next_dest) =
                self.add_position(Some(cur_dest), mv, &state, endpoint, CheckMode::NoCheck)
            else {
                return false;
            };

            if self.positions.get(next_dest).unwrap().better.is_none() {
                let dest_movecount = self.positions.get(next_dest).unwrap().movecount;
                let source_movecount = self.positions.get(next_source).unwrap().movecount;
                if dest_movecount > source_movecount {
                    let source_better = self.positions.get(next_source).unwrap().better;
                    let link_to = source_better.unwrap_or(next_source);
                    self.positions.get_mut(next_dest).unwrap().better = Some(link_to);
                }
            }

            cur_dest = next_dest;
            cur_source = next_source;
        }
        true
    }

    /// Walks down from `source`, at each step following the branch whose
    /// target carries the winning `(solutionend, solutionsize)` pair, until
    /// the endpoint itself (the descendant achieving `target_size`) is
    /// reached.
    fn collect_solution_moves(&self, source: PositionId, target_size: u32) -> Option<Vec<Move>> {
        let mut moves = Vec::new();
        let mut cur = source;
        loop {
            let rec = self.positions.get(cur)?;
            if rec.is_endpoint() && rec.movecount == target_size {
                return Some(moves);
            }
            let target_end = rec.solutionend;
            let mut branch = rec.next;
            let mut found = None;
            while let Some(bid) = branch {
                let b = self.branches.get(bid)?;
                let child = self.positions.get(b.target)?;
                if child.solutionsize == target_size && child.solutionend == target_end {
                    found = Some((b.mv, b.target));
                    break;
                }
                branch = b.sibling;
            }
            let (mv, next) = found?;
            moves.push(mv);
            cur = next;
        }
    }

    fn child_by_move(&self, pid: PositionId, mv: Move) -> Option<PositionId> {
        let mut branch = self.positions.get(pid)?.next;
        while let Some(bid) = branch {
            let b = self.branches.get(bid)?;
            if b.mv == mv {
                return Some(b.target);
            }
            branch = b.sibling;
        }
        None
    }
}
