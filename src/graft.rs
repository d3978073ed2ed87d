//! Grafting: relocating (or copying) a subtree when a newly added position
//! turns out to represent a state already reached elsewhere, in fewer
//! moves, plus the solution-size/endpoint bookkeeping both grafting and
//! plain deletion depend on.

use log::trace;

use crate::position::{Endpoint, PositionId};
use crate::session::{GraftMode, Session};

fn dominates(candidate: (Endpoint, u32), current: (Endpoint, u32)) -> bool {
    candidate.0 > current.0 || (candidate.0 == current.0 && candidate.1 < current.1)
}

impl Session {
    /// Walks from `from` up to the root, installing `(endpoint,
    /// solutionsize)` at every ancestor that doesn't already hold a
    /// better-or-equal record, stopping at the first one that does.
    pub(crate) fn propagate_solution(
        &mut self,
        from: Option<PositionId>,
        endpoint: Endpoint,
        solutionsize: u32,
    ) {
        let mut cursor = from;
        while let Some(pid) = cursor {
            let rec = self.positions.get(pid).unwrap();
            let holds_better_or_equal = rec.solutionend > endpoint
                || (rec.solutionend == endpoint && rec.solutionsize <= solutionsize);
            if holds_better_or_equal {
                break;
            }
            let rec = self.positions.get_mut(pid).unwrap();
            rec.solutionend = endpoint;
            rec.solutionsize = solutionsize;
            cursor = self.positions.get(pid).unwrap().prev;
        }
    }

    /// Recomputes `solutionend`/`solutionsize` at `pid` from scratch: the
    /// best of `pid` itself (if it's an endpoint) and its children's
    /// already-computed solution fields (invariant I6).
    pub(crate) fn recalc_one(&mut self, pid: PositionId) {
        let rec = self.positions.get(pid).unwrap();
        let mut best = rec.is_endpoint().then_some((rec.endpoint, rec.movecount));

        let mut branch = rec.next;
        while let Some(bid) = branch {
            let b = self.branches.get(bid).unwrap();
            let child = self.positions.get(b.target).unwrap();
            if child.solutionsize != 0 {
                let candidate = (child.solutionend, child.solutionsize);
                best = Some(match best {
                    None => candidate,
                    Some(current) if dominates(candidate, current) => candidate,
                    Some(current) => current,
                });
            }
            branch = b.sibling;
        }

        let rec = self.positions.get_mut(pid).unwrap();
        match best {
            Some((end, size)) => {
                rec.solutionend = end;
                rec.solutionsize = size;
            }
            None => {
                rec.solutionend = 0;
                rec.solutionsize = 0;
            }
        }
    }

    /// Recomputes every ancestor from `from` up to the root, unconditionally.
    /// Unlike [`Self::propagate_solution`] this never stops early: it is
    /// used after a structural change (drop, graft) where an ancestor might
    /// need to *lose* a solution record, not only gain one.
    pub(crate) fn recalc_solution_from(&mut self, from: Option<PositionId>) {
        let mut cursor = from;
        while let Some(pid) = cursor {
            self.recalc_one(pid);
            cursor = self.positions.get(pid).unwrap().prev;
        }
    }

    pub(crate) fn apply_grafting_policy(&mut self, old: PositionId, new: PositionId) {
        match self.graft_mode {
            GraftMode::NoGraft => {}
            GraftMode::Graft => self.transplant_subtree(old, new),
            GraftMode::CopyPath => {
                self.duplicate_path(new, old);
            }
            GraftMode::GraftAndCopy => {
                self.transplant_subtree(old, new);
                self.duplicate_path(old, new);
            }
        }
    }

    /// Moves `old`'s entire subtree onto `new`, reparenting the former
    /// first-level children and adjusting every descendant's movecount (and
    /// solutionsize, and `better` links that the adjustment invalidates) by
    /// the depth delta. `old` becomes a leaf.
    fn transplant_subtree(&mut self, old: PositionId, new: PositionId) {
        let (old_next, old_nextcount, old_movecount) = {
            let r = self.positions.get(old).unwrap();
            (r.next, r.nextcount, r.movecount)
        };
        let new_movecount = self.positions.get(new).unwrap().movecount;
        let delta = i64::from(new_movecount) - i64::from(old_movecount);

        {
            let new_rec = self.positions.get_mut(new).unwrap();
            new_rec.next = old_next;
            new_rec.nextcount = old_nextcount;
        }
        {
            let old_rec = self.positions.get_mut(old).unwrap();
            old_rec.next = None;
            old_rec.nextcount = 0;
        }

        let mut branch = old_next;
        while let Some(bid) = branch {
            let (target, sibling) = {
                let b = self.branches.get(bid).unwrap();
                (b.target, b.sibling)
            };
            self.positions.get_mut(target).unwrap().prev = Some(new);
            self.adjust_subtree_movecount(target, delta);
            branch = sibling;
        }

        self.recalc_one(old);
        self.recalc_one(new);
        let old_parent = self.positions.get(old).unwrap().prev;
        let new_parent = self.positions.get(new).unwrap().prev;
        self.recalc_solution_from(old_parent);
        self.recalc_solution_from(new_parent);
        self.changed = true;
        trace!("grafted subtree rooted under {old:?} onto {new:?}, delta {delta}");
    }

    /// Shifts every position in the subtree rooted at `root` by `delta`
    /// moves, inverting any `better` link that the shift has invalidated
    /// (I5 requires `better.movecount < movecount`).
    fn adjust_subtree_movecount(&mut self, root: PositionId, delta: i64) {
        let mut stack = vec![root];
        while let Some(pid) = stack.pop() {
            let (new_movecount, old_solutionsize, better) = {
                let rec = self.positions.get(pid).unwrap();
                let new_movecount = (i64::from(rec.movecount) + delta) as u32;
                (new_movecount, rec.solutionsize, rec.better)
            };
            {
                let rec = self.positions.get_mut(pid).unwrap();
                rec.movecount = new_movecount;
                if old_solutionsize != 0 {
                    rec.solutionsize = (i64::from(old_solutionsize) + delta) as u32;
                }
            }
            if let Some(better_id) = better {
                let better_movecount = self.positions.get(better_id).unwrap().movecount;
                if better_movecount >= new_movecount {
                    self.positions.get_mut(pid).unwrap().better = None;
                    self.positions.get_mut(better_id).unwrap().better = Some(pid);
                }
            }

            let mut branch = self.positions.get(pid).unwrap().next;
            while let Some(bid) = branch {
                let b = self.branches.get(bid).unwrap();
                stack.push(b.target);
                branch = b.sibling;
            }
        }
    }
}
