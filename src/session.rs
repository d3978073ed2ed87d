//! The session façade: owns both arenas, the root, the equivalence index,
//! and the grafting/configuration state, and exposes the engine's public
//! operations.

use log::{debug, warn};

use crate::arena::Arena;
use crate::branch::{BranchId, BranchRecord};
use crate::error::{MAX_STATE_SIZE, MAX_STRIDE, SessionError};
use crate::hash::{EquivIndex, meiyan16};
use crate::position::{Endpoint, Move, PositionId, PositionRecord, StateView};

/// Controls whether [`Session::add_position`] searches for an equivalent
/// state, and if so, when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Skip the equivalence search entirely.
    NoCheck,
    /// Search immediately and link/graft on the spot.
    Check,
    /// Mark the position for a later batch pass (see
    /// [`Session::resolve_deferred_betters`]) instead of searching now.
    CheckLater,
}

/// What to do when a newly added position turns out to reach an existing
/// state in fewer moves than the existing position did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraftMode {
    /// Only link the `better` pointers; leave the tree shape alone.
    NoGraft,
    /// Transplant the older position's subtree onto the new, shorter path.
    #[default]
    Graft,
    /// Leave the tree shape alone, but reproduce the older position's best
    /// solution (if any) under the new position.
    CopyPath,
    /// Transplant, then reproduce the solution back under the now-leaf
    /// older position so it isn't left useless.
    GraftAndCopy,
}

pub struct Session {
    pub(crate) positions: Arena<PositionRecord, PositionId>,
    pub(crate) branches: Arena<BranchRecord, BranchId>,
    pub(crate) root: PositionId,
    pub(crate) index: Option<EquivIndex>,
    pub(crate) statesize: usize,
    pub(crate) cmpsize: usize,
    pub(crate) graft_mode: GraftMode,
    pub(crate) changed: bool,
}

fn copy_into_state(statesize: usize, src: &[u8]) -> Box<[u8]> {
    let mut buf = vec![0u8; statesize];
    let n = src.len().min(statesize);
    buf[..n].copy_from_slice(&src[..n]);
    buf.into_boxed_slice()
}

/// The per-element stride (header + inline state) a C-style byte-strided
/// arena would use. This crate stores state bytes in a separate `Box<[u8]>`
/// rather than inline in a raw-byte slab (see DESIGN.md), so nothing here
/// actually depends on the stride, but the limit is preserved as a session
/// creation error condition for fidelity to the original interface.
fn stride_for(statesize: usize) -> usize {
    const HEADER_WORDS: usize = 6;
    let raw = HEADER_WORDS * std::mem::size_of::<usize>() + statesize;
    let align = std::mem::align_of::<usize>();
    raw.div_ceil(align) * align
}

impl Session {
    /// Creates a new session whose root position holds `initial_state`.
    /// `statesize` is the total size of every state buffer (`1..=65535`);
    /// `cmpsize` is the leading portion used for equality and hashing
    /// (`0..=statesize`, where `0` means "use the whole state").
    pub fn begin_session(
        initial_state: &[u8],
        statesize: usize,
        cmpsize: usize,
    ) -> Result<Self, SessionError> {
        if statesize == 0 || statesize > MAX_STATE_SIZE {
            warn!("rejected session: invalid statesize {statesize}");
            return Err(SessionError::InvalidStateSize { statesize });
        }
        if cmpsize > statesize {
            warn!("rejected session: cmpsize {cmpsize} exceeds statesize {statesize}");
            return Err(SessionError::InvalidCompareSize { cmpsize, statesize });
        }
        let cmpsize = if cmpsize == 0 { statesize } else { cmpsize };

        let stride = stride_for(statesize);
        if stride > MAX_STRIDE {
            warn!("rejected session: stride {stride} exceeds the per-element limit");
            return Err(SessionError::StrideOverflow { stride });
        }

        let mut positions: Arena<PositionRecord, PositionId> = Arena::new();
        let branches: Arena<BranchRecord, BranchId> = Arena::new();

        let boxed_state = copy_into_state(statesize, initial_state);
        let hash = meiyan16(&boxed_state[..cmpsize]);
        let root = positions.insert(PositionRecord::new(None, 0, 0, hash, false, boxed_state));

        let mut index = Some(EquivIndex::new());
        if let Some(idx) = index.as_mut() {
            idx.set(hash);
        }

        debug!("opened session: statesize={statesize} cmpsize={cmpsize}");

        Ok(Self {
            positions,
            branches,
            root,
            index,
            statesize,
            cmpsize,
            graft_mode: GraftMode::default(),
            changed: false,
        })
    }

    pub fn set_grafting(&mut self, mode: GraftMode) -> GraftMode {
        std::mem::replace(&mut self.graft_mode, mode)
    }

    pub fn root(&self) -> PositionId {
        self.root
    }

    pub fn session_size(&self) -> usize {
        self.positions.len()
    }

    pub fn get_state(&self, pos: PositionId) -> Option<StateView<'_>> {
        self.positions.get(pos).map(|rec| StateView(&rec.state))
    }

    /// Number of moves from the root to `pos`.
    pub fn movecount(&self, pos: PositionId) -> Option<u32> {
        self.positions.get(pos).map(|rec| rec.movecount)
    }

    /// Number of distinct outgoing branches from `pos`.
    pub fn nextcount(&self, pos: PositionId) -> Option<u32> {
        self.positions.get(pos).map(|rec| rec.nextcount)
    }

    /// The position `pos` is linked to as holding the same state in
    /// strictly fewer moves, if any.
    pub fn better(&self, pos: PositionId) -> Option<PositionId> {
        self.positions.get(pos)?.better
    }

    /// The best `(endpoint, solutionsize)` reachable in `pos`'s subtree
    /// (including `pos` itself), or `None` if no endpoint lies beneath it.
    pub fn solution_info(&self, pos: PositionId) -> Option<(Endpoint, u32)> {
        let rec = self.positions.get(pos)?;
        (rec.solutionsize != 0 || rec.is_endpoint()).then_some((rec.solutionend, rec.solutionsize))
    }

    /// Overwrites bytes `cmpsize..statesize` of `pos`'s state from `state`
    /// (which must be `statesize` bytes long; extra trailing bytes are
    /// ignored, a short buffer leaves the tail untouched). A silent no-op
    /// when `cmpsize == statesize`, since there is no extra portion.
    pub fn update_extra_state(&mut self, pos: PositionId, state: &[u8]) {
        if self.cmpsize == self.statesize {
            return;
        }
        let Some(rec) = self.positions.get_mut(pos) else {
            return;
        };
        let hi = self.statesize.min(state.len());
        if hi > self.cmpsize {
            rec.state[self.cmpsize..hi].copy_from_slice(&state[self.cmpsize..hi]);
        }
    }

    /// Looks up the branch labelled `mv` at `pos`. Promotes it to the head
    /// of `pos`'s branch list as a side effect of the lookup, so that a
    /// caller always following the head reproduces "repeat the last thing
    /// you did here."
    pub fn get_next(&mut self, pos: PositionId, mv: Move) -> Option<PositionId> {
        self.find_and_promote(pos, mv)
    }

    pub(crate) fn find_and_promote(&mut self, pos: PositionId, mv: Move) -> Option<PositionId> {
        let head = self.positions.get(pos)?.next;
        let mut prev_branch: Option<BranchId> = None;
        let mut current = head;
        while let Some(bid) = current {
            let (is_match, sibling, target) = {
                let b = self.branches.get(bid)?;
                (b.mv == mv, b.sibling, b.target)
            };
            if is_match {
                if let Some(pb) = prev_branch {
                    self.branches.get_mut(pb).unwrap().sibling = sibling;
                    self.branches.get_mut(bid).unwrap().sibling = head;
                    self.positions.get_mut(pos).unwrap().next = Some(bid);
                }
                return Some(target);
            }
            prev_branch = Some(bid);
            current = sibling;
        }
        None
    }

    /// Adds a position reached from `prev` (or the root, if `prev` is
    /// `None`) via `mv`. See module-level documentation for the full
    /// algorithm.
    pub fn add_position(
        &mut self,
        prev: Option<PositionId>,
        mv: Move,
        state: &[u8],
        endpoint: Endpoint,
        check_mode: CheckMode,
    ) -> Option<PositionId> {
        if let Some(p) = prev {
            if self.positions.get(p).is_none() {
                return None;
            }
            if let Some(existing) = self.find_and_promote(p, mv) {
                return Some(existing);
            }
        }

        let boxed_state = copy_into_state(self.statesize, state);

        let equiv = if check_mode == CheckMode::Check && endpoint == 0 {
            self.equiv_lookup(&boxed_state[..self.cmpsize])
        } else {
            None
        };

        let hash = meiyan16(&boxed_state[..self.cmpsize]);
        let movecount = prev.map_or(0, |p| self.positions.get(p).unwrap().movecount + 1);
        let setbetter = check_mode == CheckMode::CheckLater;

        let mut record = PositionRecord::new(prev, movecount, endpoint, hash, setbetter, boxed_state);
        if record.is_endpoint() {
            record.solutionend = endpoint;
            record.solutionsize = movecount;
        }
        let new_id = self.positions.insert(record);
        if let Some(index) = self.index.as_mut() {
            index.set(hash);
        }

        if let Some(prev_id) = prev {
            let head = self.positions.get(prev_id).unwrap().next;
            let bid = self.branches.insert(BranchRecord {
                mv,
                target: new_id,
                sibling: head,
            });
            let prev_rec = self.positions.get_mut(prev_id).unwrap();
            prev_rec.next = Some(bid);
            prev_rec.nextcount += 1;
        }

        if endpoint != 0 {
            self.propagate_solution(prev, endpoint, movecount);
        }

        if let Some(equiv_id) = equiv {
            let equiv_movecount = self.positions.get(equiv_id).unwrap().movecount;
            if movecount > equiv_movecount {
                self.positions.get_mut(new_id).unwrap().better = Some(equiv_id);
            } else if movecount < equiv_movecount {
                self.positions.get_mut(equiv_id).unwrap().better = Some(new_id);
                self.apply_grafting_policy(equiv_id, new_id);
            }
            // equal movecounts: both paths are equally short, neither
            // dominates, so no `better` link is recorded (I5 requires one).
        }

        self.changed = true;
        debug!("added position {new_id:?} at movecount {movecount} under {prev:?}");
        Some(new_id)
    }

    /// Deletes a leaf position. Returns the position unchanged (and does
    /// not set the change flag) if it has no parent (the root) or still has
    /// outgoing branches.
    pub fn drop_position(&mut self, pos: PositionId) -> PositionId {
        let Some(rec) = self.positions.get(pos) else {
            return pos;
        };
        let Some(parent_id) = rec.prev else {
            return pos;
        };
        if rec.next.is_some() {
            return pos;
        }

        let Some(branch_id) = self.detach_branch(parent_id, pos) else {
            return pos;
        };
        self.branches.remove(branch_id);

        let replacement = self.positions.get(pos).unwrap().better;
        for pid in self.positions.live_indices() {
            if pid == pos {
                continue;
            }
            if self.positions.get(pid).unwrap().better == Some(pos) {
                self.positions.get_mut(pid).unwrap().better = replacement;
            }
        }

        self.positions.remove(pos);
        self.recalc_solution_from(Some(parent_id));
        self.rebuild_hash_index();
        self.changed = true;
        debug!("dropped position {pos:?}, parent now {parent_id:?}");
        parent_id
    }

    fn detach_branch(&mut self, parent: PositionId, target: PositionId) -> Option<BranchId> {
        let head = self.positions.get(parent)?.next;
        let mut prev_branch: Option<BranchId> = None;
        let mut current = head;
        while let Some(bid) = current {
            let (matched_target, sibling) = {
                let b = self.branches.get(bid)?;
                (b.target == target, b.sibling)
            };
            if matched_target {
                match prev_branch {
                    Some(pb) => self.branches.get_mut(pb).unwrap().sibling = sibling,
                    None => self.positions.get_mut(parent).unwrap().next = sibling,
                }
                self.positions.get_mut(parent).unwrap().nextcount -= 1;
                return Some(bid);
            }
            prev_branch = Some(bid);
            current = sibling;
        }
        None
    }

    pub(crate) fn rebuild_hash_index(&mut self) {
        let Some(index) = self.index.as_mut() else {
            return;
        };
        index.clear_all();
        for (_, rec) in self.positions.iter() {
            index.set(rec.hashvalue);
        }
    }

    /// Looks up a live, fully-resolved (`setbetter == false`) position
    /// whose comparing bytes equal `cmp_bytes`, following its `better`
    /// chain to the end.
    pub(crate) fn equiv_lookup(&self, cmp_bytes: &[u8]) -> Option<PositionId> {
        self.equiv_lookup_excluding(cmp_bytes, None)
    }

    pub(crate) fn equiv_lookup_excluding(
        &self,
        cmp_bytes: &[u8],
        exclude: Option<PositionId>,
    ) -> Option<PositionId> {
        let hash = meiyan16(cmp_bytes);
        if let Some(index) = &self.index {
            if !index.maybe_present(hash) {
                return None;
            }
        }
        for (pid, rec) in self.positions.iter() {
            if Some(pid) == exclude {
                continue;
            }
            if rec.setbetter || rec.hashvalue != hash {
                continue;
            }
            if &rec.state[..self.cmpsize] != cmp_bytes {
                continue;
            }
            let mut cursor = pid;
            while let Some(next) = self.positions.get(cursor).unwrap().better {
                cursor = next;
            }
            return Some(cursor);
        }
        None
    }

    /// Runs the deferred-better resolution pass: every position flagged
    /// `setbetter` is searched for an equivalent state exactly as the
    /// online path would, and linked (without grafting). Returns how many
    /// links were set.
    pub fn resolve_deferred_betters(&mut self) -> usize {
        let mut count = 0;
        for pid in self.positions.live_indices() {
            let Some(rec) = self.positions.get(pid) else {
                continue;
            };
            if !rec.setbetter {
                continue;
            }
            let cmp_bytes = rec.state[..self.cmpsize].to_vec();
            let movecount = rec.movecount;

            self.positions.get_mut(pid).unwrap().setbetter = false;

            if let Some(equiv_id) = self.equiv_lookup_excluding(&cmp_bytes, Some(pid)) {
                let equiv_movecount = self.positions.get(equiv_id).unwrap().movecount;
                if movecount > equiv_movecount {
                    self.positions.get_mut(pid).unwrap().better = Some(equiv_id);
                    count += 1;
                } else if movecount < equiv_movecount {
                    self.positions.get_mut(equiv_id).unwrap().better = Some(pid);
                    count += 1;
                }
            }
        }
        debug!("resolved {count} deferred better links");
        count
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    pub fn clear_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}
