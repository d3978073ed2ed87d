//! Position records: nodes of the history tree.

use crate::arena::ArenaIndex;
use crate::branch::BranchId;

/// A terminal marker. Zero means "not a terminal state"; non-zero marks a
/// solution state, with larger values denoting preferred solution kinds.
pub type Endpoint = i16;

/// A caller-chosen identifier for a user action.
pub type Move = i64;

/// Stable handle to a [`PositionRecord`] inside a [`crate::session::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionId(u32);

impl ArenaIndex for PositionId {
    fn from_raw(raw: u32) -> Self {
        PositionId(raw)
    }
    fn to_raw(self) -> u32 {
        self.0
    }
}

/// A node of the history tree: a state reached by a specific sequence of
/// moves, plus the bookkeeping that makes equivalence detection and
/// solution propagation possible.
pub(crate) struct PositionRecord {
    pub prev: Option<PositionId>,
    /// Head of the outgoing branch list, most-recently-used first.
    pub next: Option<BranchId>,
    pub nextcount: u32,
    /// Another position holding the same state in strictly fewer moves.
    pub better: Option<PositionId>,
    pub movecount: u32,
    pub endpoint: Endpoint,
    pub solutionend: Endpoint,
    pub solutionsize: u32,
    pub setbetter: bool,
    pub hashvalue: u16,
    pub state: Box<[u8]>,
}

impl PositionRecord {
    pub fn new(
        prev: Option<PositionId>,
        movecount: u32,
        endpoint: Endpoint,
        hashvalue: u16,
        setbetter: bool,
        state: Box<[u8]>,
    ) -> Self {
        Self {
            prev,
            next: None,
            nextcount: 0,
            better: None,
            movecount,
            endpoint,
            solutionend: 0,
            solutionsize: 0,
            setbetter,
            hashvalue,
            state,
        }
    }

    pub fn is_endpoint(&self) -> bool {
        self.endpoint != 0
    }
}

/// A read-only, caller-facing view of a position's state bytes. Valid until
/// the position is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateView<'a>(pub(crate) &'a [u8]);

impl<'a> StateView<'a> {
    pub fn as_bytes(self) -> &'a [u8] {
        self.0
    }
}
