use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A two-party vector timestamp.
///
/// Each [`Jupiter`](crate::Jupiter) engine talks to exactly one remote party, so it only needs to
/// count two things: how many operations it generated itself (`local`) and how many operations it
/// has received from the other side (`remote`). When a timestamp is sent over the wire it is
/// read from the sender's point of view - the receiver's `remote` counter is compared against
/// the sender's `local` counter and vice versa.
///
/// Timestamps are only comparable between the same pair of endpoints. They're immutable - advancing
/// produces a new value.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VectorTime {
    pub local: usize,
    pub remote: usize,
}

impl VectorTime {
    pub const ZERO: VectorTime = VectorTime { local: 0, remote: 0 };

    pub fn new(local: usize, remote: usize) -> Self {
        Self { local, remote }
    }

    #[must_use]
    pub fn next_local(self) -> Self {
        Self { local: self.local + 1, remote: self.remote }
    }

    #[must_use]
    pub fn next_remote(self) -> Self {
        Self { local: self.local, remote: self.remote + 1 }
    }

    /// The same timestamp as seen from the other endpoint.
    #[must_use]
    pub fn mirrored(self) -> Self {
        Self { local: self.remote, remote: self.local }
    }

    /// True iff both timestamps name exactly the same document state.
    pub fn is_current(&self, other: &VectorTime) -> bool {
        self == other
    }
}

impl Display for VectorTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.local, self.remote)
    }
}

impl From<(usize, usize)> for VectorTime {
    fn from((local, remote): (usize, usize)) -> Self {
        Self { local, remote }
    }
}
