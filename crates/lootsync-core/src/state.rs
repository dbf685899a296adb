//! Per-drop lifecycle.
//!
//! ```text
//! Unshared ──share──> Shared
//!    │                  │
//!    ├──tap──> Dismantling <──tap──┤
//!    │            │                │
//!    │       progress = 1          │
//!    │            v                │
//!    │       Dismantled            │
//!    └────pickup──> PickedUp <─────┘
//! ```
//!
//! Both terminal states mean the drop no longer exists. Nothing leaves a
//! terminal state.

/// Where a drop is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropState {
    /// Claimable by the owner only.
    Unshared,
    /// Claimable by anyone.
    Shared,
    /// Has non-zero dismantle progress.
    Dismantling,
    /// Claimed and removed.
    PickedUp,
    /// Dismantled into currency and removed.
    Dismantled,
}

impl DropState {
    /// State of a live drop with the given flags.
    pub fn live(shared: bool, progress: f32) -> Self {
        if progress > 0.0 {
            Self::Dismantling
        } else if shared {
            Self::Shared
        } else {
            Self::Unshared
        }
    }

    /// Whether the drop has been removed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::PickedUp | Self::Dismantled)
    }
}
