//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during a run. Unlike
//! example-based tests that check specific scenarios, they verify behavioral
//! properties across every schedule the simulated network produces.
//!
//! # Architecture
//!
//! The cluster extracts observable state from the host and every client into
//! a [`SystemSnapshot`], then runs registered [`Invariant`] checks against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&cluster.snapshot())?;
//! ```

mod checks;
mod snapshot;

pub use checks::{AtMostOnceGrant, MirrorConvergence, ProgressInRange, TerminalNeverResurrected};
pub use snapshot::{ClientSnapshot, DropView, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against system state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every drop lifecycle invariant.
    ///
    /// Includes:
    /// - [`AtMostOnceGrant`]: each drop is granted at most once
    /// - [`MirrorConvergence`]: quiet mirrors equal the host registry
    /// - [`TerminalNeverResurrected`]: removed drops stay removed
    /// - [`ProgressInRange`]: progress stays in `[0, 1]`
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(AtMostOnceGrant);
        registry.add(MirrorConvergence);
        registry.add(TerminalNeverResurrected);
        registry.add(ProgressInRange);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
