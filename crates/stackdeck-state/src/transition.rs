//! Two-phase transitions driven by the store.
//!
//! Every mutation first marks its services `pending` and later settles them
//! back to `running` after a fixed delay. This module names those
//! transitions and the markers each phase leaves on a service.

use std::fmt;
use std::time::Duration;

use stackdeck_core::Timings;

/// `last_update` marker left by failure injection.
pub const FAILED_MARKER: &str = "Failed";

/// A mutation with a deferred completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// One service's replica count changed.
    Scale,
    /// Every service is being redeployed.
    DeployAll,
    /// Every service is being reset to its default replica count.
    Rollback,
}

impl Transition {
    /// Marker written when the transition starts.
    pub fn pending_marker(&self) -> &'static str {
        match self {
            Transition::Scale => "Just now",
            Transition::DeployAll => "Deploying...",
            Transition::Rollback => "Rolling back...",
        }
    }

    /// Marker written when the transition settles.
    pub fn settled_marker(&self) -> &'static str {
        match self {
            Transition::Scale | Transition::DeployAll => "Just deployed",
            Transition::Rollback => "Rolled back",
        }
    }

    pub fn delay(&self, timings: &Timings) -> Duration {
        match self {
            Transition::Scale => timings.scale,
            Transition::DeployAll => timings.deploy,
            Transition::Rollback => timings.rollback,
        }
    }

    /// Whether settling re-renders the cached configs.
    ///
    /// Rollback already re-rendered with the reset replica counts when it
    /// started; its settle only flips statuses.
    pub fn rerenders_on_settle(&self) -> bool {
        !matches!(self, Transition::Rollback)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transition::Scale => "scale",
            Transition::DeployAll => "deploy",
            Transition::Rollback => "rollback",
        })
    }
}

/// A scheduled settle: which services it may complete, and at which
/// generation each of them was when the transition started.
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    pub transition: Transition,
    pub generations: Vec<(String, u64)>,
}
