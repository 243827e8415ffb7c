//! stackdeck-state — the deployment store for a simulated WordPress stack.
//!
//! The [`DeploymentStore`] owns the canonical [`DeploymentState`]: it applies
//! scale, deploy-all and rollback requests, keeps the derived pod count and
//! rendered configs current, and notifies subscribers after every change.
//!
//! # Architecture
//!
//! Each mutation runs in two phases. The synchronous phase marks affected
//! services `pending` and publishes. A Tokio task then sleeps for the
//! operation's fixed delay and settles them back to `running`. Every service
//! carries an in-flight generation, so a settle that has been superseded by a
//! newer request for the same service is dropped instead of applied.
//!
//! State sits behind a single mutex that is never held while subscribers run,
//! so a subscriber may read or even mutate the store from its callback.
//!
//! [`DeploymentState`]: stackdeck_core::DeploymentState

pub mod error;
pub mod store;
pub mod subscribers;
pub mod transition;

pub use error::{StoreError, StoreResult};
pub use store::DeploymentStore;
pub use subscribers::Subscription;
pub use transition::Transition;
