//! Environment detection
//!
//! Strategies run in order and the first answer wins. The list always ends
//! in production, so detection cannot fail.

mod detector;
mod strategies;

use async_trait::async_trait;

use crate::types::Environment;

pub use detector::{DetectedEnvironment, EnvironmentDetector};
pub use strategies::{BranchName, ExplicitSignal, Fallback, LocalFile, StackContext};

/// One way of finding out which environment we are in
///
/// Implementations swallow their own failures (missing binaries, timeouts,
/// unreadable files) and answer `None`.
#[async_trait]
pub trait DetectionStrategy: Send + Sync {
    /// Stable identifier recorded on the detection result
    fn name(&self) -> &str;

    async fn try_detect(&self) -> Option<Environment>;
}
