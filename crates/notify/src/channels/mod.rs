//! Delivery targets for [`NotifyEvent`]s.

mod blocks;
pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::events::{NotifyEvent, Severity};

/// A place notifications can be delivered to.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Short lowercase identifier used in logs and results.
    fn name(&self) -> &'static str;

    /// Whether the channel has what it needs to deliver.
    fn is_configured(&self) -> bool;

    /// Lowest severity this channel wants to see.
    fn min_severity(&self) -> Severity {
        Severity::Info
    }

    /// Deliver one event.
    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError>;

    /// Configured and interested in `event`.
    fn accepts(&self, event: &NotifyEvent) -> bool {
        self.is_configured() && event.severity() >= self.min_severity()
    }
}
