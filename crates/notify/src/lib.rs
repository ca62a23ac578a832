//! Slack notifications for YoBot automation events.
//!
//! Batch results, failed checks, inbound webhook summaries and captured leads
//! become [`NotifyEvent`]s; a [`Notifier`] hands each event to every
//! configured [`NotifyChannel`] that wants it.
//!
//! ```no_run
//! use notify::{Notifier, NotifyEvent, Severity};
//!
//! # async fn example() {
//! let notifier = Notifier::from_env();
//! notifier.notify(NotifyEvent::message("Nightly smoke tests started", Severity::Info));
//! # }
//! ```
//!
//! Environment:
//!
//! - `SLACK_WEBHOOK_URL`: enables the Slack channel
//! - `SLACK_MIN_SEVERITY`: quietest severity Slack receives (default `info`)
//! - `NOTIFY_DISABLED`: `true` or `1` turns every channel off

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;

pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::{NotifyEvent, Severity};

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Per-channel delivery result from [`Notifier::notify_and_wait`].
pub type Delivery = (String, Result<(), ChannelError>);

/// Fans events out to channels.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    /// Channels configured through the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .is_ok_and(|v| v.eq_ignore_ascii_case("true") || v.trim() == "1");
        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        let slack = SlackChannel::from_env();
        let channels: Vec<Arc<dyn NotifyChannel>> = if slack.is_configured() {
            vec![Arc::new(slack)]
        } else {
            Vec::new()
        };

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(channel_count = channels.len(), "Notifications enabled");
        }

        Self { channels }
    }

    /// Use exactly these channels; unconfigured ones are skipped at send time.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    /// A notifier that drops everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_channels(&self) -> bool {
        self.channels.iter().any(|c| c.is_configured())
    }

    /// Number of configured channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_configured()).count()
    }

    fn targets<'a>(
        &'a self,
        event: &'a NotifyEvent,
    ) -> impl Iterator<Item = &'a Arc<dyn NotifyChannel>> {
        self.channels.iter().filter(move |c| c.accepts(event))
    }

    /// Fire-and-forget: one spawned task per interested channel.
    ///
    /// Must be called inside a Tokio runtime. Failures are logged only.
    pub fn notify(&self, event: NotifyEvent) {
        let event = Arc::new(event);
        let mut spawned = 0usize;

        for channel in self.targets(&event) {
            let channel = Arc::clone(channel);
            let event = Arc::clone(&event);
            spawned += 1;

            tokio::spawn(async move {
                match channel.send(&event).await {
                    Ok(()) => debug!(channel = channel.name(), "Notification sent"),
                    Err(e) => warn!(channel = channel.name(), error = %e, "Notification failed"),
                }
            });
        }

        if spawned == 0 {
            debug!(title = %event.title(), "No channel wants this event");
        }
    }

    /// Send to every interested channel concurrently and wait for all of them.
    ///
    /// For short-lived callers such as the CLI, which would exit before
    /// spawned tasks finish. Results keep channel order.
    pub async fn notify_and_wait(&self, event: NotifyEvent) -> Vec<Delivery> {
        let event = &event;
        let sends = self.targets(event).map(|channel| async move {
            (channel.name().to_string(), channel.send(event).await)
        });
        join_all(sends).await
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_env()
    }
}
