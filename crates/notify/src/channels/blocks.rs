//! Slack Block Kit rendering for [`NotifyEvent`].

use serde::Serialize;

use crate::events::NotifyEvent;

/// Incoming-webhook body: fallback `text`, blocks, and a colored strip.
#[derive(Debug, Serialize)]
pub(crate) struct BlockMessage {
    pub(crate) text: String,
    pub(crate) blocks: Vec<Block>,
    pub(crate) attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Block {
    Section { text: Mrkdwn },
    Divider,
    Context { elements: Vec<Mrkdwn> },
}

#[derive(Debug, Serialize)]
pub(crate) struct Mrkdwn {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Attachment {
    color: String,
}

fn section(text: impl Into<String>) -> Block {
    Block::Section {
        text: Mrkdwn {
            kind: "mrkdwn",
            text: text.into(),
        },
    }
}

impl From<&NotifyEvent> for BlockMessage {
    fn from(event: &NotifyEvent) -> Self {
        let severity = event.severity();
        let title = event.title();

        let mut blocks = vec![
            section(format!("{} *{title}*", severity.emoji())),
            section(body(event)),
        ];

        let facts = facts(event);
        if !facts.is_empty() {
            blocks.push(Block::Divider);
            blocks.push(section(facts.join(" • ")));
        }

        blocks.push(Block::Context {
            elements: vec![Mrkdwn {
                kind: "mrkdwn",
                text: format!("YoBot • {}", event.timestamp().format("%Y-%m-%d %H:%M:%S UTC")),
            }],
        });

        Self {
            text: title,
            blocks,
            attachments: vec![Attachment {
                color: format!("#{:06x}", severity.color()),
            }],
        }
    }
}

fn body(event: &NotifyEvent) -> String {
    match event {
        NotifyEvent::CheckFailed {
            check,
            note,
            attempts,
            ..
        } => {
            let noun = if *attempts == 1 { "attempt" } else { "attempts" };
            format!(":x: `{check}` failed after {attempts} {noun}\n{note}")
        }
        NotifyEvent::BatchCompleted {
            passed,
            failed,
            skipped,
            halted,
            duration_secs,
            ..
        } => {
            let mut lines = vec![format!(
                ":white_check_mark: {passed} passed • :x: {failed} failed in {}",
                human_duration(*duration_secs)
            )];
            if *skipped > 0 {
                lines.push(format!(":fast_forward: {skipped} skipped"));
            }
            if *halted {
                lines.push(":octagonal_sign: Halted on first failure".to_string());
            }
            lines.join("\n")
        }
        NotifyEvent::WebhookReceived { summary, .. } => summary.clone(),
        NotifyEvent::LeadCaptured {
            name,
            company,
            source,
            ..
        } => format!(
            "*{name}* from {} requested a demo (via {})",
            company.as_deref().unwrap_or("unknown company"),
            source.as_deref().unwrap_or("direct")
        ),
        NotifyEvent::Message { text, .. } => text.clone(),
    }
}

fn facts(event: &NotifyEvent) -> Vec<String> {
    match event {
        NotifyEvent::CheckFailed { batch, .. } | NotifyEvent::BatchCompleted { batch, .. } => {
            vec![format!("*Batch:* {batch}")]
        }
        NotifyEvent::WebhookReceived { source, fields, .. } => {
            std::iter::once(format!("*Source:* {source}"))
                .chain(fields.iter().map(|(k, v)| format!("*{k}:* {v}")))
                .collect()
        }
        NotifyEvent::LeadCaptured { email, .. } => {
            email.iter().map(|e| format!("*Email:* {e}")).collect()
        }
        NotifyEvent::Message { .. } => Vec::new(),
    }
}

/// `42s`, `2m 5s`, `1h 1m`; seconds are dropped once hours appear.
fn human_duration(secs: u64) -> String {
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
