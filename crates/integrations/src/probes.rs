//! Declarative vendor smoke checks.
//!
//! A probe is one authenticated GET against a cheap, read-only endpoint of a
//! vendor API. A 2xx answer means the credential works and the vendor is
//! reachable. Templates may reference credentials as `{VAR}`; a probe whose
//! variables are not all set fails without making a request.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use harness::{Check, CheckError, Outcome};
use notify::SlackChannel;

use crate::secrets::Secrets;

/// Longest response body excerpt kept in a failure note.
const MAX_NOTE_BODY_CHARS: usize = 200;

/// Name of the Slack webhook configuration check.
pub const SLACK_PROBE: &str = "Slack";

/// Errors selecting probes by name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("unknown check: {0}")]
    Unknown(String),
}

/// How a probe authenticates.
///
/// Strings are templates expanded against [`Secrets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// No credentials
    None,
    /// `Authorization: Bearer <var>`
    Bearer(&'static str),
    /// HTTP basic auth with templated user and password
    Basic {
        user: &'static str,
        pass: &'static str,
    },
    /// HTTP basic auth with the key as user and an empty password
    BasicKeyOnly(&'static str),
    /// Arbitrary header with a templated value
    Header {
        name: &'static str,
        value: &'static str,
    },
}

/// One vendor smoke check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorProbe {
    /// Display name, e.g. `Stripe`
    pub name: String,
    /// Scheme and host, may be templated
    pub base_url: String,
    /// Path and query, may be templated
    pub path: String,
    /// Authentication scheme
    pub auth: Auth,
}

impl VendorProbe {
    /// Create a probe.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        path: impl Into<String>,
        auth: Auth,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            path: path.into(),
            auth,
        }
    }

    /// Point the probe at another host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Variables the probe needs, in first-use order.
    #[must_use]
    pub fn required_vars(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        let mut templates = vec![self.base_url.as_str(), self.path.as_str()];
        match &self.auth {
            Auth::None => {}
            Auth::Bearer(var) | Auth::BasicKeyOnly(var) => {
                if !vars.contains(var) {
                    vars.push(*var);
                }
            }
            Auth::Basic { user, pass } => templates.extend([*user, *pass]),
            Auth::Header { value, .. } => templates.push(*value),
        }
        for template in templates {
            for var in placeholders(template) {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
        vars
    }

    /// Run the probe once.
    ///
    /// # Errors
    /// Returns [`CheckError::MissingCredential`] before any request when a
    /// variable is unset, and [`CheckError::Http`] on transport failures.
    pub async fn probe(
        &self,
        http: &reqwest::Client,
        secrets: &Secrets,
    ) -> Result<Outcome, CheckError> {
        for var in self.required_vars() {
            secrets.require(var)?;
        }

        let url = format!(
            "{}{}",
            render(&self.base_url, secrets)?.trim_end_matches('/'),
            render(&self.path, secrets)?
        );
        let mut request = http.get(&url);

        request = match &self.auth {
            Auth::None => request,
            Auth::Bearer(var) => request.bearer_auth(secrets.require(var)?),
            Auth::Basic { user, pass } => {
                request.basic_auth(render(user, secrets)?, Some(render(pass, secrets)?))
            }
            Auth::BasicKeyOnly(var) => request.basic_auth(secrets.require(var)?, Some("")),
            Auth::Header { name, value } => request.header(*name, render(value, secrets)?),
        };

        debug!(probe = %self.name, "Probing vendor API");

        let response = request
            .send()
            .await
            .map_err(|e| CheckError::Http(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            return Ok(Outcome::pass(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.name
            )));
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.trim().chars().take(MAX_NOTE_BODY_CHARS).collect();
        Ok(Outcome::fail(format!("HTTP {}: {excerpt}", status.as_u16())))
    }
}

/// `{VAR}` names in a template.
fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    names
}

/// Expand `{VAR}` placeholders in one pass; substituted values are copied
/// as-is, even when they contain braces.
fn render(template: &str, secrets: &Secrets) -> Result<String, CheckError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(secrets.require(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Probes for every vendor YoBot talks to.
#[must_use]
pub fn builtin_probes() -> Vec<VendorProbe> {
    vec![
        VendorProbe::new(
            "Airtable",
            "https://api.airtable.com",
            "/v0/meta/whoami",
            Auth::Bearer("AIRTABLE_API_KEY"),
        ),
        VendorProbe::new(
            "Stripe",
            "https://api.stripe.com",
            "/v1/balance",
            Auth::BasicKeyOnly("STRIPE_SECRET_KEY"),
        ),
        VendorProbe::new(
            "HubSpot",
            "https://api.hubapi.com",
            "/crm/v3/objects/contacts?limit=1",
            Auth::Bearer("HUBSPOT_ACCESS_TOKEN"),
        ),
        VendorProbe::new(
            "Twilio",
            "https://api.twilio.com",
            "/2010-04-01/Accounts/{TWILIO_ACCOUNT_SID}.json",
            Auth::Basic {
                user: "{TWILIO_ACCOUNT_SID}",
                pass: "{TWILIO_AUTH_TOKEN}",
            },
        ),
        VendorProbe::new(
            "Zendesk",
            "https://{ZENDESK_SUBDOMAIN}.zendesk.com",
            "/api/v2/users/me.json",
            Auth::Basic {
                user: "{ZENDESK_EMAIL}/token",
                pass: "{ZENDESK_API_TOKEN}",
            },
        ),
        VendorProbe::new(
            "QuickBooks",
            "https://quickbooks.api.intuit.com",
            "/v3/company/{QUICKBOOKS_REALM_ID}/companyinfo/{QUICKBOOKS_REALM_ID}",
            Auth::Bearer("QUICKBOOKS_ACCESS_TOKEN"),
        ),
        VendorProbe::new(
            "ElevenLabs",
            "https://api.elevenlabs.io",
            "/v1/user",
            Auth::Header {
                name: "xi-api-key",
                value: "{ELEVENLABS_API_KEY}",
            },
        ),
        VendorProbe::new(
            "PhantomBuster",
            "https://api.phantombuster.com",
            "/api/v2/agents/fetch-all",
            Auth::Header {
                name: "X-Phantombuster-Key-1",
                value: "{PHANTOMBUSTER_API_KEY}",
            },
        ),
        VendorProbe::new(
            "D-ID",
            "https://api.d-id.com",
            "/credits",
            Auth::Header {
                name: "authorization",
                value: "Basic {DID_API_KEY}",
            },
        ),
        VendorProbe::new(
            "Render",
            "https://api.render.com",
            "/v1/services?limit=1",
            Auth::Bearer("RENDER_API_KEY"),
        ),
        VendorProbe::new(
            "OpenAI",
            "https://api.openai.com",
            "/v1/models",
            Auth::Bearer("OPENAI_API_KEY"),
        ),
    ]
}

/// Built-in probes whose names match `names`, case-insensitively, in the
/// order requested.
///
/// # Errors
/// Returns [`ProbeError::Unknown`] for the first name without a probe.
pub fn select_probes<S: AsRef<str>>(names: &[S]) -> Result<Vec<VendorProbe>, ProbeError> {
    let all = builtin_probes();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            all.iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| ProbeError::Unknown(name.to_string()))
        })
        .collect()
}

/// Adapts a [`VendorProbe`] to the harness.
pub struct ProbeCheck {
    probe: VendorProbe,
    secrets: Arc<Secrets>,
    http: reqwest::Client,
}

impl ProbeCheck {
    /// Wrap a probe.
    #[must_use]
    pub fn new(probe: VendorProbe, secrets: Arc<Secrets>, http: reqwest::Client) -> Self {
        Self {
            probe,
            secrets,
            http,
        }
    }
}

#[async_trait]
impl Check for ProbeCheck {
    fn name(&self) -> &str {
        &self.probe.name
    }

    async fn run(&self) -> Result<Outcome, CheckError> {
        self.probe.probe(&self.http, &self.secrets).await
    }
}

/// Checks that `SLACK_WEBHOOK_URL` is set and well-formed. Posts nothing.
pub struct SlackWebhookCheck {
    secrets: Arc<Secrets>,
}

impl SlackWebhookCheck {
    #[must_use]
    pub fn new(secrets: Arc<Secrets>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl Check for SlackWebhookCheck {
    fn name(&self) -> &str {
        SLACK_PROBE
    }

    async fn run(&self) -> Result<Outcome, CheckError> {
        let url = self.secrets.require(notify::channels::slack::ENV_SLACK_WEBHOOK_URL)?;
        match SlackChannel::validate_webhook_url(url) {
            Ok(()) => Ok(Outcome::pass("webhook URL configured")),
            Err(e) => Ok(Outcome::fail(e.to_string())),
        }
    }
}

/// Names of every built-in check, Slack last.
#[must_use]
pub fn check_names() -> Vec<String> {
    builtin_probes()
        .into_iter()
        .map(|p| p.name)
        .chain(std::iter::once(SLACK_PROBE.to_string()))
        .collect()
}

/// Harness checks for `names`, or every built-in check when `names` is empty.
///
/// # Errors
/// Returns [`ProbeError::Unknown`] for a name that matches nothing.
pub fn select_checks<S: AsRef<str>>(
    names: &[S],
    secrets: &Arc<Secrets>,
) -> Result<Vec<Arc<dyn Check>>, ProbeError> {
    let http = reqwest::Client::new();
    let wanted: Vec<String> = if names.is_empty() {
        check_names()
    } else {
        names.iter().map(|n| n.as_ref().to_string()).collect()
    };

    let mut checks: Vec<Arc<dyn Check>> = Vec::with_capacity(wanted.len());
    for name in &wanted {
        if name.eq_ignore_ascii_case(SLACK_PROBE) {
            checks.push(Arc::new(SlackWebhookCheck::new(Arc::clone(secrets))));
            continue;
        }
        let probe = select_probes(std::slice::from_ref(name))?
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::Unknown(name.clone()))?;
        checks.push(Arc::new(ProbeCheck::new(
            probe,
            Arc::clone(secrets),
            http.clone(),
        )));
    }
    Ok(checks)
}
