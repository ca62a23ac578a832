//! Vendor credentials read once from the environment.

use std::collections::BTreeMap;
use std::fmt;

use harness::CheckError;

/// Every credential variable the probes and clients know about.
pub const KNOWN_VARS: &[&str] = &[
    "AIRTABLE_API_KEY",
    "AIRTABLE_BASE_ID",
    "STRIPE_SECRET_KEY",
    "HUBSPOT_ACCESS_TOKEN",
    "TWILIO_ACCOUNT_SID",
    "TWILIO_AUTH_TOKEN",
    "TWILIO_FROM_NUMBER",
    "ZENDESK_SUBDOMAIN",
    "ZENDESK_EMAIL",
    "ZENDESK_API_TOKEN",
    "QUICKBOOKS_ACCESS_TOKEN",
    "QUICKBOOKS_REALM_ID",
    "ELEVENLABS_API_KEY",
    "PHANTOMBUSTER_API_KEY",
    "DID_API_KEY",
    "RENDER_API_KEY",
    "OPENAI_API_KEY",
    "SLACK_WEBHOOK_URL",
];

/// Immutable snapshot of credential variables.
///
/// Empty values are treated as absent.
#[derive(Clone, Default)]
pub struct Secrets {
    values: BTreeMap<String, String>,
}

impl Secrets {
    /// Read the known variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_pairs(
            KNOWN_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value))),
        )
    }

    /// Build from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v): &(String, String)| !v.trim().is_empty())
            .collect();
        Self { values }
    }

    /// Value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of `name`.
    ///
    /// # Errors
    /// Returns [`CheckError::MissingCredential`] when the variable is unset.
    pub fn require(&self, name: &str) -> Result<&str, CheckError> {
        self.get(name)
            .ok_or_else(|| CheckError::MissingCredential(name.to_string()))
    }

    /// Names of the variables that are set.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_require_missing() {
        let secrets = Secrets::from_pairs([("STRIPE_SECRET_KEY", "sk_test")]);
        assert_eq!(secrets.require("STRIPE_SECRET_KEY").unwrap(), "sk_test");
        assert_eq!(
            secrets.require("OPENAI_API_KEY").unwrap_err(),
            CheckError::MissingCredential("OPENAI_API_KEY".to_string())
        );
    }

    #[test]
    fn test_blank_is_absent() {
        let secrets = Secrets::from_pairs([("RENDER_API_KEY", "  ")]);
        assert!(secrets.get("RENDER_API_KEY").is_none());
    }

    #[test]
    fn test_debug_hides_values() {
        let secrets = Secrets::from_pairs([("OPENAI_API_KEY", "sk-live-secret")]);
        let debug = format!("{secrets:?}");
        assert!(debug.contains("OPENAI_API_KEY"));
        assert!(!debug.contains("sk-live-secret"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_known_vars_only() {
        std::env::set_var("DID_API_KEY", "did-key");
        std::env::set_var("YOBOT_UNRELATED", "x");

        let secrets = Secrets::from_env();
        assert_eq!(secrets.get("DID_API_KEY"), Some("did-key"));
        assert!(secrets.get("YOBOT_UNRELATED").is_none());

        std::env::remove_var("DID_API_KEY");
        std::env::remove_var("YOBOT_UNRELATED");
    }
}
