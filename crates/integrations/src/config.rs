//! Configuration for the webhook service.

use std::env;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Webhook service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Table for demo requests and captured leads.
    pub leads_table: String,
    /// Table for Zendesk tickets.
    pub support_table: String,
    /// Table for HubSpot events.
    pub crm_table: String,
    /// Table for voice-bot call summaries.
    pub voicebot_table: String,
    /// Zendesk webhook signing secret; signatures are checked when set.
    pub zendesk_secret: Option<String>,
    /// HubSpot app client secret; signatures are checked when set.
    pub hubspot_secret: Option<String>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Send a confirmation SMS to leads that leave a phone number.
    pub lead_sms: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("YOBOT_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            leads_table: env::var("YOBOT_LEADS_TABLE").unwrap_or_else(|_| "Leads".to_string()),
            support_table: env::var("YOBOT_SUPPORT_TABLE")
                .unwrap_or_else(|_| "Support Tickets".to_string()),
            crm_table: env::var("YOBOT_CRM_TABLE").unwrap_or_else(|_| "CRM Events".to_string()),
            voicebot_table: env::var("YOBOT_VOICEBOT_TABLE")
                .unwrap_or_else(|_| "VoiceBot Logs".to_string()),
            zendesk_secret: env::var("ZENDESK_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            hubspot_secret: env::var("HUBSPOT_CLIENT_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            max_body_bytes: env::var("YOBOT_MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            lead_sms: env::var("YOBOT_LEAD_SMS")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
                .unwrap_or(true),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("leads_table", &self.leads_table)
            .field("support_table", &self.support_table)
            .field("crm_table", &self.crm_table)
            .field("voicebot_table", &self.voicebot_table)
            .field("zendesk_secret", &self.zendesk_secret.as_ref().map(|_| "***"))
            .field("hubspot_secret", &self.hubspot_secret.as_ref().map(|_| "***"))
            .field("max_body_bytes", &self.max_body_bytes)
            .field("lead_sms", &self.lead_sms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "YOBOT_PORT",
        "YOBOT_LEADS_TABLE",
        "YOBOT_SUPPORT_TABLE",
        "YOBOT_LEAD_SMS",
        "ZENDESK_WEBHOOK_SECRET",
        "YOBOT_MAX_BODY_BYTES",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.leads_table, "Leads");
        assert_eq!(config.support_table, "Support Tickets");
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.lead_sms);
        assert!(config.zendesk_secret.is_none());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear();
        env::set_var("YOBOT_PORT", "9090");
        env::set_var("YOBOT_LEADS_TABLE", "Demo Requests");
        env::set_var("YOBOT_LEAD_SMS", "off");
        env::set_var("ZENDESK_WEBHOOK_SECRET", "");

        let config = Config::default();
        assert_eq!(config.port, 9090);
        assert_eq!(config.leads_table, "Demo Requests");
        assert!(!config.lead_sms);
        assert!(config.zendesk_secret.is_none());

        clear();
    }

    #[test]
    #[serial]
    fn test_debug_redacts_secrets() {
        clear();
        env::set_var("ZENDESK_WEBHOOK_SECRET", "zd-signing-secret");
        let debug = format!("{:?}", Config::default());
        assert!(!debug.contains("zd-signing-secret"));
        clear();
    }
}
