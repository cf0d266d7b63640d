//! Session configuration.
//!
//! Loaded once at startup from a flat TOML key table. Recognized keys are
//! dispatched through a fixed lookup onto typed setters; unknown keys are
//! reported with a diagnostic and ignored, never fatal.
//!
//! After loading, [`SessionConfig::finalize`] derives the immutable
//! protocol identifiers: call-id (random, generated exactly once per
//! process), device-id, account URI and the subscriber-info dereference
//! URL (reference template with placeholder substitution).

use std::path::Path;

use tracing::warn;
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::protocol::{
    expand_template, PURPOSE_CALL_ID, PURPOSE_DEVICE_ID, PURPOSE_SUBSCRIBER_INFO, URN_SERVICE,
};

/// Default country code when no override is given.
pub const DEFAULT_COUNTRY: &str = "AT";

/// Long-lived session configuration record.
///
/// Created once at startup; the derived identifier fields are set exactly
/// once by [`finalize`](Self::finalize) and are immutable thereafter.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SIP registrar domain.
    pub domain: Option<String>,
    /// Account user name.
    pub user: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Device identifier (raw, from config).
    pub device: Option<String>,
    /// Outbound proxy URI.
    pub proxy: Option<String>,

    /// Latitude, verbatim string as configured.
    pub lat: String,
    /// Longitude, verbatim string as configured.
    pub lon: String,
    /// Uncertainty radius in meters; 0 selects a point geometry.
    pub radius: u32,
    /// ISO country code; CLI override or [`DEFAULT_COUNTRY`].
    pub country: String,

    /// Subscriber-info reference template with `${device_id}` and
    /// `${api_key}` placeholders.
    pub reference: Option<String>,
    /// Device entity dereference URL (raw).
    pub device_entity: Option<String>,
    /// Registration id (raw).
    pub registration_id: Option<String>,
    /// API key substituted (URL-encoded) into the reference template.
    pub api_key: Option<String>,
    /// Expected reply text for armed validation exchanges.
    pub expected_reply: Option<String>,

    /// Person fields for the identity document.
    pub surname: Option<String>,
    /// Given name.
    pub given: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Street address.
    pub street: Option<String>,
    /// Locality.
    pub locality: Option<String>,
    /// Postal code.
    pub code: Option<String>,

    /// Console log verbosity (0..=6, pjsip-style levels).
    pub debug: u8,
    /// Attach the test marker header to every outbound message.
    pub test_header: bool,

    /// Derived call-id `Call-Info` value; generated exactly once.
    pub call_id: Option<String>,
    /// Derived device-id `Call-Info` value.
    pub device_id: Option<String>,
    /// Derived subscriber-info `Call-Info` value.
    pub subscriber_info: Option<String>,
    /// Derived account URI (`sip:user@domain`).
    pub account_uri: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: None,
            user: None,
            password: None,
            device: None,
            proxy: None,
            lat: String::new(),
            lon: String::new(),
            radius: 0,
            country: DEFAULT_COUNTRY.to_string(),
            reference: None,
            device_entity: None,
            registration_id: None,
            api_key: None,
            expected_reply: None,
            surname: None,
            given: None,
            phone: None,
            email: None,
            street: None,
            locality: None,
            code: None,
            debug: 0,
            test_header: false,
            call_id: None,
            device_id: None,
            subscriber_info: None,
            account_uri: None,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a flat TOML key table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse a flat TOML key table.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse()?;
        let mut config = Self::default();
        for (key, value) in &table {
            config.apply_key(key, value);
        }
        Ok(config)
    }

    /// Apply one recognized key through the typed setter table.
    ///
    /// Unknown keys are reported and ignored.
    fn apply_key(&mut self, key: &str, value: &toml::Value) {
        match key {
            "domain" => self.domain = as_string(value),
            "user" => self.user = as_string(value),
            "passwd" => self.password = as_string(value),
            "device" => self.device = as_string(value),
            "proxy" => self.proxy = as_string(value),
            "lat" => self.lat = as_string(value).unwrap_or_default(),
            "lon" => self.lon = as_string(value).unwrap_or_default(),
            "rad" => self.radius = as_u32(value).unwrap_or(0),
            "ref" => self.reference = as_string(value),
            "did" => self.device_entity = as_string(value),
            "rid" => self.registration_id = as_string(value),
            "api" => self.api_key = as_string(value),
            "eval" => self.expected_reply = as_string(value),
            "debug" => self.debug = as_u32(value).unwrap_or(0).min(6) as u8,
            "surname" => self.surname = as_string(value),
            "given" => self.given = as_string(value),
            "phone" => self.phone = as_string(value),
            "email" => self.email = as_string(value),
            "street" => self.street = as_string(value),
            "locality" => self.locality = as_string(value),
            "code" => self.code = as_string(value),
            _ => warn!(key, "unrecognised config key, ignored"),
        }
    }

    /// Derive the immutable protocol identifiers.
    ///
    /// Idempotent by construction: the call-id is generated only if not
    /// already present, preserving the once-per-process invariant.
    pub fn finalize(&mut self) {
        if self.call_id.is_none() {
            let token = Uuid::new_v4().to_string();
            self.call_id = Some(format!(
                "<urn:dec112:uid:callid:{token}:{URN_SERVICE}>;purpose={PURPOSE_CALL_ID}"
            ));
        }

        if self.device_id.is_none() {
            if let Some(device) = &self.device {
                self.device_id = Some(format!(
                    "<urn:dec112:uid:deviceid:{device}:{URN_SERVICE}>;purpose={PURPOSE_DEVICE_ID}"
                ));
            }
        }

        if self.account_uri.is_none() {
            if let (Some(user), Some(domain)) = (&self.user, &self.domain) {
                self.account_uri = Some(format!("sip:{user}@{domain}"));
            }
        }

        if self.subscriber_info.is_none() {
            if let Some(reference) = &self.reference {
                let encoded_key = self
                    .api_key
                    .as_deref()
                    .map(url_encode)
                    .unwrap_or_default();
                let url = expand_template(reference, |key| match key {
                    "device_id" => self.device.as_deref(),
                    "api_key" => Some(encoded_key.as_str()),
                    _ => None,
                });
                self.subscriber_info =
                    Some(format!("<{url}>;purpose={PURPOSE_SUBSCRIBER_INFO}"));
            }
        }
    }
}

fn as_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => {
            warn!(?value, "unsupported config value shape, ignored");
            None
        },
    }
}

fn as_u32(value: &toml::Value) -> Option<u32> {
    match value {
        toml::Value::Integer(i) => u32::try_from(*i).ok(),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Form-style URL encoding for the api-key template substitution.
fn url_encode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        domain = "example.org"
        user = "alice"
        passwd = "secret"
        device = "device-1"
        proxy = "sip:proxy.example.org;transport=tcp"
        lat = "48.2"
        lon = "16.3"
        rad = 40
        ref = "https://api.example.org/subscriber?d=${device_id}&k=${api_key}"
        rid = "reg-9"
        api = "key with spaces"
        eval = "OK"
        debug = 3
        surname = "Musterfrau"
        nonsense = "ignored"
    "#;

    #[test]
    fn test_recognized_keys_typed() {
        let config = SessionConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.domain.as_deref(), Some("example.org"));
        assert_eq!(config.radius, 40);
        assert_eq!(config.debug, 3);
        assert_eq!(config.expected_reply.as_deref(), Some("OK"));
        assert_eq!(config.surname.as_deref(), Some("Musterfrau"));
        assert_eq!(config.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        // "nonsense" must not fail the parse.
        let config = SessionConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_radius_accepts_string() {
        let config = SessionConfig::from_toml_str("rad = \"25\"").unwrap();
        assert_eq!(config.radius, 25);
    }

    #[test]
    fn test_finalize_derives_identifiers_once() {
        let mut config = SessionConfig::from_toml_str(SAMPLE).unwrap();
        config.finalize();

        let call_id = config.call_id.clone().unwrap();
        assert!(call_id.starts_with("<urn:dec112:uid:callid:"));
        assert!(call_id.ends_with(">;purpose=dec112-CallId"));
        // 36-char random token between the prefix and the service suffix.
        let token = call_id
            .strip_prefix("<urn:dec112:uid:callid:")
            .unwrap()
            .split(':')
            .next()
            .unwrap();
        assert_eq!(token.len(), 36);

        assert_eq!(
            config.device_id.as_deref(),
            Some("<urn:dec112:uid:deviceid:device-1:service.dec112.at>;purpose=dec112-DeviceId")
        );
        assert_eq!(config.account_uri.as_deref(), Some("sip:alice@example.org"));
        assert_eq!(
            config.subscriber_info.as_deref(),
            Some(
                "<https://api.example.org/subscriber?d=device-1&k=key+with+spaces>\
                 ;purpose=dec112-SubscriberInfo"
            )
        );

        // finalize is idempotent; the call id never changes.
        config.finalize();
        assert_eq!(config.call_id.as_deref(), Some(call_id.as_str()));
    }

    #[test]
    fn test_finalize_without_reference_leaves_url_unset() {
        let mut config = SessionConfig::default();
        config.finalize();
        assert!(config.subscriber_info.is_none());
        assert!(config.device_id.is_none());
        assert!(config.call_id.is_some());
    }
}
