//! Provider configuration.
//!
//! The host passes the provider block as JSON. Connection settings left out of
//! it fall back to environment variables:
//!
//! | attribute | environment variable |
//! |---|---|
//! | `url` | `ZABBIX_SERVER_URL` |
//! | `username` | `ZABBIX_USER` |
//! | `password` | `ZABBIX_PASS` |

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::schema::{Attribute, Diagnostic, Schema, ValueValidator};
use crate::validation::validate;

/// Environment variable consulted for `url`.
pub const ENV_SERVER_URL: &str = "ZABBIX_SERVER_URL";
/// Environment variable consulted for `username`.
pub const ENV_USER: &str = "ZABBIX_USER";
/// Environment variable consulted for `password`.
pub const ENV_PASS: &str = "ZABBIX_PASS";

/// Settings used to reach the Zabbix API.
#[derive(Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ProviderConfig {
    /// Zabbix API endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`.
    #[serde(default)]
    pub url: String,
    /// API user name.
    #[serde(default)]
    pub username: String,
    /// API password.
    #[serde(default)]
    pub password: String,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub tls_insecure: bool,
    /// Run one remote operation at a time.
    #[serde(default)]
    pub serialize: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls_insecure", &self.tls_insecure)
            .field("serialize", &self.serialize)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_description(format!(
                        "Zabbix API url. May also be set with {}.",
                        ENV_SERVER_URL
                    ))
                    .with_validator(ValueValidator::StringIsNotWhiteSpace),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description(format!("Zabbix API user. May also be set with {}.", ENV_USER))
                    .with_validator(ValueValidator::StringIsNotWhiteSpace),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .with_description(format!(
                        "Zabbix API password. May also be set with {}.",
                        ENV_PASS
                    ))
                    .sensitive(),
            )
            .with_attribute(
                "tls_insecure",
                Attribute::optional_bool()
                    .with_description("Disable TLS certificate verification.")
                    .with_default(Value::Bool(false)),
            )
            .with_attribute(
                "serialize",
                Attribute::optional_bool()
                    .with_description("Serialize API calls; some Zabbix servers deadlock on parallel writes.")
                    .with_default(Value::Bool(false)),
            )
    }

    /// Parse a configuration block, consulting the process environment for
    /// missing connection settings.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Parse a configuration block with a custom environment lookup.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let diagnostics = validate(&Self::schema(), config);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        // unset attributes arrive as null
        let set = match config {
            Value::Object(map) => map
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Map::new(),
        };
        let mut parsed: ProviderConfig =
            serde_json::from_value(Value::Object(set)).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?;

        fill_from_env(&mut parsed.url, ENV_SERVER_URL, &env);
        fill_from_env(&mut parsed.username, ENV_USER, &env);
        fill_from_env(&mut parsed.password, ENV_PASS, &env);

        let missing: Vec<Diagnostic> = [
            ("url", &parsed.url, ENV_SERVER_URL),
            ("username", &parsed.username, ENV_USER),
            ("password", &parsed.password, ENV_PASS),
        ]
        .iter()
        .filter(|(_, value, _)| value.is_empty())
        .map(|(name, _, var)| {
            Diagnostic::error(format!("Missing required attribute '{}'", name))
                .with_detail(format!("Set '{}' in the provider block or export {}", name, var))
                .with_attribute(*name)
        })
        .collect();

        if missing.is_empty() {
            Ok(parsed)
        } else {
            Err(missing)
        }
    }
}

fn fill_from_env<F>(field: &mut String, var: &str, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if field.is_empty() {
        if let Some(value) = env(var) {
            *field = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_full_config() {
        let config = ProviderConfig::from_value_with_env(
            &json!({
                "url": "https://zabbix.local/api_jsonrpc.php",
                "username": "Admin",
                "password": "zabbix",
                "serialize": true
            }),
            no_env,
        )
        .unwrap();

        assert_eq!(config.url, "https://zabbix.local/api_jsonrpc.php");
        assert_eq!(config.username, "Admin");
        assert_eq!(config.password, "zabbix");
        assert!(config.serialize);
        assert!(!config.tls_insecure);
    }

    #[test]
    fn test_env_fallback() {
        let env: HashMap<&str, &str> = [
            (ENV_SERVER_URL, "http://env/api_jsonrpc.php"),
            (ENV_USER, "env-user"),
            (ENV_PASS, "env-pass"),
        ]
        .into_iter()
        .collect();

        let config = ProviderConfig::from_value_with_env(&json!({"username": "Admin"}), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.url, "http://env/api_jsonrpc.php");
        // explicit value wins over the environment
        assert_eq!(config.username, "Admin");
        assert_eq!(config.password, "env-pass");

        let config = ProviderConfig::from_value_with_env(&Value::Null, |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.username, "env-user");
    }

    #[test]
    fn test_null_attributes_are_unset() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"url": null, "username": "a", "password": "b"}),
            |key| (key == ENV_SERVER_URL).then(|| "http://env/api_jsonrpc.php".to_string()),
        )
        .unwrap();
        assert_eq!(config.url, "http://env/api_jsonrpc.php");
        assert_eq!(config.username, "a");

        let config = ProviderConfig::from_value_with_env(
            &json!({
                "url": "http://z",
                "username": "a",
                "password": "b",
                "tls_insecure": null,
                "serialize": null
            }),
            no_env,
        )
        .unwrap();
        assert!(!config.tls_insecure);
        assert!(!config.serialize);

        let diagnostics = ProviderConfig::from_value_with_env(
            &json!({"url": "http://z", "username": null, "password": "b"}),
            no_env,
        )
        .unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("username"));
    }

    #[test]
    fn test_missing_settings_reported() {
        let diagnostics =
            ProviderConfig::from_value_with_env(&json!({"url": "http://z"}), no_env).unwrap_err();

        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attributes, vec!["username", "password"]);
    }

    #[test]
    fn test_invalid_types_reported() {
        let diagnostics = ProviderConfig::from_value_with_env(
            &json!({"url": "http://z", "username": "a", "password": "b", "tls_insecure": "yes"}),
            no_env,
        )
        .unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("tls_insecure"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig {
            url: "http://z".to_string(),
            username: "Admin".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("Admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
