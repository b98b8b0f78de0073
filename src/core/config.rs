use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Broker used when development mode is on and no server URL is configured.
pub const DEFAULT_AMQP_URL: &str = "amqp://messaging-rabbitmq";

pub const ENV_DEVELOPMENT_MODE: &str = "MESSAGE_BUS_DEVELOPMENT_MODE";
pub const ENV_AMQP_URL: &str = "MESSAGE_BUS_AMQP_URL";
pub const ENV_TOPICS: &str = "MESSAGE_BUS_TOPICS";
pub const ENV_COMPRESS_ENGINE: &str = "MESSAGE_BUS_COMPRESS_ENGINE";

/// Options accepted by [`MessageBusFactory::create`](crate::bus::MessageBusFactory::create).
///
/// Every field is optional so a partially written JSON document (or `{}`)
/// deserializes to the SNS backend with no topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageBusOptions {
    pub development_mode: bool,
    pub amqp_options: Option<AmqpOptions>,
    pub aws_sns_options: Option<AwsSnsOptions>,
}

/// AMQP backend settings.
///
/// Exchanges are declared as durable fanout exchanges on first use. A mapped
/// exchange that already exists on the broker must be a durable fanout
/// exchange too, otherwise the broker refuses the declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmqpOptions {
    pub server_url: Option<String>,
    /// Friendly name to exchange. Unmapped names publish to an exchange of the same name.
    pub friendly_names_to_exchange: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsSnsOptions {
    pub friendly_names_to_arn: Option<HashMap<String, String>>,
}

impl MessageBusOptions {
    pub fn development() -> Self {
        Self {
            development_mode: true,
            ..Default::default()
        }
    }

    /// # Errors
    ///
    /// Returns an error if `raw` is not valid JSON or a field has the wrong type.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Settings resolved once at process startup and injected into the factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusConfig {
    pub options: MessageBusOptions,
    pub default_compress_engine: Option<String>,
}

impl BusConfig {
    /// Reads the `MESSAGE_BUS_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `MESSAGE_BUS_TOPICS` is set but is not a JSON
    /// object of friendly name to topic ARN.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so callers and tests
    /// do not have to touch the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`BusConfig::from_env`].
    ///
    /// # Example
    ///
    /// ```
    /// use message_bus::BusConfig;
    ///
    /// let config = BusConfig::from_lookup(|key| match key {
    ///     "MESSAGE_BUS_COMPRESS_ENGINE" => Some("gzip".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.default_compress_engine.as_deref(), Some("gzip"));
    ///
    /// let broken = BusConfig::from_lookup(|key| {
    ///     (key == "MESSAGE_BUS_TOPICS").then(|| "[1, 2]".to_string())
    /// });
    /// assert!(broken.is_err());
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let development_mode = lookup(ENV_DEVELOPMENT_MODE)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        let amqp_options = non_empty(lookup(ENV_AMQP_URL)).map(|server_url| AmqpOptions {
            server_url: Some(server_url),
            friendly_names_to_exchange: None,
        });

        let aws_sns_options = match non_empty(lookup(ENV_TOPICS)) {
            Some(raw) => {
                let topics: HashMap<String, String> = serde_json::from_str(&raw)
                    .map_err(|e| format!("{}: {}", ENV_TOPICS, e))?;
                Some(AwsSnsOptions {
                    friendly_names_to_arn: Some(topics),
                })
            }
            None => None,
        };

        Ok(Self {
            options: MessageBusOptions {
                development_mode,
                amqp_options,
                aws_sns_options,
            },
            default_compress_engine: non_empty(lookup(ENV_COMPRESS_ENGINE)),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
