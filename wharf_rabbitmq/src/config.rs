use crate::Handle;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Represents the application-level configuration section that covers
/// connectivity to a RabbitMQ cluster: the connection [`Handle`], the
/// reconnect interval, and the dial timeout.
///
/// Defaults mirror the broker's own defaults: a 1 second reconnect interval
/// and a 30 second dial timeout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    handle: Handle,
    #[serde(deserialize_with = "deserialize_duration")]
    reconnect_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    dial_timeout: Duration,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl BrokerConfig {
    /// The default reconnect interval: `1s`.
    pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

    /// The default dial timeout: `30s`.
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a new config wrapping the given [`Handle`], with default
    /// reconnect interval and dial timeout.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            reconnect_interval: Self::DEFAULT_RECONNECT_INTERVAL,
            dial_timeout: Self::DEFAULT_DIAL_TIMEOUT,
        }
    }

    /// Re-creates this config with the given reconnect interval.
    pub fn with_reconnect_interval(mut self, reconnect_interval: Duration) -> Self {
        self.reconnect_interval = reconnect_interval;
        self
    }

    /// Re-creates this config with the given dial timeout.
    pub fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    /// Returns the connection [`Handle`] for this configuration.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the interval waited between reconnect attempts.
    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    /// Returns the timeout allotted to a single dial attempt.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(Handle::default())
    }
}

impl AsRef<BrokerConfig> for BrokerConfig {
    fn as_ref(&self) -> &BrokerConfig {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty() {
        // Given
        let input = "{}";
        let expected_output = BrokerConfig::default();

        // When
        let actual_output = serde_yml::from_str::<BrokerConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }

    #[test]
    fn full() {
        // Given
        let input = r#"
handle:
  host: custom-domain.com
  port: 6879
reconnect_interval: 5s
dial_timeout: 1m
"#;
        let expected_output = BrokerConfig::new(Handle::new(
            "default",
            crate::DsnChunks {
                host: "custom-domain.com",
                port: 6879,
                ..Default::default()
            },
        ))
        .with_reconnect_interval(Duration::from_secs(5))
        .with_dial_timeout(Duration::from_secs(60));

        // When
        let actual_output = serde_yml::from_str::<BrokerConfig>(input).unwrap();

        // Then
        assert_eq!(expected_output, actual_output);
    }
}
