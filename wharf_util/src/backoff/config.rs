use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Defines a collection of fine-tune parameters for an
/// [exponential backoff](backoff::ExponentialBackoff) mechanism.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub(crate) initial_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub(crate) max_interval: Duration,
    pub(crate) randomization_factor: f64,
    pub(crate) multiplier: f64,
    #[serde(deserialize_with = "deserialize_optional_duration")]
    pub(crate) max_elapsed_time: Option<Duration>,
}

impl BackoffConfig {
    /// Exposes the
    /// [initial interval](backoff::ExponentialBackoffBuilder::with_initial_interval)
    /// of this exponential backoff definition.
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Exposes the
    /// [max interval](backoff::ExponentialBackoffBuilder::with_max_interval)
    /// of this exponential backoff definition.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Exposes the
    /// [randomization factor](backoff::ExponentialBackoffBuilder::with_randomization_factor)
    /// of this exponential backoff definition.
    pub fn randomization_factor(&self) -> f64 {
        self.randomization_factor
    }

    /// Exposes the
    /// [multiplier](backoff::ExponentialBackoffBuilder::with_multiplier)
    /// of this exponential backoff definition.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Exposes the
    /// [max elapsed time](backoff::ExponentialBackoffBuilder::with_max_elapsed_time)
    /// of this exponential backoff definition.
    pub fn max_elapsed_time(&self) -> Option<Duration> {
        self.max_elapsed_time
    }

    /// Builds a [`BackoffConfig`] that retries forever at a single, constant
    /// interval, with no randomization applied.
    ///
    /// This is the shape used by a plain reconnect loop that does not want
    /// exponential growth between attempts.
    pub fn constant(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            randomization_factor: 0.0,
            multiplier: 1.0,
            max_elapsed_time: None,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(60),
            randomization_factor: 0.5,
            multiplier: 2.0,
            max_elapsed_time: None,
        }
    }
}

impl AsRef<BackoffConfig> for BackoffConfig {
    fn as_ref(&self) -> &BackoffConfig {
        self
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    raw.map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_values() {
        let config = BackoffConfig::default();

        assert_eq!(config.initial_interval(), Duration::from_secs(3));
        assert_eq!(config.max_interval(), Duration::from_secs(60));
        assert_eq!(config.randomization_factor(), 0.5);
        assert_eq!(config.multiplier(), 2.0);
        assert_eq!(config.max_elapsed_time(), None);
    }

    #[test]
    fn constant_shape() {
        let config = BackoffConfig::constant(Duration::from_secs(1));

        assert_eq!(config.initial_interval(), config.max_interval());
        assert_eq!(config.multiplier(), 1.0);
        assert_eq!(config.randomization_factor(), 0.0);
    }

    #[test]
    fn deserialize_from_yaml() {
        let input = r#"
initial_interval: 500ms
max_interval: 10s
randomization_factor: 0.25
multiplier: 1.5
max_elapsed_time: 1min
"#;

        let config: BackoffConfig = serde_yml::from_str(input).unwrap();

        assert_eq!(config.initial_interval(), Duration::from_millis(500));
        assert_eq!(config.max_interval(), Duration::from_secs(10));
        assert_eq!(config.randomization_factor(), 0.25);
        assert_eq!(config.multiplier(), 1.5);
        assert_eq!(config.max_elapsed_time(), Some(Duration::from_secs(60)));
    }
}
