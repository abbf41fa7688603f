//! Model settings and environment loading.

use crate::error::{Result, StreamError};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "KITCHENCRAFT_MODEL";
pub const ENV_TEMPERATURE: &str = "KITCHENCRAFT_TEMPERATURE";

/// Settings applied to every request built from an
/// [`ExecCtx`](crate::ExecCtx).
///
/// ```
/// use kitchencraft_stream::LlmConfig;
///
/// let config = LlmConfig::default().with_temperature(0.2).with_max_tokens(512);
/// assert_eq!(config.tokens_for(2048), 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Model identifier sent to the provider.
    pub model: String,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f64,

    /// Overrides every template's default token budget when set.
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Token budget for a request whose template suggests `default`.
    pub fn tokens_for(&self, default: u32) -> u32 {
        self.max_tokens.unwrap_or(default)
    }

    /// Reject settings no provider accepts.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(StreamError::InvalidConfig("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(StreamError::InvalidConfig(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(StreamError::InvalidConfig("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

/// Provider settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

impl EnvSettings {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let temperature = match get(ENV_TEMPERATURE) {
            Some(raw) => Some(raw.parse::<f64>().map_err(|e| {
                StreamError::InvalidConfig(format!("{ENV_TEMPERATURE}={raw:?}: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            api_key: get(ENV_API_KEY),
            base_url: get(ENV_BASE_URL),
            model: get(ENV_MODEL),
            temperature,
        })
    }

    /// Apply the model settings over `base`.
    pub fn apply(&self, base: LlmConfig) -> LlmConfig {
        let mut config = base;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(t) = self.temperature {
            config.temperature = t;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_settings() {
        let env = EnvSettings::from_lookup(lookup(&[
            (ENV_API_KEY, "sk-test"),
            (ENV_BASE_URL, "http://localhost:8080/v1"),
            (ENV_MODEL, "llama3"),
            (ENV_TEMPERATURE, "0.2"),
        ]))
        .unwrap();
        assert_eq!(env.api_key.as_deref(), Some("sk-test"));
        assert_eq!(env.temperature, Some(0.2));

        let config = env.apply(LlmConfig::default());
        assert_eq!(config.model, "llama3");
        assert_eq!(config.temperature, 0.2);
    }

    #[test]
    fn blank_values_are_unset() {
        let env = EnvSettings::from_lookup(lookup(&[(ENV_MODEL, "  ")])).unwrap();
        assert_eq!(env, EnvSettings::default());
        assert_eq!(env.apply(LlmConfig::default()).model, DEFAULT_MODEL);
    }

    #[test]
    fn bad_temperature_is_config_error() {
        let err = EnvSettings::from_lookup(lookup(&[(ENV_TEMPERATURE, "warm")])).unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));
        assert!(err.to_string().contains(ENV_TEMPERATURE));
    }

    #[test]
    fn validate_ranges() {
        assert!(LlmConfig::default().validate().is_ok());
        assert!(LlmConfig::default().with_temperature(3.0).validate().is_err());
        assert!(LlmConfig::default().with_model("").validate().is_err());
        assert!(LlmConfig::default().with_max_tokens(0).validate().is_err());
    }
}
