//! Service settings loaded from `SMART_REPLY_*` environment variables.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use secrecy::SecretString;

use crate::drafts::GeneratorConfig;
use crate::error::ConfigError;
use crate::llm::LlmConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(ConfigError::InvalidValue {
                key: "SMART_REPLY_ENVIRONMENT".into(),
                message: format!("'{other}' is not one of local, dev, prod"),
            }),
        }
    }
}

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    /// Shared secret for `x-api-key`. `None` disables the check.
    pub api_key: Option<SecretString>,
    pub rate_limit_per_minute: u32,
    pub bind_addr: SocketAddr,
    /// Provider settings. `None` keeps generation local.
    pub llm: Option<LlmConfig>,
    pub uk_english: bool,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("SMART_REPLY_ENVIRONMENT")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let rate_limit_per_minute = match get("SMART_REPLY_RATE_LIMIT_PER_MINUTE") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SMART_REPLY_RATE_LIMIT_PER_MINUTE".into(),
                        message: format!("'{raw}' is not a positive integer"),
                    });
                }
            },
            None => DEFAULT_RATE_LIMIT_PER_MINUTE,
        };

        let bind_raw = get("SMART_REPLY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "SMART_REPLY_BIND_ADDR".into(),
                message: format!("'{bind_raw}': {e}"),
            })?;

        let uk_english = match get("SMART_REPLY_UK_ENGLISH") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "SMART_REPLY_UK_ENGLISH".into(),
                message: format!("'{raw}' is not a boolean"),
            })?,
            None => true,
        };

        let llm = get("SMART_REPLY_LLM_API_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .map(|key| {
                let mut config = LlmConfig::new(
                    SecretString::from(key),
                    get("SMART_REPLY_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                );
                config.base_url =
                    get("SMART_REPLY_LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                config
            });

        Ok(Self {
            environment,
            api_key: get("SMART_REPLY_API_KEY").map(SecretString::from),
            rate_limit_per_minute,
            bind_addr,
            llm,
            uk_english,
        })
    }

    /// Generator tuning derived from these settings.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            uk_english_default: self.uk_english,
            ..GeneratorConfig::default()
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.environment, Environment::Local);
        assert!(settings.api_key.is_none());
        assert_eq!(settings.rate_limit_per_minute, 60);
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8000");
        assert!(settings.llm.is_none());
        assert!(settings.uk_english);
        assert!(settings.generator_config().uk_english_default);
    }

    #[test]
    fn provider_key_enables_llm_with_defaults() {
        let settings = load(&[("SMART_REPLY_LLM_API_KEY", "sk-live")]).unwrap();
        let llm = settings.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-live");
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn openai_key_is_a_fallback() {
        let settings = load(&[
            ("OPENAI_API_KEY", "sk-fallback"),
            ("SMART_REPLY_LLM_MODEL", "gpt-4o"),
            ("SMART_REPLY_LLM_BASE_URL", "http://localhost:11434/v1"),
        ])
        .unwrap();
        let llm = settings.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-fallback");
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = load(&[
            ("SMART_REPLY_ENVIRONMENT", "prod"),
            ("SMART_REPLY_API_KEY", "secret"),
            ("SMART_REPLY_RATE_LIMIT_PER_MINUTE", "5"),
            ("SMART_REPLY_BIND_ADDR", "127.0.0.1:9000"),
            ("SMART_REPLY_UK_ENGLISH", "false"),
        ])
        .unwrap();
        assert_eq!(settings.environment, Environment::Prod);
        assert_eq!(settings.api_key.unwrap().expose_secret(), "secret");
        assert_eq!(settings.rate_limit_per_minute, 5);
        assert_eq!(settings.bind_addr.port(), 9000);
        assert!(!settings.uk_english);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("SMART_REPLY_ENVIRONMENT", "staging")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(load(&[("SMART_REPLY_RATE_LIMIT_PER_MINUTE", "0")]).is_err());
        assert!(load(&[("SMART_REPLY_RATE_LIMIT_PER_MINUTE", "many")]).is_err());
        assert!(load(&[("SMART_REPLY_BIND_ADDR", "nowhere")]).is_err());
        assert!(load(&[("SMART_REPLY_UK_ENGLISH", "maybe")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = load(&[("SMART_REPLY_API_KEY", "  "), ("OPENAI_API_KEY", "")]).unwrap();
        assert!(settings.api_key.is_none());
        assert!(settings.llm.is_none());
    }
}
