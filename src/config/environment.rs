//! Deployment environment selecting the `{env}.toml` overlay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

/// Canonical names followed by the short aliases accepted on input.
const NAMES: &[(Environment, &str, &[&str])] = &[
    (Environment::Development, "development", &["dev"]),
    (Environment::Test, "test", &[]),
    (Environment::Staging, "staging", &["stage"]),
    (Environment::Production, "production", &["prod"]),
];

impl Environment {
    /// Variable consulted by [`Environment::from_env`].
    pub const ENV_VAR: &'static str = "DEFERRED_APP_ENV";

    /// Reads `DEFERRED_APP_ENV`, falling back to development when it is unset
    /// or unrecognised.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(env, _, _)| env == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("development")
    }

    /// File name of the overlay loaded on top of `default.toml`.
    pub fn overlay_file(&self) -> String {
        format!("{}.toml", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        NAMES
            .iter()
            .find(|(_, name, aliases)| *name == wanted || aliases.contains(&wanted.as_str()))
            .map(|(env, _, _)| *env)
            .ok_or_else(|| {
                let valid: Vec<&str> = NAMES.iter().map(|(_, name, _)| *name).collect();
                ConfigError::EnvVarError(format!(
                    "Unknown environment '{s}', expected one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_parse_to_canonical_variant() {
        let cases = [
            ("dev", Environment::Development),
            ("stage", Environment::Staging),
            ("prod", Environment::Production),
            (" Test ", Environment::Test),
            ("PRODUCTION", Environment::Production),
        ];
        for (raw, expected) in cases {
            assert_eq!(raw.parse::<Environment>().unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn test_unknown_environment_lists_valid_names() {
        let err = "qa".parse::<Environment>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("qa"));
        assert!(message.contains("staging"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for (env, _, _) in NAMES {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), *env);
        }
    }

    #[test]
    fn test_overlay_file_name() {
        assert_eq!(Environment::Staging.overlay_file(), "staging.toml");
        assert_eq!(Environment::default().overlay_file(), "development.toml");
    }
}
