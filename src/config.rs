//! Runtime configuration from environment variables.

use crate::logic::RestartPolicy;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Number of courts; match courts run 1..=courts.
    pub courts: u32,
    pub restart_policy: RestartPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            courts: 4,
            restart_policy: RestartPolicy::KeepScores,
        }
    }
}

impl Config {
    /// Read HOST, PORT, COURTS, and RESTART_CLEARS_SCORES. Bad values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let clears = parse_or(&lookup, "RESTART_CLEARS_SCORES", false);
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            courts: parse_or(&lookup, "COURTS", defaults.courts).max(1),
            restart_policy: if clears {
                RestartPolicy::ClearScores
            } else {
                RestartPolicy::KeepScores
            },
        }
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
    }
}
