// src/config/helpers.rs
// Helper functions for reading configuration values

use std::str::FromStr;

use crate::error::{Result, TrackerError};

/// Source of raw configuration values, keyed by variable name
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Strips inline ` # comments` and surrounding whitespace, treating blanks as unset.
///
/// A `#` only opens a comment at the start or after whitespace, so values such
/// as tokens or URL fragments keep theirs.
fn clean(raw: String) -> Option<String> {
    let comment = raw
        .char_indices()
        .find(|&(i, c)| c == '#' && raw[..i].chars().next_back().is_none_or(char::is_whitespace))
        .map_or(raw.len(), |(i, _)| i);
    let value = raw[..comment].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn require_env(env: &impl EnvSource, key: &str) -> Result<String> {
    env.get(key)
        .and_then(clean)
        .ok_or_else(|| TrackerError::config(format!("missing required env var: {key}")))
}

pub fn env_or(env: &impl EnvSource, key: &str, default: &str) -> String {
    env.get(key)
        .and_then(clean)
        .unwrap_or_else(|| default.to_string())
}

pub fn env_parsed<T>(env: &impl EnvSource, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(key).and_then(clean) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| TrackerError::config(format!("failed to parse {key}={value}: {e}"))),
    }
}
