// src/config/helpers.rs
// Helper functions for loading environment variables

use anyhow::{Result, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub fn require_env(key: &str) -> Result<String> {
    let value = env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(anyhow!("required env var {} is empty", key));
    }
    Ok(value)
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn require_env_parsed<T: FromStr>(key: &str) -> Result<T>
where
    T::Err: Display,
{
    require_env(key)?
        .parse()
        .map_err(|e| anyhow!("failed to parse {}: {}", key, e))
}

pub fn env_parsed_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("failed to parse {}: {}", key, e)),
        None => Ok(default),
    }
}
