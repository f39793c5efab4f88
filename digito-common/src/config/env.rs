//! `DIGITO_*` environment variables.
//!
//! Each accessor returns a [`Sourced`] value and never fails: a bad value is
//! recorded as an [`EnvError`] and the default is used instead, so every
//! problem can be reported in one go before the CLI refuses to start.

use super::source::Sourced;
use crate::errors::ErrorCode;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const PREFIX: &str = "DIGITO_";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: &'static str,
        value: String,
    },

    #[error("Path not found for {var}: {path}")]
    PathNotFound { var: String, path: PathBuf },

    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid log level for {var}: '{value}' (expected one of {})", LOG_LEVELS.join("|"))]
    InvalidLogLevel { var: String, value: String },

    /// Not shaped like `us-east-1` or `eu-central-2`.
    #[error("Invalid AWS region for {var}: '{value}'")]
    InvalidRegion { var: String, value: String },

    /// Violates the S3 bucket naming rules.
    #[error("Invalid S3 bucket name for {var}: '{value}' ({reason})")]
    InvalidBucketName {
        var: String,
        value: String,
        reason: &'static str,
    },
}

impl EnvError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PathNotFound { .. } => ErrorCode::ConfigPathNotFound,
            Self::InvalidRegion { .. } => ErrorCode::ConfigInvalidRegion,
            Self::InvalidValue { .. }
            | Self::OutOfRange { .. }
            | Self::InvalidLogLevel { .. }
            | Self::InvalidBucketName { .. } => ErrorCode::ConfigEnvError,
        }
    }
}

/// Reads `DIGITO_`-prefixed variables, accumulating errors.
#[derive(Debug, Default)]
pub struct EnvParser {
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Full variable name and its value, if set.
    fn read(name: &str) -> (String, Option<String>) {
        let var = format!("{PREFIX}{name}");
        let value = env::var(&var).ok();
        (var, value)
    }

    /// Accepts `1/true/yes/on` and `0/false/no/off` (or empty) in any case.
    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let (var, Some(raw)) = Self::read(name) else {
            return Sourced::default_value(default);
        };
        let parsed = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                self.errors.push(EnvError::InvalidValue {
                    var: var.clone(),
                    expected: "boolean (true/false/1/0/yes/no)",
                    value: raw,
                });
                default
            }
        };
        Sourced::from_env(parsed, var)
    }

    /// Numeric value within `min..=max`.
    pub fn get_in_range<T>(&mut self, name: &str, default: T, min: T, max: T) -> Sourced<T>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let (var, Some(raw)) = Self::read(name) else {
            return Sourced::default_value(default);
        };
        match raw.trim().parse::<T>() {
            Ok(n) if n >= min && n <= max => Sourced::from_env(n, var),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var: var.clone(),
                    value: n.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
                Sourced::from_env(default, var)
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: "unsigned integer",
                    value: raw,
                });
                Sourced::default_value(default)
            }
        }
    }

    /// Path with `~/` expanded against the home directory.
    pub fn get_path(&mut self, name: &str, default: &str, must_exist: bool) -> Sourced<PathBuf> {
        let (var, raw) = Self::read(name);
        let from_env = raw.is_some();
        let raw = raw.unwrap_or_else(|| default.to_string());

        let path = match (raw.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&raw),
        };
        if must_exist && !path.exists() {
            self.errors.push(EnvError::PathNotFound {
                var: var.clone(),
                path: path.clone(),
            });
        }

        if from_env {
            Sourced::from_env(path, var)
        } else {
            Sourced::default_value(path)
        }
    }

    /// A bare level (lower-cased) or a full tracing filter directive.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let (var, Some(raw)) = Self::read(name) else {
            return Sourced::default_value(default.to_string());
        };
        let lower = raw.trim().to_ascii_lowercase();
        if LOG_LEVELS.contains(&lower.as_str()) {
            return Sourced::from_env(lower, var);
        }
        if raw.contains('=') {
            return Sourced::from_env(raw, var);
        }
        self.errors.push(EnvError::InvalidLogLevel {
            var: var.clone(),
            value: raw,
        });
        Sourced::from_env(default.to_string(), var)
    }

    /// Comma-separated list; blank items are dropped.
    pub fn get_string_list(&mut self, name: &str, default: Vec<String>) -> Sourced<Vec<String>> {
        let (var, Some(raw)) = Self::read(name) else {
            return Sourced::default_value(default);
        };
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        Sourced::from_env(items, var)
    }

    /// `None` when unset or empty.
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        match Self::read(name) {
            (var, Some(raw)) => {
                let trimmed = raw.trim();
                Sourced::from_env((!trimmed.is_empty()).then(|| trimmed.to_string()), var)
            }
            (_, None) => Sourced::default_value(None),
        }
    }

    /// Optional region, checked for the `<area>-<direction>-<n>` shape.
    pub fn get_region(&mut self, name: &str) -> Sourced<Option<String>> {
        let sourced = self.get_optional_string(name);
        if let Some(region) = &sourced.value
            && !is_region_shaped(region)
        {
            self.errors.push(EnvError::InvalidRegion {
                var: format!("{PREFIX}{name}"),
                value: region.clone(),
            });
        }
        sourced
    }

    /// Optional S3 bucket name, checked against the bucket naming rules.
    pub fn get_bucket_name(&mut self, name: &str) -> Sourced<Option<String>> {
        let sourced = self.get_optional_string(name);
        if let Some(bucket) = &sourced.value
            && let Err(reason) = check_bucket_name(bucket)
        {
            self.errors.push(EnvError::InvalidBucketName {
                var: format!("{PREFIX}{name}"),
                value: bucket.clone(),
                reason,
            });
        }
        sourced
    }
}

/// `us-east-1`, `ap-southeast-2`, `us-gov-west-1`: lower-case words and a
/// trailing number, at least three segments.
pub fn is_region_shaped(region: &str) -> bool {
    let segments: Vec<&str> = region.split('-').collect();
    let Some((last, words)) = segments.split_last() else {
        return false;
    };
    segments.len() >= 3
        && !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
}

fn check_bucket_name(bucket: &str) -> Result<(), &'static str> {
    if !(3..=63).contains(&bucket.len()) {
        return Err("must be 3 to 63 characters");
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err("only lower-case letters, digits, '-' and '.' are allowed");
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(bucket.chars().next()) || !edge_ok(bucket.chars().last()) {
        return Err("must start and end with a letter or digit");
    }
    if bucket.contains("..") {
        return Err("must not contain consecutive dots");
    }
    Ok(())
}
