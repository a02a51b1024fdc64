use std::{env, ffi::OsString};

use thiserror::Error;

pub const API_KEY_VAR: &str = "MOMENTO_API_KEY";
pub const ENDPOINT_VAR: &str = "MOMENTO_ENDPOINT";

/// A required configuration value is absent or empty.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("The environment variable {variable} must be set.")]
pub struct MissingConfigurationError {
    pub variable: &'static str,
}

/// Configuration for a provisioning run.
///
/// Assembled once at startup. Values are kept exactly as found, including empty strings; deciding
/// whether they are usable is up to [`Settings::require_api_key`] and
/// [`Settings::require_endpoint`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    api_key: Option<String>,
    endpoint: Option<String>,
}

impl Settings {
    /// Read the settings from the process environment.
    ///
    /// A variable that is unset or not valid unicode counts as absent.
    pub fn from_env() -> Self {
        Self::from_vars(unicode_vars(env::vars_os()))
    }

    /// Read the settings from an explicit list of variables.
    ///
    /// Unknown keys are ignored. When a key repeats, the last value wins.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                API_KEY_VAR => settings.api_key = Some(value.into()),
                ENDPOINT_VAR => settings.endpoint = Some(value.into()),
                _ => {}
            }
        }
        settings
    }

    pub fn require_api_key(&self) -> Result<&str, MissingConfigurationError> {
        required(self.api_key.as_deref(), API_KEY_VAR)
    }

    pub fn require_endpoint(&self) -> Result<&str, MissingConfigurationError> {
        required(self.endpoint.as_deref(), ENDPOINT_VAR)
    }
}

/// Drop every variable whose key or value is not valid unicode.
fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn required<'a>(
    value: Option<&'a str>,
    variable: &'static str,
) -> Result<&'a str, MissingConfigurationError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(MissingConfigurationError { variable }),
    }
}
