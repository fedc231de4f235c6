//! Validated access to environment variables.
//!
//! Values are trimmed; a variable holding only whitespace counts as unset.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvVarError {
    #[error("Environment variable '{name}' is not set")]
    NotFound { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    InvalidUtf8 { name: String },

    #[error("Environment variable '{name}' is empty")]
    Empty { name: String },

    #[error("Environment variable '{name}' has an invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Environment variable helpers used when building adapter configuration.
///
/// # Examples
///
/// ```no_run
/// use dataapi::utils::EnvUtils;
///
/// if EnvUtils::has_non_empty_var("DATAAPI_BASE_URL") {
///     let url = EnvUtils::get_validated_var("DATAAPI_BASE_URL")?;
///     println!("Data API at {url}");
/// }
///
/// let timeout: Option<u64> = EnvUtils::get_parsed_var("DATAAPI_TIMEOUT_MS")?;
/// # Ok::<(), dataapi::utils::EnvVarError>(())
/// ```
pub struct EnvUtils;

impl EnvUtils {
    pub fn has_non_empty_var(name: &str) -> bool {
        std::env::var(name).is_ok_and(|value| !value.trim().is_empty())
    }

    /// Returns the trimmed value of `name`.
    ///
    /// # Errors
    ///
    /// [`EnvVarError::NotFound`], [`EnvVarError::Empty`] or
    /// [`EnvVarError::InvalidUtf8`].
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// `None` when the variable is unset, empty or not valid UTF-8.
    pub fn get_optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }

    /// Parses an optional variable. Unset is `Ok(None)`; a value that does not
    /// parse is an error rather than silently ignored.
    pub fn get_parsed_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = Self::get_optional_var(name) else {
            return Ok(None);
        };

        value
            .parse::<T>()
            .map(Some)
            .map_err(|e| EnvVarError::Invalid {
                name: name.to_string(),
                value,
                reason: e.to_string(),
            })
    }
}
