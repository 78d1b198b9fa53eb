// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Argument checks shared by every provider.
//!
//! All of these run before a provider touches its backend.

use crate::{Error, Result};

/// Rejects empty and whitespace-only keys.
///
/// # Errors
///
/// Returns `InvalidKey` for the `key` parameter.
///
/// # Examples
///
/// ```
/// use cacheplex_provider::validate::key;
///
/// assert!(key("user:1").is_ok());
/// assert!(key("  ").is_err());
/// ```
pub fn key(key: &str) -> Result<()> {
    identifier("key", key)
}

/// Rejects empty and whitespace-only identifiers such as index, scope or collection names.
///
/// # Errors
///
/// Returns `InvalidKey` naming `parameter`.
pub fn identifier(parameter: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_key(parameter));
    }
    Ok(())
}

/// Returns the trimmed value of a required option, or `InvalidConfiguration` when it is
/// missing or blank.
///
/// # Errors
///
/// Returns `InvalidConfiguration` naming `option`.
pub fn required_option<'a>(option: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::invalid_configuration(format!("'{option}' is required"))),
    }
}
