// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JSON text encoding used by providers that store values remotely.

use crate::{CacheValue, Error, Result};

/// Encodes a value as JSON text.
///
/// # Errors
///
/// Returns `InvalidValue` when the value serializes to JSON `null` (for example `None` or `()`),
/// and a backend error when serialization itself fails.
///
/// # Examples
///
/// ```
/// use cacheplex_provider::codec::encode;
///
/// assert_eq!(encode(&42).unwrap(), "42");
/// assert!(encode(&None::<i32>).is_err());
/// ```
pub fn encode<T: CacheValue>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value).map_err(|e| Error::backend("serializing value", e))?;
    if json.is_null() {
        return Err(Error::invalid_value("value"));
    }
    Ok(json.to_string())
}

/// Rejects values that serialize to JSON `null`.
///
/// Used by providers that store values natively and never encode them.
///
/// # Errors
///
/// Returns `InvalidValue` for the `value` parameter.
pub fn ensure_not_null<T: CacheValue>(value: &T) -> Result<()> {
    match serde_json::to_value(value) {
        Ok(json) if json.is_null() => Err(Error::invalid_value("value")),
        Ok(_) => Ok(()),
        Err(e) => Err(Error::backend("inspecting value", e)),
    }
}

/// Decodes JSON text previously written by [`encode`].
///
/// # Errors
///
/// Returns a backend error naming `key` when the stored text is not a valid `T`.
pub fn decode<T: CacheValue>(key: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::backend(format!("deserializing value for key '{key}'"), e))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn composite_values_keep_their_shape() {
        let profile = Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
        };

        let text = encode(&profile).unwrap();
        assert_eq!(decode::<Profile>("p", &text).unwrap(), profile);
    }

    #[test]
    fn null_values_are_rejected() {
        let err = encode(&()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "value" });
    }

    #[test]
    fn not_null_check_matches_encoding() {
        assert!(ensure_not_null(&0).is_ok());
        assert!(ensure_not_null(&Some("x".to_string())).is_ok());
        assert!(ensure_not_null(&None::<String>).is_err());
    }

    #[test]
    fn undecodable_text_is_a_backend_error_naming_the_key() {
        let err = decode::<i32>("counter", "\"not a number\"").unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("key 'counter'"));
    }
}
