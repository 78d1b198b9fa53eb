// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Options for document store providers.

use serde::Deserialize;

/// Options for a [`DocumentCacheProvider`][crate::DocumentCacheProvider].
///
/// `bucket_name` is required and must name the bucket the factory is bound to.
///
/// # Examples
///
/// ```
/// use cacheplex_document::DocumentProviderOptions;
///
/// let options = DocumentProviderOptions::new("sessions");
/// assert_eq!(options.bucket_name_value(), Some("sessions"));
///
/// let loaded: DocumentProviderOptions = serde_json::from_str(r#"{ "bucket_name": "sessions" }"#).unwrap();
/// assert_eq!(loaded, options);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentProviderOptions {
    pub(crate) bucket_name: Option<String>,
}

impl DocumentProviderOptions {
    /// Creates options for the bucket named `bucket_name`.
    #[must_use]
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: Some(bucket_name.into()),
        }
    }

    /// Returns the configured bucket name.
    #[must_use]
    pub fn bucket_name_value(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }
}
