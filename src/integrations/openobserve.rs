//! OpenObserve integration: basic-auth headers for its HTTP ingestion API.

use std::collections::BTreeMap;

use base64::Engine;

use crate::errors::{FoundationError, Result};

/// Build `Authorization` and `Content-Type` headers for OpenObserve.
pub fn get_basic_auth_headers(user: &str, password: &str) -> Result<BTreeMap<String, String>> {
    if user.is_empty() {
        return Err(FoundationError::Validation(
            "OpenObserve user cannot be empty".into(),
        ));
    }

    let credentials =
        base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), format!("Basic {credentials}"));
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    Ok(headers)
}
