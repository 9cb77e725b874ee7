//! Response handling shared by all clients

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

/// Checks the status code and deserializes a JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| {
            ClientError::ParseError(format!("Failed to parse JSON response: {}", e.without_url()))
        })
}

/// Checks the status code of a response whose body is ignored
pub(crate) async fn handle_empty_response(response: Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
