//! Credential service endpoint

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handle_response;

#[derive(Debug, Serialize)]
struct DecryptRequest<'a> {
    owner: &'a str,
    ciphertext: &'a str,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

/// HTTP client for the credential service
#[derive(Debug, Clone)]
pub struct CredentialClient {
    base_url: String,
    client: Client,
}

impl CredentialClient {
    /// Create a credential client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the credential service (e.g., "http://localhost:8090")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Decrypt a secret value with the key of `owner`
    ///
    /// A rejected key or ciphertext comes back as a 4xx [`crate::ClientError::ApiError`].
    pub async fn decrypt(&self, owner: &str, ciphertext: &str) -> Result<String> {
        let url = format!("{}/api/credentials/decrypt", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&DecryptRequest { owner, ciphertext })
            .send()
            .await?;

        let body: DecryptResponse = handle_response(response).await?;
        Ok(body.plaintext)
    }
}
