//! Secret decryption
//!
//! Secret static properties are decrypted on the copies sent to nodes. A
//! property that cannot be decrypted stays encrypted and the operation goes
//! on; the outcome of every attempt is returned so it can be reported.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use weir_client::CredentialClient;
use weir_core::domain::element::{InvocableElement, SecretState};
use weir_core::domain::status::OperationWarning;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("no credential service configured")]
    Unavailable,

    #[error("credential service rejected the secret: {0}")]
    Rejected(String),

    #[error("credential service unreachable: {0}")]
    Transport(String),
}

/// Decrypts secret values on behalf of a pipeline owner
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn decrypt(&self, owner: &str, ciphertext: &str) -> Result<String, SecurityError>;
}

/// Credential service reached over HTTP
pub struct HttpCredentialService {
    client: CredentialClient,
}

impl HttpCredentialService {
    pub fn new(client: CredentialClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialService for HttpCredentialService {
    async fn decrypt(&self, owner: &str, ciphertext: &str) -> Result<String, SecurityError> {
        self.client.decrypt(owner, ciphertext).await.map_err(|err| {
            if err.is_client_error() {
                SecurityError::Rejected(err.to_string())
            } else {
                SecurityError::Transport(err.to_string())
            }
        })
    }
}

/// Used when no credential service is configured; every secret stays encrypted
pub struct UnavailableCredentials;

#[async_trait]
impl CredentialService for UnavailableCredentials {
    async fn decrypt(&self, _owner: &str, _ciphertext: &str) -> Result<String, SecurityError> {
        Err(SecurityError::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretOutcome {
    Decrypted,
    LeftEncrypted { reason: String },
}

/// Outcome of decrypting one secret property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretResolution {
    pub element_id: String,
    pub property: String,
    pub outcome: SecretOutcome,
}

impl SecretResolution {
    /// Warning to report for this property, if it stayed encrypted
    pub fn warning(&self) -> Option<OperationWarning> {
        match &self.outcome {
            SecretOutcome::Decrypted => None,
            SecretOutcome::LeftEncrypted { reason } => Some(OperationWarning::SecretLeftEncrypted {
                element_id: self.element_id.clone(),
                property: self.property.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Decrypt every encrypted secret of `elements` into copies
///
/// # Arguments
/// * `elements` - Elements as stored, left untouched
/// * `owner` - Pipeline owner whose key decrypts the secrets
/// * `credentials` - Credential service to use
///
/// # Returns
/// The copies to deploy and one resolution per encrypted property
pub async fn decrypt_secrets(
    elements: &[InvocableElement],
    owner: &str,
    credentials: &dyn CredentialService,
) -> (Vec<InvocableElement>, Vec<SecretResolution>) {
    let mut copies = Vec::with_capacity(elements.len());
    let mut resolutions = Vec::new();

    for element in elements {
        let (copy, resolved) = decrypt_element(element, owner, credentials).await;
        copies.push(copy);
        resolutions.extend(resolved);
    }

    (copies, resolutions)
}

/// Decrypt the encrypted secrets of one element into a copy
pub async fn decrypt_element(
    element: &InvocableElement,
    owner: &str,
    credentials: &dyn CredentialService,
) -> (InvocableElement, Vec<SecretResolution>) {
    let mut copy = element.clone();
    let mut resolutions = Vec::new();

    for property in copy.static_properties.iter_mut().filter(|p| p.is_encrypted_secret()) {
        let outcome = match credentials.decrypt(owner, &property.value).await {
            Ok(plaintext) => {
                property.value = plaintext;
                property.secret = Some(SecretState { encrypted: false });
                SecretOutcome::Decrypted
            }
            Err(err) => {
                warn!(
                    "Could not decrypt property {} of {}: {}",
                    property.internal_name, element.element_id, err
                );
                SecretOutcome::LeftEncrypted {
                    reason: err.to_string(),
                }
            }
        };
        resolutions.push(SecretResolution {
            element_id: element.element_id.clone(),
            property: property.internal_name.clone(),
            outcome,
        });
    }

    (copy, resolutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PrefixCredentials, sink};
    use weir_core::domain::element::StaticProperty;

    fn element_with_secrets() -> InvocableElement {
        let mut element = sink("k1", "n1", &[]);
        element.static_properties = vec![
            StaticProperty::plain("host", "db.local"),
            StaticProperty::encrypted("password", "enc:hunter2"),
            StaticProperty::encrypted("token", "garbage"),
        ];
        element
    }

    #[tokio::test]
    async fn test_decrypts_copies_and_leaves_original_encrypted() {
        let original = vec![element_with_secrets()];

        let (copies, resolutions) = decrypt_secrets(&original, "alice", &PrefixCredentials).await;

        assert_eq!(copies[0].static_properties[1].value, "hunter2");
        assert!(!copies[0].static_properties[1].is_encrypted_secret());
        assert_eq!(original[0].static_properties[1].value, "enc:hunter2");
        assert!(original[0].static_properties[1].is_encrypted_secret());

        // the failed one is kept as is and reported
        assert_eq!(copies[0].static_properties[2].value, "garbage");
        assert!(copies[0].static_properties[2].is_encrypted_secret());
        assert_eq!(resolutions.len(), 2);
        assert_eq!(resolutions[0].outcome, SecretOutcome::Decrypted);
        assert!(resolutions[0].warning().is_none());
        assert!(matches!(
            resolutions[1].warning(),
            Some(OperationWarning::SecretLeftEncrypted { ref property, .. }) if property == "token"
        ));
    }

    #[tokio::test]
    async fn test_unavailable_service_leaves_everything_encrypted() {
        let original = vec![element_with_secrets()];

        let (copies, resolutions) = decrypt_secrets(&original, "alice", &UnavailableCredentials).await;

        assert_eq!(copies, original);
        assert!(resolutions.iter().all(|r| r.warning().is_some()));
    }
}
