//! Best-effort encrypted JSON storage on top of a [`KeyValueStore`].

use base64::{engine::general_purpose, Engine as _};
use gatehouse_core::error::AppError;
use secrecy::Secret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use super::kv::KeyValueStore;
use crate::utils::crypto;

const ENVELOPE_VERSION: u8 = 1;
const ALG_AES_GCM: &str = "aes-256-gcm";
const ALG_NONE: &str = "none";

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    alg: String,
    data: serde_json::Value,
}

pub struct SecureStore {
    inner: Arc<dyn KeyValueStore>,
    key: Option<[u8; 32]>,
}

impl SecureStore {
    /// Without a secret, or if key derivation fails, values are stored in
    /// plain envelopes.
    pub fn new(inner: Arc<dyn KeyValueStore>, secret: Option<&Secret<String>>) -> Self {
        let key = secret.and_then(|s| match crypto::derive_key(s) {
            Ok(k) => Some(k),
            Err(e) => {
                tracing::warn!(error = %e, "Storage key derivation failed, falling back to plain storage");
                None
            }
        });

        Self { inner, key }
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let plaintext =
            serde_json::to_vec(value).map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        let envelope = match self.key.as_ref().map(|k| crypto::seal(k, &plaintext)) {
            Some(Ok(sealed)) => Envelope {
                v: ENVELOPE_VERSION,
                alg: ALG_AES_GCM.to_string(),
                data: serde_json::Value::String(general_purpose::STANDARD.encode(sealed)),
            },
            Some(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Encryption failed, storing plain value");
                plain_envelope(value)?
            }
            None => plain_envelope(value)?,
        };

        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        self.inner.set(key, &bytes).await
    }

    /// Unreadable entries (corrupt, wrong key, unknown format) read as
    /// absent. With a key configured, plain entries count as unreadable.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(bytes) = self.inner.get(key).await? else {
            return Ok(None);
        };

        match self.decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable stored value");
                Ok(None)
            }
        }
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.inner.remove(key).await
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, anyhow::Error> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.v != ENVELOPE_VERSION {
            return Err(anyhow::anyhow!("Unsupported envelope version {}", envelope.v));
        }

        match envelope.alg.as_str() {
            ALG_NONE if self.key.is_some() => {
                Err(anyhow::anyhow!("Plain value refused, encryption is configured"))
            }
            ALG_NONE => Ok(serde_json::from_value(envelope.data)?),
            ALG_AES_GCM => {
                let key = self
                    .key
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Encrypted value but no key configured"))?;
                let encoded = envelope
                    .data
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("Encrypted payload is not a string"))?;
                let sealed = general_purpose::STANDARD.decode(encoded)?;
                let plaintext = crypto::open(key, &sealed)?;
                Ok(serde_json::from_slice(&plaintext)?)
            }
            other => Err(anyhow::anyhow!("Unknown algorithm '{}'", other)),
        }
    }
}

fn plain_envelope<T: Serialize>(value: &T) -> Result<Envelope, AppError> {
    Ok(Envelope {
        v: ENVELOPE_VERSION,
        alg: ALG_NONE.to_string(),
        data: serde_json::to_value(value)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?,
    })
}
