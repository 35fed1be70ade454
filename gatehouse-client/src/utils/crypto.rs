use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const KEY_CONTEXT: &[u8] = b"gatehouse/secure-store/v1";

/// Derive a 256-bit storage key from a configured passphrase.
pub fn derive_key(secret: &Secret<String>) -> Result<[u8; 32], anyhow::Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(KEY_CONTEXT);

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

/// AES-256-GCM seal. Output is `nonce || ciphertext`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Failed to create cipher: {}", e))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

    let mut sealed = nonce_bytes.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
    if sealed.len() < NONCE_LEN {
        return Err(anyhow::anyhow!("Ciphertext too short"));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Failed to create cipher: {}", e))?;

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(passphrase: &str) -> [u8; 32] {
        derive_key(&Secret::new(passphrase.to_string())).unwrap()
    }

    #[test]
    fn test_derive_key_is_stable() {
        assert_eq!(key("gate-secret"), key("gate-secret"));
        assert_ne!(key("gate-secret"), key("other-secret"));
    }

    #[test]
    fn test_seal_then_open() {
        let k = key("gate-secret");
        let sealed = seal(&k, b"{\"is_logged\":true}").unwrap();

        assert_ne!(&sealed[NONCE_LEN..], b"{\"is_logged\":true}");
        assert_eq!(open(&k, &sealed).unwrap(), b"{\"is_logged\":true}");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = seal(&key("gate-secret"), b"payload").unwrap();
        assert!(open(&key("other-secret"), &sealed).is_err());
    }

    #[test]
    fn test_open_rejects_truncated_input() {
        assert!(open(&key("gate-secret"), &[1, 2, 3]).is_err());
    }
}
