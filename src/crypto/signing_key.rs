use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::Secret;

use crate::crypto::{TokenError, TokenResult};

/// HMAC-SHA256 key derived from the application secret
#[derive(Clone)]
pub struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    pub fn new(key: &Secret<String>) -> anyhow::Result<Self> {
        use secrecy::ExposeSecret;

        if key.expose_secret().is_empty() {
            anyhow::bail!("Signing key must not be empty");
        }
        let hmac = Hmac::new_from_slice(key.expose_secret().as_bytes())?;

        Ok(Self(hmac))
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.0
            .clone()
            .chain_update(msg)
            .finalize()
            .into_bytes()
            .to_vec()
    }

    /// Constant-time signature check
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> TokenResult<()> {
        self.0
            .clone()
            .chain_update(msg)
            .verify_slice(signature)
            .map_err(|_| TokenError::SignatureMismatch)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}
