// Funding account key material
//
// Strkeys (`G...` account ids, `S...` secret seeds) are parsed with
// `stellar-strkey`; signing goes through ed25519-dalek.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey};
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

use crate::error::LedgerError;

/// Decode a `G...` account id into its raw ed25519 public key
pub fn decode_account_id(account_id: &str) -> Result<[u8; 32], LedgerError> {
    PublicKey::from_string(account_id)
        .map(|key| key.0)
        .map_err(|e| LedgerError::InvalidKey(format!("Account id '{}': {}", account_id, e)))
}

pub fn encode_account_id(public_key: &[u8; 32]) -> String {
    PublicKey(*public_key).to_string()
}

/// Ed25519 keypair of the funding account
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    account_id: String,
}

impl Keypair {
    /// Parse an `S...` secret seed
    pub fn from_secret_seed(seed: &str) -> Result<Self, LedgerError> {
        let secret = PrivateKey::from_string(seed.trim())
            .map_err(|e| LedgerError::InvalidKey(format!("Secret seed: {}", e)))?;
        let signing_key = SigningKey::from_bytes(&secret.0);
        let account_id = encode_account_id(&signing_key.verifying_key().to_bytes());

        Ok(Self {
            signing_key,
            account_id,
        })
    }

    /// `G...` address of this keypair
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Last four bytes of the public key, used by the network to pick the signer
    pub fn signature_hint(&self) -> [u8; 4] {
        let public = self.public_key();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&public[28..32]);
        hint
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}
