//! Session identifier generation.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Result, ServerError};

/// Random bytes behind every session identifier.
pub const SESSION_ID_BYTES: usize = 32;

/// Length of an encoded identifier.
pub const SESSION_ID_LEN: usize = 43;

/// Source of fresh session identifiers.
pub trait SessionIdGenerator: Send + Sync {
    /// Produce a new identifier, or fail if no entropy is available.
    fn generate(&self) -> Result<String>;
}

/// Generator drawing from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngIdGenerator;

impl SessionIdGenerator for OsRngIdGenerator {
    fn generate(&self) -> Result<String> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ServerError::Entropy(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

/// Whether `id` has the shape of an identifier produced by this crate.
pub fn is_well_formed(id: &str) -> bool {
    id.len() == SESSION_ID_LEN
        && URL_SAFE_NO_PAD
            .decode(id)
            .is_ok_and(|bytes| bytes.len() == SESSION_ID_BYTES)
}
