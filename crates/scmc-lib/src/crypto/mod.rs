//! Hashing and randomness helpers backed by `ring`.

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::{Result, ScmcError};

/// Fingerprint of a credential pair, used to recognise a cached login
/// without keeping the password around.
pub fn credential_fingerprint(username: &str, password: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(username.as_bytes());
    ctx.update(&[0]);
    ctx.update(password.as_bytes());
    hex_encode(ctx.finish().as_ref())
}

/// Random (version 4) UUID in its hyphenated lowercase form.
pub fn random_uuid_v4() -> Result<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ScmcError::Protocol("system random generator unavailable".into()))?;

    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex = hex_encode(&bytes);
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
