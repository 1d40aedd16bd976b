use std::fmt::Write;

use sha2::{Digest, Sha256};

const SETTLEMENT_DOMAIN: &[u8] = b"cdp-liquidation/settlement:";

/// Derive the placeholder settlement reference for a liquidation.
///
/// The reference has the shape of a transaction hash (`0x` + 64 hex chars)
/// and depends only on the position identifier. No transaction is built or
/// broadcast.
pub fn settlement_reference(position_id: &str) -> Result<String, std::fmt::Error> {
    let mut hasher = Sha256::new();
    hasher.update(SETTLEMENT_DOMAIN);
    hasher.update(position_id.as_bytes());
    let digest = hasher.finalize();

    let mut reference = String::with_capacity(2 + digest.len() * 2);
    reference.push_str("0x");
    for byte in digest.iter() {
        write!(reference, "{byte:02x}")?;
    }
    Ok(reference)
}
