//! Message and SIP-018 structured-data signature verification.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, SECP256K1};
use sha2::{Digest, Sha256};

use super::c32::{c32_address, c32_address_decode, C32Error};

/// Prefix hashed ahead of plain signed messages.
const MESSAGE_PREFIX: &[u8] = b"\x18Stacks Message Signing:\n";

/// Prefix hashed ahead of SIP-018 structured data.
const SIP018_PREFIX: &[u8] = b"SIP018";

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 65 bytes, got {0}")]
    BadSignatureLength(usize),
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] C32Error),
}

/// Bitcoin-style variable-length integer.
fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Hash of a plain message: `sha256(prefix || varint(len) || message)`.
pub fn message_hash(message: &[u8]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(MESSAGE_PREFIX.len() + 9 + message.len());
    preimage.extend_from_slice(MESSAGE_PREFIX);
    write_varint(&mut preimage, message.len() as u64);
    preimage.extend_from_slice(message);
    Sha256::digest(&preimage).into()
}

/// SIP-018 structured-data hash:
/// `sha256("SIP018" || sha256(domain) || sha256(message))` over the
/// clarity-serialized domain tuple and message value.
pub fn sip018_hash(domain_bytes: &[u8], message_bytes: &[u8]) -> [u8; 32] {
    let domain_hash = Sha256::digest(domain_bytes);
    let message_hash = Sha256::digest(message_bytes);
    let mut preimage = Vec::with_capacity(SIP018_PREFIX.len() + 64);
    preimage.extend_from_slice(SIP018_PREFIX);
    preimage.extend_from_slice(&domain_hash);
    preimage.extend_from_slice(&message_hash);
    Sha256::digest(&preimage).into()
}

/// hash160 of a compressed public key.
fn pubkey_hash160(key: &PublicKey) -> [u8; 20] {
    use ripemd::Ripemd160;
    let sha = Sha256::digest(key.serialize());
    let rip = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&rip);
    out
}

fn recover_candidates(hash: &[u8; 32], signature: &[u8]) -> Result<Vec<PublicKey>, SignatureError> {
    if signature.len() != 65 {
        return Err(SignatureError::BadSignatureLength(signature.len()));
    }
    let msg = Message::from_digest(*hash);

    // Signatures arrive RSV (recovery byte last) from current tooling;
    // older stacks wallets emitted VRS. Recover under both layouts and
    // let the caller match against the expected address.
    let layouts: [(u8, &[u8]); 2] = [(signature[64], &signature[..64]), (signature[0], &signature[1..])];
    let mut keys = Vec::new();
    for (rec_byte, rs) in layouts {
        // Ethereum-style signatures offset the recovery id by 27.
        let rec_byte = if rec_byte >= 27 { rec_byte - 27 } else { rec_byte };
        if rec_byte > 3 {
            continue;
        }
        let Ok(rec_id) = RecoveryId::from_i32(rec_byte as i32) else {
            continue;
        };
        let Ok(sig) = RecoverableSignature::from_compact(rs, rec_id) else {
            continue;
        };
        if let Ok(key) = SECP256K1.recover_ecdsa(&msg, &sig) {
            keys.push(key);
        }
    }
    Ok(keys)
}

/// Verifies a plain signed message against a Stacks address.
///
/// Recovers the signer's public key from the 65-byte signature and
/// checks that its hash160 matches the address.
pub fn verify_message(
    message: &[u8],
    signature: &[u8],
    address: &str,
) -> Result<bool, SignatureError> {
    let decoded = c32_address_decode(address)?;
    let hash = message_hash(message);
    let candidates = recover_candidates(&hash, signature)?;
    Ok(candidates
        .iter()
        .any(|key| c32_address(decoded.version, &pubkey_hash160(key)) == address))
}

/// Verifies a SIP-018 structured-data signature against a public key.
///
/// `domain_bytes` and `message_bytes` are the clarity-serialized domain
/// tuple and message value; the signature is 64-byte compact RS or
/// 65-byte with recovery byte (ignored).
pub fn verify_sip018(
    domain_bytes: &[u8],
    message_bytes: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool, SignatureError> {
    let rs: &[u8] = match signature.len() {
        64 => signature,
        65 => &signature[..64],
        other => return Err(SignatureError::BadSignatureLength(other)),
    };
    let sig = Signature::from_compact(rs).map_err(|_| SignatureError::InvalidSignature)?;
    let key = PublicKey::from_slice(public_key).map_err(|_| SignatureError::InvalidPublicKey)?;

    let hash = sip018_hash(domain_bytes, message_bytes);
    let msg = Message::from_digest(hash);
    Ok(SECP256K1.verify_ecdsa(&msg, &sig, &key).is_ok())
}
