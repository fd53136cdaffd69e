//! Thin Stacks transaction envelope decoder.
//!
//! Summarizes the fixed-layout outer envelope of a serialized
//! transaction: version, chain id, auth, sender, nonce, fee, anchor and
//! post-condition modes, and the payload type when reachable. Payload
//! bodies and post-condition details are out of scope; this is a
//! diagnostic surface, not a consensus validator.

use serde_json::{json, Value};

use super::c32::{
    c32_address, VERSION_MAINNET_P2PKH, VERSION_TESTNET_P2PKH,
};

/// Transaction decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxDecodeError {
    #[error("transaction truncated at byte {0}")]
    Truncated(usize),
    #[error("unknown transaction version {0:#04x}")]
    UnknownVersion(u8),
    #[error("unsupported auth type {0:#04x}")]
    UnsupportedAuth(u8),
    #[error("unsupported spending condition hash mode {0:#04x}")]
    UnsupportedHashMode(u8),
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TxDecodeError> {
        if self.pos + n > self.bytes.len() {
            return Err(TxDecodeError::Truncated(self.pos));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, TxDecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32_be(&mut self) -> Result<u32, TxDecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64_be(&mut self) -> Result<u64, TxDecodeError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}

fn payload_type_name(id: u8) -> Option<&'static str> {
    match id {
        0x00 => Some("token-transfer"),
        0x01 => Some("smart-contract"),
        0x02 => Some("contract-call"),
        0x03 => Some("poison-microblock"),
        0x04 => Some("coinbase"),
        0x05 => Some("versioned-smart-contract"),
        0x06 => Some("tenure-change"),
        0x07 => Some("nakamoto-coinbase"),
        _ => None,
    }
}

/// Decodes the envelope of a serialized Stacks transaction.
pub fn decode_transaction(bytes: &[u8]) -> Result<Value, TxDecodeError> {
    let mut c = Cursor { bytes, pos: 0 };

    let version = c.u8()?;
    let (network, address_version) = match version {
        0x00 => ("mainnet", VERSION_MAINNET_P2PKH),
        0x80 => ("testnet", VERSION_TESTNET_P2PKH),
        other => return Err(TxDecodeError::UnknownVersion(other)),
    };
    let chain_id = c.u32_be()?;

    let auth_type = c.u8()?;
    let auth = match auth_type {
        0x04 => "standard",
        0x05 => "sponsored",
        other => return Err(TxDecodeError::UnsupportedAuth(other)),
    };

    // Origin spending condition. Single-sig hash modes carry a fixed
    // layout; multi-sig conditions are variable and stop the summary.
    let hash_mode = c.u8()?;
    if !matches!(hash_mode, 0x00 | 0x02) {
        return Err(TxDecodeError::UnsupportedHashMode(hash_mode));
    }
    let signer = c.take(20)?;
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(signer);
    let sender = c32_address(address_version, &hash160);
    let nonce = c.u64_be()?;
    let fee = c.u64_be()?;
    let _key_encoding = c.u8()?;
    let _signature = c.take(65)?;

    // Sponsored transactions carry a second spending condition; the
    // summary stops before it and reports what is known so far.
    let mut summary = json!({
        "network": network,
        "chainId": chain_id,
        "auth": auth,
        "sender": sender,
        "nonce": nonce,
        "fee": fee.to_string(),
        "payloadType": Value::Null,
    });

    if auth_type == 0x04 {
        let anchor_mode = c.u8()?;
        let post_condition_mode = c.u8()?;
        let post_condition_count = c.u32_be()?;
        summary["anchorMode"] = json!(anchor_mode);
        summary["postConditionMode"] = json!(match post_condition_mode {
            0x01 => "allow",
            _ => "deny",
        });
        summary["postConditions"] = json!(post_condition_count);
        if post_condition_count == 0 {
            if let Ok(payload_id) = c.u8() {
                summary["payloadType"] = match payload_type_name(payload_id) {
                    Some(name) => json!(name),
                    None => Value::Null,
                };
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx(version: u8, payload_id: u8) -> Vec<u8> {
        let mut tx = vec![version];
        tx.extend_from_slice(&1u32.to_be_bytes()); // chain id
        tx.push(0x04); // standard auth
        tx.push(0x00); // p2pkh single-sig
        tx.extend_from_slice(&[0x11u8; 20]); // signer
        tx.extend_from_slice(&7u64.to_be_bytes()); // nonce
        tx.extend_from_slice(&180u64.to_be_bytes()); // fee
        tx.push(0x00); // key encoding
        tx.extend_from_slice(&[0u8; 65]); // signature
        tx.push(0x03); // anchor mode: any
        tx.push(0x02); // post condition mode: deny
        tx.extend_from_slice(&0u32.to_be_bytes()); // no post conditions
        tx.push(payload_id);
        tx
    }

    #[test]
    fn decodes_mainnet_token_transfer_envelope() {
        let summary = decode_transaction(&sample_tx(0x00, 0x00)).unwrap();
        assert_eq!(summary["network"], "mainnet");
        assert_eq!(summary["chainId"], 1);
        assert_eq!(summary["auth"], "standard");
        assert_eq!(summary["nonce"], 7);
        assert_eq!(summary["fee"], "180");
        assert_eq!(summary["payloadType"], "token-transfer");
        assert_eq!(summary["postConditionMode"], "deny");
        assert!(summary["sender"].as_str().unwrap().starts_with("SP"));
    }

    #[test]
    fn decodes_testnet_contract_call() {
        let summary = decode_transaction(&sample_tx(0x80, 0x02)).unwrap();
        assert_eq!(summary["network"], "testnet");
        assert_eq!(summary["payloadType"], "contract-call");
        assert!(summary["sender"].as_str().unwrap().starts_with("ST"));
    }

    #[test]
    fn rejects_unknown_version() {
        assert_eq!(
            decode_transaction(&[0x42]),
            Err(TxDecodeError::UnknownVersion(0x42))
        );
    }

    #[test]
    fn rejects_truncated() {
        let tx = sample_tx(0x00, 0x00);
        assert!(matches!(
            decode_transaction(&tx[..30]),
            Err(TxDecodeError::Truncated(_))
        ));
    }

    #[test]
    fn rejects_multisig_hash_mode() {
        let mut tx = vec![0x00];
        tx.extend_from_slice(&1u32.to_be_bytes());
        tx.push(0x04);
        tx.push(0x01); // multi-sig
        assert_eq!(
            decode_transaction(&tx),
            Err(TxDecodeError::UnsupportedHashMode(0x01))
        );
    }
}
