//! Crockford-style c32 encoding and c32check addresses.
//!
//! Stacks addresses are `'S'` + c32 version character + c32-encoded
//! `hash160 || checksum`, where the checksum is the first four bytes of
//! `sha256(sha256(version_byte || hash160))`. Leading zero bytes are
//! preserved as leading `0` characters.

use sha2::{Digest, Sha256};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-sig address version.
pub const VERSION_MAINNET_P2PKH: u8 = 22;
/// Mainnet multi-sig address version.
pub const VERSION_MAINNET_P2SH: u8 = 20;
/// Testnet single-sig address version.
pub const VERSION_TESTNET_P2PKH: u8 = 26;
/// Testnet multi-sig address version.
pub const VERSION_TESTNET_P2SH: u8 = 21;

/// c32 decode/validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum C32Error {
    #[error("invalid c32 character: {0:?}")]
    InvalidCharacter(char),
    #[error("address too short")]
    TooShort,
    #[error("address must start with 'S'")]
    MissingPrefix,
    #[error("unknown address version {0}")]
    UnknownVersion(u8),
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("decoded hash is not 20 bytes")]
    BadLength,
}

fn char_value(c: char) -> Result<u8, C32Error> {
    // Crockford aliases: O→0, L/I→1; lowercase accepted.
    let c = c.to_ascii_uppercase();
    let c = match c {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    ALPHABET
        .iter()
        .position(|&a| a as char == c)
        .map(|i| i as u8)
        .ok_or(C32Error::InvalidCharacter(c))
}

/// Encodes bytes as c32, preserving leading zero bytes as `0` characters.
pub fn c32_encode(data: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::new();
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in data.iter().rev() {
        carry |= (byte as u16) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(ALPHABET[(carry & 0x1f) as usize]);
    }

    // out holds digits least-significant first; most-significant padding
    // zeros are at the tail.
    while out.last() == Some(&b'0') {
        out.pop();
    }
    let leading_zero_bytes = data.iter().take_while(|&&b| b == 0).count();
    out.extend(std::iter::repeat(b'0').take(leading_zero_bytes));

    out.reverse();
    String::from_utf8(out).expect("alphabet is ascii")
}

/// Decodes a c32 string back to bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let mut out: Vec<u8> = Vec::new();
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for c in input.chars().rev() {
        let value = char_value(c)?;
        carry |= (value as u16) << carry_bits;
        carry_bits += 5;
        while carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 && carry > 0 {
        out.push((carry & 0xff) as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    let leading_zero_chars = input.chars().take_while(|&c| c == '0').count();
    out.extend(std::iter::repeat(0u8).take(leading_zero_chars));

    out.reverse();
    Ok(out)
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut preimage = Vec::with_capacity(1 + data.len());
    preimage.push(version);
    preimage.extend_from_slice(data);
    let first = Sha256::digest(&preimage);
    let second = Sha256::digest(first);
    [second[0], second[1], second[2], second[3]]
}

/// Builds a Stacks address from a version byte and hash160.
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> String {
    let check = checksum(version, hash160);
    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(hash160);
    payload.extend_from_slice(&check);
    format!("S{}{}", ALPHABET[version as usize & 0x1f] as char, c32_encode(&payload))
}

/// Decoded address: version byte and hash160.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl DecodedAddress {
    /// `true` for mainnet versions.
    pub fn is_mainnet(&self) -> bool {
        matches!(self.version, VERSION_MAINNET_P2PKH | VERSION_MAINNET_P2SH)
    }

    /// `p2pkh` or `p2sh`.
    pub fn kind(&self) -> &'static str {
        match self.version {
            VERSION_MAINNET_P2PKH | VERSION_TESTNET_P2PKH => "p2pkh",
            _ => "p2sh",
        }
    }
}

/// Parses and checksum-validates a Stacks address.
pub fn c32_address_decode(address: &str) -> Result<DecodedAddress, C32Error> {
    let mut chars = address.chars();
    if chars.next() != Some('S') {
        return Err(C32Error::MissingPrefix);
    }
    let version_char = chars.next().ok_or(C32Error::TooShort)?;
    let version = char_value(version_char)?;
    if !matches!(
        version,
        VERSION_MAINNET_P2PKH | VERSION_MAINNET_P2SH | VERSION_TESTNET_P2PKH | VERSION_TESTNET_P2SH
    ) {
        return Err(C32Error::UnknownVersion(version));
    }

    let payload = c32_decode(chars.as_str())?;
    if payload.len() != 24 {
        return Err(C32Error::BadLength);
    }
    let (hash, check) = payload.split_at(20);
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(hash);

    if check != checksum(version, &hash160) {
        return Err(C32Error::BadChecksum);
    }
    Ok(DecodedAddress { version, hash160 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let cases: [&[u8]; 5] = [
            b"",
            &[0x00],
            &[0x00, 0x00, 0x01],
            &[0xde, 0xad, 0xbe, 0xef],
            &[0xff; 20],
        ];
        for case in cases {
            let encoded = c32_encode(case);
            let decoded = c32_decode(&encoded).unwrap();
            assert_eq!(decoded, case, "round trip failed for {case:?}");
        }
    }

    #[test]
    fn address_round_trips() {
        let hash = [0x42u8; 20];
        for version in [
            VERSION_MAINNET_P2PKH,
            VERSION_MAINNET_P2SH,
            VERSION_TESTNET_P2PKH,
            VERSION_TESTNET_P2SH,
        ] {
            let address = c32_address(version, &hash);
            assert!(address.starts_with('S'));
            let decoded = c32_address_decode(&address).unwrap();
            assert_eq!(decoded.version, version);
            assert_eq!(decoded.hash160, hash);
        }
    }

    #[test]
    fn burn_address_is_all_zero_hash() {
        let decoded = c32_address_decode("SP000000000000000000002Q6VF78").unwrap();
        assert_eq!(decoded.version, VERSION_MAINNET_P2PKH);
        assert_eq!(decoded.hash160, [0u8; 20]);
        assert!(decoded.is_mainnet());
        assert_eq!(decoded.kind(), "p2pkh");
    }

    #[test]
    fn burn_address_encodes_back() {
        assert_eq!(
            c32_address(VERSION_MAINNET_P2PKH, &[0u8; 20]),
            "SP000000000000000000002Q6VF78"
        );
    }

    #[test]
    fn corrupted_address_fails_checksum() {
        let address = c32_address(VERSION_MAINNET_P2PKH, &[0x42u8; 20]);
        let mut corrupted = address.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert!(matches!(
            c32_address_decode(&corrupted),
            Err(C32Error::BadChecksum) | Err(C32Error::BadLength)
        ));
    }

    #[test]
    fn rejects_bad_prefix_and_garbage() {
        assert_eq!(c32_address_decode("XP00"), Err(C32Error::MissingPrefix));
        assert_eq!(c32_address_decode("S"), Err(C32Error::TooShort));
        assert!(c32_address_decode("SP!!!!").is_err());
    }

    #[test]
    fn crockford_aliases_accepted() {
        assert_eq!(char_value('o').unwrap(), 0);
        assert_eq!(char_value('L').unwrap(), 1);
        assert_eq!(char_value('i').unwrap(), 1);
        assert_eq!(char_value('a').unwrap(), 10);
    }

    #[test]
    fn testnet_versions_report_network() {
        let hash = [1u8; 20];
        let address = c32_address(VERSION_TESTNET_P2PKH, &hash);
        assert!(address.starts_with("ST"));
        assert!(!c32_address_decode(&address).unwrap().is_mainnet());
    }
}
