//! Hashing endpoints.
//!
//! `POST /hashing/{algorithm}`. Input starting with `0x` is hex, all
//! other input hashes as UTF-8 bytes. Output must be bit-identical to
//! the corresponding on-chain primitive.

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ripemd::Ripemd160;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256, Sha512, Sha512_256};
use sha3::Keccak256;

use super::super::helpers::{decode_json, error_response, ok_response, RequirePayer};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Sha512_256,
    Keccak256,
    Hash160,
    Ripemd160,
}

impl HashAlgorithm {
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            "sha512-256" => Some(Self::Sha512_256),
            "keccak256" => Some(Self::Keccak256),
            "hash160" => Some(Self::Hash160),
            "ripemd160" => Some(Self::Ripemd160),
            _ => None,
        }
    }

    /// Display name used in responses.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
            Self::Sha512_256 => "SHA-512/256",
            Self::Keccak256 => "Keccak-256",
            Self::Hash160 => "Hash160",
            Self::Ripemd160 => "RIPEMD-160",
        }
    }

    /// Computes the digest.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
            Self::Sha512_256 => Sha512_256::digest(data).to_vec(),
            Self::Keccak256 => Keccak256::digest(data).to_vec(),
            Self::Hash160 => Ripemd160::digest(Sha256::digest(data)).to_vec(),
            Self::Ripemd160 => Ripemd160::digest(data).to_vec(),
        }
    }
}

#[derive(Deserialize)]
struct HashRequest {
    data: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// POST /hashing/:algorithm
pub async fn hash(
    Path(algorithm): Path<String>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let Some(algorithm) = HashAlgorithm::parse(&algorithm) else {
        return error_response(
            StatusCode::NOT_FOUND,
            Some(payer.token),
            "UNKNOWN_ALGORITHM",
            format!("unsupported algorithm: {algorithm}"),
        );
    };

    let request: HashRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    // 0x-prefixed data is hex; everything else hashes as UTF-8.
    let input: Vec<u8> = match request.data.strip_prefix("0x") {
        Some(hex_data) => match hex::decode(hex_data) {
            Ok(bytes) => bytes,
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    Some(payer.token),
                    "INVALID_REQUEST",
                    "data has 0x prefix but is not valid hex",
                )
            }
        },
        None => request.data.clone().into_bytes(),
    };

    let encoding = request.encoding.as_deref().unwrap_or("hex");
    let digest = algorithm.digest(&input);
    let encoded = match encoding {
        "hex" => hex::encode(&digest),
        "base64" => BASE64.encode(&digest),
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                Some(payer.token),
                "INVALID_REQUEST",
                format!("unknown encoding: {other}"),
            )
        }
    };

    ok_response(
        payer.token,
        json!({
            "hash": encoded,
            "algorithm": algorithm.display_name(),
            "encoding": encoding,
            "inputLength": input.len(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_reference_vector() {
        // sha256("hello world")
        assert_eq!(
            hex::encode(HashAlgorithm::Sha256.digest(b"hello world")),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn sha512_reference_vector() {
        assert_eq!(
            hex::encode(HashAlgorithm::Sha512.digest(b"abc")),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn sha512_256_reference_vector() {
        assert_eq!(
            hex::encode(HashAlgorithm::Sha512_256.digest(b"abc")),
            "53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23"
        );
    }

    #[test]
    fn keccak256_reference_vector() {
        // keccak256("") - the Ethereum empty hash
        assert_eq!(
            hex::encode(HashAlgorithm::Keccak256.digest(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn ripemd160_reference_vector() {
        assert_eq!(
            hex::encode(HashAlgorithm::Ripemd160.digest(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn hash160_is_ripemd_of_sha256() {
        let data = b"test";
        let expected = Ripemd160::digest(Sha256::digest(data)).to_vec();
        assert_eq!(HashAlgorithm::Hash160.digest(data), expected);
        assert_eq!(expected.len(), 20);
    }

    #[test]
    fn digests_are_referentially_transparent() {
        for algorithm in [
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha512,
            HashAlgorithm::Sha512_256,
            HashAlgorithm::Keccak256,
            HashAlgorithm::Hash160,
            HashAlgorithm::Ripemd160,
        ] {
            assert_eq!(algorithm.digest(b"same input"), algorithm.digest(b"same input"));
        }
    }

    #[test]
    fn parse_recognizes_all_route_segments() {
        for (segment, name) in [
            ("sha256", "SHA-256"),
            ("sha512", "SHA-512"),
            ("sha512-256", "SHA-512/256"),
            ("keccak256", "Keccak-256"),
            ("hash160", "Hash160"),
            ("ripemd160", "RIPEMD-160"),
        ] {
            let algorithm = HashAlgorithm::parse(segment).unwrap();
            assert_eq!(algorithm.display_name(), name);
        }
        assert!(HashAlgorithm::parse("md5").is_none());
    }
}
