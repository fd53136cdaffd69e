//! Payment token kinds and network identity.
//!
//! The gateway prices every endpoint in three tokens: native STX and the
//! two bridged SIP-010 assets (sBTC, sUSDT). Each token carries its
//! decimal precision, a fixed USD reference rate used only for pricing
//! symmetry, and the SIP-010 contract that settles it on a given network.
//! STX settles natively and never has a contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens accepted for payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Native chain token.
    #[serde(rename = "STX")]
    Stx,
    /// Bridged Bitcoin (SIP-010).
    #[serde(rename = "sBTC")]
    Sbtc,
    /// Bridged USD stablecoin (SIP-010).
    #[serde(rename = "sUSDT")]
    Susdt,
}

impl TokenKind {
    /// All tokens the gateway can quote, in challenge order.
    pub const ALL: [TokenKind; 3] = [TokenKind::Stx, TokenKind::Sbtc, TokenKind::Susdt];

    /// Number of decimal places in the token's atomic unit.
    pub fn decimals(&self) -> u32 {
        match self {
            TokenKind::Stx => 6,
            TokenKind::Sbtc => 8,
            TokenKind::Susdt => 6,
        }
    }

    /// Fixed USD reference rate. Used only so that the same endpoint
    /// advertises economically equivalent amounts across tokens; it is
    /// not a market feed.
    pub fn usd_rate(&self) -> f64 {
        match self {
            TokenKind::Stx => 0.50,
            TokenKind::Sbtc => 100_000.0,
            TokenKind::Susdt => 1.0,
        }
    }

    /// Wire name used in headers, query parameters, and response bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TokenKind::Stx => "STX",
            TokenKind::Sbtc => "sBTC",
            TokenKind::Susdt => "sUSDT",
        }
    }

    /// Parses a client-supplied token selector. Case-insensitive.
    pub fn parse(value: &str) -> Option<TokenKind> {
        match value.to_ascii_lowercase().as_str() {
            "stx" | "native" => Some(TokenKind::Stx),
            "sbtc" => Some(TokenKind::Sbtc),
            "susdt" => Some(TokenKind::Susdt),
            _ => None,
        }
    }

    /// SIP-010 contract settling this token on `network`, if any.
    /// Invariant: `Stx` never has a contract.
    pub fn contract(&self, network: StacksNetwork) -> Option<AssetContract> {
        match (self, network) {
            (TokenKind::Stx, _) => None,
            (TokenKind::Sbtc, StacksNetwork::Mainnet) => Some(AssetContract {
                address: "SM3VDXK3WZZSA84XXFKAFAF15NNZX32CTSG82JFQ4",
                name: "sbtc-token",
            }),
            (TokenKind::Sbtc, StacksNetwork::Testnet) => Some(AssetContract {
                address: "ST1F7QA2MDF17S807EPA36TSS8AMEFY4KA9TVGWXT",
                name: "sbtc-token",
            }),
            (TokenKind::Susdt, StacksNetwork::Mainnet) => Some(AssetContract {
                address: "SP2XD7417HGPRTREMKF748VNEQPDRR0RMANB7X1NK",
                name: "token-susdt",
            }),
            // sUSDT has no testnet deployment; challenges on testnet omit it.
            (TokenKind::Susdt, StacksNetwork::Testnet) => None,
        }
    }

    /// Asset designation for the x402 `asset` field: the contract
    /// identifier for SIP-010 tokens, the literal `STX` for native.
    pub fn asset_identifier(&self, network: StacksNetwork) -> String {
        match self.contract(network) {
            Some(c) => format!("{}.{}", c.address, c.name),
            None => "STX".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A SIP-010 contract identifier scoped to one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetContract {
    pub address: &'static str,
    pub name: &'static str,
}

/// Which Stacks network the gateway settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StacksNetwork {
    Mainnet,
    #[default]
    Testnet,
}

impl StacksNetwork {
    /// Standardized chain identifier used in x402 requirements.
    pub fn chain_id(&self) -> &'static str {
        match self {
            StacksNetwork::Mainnet => "stacks-mainnet",
            StacksNetwork::Testnet => "stacks-testnet",
        }
    }

    /// Address prefixes valid for this network.
    pub fn address_prefixes(&self) -> [&'static str; 2] {
        match self {
            StacksNetwork::Mainnet => ["SP", "SM"],
            StacksNetwork::Testnet => ["ST", "SN"],
        }
    }
}

impl fmt::Display for StacksNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chain_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_token_has_no_contract() {
        assert!(TokenKind::Stx.contract(StacksNetwork::Mainnet).is_none());
        assert!(TokenKind::Stx.contract(StacksNetwork::Testnet).is_none());
    }

    #[test]
    fn bridged_tokens_have_mainnet_contracts() {
        let sbtc = TokenKind::Sbtc.contract(StacksNetwork::Mainnet).unwrap();
        assert_eq!(sbtc.name, "sbtc-token");

        let susdt = TokenKind::Susdt.contract(StacksNetwork::Mainnet).unwrap();
        assert_eq!(susdt.name, "token-susdt");
    }

    #[test]
    fn susdt_missing_on_testnet() {
        assert!(TokenKind::Susdt.contract(StacksNetwork::Testnet).is_none());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(TokenKind::parse("STX"), Some(TokenKind::Stx));
        assert_eq!(TokenKind::parse("sbtc"), Some(TokenKind::Sbtc));
        assert_eq!(TokenKind::parse("SBTC"), Some(TokenKind::Sbtc));
        assert_eq!(TokenKind::parse("sUSDT"), Some(TokenKind::Susdt));
        assert_eq!(TokenKind::parse("native"), Some(TokenKind::Stx));
        assert_eq!(TokenKind::parse("doge"), None);
    }

    #[test]
    fn asset_identifier_formats() {
        assert_eq!(TokenKind::Stx.asset_identifier(StacksNetwork::Mainnet), "STX");
        assert_eq!(
            TokenKind::Sbtc.asset_identifier(StacksNetwork::Mainnet),
            "SM3VDXK3WZZSA84XXFKAFAF15NNZX32CTSG82JFQ4.sbtc-token"
        );
    }

    #[test]
    fn chain_id_strings() {
        assert_eq!(StacksNetwork::Mainnet.chain_id(), "stacks-mainnet");
        assert_eq!(StacksNetwork::Testnet.chain_id(), "stacks-testnet");
    }

    #[test]
    fn decimals_per_token() {
        assert_eq!(TokenKind::Stx.decimals(), 6);
        assert_eq!(TokenKind::Sbtc.decimals(), 8);
        assert_eq!(TokenKind::Susdt.decimals(), 6);
    }
}
