//! Address and block reference parsing.
//!
//! Intents carry addresses and block references as base58 strings; these helpers
//! turn them into SDK types with a `MessageError` that names the offending field.

use crate::error::MessageError;
use solana_sdk::hash::Hash;
use std::str::FromStr;

/// Re-export the underlying Solana Pubkey type.
pub use solana_sdk::pubkey::Pubkey;

/// Extension trait for Pubkey to add field-aware error handling.
pub trait PubkeyExt {
    fn from_base58(field: &str, address: &str) -> Result<Pubkey, MessageError>;
}

impl PubkeyExt for Pubkey {
    /// Parse a base58 address, naming `field` in the error.
    fn from_base58(field: &str, address: &str) -> Result<Pubkey, MessageError> {
        Pubkey::from_str(address).map_err(|e| {
            MessageError::InvalidInput(format!("Invalid {}: {} ({})", field, address, e))
        })
    }
}

/// Parse a base58 block reference (recent blockhash or durable nonce value).
pub fn parse_block_reference(value: &str) -> Result<Hash, MessageError> {
    Hash::from_str(value)
        .map_err(|e| MessageError::InvalidInput(format!("Invalid blockhash: {} ({})", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base58() {
        let address = "FKjSjCqByQRwSzZoMXA7bKnDbJe41YgJTHFFzBeC42bH";
        let pubkey = Pubkey::from_base58("payer", address).unwrap();
        assert_eq!(pubkey.to_string(), address);
    }

    #[test]
    fn test_invalid_base58_names_field() {
        let err = Pubkey::from_base58("programId", "invalid!@#$").unwrap_err();
        assert!(err.to_string().contains("programId"));
    }

    #[test]
    fn test_system_program_address() {
        let pubkey = Pubkey::from_base58("key", "11111111111111111111111111111111").unwrap();
        assert_eq!(pubkey.to_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_parse_block_reference() {
        let hash = parse_block_reference("GWaQEymC3Z9SHM2gkh8u12xL1zJPMHPCSVR3pSDpEXE4").unwrap();
        assert_eq!(hash.to_string(), "GWaQEymC3Z9SHM2gkh8u12xL1zJPMHPCSVR3pSDpEXE4");
        assert!(parse_block_reference("not-a-hash").is_err());
    }
}
