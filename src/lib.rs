//! wasm-squads: v0 message compilation for Solana, with WASM bindings.
//!
//! Turns a fee payer, an ordered instruction list and address lookup table
//! snapshots into a v0 message, and wraps the same compilation into the vault
//! transaction message layout used by the multisig program.
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//!
//! 1. **Core types** (`message`, `vault`, `intent`) - Compilation over Solana SDK types
//! 2. **WASM bindings** (`wasm/`) - Thin wrappers that expose core types to JavaScript
//!
//! # Usage from Rust
//!
//! ```rust
//! use solana_sdk::hash::Hash;
//! use solana_sdk::instruction::{AccountMeta, Instruction};
//! use wasm_squads::{CompiledMessage, Pubkey};
//!
//! let payer = Pubkey::new_from_array([1; 32]);
//! let recipient = Pubkey::new_from_array([2; 32]);
//! let program = Pubkey::new_from_array([3; 32]);
//! let ix = Instruction::new_with_bytes(program, &[0], vec![AccountMeta::new(recipient, false)]);
//!
//! let message = CompiledMessage::try_compile(&payer, &[ix], &[], Hash::default()).unwrap();
//! assert_eq!(message.account_keys, vec![payer, recipient, program]);
//! let bytes = message.serialize().unwrap();
//! assert_eq!(&bytes[..3], &[1, 0, 1]);
//! ```

pub mod config;
mod error;
pub mod intent;
pub mod message;
pub mod pubkey;
pub mod vault;
pub mod wasm;

// Re-export core types at crate root
pub use config::{CompileConfig, ProgramIdPolicy};
pub use error::MessageError;
pub use intent::{compile_intent, compile_vault_intent, MessageIntent};
pub use message::{CompiledKeys, CompiledMessage, KeyRole, MessageAccountKeys};
pub use pubkey::{Pubkey, PubkeyExt};
pub use vault::{VaultInstruction, VaultTransactionMessage};

// Re-export WASM types
pub use wasm::{CompilerNamespace, WasmCompiledMessage, WasmVaultTransactionMessage};
