//! Message intents.
//!
//! These types are designed to be deserialized from JavaScript via serde.
//! Addresses and block references are base58 strings and instruction data is
//! base64, so a caller never has to hand raw bytes across the boundary.

use crate::config::CompileConfig;
use crate::error::MessageError;
use crate::message::CompiledMessage;
use crate::pubkey::{parse_block_reference, Pubkey, PubkeyExt};
use crate::vault::VaultTransactionMessage;
use base64::prelude::*;
use serde::Deserialize;
use solana_message::AddressLookupTableAccount;
use solana_sdk::instruction::{AccountMeta, Instruction};

/// Intent to compile a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIntent {
    /// The fee payer (the vault, for vault messages)
    pub payer: String,
    /// Recent blockhash or durable nonce value; vault messages ignore it
    #[serde(default)]
    pub recent_blockhash: Option<String>,
    pub instructions: Vec<InstructionIntent>,
    #[serde(default)]
    pub address_lookup_tables: Vec<LookupTableIntent>,
    #[serde(default)]
    pub config: CompileConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionIntent {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<AccountMetaIntent>,
    /// Instruction data (base64)
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetaIntent {
    pub pubkey: String,
    #[serde(default)]
    pub is_signer: bool,
    #[serde(default)]
    pub is_writable: bool,
}

/// Snapshot of an address lookup table account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTableIntent {
    pub key: String,
    pub addresses: Vec<String>,
}

impl InstructionIntent {
    fn to_instruction(&self) -> Result<Instruction, MessageError> {
        let program_id = Pubkey::from_base58("programId", &self.program_id)?;
        let accounts = self
            .accounts
            .iter()
            .map(|meta| -> Result<AccountMeta, MessageError> {
                Ok(AccountMeta {
                    pubkey: Pubkey::from_base58("account pubkey", &meta.pubkey)?,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data = BASE64_STANDARD.decode(&self.data).map_err(|e| {
            MessageError::InvalidInput(format!("Invalid instruction data: {}", e))
        })?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl LookupTableIntent {
    pub(crate) fn to_lookup_table_account(
        &self,
    ) -> Result<AddressLookupTableAccount, MessageError> {
        let key = Pubkey::from_base58("lookup table key", &self.key)?;
        let addresses = self
            .addresses
            .iter()
            .map(|address| Pubkey::from_base58("lookup table address", address))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AddressLookupTableAccount { key, addresses })
    }
}

struct ParsedIntent {
    payer: Pubkey,
    instructions: Vec<Instruction>,
    lookup_tables: Vec<AddressLookupTableAccount>,
}

fn parse_intent(intent: &MessageIntent) -> Result<ParsedIntent, MessageError> {
    let payer = Pubkey::from_base58("payer", &intent.payer)?;
    let instructions = intent
        .instructions
        .iter()
        .map(InstructionIntent::to_instruction)
        .collect::<Result<Vec<_>, _>>()?;
    let lookup_tables = intent
        .address_lookup_tables
        .iter()
        .map(LookupTableIntent::to_lookup_table_account)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedIntent {
        payer,
        instructions,
        lookup_tables,
    })
}

/// Compile a message intent into a v0 message.
pub fn compile_intent(intent: &MessageIntent) -> Result<CompiledMessage, MessageError> {
    let blockhash_str = intent
        .recent_blockhash
        .as_deref()
        .ok_or_else(|| MessageError::invalid_input("Missing recentBlockhash"))?;
    let recent_blockhash = parse_block_reference(blockhash_str)?;
    let parsed = parse_intent(intent)?;

    CompiledMessage::try_compile_with_config(
        &parsed.payer,
        &parsed.instructions,
        &parsed.lookup_tables,
        recent_blockhash,
        &intent.config,
    )
}

/// Compile a message intent into a vault transaction message; `payer` is the vault.
pub fn compile_vault_intent(
    intent: &MessageIntent,
) -> Result<VaultTransactionMessage, MessageError> {
    let parsed = parse_intent(intent)?;

    VaultTransactionMessage::try_compile(
        &parsed.payer,
        &parsed.instructions,
        &parsed.lookup_tables,
        &intent.config,
    )
}
