//! Combined account index space and instruction compilation.

use crate::error::MessageError;
use indexmap::IndexSet;
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::v0::LoadedAddresses;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

/// Every account a message can address by index.
///
/// Indexes run over the static keys first, then every writable key loaded from
/// lookup tables, then every readonly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAccountKeys {
    keys: IndexSet<Pubkey>,
}

impl MessageAccountKeys {
    pub fn try_new(
        static_account_keys: &[Pubkey],
        loaded_addresses: &LoadedAddresses,
    ) -> Result<Self, MessageError> {
        let keys: IndexSet<Pubkey> = static_account_keys
            .iter()
            .chain(&loaded_addresses.writable)
            .chain(&loaded_addresses.readonly)
            .copied()
            .collect();

        // Each key is held once by construction; a shorter set means a caller
        // handed in overlapping key lists.
        let expected_len = static_account_keys
            .len()
            .saturating_add(loaded_addresses.writable.len())
            .saturating_add(loaded_addresses.readonly.len());
        if keys.len() != expected_len {
            return Err(MessageError::InvalidInput(format!(
                "account key lists overlap: {} keys, {} unique",
                expected_len,
                keys.len()
            )));
        }

        if keys.len() > usize::from(u8::MAX) + 1 {
            return Err(MessageError::AccountIndexOverflow { len: keys.len() });
        }

        Ok(MessageAccountKeys { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pubkey> {
        self.keys.get_index(index)
    }

    /// Index of `key` in the combined space.
    pub fn index_of(&self, key: &Pubkey) -> Option<u8> {
        // try_new caps the set at 256 keys, so every position fits a u8
        self.keys
            .get_index_of(key)
            .and_then(|index| u8::try_from(index).ok())
    }

    /// Re-expresses each instruction with indexes into this key space.
    ///
    /// Instruction order and payload bytes are preserved.
    pub fn try_compile_instructions(
        &self,
        instructions: &[Instruction],
    ) -> Result<Vec<CompiledInstruction>, MessageError> {
        instructions
            .iter()
            .enumerate()
            .map(|(position, ix)| self.try_compile_instruction(position, ix))
            .collect()
    }

    fn try_compile_instruction(
        &self,
        position: usize,
        instruction: &Instruction,
    ) -> Result<CompiledInstruction, MessageError> {
        let resolve = |address: &Pubkey| {
            self.index_of(address)
                .ok_or_else(|| MessageError::MissingAccount {
                    address: *address,
                    instruction: position,
                })
        };

        let program_id_index = resolve(&instruction.program_id)?;
        let accounts = instruction
            .accounts
            .iter()
            .map(|account_meta| resolve(&account_meta.pubkey))
            .collect::<Result<Vec<u8>, MessageError>>()?;

        Ok(CompiledInstruction {
            program_id_index,
            accounts,
            data: instruction.data.clone(),
        })
    }
}
