//! Vault transaction messages for the multisig program.
//!
//! A vault transaction stores a compiled message whose payer is the vault. The
//! program keeps its own borsh layout with small length prefixes:
//!
//! ```text
//! num_signers               u8
//! num_writable_signers      u8
//! num_writable_non_signers  u8
//! account_keys              u8 len, 32 bytes each
//! instructions              u8 len, each:
//!                             program_id_index u8
//!                             account_indexes  u8 len, u8 each
//!                             data             u16 len (LE), raw bytes
//! address_table_lookups     u8 len, each:
//!                             account_key      32 bytes
//!                             writable_indexes u8 len, u8 each
//!                             readonly_indexes u8 len, u8 each
//! ```

use crate::config::CompileConfig;
use crate::error::MessageError;
use crate::message::{CompiledKeys, CompiledMessage};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_message::v0::MessageAddressTableLookup;
use solana_message::AddressLookupTableAccount;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::io::{self, Read, Write};
use tracing::debug;

/// Compiled instruction inside a vault transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInstruction {
    pub program_id_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultTransactionMessage {
    /// The number of signer pubkeys in `account_keys`
    pub num_signers: u8,
    /// The number of writable signer pubkeys in `account_keys`
    pub num_writable_signers: u8,
    /// The number of writable non-signer pubkeys in `account_keys`
    pub num_writable_non_signers: u8,
    /// Static account keys, programs included unless loaded from a lookup table
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<VaultInstruction>,
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl VaultTransactionMessage {
    /// Compile `instructions` into a vault message paid for by `vault`.
    ///
    /// Vault messages carry no block reference; the executing transaction
    /// supplies its own. The multisig program invokes every instruction
    /// through CPI, so under [`ProgramIdPolicy::Plain`] a program id may be
    /// loaded from a lookup table.
    ///
    /// [`ProgramIdPolicy::Plain`]: crate::config::ProgramIdPolicy::Plain
    pub fn try_compile(
        vault: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        config: &CompileConfig,
    ) -> Result<Self, MessageError> {
        let mut compiled_keys = CompiledKeys::compile(instructions, *vault, config);
        compiled_keys.allow_program_target_lookups();
        let message = CompiledMessage::try_compile_from_keys(
            compiled_keys,
            vault,
            instructions,
            address_lookup_table_accounts,
            Hash::default(),
        )?;
        Self::try_from(message)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, MessageError> {
        borsh::from_slice(bytes).map_err(|e| {
            MessageError::InvalidInput(format!("Failed to decode vault transaction message: {}", e))
        })
    }

    pub fn is_signer_index(&self, index: usize) -> bool {
        index < usize::from(self.num_signers)
    }

    pub fn is_static_writable_index(&self, index: usize) -> bool {
        if index >= self.account_keys.len() {
            return false;
        }
        if index < usize::from(self.num_writable_signers) {
            return true;
        }
        if index >= usize::from(self.num_signers) {
            let index_into_non_signers = index - usize::from(self.num_signers);
            return index_into_non_signers < usize::from(self.num_writable_non_signers);
        }
        false
    }

    /// Accounts to pass after the fixed accounts of a vault transaction execute
    /// instruction.
    ///
    /// Lookup table accounts come first, then the static keys, then the keys
    /// each lookup loads (writable before readonly, per table). The vault and
    /// the `ephemeral_signers` sign through the program, so they are never
    /// marked as signers here.
    pub fn execute_account_metas(
        &self,
        vault: &Pubkey,
        ephemeral_signers: &[Pubkey],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
    ) -> Result<Vec<AccountMeta>, MessageError> {
        let mut account_metas: Vec<AccountMeta> = self
            .address_table_lookups
            .iter()
            .map(|lookup| AccountMeta::new_readonly(lookup.account_key, false))
            .collect();

        for (index, key) in self.account_keys.iter().enumerate() {
            let is_signer =
                self.is_signer_index(index) && key != vault && !ephemeral_signers.contains(key);
            account_metas.push(AccountMeta {
                pubkey: *key,
                is_signer,
                is_writable: self.is_static_writable_index(index),
            });
        }

        for lookup in &self.address_table_lookups {
            let table = address_lookup_table_accounts
                .iter()
                .find(|table| table.key == lookup.account_key)
                .ok_or(MessageError::UnknownLookupTable(lookup.account_key))?;
            let resolve = |index: &u8| {
                table
                    .addresses
                    .get(usize::from(*index))
                    .copied()
                    .ok_or(MessageError::LookupIndexOutOfRange {
                        table: table.key,
                        index: *index,
                    })
            };
            for index in &lookup.writable_indexes {
                account_metas.push(AccountMeta::new(resolve(index)?, false));
            }
            for index in &lookup.readonly_indexes {
                account_metas.push(AccountMeta::new_readonly(resolve(index)?, false));
            }
        }

        debug!(
            accounts = account_metas.len(),
            lookups = self.address_table_lookups.len(),
            "Resolved vault execute accounts"
        );

        Ok(account_metas)
    }
}

impl TryFrom<CompiledMessage> for VaultTransactionMessage {
    type Error = MessageError;

    fn try_from(message: CompiledMessage) -> Result<Self, Self::Error> {
        let header = message.header;
        check_len_u8("account_keys", message.account_keys.len())?;
        check_len_u8("instructions", message.instructions.len())?;
        check_len_u8("address_table_lookups", message.address_table_lookups.len())?;
        for lookup in &message.address_table_lookups {
            check_len_u8("writable_indexes", lookup.writable_indexes.len())?;
            check_len_u8("readonly_indexes", lookup.readonly_indexes.len())?;
        }

        let num_writable_non_signers = u8::try_from(message.num_writable_non_signers())
            .map_err(|_| MessageError::AccountIndexOverflow {
                len: message.account_keys.len(),
            })?;

        let instructions = message
            .instructions
            .into_iter()
            .map(|ix| -> Result<VaultInstruction, MessageError> {
                check_len_u8("instruction accounts", ix.accounts.len())?;
                check_len_u16("instruction data", ix.data.len())?;
                Ok(VaultInstruction {
                    program_id_index: ix.program_id_index,
                    account_indexes: ix.accounts,
                    data: ix.data,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VaultTransactionMessage {
            num_signers: header.num_required_signatures,
            num_writable_signers: header
                .num_required_signatures
                .saturating_sub(header.num_readonly_signed_accounts),
            num_writable_non_signers,
            account_keys: message.account_keys,
            instructions,
            address_table_lookups: message.address_table_lookups,
        })
    }
}

fn check_len_u8(field: &'static str, len: usize) -> Result<(), MessageError> {
    match u8::try_from(len) {
        Ok(_) => Ok(()),
        Err(_) => Err(MessageError::LengthOverflow { field, len }),
    }
}

fn check_len_u16(field: &'static str, len: usize) -> Result<(), MessageError> {
    match u16::try_from(len) {
        Ok(_) => Ok(()),
        Err(_) => Err(MessageError::LengthOverflow { field, len }),
    }
}

// =============================================================================
// Borsh layout
// =============================================================================

fn write_len_u8<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    let len = u8::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds u8 prefix"))?;
    len.serialize(writer)
}

fn write_small_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_len_u8(writer, bytes.len())?;
    writer.write_all(bytes)
}

fn read_small_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = u8::deserialize_reader(reader)?;
    let mut bytes = vec![0u8; usize::from(len)];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_pubkey<R: Read>(reader: &mut R) -> io::Result<Pubkey> {
    <[u8; 32]>::deserialize_reader(reader).map(Pubkey::new_from_array)
}

impl BorshSerialize for VaultInstruction {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.program_id_index.serialize(writer)?;
        write_small_bytes(writer, &self.account_indexes)?;
        let data_len = u16::try_from(self.data.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "data exceeds u16 prefix")
        })?;
        data_len.serialize(writer)?;
        writer.write_all(&self.data)
    }
}

impl BorshDeserialize for VaultInstruction {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let program_id_index = u8::deserialize_reader(reader)?;
        let account_indexes = read_small_bytes(reader)?;
        let data_len = u16::deserialize_reader(reader)?;
        let mut data = vec![0u8; usize::from(data_len)];
        reader.read_exact(&mut data)?;
        Ok(VaultInstruction {
            program_id_index,
            account_indexes,
            data,
        })
    }
}

impl BorshSerialize for VaultTransactionMessage {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.num_signers.serialize(writer)?;
        self.num_writable_signers.serialize(writer)?;
        self.num_writable_non_signers.serialize(writer)?;

        write_len_u8(writer, self.account_keys.len())?;
        for key in &self.account_keys {
            key.to_bytes().serialize(writer)?;
        }

        write_len_u8(writer, self.instructions.len())?;
        for ix in &self.instructions {
            ix.serialize(writer)?;
        }

        write_len_u8(writer, self.address_table_lookups.len())?;
        for lookup in &self.address_table_lookups {
            lookup.account_key.to_bytes().serialize(writer)?;
            write_small_bytes(writer, &lookup.writable_indexes)?;
            write_small_bytes(writer, &lookup.readonly_indexes)?;
        }
        Ok(())
    }
}

impl BorshDeserialize for VaultTransactionMessage {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let num_signers = u8::deserialize_reader(reader)?;
        let num_writable_signers = u8::deserialize_reader(reader)?;
        let num_writable_non_signers = u8::deserialize_reader(reader)?;

        let num_keys = u8::deserialize_reader(reader)?;
        let account_keys = (0..num_keys)
            .map(|_| read_pubkey(reader))
            .collect::<io::Result<Vec<_>>>()?;

        let num_instructions = u8::deserialize_reader(reader)?;
        let instructions = (0..num_instructions)
            .map(|_| VaultInstruction::deserialize_reader(reader))
            .collect::<io::Result<Vec<_>>>()?;

        let num_lookups = u8::deserialize_reader(reader)?;
        let address_table_lookups = (0..num_lookups)
            .map(|_| -> io::Result<MessageAddressTableLookup> {
                Ok(MessageAddressTableLookup {
                    account_key: read_pubkey(reader)?,
                    writable_indexes: read_small_bytes(reader)?,
                    readonly_indexes: read_small_bytes(reader)?,
                })
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(VaultTransactionMessage {
            num_signers,
            num_writable_signers,
            num_writable_non_signers,
            account_keys,
            instructions,
            address_table_lookups,
        })
    }
}
