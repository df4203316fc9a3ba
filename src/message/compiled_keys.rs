//! Key role aggregation, lookup table extraction and static key ordering.

use crate::config::CompileConfig;
use crate::error::MessageError;
use indexmap::IndexMap;
use solana_message::v0::{LoadedAddresses, MessageAddressTableLookup};
use solana_message::{AddressLookupTableAccount, MessageHeader};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, trace};

/// Roles an account plays across every instruction of a message.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRole {
    pub is_signer: bool,
    pub is_writable: bool,
    pub is_invoked: bool,
    /// Set when the key is the target of at least one instruction,
    /// whatever the program id policy.
    pub is_program_target: bool,
}

/// Accounts referenced by a set of instructions, keyed by address in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKeys {
    payer: Pubkey,
    key_roles: IndexMap<Pubkey, KeyRole>,
    program_target_lookups: bool,
}

impl CompiledKeys {
    /// Aggregates the roles of the payer and of every key the instructions reference.
    ///
    /// The payer is registered first as a writable signer. Signer and writable
    /// flags of repeated keys are OR-merged, so a role is never narrowed.
    ///
    /// Program targets are kept out of lookup extraction until
    /// [`allow_program_target_lookups`](Self::allow_program_target_lookups)
    /// is called.
    pub fn compile(instructions: &[Instruction], payer: Pubkey, config: &CompileConfig) -> Self {
        let mut key_roles = IndexMap::<Pubkey, KeyRole>::new();

        let payer_role = key_roles.entry(payer).or_default();
        payer_role.is_signer = true;
        payer_role.is_writable = true;

        for ix in instructions {
            let program_role = key_roles.entry(ix.program_id).or_default();
            program_role.is_program_target = true;
            if config.marks_programs_invoked() {
                program_role.is_invoked = true;
            }
            for account_meta in &ix.accounts {
                let role = key_roles.entry(account_meta.pubkey).or_default();
                role.is_signer |= account_meta.is_signer;
                role.is_writable |= account_meta.is_writable;
            }
        }

        debug!(
            keys = key_roles.len(),
            instructions = instructions.len(),
            "Aggregated account roles"
        );

        CompiledKeys {
            payer,
            key_roles,
            program_target_lookups: false,
        }
    }

    /// Let program targets that are not marked invoked be loaded from lookup
    /// tables. Only valid for messages executed through CPI, such as vault
    /// transactions; the runtime rejects top-level messages that do this.
    pub fn allow_program_target_lookups(&mut self) {
        self.program_target_lookups = true;
    }

    fn is_lookup_candidate(&self, key: &Pubkey, role: &KeyRole) -> bool {
        if role.is_signer || role.is_invoked || key == &self.payer {
            return false;
        }
        self.program_target_lookups || !role.is_program_target
    }

    pub fn role(&self, key: &Pubkey) -> Option<&KeyRole> {
        self.key_roles.get(key)
    }

    pub fn len(&self) -> usize {
        self.key_roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_roles.is_empty()
    }

    /// Keys still held, in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &Pubkey> {
        self.key_roles.keys()
    }

    /// Moves every lookup candidate found in `lookup_table_account` out of this key set.
    ///
    /// Writable candidates are drained first, then readonly ones. Returns `None`
    /// when the table holds none of the remaining candidates.
    pub fn try_extract_table_lookup(
        &mut self,
        lookup_table_account: &AddressLookupTableAccount,
    ) -> Result<Option<(MessageAddressTableLookup, LoadedAddresses)>, MessageError> {
        let (writable_indexes, drained_writable_keys) = self.try_drain_keys_found_in_lookup_table(
            lookup_table_account,
            |role| role.is_writable,
        )?;
        let (readonly_indexes, drained_readonly_keys) = self.try_drain_keys_found_in_lookup_table(
            lookup_table_account,
            |role| !role.is_writable,
        )?;

        trace!(
            table = %lookup_table_account.key,
            writable = writable_indexes.len(),
            readonly = readonly_indexes.len(),
            "Scanned address lookup table"
        );

        // Don't extract lookup if no keys were found
        if writable_indexes.is_empty() && readonly_indexes.is_empty() {
            return Ok(None);
        }

        Ok(Some((
            MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes,
                readonly_indexes,
            },
            LoadedAddresses {
                writable: drained_writable_keys,
                readonly: drained_readonly_keys,
            },
        )))
    }

    fn try_drain_keys_found_in_lookup_table(
        &mut self,
        lookup_table_account: &AddressLookupTableAccount,
        key_role_filter: impl Fn(&KeyRole) -> bool,
    ) -> Result<(Vec<u8>, Vec<Pubkey>), MessageError> {
        let mut lookup_table_indexes = Vec::new();
        let mut drained_keys = Vec::new();

        // Resolve against a snapshot of the candidates before removing anything.
        for (key, role) in &self.key_roles {
            if !self.is_lookup_candidate(key, role) || !key_role_filter(role) {
                continue;
            }
            let Some(position) = lookup_table_account
                .addresses
                .iter()
                .position(|address| address == key)
            else {
                continue;
            };
            let index =
                u8::try_from(position).map_err(|_| MessageError::LookupTableIndexOverflow {
                    table: lookup_table_account.key,
                    index: position,
                })?;
            lookup_table_indexes.push(index);
            drained_keys.push(*key);
        }

        for key in &drained_keys {
            self.key_roles.shift_remove(key);
        }

        Ok((lookup_table_indexes, drained_keys))
    }

    /// Orders the remaining keys into the static key list and derives the header.
    ///
    /// Keys are grouped as writable signers, readonly signers, writable
    /// non-signers and readonly non-signers, each group in first-seen order.
    pub fn try_into_message_components(self) -> Result<(MessageHeader, Vec<Pubkey>), MessageError> {
        let mut writable_signer_keys = Vec::new();
        let mut readonly_signer_keys = Vec::new();
        let mut writable_non_signer_keys = Vec::new();
        let mut readonly_non_signer_keys = Vec::new();

        for (key, role) in self.key_roles {
            match (role.is_signer, role.is_writable) {
                (true, true) => writable_signer_keys.push(key),
                (true, false) => readonly_signer_keys.push(key),
                (false, true) => writable_non_signer_keys.push(key),
                (false, false) => readonly_non_signer_keys.push(key),
            }
        }

        let signers_len = writable_signer_keys
            .len()
            .saturating_add(readonly_signer_keys.len());
        let total_len = signers_len
            .saturating_add(writable_non_signer_keys.len())
            .saturating_add(readonly_non_signer_keys.len());
        let try_into_u8 = |num: usize| -> Result<u8, MessageError> {
            u8::try_from(num).map_err(|_| MessageError::AccountIndexOverflow { len: total_len })
        };

        let header = MessageHeader {
            num_required_signatures: try_into_u8(signers_len)?,
            num_readonly_signed_accounts: try_into_u8(readonly_signer_keys.len())?,
            num_readonly_unsigned_accounts: try_into_u8(readonly_non_signer_keys.len())?,
        };

        let static_account_keys = std::iter::empty()
            .chain(writable_signer_keys)
            .chain(readonly_signer_keys)
            .chain(writable_non_signer_keys)
            .chain(readonly_non_signer_keys)
            .collect();

        Ok((header, static_account_keys))
    }
}
