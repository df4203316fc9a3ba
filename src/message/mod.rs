//! Message compilation (v0 layout).
//!
//! Compiles instructions, a fee payer and address lookup table snapshots into a
//! v0 message:
//!
//! 1. [`CompiledKeys::compile`] aggregates one role per account, payer first.
//! 2. [`CompiledKeys::try_extract_table_lookup`] moves lookup candidates into
//!    table-relative indexes, tables taken in caller order.
//! 3. [`CompiledKeys::try_into_message_components`] orders the remaining
//!    static keys and derives the header.
//! 4. [`MessageAccountKeys::try_compile_instructions`] indexes every
//!    instruction against static keys, then loaded writable, then loaded
//!    readonly keys.
//! 5. [`CompiledMessage::serialize`] writes the wire layout.
//!
//! Output is fully determined by the input order; no step iterates a hashed
//! collection.

mod account_keys;
mod compiled_keys;
pub mod wire;

pub use account_keys::MessageAccountKeys;
pub use compiled_keys::{CompiledKeys, KeyRole};

use crate::config::CompileConfig;
use crate::error::MessageError;
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::v0::{self, LoadedAddresses, MessageAddressTableLookup};
use solana_message::{AddressLookupTableAccount, MessageHeader};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use std::io::Write;
use tracing::debug;

/// A compiled v0 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMessage {
    pub header: MessageHeader,
    /// Static account keys; the payer is always first.
    pub account_keys: Vec<Pubkey>,
    /// Block reference binding the message to recent ledger state.
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl CompiledMessage {
    /// Compile with the default [`CompileConfig`].
    pub fn try_compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {
        Self::try_compile_with_config(
            payer,
            instructions,
            address_lookup_table_accounts,
            recent_blockhash,
            &CompileConfig::default(),
        )
    }

    /// Compile a top-level message.
    ///
    /// Instruction program targets always stay in the static keys, whatever
    /// `config.program_id_policy` says, since the runtime only resolves program
    /// ids from them.
    pub fn try_compile_with_config(
        payer: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
        config: &CompileConfig,
    ) -> Result<Self, MessageError> {
        let compiled_keys = CompiledKeys::compile(instructions, *payer, config);
        Self::try_compile_from_keys(
            compiled_keys,
            payer,
            instructions,
            address_lookup_table_accounts,
            recent_blockhash,
        )
    }

    pub(crate) fn try_compile_from_keys(
        mut compiled_keys: CompiledKeys,
        payer: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {

        let mut address_table_lookups = Vec::with_capacity(address_lookup_table_accounts.len());
        let mut loaded_addresses_list = Vec::with_capacity(address_lookup_table_accounts.len());
        for lookup_table_account in address_lookup_table_accounts {
            if let Some((lookup, loaded_addresses)) =
                compiled_keys.try_extract_table_lookup(lookup_table_account)?
            {
                address_table_lookups.push(lookup);
                loaded_addresses_list.push(loaded_addresses);
            }
        }

        let (header, static_keys) = compiled_keys.try_into_message_components()?;
        let loaded_addresses = LoadedAddresses::from_iter(loaded_addresses_list);
        let account_keys = MessageAccountKeys::try_new(&static_keys, &loaded_addresses)?;
        let instructions = account_keys.try_compile_instructions(instructions)?;

        debug!(
            payer = %payer,
            static_keys = static_keys.len(),
            loaded_writable = loaded_addresses.writable.len(),
            loaded_readonly = loaded_addresses.readonly.len(),
            lookups = address_table_lookups.len(),
            num_required_signatures = header.num_required_signatures,
            "Compiled message"
        );

        Ok(CompiledMessage {
            header,
            account_keys: static_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        })
    }

    /// Serialize the message body in wire layout.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut buf = Vec::new();
        wire::encode_message(&mut buf, self)?;
        Ok(buf)
    }

    /// Serialize with the v0 version prefix, as embedded in a versioned transaction.
    pub fn serialize_versioned(&self) -> Result<Vec<u8>, MessageError> {
        let mut buf = vec![wire::MESSAGE_VERSION_PREFIX];
        wire::encode_message(&mut buf, self)?;
        Ok(buf)
    }

    /// Write the serialized body to `writer`.
    ///
    /// The body is encoded in full before anything reaches the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), MessageError> {
        let buf = self.serialize()?;
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Number of writable static keys that do not sign.
    pub fn num_writable_non_signers(&self) -> usize {
        self.account_keys
            .len()
            .saturating_sub(usize::from(self.header.num_required_signatures))
            .saturating_sub(usize::from(self.header.num_readonly_unsigned_accounts))
    }
}

impl From<CompiledMessage> for v0::Message {
    fn from(message: CompiledMessage) -> Self {
        v0::Message {
            header: message.header,
            account_keys: message.account_keys,
            recent_blockhash: message.recent_blockhash,
            instructions: message.instructions,
            address_table_lookups: message.address_table_lookups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgramIdPolicy;
    use solana_message::VersionedMessage;
    use solana_sdk::instruction::AccountMeta;
    use std::collections::HashSet;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn blockhash() -> Hash {
        Hash::new_from_array([7; 32])
    }

    fn table(n: u8, addresses: Vec<Pubkey>) -> AddressLookupTableAccount {
        AddressLookupTableAccount {
            key: key(n),
            addresses,
        }
    }

    // payer P, program G, accounts A (writable signer) and B (writable)
    fn sample() -> (Pubkey, Pubkey, Pubkey, Pubkey, Instruction) {
        let (p, g, a, b) = (key(1), key(2), key(3), key(4));
        let ix = Instruction::new_with_bytes(
            g,
            &[9, 8, 7],
            vec![AccountMeta::new(a, true), AccountMeta::new(b, false)],
        );
        (p, g, a, b, ix)
    }

    #[test]
    fn test_compile_without_lookup_tables() {
        let (p, g, a, b, ix) = sample();
        let message = CompiledMessage::try_compile(&p, &[ix], &[], blockhash()).unwrap();

        assert_eq!(message.account_keys, vec![p, a, b, g]);
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            }
        );
        assert_eq!(
            message.instructions,
            vec![CompiledInstruction {
                program_id_index: 3,
                accounts: vec![1, 2],
                data: vec![9, 8, 7],
            }]
        );
        assert!(message.address_table_lookups.is_empty());
        assert_eq!(message.num_writable_non_signers(), 1);
    }

    #[test]
    fn test_compile_with_lookup_table() {
        let (p, g, a, b, ix) = sample();
        let message =
            CompiledMessage::try_compile(&p, &[ix], &[table(100, vec![b])], blockhash()).unwrap();

        assert_eq!(message.account_keys, vec![p, a, g]);
        assert_eq!(message.instructions[0].program_id_index, 2);
        assert_eq!(message.instructions[0].accounts, vec![1, 3]);
        assert_eq!(
            message.address_table_lookups,
            vec![MessageAddressTableLookup {
                account_key: key(100),
                writable_indexes: vec![0],
                readonly_indexes: vec![],
            }]
        );
    }

    #[test]
    fn test_unmatched_table_is_omitted() {
        let (p, _, _, b, ix) = sample();
        let message = CompiledMessage::try_compile(
            &p,
            &[ix],
            &[table(100, vec![key(50)]), table(101, vec![key(51), b])],
            blockhash(),
        )
        .unwrap();

        assert_eq!(message.address_table_lookups.len(), 1);
        assert_eq!(message.address_table_lookups[0].account_key, key(101));
        assert_eq!(message.address_table_lookups[0].writable_indexes, vec![1]);
    }

    #[test]
    fn test_loaded_indexes_span_tables() {
        // writable keys of every table come before readonly keys of any table
        let payer = key(1);
        let program = key(2);
        let (w1, r1, w2, r2) = (key(10), key(11), key(20), key(21));
        let ix = Instruction::new_with_bytes(
            program,
            &[],
            vec![
                AccountMeta::new_readonly(r1, false),
                AccountMeta::new(w1, false),
                AccountMeta::new_readonly(r2, false),
                AccountMeta::new(w2, false),
            ],
        );
        let tables = [table(100, vec![r1, w1]), table(101, vec![w2, r2])];

        let message = CompiledMessage::try_compile_with_config(
            &payer,
            &[ix],
            &tables,
            blockhash(),
            &CompileConfig::with_program_id_policy(ProgramIdPolicy::Invoked),
        )
        .unwrap();

        assert_eq!(message.account_keys, vec![payer, program]);
        // combined space: [payer, program, w1, w2, r1, r2]
        assert_eq!(message.instructions[0].accounts, vec![4, 2, 5, 3]);
        assert_eq!(message.address_table_lookups[0].writable_indexes, vec![1]);
        assert_eq!(message.address_table_lookups[0].readonly_indexes, vec![0]);
        assert_eq!(message.address_table_lookups[1].writable_indexes, vec![0]);
        assert_eq!(message.address_table_lookups[1].readonly_indexes, vec![1]);
    }

    #[test]
    fn test_program_in_table_stays_static() {
        let (payer, program, account) = (key(1), key(2), key(3));
        let ix = Instruction::new_with_bytes(program, &[], vec![AccountMeta::new(account, false)]);
        let tables = [table(100, vec![program])];

        for policy in [ProgramIdPolicy::Plain, ProgramIdPolicy::Invoked] {
            let message = CompiledMessage::try_compile_with_config(
                &payer,
                &[ix.clone()],
                &tables,
                blockhash(),
                &CompileConfig::with_program_id_policy(policy),
            )
            .unwrap();

            assert_eq!(message.account_keys, vec![payer, account, program]);
            assert_eq!(message.instructions[0].program_id_index, 2);
            assert!(message.address_table_lookups.is_empty());
            assert!(v0::Message::from(message).sanitize().is_ok());
        }
    }

    #[test]
    fn test_program_loaded_alongside_accounts_is_sanitized() {
        let (p, g, a, b, ix) = sample();
        let tables = [table(100, vec![g, b])];

        let message = CompiledMessage::try_compile(&p, &[ix], &tables, blockhash()).unwrap();
        assert_eq!(message.account_keys, vec![p, a, g]);
        assert_eq!(message.address_table_lookups[0].writable_indexes, vec![1]);
        assert!(message.address_table_lookups[0].readonly_indexes.is_empty());
        assert!(v0::Message::from(message).sanitize().is_ok());
    }

    #[test]
    fn test_payer_and_uniqueness_invariants() {
        let payer = key(9);
        let shared = key(30);
        let instructions = vec![
            Instruction::new_with_bytes(
                key(2),
                &[1],
                vec![
                    AccountMeta::new_readonly(shared, false),
                    AccountMeta::new_readonly(key(31), true),
                    AccountMeta::new(payer, false),
                ],
            ),
            Instruction::new_with_bytes(
                key(3),
                &[2],
                vec![AccountMeta::new(shared, false), AccountMeta::new(key(32), false)],
            ),
        ];
        let tables = [
            table(100, vec![key(32), shared]),
            table(101, vec![shared, key(32), key(31)]),
        ];

        let message = CompiledMessage::try_compile(&payer, &instructions, &tables, blockhash())
            .unwrap();

        assert_eq!(message.account_keys[0], payer);
        assert!(message.header.num_required_signatures >= 1);
        let header = message.header;
        assert!(header.num_readonly_signed_accounts < header.num_required_signatures);

        let mut seen = HashSet::new();
        for k in &message.account_keys {
            assert!(seen.insert(*k));
        }
        for lookup in &message.address_table_lookups {
            let table = tables.iter().find(|t| t.key == lookup.account_key).unwrap();
            for index in lookup.writable_indexes.iter().chain(&lookup.readonly_indexes) {
                assert!(seen.insert(table.addresses[usize::from(*index)]));
            }
        }
        // payer, signer key(31), programs key(2), key(3) and the two drained keys
        assert_eq!(seen.len(), 6);
        // shared was first widened to writable then drained by the first table
        assert_eq!(message.address_table_lookups.len(), 1);
        assert_eq!(message.address_table_lookups[0].writable_indexes, vec![1, 0]);
    }

    #[test]
    fn test_header_consistency() {
        let instructions = vec![Instruction::new_with_bytes(
            key(2),
            &[],
            vec![
                AccountMeta::new(key(3), true),
                AccountMeta::new_readonly(key(4), true),
                AccountMeta::new(key(5), false),
                AccountMeta::new_readonly(key(6), false),
            ],
        )];
        let message =
            CompiledMessage::try_compile(&key(1), &instructions, &[], blockhash()).unwrap();
        let header = message.header;

        let num_signers = message
            .account_keys
            .iter()
            .filter(|k| [key(1), key(3), key(4)].contains(k))
            .count();
        assert_eq!(usize::from(header.num_required_signatures), num_signers);
        assert_eq!(
            usize::from(header.num_required_signatures - header.num_readonly_signed_accounts)
                + usize::from(header.num_readonly_signed_accounts)
                + message.num_writable_non_signers()
                + usize::from(header.num_readonly_unsigned_accounts),
            message.account_keys.len()
        );
        assert_eq!(message.account_keys, vec![key(1), key(3), key(4), key(5), key(2), key(6)]);
    }

    #[test]
    fn test_deterministic_output() {
        let instructions: Vec<Instruction> = (0..20u8)
            .map(|n| {
                Instruction::new_with_bytes(
                    key(200 + n % 3),
                    &[n],
                    vec![
                        AccountMeta::new(key(255 - n), n % 4 == 0),
                        AccountMeta::new_readonly(key(n.wrapping_mul(37)), false),
                    ],
                )
            })
            .collect();
        let tables = [table(100, (100..140).map(key).collect())];

        let first = CompiledMessage::try_compile(&key(1), &instructions, &tables, blockhash())
            .unwrap()
            .serialize()
            .unwrap();
        for _ in 0..5 {
            let again = CompiledMessage::try_compile(&key(1), &instructions, &tables, blockhash())
                .unwrap()
                .serialize()
                .unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_serialize_layout() {
        let (p, g, a, b, ix) = sample();
        let bytes = CompiledMessage::try_compile(&p, &[ix], &[], blockhash())
            .unwrap()
            .serialize()
            .unwrap();

        let mut expected = vec![2, 0, 1, 4];
        for k in [p, a, b, g] {
            expected.extend_from_slice(k.as_ref());
        }
        expected.extend_from_slice(&[7; 32]);
        expected.extend_from_slice(&[1, 3, 2, 1, 2, 3, 9, 8, 7]);
        expected.push(0);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_serialize_lookup_layout() {
        let (p, _, _, b, ix) = sample();
        let bytes = CompiledMessage::try_compile(&p, &[ix], &[table(100, vec![b])], blockhash())
            .unwrap()
            .serialize()
            .unwrap();

        let mut tail = vec![1];
        tail.extend_from_slice(key(100).as_ref());
        tail.extend_from_slice(&[1, 0, 0]);
        assert!(bytes.ends_with(&tail));
        assert_eq!(bytes.len(), 3 + 1 + 3 * 32 + 32 + 9 + tail.len());
    }

    #[test]
    fn test_matches_sdk_serialization() {
        let payer = key(1);
        let instructions = vec![
            solana_system_interface::instruction::transfer(&payer, &key(40), 1_000_000),
            solana_compute_budget_interface::ComputeBudgetInstruction::set_compute_unit_limit(
                200_000,
            ),
            Instruction::new_with_bytes(
                key(2),
                &[0xAB; 300],
                vec![
                    AccountMeta::new(key(41), false),
                    AccountMeta::new_readonly(key(42), false),
                    AccountMeta::new_readonly(key(43), true),
                ],
            ),
        ];
        let tables = [table(100, vec![key(42), key(41)])];

        let message = CompiledMessage::try_compile_with_config(
            &payer,
            &instructions,
            &tables,
            blockhash(),
            &CompileConfig::with_program_id_policy(ProgramIdPolicy::Invoked),
        )
        .unwrap();
        let ours = message.serialize_versioned().unwrap();
        let sdk = VersionedMessage::V0(v0::Message::from(message.clone())).serialize();

        assert_eq!(ours, sdk);
        assert_eq!(ours[0], wire::MESSAGE_VERSION_PREFIX);
        assert_eq!(&ours[1..], message.serialize().unwrap().as_slice());
    }

    #[test]
    fn test_missing_account_never_defaults() {
        let (p, _, _, _, ix) = sample();
        let message = CompiledMessage::try_compile(&p, &[ix.clone()], &[], blockhash()).unwrap();
        let account_keys =
            MessageAccountKeys::try_new(&message.account_keys, &LoadedAddresses::default())
                .unwrap();

        let stray = Instruction::new_with_bytes(
            ix.program_id,
            &[],
            vec![AccountMeta::new(key(77), false)],
        );
        let err = account_keys.try_compile_instructions(&[ix, stray]).unwrap_err();
        assert!(matches!(
            err,
            MessageError::MissingAccount { address, instruction: 1 } if address == key(77)
        ));
    }

    #[test]
    fn test_too_many_accounts() {
        let accounts = (0..=255u8)
            .map(|n| {
                let mut bytes = [0x55; 32];
                bytes[0] = n;
                AccountMeta::new(Pubkey::new_from_array(bytes), false)
            })
            .collect();
        let ix = Instruction::new_with_bytes(key(2), &[], accounts);

        assert!(matches!(
            CompiledMessage::try_compile(&key(1), &[ix], &[], blockhash()),
            Err(MessageError::AccountIndexOverflow { len: 258 })
        ));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_fault_is_encoding_error() {
        let (p, _, _, _, ix) = sample();
        let message = CompiledMessage::try_compile(&p, &[ix], &[], blockhash()).unwrap();

        assert!(matches!(
            message.write_to(&mut FailingWriter),
            Err(MessageError::Encoding(_))
        ));

        let mut sink = Vec::new();
        message.write_to(&mut sink).unwrap();
        assert_eq!(sink, message.serialize().unwrap());
    }
}
