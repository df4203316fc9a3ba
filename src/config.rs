//! Compilation options.
//!
//! Options are deserialized from JavaScript alongside a `MessageIntent`, so every
//! field has a default and an absent `config` object compiles with defaults.

use serde::Deserialize;

/// How instruction program targets are recorded during key aggregation.
///
/// Top-level messages keep program targets static under either policy. The
/// policy decides whether a vault transaction message may load them from a
/// lookup table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgramIdPolicy {
    /// Program targets stay plain readonly non-signer accounts. A vault
    /// message may load them through an address lookup table, since the
    /// multisig program executes it through CPI.
    #[default]
    Plain,
    /// Program targets are marked invoked and always stay in the static keys.
    Invoked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileConfig {
    pub program_id_policy: ProgramIdPolicy,
}

impl CompileConfig {
    pub fn with_program_id_policy(program_id_policy: ProgramIdPolicy) -> Self {
        CompileConfig { program_id_policy }
    }

    pub(crate) fn marks_programs_invoked(&self) -> bool {
        self.program_id_policy == ProgramIdPolicy::Invoked
    }
}
