use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use wasm_bindgen::prelude::*;

#[derive(Debug, Error)]
pub enum MessageError {
    /// An instruction references an address that is not in the compiled key set.
    #[error("instruction {instruction} references unknown account `{address}`")]
    MissingAccount { address: Pubkey, instruction: usize },

    #[error("account index overflowed during compilation ({len} accounts)")]
    AccountIndexOverflow { len: usize },

    #[error("address lookup table `{table}` index {index} overflowed during compilation")]
    LookupTableIndexOverflow { table: Pubkey, index: usize },

    #[error("{field} length {len} does not fit its length prefix")]
    LengthOverflow { field: &'static str, len: usize },

    #[error("address lookup table `{0}` was not supplied")]
    UnknownLookupTable(Pubkey),

    #[error("address lookup table `{table}` has no entry at index {index}")]
    LookupIndexOutOfRange { table: Pubkey, index: u8 },

    #[error("failed to encode message: {0}")]
    Encoding(#[from] std::io::Error),

    #[error("{0}")]
    InvalidInput(String),
}

impl MessageError {
    pub fn invalid_input(s: &str) -> MessageError {
        MessageError::InvalidInput(s.to_string())
    }
}

// Required for wasm_bindgen to convert errors to JavaScript exceptions
// Uses js_sys::Error to create a proper JavaScript Error with stack trace
impl From<MessageError> for JsValue {
    fn from(err: MessageError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
