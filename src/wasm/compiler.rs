//! WASM binding for message compilation.
//!
//! Exposes message compilation functions:
//! - `compileMessage` - v0 message body bytes
//! - `compileVersionedMessage` - v0 message bytes with the version prefix
//! - `compile` - a `WasmCompiledMessage` for inspection
//! - `compileVaultMessage` - a vault transaction message for the multisig program

use crate::error::MessageError;
use crate::intent::{self, MessageIntent};
use crate::wasm::{WasmCompiledMessage, WasmVaultTransactionMessage};
use wasm_bindgen::prelude::*;

/// Namespace for message compilation operations.
#[wasm_bindgen]
pub struct CompilerNamespace;

fn parse_intent(intent: JsValue) -> Result<MessageIntent, MessageError> {
    serde_wasm_bindgen::from_value(intent)
        .map_err(|e| MessageError::InvalidInput(format!("Failed to parse message intent: {}", e)))
}

#[wasm_bindgen]
impl CompilerNamespace {
    /// Compile a message intent into v0 message body bytes.
    ///
    /// # Intent Structure
    ///
    /// ```json
    /// {
    ///   "payer": "DgT9qyYwYKBRDyDw3EfR12LHQCQjtNrKu2qMsXHuosmB",
    ///   "recentBlockhash": "GWaQEymC3Z9SHM2gkh8u12xL1zJPMHPCSVR3pSDpEXE4",
    ///   "instructions": [
    ///     {
    ///       "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
    ///       "accounts": [{ "pubkey": "...", "isSigner": true, "isWritable": false }],
    ///       "data": "base64EncodedData"
    ///     }
    ///   ],
    ///   "addressLookupTables": [{ "key": "...", "addresses": ["...", "..."] }],
    ///   "config": { "programIdPolicy": "plain" }
    /// }
    /// ```
    ///
    /// `addressLookupTables` and `config` are optional.
    ///
    /// @param intent - The message intent as a JSON object
    /// @returns Serialized message bytes
    #[wasm_bindgen(js_name = "compileMessage")]
    pub fn compile_message(intent: JsValue) -> Result<Vec<u8>, MessageError> {
        let intent = parse_intent(intent)?;
        intent::compile_intent(&intent)?.serialize()
    }

    /// Compile a message intent into v0 message bytes prefixed with the version byte.
    ///
    /// @param intent - The message intent as a JSON object
    /// @returns Serialized versioned message bytes
    #[wasm_bindgen(js_name = "compileVersionedMessage")]
    pub fn compile_versioned_message(intent: JsValue) -> Result<Vec<u8>, MessageError> {
        let intent = parse_intent(intent)?;
        intent::compile_intent(&intent)?.serialize_versioned()
    }

    /// Compile a message intent and keep the result for inspection.
    #[wasm_bindgen]
    pub fn compile(intent: JsValue) -> Result<WasmCompiledMessage, MessageError> {
        let intent = parse_intent(intent)?;
        intent::compile_intent(&intent).map(WasmCompiledMessage::from_inner)
    }

    /// Compile a message intent into a vault transaction message.
    ///
    /// The intent's `payer` is the vault; `recentBlockhash` is not required.
    #[wasm_bindgen(js_name = "compileVaultMessage")]
    pub fn compile_vault_message(
        intent: JsValue,
    ) -> Result<WasmVaultTransactionMessage, MessageError> {
        let intent = parse_intent(intent)?;
        intent::compile_vault_intent(&intent).map(WasmVaultTransactionMessage::from_inner)
    }
}
