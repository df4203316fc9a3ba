//! WASM wrappers for compiled messages.

use crate::error::MessageError;
use crate::intent::LookupTableIntent;
use crate::message::CompiledMessage;
use crate::pubkey::{Pubkey, PubkeyExt};
use crate::vault::VaultTransactionMessage;
use base64::prelude::*;
use serde::Serialize;
use solana_message::v0::MessageAddressTableLookup;
use solana_message::AddressLookupTableAccount;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressTableLookupJs {
    account_key: String,
    writable_indexes: Vec<u8>,
    readonly_indexes: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountMetaJs {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

fn keys_to_array(keys: &[Pubkey]) -> js_sys::Array {
    let arr = js_sys::Array::new();
    for key in keys {
        arr.push(&JsValue::from_str(&key.to_string()));
    }
    arr
}

fn lookups_to_js(lookups: &[MessageAddressTableLookup]) -> Result<JsValue, MessageError> {
    let lookups: Vec<AddressTableLookupJs> = lookups
        .iter()
        .map(|lookup| AddressTableLookupJs {
            account_key: lookup.account_key.to_string(),
            writable_indexes: lookup.writable_indexes.clone(),
            readonly_indexes: lookup.readonly_indexes.clone(),
        })
        .collect();
    serde_wasm_bindgen::to_value(&lookups)
        .map_err(|e| MessageError::InvalidInput(format!("Serialization error: {}", e)))
}

/// WASM wrapper for a compiled v0 message.
#[wasm_bindgen]
pub struct WasmCompiledMessage {
    inner: CompiledMessage,
}

#[wasm_bindgen]
impl WasmCompiledMessage {
    #[wasm_bindgen(getter)]
    pub fn num_required_signatures(&self) -> u8 {
        self.inner.header.num_required_signatures
    }

    #[wasm_bindgen(getter)]
    pub fn num_readonly_signed_accounts(&self) -> u8 {
        self.inner.header.num_readonly_signed_accounts
    }

    #[wasm_bindgen(getter)]
    pub fn num_readonly_unsigned_accounts(&self) -> u8 {
        self.inner.header.num_readonly_unsigned_accounts
    }

    /// Get the block reference as a base58 string.
    #[wasm_bindgen(getter)]
    pub fn recent_blockhash(&self) -> String {
        self.inner.recent_blockhash.to_string()
    }

    /// Get the static account keys as an array of base58 strings.
    #[wasm_bindgen]
    pub fn static_account_keys(&self) -> js_sys::Array {
        keys_to_array(&self.inner.account_keys)
    }

    /// Get the address table lookups as `{ accountKey, writableIndexes, readonlyIndexes }` objects.
    #[wasm_bindgen]
    pub fn address_table_lookups(&self) -> Result<JsValue, MessageError> {
        lookups_to_js(&self.inner.address_table_lookups)
    }

    /// Serialize the message body.
    #[wasm_bindgen]
    pub fn to_bytes(&self) -> Result<js_sys::Uint8Array, MessageError> {
        let bytes = self.inner.serialize()?;
        Ok(js_sys::Uint8Array::from(&bytes[..]))
    }

    /// Serialize the message with the v0 version prefix.
    #[wasm_bindgen]
    pub fn to_versioned_bytes(&self) -> Result<js_sys::Uint8Array, MessageError> {
        let bytes = self.inner.serialize_versioned()?;
        Ok(js_sys::Uint8Array::from(&bytes[..]))
    }

    /// Serialize the message with the v0 version prefix, base64 encoded.
    #[wasm_bindgen]
    pub fn to_base64(&self) -> Result<String, MessageError> {
        Ok(BASE64_STANDARD.encode(self.inner.serialize_versioned()?))
    }
}

impl WasmCompiledMessage {
    pub fn from_inner(inner: CompiledMessage) -> Self {
        WasmCompiledMessage { inner }
    }
}

/// WASM wrapper for a vault transaction message.
#[wasm_bindgen]
pub struct WasmVaultTransactionMessage {
    inner: VaultTransactionMessage,
}

#[wasm_bindgen]
impl WasmVaultTransactionMessage {
    /// Decode a vault transaction message, e.g. one read back from a vault transaction account.
    #[wasm_bindgen]
    pub fn from_bytes(bytes: &[u8]) -> Result<WasmVaultTransactionMessage, MessageError> {
        VaultTransactionMessage::deserialize(bytes)
            .map(|inner| WasmVaultTransactionMessage { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn num_signers(&self) -> u8 {
        self.inner.num_signers
    }

    #[wasm_bindgen(getter)]
    pub fn num_writable_signers(&self) -> u8 {
        self.inner.num_writable_signers
    }

    #[wasm_bindgen(getter)]
    pub fn num_writable_non_signers(&self) -> u8 {
        self.inner.num_writable_non_signers
    }

    #[wasm_bindgen]
    pub fn account_keys(&self) -> js_sys::Array {
        keys_to_array(&self.inner.account_keys)
    }

    #[wasm_bindgen]
    pub fn address_table_lookups(&self) -> Result<JsValue, MessageError> {
        lookups_to_js(&self.inner.address_table_lookups)
    }

    /// Serialize in the multisig program's borsh layout.
    #[wasm_bindgen]
    pub fn to_bytes(&self) -> Result<js_sys::Uint8Array, MessageError> {
        let bytes = self.inner.serialize()?;
        Ok(js_sys::Uint8Array::from(&bytes[..]))
    }

    /// Resolve the remaining accounts of a vault transaction execute instruction.
    ///
    /// @param vault - The vault address (base58)
    /// @param ephemeralSigners - Ephemeral signer addresses (base58) the program signs for
    /// @param lookupTables - `[{ key, addresses }]` snapshots of every table the message references
    /// @returns Array of `{ pubkey, isSigner, isWritable }`
    #[wasm_bindgen]
    pub fn execute_account_metas(
        &self,
        vault: &str,
        ephemeral_signers: Vec<String>,
        lookup_tables: JsValue,
    ) -> Result<JsValue, MessageError> {
        let vault = Pubkey::from_base58("vault", vault)?;
        let ephemeral_signers = ephemeral_signers
            .iter()
            .map(|address| Pubkey::from_base58("ephemeral signer", address))
            .collect::<Result<Vec<_>, _>>()?;
        let no_tables = lookup_tables.is_undefined() || lookup_tables.is_null();
        let tables: Vec<LookupTableIntent> = if no_tables {
            Vec::new()
        } else {
            serde_wasm_bindgen::from_value(lookup_tables).map_err(|e| {
                MessageError::InvalidInput(format!("Failed to parse lookup tables: {}", e))
            })?
        };
        let tables = tables
            .iter()
            .map(LookupTableIntent::to_lookup_table_account)
            .collect::<Result<Vec<AddressLookupTableAccount>, _>>()?;

        let metas: Vec<AccountMetaJs> = self
            .inner
            .execute_account_metas(&vault, &ephemeral_signers, &tables)?
            .into_iter()
            .map(|meta| AccountMetaJs {
                pubkey: meta.pubkey.to_string(),
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
            .collect();
        serde_wasm_bindgen::to_value(&metas)
            .map_err(|e| MessageError::InvalidInput(format!("Serialization error: {}", e)))
    }
}

impl WasmVaultTransactionMessage {
    pub fn from_inner(inner: VaultTransactionMessage) -> Self {
        WasmVaultTransactionMessage { inner }
    }
}
