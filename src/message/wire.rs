//! Wire encoding of compiled messages.
//!
//! # Layout
//!
//! ```text
//! header            3 x u8
//! account_keys      compact-len, 32 bytes each
//! recent_blockhash  32 bytes
//! instructions      compact-len, each:
//!                     program_id_index u8
//!                     accounts         compact-len, u8 each
//!                     data             compact-len, raw bytes
//! lookups           compact-len, each:
//!                     account_key      32 bytes
//!                     writable_indexes compact-len, u8 each
//!                     readonly_indexes compact-len, u8 each
//! ```
//!
//! A compact length is an unsigned 16 bit value written as little-endian 7 bit
//! groups, the high bit of each byte flagging that another group follows.

use super::CompiledMessage;
use crate::error::MessageError;
use std::io::Write;

/// Version byte of a v0 message when embedded in a versioned transaction.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Write `len` as a compact length using the fewest 7 bit groups.
pub fn write_compact_len<W: Write>(
    writer: &mut W,
    field: &'static str,
    len: usize,
) -> Result<(), MessageError> {
    let mut rem = u16::try_from(len).map_err(|_| MessageError::LengthOverflow { field, len })?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            writer.write_all(&[byte])?;
            return Ok(());
        }
        byte |= 0x80;
        writer.write_all(&[byte])?;
    }
}

fn write_short_bytes<W: Write>(
    writer: &mut W,
    field: &'static str,
    bytes: &[u8],
) -> Result<(), MessageError> {
    write_compact_len(writer, field, bytes.len())?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Encode the message body in wire layout.
pub fn encode_message<W: Write>(
    writer: &mut W,
    message: &CompiledMessage,
) -> Result<(), MessageError> {
    let header = &message.header;
    writer.write_all(&[
        header.num_required_signatures,
        header.num_readonly_signed_accounts,
        header.num_readonly_unsigned_accounts,
    ])?;

    write_compact_len(writer, "account_keys", message.account_keys.len())?;
    for key in &message.account_keys {
        writer.write_all(key.as_ref())?;
    }

    writer.write_all(message.recent_blockhash.as_ref())?;

    write_compact_len(writer, "instructions", message.instructions.len())?;
    for ix in &message.instructions {
        writer.write_all(&[ix.program_id_index])?;
        write_short_bytes(writer, "instruction accounts", &ix.accounts)?;
        write_short_bytes(writer, "instruction data", &ix.data)?;
    }

    write_compact_len(
        writer,
        "address_table_lookups",
        message.address_table_lookups.len(),
    )?;
    for lookup in &message.address_table_lookups {
        writer.write_all(lookup.account_key.as_ref())?;
        write_short_bytes(writer, "writable_indexes", &lookup.writable_indexes)?;
        write_short_bytes(writer, "readonly_indexes", &lookup.readonly_indexes)?;
    }

    Ok(())
}
