//! Binary snapshot codec (§4.E) — the sole persistence mechanism.
//!
//! Big-endian framing, read and written with `byteorder`'s
//! `ReadBytesExt`/`WriteBytesExt`, the same approach this codebase's
//! block-device protocol layer uses for its own big-endian wire
//! structs. Every entry is variable-length (key bytes, and STRING/
//! BINARY value bytes), so there's no fixed-layout struct to overlay
//! the way the chunk-header wire types do — each field is read or
//! written individually instead.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::bytespan::{ByteSpan, MAX_SPAN_LEN};
use crate::hashtable::HashTable;
use crate::value::{Tag, Value};

/// Magic number identifying a snapshot file, big-endian on disk.
pub const MAGIC: u32 = 0x4B56_DB02;

/// Format version written by this implementation.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;
pub const VERSION_PATCH: u8 = 0;

/// Errors from reading or writing a snapshot.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic number: expected {MAGIC:#010x}")]
    BadMagic,

    #[error("unknown value tag {0}")]
    UnknownTag(u8),

    #[error("length {len} exceeds the {max} byte span limit")]
    OversizeLength { len: u32, max: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Write every live entry of `table` to `w` in the format documented
/// in §4.E. Iteration order becomes on-disk order, but §8 property 5
/// does not require it to be preserved on load.
pub fn write_snapshot<W: Write>(w: &mut W, table: &HashTable) -> CodecResult<()> {
    w.write_u32::<BigEndian>(MAGIC)?;
    w.write_u8(VERSION_MAJOR)?;
    w.write_u8(VERSION_MINOR)?;
    w.write_u8(VERSION_PATCH)?;
    w.write_u32::<BigEndian>(table.len() as u32)?;

    for (key, value) in table.iter() {
        w.write_u32::<BigEndian>(key.len() as u32)?;
        w.write_all(key.as_bytes())?;
        write_value(w, &value)?;
    }
    Ok(())
}

fn write_value<W: Write>(w: &mut W, value: &Value) -> CodecResult<()> {
    w.write_u8(value.tag() as u8)?;
    match value {
        Value::Null => {}
        Value::String(s) => {
            w.write_u32::<BigEndian>(s.len() as u32)?;
            w.write_all(s.as_bytes())?;
        }
        Value::Int64(n) => {
            w.write_u64::<BigEndian>(*n as u64)?;
        }
        // Written in host endianness, not converted to a big-endian
        // bit pattern — a deliberate, documented portability caveat
        // (§9): preserving bug-compatible behavior rather than
        // silently changing the on-disk format.
        Value::Double(d) => {
            w.write_all(&d.to_ne_bytes())?;
        }
        Value::Bool(b) => {
            w.write_u8(if *b { 1 } else { 0 })?;
        }
        Value::Binary(b) => {
            w.write_u32::<BigEndian>(b.len() as u32)?;
            w.write_all(b.as_bytes())?;
        }
    }
    Ok(())
}

/// Read a snapshot from `r`, replacing the entire contents of
/// `table`: the destination is cleared first, then every entry is
/// replayed through `put`. Unknown tag, oversize length, short read,
/// or bad magic all fail with a distinct [`CodecError`], and in every
/// failure case the destination table is left cleared (partially
/// loaded is not a supported state — callers that need atomicity
/// should `load` into a scratch table and swap it in on success).
pub fn read_snapshot<R: Read>(r: &mut R, table: &mut HashTable) -> CodecResult<()> {
    let magic = r.read_u32::<BigEndian>()?;
    if magic != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let _major = r.read_u8()?;
    let _minor = r.read_u8()?;
    let _patch = r.read_u8()?;
    let count = r.read_u32::<BigEndian>()?;

    table.clear();

    for _ in 0..count {
        let key_len = r.read_u32::<BigEndian>()?;
        if key_len as usize > MAX_SPAN_LEN {
            table.clear();
            return Err(CodecError::OversizeLength {
                len: key_len,
                max: MAX_SPAN_LEN,
            });
        }
        let mut key = vec![0u8; key_len as usize];
        r.read_exact(&mut key)?;

        let value = match read_value(r) {
            Ok(v) => v,
            Err(e) => {
                table.clear();
                return Err(e);
            }
        };

        if table.put(&key, &value).is_err() {
            table.clear();
            return Err(CodecError::OversizeLength {
                len: key_len,
                max: MAX_SPAN_LEN,
            });
        }
    }

    Ok(())
}

fn read_value<R: Read>(r: &mut R) -> CodecResult<Value> {
    let tag_byte = r.read_u8()?;
    let tag = Tag::from_u8(tag_byte).ok_or(CodecError::UnknownTag(tag_byte))?;
    Ok(match tag {
        Tag::Null => Value::Null,
        Tag::String => Value::String(read_span(r)?),
        Tag::Int64 => Value::Int64(r.read_u64::<BigEndian>()? as i64),
        Tag::Double => {
            let mut buf = [0u8; 8];
            r.read_exact(&mut buf)?;
            Value::Double(f64::from_ne_bytes(buf))
        }
        Tag::Bool => Value::Bool(r.read_u8()? != 0),
        Tag::Binary => Value::Binary(read_span(r)?),
    })
}

fn read_span<R: Read>(r: &mut R) -> CodecResult<ByteSpan> {
    let len = r.read_u32::<BigEndian>()?;
    if len as usize > MAX_SPAN_LEN {
        return Err(CodecError::OversizeLength {
            len,
            max: MAX_SPAN_LEN,
        });
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(ByteSpan::new(buf))
}
