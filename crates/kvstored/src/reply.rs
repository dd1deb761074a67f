//! RESP-style reply encoder (§4.J) — writes directly into a
//! connection's fixed-size write buffer. Each reply is assembled in a
//! scratch buffer first and committed as a whole; a reply that would
//! overflow the write buffer's fixed capacity is dropped in full
//! rather than leaving a partial frame behind, a documented limit of
//! the single-in-flight-reply model (§9).

pub const WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

/// A reply that would overflow the write buffer's fixed capacity was
/// dropped in full.
#[derive(Debug)]
pub struct BufferOverflow;

fn commit(buf: &mut Vec<u8>, frame: Vec<u8>) -> Result<(), BufferOverflow> {
    if buf.len() + frame.len() > WRITE_BUFFER_CAPACITY {
        tracing::error!(
            buffered = buf.len(),
            frame_len = frame.len(),
            "write buffer full, dropping reply"
        );
        return Err(BufferOverflow);
    }
    buf.extend_from_slice(&frame);
    Ok(())
}

pub fn status(buf: &mut Vec<u8>, text: &str) -> Result<(), BufferOverflow> {
    let mut frame = Vec::with_capacity(text.len() + 3);
    frame.push(b'+');
    frame.extend_from_slice(text.as_bytes());
    frame.extend_from_slice(b"\r\n");
    commit(buf, frame)
}

pub fn error(buf: &mut Vec<u8>, text: &str) -> Result<(), BufferOverflow> {
    let mut frame = Vec::with_capacity(text.len() + 8);
    frame.extend_from_slice(b"-ERR ");
    frame.extend_from_slice(text.as_bytes());
    frame.extend_from_slice(b"\r\n");
    commit(buf, frame)
}

pub fn integer(buf: &mut Vec<u8>, n: i64) -> Result<(), BufferOverflow> {
    let mut frame = Vec::with_capacity(24);
    frame.push(b':');
    frame.extend_from_slice(n.to_string().as_bytes());
    frame.extend_from_slice(b"\r\n");
    commit(buf, frame)
}

/// A present bulk reply of `data` (possibly empty, never absent).
pub fn bulk(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), BufferOverflow> {
    let mut frame = Vec::with_capacity(data.len() + 16);
    frame.push(b'$');
    frame.extend_from_slice(data.len().to_string().as_bytes());
    frame.extend_from_slice(b"\r\n");
    frame.extend_from_slice(data);
    frame.extend_from_slice(b"\r\n");
    commit(buf, frame)
}

/// The absent-value bulk reply, `$-1\r\n`.
pub fn nil_bulk(buf: &mut Vec<u8>) -> Result<(), BufferOverflow> {
    commit(buf, b"$-1\r\n".to_vec())
}

/// An array header for `count` elements; the caller writes each
/// element (typically via [`bulk`]) immediately after.
pub fn array_header(buf: &mut Vec<u8>, count: usize) -> Result<(), BufferOverflow> {
    let mut frame = Vec::with_capacity(16);
    frame.push(b'*');
    frame.extend_from_slice(count.to_string().as_bytes());
    frame.extend_from_slice(b"\r\n");
    commit(buf, frame)
}

/// Assembles the header and every element into one scratch buffer
/// before committing, so a reply that would overflow never leaves a
/// truncated `*N\r\n` with fewer than N elements behind in `buf` — the
/// header alone is just as much a partial frame as a dropped tail.
pub fn array_of_bulks<'a>(
    buf: &mut Vec<u8>,
    items: impl Iterator<Item = &'a [u8]> + ExactSizeIterator,
) -> Result<(), BufferOverflow> {
    let mut frame = Vec::new();
    frame.push(b'*');
    frame.extend_from_slice(items.len().to_string().as_bytes());
    frame.extend_from_slice(b"\r\n");
    for item in items {
        frame.push(b'$');
        frame.extend_from_slice(item.len().to_string().as_bytes());
        frame.extend_from_slice(b"\r\n");
        frame.extend_from_slice(item);
        frame.extend_from_slice(b"\r\n");
    }
    commit(buf, frame)
}
