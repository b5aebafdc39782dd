//! Wire framing codec
//!
//! Every message travels as `HEADER || BODY || '\n'`, where `HEADER` is the
//! body length written as zero-padded ASCII decimal in exactly
//! [`HEADER_WIDTH`] bytes. The delimiter is only a read-boundary hint;
//! the header is the authoritative length.
//!
//! Everything in this module is pure: no I/O, no shared state.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::CodecError;

/// Width of the decimal length header in bytes
pub const HEADER_WIDTH: usize = 4;

/// Largest body the header can describe (`10^HEADER_WIDTH - 1`)
pub const MAX_BODY: usize = 10usize.pow(HEADER_WIDTH as u32) - 1;

/// Read-boundary delimiter appended after each frame
pub const DELIMITER: u8 = b'\n';

/// Largest well-formed frame on the wire, delimiter included
pub const MAX_FRAME_LEN: usize = HEADER_WIDTH + MAX_BODY + 1;

/// One immutable framed message
///
/// Holds the wire form (`header || body`) behind an `Arc` so fanning a
/// message out to many sessions only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    wire: Arc<[u8]>,
}

impl Message {
    /// Frame `body`, failing if it exceeds [`MAX_BODY`]
    pub fn encode(body: impl AsRef<[u8]>) -> Result<Self, CodecError> {
        let body = body.as_ref();
        if body.len() > MAX_BODY {
            return Err(CodecError::PayloadTooLarge {
                len: body.len(),
                max: MAX_BODY,
            });
        }

        let mut wire = Vec::with_capacity(HEADER_WIDTH + body.len());
        wire.extend_from_slice(format!("{:0width$}", body.len(), width = HEADER_WIDTH).as_bytes());
        wire.extend_from_slice(body);

        Ok(Self { wire: wire.into() })
    }

    /// The fixed-width length header
    pub fn header(&self) -> &[u8] {
        &self.wire[..HEADER_WIDTH]
    }

    /// The payload bytes
    pub fn body(&self) -> &[u8] {
        &self.wire[HEADER_WIDTH..]
    }

    /// The payload as text, replacing invalid UTF-8
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }

    /// `header || body`, without the delimiter
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }

    /// `header || body || '\n'`, ready to be written to a stream
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.wire.len() + 1);
        frame.extend_from_slice(&self.wire);
        frame.push(DELIMITER);
        frame
    }

    /// Body length in bytes
    pub fn len(&self) -> usize {
        self.wire.len() - HEADER_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a length header
///
/// The field must be all ASCII digits. A value above [`MAX_BODY`] is
/// reported as `PayloadTooLarge` even when the field is wider than
/// [`HEADER_WIDTH`]; any other width is `InvalidHeader`.
pub fn decode_header(header: &[u8]) -> Result<usize, CodecError> {
    if header.is_empty() || !header.iter().all(u8::is_ascii_digit) {
        return Err(invalid_header(header));
    }

    let value = header.iter().try_fold(0usize, |acc, digit| {
        acc.checked_mul(10)?.checked_add(usize::from(digit - b'0'))
    });

    match value {
        Some(len) if len <= MAX_BODY && header.len() == HEADER_WIDTH => Ok(len),
        Some(len) if len <= MAX_BODY => Err(invalid_header(header)),
        Some(len) => Err(CodecError::PayloadTooLarge {
            len,
            max: MAX_BODY,
        }),
        None => Err(CodecError::PayloadTooLarge {
            len: usize::MAX,
            max: MAX_BODY,
        }),
    }
}

/// Decode one delimiter-bounded chunk (delimiter already stripped)
///
/// The body must be exactly as long as the header declares.
pub fn decode_frame(chunk: &[u8]) -> Result<Message, CodecError> {
    if chunk.len() < HEADER_WIDTH {
        return Err(invalid_header(chunk));
    }

    let (header, body) = chunk.split_at(HEADER_WIDTH);
    if body.len() > MAX_BODY {
        return Err(CodecError::PayloadTooLarge {
            len: body.len(),
            max: MAX_BODY,
        });
    }

    let declared = decode_header(header)?;
    if declared != body.len() {
        return Err(CodecError::FramingMismatch {
            declared,
            actual: body.len(),
        });
    }

    Ok(Message { wire: chunk.into() })
}

fn invalid_header(field: &[u8]) -> CodecError {
    CodecError::InvalidHeader(String::from_utf8_lossy(field).into_owned())
}
