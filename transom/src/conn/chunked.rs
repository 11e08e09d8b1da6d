//! Pure helpers for the `Transfer-Encoding: chunked` wire format: framing
//! outbound chunks and parsing the hex chunk-size line off inbound ones.
//!
//! The actual byte-level reading/writing lives on `Connection` in
//! `conn::mod`, since it needs the transport; this module only knows about
//! bytes already in hand.

use bytes::{BufMut, Bytes, BytesMut};
use http::HeaderMap;

use crate::error::ProtocolError;

/// Frames `data` as one chunk: `{len in hex}\r\n{data}\r\n`.
pub fn encode_chunk(data: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(data.len() + 16);
    out.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
    out.put_slice(data);
    out.put_slice(b"\r\n");
    out.freeze()
}

/// Frames the terminal `0\r\n` chunk, optionally followed by trailer fields.
pub fn encode_last_chunk(trailers: Option<&HeaderMap>) -> Bytes {
    let mut out = BytesMut::with_capacity(32);
    out.put_slice(b"0\r\n");
    if let Some(trailers) = trailers {
        for (name, value) in trailers.iter() {
            out.put_slice(name.as_str().as_bytes());
            out.put_slice(b": ");
            out.put_slice(value.as_bytes());
            out.put_slice(b"\r\n");
        }
    }
    out.put_slice(b"\r\n");
    out.freeze()
}

/// Parses a chunk-size line (the hex size, optionally followed by
/// `;extension` text this implementation ignores) into the byte count of
/// the chunk that follows.
pub fn parse_chunk_size_line(line: &[u8]) -> Result<usize, ProtocolError> {
    let text = std::str::from_utf8(line).map_err(|_| ProtocolError::MalformedChunk)?;
    let size_text = text.split(';').next().unwrap_or(text).trim();
    usize::from_str_radix(size_text, 16).map_err(|_| ProtocolError::MalformedChunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_chunk() {
        assert_eq!(&encode_chunk(b"abc")[..], b"3\r\nabc\r\n");
    }

    #[test]
    fn encodes_empty_last_chunk() {
        assert_eq!(&encode_last_chunk(None)[..], b"0\r\n\r\n");
    }

    #[test]
    fn encodes_last_chunk_with_trailers() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", "abc".parse().unwrap());
        assert_eq!(&encode_last_chunk(Some(&trailers))[..], b"0\r\nx-checksum: abc\r\n\r\n");
    }

    #[test]
    fn parses_plain_hex_size() {
        assert_eq!(parse_chunk_size_line(b"1a").unwrap(), 26);
    }

    #[test]
    fn parses_size_with_extension() {
        assert_eq!(parse_chunk_size_line(b"1a;foo=bar").unwrap(), 26);
    }

    #[test]
    fn rejects_non_hex_size() {
        assert!(parse_chunk_size_line(b"zz").is_err());
    }
}
