//! Incremental UTF-8 decoding across frame boundaries
//!
//! Output frames may split a multi-byte codepoint anywhere, so decoding keeps
//! the trailing partial sequence and prepends it to the next chunk.

/// Streaming UTF-8 decoder
///
/// `push` returns all text decodable so far; bytes forming an incomplete
/// trailing sequence are carried into the next call. Invalid bytes in the
/// middle of the stream are replaced with U+FFFD rather than dropped, so a
/// corrupt byte cannot stall the decoder.
#[derive(Debug, Default)]
pub struct Utf8Stream {
    carry: Vec<u8>,
}

impl Utf8Stream {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk of bytes, joining any carried partial sequence
    pub fn push(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = &bytes[..];

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // Safety: from_utf8 just validated this prefix.
                    out.push_str(unsafe { std::str::from_utf8_unchecked(&rest[..valid]) });
                    match err.error_len() {
                        Some(bad) => {
                            // Invalid sequence in the middle of the stream.
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            // Incomplete trailing sequence: carry it forward.
                            self.carry = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Bytes currently held back waiting for the rest of a codepoint
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Drop any carried partial sequence (connection teardown)
    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut stream = Utf8Stream::new();
        assert_eq!(stream.push(b"hello"), "hello");
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_codepoint_split_across_chunks() {
        // "é" = 0xC3 0xA9
        let mut stream = Utf8Stream::new();
        assert_eq!(stream.push(&[b'a', 0xC3]), "a");
        assert_eq!(stream.pending(), 1);
        assert_eq!(stream.push(&[0xA9, b'b']), "éb");
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_four_byte_codepoint_byte_by_byte() {
        // "🦀" = F0 9F A6 80
        let mut stream = Utf8Stream::new();
        let crab = "🦀".as_bytes();
        let mut out = String::new();
        for b in crab {
            out.push_str(&stream.push(&[*b]));
        }
        assert_eq!(out, "🦀");
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut stream = Utf8Stream::new();
        assert_eq!(stream.push(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_reset_drops_carry() {
        let mut stream = Utf8Stream::new();
        stream.push(&[0xC3]);
        assert_eq!(stream.pending(), 1);
        stream.reset();
        assert_eq!(stream.pending(), 0);
        assert_eq!(stream.push(b"x"), "x");
    }
}
