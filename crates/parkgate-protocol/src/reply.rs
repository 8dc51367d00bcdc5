//! Acknowledgement lines exchanged after every frame.

use bytes::{BufMut, BytesMut};
use parkgate_core::constants::{ACK_ERR, ACK_OK, ACK_TERMINATOR, MAX_REPLY_LINE};
use std::fmt;

/// A textual acknowledgement.
///
/// The receiving side of a frame answers `OK\n` when it validated the frame
/// and `ERR\n` when it did not. Lines are compared after trimming
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Nack,
    /// Any other non-empty line.
    Unrecognized(String),
}

impl Reply {
    /// Classify one line of text, `None` for blank lines.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::Reply;
    ///
    /// assert_eq!(Reply::parse("OK\r"), Some(Reply::Ack));
    /// assert_eq!(Reply::parse(" ERR "), Some(Reply::Nack));
    /// assert_eq!(Reply::parse("ok"), Some(Reply::Unrecognized("ok".into())));
    /// assert_eq!(Reply::parse("   "), None);
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            ACK_OK => Some(Reply::Ack),
            ACK_ERR => Some(Reply::Nack),
            other => Some(Reply::Unrecognized(other.to_string())),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Reply::Ack)
    }

    /// Token written on the wire, without terminator.
    pub fn token(&self) -> &str {
        match self {
            Reply::Ack => ACK_OK,
            Reply::Nack => ACK_ERR,
            Reply::Unrecognized(text) => text,
        }
    }

    /// Append the line, terminator included, to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let token = self.token();
        dst.reserve(token.len() + 1);
        dst.put_slice(token.as_bytes());
        dst.put_u8(ACK_TERMINATOR);
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Assembles acknowledgement lines out of bytes that are not part of a
/// frame.
///
/// Control bytes other than the terminator, carriage returns included, are
/// ignored. Lines longer than [`MAX_REPLY_LINE`] are
/// noise and are dropped up to the next terminator.
#[derive(Debug, Default)]
pub struct LineAssembler {
    line: Vec<u8>,
    overflowed: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one byte; returns a reply when it completed a non-blank line.
    pub fn push(&mut self, byte: u8) -> Option<Reply> {
        match byte {
            ACK_TERMINATOR => {
                let overflowed = std::mem::take(&mut self.overflowed);
                let line = std::mem::take(&mut self.line);
                if overflowed {
                    return None;
                }
                Reply::parse(&String::from_utf8_lossy(&line))
            }
            _ if self.overflowed || byte.is_ascii_control() => None,
            _ => {
                if self.line.len() >= MAX_REPLY_LINE {
                    self.line.clear();
                    self.overflowed = true;
                } else {
                    self.line.push(byte);
                }
                None
            }
        }
    }

    /// Forget a partially assembled line.
    pub fn reset(&mut self) {
        self.line.clear();
        self.overflowed = false;
    }

    pub fn pending(&self) -> usize {
        self.line.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn feed(assembler: &mut LineAssembler, bytes: &[u8]) -> Vec<Reply> {
        bytes.iter().filter_map(|&b| assembler.push(b)).collect()
    }

    #[rstest]
    #[case("OK", Some(Reply::Ack))]
    #[case("ERR", Some(Reply::Nack))]
    #[case("  OK  ", Some(Reply::Ack))]
    #[case("OKAY", Some(Reply::Unrecognized("OKAY".into())))]
    #[case("", None)]
    fn test_parse(#[case] line: &str, #[case] expected: Option<Reply>) {
        assert_eq!(Reply::parse(line), expected);
    }

    #[test]
    fn test_encode() {
        let mut buf = BytesMut::new();
        Reply::Ack.encode_into(&mut buf);
        Reply::Nack.encode_into(&mut buf);
        assert_eq!(&buf[..], b"OK\nERR\n");
    }

    #[test]
    fn test_assembler_crlf() {
        let mut assembler = LineAssembler::new();
        assert_eq!(feed(&mut assembler, b"OK\r\nERR\r\n"), vec![Reply::Ack, Reply::Nack]);
    }

    #[test]
    fn test_assembler_partial_line() {
        let mut assembler = LineAssembler::new();
        assert!(feed(&mut assembler, b"O").is_empty());
        assert_eq!(assembler.pending(), 1);
        assert_eq!(feed(&mut assembler, b"K\n"), vec![Reply::Ack]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_assembler_blank_lines_skipped() {
        let mut assembler = LineAssembler::new();
        assert_eq!(feed(&mut assembler, b"\n\r\n  \nOK\n"), vec![Reply::Ack]);
    }

    #[test]
    fn test_assembler_overlong_line_dropped() {
        let mut assembler = LineAssembler::new();
        let mut noise = vec![b'x'; MAX_REPLY_LINE + 10];
        noise.push(b'\n');
        assert!(feed(&mut assembler, &noise).is_empty());

        // Recovers on the following line
        assert_eq!(feed(&mut assembler, b"OK\n"), vec![Reply::Ack]);
    }

    #[test]
    fn test_assembler_skips_control_bytes() {
        let mut assembler = LineAssembler::new();
        assert_eq!(feed(&mut assembler, b"\x01O\x00K\n"), vec![Reply::Ack]);
    }

    #[test]
    fn test_assembler_reset() {
        let mut assembler = LineAssembler::new();
        feed(&mut assembler, b"garb");
        assembler.reset();
        assert_eq!(feed(&mut assembler, b"ERR\n"), vec![Reply::Nack]);
    }
}
