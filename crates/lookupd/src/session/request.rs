//! Request framing: one bounded read, then trailing padding removed.

use std::io::{self, Read};

use super::ProtocolError;

/// Performs one read of at most `limit` bytes.
///
/// Returns `Ok(None)` when the peer has closed the connection.
pub(crate) fn read_request(stream: &mut impl Read, limit: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = vec![0_u8; limit];
    let read = loop {
        match stream.read(&mut buffer) {
            Ok(read) => break read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    };
    if read == 0 {
        return Ok(None);
    }
    buffer.truncate(read);
    Ok(Some(buffer))
}

/// Strips trailing NUL bytes and ASCII whitespace.
///
/// Leading bytes are preserved, so `"  alpha\n"` yields `"  alpha"`.
#[must_use]
pub fn trim_request(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| *byte != 0 && !byte.is_ascii_whitespace())
        .map_or(0, |position| position + 1);
    bytes.get(..end).unwrap_or_default()
}

/// Decodes a trimmed search query.
///
/// # Errors
///
/// Returns [`ProtocolError::NotUtf8`] for invalid UTF-8.
pub fn decode_query(bytes: &[u8]) -> Result<&str, ProtocolError> {
    std::str::from_utf8(bytes).map_err(|error| ProtocolError::NotUtf8 {
        valid_up_to: error.valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"alpha\n".as_slice(), b"alpha".as_slice())]
    #[case(b"alpha\0\0\0".as_slice(), b"alpha".as_slice())]
    #[case(b"alpha \r\n\0\t".as_slice(), b"alpha".as_slice())]
    #[case(b"  alpha".as_slice(), b"  alpha".as_slice())]
    #[case(b"\0\n".as_slice(), b"".as_slice())]
    #[case(b"".as_slice(), b"".as_slice())]
    fn trims_trailing_padding(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(trim_request(input), expected);
    }

    #[test]
    fn read_is_bounded() {
        let mut source = Cursor::new(b"abcdefgh".to_vec());
        let first = read_request(&mut source, 4).expect("read").expect("bytes");
        assert_eq!(first, b"abcd");
    }

    #[test]
    fn end_of_stream_is_none() {
        let mut source = Cursor::new(Vec::new());
        assert!(read_request(&mut source, 16).expect("read").is_none());
    }

    #[test]
    fn invalid_utf8_is_a_protocol_error() {
        assert_eq!(
            decode_query(b"ok\xff"),
            Err(ProtocolError::NotUtf8 { valid_up_to: 2 })
        );
    }
}
