//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Tinmail.
//
// Tinmail is free software: you can  redistribute it and/or modify it under
// the terms of  the GNU General Public License as  published by the Free
// Software Foundation, either version 3 of  the License, or (at your option)
// any later version.
//
// Tinmail is distributed  in the hope that  it will be useful,  but WITHOUT
// ANY WARRANTY; without even  the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Tinmail. If not, see <http://www.gnu.org/licenses/>.

//! Line-oriented framing over a byte stream.
//!
//! Everything on the wire is a sequence of newline-terminated text frames;
//! this module is the only place that deals in raw bytes. Both the server
//! and the client speak through these two functions.

use std::io::{self, BufRead, Write};

/// Write `line` followed by a line terminator.
///
/// Whether the bytes reach the peer immediately depends on the writer;
/// callers writing through a buffered writer flush at their own protocol
/// boundaries.
pub fn send_line(w: &mut impl Write, line: &str) -> io::Result<()> {
    w.write_all(line.as_bytes())?;
    w.write_all(b"\n")
}

/// Read the next line from `r`.
///
/// Consumes bytes up to and including the next LF, or to end-of-stream,
/// whichever comes first; one trailing CR is stripped so DOS line endings
/// are accepted too. Returns `None` if the stream was already at EOF. A
/// final line with no terminator is returned as-is. No limit is placed on
/// line length; a peer which never sends a terminator accumulates without
/// bound.
pub fn read_line(r: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut buffer = Vec::new();
    let nread = r.read_until(b'\n', &mut buffer)?;
    if 0 == nread {
        return Ok(None);
    }

    if buffer.ends_with(b"\n") {
        buffer.pop();
    }
    if buffer.ends_with(b"\r") {
        buffer.pop();
    }

    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;

    fn read_all_lines(text: &[u8]) -> Vec<String> {
        let mut cursor = Cursor::new(text.to_vec());
        let mut lines = Vec::new();
        while let Some(line) = read_line(&mut cursor).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn line_endings_stripped() {
        assert_eq!(vec!["foo", "bar"], read_all_lines(b"foo\r\nbar\n"));
    }

    #[test]
    fn unterminated_final_line_returned() {
        assert_eq!(vec!["foo", "bar"], read_all_lines(b"foo\nbar"));
    }

    #[test]
    fn empty_stream_is_eof() {
        assert!(read_all_lines(b"").is_empty());
    }

    #[test]
    fn blank_line_is_not_eof() {
        assert_eq!(vec!["", "x"], read_all_lines(b"\nx\n"));
    }

    #[test]
    fn interior_cr_preserved() {
        assert_eq!(vec!["a\rb"], read_all_lines(b"a\rb\n"));
    }

    #[test]
    fn long_lines_accumulate_without_bound() {
        let line = "x".repeat(1 << 16);
        assert_eq!(
            vec![line.clone()],
            read_all_lines(format!("{}\n", line).as_bytes())
        );
    }

    #[test]
    fn send_line_appends_terminator() {
        let mut out = Vec::new();
        send_line(&mut out, "OK").unwrap();
        send_line(&mut out, "").unwrap();
        assert_eq!(b"OK\n\n".to_vec(), out);
    }

    proptest! {
        #[test]
        fn framing_round_trips(
            lines in prop::collection::vec("[ -~]{0,24}", 0..8),
            dos_endings in prop::bool::ANY,
        ) {
            let mut encoded = Vec::new();
            for line in &lines {
                if dos_endings {
                    write!(encoded, "{}\r\n", line).unwrap();
                } else {
                    send_line(&mut encoded, line).unwrap();
                }
            }

            prop_assert_eq!(lines, read_all_lines(&encoded));
        }
    }
}
