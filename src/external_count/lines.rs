use memchr::memchr2;
use std::io::{self, BufRead};

/// Reads one line into `buf` without its terminator.
///
/// A line ends at `\n`, `\r` or `\r\n`. Bytes are taken as-is, so input that
/// is not valid UTF-8 still yields a value. Returns `false` once the reader
/// is exhausted and no bytes were read.
pub fn read_line_bytes<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let mut read_any = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;

        match memchr2(b'\n', b'\r', available) {
            Some(end) => {
                buf.extend_from_slice(&available[..end]);
                let terminator = available[end];
                reader.consume(end + 1);
                if terminator == b'\r' {
                    skip_linefeed(reader)?;
                }
                return Ok(true);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

fn skip_linefeed<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        match reader.fill_buf() {
            Ok(next) => {
                if next.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Strips leading and trailing bytes at or below the space character.
pub fn trim_bytes(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| b > b' ').unwrap_or(line.len());
    let end = line.iter().rposition(|&b| b > b' ').map_or(start, |i| i + 1);
    &line[start..end]
}
