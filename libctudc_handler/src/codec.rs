//! Small forward-only helpers shared by the binary record codecs.
use std::io::{BufRead, ErrorKind, Read, Write};

use super::error::CodecError;

/// Fill `buf` from the reader.
///
/// Returns `Ok(false)` when the stream ends before a single byte is read, which is
/// the normal end of a record stream. A stream ending part way through `buf` is a
/// truncated record and fails with `CodecError::Format`.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, CodecError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CodecError::Format(e)),
        }
    }
    if filled == 0 && !buf.is_empty() {
        Ok(false)
    } else if filled < buf.len() {
        Err(CodecError::Format(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("record truncated after {filled} of {} bytes", buf.len()),
        )))
    } else {
        Ok(true)
    }
}

/// Discard exactly `n` bytes.
pub fn skip_bytes<R: Read>(reader: &mut R, n: u64) -> Result<(), CodecError> {
    let skipped = std::io::copy(&mut reader.take(n), &mut std::io::sink())?;
    if skipped != n {
        return Err(CodecError::Format(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("tried to skip {n} bytes but only {skipped} remained"),
        )));
    }
    Ok(())
}

/// Read a single header line, without its terminating newline.
pub fn read_header_line<R: BufRead>(reader: &mut R) -> Result<String, CodecError> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.pop() != Some(b'\n') {
        return Err(CodecError::Header(String::from_utf8_lossy(&line).into_owned()));
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

pub fn write_header_line<W: Write>(writer: &mut W, header: &str) -> Result<(), CodecError> {
    writer.write_all(header.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
