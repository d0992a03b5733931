use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::codec::{read_header_line, write_header_line};
use super::constants::{CTUDC_DROP_HEADER, CTUDC_HEADER_PREFIX};
use super::error::{CodecError, CtudcFileError};
use super::event::Event;

/// The header variants a raw CTUDC file can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtudcHeader {
    /// `TDS` plus a one byte format tag
    Data(u8),
    /// A dropped file; it carries no usable events
    Drop,
}

impl CtudcHeader {
    pub fn parse(line: &str) -> Result<Self, CodecError> {
        if line == CTUDC_DROP_HEADER {
            return Ok(Self::Drop);
        }
        let bytes = line.as_bytes();
        if bytes.len() == CTUDC_HEADER_PREFIX.len() + 1 && line.starts_with(CTUDC_HEADER_PREFIX) {
            Ok(Self::Data(bytes[CTUDC_HEADER_PREFIX.len()]))
        } else {
            Err(CodecError::Header(line.to_string()))
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        match self {
            Self::Data(tag) => {
                writer.write_all(CTUDC_HEADER_PREFIX.as_bytes())?;
                writer.write_all(&[*tag, b'\n'])?;
                Ok(())
            }
            Self::Drop => write_header_line(writer, CTUDC_DROP_HEADER),
        }
    }
}

/// A single raw CTUDC (.tds) file, read forward one event at a time.
#[derive(Debug)]
pub struct CtudcFile<R: BufRead = BufReader<File>> {
    reader: R,
    header: CtudcHeader,
    is_eof: bool,
    path: PathBuf,
}

impl CtudcFile<BufReader<File>> {
    /// Open a file and validate its header
    pub fn new(path: &Path) -> Result<Self, CtudcFileError> {
        if !path.exists() {
            return Err(CtudcFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut ctudc = Self::from_reader(BufReader::new(file))?;
        ctudc.path = path.to_path_buf();
        Ok(ctudc)
    }
}

impl<R: BufRead> CtudcFile<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, CtudcFileError> {
        let header = CtudcHeader::parse(&read_header_line(&mut reader)?)?;
        Ok(Self {
            reader,
            is_eof: header == CtudcHeader::Drop,
            header,
            path: PathBuf::new(),
        })
    }

    pub fn header(&self) -> CtudcHeader {
        self.header
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the next event. `Ok(None)` once the file is exhausted.
    pub fn get_next_event(&mut self) -> Result<Option<Event>, CtudcFileError> {
        if self.is_eof {
            return Ok(None);
        }
        match Event::read_from(&mut self.reader)? {
            Some(event) => Ok(Some(event)),
            None => {
                self.is_eof = true;
                Ok(None)
            }
        }
    }
}
