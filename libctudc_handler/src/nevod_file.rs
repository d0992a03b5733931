use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use super::codec::{read_exact_or_eof, skip_bytes};
use super::constants::*;
use super::error::{CodecError, NevodFileError};
use super::nevod_event::{NevodDateTime, NevodEvent};

/// The framing header preceding every NEVOD record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub kind: u8,
    pub datetime: NevodDateTime,
    /// Payload length for plain records, sub-record id for DECOR header records
    pub data_len: u32,
}

impl RecordHeader {
    /// Read a header. `Ok(None)` at a clean end of stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, CodecError> {
        let mut start = [0u8; 5];
        if !read_exact_or_eof(reader, &mut start)? {
            return Ok(None);
        }
        check_marker(&start, NEVOD_START_MARKER)?;
        let kind = reader.read_u8()?;
        let datetime = NevodDateTime::read_from(reader)?;
        let data_len = reader.read_u32::<LittleEndian>()?;
        Ok(Some(Self {
            kind,
            datetime,
            data_len,
        }))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(NEVOD_START_MARKER)?;
        writer.write_u8(self.kind)?;
        self.datetime.write_to(writer)?;
        writer.write_u32::<LittleEndian>(self.data_len)?;
        Ok(())
    }
}

fn check_marker(found: &[u8], expected: &[u8]) -> Result<(), CodecError> {
    if found != expected {
        return Err(CodecError::Marker {
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        });
    }
    Ok(())
}

/// Decoded NEVOD records. Only events carry their payload; the DECOR service
/// records are consumed and dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum NevodRecord {
    DecorConfig,
    DecorMonitor,
    DecorNoise,
    /// A DECOR header record with an id that has no payload
    DecorHeader(u32),
    Event(Box<NevodEvent>),
    /// Any other record type; its payload is skipped
    Other { kind: u8, len: u32 },
}

impl NevodRecord {
    /// Read the payload and the trailing stop marker of a record
    pub fn read_body<R: Read>(header: &RecordHeader, reader: &mut R) -> Result<Self, CodecError> {
        let record = match header.kind {
            NEVOD_RECORD_HEADER => match header.data_len {
                DECOR_ID_CONFIG => {
                    skip_bytes(reader, DECOR_CONFIG_SIZE as u64)?;
                    Self::DecorConfig
                }
                DECOR_ID_MONIT => {
                    skip_bytes(reader, DECOR_MONIT_SIZE as u64)?;
                    Self::DecorMonitor
                }
                DECOR_ID_NOISE => {
                    skip_bytes(reader, DECOR_NOISE_SIZE as u64)?;
                    Self::DecorNoise
                }
                id => Self::DecorHeader(id),
            },
            NEVOD_RECORD_EVENT => Self::Event(Box::new(NevodEvent::read_from(reader)?)),
            kind => {
                skip_bytes(reader, header.data_len as u64)?;
                Self::Other {
                    kind,
                    len: header.data_len,
                }
            }
        };
        let mut stop = [0u8; 4];
        reader.read_exact(&mut stop)?;
        check_marker(&stop, NEVOD_STOP_MARKER)?;
        Ok(record)
    }

    /// Write a complete framed record. Skipped payloads are written as zeros.
    pub fn write_to<W: Write>(
        &self,
        datetime: NevodDateTime,
        writer: &mut W,
    ) -> Result<(), CodecError> {
        let (kind, data_len, padding) = match self {
            Self::DecorConfig => (NEVOD_RECORD_HEADER, DECOR_ID_CONFIG, DECOR_CONFIG_SIZE),
            Self::DecorMonitor => (NEVOD_RECORD_HEADER, DECOR_ID_MONIT, DECOR_MONIT_SIZE),
            Self::DecorNoise => (NEVOD_RECORD_HEADER, DECOR_ID_NOISE, DECOR_NOISE_SIZE),
            Self::DecorHeader(id) => (NEVOD_RECORD_HEADER, *id, 0),
            Self::Event(_) => (NEVOD_RECORD_EVENT, 0, 0),
            Self::Other { kind, len } => (*kind, *len, *len as usize),
        };
        RecordHeader {
            kind,
            datetime,
            data_len,
        }
        .write_to(writer)?;
        if let Self::Event(event) = self {
            event.write_to(writer)?;
        }
        writer.write_all(&vec![0u8; padding])?;
        writer.write_all(NEVOD_STOP_MARKER)?;
        Ok(())
    }
}

/// A single NEVOD (.nad) file.
#[derive(Debug)]
pub struct NevodFile<R: Read = BufReader<File>> {
    reader: R,
    is_eof: bool,
    path: PathBuf,
}

impl NevodFile<BufReader<File>> {
    pub fn new(path: &Path) -> Result<Self, NevodFileError> {
        if !path.exists() {
            return Err(NevodFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut nevod = Self::from_reader(BufReader::new(file));
        nevod.path = path.to_path_buf();
        Ok(nevod)
    }
}

impl<R: Read> NevodFile<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            is_eof: false,
            path: PathBuf::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the next framed record of any type. `Ok(None)` once the file is exhausted.
    pub fn get_next_record(&mut self) -> Result<Option<NevodRecord>, NevodFileError> {
        if self.is_eof {
            return Ok(None);
        }
        match RecordHeader::read_from(&mut self.reader)? {
            Some(header) => Ok(Some(NevodRecord::read_body(&header, &mut self.reader)?)),
            None => {
                self.is_eof = true;
                Ok(None)
            }
        }
    }

    /// Get the next event record, skipping every other record type
    pub fn get_next_event(&mut self) -> Result<Option<NevodEvent>, NevodFileError> {
        while let Some(record) = self.get_next_record()? {
            match record {
                NevodRecord::Event(event) => return Ok(Some(*event)),
                other => spdlog::trace!("Skipping NEVOD record {other:?}"),
            }
        }
        Ok(None)
    }
}
