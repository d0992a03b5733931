use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::codec::{read_header_line, write_header_line};
use super::constants::{EXT_HEADER, EXT_HEADER_ALT, EXT_HEADER_META};
use super::error::{CodecError, ExtFileError};
use super::ext_event::ExtEvent;
use super::run_meta::RunMeta;

/// Header of a correlated (ext) file. Older files carry no run meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtHeader {
    Plain,
    Alt,
    WithMeta(RunMeta),
}

impl ExtHeader {
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, CodecError> {
        let line = read_header_line(reader)?;
        match line.as_str() {
            EXT_HEADER => Ok(Self::Plain),
            EXT_HEADER_ALT => Ok(Self::Alt),
            EXT_HEADER_META => Ok(Self::WithMeta(RunMeta::read_from(reader)?)),
            _ => Err(CodecError::Header(line)),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        match self {
            Self::Plain => write_header_line(writer, EXT_HEADER),
            Self::Alt => write_header_line(writer, EXT_HEADER_ALT),
            Self::WithMeta(meta) => {
                write_header_line(writer, EXT_HEADER_META)?;
                meta.write_to(writer)
            }
        }
    }

    pub fn run_meta(&self) -> Option<&RunMeta> {
        match self {
            Self::WithMeta(meta) => Some(meta),
            _ => None,
        }
    }
}

/// Reader for a correlated file
#[derive(Debug)]
pub struct ExtFileReader<R: BufRead = BufReader<File>> {
    reader: R,
    header: ExtHeader,
    is_eof: bool,
}

impl ExtFileReader<BufReader<File>> {
    pub fn new(path: &Path) -> Result<Self, ExtFileError> {
        if !path.exists() {
            return Err(ExtFileError::BadFilePath(path.to_path_buf()));
        }
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> ExtFileReader<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, ExtFileError> {
        let header = ExtHeader::read_from(&mut reader)?;
        Ok(Self {
            reader,
            header,
            is_eof: false,
        })
    }

    pub fn header(&self) -> &ExtHeader {
        &self.header
    }

    pub fn get_next_event(&mut self) -> Result<Option<ExtEvent>, ExtFileError> {
        if self.is_eof {
            return Ok(None);
        }
        let event = ExtEvent::read_from(&mut self.reader)?;
        self.is_eof = event.is_none();
        Ok(event)
    }
}

impl<R: BufRead> Iterator for ExtFileReader<R> {
    type Item = Result<ExtEvent, ExtFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_next_event() {
            Ok(event) => event.map(Ok),
            Err(e) => {
                self.is_eof = true;
                Some(Err(e))
            }
        }
    }
}

/// Writer for a correlated file. The header goes out on creation.
#[derive(Debug)]
pub struct ExtFileWriter<W: Write = BufWriter<File>> {
    writer: W,
    event_count: u64,
    path: PathBuf,
}

impl ExtFileWriter<BufWriter<File>> {
    /// Create the file. Without run meta the plain header is used.
    pub fn new(path: &Path, meta: Option<RunMeta>) -> Result<Self, ExtFileError> {
        let header = match meta {
            Some(meta) => ExtHeader::WithMeta(meta),
            None => ExtHeader::Plain,
        };
        let mut writer = Self::from_writer(BufWriter::new(File::create(path)?), header)?;
        writer.path = path.to_path_buf();
        Ok(writer)
    }
}

impl<W: Write> ExtFileWriter<W> {
    pub fn from_writer(mut writer: W, header: ExtHeader) -> Result<Self, ExtFileError> {
        header.write_to(&mut writer)?;
        Ok(Self {
            writer,
            event_count: 0,
            path: PathBuf::new(),
        })
    }

    pub fn write_event(&mut self, event: &ExtEvent) -> Result<(), ExtFileError> {
        event.write_to(&mut self.writer)?;
        self.event_count += 1;
        Ok(())
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Flush and hand back the underlying writer
    pub fn close(mut self) -> Result<W, ExtFileError> {
        self.writer.flush()?;
        spdlog::info!(
            "Wrote {} correlated events to {}",
            self.event_count,
            self.path.display()
        );
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use std::io::Cursor;

    fn events() -> Vec<ExtEvent> {
        (1..=3)
            .map(|n| ExtEvent::new(Event::new(9, n, 0, vec![]), None, vec![]))
            .collect()
    }

    #[test]
    fn test_write_then_read() {
        let meta = RunMeta {
            first_event: 1,
            last_event: 3,
            ..Default::default()
        };
        for header in [ExtHeader::Plain, ExtHeader::Alt, ExtHeader::WithMeta(meta)] {
            let mut writer = ExtFileWriter::from_writer(Vec::new(), header).unwrap();
            for e in events().iter() {
                writer.write_event(e).unwrap();
            }
            assert_eq!(writer.event_count(), 3);
            let buffer = writer.close().unwrap();

            let reader = ExtFileReader::from_reader(Cursor::new(buffer)).unwrap();
            assert_eq!(*reader.header(), header);
            let read: Vec<ExtEvent> = reader.collect::<Result<_, _>>().unwrap();
            assert_eq!(read, events());
        }
    }

    #[test]
    fn test_header_meta() {
        let buffer = b"TDSext\n".to_vec();
        let reader = ExtFileReader::from_reader(Cursor::new(buffer)).unwrap();
        assert!(reader.header().run_meta().is_none());
        assert!(matches!(
            ExtFileReader::from_reader(Cursor::new(b"TDSa\n".to_vec())),
            Err(ExtFileError::Codec(CodecError::Header(_)))
        ));
    }

    #[test]
    fn test_truncated_record() {
        let mut writer = ExtFileWriter::from_writer(Vec::new(), ExtHeader::Plain).unwrap();
        writer.write_event(&events()[0]).unwrap();
        let mut buffer = writer.close().unwrap();
        buffer.pop();
        let mut reader = ExtFileReader::from_reader(Cursor::new(buffer)).unwrap();
        assert!(matches!(reader.next(), Some(Err(ExtFileError::Codec(_)))));
        assert!(reader.next().is_none());
    }
}
