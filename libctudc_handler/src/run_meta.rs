//! Run level metadata recorded by the NEVOD acquisition.
//!
//! Each NEVOD run directory carries two small Windows-1251 text files: `stdat` with the
//! start/stop wall clock times and the live/full durations, and `gener` with the first
//! and last event numbers. They are summarised into a [`RunMeta`] which heads every
//! correlated output file.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::WINDOWS_1251;
use std::io::{Read, Write};
use std::path::Path;
use time::{Date, Month, PrimitiveDateTime, Time};

use super::error::{CodecError, RunMetaError};

const STDAT_FILE: &str = "stdat";
const GENER_FILE: &str = "gener";

// The start/stop marks begin with a Latin 'C'
const START_MARK: &str = "Cтарт";
const STOP_MARK: &str = "Cтоп";
const LIVE_TIME_MARK: &str = "Живое время=";
const FULL_TIME_MARK: &str = "Полное время=";
const SECONDS_TRAIL: &str = " сек";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMeta {
    pub first_event: u64,
    pub last_event: u64,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    pub stop_time: i64,
    /// Seconds
    pub live_time: u64,
    pub full_time: u64,
}

impl RunMeta {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        Ok(Self {
            first_event: reader.read_u64::<LittleEndian>()?,
            last_event: reader.read_u64::<LittleEndian>()?,
            start_time: reader.read_i64::<LittleEndian>()?,
            stop_time: reader.read_i64::<LittleEndian>()?,
            live_time: reader.read_u64::<LittleEndian>()?,
            full_time: reader.read_u64::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_u64::<LittleEndian>(self.first_event)?;
        writer.write_u64::<LittleEndian>(self.last_event)?;
        writer.write_i64::<LittleEndian>(self.start_time)?;
        writer.write_i64::<LittleEndian>(self.stop_time)?;
        writer.write_u64::<LittleEndian>(self.live_time)?;
        writer.write_u64::<LittleEndian>(self.full_time)?;
        Ok(())
    }

    /// Number of events the acquisition reports for the run
    pub fn n_events(&self) -> u64 {
        self.last_event.saturating_add(1).saturating_sub(self.first_event)
    }

    /// Fill the time fields from the contents of a `stdat` file
    pub fn parse_stdat(&mut self, text: &str) -> Result<(), RunMetaError> {
        self.start_time = parse_nad_date(first_line(after_mark(text, START_MARK)?))?;
        self.stop_time = parse_nad_date(first_line(after_mark(text, STOP_MARK)?))?;
        self.live_time = parse_seconds(after_mark(text, LIVE_TIME_MARK)?)?;
        self.full_time = parse_seconds(after_mark(text, FULL_TIME_MARK)?)?;
        Ok(())
    }

    /// Fill the event range from the contents of a `gener` file: a header line and
    /// two tab separated rows whose second column is the first and last event number
    pub fn parse_gener(&mut self, text: &str) -> Result<(), RunMetaError> {
        let lines: Vec<&str> = text.trim().lines().collect();
        if lines.len() != 3 {
            return Err(RunMetaError::BadFormat(format!(
                "gener has {} lines, expected 3",
                lines.len()
            )));
        }
        let mut events = [0u64; 2];
        for (event, line) in events.iter_mut().zip(&lines[1..]) {
            let words: Vec<&str> = line.trim().split('\t').collect();
            if words.len() != 4 {
                return Err(RunMetaError::BadFormat(format!(
                    "gener row has {} columns, expected 4",
                    words.len()
                )));
            }
            *event = words[1].trim().parse()?;
        }
        self.first_event = events[0];
        self.last_event = events[1];
        Ok(())
    }
}

/// Read the run meta of a NEVOD run directory.
///
/// Returns `Ok(None)` when either file is missing; a file that exists but cannot be
/// parsed is an error.
pub fn read_run_meta(nevod_dir: &Path) -> Result<Option<RunMeta>, RunMetaError> {
    let stdat_path = nevod_dir.join(STDAT_FILE);
    let gener_path = nevod_dir.join(GENER_FILE);
    if !stdat_path.exists() || !gener_path.exists() {
        return Ok(None);
    }
    let mut meta = RunMeta::default();
    let stdat = std::fs::read(stdat_path)?;
    let gener = std::fs::read(gener_path)?;
    meta.parse_stdat(&WINDOWS_1251.decode_without_bom_handling(&stdat).0)?;
    meta.parse_gener(&WINDOWS_1251.decode_without_bom_handling(&gener).0)?;
    Ok(Some(meta))
}

fn after_mark<'a>(text: &'a str, mark: &str) -> Result<&'a str, RunMetaError> {
    text.find(mark)
        .map(|front| &text[front + mark.len()..])
        .ok_or_else(|| RunMetaError::BadFormat(format!("missing {mark:?} mark")))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

fn parse_seconds(text: &str) -> Result<u64, RunMetaError> {
    let back = text
        .find(SECONDS_TRAIL)
        .ok_or_else(|| RunMetaError::BadFormat(format!("missing {SECONDS_TRAIL:?} trail")))?;
    Ok(text[..back].trim().parse()?)
}

/// Parse a `dd-mm-yy hh:mm:ss.mmm` stamp (UTC, 21st century) into Unix milliseconds
pub fn parse_nad_date(text: &str) -> Result<i64, RunMetaError> {
    let bad = || RunMetaError::BadFormat(format!("invalid NAD date {text:?}"));
    let (date, clock) = text.trim().split_once(' ').ok_or_else(bad)?;
    let dmy: Vec<&str> = date.split('-').collect();
    let (hms, millis) = clock.trim().split_once('.').ok_or_else(bad)?;
    let hms: Vec<&str> = hms.split(':').collect();
    if dmy.len() != 3 || hms.len() != 3 {
        return Err(bad());
    }
    let year: i32 = dmy[2].parse()?;
    let date = Date::from_calendar_date(
        year.checked_add(2000).ok_or_else(bad)?,
        Month::try_from(dmy[1].parse::<u8>()?)?,
        dmy[0].parse()?,
    )?;
    let time = Time::from_hms_milli(hms[0].parse()?, hms[1].parse()?, hms[2].parse()?, millis.parse()?)?;
    let stamp = PrimitiveDateTime::new(date, time).assume_utc();
    Ok((stamp.unix_timestamp_nanos() / 1_000_000) as i64)
}
