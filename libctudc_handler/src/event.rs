use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use time::OffsetDateTime;

use super::codec::read_exact_or_eof;
use super::constants::N_WIRES;
use super::error::CodecError;
use super::hit::Hit;

/// Drift times of one chamber, `[wire][arrival order]`.
///
/// Several times on one wire mean several particles or noise; the order is the
/// order the hits were recorded in, not sorted.
pub type ChamberTimes = [Vec<u32>; N_WIRES];

/// One CTUDC trigger: run and event number, wall clock time and all TDC hits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Event {
    pub run: u64,
    pub event: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub hits: Vec<Hit>,
}

impl Event {
    pub fn new(run: u64, event: u64, timestamp: i64, hits: Vec<Hit>) -> Self {
        Self {
            run,
            event,
            timestamp,
            hits,
        }
    }

    /// The (run, event) key used for ordering
    pub fn key(&self) -> (u64, u64) {
        (self.run, self.event)
    }

    /// Wall clock time of the trigger, None if the timestamp is out of range
    pub fn datetime(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(self.timestamp as i128 * 1_000_000).ok()
    }

    /// Times recorded by a single chamber
    pub fn chamber_times(&self, chamber: u16) -> ChamberTimes {
        let mut times = ChamberTimes::default();
        for hit in self.hits.iter().filter(|h| h.chamber == chamber) {
            push_time(&mut times, hit);
        }
        times
    }

    /// Times of every chamber that has at least one hit, keyed by chamber number
    pub fn times(&self) -> BTreeMap<u16, ChamberTimes> {
        let mut times: BTreeMap<u16, ChamberTimes> = BTreeMap::new();
        for hit in self.hits.iter() {
            push_time(times.entry(hit.chamber).or_default(), hit);
        }
        times
    }

    pub fn triggered_chambers(&self) -> BTreeSet<u16> {
        self.hits.iter().map(|h| h.chamber).collect()
    }

    /// Decode the next event. `Ok(None)` means the stream ended cleanly between records.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, CodecError> {
        let mut first = [0u8; 8];
        if !read_exact_or_eof(reader, &mut first)? {
            return Ok(None);
        }
        let run = u64::from_le_bytes(first);
        let event = reader.read_u64::<LittleEndian>()?;
        let timestamp = reader.read_i64::<LittleEndian>()?;
        let n_hits = reader.read_u32::<LittleEndian>()?;
        let mut hits = Vec::with_capacity(n_hits.min(4096) as usize);
        for _ in 0..n_hits {
            hits.push(Hit::read_from(reader)?);
        }
        Ok(Some(Self {
            run,
            event,
            timestamp,
            hits,
        }))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_u64::<LittleEndian>(self.run)?;
        writer.write_u64::<LittleEndian>(self.event)?;
        writer.write_i64::<LittleEndian>(self.timestamp)?;
        writer.write_u32::<LittleEndian>(self.hits.len() as u32)?;
        for hit in self.hits.iter() {
            hit.write_to(writer)?;
        }
        Ok(())
    }
}

fn push_time(times: &mut ChamberTimes, hit: &Hit) {
    match times.get_mut(hit.wire as usize) {
        Some(wire) => wire.push(hit.time),
        None => spdlog::debug!("Ignoring {hit}: wire outside of chamber"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::EdgeType;
    use std::io::Cursor;

    fn sample_event() -> Event {
        Event::new(
            12,
            3405,
            1_500_000_000_123,
            vec![
                Hit::new(2, 0, EdgeType::Leading, 300),
                Hit::new(2, 1, EdgeType::Leading, 210),
                Hit::new(5, 3, EdgeType::Trailing, 90),
                Hit::new(2, 0, EdgeType::Leading, 120),
                Hit::new(2, 7, EdgeType::Leading, 55),
            ],
        )
    }

    #[test]
    fn test_round_trip() {
        let events = [sample_event(), Event::new(0, 0, -5, vec![])];
        let mut buffer = Vec::new();
        for e in events.iter() {
            e.write_to(&mut buffer).unwrap();
        }
        let mut reader = Cursor::new(buffer);
        for e in events.iter() {
            assert_eq!(Event::read_from(&mut reader).unwrap().as_ref(), Some(e));
        }
        assert!(Event::read_from(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_truncated_event() {
        let mut buffer = Vec::new();
        sample_event().write_to(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 3);
        let mut reader = Cursor::new(buffer);
        assert!(matches!(
            Event::read_from(&mut reader),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn test_grouping_keeps_arrival_order() {
        let event = sample_event();
        let times = event.chamber_times(2);
        assert_eq!(times[0], vec![300, 120]);
        assert_eq!(times[1], vec![210]);
        assert!(times[2].is_empty());

        let all = event.times();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&5][3], vec![90]);
        assert_eq!(all[&2], times);
        assert_eq!(
            event.triggered_chambers().into_iter().collect::<Vec<_>>(),
            vec![2, 5]
        );
    }

    #[test]
    fn test_datetime() {
        let event = sample_event();
        let dt = event.datetime().unwrap();
        assert_eq!(dt.unix_timestamp(), 1_500_000_000);
        assert_eq!(dt.millisecond(), 123);
    }
}
