use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fxhash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use super::error::{CodecError, DecorError};
use super::line::Line3;
use super::vector::Vec3;

/// Quality class of a DECOR reference track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackKind {
    /// Coarse reconstruction, present only in the full track list
    #[default]
    Long,
    /// Precise reconstruction, also present in the stricter shower-shower list
    ShowerShower,
}

impl From<i8> for TrackKind {
    fn from(value: i8) -> Self {
        match value {
            1 => Self::ShowerShower,
            _ => Self::Long,
        }
    }
}

impl From<TrackKind> for i8 {
    fn from(value: TrackKind) -> Self {
        match value {
            TrackKind::Long => 0,
            TrackKind::ShowerShower => 1,
        }
    }
}

/// A reference track reconstructed by DECOR, in the experiment frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecorTrack {
    pub kind: TrackKind,
    pub line: Line3,
}

impl DecorTrack {
    pub fn new(kind: TrackKind, line: Line3) -> Self {
        Self { kind, line }
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let kind = TrackKind::from(reader.read_i8()?);
        let mut coords = [0.0f64; 6];
        reader.read_f64_into::<LittleEndian>(&mut coords)?;
        Ok(Self {
            kind,
            line: Line3::new(
                Vec3::new(coords[0], coords[1], coords[2]),
                Vec3::new(coords[3], coords[4], coords[5]),
            ),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_i8(self.kind.into())?;
        let Line3 { point, vector } = self.line;
        for v in [point.x, point.y, point.z, vector.x, vector.y, vector.z] {
            writer.write_f64::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

/// Tracks of one DECOR list keyed by event number
pub type TrackMap = FxHashMap<u64, Vec<Line3>>;

const EVENT_COLUMN: usize = 1;
const FIRST_COORD_COLUMN: usize = 3;
const N_COLUMNS: usize = FIRST_COORD_COLUMN + 6;

/// Parse a DECOR track list.
///
/// The first line is a header. Every following line is tab separated with the event
/// number in the second column and the point and direction in columns four to nine.
pub fn read_decor_tracks<R: BufRead>(reader: R) -> Result<TrackMap, DecorError> {
    let mut lines = reader.lines();
    match lines.next() {
        Some(header) => {
            header?;
        }
        None => return Err(DecorError::NoData),
    }

    let mut tracks = TrackMap::default();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        if columns.len() < N_COLUMNS {
            // +2 for the header and one-based numbering
            return Err(DecorError::BadFormat(idx + 2));
        }
        let event: u64 = columns[EVENT_COLUMN].parse()?;
        let mut coords = [0.0f64; 6];
        for (coord, column) in coords.iter_mut().zip(&columns[FIRST_COORD_COLUMN..N_COLUMNS]) {
            *coord = column.parse()?;
        }
        tracks.entry(event).or_default().push(Line3::new(
            Vec3::new(coords[0], coords[1], coords[2]),
            Vec3::new(coords[3], coords[4], coords[5]),
        ));
    }
    Ok(tracks)
}

pub fn read_decor_file(path: &Path) -> Result<TrackMap, DecorError> {
    if !path.exists() {
        return Err(DecorError::BadFilePath(path.to_path_buf()));
    }
    read_decor_tracks(BufReader::new(File::open(path)?))
}

/// The full DECOR track list of a run together with its stricter subset
#[derive(Debug, Clone, Default)]
pub struct DecorTables {
    pub all: TrackMap,
    pub strict: TrackMap,
}

impl DecorTables {
    pub fn new(all: TrackMap, strict: TrackMap) -> Self {
        Self { all, strict }
    }

    pub fn read(all_path: &Path, strict_path: &Path) -> Result<Self, DecorError> {
        let all = read_decor_file(all_path)?;
        let strict = read_decor_file(strict_path)?;
        spdlog::info!(
            "Read DECOR tracks for {} events ({} in the shower-shower list)",
            all.len(),
            strict.len()
        );
        Ok(Self { all, strict })
    }

    /// All reference tracks of an event, each marked as shower-shower when the
    /// identical line appears in the strict list
    pub fn classify(&self, event: u64) -> Vec<DecorTrack> {
        let Some(tracks) = self.all.get(&event) else {
            return Vec::new();
        };
        let strict = self.strict.get(&event);
        tracks
            .iter()
            .map(|line| {
                let kind = match strict {
                    Some(strict) if strict.contains(line) => TrackKind::ShowerShower,
                    _ => TrackKind::Long,
                };
                DecorTrack::new(kind, *line)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ALL: &str = "run\tevent\tntrack\tx\ty\tz\tvx\tvy\tvz\n\
                       1\t10\t0\t1.0\t2.0\t3.0\t0.0\t0.0\t-1.0\n\
                       1\t10\t1\t4.5\t5.5\t6.5\t0.1\t0.2\t-0.9\n\
                       1\t12\t0\t-1\t-2\t-3\t1\t0\t0\r\n";

    const STRICT: &str = "header\n1\t10\t1\t4.5\t5.5\t6.5\t0.1\t0.2\t-0.9\n";

    #[test]
    fn test_read_tracks() {
        let tracks = read_decor_tracks(Cursor::new(ALL)).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[&10].len(), 2);
        assert_eq!(tracks[&10][1].point, Vec3::new(4.5, 5.5, 6.5));
        assert_eq!(tracks[&12][0].vector, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_classify() {
        let tables = DecorTables::new(
            read_decor_tracks(Cursor::new(ALL)).unwrap(),
            read_decor_tracks(Cursor::new(STRICT)).unwrap(),
        );
        let kinds: Vec<TrackKind> = tables.classify(10).iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TrackKind::Long, TrackKind::ShowerShower]);
        assert_eq!(tables.classify(12)[0].kind, TrackKind::Long);
        assert!(tables.classify(11).is_empty());
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            read_decor_tracks(Cursor::new("")),
            Err(DecorError::NoData)
        ));
        assert!(matches!(
            read_decor_tracks(Cursor::new("h\n1\t2\t3\n")),
            Err(DecorError::BadFormat(2))
        ));
        assert!(matches!(
            read_decor_tracks(Cursor::new("h\n1\tx\t0\t1\t2\t3\t4\t5\t6\n")),
            Err(DecorError::ParseIntError(_))
        ));
        assert!(matches!(
            read_decor_tracks(Cursor::new("h\n1\t2\t0\t1\t2\t3\t4\t5\tz\n")),
            Err(DecorError::ParseFloatError(_))
        ));
    }

    #[test]
    fn test_track_codec() {
        let track = DecorTrack::new(
            TrackKind::ShowerShower,
            Line3::new(Vec3::new(1.0, -2.0, 3.5), Vec3::new(0.0, 0.6, -0.8)),
        );
        let mut buffer = Vec::new();
        track.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 49);
        assert_eq!(DecorTrack::read_from(&mut Cursor::new(buffer)).unwrap(), track);
    }
}
