use fxhash::FxHashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::chamber_config::ChamberMap;
use super::event::Event;
use super::ext_event::ExtEvent;

/// Comparison of a chamber track with a DECOR reference track crossing the chamber.
///
/// Angles are in degrees, intercepts in mm, both in the chamber frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackComparison {
    pub chamber: u16,
    pub times: [u32; 4],
    /// `t0 - t1 - t2 + t3`, zero for a straight track at constant drift speed
    pub k1: i64,
    /// `t0 - 3t1 + 3t2 - t3`
    pub k2: i64,
    pub deviation: f64,
    pub chamber_angle: f64,
    pub chamber_b: f64,
    pub decor_angle: f64,
    pub decor_b: f64,
}

impl TrackComparison {
    pub fn d_angle(&self) -> f64 {
        self.chamber_angle - self.decor_angle
    }

    pub fn d_b(&self) -> f64 {
        self.chamber_b - self.decor_b
    }
}

/// Chamber occupancy of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChamberLoad {
    /// Chambers with at least one usable time on every wire
    pub loaded_chambers: u32,
    /// Sum of the chamber depths, an estimate of the muon count
    pub muons: u64,
}

pub fn chamber_load(event: &Event, chambers: &ChamberMap) -> ChamberLoad {
    let mut load = ChamberLoad::default();
    for (number, times) in event.times().iter() {
        if let Some(chamber) = chambers.get(number) {
            let depth = chamber.times_depth(times);
            load.muons += depth as u64;
            if depth > 0 {
                load.loaded_chambers += 1;
            }
        }
    }
    load
}

/// Compare every reconstructable chamber track of the event with each DECOR track
/// that passes through that chamber
pub fn associate(event: &ExtEvent, chambers: &ChamberMap) -> Vec<TrackComparison> {
    let mut comparisons = Vec::new();
    for (number, times) in event.ctudc.times().iter() {
        let Some(chamber) = chambers.get(number) else {
            continue;
        };
        for decor in event.decor.iter() {
            if !chamber.hexahedron().crossing(&decor.line) {
                continue;
            }
            let Some(track) = chamber.create_track(times) else {
                continue;
            };
            let Some(projection) = chamber.line_projection(&decor.line) else {
                continue;
            };
            let t = track.times.map(i64::from);
            comparisons.push(TrackComparison {
                chamber: *number,
                times: track.times,
                k1: t[0] - t[1] - t[2] + t[3],
                k2: t[0] - 3 * t[1] + 3 * t[2] - t[3],
                deviation: track.deviation,
                chamber_angle: track.angle(),
                chamber_b: track.line.b(),
                decor_angle: projection.k().atan().to_degrees(),
                decor_b: projection.b(),
            });
        }
    }
    comparisons
}

fn tracks_header() -> String {
    let wires: String = (1..=4).map(|w| format!("WIRE_{w:03}\t")).collect();
    let columns = ["k1", "k2", "dev", "ang[C]", "b[C]", "ang[D]", "b[D]", "dang", "db"]
        .map(|c| format!("{c:>8}"))
        .join("\t");
    format!("{wires}{columns}")
}

/// Writes the analysis tables: `load.dat` with the chamber load of multi-muon events
/// and one `tracks/chamber_NNN.dat` per chamber (one based) with track comparisons.
#[derive(Debug)]
pub struct TrackTableWriter {
    tracks_dir: PathBuf,
    track_files: FxHashMap<u16, BufWriter<File>>,
    load_file: BufWriter<File>,
}

impl TrackTableWriter {
    pub fn new(output_dir: &Path) -> Result<Self, std::io::Error> {
        let tracks_dir = output_dir.join("tracks");
        std::fs::create_dir_all(&tracks_dir)?;
        let load_file = BufWriter::new(File::create(output_dir.join("load.dat"))?);
        Ok(Self {
            tracks_dir,
            track_files: FxHashMap::default(),
            load_file,
        })
    }

    /// Record the load of an event. Only events with more than one muon are kept.
    pub fn write_load(&mut self, load: &ChamberLoad, event: &ExtEvent) -> Result<(), std::io::Error> {
        if load.muons <= 1 {
            return Ok(());
        }
        writeln!(
            self.load_file,
            "{}\t{}\t{}\t{}\t{}",
            load.loaded_chambers,
            load.muons,
            event.ctudc.event,
            event.decor.len(),
            event.nevod.n_fifo_c
        )
    }

    pub fn write_comparison(&mut self, cmp: &TrackComparison) -> Result<(), std::io::Error> {
        let file = match self.track_files.entry(cmp.chamber) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let path = self
                    .tracks_dir
                    .join(format!("chamber_{:03}.dat", cmp.chamber as u32 + 1));
                let mut file = BufWriter::new(File::create(path)?);
                writeln!(file, "# {}", tracks_header())?;
                entry.insert(file)
            }
        };
        for t in cmp.times.iter() {
            write!(file, "{t:8}\t")?;
        }
        writeln!(
            file,
            "{:8}\t{:8}\t{:8.6}\t{:8.6}\t{:8.6}\t{:8.6}\t{:8.6}\t{:8.6}\t{:8.6}",
            cmp.k1,
            cmp.k2,
            cmp.deviation,
            cmp.chamber_angle,
            cmp.chamber_b,
            cmp.decor_angle,
            cmp.decor_b,
            cmp.d_angle(),
            cmp.d_b()
        )
    }

    /// Load and comparisons of one correlated event
    pub fn write_event(&mut self, event: &ExtEvent, chambers: &ChamberMap) -> Result<(), std::io::Error> {
        self.write_load(&chamber_load(&event.ctudc, chambers), event)?;
        for cmp in associate(event, chambers).iter() {
            self.write_comparison(cmp)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), std::io::Error> {
        self.load_file.flush()?;
        for file in self.track_files.values_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chamber::tests::test_chamber;
    use crate::constants::N_WIRES;
    use crate::decor_track::{DecorTrack, TrackKind};
    use crate::hit::{EdgeType, Hit};
    use crate::line::Line3;
    use crate::nevod_event::NevodEventMeta;
    use crate::vector::Vec3;

    fn chambers() -> ChamberMap {
        let mut chambers = ChamberMap::default();
        chambers.insert(0, test_chamber([0; N_WIRES], [0.25; N_WIRES]));
        chambers
    }

    fn hits(chamber: u16, times: [u32; 4]) -> Vec<Hit> {
        times
            .iter()
            .enumerate()
            .map(|(w, t)| Hit::new(chamber, w as u8, EdgeType::Leading, *t))
            .collect()
    }

    fn event() -> ExtEvent {
        let mut all_hits = hits(0, [17, 23, 17, 23]);
        // chamber 9 is not calibrated
        all_hits.extend(hits(9, [17, 23, 17, 23]));
        // The test chamber frame has y = -global y, so a horizontal local track at
        // y = 5 is the global plane y = -5
        let crossing = Line3::new(Vec3::new(0.0, -5.0, 56.0), Vec3::new(1.0, 0.0, 0.0));
        let missing = Line3::new(Vec3::new(0.0, -5.0, 5000.0), Vec3::new(1.0, 0.0, 0.0));
        ExtEvent::new(
            Event::new(1, 42, 0, all_hits),
            Some(NevodEventMeta {
                n_fifo_c: 3,
                ..Default::default()
            }),
            vec![
                DecorTrack::new(TrackKind::Long, crossing),
                DecorTrack::new(TrackKind::ShowerShower, missing),
            ],
        )
    }

    #[test]
    fn test_chamber_load() {
        let event = event();
        let load = chamber_load(&event.ctudc, &chambers());
        assert_eq!(
            load,
            ChamberLoad {
                loaded_chambers: 1,
                muons: 1
            }
        );
    }

    #[test]
    fn test_associate() {
        let comparisons = associate(&event(), &chambers());
        assert_eq!(comparisons.len(), 1);
        let cmp = comparisons[0];
        assert_eq!(cmp.chamber, 0);
        assert_eq!(cmp.times, [17, 23, 17, 23]);
        assert_eq!(cmp.k1, 17 - 23 - 17 + 23);
        assert_eq!(cmp.k2, 17 - 3 * 23 + 3 * 17 - 23);
        assert!(cmp.d_angle().abs() < 1e-9);
        assert!(cmp.d_b().abs() < 1e-9);
    }

    #[test]
    fn test_tables() {
        let dir = std::env::temp_dir().join("ctudc_handler_association_test");
        let _ = std::fs::remove_dir_all(&dir);
        let mut writer = TrackTableWriter::new(&dir).unwrap();
        let chambers = chambers();
        writer.write_event(&event(), &chambers).unwrap();
        writer
            .write_load(
                &ChamberLoad {
                    loaded_chambers: 2,
                    muons: 3,
                },
                &event(),
            )
            .unwrap();
        writer.flush().unwrap();

        let load = std::fs::read_to_string(dir.join("load.dat")).unwrap();
        assert_eq!(load, "2\t3\t42\t2\t3\n");
        let table = std::fs::read_to_string(dir.join("tracks").join("chamber_001.dat")).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("# WIRE_001\tWIRE_002"));
        assert!(lines[0].ends_with("      db"));
        let columns: Vec<&str> = lines[1].split('\t').map(str::trim).collect();
        assert_eq!(columns.len(), 13);
        assert_eq!(&columns[..4], &["17", "23", "17", "23"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
