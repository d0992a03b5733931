use std::sync::mpsc::{sync_channel, Sender, SyncSender};

use super::association::TrackTableWriter;
use super::chamber_config::read_chambers;
use super::config::Config;
use super::constants::QUEUE_CAPACITY;
use super::correlator::Correlator;
use super::ctudc_stack::CtudcStack;
use super::decor_track::DecorTables;
use super::error::{CtudcStackError, DecorError, NevodStackError, ProcessorError};
use super::event::Event;
use super::ext_file::{ExtFileReader, ExtFileWriter};
use super::nevod_event::NevodEventMeta;
use super::nevod_stack::NevodStack;
use super::run_meta::{read_run_meta, RunMeta};
use super::worker_status::{BarColor, WorkerStatus};

/// Fraction of a run between two progress reports
const FLUSH_FRAC: f32 = 0.01;

/// What a worker does with each of its runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    /// Correlate the raw streams into the run's extctudc file
    #[default]
    Merge,
    /// Reconstruct chamber tracks from the extctudc file and compare them with DECOR
    Analyze,
}

impl ProcessMode {
    pub fn color(&self) -> BarColor {
        match self {
            Self::Merge => BarColor::CYAN,
            Self::Analyze => BarColor::MAGENTA,
        }
    }
}

/// Decode the CTUDC stack into the correlator queue, reporting progress as it goes.
/// Stops early when the correlator hangs up.
fn produce_ctudc(
    mut stack: CtudcStack,
    queue: SyncSender<Result<Event, CtudcStackError>>,
    tx: Sender<WorkerStatus>,
    run_number: u32,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let mut reported: f32 = 0.0;
    while let Some(event) = stack.get_next_event() {
        if queue.send(Ok(event)).is_err() {
            break;
        }
        let progress = stack.progress();
        if progress - reported >= FLUSH_FRAC {
            reported = progress;
            tx.send(WorkerStatus::new(
                progress,
                run_number,
                worker_id,
                BarColor::CYAN,
            ))?;
        }
    }
    if !stack.bad_files().is_empty() {
        spdlog::warn!(
            "Run {run_number}: {} CTUDC files were abandoned",
            stack.bad_files().len()
        );
    }
    Ok(())
}

/// Decode the NEVOD stack into the correlator queue. Only the event meta is needed
/// for correlation.
fn produce_nevod(
    mut stack: NevodStack,
    queue: SyncSender<Result<NevodEventMeta, NevodStackError>>,
    run_number: u32,
) {
    while let Some(event) = stack.get_next_event() {
        if queue.send(Ok(event.meta)).is_err() {
            break;
        }
    }
    if !stack.bad_files().is_empty() {
        spdlog::warn!(
            "Run {run_number}: {} NEVOD files were abandoned",
            stack.bad_files().len()
        );
    }
}

/// Drain the correlator into the writer. Consuming the correlator hangs up the
/// producer queues when this returns, even on error.
fn write_correlated<C, N>(
    mut correlator: Correlator<C, N>,
    mut writer: ExtFileWriter,
) -> Result<(), ProcessorError>
where
    C: Iterator<Item = Result<Event, CtudcStackError>>,
    N: Iterator<Item = Result<NevodEventMeta, NevodStackError>>,
{
    for event in correlator.by_ref() {
        writer.write_event(&event?)?;
    }
    spdlog::info!(
        "Joined {} CTUDC events with NEVOD data, {} without",
        correlator.n_joined(),
        correlator.n_unmatched()
    );
    writer.close()?;
    Ok(())
}

/// Read the DECOR track lists of a run. Missing lists leave the events without
/// reference tracks.
fn read_decor(config: &Config, run_number: u32) -> Result<DecorTables, ProcessorError> {
    let (all_path, strict_path) = config.get_decor_paths(run_number)?;
    match DecorTables::read(&all_path, &strict_path) {
        Ok(tables) => Ok(tables),
        Err(DecorError::BadFilePath(path)) => {
            spdlog::warn!(
                "DECOR track list {} does not exist, events will carry no reference tracks",
                path.display()
            );
            Ok(DecorTables::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Open the NEVOD stack of a run along with its run meta. Both are optional.
fn open_nevod(
    config: &Config,
    run_number: u32,
) -> Result<(Option<NevodStack>, Option<RunMeta>), ProcessorError> {
    let Some(nevod_dir) = config.get_nevod_directory(run_number)? else {
        spdlog::warn!("Run {run_number} has no NEVOD directory, CTUDC events will not be joined");
        return Ok((None, None));
    };
    let run_meta = read_run_meta(&nevod_dir)?;
    if run_meta.is_none() {
        spdlog::warn!(
            "No run meta in {}, the correlated file gets a plain header",
            nevod_dir.display()
        );
    }
    match NevodStack::new(&nevod_dir) {
        Ok(stack) => {
            spdlog::info!(
                "Total NEVOD data size: {}",
                human_bytes::human_bytes(stack.total_stack_size_bytes as f64)
            );
            Ok((Some(stack), run_meta))
        }
        Err(NevodStackError::NoMatchingFiles(path)) => {
            spdlog::warn!(
                "No NEVOD data in {}, CTUDC events will not be joined",
                path.display()
            );
            Ok((None, run_meta))
        }
        Err(e) => Err(e.into()),
    }
}

/// Correlate the CTUDC, NEVOD and DECOR data of a run into its extctudc file.
///
/// Each stack is decoded on its own producer thread and fed through a bounded queue
/// to the correlator, which runs on the calling thread.
pub fn merge_run(
    config: &Config,
    run_number: u32,
    tx: &Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let ctudc_stack = CtudcStack::new(&config.get_ctudc_directory(run_number)?)?;
    spdlog::info!(
        "Total CTUDC data size: {}",
        human_bytes::human_bytes(ctudc_stack.total_stack_size_bytes as f64)
    );
    let (nevod_stack, run_meta) = open_nevod(config, run_number)?;
    let decor = read_decor(config, run_number)?;
    // The run is written under a temporary name and only renamed once complete
    let ext_path = config.get_ext_file_name(run_number)?;
    let part_path = ext_path.with_extension("tds.part");
    let writer = ExtFileWriter::new(&part_path, run_meta)?;

    tx.send(WorkerStatus::new(
        0.0,
        run_number,
        worker_id,
        BarColor::CYAN,
    ))?;

    let (ctudc_queue, ctudc_rx) = sync_channel(QUEUE_CAPACITY);
    let (nevod_queue, nevod_rx) = sync_channel(QUEUE_CAPACITY);
    let merged = std::thread::scope(|scope| -> Result<(), ProcessorError> {
        let status_tx = tx.clone();
        let ctudc_producer = scope.spawn(move || {
            produce_ctudc(ctudc_stack, ctudc_queue, status_tx, run_number, worker_id)
        });
        let nevod_producer = match nevod_stack {
            Some(stack) => Some(scope.spawn(move || {
                produce_nevod(stack, nevod_queue, run_number)
            })),
            None => {
                drop(nevod_queue);
                None
            }
        };

        let correlator = Correlator::new(ctudc_rx.into_iter(), nevod_rx.into_iter(), decor)
            .require_nevod(config.require_nevod);
        let merged = write_correlated(correlator, writer);

        let produced = ctudc_producer
            .join()
            .map_err(|_| ProcessorError::ProducerPanic)?;
        if let Some(producer) = nevod_producer {
            producer.join().map_err(|_| ProcessorError::ProducerPanic)?;
        }
        merged?;
        produced
    });

    if let Err(e) = merged {
        if let Err(rm) = std::fs::remove_file(&part_path) {
            spdlog::warn!("Could not remove {}: {rm}", part_path.display());
        }
        return Err(e);
    }
    std::fs::rename(&part_path, &ext_path)?;

    tx.send(WorkerStatus::new(
        1.0,
        run_number,
        worker_id,
        BarColor::CYAN,
    ))?;
    Ok(())
}

/// Reconstruct the chamber tracks of a correlated run and write the comparison with
/// the DECOR tracks to the run's analysis directory.
pub fn analyze_run(
    config: &Config,
    run_number: u32,
    tx: &Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let chambers = read_chambers(&config.get_chamber_config_path(run_number)?)?;
    let reader = ExtFileReader::new(&config.get_ext_file_name(run_number)?)?;
    let expected = reader.header().run_meta().map_or(0, RunMeta::n_events);
    let mut writer = TrackTableWriter::new(&config.get_analysis_directory(run_number)?)?;

    tx.send(WorkerStatus::new(
        0.0,
        run_number,
        worker_id,
        BarColor::MAGENTA,
    ))?;
    // Progress is only known when the run meta gives the event count
    let flush_val = (expected as f64 * FLUSH_FRAC as f64) as u64;
    let mut count = 0;
    let mut progress: f32 = 0.0;
    let mut n_events: u64 = 0;
    for event in reader {
        writer.write_event(&event?, &chambers)?;
        n_events += 1;
        count += 1;
        if flush_val > 0 && count > flush_val {
            count = 0;
            progress += FLUSH_FRAC;
            tx.send(WorkerStatus::new(
                progress.min(1.0),
                run_number,
                worker_id,
                BarColor::MAGENTA,
            ))?;
        }
    }
    writer.flush()?;
    spdlog::info!("Analyzed {n_events} correlated events of run {run_number}");

    tx.send(WorkerStatus::new(
        1.0,
        run_number,
        worker_id,
        BarColor::MAGENTA,
    ))?;
    Ok(())
}

/// Process a single run in the given mode
pub fn process_run(
    config: &Config,
    run_number: u32,
    tx: &Sender<WorkerStatus>,
    worker_id: usize,
    mode: ProcessMode,
) -> Result<(), ProcessorError> {
    match mode {
        ProcessMode::Merge => merge_run(config, run_number, tx, worker_id),
        ProcessMode::Analyze => analyze_run(config, run_number, tx, worker_id),
    }
}

/// Process a subset of runs. A failed run is logged and the worker moves on to the
/// next one.
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<u32>,
    mode: ProcessMode,
) -> Result<(), ProcessorError> {
    let last_run = subset.last().copied().unwrap_or_default();
    for run in subset {
        if config.does_run_exist(run) {
            spdlog::info!("Processing run {}...", run);
            match process_run(&config, run, &tx, worker_id, mode) {
                Ok(()) => spdlog::info!("Finished processing run {}.", run),
                Err(e) => {
                    spdlog::error!("Run {} failed: {}", run, e);
                    tx.send(WorkerStatus::new(1.0, run, worker_id, BarColor::RED))?;
                }
            }
        } else {
            spdlog::info!("Run {} does not exist, skipping...", run);
        }
    }
    tx.send(WorkerStatus::new(1.0, last_run, worker_id, BarColor::GREEN))?;
    Ok(())
}

/// Divide a run range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<u32>> {
    let mut subsets: Vec<Vec<u32>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, run) in (config.first_run_number..(config.last_run_number + 1)).enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctudc_file::CtudcHeader;
    use crate::ext_file::ExtHeader;
    use crate::hit::{EdgeType, Hit};
    use crate::nevod_event::{NevodDateTime, NevodEvent};
    use crate::nevod_file::NevodRecord;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::channel;

    const RUN: u32 = 7;

    // A chamber that lands on x in [0, 4000], z in [0, 112] of the experiment frame
    const CHAMBERS: &str = r#"[{
        "points": [[26891.4, 10028.6, -9572.1], [26891.4, 6028.6, -9572.1], [26891.4, 10028.6, -9460.1]],
        "offsets": [0, 0, 0, 0],
        "speeds": [0.25, 0.25, 0.25, 0.25],
        "plane": 0,
        "group": 0,
        "number": 1
    }]"#;

    fn ctudc_event(n: u64) -> Event {
        let hits = [17, 23, 17, 23]
            .iter()
            .enumerate()
            .map(|(w, t)| Hit::new(0, w as u8, EdgeType::Leading, *t))
            .collect();
        Event::new(RUN as u64, n, 0, hits)
    }

    fn nevod_event(n: u32) -> NevodRecord {
        NevodRecord::Event(Box::new(NevodEvent {
            meta: NevodEventMeta {
                run: RUN,
                event: n,
                n_lam: 1,
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    /// One run with three CTUDC events, NEVOD events 1 and 3 and a DECOR track
    /// through the chamber in every event
    fn make_run(name: &str) -> (PathBuf, Config) {
        let root = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&root);
        let run_dir = root.join("run_00007");
        std::fs::create_dir_all(run_dir.join("ctudc")).unwrap();
        std::fs::create_dir_all(run_dir.join("nevod")).unwrap();

        let mut buffer = Vec::new();
        CtudcHeader::Data(b'a').write_to(&mut buffer).unwrap();
        for n in 1..=3 {
            ctudc_event(n).write_to(&mut buffer).unwrap();
        }
        std::fs::write(run_dir.join("ctudc").join("000.tds"), buffer).unwrap();

        let mut buffer = Vec::new();
        for record in [nevod_event(1), nevod_event(3)] {
            record
                .write_to(NevodDateTime::default(), &mut buffer)
                .unwrap();
        }
        std::fs::write(run_dir.join("nevod").join("000.nad"), buffer).unwrap();

        let mut decor = String::from("run\tevent\tntrack\tx\ty\tz\tvx\tvy\tvz\n");
        for n in 1..=3 {
            decor.push_str(&format!("{RUN}\t{n}\t1\t0\t-5\t56\t1\t0\t0\n"));
        }
        std::fs::write(run_dir.join("decor.dat"), decor).unwrap();
        std::fs::write(run_dir.join("decor_shsh.dat"), "header\n").unwrap();
        std::fs::write(run_dir.join("chambers.conf.new"), CHAMBERS).unwrap();

        let output = root.join("output");
        std::fs::create_dir_all(&output).unwrap();
        let config = Config {
            ctudc_root: root.clone(),
            output_path: output,
            first_run_number: RUN,
            last_run_number: RUN,
            ..Default::default()
        };
        (root, config)
    }

    fn read_ext(path: &Path) -> (ExtHeader, Vec<(u64, Option<u32>, usize)>) {
        let reader = ExtFileReader::new(path).unwrap();
        let header = *reader.header();
        let events = reader
            .map(|e| {
                let e = e.unwrap();
                (e.ctudc.event, e.nevod().map(|m| m.event), e.decor.len())
            })
            .collect();
        (header, events)
    }

    #[test]
    fn test_merge_and_analyze() {
        let (root, config) = make_run("ctudc_handler_process_test");
        let (tx, rx) = channel();

        merge_run(&config, RUN, &tx, 0).unwrap();
        let (header, events) = read_ext(&config.get_ext_file_name(RUN).unwrap());
        assert_eq!(header, ExtHeader::Plain);
        assert_eq!(
            events,
            vec![(1, Some(1), 1), (2, None, 1), (3, Some(3), 1)]
        );

        analyze_run(&config, RUN, &tx, 0).unwrap();
        let out_dir = config.get_analysis_directory(RUN).unwrap();
        let table =
            std::fs::read_to_string(out_dir.join("tracks").join("chamber_001.dat")).unwrap();
        assert_eq!(table.lines().count(), 4);
        let load = std::fs::read_to_string(out_dir.join("load.dat")).unwrap();
        assert!(load.is_empty());

        drop(tx);
        let statuses: Vec<WorkerStatus> = rx.iter().collect();
        assert_eq!(statuses.first().unwrap().color, BarColor::CYAN);
        let last = statuses.last().unwrap();
        assert_eq!(last.color, BarColor::MAGENTA);
        assert_eq!(last.progress, 1.0);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_merge_requiring_nevod() {
        let (root, mut config) = make_run("ctudc_handler_process_require_test");
        config.require_nevod = true;
        let (tx, _rx) = channel();
        merge_run(&config, RUN, &tx, 0).unwrap();
        let (_, events) = read_ext(&config.get_ext_file_name(RUN).unwrap());
        assert_eq!(events, vec![(1, Some(1), 1), (3, Some(3), 1)]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_merge_without_nevod_or_decor() {
        let (root, config) = make_run("ctudc_handler_process_bare_test");
        let run_dir = config.get_run_directory(RUN).unwrap();
        std::fs::remove_dir_all(run_dir.join("nevod")).unwrap();
        std::fs::remove_file(run_dir.join("decor.dat")).unwrap();
        let (tx, _rx) = channel();
        merge_run(&config, RUN, &tx, 0).unwrap();
        let (_, events) = read_ext(&config.get_ext_file_name(RUN).unwrap());
        assert_eq!(events, vec![(1, None, 0), (2, None, 0), (3, None, 0)]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_failed_run_does_not_stop_subset() {
        let (root, config) = make_run("ctudc_handler_process_subset_test");
        let run_dir = config.get_run_directory(RUN).unwrap();
        std::fs::remove_file(run_dir.join("ctudc").join("000.tds")).unwrap();
        let (tx, rx) = channel();
        process_subset(config, tx, 3, vec![5, RUN, 9], ProcessMode::Merge).unwrap();
        let statuses: Vec<WorkerStatus> = rx.iter().collect();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].run_number, RUN);
        assert_eq!(statuses[0].worker_id, 3);
        assert_eq!(statuses[0].color, BarColor::RED);
        assert_eq!(statuses[1].run_number, 9);
        assert_eq!(statuses[1].color, BarColor::GREEN);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_abandoned_merge_leaves_no_file() {
        let (root, config) = make_run("ctudc_handler_process_abandon_test");
        let run_dir = config.get_run_directory(RUN).unwrap();
        let mut buffer = Vec::new();
        CtudcHeader::Data(b'a').write_to(&mut buffer).unwrap();
        for n in [3, 1] {
            ctudc_event(n).write_to(&mut buffer).unwrap();
        }
        std::fs::write(run_dir.join("ctudc").join("000.tds"), buffer).unwrap();

        let (tx, _rx) = channel();
        assert!(matches!(
            merge_run(&config, RUN, &tx, 0),
            Err(ProcessorError::CorrelatorError(_))
        ));
        let ext_path = config.get_ext_file_name(RUN).unwrap();
        assert!(!ext_path.exists());
        assert!(!ext_path.with_extension("tds.part").exists());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_bad_file_does_not_fail_merge() {
        let (root, config) = make_run("ctudc_handler_process_bad_file_test");
        let ctudc_dir = config.get_ctudc_directory(RUN).unwrap();
        std::fs::write(ctudc_dir.join("001.tds"), b"garbage\n").unwrap();
        let (tx, _rx) = channel();
        merge_run(&config, RUN, &tx, 0).unwrap();
        let (_, events) = read_ext(&config.get_ext_file_name(RUN).unwrap());
        assert_eq!(events.len(), 3);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_create_subsets() {
        let config = Config {
            first_run_number: 10,
            last_run_number: 16,
            n_threads: 3,
            ..Default::default()
        };
        assert_eq!(
            create_subsets(&config),
            vec![vec![10, 13, 16], vec![11, 14], vec![12, 15]]
        );
    }
}
