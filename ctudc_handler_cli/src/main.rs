use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use libctudc_handler::config::Config;
use libctudc_handler::process::{create_subsets, process_subset, ProcessMode};
use libctudc_handler::worker_status::{BarColor, WorkerStatus};

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => spdlog::info!("Done."),
        Err(e) => spdlog::error!("Could not write template config: {e}"),
    }
}

/// Build the loggers: one writing to the log file and the terminal, one writing to the
/// log file only for while the progress bars own the terminal
fn make_loggers() -> (Arc<spdlog::Logger>, Arc<spdlog::Logger>) {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./ctudc_handler.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()
            .expect("Could not create the log file!"),
    );
    let stdout_sink = Arc::new(
        spdlog::sink::StdStreamSink::builder()
            .std_stream(spdlog::sink::StdStream::Stdout)
            .build()
            .expect("Could not create the terminal logger!"),
    );
    let console = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink.clone())
            .sink(stdout_sink)
            .build()
            .expect("Could not create logger!"),
    );
    let file_only = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()
            .expect("Could not create logger!"),
    );
    (console, file_only)
}

fn bar_style(color: BarColor) -> ProgressStyle {
    let (color, label) = match color {
        BarColor::CYAN => ("cyan", "Merging"),
        BarColor::MAGENTA => ("magenta", "Analyzing"),
        BarColor::RED => ("red", "Failed"),
        BarColor::GREEN => ("green", "Done"),
    };
    ProgressStyle::with_template(&format!(
        "Worker {{prefix}} : {label} {{msg}} [{{bar:40.{color}}}] {{pos:>3}}%"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn update_bar(bar: &ProgressBar, status: &WorkerStatus) {
    bar.set_style(bar_style(status.color));
    bar.set_message(format!("run {}", status.run_number));
    bar.set_position((status.progress * 100.0) as u64);
}

fn main() {
    // Create a cli
    let matches = Command::new("ctudc_handler_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("merge").about("Correlate the CTUDC, NEVOD and DECOR data of each run"),
        )
        .subcommand(
            Command::new("analyze")
                .about("Reconstruct chamber tracks and compare them with DECOR tracks"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    let (console, file_only) = make_loggers();
    spdlog::set_default_logger(console.clone());

    // Parse the cli
    let config_path = PathBuf::from(
        matches
            .get_one::<String>("path")
            .expect("We require a config path"),
    );

    let mode = match matches.subcommand() {
        Some(("new", _)) => {
            spdlog::info!("Making a template config at {}...", config_path.display());
            make_template_config(&config_path);
            return;
        }
        Some(("analyze", _)) => ProcessMode::Analyze,
        _ => ProcessMode::Merge,
    };

    // Load our config
    spdlog::info!("Loading config from {}...", config_path.display());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            spdlog::error!("{e}");
            return;
        }
    };
    if !config.is_n_threads_valid() {
        spdlog::error!("Number of threads must be at least 1, found {}", config.n_threads);
        return;
    }
    spdlog::info!("Config successfully loaded.");
    spdlog::info!("CTUDC Path: {}", config.ctudc_root.display());
    spdlog::info!("Output Path: {}", config.output_path.display());
    match &config.chamber_config {
        Some(path) => spdlog::info!("Chamber config: {}", path.display()),
        None => spdlog::info!("Chamber config: per run"),
    }
    spdlog::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );
    spdlog::info!("Require NEVOD: {}", config.require_nevod);

    // The bars own the terminal while the workers run
    spdlog::set_default_logger(file_only);
    let pb_manager = MultiProgress::new();
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut workers = Vec::new();
    let mut bars = Vec::new();
    for (idx, subset) in create_subsets(&config).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let bar = pb_manager.add(ProgressBar::new(100));
        bar.set_prefix(idx.to_string());
        update_bar(&bar, &WorkerStatus::new(0.0, subset[0], idx, mode.color()));
        bars.push((idx, bar));

        let conf = config.clone();
        let tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, tx, idx, subset, mode)
        }));
    }
    drop(tx);

    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(status) => {
                if let Some((_, bar)) = bars.iter().find(|(idx, _)| *idx == status.worker_id) {
                    update_bar(bar, &status);
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for (_, bar) in bars.iter() {
        bar.finish();
    }
    spdlog::set_default_logger(console);

    let mut failed = false;
    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                failed = true;
                spdlog::error!("Processor error: {e}");
            }
            Err(_) => {
                failed = true;
                spdlog::error!("An error occured joining one of the workers!");
            }
        }
    }
    if failed {
        spdlog::warn!("Some workers failed, check ctudc_handler.log for details.");
    }

    spdlog::info!("Done.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggers_share_the_file_sink() {
        let (console, file_only) = make_loggers();
        assert_eq!(console.sinks().len(), 2);
        assert_eq!(file_only.sinks().len(), 1);
        spdlog::info!(logger: file_only, "logger test");
        file_only.flush();
        let log = std::fs::read_to_string("./ctudc_handler.log").unwrap();
        assert!(log.contains("logger test"));
    }
}
