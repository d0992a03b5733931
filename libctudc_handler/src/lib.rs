//! # ctudc_handler
//!
//! ctudc_handler is the event handler of the CTUDC drift-chamber array, written in Rust.
//! It takes the raw data of three independently clocked subsystems of the cosmic-ray
//! muon experiment:
//!
//! - the drift-chamber array (CTUDC), `.tds` files
//! - the scintillator array (NEVOD), `.nad` files
//! - the reference-track array (DECOR), tab separated track lists
//!
//! and correlates them by event number into a single correlated (`extctudc`) file per
//! run. The correlated files are then analyzed: every chamber crossed by a DECOR track
//! has its own track reconstructed from the drift times, and the two are compared.
//!
//! ## Building & Install
//!
//! To build and install the CLI use `cargo install --path ./ctudc_handler_cli` from the
//! top level repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! Configurations are YAML files. A template can be made with
//! `ctudc_handler_cli -p config.yml new`. The format is as follows:
//!
//! ```yml
//! ctudc_root: /data/ctudc
//! output_path: /data/output
//! chamber_config: null
//! first_run_number: 0
//! last_run_number: 0
//! n_threads: 1
//! require_nevod: false
//! ```
//!
//! - `ctudc_root`: directory containing one `run_NNNNN` directory per run
//! - `output_path`: directory receiving the analysis tables, one subdirectory per run
//! - `chamber_config`: optional chamber calibration used instead of the run's own
//! `chambers.conf.new`
//! - `first_run_number`, `last_run_number`: the run range (inclusive)
//! - `n_threads`: number of parallel workers to divide the runs amongst. Must be at
//! least 1.
//! - `require_nevod`: drop CTUDC events that have no NEVOD partner when merging
//!
//! ## Run Layout
//!
//! ```text
//! run_00042
//! |---- ctudc/*.tds
//! |---- nevod/*.nad, stdat, gener
//! |---- decor.dat
//! |---- decor_shsh.dat
//! |---- chambers.conf.new
//! |---- extctudc_00042.tds (written by merge)
//! ```
//!
//! NEVOD and DECOR data are optional. Without them the correlated events carry no
//! NEVOD record or no reference tracks. `stdat` and `gener` give the run meta written
//! into the correlated file header.
//!
//! ## Output
//!
//! Merging writes `extctudc_NNNNN.tds` into the run directory. Analysis writes
//! `load.dat` (chamber load of multi-muon events) and `tracks/chamber_NNN.dat` (chamber
//! against DECOR track angles and intercepts) into `<output_path>/run_NNNNN`.
//!
//! Log files contain valuable information about the status of the application. If an
//! error occurs the run is skipped and the log file will contain the reason.
pub mod association;
pub mod chamber;
pub mod chamber_config;
pub mod codec;
pub mod config;
pub mod constants;
pub mod coord_system;
pub mod correlator;
pub mod ctudc_file;
pub mod ctudc_stack;
pub mod decor_track;
pub mod error;
pub mod event;
pub mod ext_event;
pub mod ext_file;
pub mod file_stack;
pub mod hexahedron;
pub mod hit;
pub mod line;
pub mod nevod_event;
pub mod nevod_file;
pub mod nevod_stack;
pub mod plane;
pub mod process;
pub mod quadrangle;
pub mod run_meta;
pub mod track;
pub mod vector;
pub mod worker_status;
