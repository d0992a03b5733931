use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed or truncated record: {0}")]
    Format(#[from] std::io::Error),
    #[error("Unrecognized stream header {0:?}")]
    Header(String),
    #[error("Expected record marker {expected:?} but found {found:?}")]
    Marker { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum CtudcFileError {
    #[error("Error when decoding CTUDC record: {0}")]
    Codec(#[from] CodecError),
    #[error("Could not open CTUDC file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("CTUDC file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NevodFileError {
    #[error("Error when decoding NEVOD record: {0}")]
    Codec(#[from] CodecError),
    #[error("Could not open NEVOD file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("NEVOD file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CtudcStackError {
    #[error("CtudcStack failed with IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("CtudcStack did not find any .tds files in {0:?}")]
    NoMatchingFiles(PathBuf),
}

#[derive(Debug, Error)]
pub enum NevodStackError {
    #[error("NevodStack failed with IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("NevodStack did not find any .nad files in {0:?}")]
    NoMatchingFiles(PathBuf),
}

#[derive(Debug, Error)]
pub enum DecorError {
    #[error("Could not read DECOR tracks because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("DECOR track file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("DECOR track file has no header line")]
    NoData,
    #[error("DECOR track file line {0} has too few columns")]
    BadFormat(usize),
    #[error("DECOR track file failed to parse an event number: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),
    #[error("DECOR track file failed to parse a coordinate: {0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),
}

#[derive(Debug, Error)]
pub enum RunMetaError {
    #[error("Run meta failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Run meta codec failed: {0}")]
    Codec(#[from] CodecError),
    #[error("Run meta file is malformed: {0}")]
    BadFormat(String),
    #[error("Run meta failed to parse a number: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),
    #[error("Run meta contains an invalid date: {0}")]
    BadDate(#[from] time::error::ComponentRange),
}

#[derive(Debug, Error)]
pub enum ExtFileError {
    #[error("Error when decoding correlated record: {0}")]
    Codec(#[from] CodecError),
    #[error("Could not open correlated file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Correlated file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Correlated file failed due to run meta error: {0}")]
    RunMeta(#[from] RunMetaError),
}

#[derive(Debug, Error)]
pub enum CorrelatorError {
    #[error("CTUDC event (run {run}, event {event}) arrived after (run {prev_run}, event {prev_event}); stream is corrupted")]
    OrderingViolation {
        run: u64,
        event: u64,
        prev_run: u64,
        prev_event: u64,
    },
    #[error("CTUDC run {ctudc_run} does not match NEVOD run {nevod_run}; data pairing is corrupted")]
    RunMismatch { ctudc_run: u64, nevod_run: u64 },
    #[error("Correlator failed due to CTUDC stream error: {0}")]
    Ctudc(#[from] CtudcStackError),
    #[error("Correlator failed due to NEVOD stream error: {0}")]
    Nevod(#[from] NevodStackError),
}

#[derive(Debug, Error)]
pub enum ChamberConfigError {
    #[error("Failed to load chamber config as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Chamber config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Chamber config failed to parse JSON: {0}")]
    ParsingError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to CtudcStack error: {0}")]
    CtudcError(#[from] CtudcStackError),
    #[error("Processor failed due to NevodStack error: {0}")]
    NevodError(#[from] NevodStackError),
    #[error("Processor failed due to DECOR error: {0}")]
    DecorError(#[from] DecorError),
    #[error("Processor failed due to Correlator error: {0}")]
    CorrelatorError(#[from] CorrelatorError),
    #[error("Processor failed due to run meta error: {0}")]
    RunMetaError(#[from] RunMetaError),
    #[error("Processor failed due to correlated file error: {0}")]
    ExtFileError(#[from] ExtFileError),
    #[error("Processor failed due to chamber config error: {0}")]
    ChamberConfigError(#[from] ChamberConfigError),
    #[error("Processor failed due to Codec error: {0}")]
    CodecError(#[from] CodecError),
    #[error("Processor failed because a producer thread panicked")]
    ProducerPanic,
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
