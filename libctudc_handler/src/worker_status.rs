/// Progress bar color, one per kind of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarColor {
    /// Merging the streams of a run
    #[default]
    CYAN,
    /// Analyzing a correlated run
    MAGENTA,
    /// The run failed
    RED,
    /// The worker is done
    GREEN,
}

#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub run_number: u32,
    pub worker_id: usize,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, run_number: u32, worker_id: usize, color: BarColor) -> Self {
        Self {
            progress,
            run_number,
            worker_id,
            color,
        }
    }
}
