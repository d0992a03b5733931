use super::error::NevodStackError;
use super::file_stack::get_file_stack;
use super::nevod_event::NevodEvent;
use super::nevod_file::NevodFile;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// The NEVOD .nad files of one run, read in name order as a single event stream.
/// Service records between events are skipped by the underlying files. A file that
/// fails to decode is abandoned and the stack continues with the next one.
#[derive(Debug)]
pub struct NevodStack {
    file_stack: VecDeque<(PathBuf, u64)>,
    active_file: Option<NevodFile>,
    active_file_size: u64,
    pub total_stack_size_bytes: u64,
    completed_bytes: u64,
    bad_files: Vec<PathBuf>,
}

impl NevodStack {
    pub fn new(path: &Path) -> Result<Self, NevodStackError> {
        let (file_stack, bytes) = get_file_stack(path, "nad")?;
        if file_stack.is_empty() {
            return Err(NevodStackError::NoMatchingFiles(path.to_path_buf()));
        }
        let mut stack = Self {
            file_stack,
            active_file: None,
            active_file_size: 0,
            total_stack_size_bytes: bytes,
            completed_bytes: 0,
            bad_files: Vec::new(),
        };
        stack.move_to_next_file();
        Ok(stack)
    }

    /// Get the next event in the stack. None once every file is exhausted.
    pub fn get_next_event(&mut self) -> Option<NevodEvent> {
        loop {
            let file = self.active_file.as_mut()?;
            match file.get_next_event() {
                Ok(Some(event)) => return Some(event),
                Ok(None) => self.move_to_next_file(),
                Err(e) => {
                    let path = file.path().to_path_buf();
                    spdlog::error!("Abandoning NEVOD file {}: {e}", path.display());
                    self.bad_files.push(path);
                    self.move_to_next_file();
                }
            }
        }
    }

    pub fn progress(&self) -> f32 {
        if self.total_stack_size_bytes == 0 {
            return 1.0;
        }
        self.completed_bytes as f32 / self.total_stack_size_bytes as f32
    }

    pub fn bad_files(&self) -> &[PathBuf] {
        &self.bad_files
    }

    fn move_to_next_file(&mut self) {
        self.completed_bytes += self.active_file_size;
        self.active_file = None;
        self.active_file_size = 0;
        while let Some((next_file_path, size)) = self.file_stack.pop_front() {
            spdlog::info!("Opening NEVOD file {}", next_file_path.display());
            match NevodFile::new(&next_file_path) {
                Ok(next_file) => {
                    self.active_file = Some(next_file);
                    self.active_file_size = size;
                    return;
                }
                Err(e) => {
                    spdlog::error!(
                        "Could not open NEVOD file {}: {e}",
                        next_file_path.display()
                    );
                    self.bad_files.push(next_file_path);
                    self.completed_bytes += size;
                }
            }
        }
    }
}

impl Iterator for NevodStack {
    type Item = Result<NevodEvent, NevodStackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_next_event().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nevod_event::{NevodDateTime, NevodEventMeta};
    use crate::nevod_file::NevodRecord;

    fn event(n: u32) -> NevodEvent {
        NevodEvent {
            meta: NevodEventMeta {
                event: n,
                run: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_stack_reads_across_files() {
        let dir = std::env::temp_dir().join("ctudc_handler_nevod_stack_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let files = [
            vec![
                NevodRecord::DecorConfig,
                NevodRecord::Event(Box::new(event(1))),
            ],
            vec![NevodRecord::DecorNoise],
            vec![
                NevodRecord::Event(Box::new(event(2))),
                NevodRecord::Event(Box::new(event(3))),
            ],
        ];
        for (i, records) in files.iter().enumerate() {
            let mut buffer = Vec::new();
            for r in records {
                r.write_to(NevodDateTime::default(), &mut buffer).unwrap();
            }
            std::fs::write(dir.join(format!("{i:03}.nad")), buffer).unwrap();
        }

        let mut stack = NevodStack::new(&dir).unwrap();
        let read: Vec<u32> = stack
            .by_ref()
            .map(|e| e.map(|e| e.meta.event))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, vec![1, 2, 3]);
        assert_eq!(stack.progress(), 1.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let dir = std::env::temp_dir().join("ctudc_handler_nevod_stack_missing");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(matches!(
            NevodStack::new(&dir),
            Err(NevodStackError::IOError(_))
        ));
    }

    #[test]
    fn test_bad_file_is_abandoned() {
        let dir = std::env::temp_dir().join("ctudc_handler_nevod_stack_bad");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut truncated = Vec::new();
        for n in [1, 2] {
            NevodRecord::Event(Box::new(event(n)))
                .write_to(NevodDateTime::default(), &mut truncated)
                .unwrap();
        }
        truncated.truncate(truncated.len() - 5);
        std::fs::write(dir.join("000.nad"), truncated).unwrap();
        let mut intact = Vec::new();
        NevodRecord::Event(Box::new(event(3)))
            .write_to(NevodDateTime::default(), &mut intact)
            .unwrap();
        std::fs::write(dir.join("001.nad"), intact).unwrap();

        let mut stack = NevodStack::new(&dir).unwrap();
        let read: Vec<u32> = stack
            .by_ref()
            .map(|e| e.map(|e| e.meta.event))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, vec![1, 3]);
        assert_eq!(stack.bad_files(), &[dir.join("000.nad")][..]);
        assert_eq!(stack.progress(), 1.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
