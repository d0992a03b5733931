use super::ctudc_file::CtudcFile;
use super::error::CtudcStackError;
use super::event::Event;
use super::file_stack::get_file_stack;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// All of the CTUDC .tds files of one run, read in name order as a single event stream.
///
/// The acquisition rolls files over during a run, so a run is a directory of files
/// whose events continue one another. A file that fails to open or decode is logged,
/// abandoned at the failure and the stack continues with the next file.
#[derive(Debug)]
pub struct CtudcStack {
    file_stack: VecDeque<(PathBuf, u64)>,
    active_file: Option<CtudcFile>,
    active_file_size: u64,
    pub total_stack_size_bytes: u64,
    completed_bytes: u64,
    bad_files: Vec<PathBuf>,
    parent_path: PathBuf,
}

impl CtudcStack {
    /// Create a new CtudcStack for a given run's CTUDC directory
    pub fn new(path: &Path) -> Result<Self, CtudcStackError> {
        let (file_stack, bytes) = get_file_stack(path, "tds")?;
        if file_stack.is_empty() {
            return Err(CtudcStackError::NoMatchingFiles(path.to_path_buf()));
        }
        let mut stack = Self {
            file_stack,
            active_file: None,
            active_file_size: 0,
            total_stack_size_bytes: bytes,
            completed_bytes: 0,
            bad_files: Vec::new(),
            parent_path: PathBuf::from(path),
        };
        stack.move_to_next_file();
        Ok(stack)
    }

    /// Get the next event in the file stack, None once every file is exhausted
    pub fn get_next_event(&mut self) -> Option<Event> {
        loop {
            let file = self.active_file.as_mut()?;
            match file.get_next_event() {
                Ok(Some(event)) => return Some(event),
                Ok(None) => self.move_to_next_file(),
                Err(e) => {
                    let path = file.path().to_path_buf();
                    spdlog::error!("Abandoning CTUDC file {}: {e}", path.display());
                    self.bad_files.push(path);
                    self.move_to_next_file();
                }
            }
        }
    }

    /// Fraction of the stack (by size) belonging to files that are fully read
    pub fn progress(&self) -> f32 {
        if self.total_stack_size_bytes == 0 {
            return 1.0;
        }
        self.completed_bytes as f32 / self.total_stack_size_bytes as f32
    }

    pub fn parent_path(&self) -> &Path {
        &self.parent_path
    }

    /// Files that failed to open or decode so far
    pub fn bad_files(&self) -> &[PathBuf] {
        &self.bad_files
    }

    /// Move to the next file in the stack, skipping dropped and unreadable files
    fn move_to_next_file(&mut self) {
        self.completed_bytes += self.active_file_size;
        self.active_file = None;
        self.active_file_size = 0;
        while let Some((next_file_path, size)) = self.file_stack.pop_front() {
            spdlog::info!("Opening CTUDC file {}", next_file_path.display());
            match CtudcFile::new(&next_file_path) {
                Ok(next_file) if !next_file.is_eof() => {
                    self.active_file = Some(next_file);
                    self.active_file_size = size;
                    return;
                }
                Ok(_) => spdlog::info!("{} is a dropped file, skipping", next_file_path.display()),
                Err(e) => {
                    spdlog::error!(
                        "Could not open CTUDC file {}: {e}",
                        next_file_path.display()
                    );
                    self.bad_files.push(next_file_path);
                }
            }
            self.completed_bytes += size;
        }
    }
}

impl Iterator for CtudcStack {
    type Item = Result<Event, CtudcStackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_next_event().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctudc_file::CtudcHeader;

    fn write_file(path: &Path, header: CtudcHeader, events: &[Event]) {
        let mut buffer = Vec::new();
        header.write_to(&mut buffer).unwrap();
        for e in events {
            e.write_to(&mut buffer).unwrap();
        }
        std::fs::write(path, buffer).unwrap();
    }

    #[test]
    fn test_stack_reads_across_files() {
        let dir = std::env::temp_dir().join("ctudc_handler_ctudc_stack_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let events: Vec<Event> = (1..=5).map(|n| Event::new(3, n, 0, vec![])).collect();
        write_file(&dir.join("run_0001.tds"), CtudcHeader::Data(b'a'), &events[..2]);
        write_file(&dir.join("run_0002.tds"), CtudcHeader::Drop, &events[2..3]);
        write_file(&dir.join("run_0003.tds"), CtudcHeader::Data(b'b'), &[]);
        write_file(&dir.join("run_0004.tds"), CtudcHeader::Data(b'a'), &events[3..]);

        let mut stack = CtudcStack::new(&dir).unwrap();
        assert_eq!(stack.progress(), 0.0);
        let read: Vec<Event> = stack.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(read.iter().map(|e| e.event).collect::<Vec<_>>(), vec![1, 2, 4, 5]);
        assert_eq!(stack.progress(), 1.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_directory() {
        let dir = std::env::temp_dir().join("ctudc_handler_ctudc_stack_empty");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            CtudcStack::new(&dir),
            Err(CtudcStackError::NoMatchingFiles(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_file_is_abandoned() {
        let dir = std::env::temp_dir().join("ctudc_handler_ctudc_stack_bad");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut truncated = Vec::new();
        CtudcHeader::Data(b'a').write_to(&mut truncated).unwrap();
        Event::new(1, 1, 0, vec![]).write_to(&mut truncated).unwrap();
        Event::new(1, 2, 0, vec![]).write_to(&mut truncated).unwrap();
        truncated.truncate(truncated.len() - 5);
        std::fs::write(dir.join("a.tds"), truncated).unwrap();
        std::fs::write(dir.join("b.tds"), b"garbage\n").unwrap();
        write_file(
            &dir.join("c.tds"),
            CtudcHeader::Data(b'a'),
            &[Event::new(1, 3, 0, vec![])],
        );

        let mut stack = CtudcStack::new(&dir).unwrap();
        let read: Vec<Event> = stack.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(read.iter().map(|e| e.event).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(
            stack.bad_files(),
            &[dir.join("a.tds"), dir.join("b.tds")][..]
        );
        assert_eq!(stack.progress(), 1.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
