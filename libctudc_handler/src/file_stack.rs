use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Collect every file in `parent_path` with the given extension, sorted by name,
/// along with each file's size and the total size of the stack in bytes.
pub fn get_file_stack(
    parent_path: &Path,
    extension: &str,
) -> Result<(VecDeque<(PathBuf, u64)>, u64), std::io::Error> {
    let mut file_list: Vec<(PathBuf, u64)> = Vec::new();
    for item in parent_path.read_dir()? {
        let item = item?;
        let item_path = item.path();
        if item_path.is_file() && item_path.extension().is_some_and(|ext| ext == extension) {
            file_list.push((item_path, item.metadata()?.len()));
        }
    }

    let total_stack_size_bytes = file_list.iter().map(|(_, size)| size).sum();

    // Files are split with a running number in the name, so a plain sort keeps them in order
    file_list.sort();
    Ok((file_list.into(), total_stack_size_bytes))
}
