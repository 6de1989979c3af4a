use std::path::{Path, PathBuf};

/// Resolves `file_path` against the directory of the config file, unless it is absolute or
/// explicitly relative to the working directory.
pub fn resolve_path(config_path: &Option<PathBuf>, file_path: &Path) -> PathBuf {
    if file_path.is_absolute() || file_path.starts_with("./") {
        return file_path.to_path_buf();
    }

    if let Some(path) = config_path.as_ref().and_then(|c| c.parent()) {
        path.join(file_path)
    } else {
        file_path.to_path_buf()
    }
}
