use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ImportError;

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ImportError> {
    let parent = path
        .parent()
        .ok_or_else(|| ImportError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".gisaid-import")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| ImportError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Rename, falling back to copy-and-remove when the destination is on a
/// different filesystem.
pub fn move_file(source: &Utf8Path, dest: &Utf8Path) -> Result<(), ImportError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ImportError::Filesystem(err.to_string()))?;
    }
    if fs::rename(source.as_std_path(), dest.as_std_path()).is_ok() {
        return Ok(());
    }
    fs::copy(source.as_std_path(), dest.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("copy {source} to {dest}: {err}")))?;
    fs::remove_file(source.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("remove {source}: {err}")))?;
    Ok(())
}

/// Move processed `.tsv` and `.fasta` files out of the import directory,
/// returning the moved file names.
pub fn archive_processed(
    import_dir: &Utf8Path,
    imported_dir: &Utf8Path,
) -> Result<Vec<String>, ImportError> {
    fs::create_dir_all(imported_dir.as_std_path())
        .map_err(|err| ImportError::Filesystem(err.to_string()))?;

    let mut moved = Vec::new();
    let entries = fs::read_dir(import_dir.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("read {import_dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| ImportError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|_| ImportError::Filesystem("non-utf8 path in import dir".to_string()))?;
        if !path.is_file() {
            continue;
        }
        let is_processed = matches!(path.extension(), Some("tsv") | Some("fasta"));
        if !is_processed {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        move_file(&path, &imported_dir.join(file_name))?;
        moved.push(file_name.to_string());
    }
    moved.sort();
    Ok(moved)
}
