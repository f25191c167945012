use std::path::Path;

use tracing::info;

use crate::error::CloneError;

/// Write `data` to `path`, replacing any existing file. Not atomic: a crash
/// mid-write leaves a partial file behind.
pub async fn write_audio(path: &Path, data: &[u8]) -> Result<(), CloneError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| CloneError::Persist {
                path: path.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, data)
        .await
        .map_err(|source| CloneError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

    info!(?path, bytes = data.len(), "Audio saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.mp3");
        std::fs::write(&path, b"previous run with longer content").unwrap();

        write_audio(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("out.mp3");

        write_audio(&path, b"audio").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"audio");
    }

    #[tokio::test]
    async fn test_unwritable_path_is_persist_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be overwritten with file contents
        let result = write_audio(temp_dir.path(), b"audio").await;

        assert!(matches!(result, Err(CloneError::Persist { .. })));
    }
}
