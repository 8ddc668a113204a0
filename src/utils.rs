use log::info;
use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "qualar_rs";

/// Directory robust batches save into when no path is given.
pub fn get_data_dir() -> io::Result<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not determine user data directory"))
        .map(|p| p.join(DATA_DIR_NAME))
}

pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::other(format!(
                    "Path exists but is not a directory: {}",
                    path.display()
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}
