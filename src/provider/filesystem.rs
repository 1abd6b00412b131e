use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{Provider, ProviderKind};
use crate::error::ProviderError;
use crate::io::ByteStream;

/// Serves files from a fixed root directory.
///
/// Filenames are cleaned lexically as if rooted at `/`: empty and `.`
/// segments are dropped and `..` never climbs above the root. An absolute
/// name like `/etc/passwd` therefore resolves to `{root}/etc/passwd`.
#[derive(Debug, Clone)]
pub struct FilesystemProvider {
    root: PathBuf,
}

impl FilesystemProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request filename to a path inside the root.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ProviderError> {
        if filename.contains('\0') || filename.contains('\\') {
            return Err(ProviderError::BadFilename(filename.to_string()));
        }

        let mut relative = PathBuf::new();
        for segment in filename.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    relative.pop();
                }
                name => relative.push(name),
            }
        }

        Ok(self.root.join(relative))
    }
}

fn map_io_error(filename: &str, err: std::io::Error) -> ProviderError {
    match err.kind() {
        ErrorKind::NotFound => ProviderError::NotFound(filename.to_string()),
        _ => ProviderError::Internal(format!("cannot open {}: {}", filename, err)),
    }
}

#[async_trait]
impl Provider for FilesystemProvider {
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError> {
        let path = self.resolve(filename)?;
        debug!(path = %path.display(), "Opening file");

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io_error(filename, e))?;
        if !metadata.is_file() {
            return Err(ProviderError::NotFound(filename.to_string()));
        }

        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io_error(filename, e))?;

        Ok(Box::pin(file))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Filesystem
    }
}
