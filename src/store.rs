use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::imaging::STORED_EXTENSION;

const FILE_PREFIX: &str = "cover";
const SCRATCH_PREFIX: &str = ".cover-download";
const MAX_NAME_RETRIES: u32 = 100;

#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: Utf8PathBuf,
    relative_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanedImage {
    pub relative_path: String,
    pub size: u64,
}

impl LocalImageStore {
    pub fn new(root: impl Into<Utf8PathBuf>, relative_prefix: &str) -> Self {
        Self {
            root: root.into(),
            relative_prefix: relative_prefix.trim_matches('/').replace('\\', "/"),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), ResolveError> {
        fs::create_dir_all(self.root.as_std_path()).map_err(|err| self.root_error(err))?;
        let metadata =
            fs::metadata(self.root.as_std_path()).map_err(|err| self.root_error(err))?;
        if !metadata.is_dir() {
            return Err(ResolveError::UploadRoot {
                path: self.root.to_string(),
                message: "not a directory".to_string(),
            });
        }
        if metadata.permissions().readonly() {
            return Err(ResolveError::UploadRoot {
                path: self.root.to_string(),
                message: "read-only".to_string(),
            });
        }
        Ok(())
    }

    pub fn scratch_file(&self) -> Result<NamedTempFile, ResolveError> {
        Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))
    }

    pub fn store(&self, bytes: &[u8], attempt: usize) -> Result<String, ResolveError> {
        let storage_err = |err: io::Error| ResolveError::ImageStorageFailed(err.to_string());

        let mut temp = self.scratch_file()?;
        temp.write_all(bytes).map_err(storage_err)?;
        temp.flush().map_err(storage_err)?;

        let stem = format!(
            "{FILE_PREFIX}_{}_{attempt}",
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f")
        );
        for retry in 0..MAX_NAME_RETRIES {
            let file_name = if retry == 0 {
                format!("{stem}.{STORED_EXTENSION}")
            } else {
                format!("{stem}-{retry}.{STORED_EXTENSION}")
            };
            let destination = self.root.join(&file_name);
            match temp.persist_noclobber(destination.as_std_path()) {
                Ok(_) => {
                    let relative = self.relative_path(&file_name);
                    info!(path = %relative, bytes = bytes.len(), "stored image");
                    return Ok(relative);
                }
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    temp = err.file;
                }
                Err(err) => return Err(storage_err(err.error)),
            }
        }
        Err(ResolveError::ImageStorageFailed(format!(
            "no free file name for {stem}"
        )))
    }

    pub fn relative_path(&self, file_name: &str) -> String {
        if self.relative_prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.relative_prefix, file_name)
        }
    }

    /// Rejects anything that would leave the upload root.
    pub fn absolute_path(&self, relative_path: &str) -> Result<Utf8PathBuf, ResolveError> {
        let normalized = relative_path.replace('\\', "/");
        let trimmed = normalized.trim_start_matches('/');
        let inside = if self.relative_prefix.is_empty() {
            trimmed
        } else {
            trimmed
                .strip_prefix(self.relative_prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(trimmed)
        };
        let candidate = Utf8Path::new(inside);
        let escapes = inside.is_empty()
            || candidate
                .components()
                .any(|component| !matches!(component, Utf8Component::Normal(_)));
        if escapes {
            return Err(ResolveError::ImageStorageFailed(format!(
                "refusing path outside upload root: {relative_path}"
            )));
        }
        Ok(self.root.join(candidate))
    }

    pub fn delete(&self, relative_path: &str) -> Result<bool, ResolveError> {
        let path = self.absolute_path(relative_path)?;
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => {
                info!(path = %path, "deleted image");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path, "image already absent");
                Ok(false)
            }
            Err(err) => Err(ResolveError::ImageStorageFailed(err.to_string())),
        }
    }

    pub fn find_orphans(
        &self,
        referenced: &HashSet<String>,
    ) -> Result<Vec<OrphanedImage>, ResolveError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut orphans = Vec::new();
        for path in walk_files(self.root.as_std_path())? {
            let Ok(relative) = path.strip_prefix(self.root.as_std_path()) else {
                continue;
            };
            let Some(relative) = relative.to_str() else {
                continue;
            };
            let relative = relative.replace('\\', "/");
            let hidden = relative.split('/').any(|part| part.starts_with('.'));
            if hidden {
                continue;
            }
            let reference = self.relative_path(&relative);
            if referenced.contains(&reference) {
                continue;
            }
            let size = fs::metadata(&path)
                .map(|metadata| metadata.len())
                .unwrap_or(0);
            orphans.push(OrphanedImage {
                relative_path: reference,
                size,
            });
        }
        orphans.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(orphans)
    }

    pub fn remove_orphans(&self, orphans: &[OrphanedImage]) -> usize {
        orphans
            .iter()
            .filter(|orphan| match self.delete(&orphan.relative_path) {
                Ok(removed) => removed,
                Err(err) => {
                    warn!(path = %orphan.relative_path, error = %err, "failed to delete orphan");
                    false
                }
            })
            .count()
    }

    fn root_error(&self, err: io::Error) -> ResolveError {
        ResolveError::UploadRoot {
            path: self.root.to_string(),
            message: err.to_string(),
        }
    }
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(&path).map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))?;
            let file_type = entry
                .file_type()
                .map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))?;
            // Symlinks are never followed or listed.
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    Ok(files)
}
