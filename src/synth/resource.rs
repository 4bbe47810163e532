// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Read-only sources of patch bank data.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

/// Environment variable that overrides the bundled assets directory.
pub const ASSETS_ENV: &str = "ULTRAMIDI_ASSETS";

/// Errors raised by bank resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource {0} not found")]
    NotFound(String),

    #[error("Resource does not support {0}")]
    Unsupported(&'static str),

    #[error("IO error reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Something patch bank files can be read from by name.
pub trait BankResource: Send + Sync {
    /// Reads the named entry.
    fn read(&self, name: &str) -> Result<Vec<u8>, ResourceError>;

    /// Bank resources are read-only.
    fn write(&self, _name: &str, _data: &[u8]) -> Result<(), ResourceError> {
        Err(ResourceError::Unsupported("write"))
    }

    /// Bank resources are read-only.
    fn delete(&self, _name: &str) -> Result<(), ResourceError> {
        Err(ResourceError::Unsupported("delete"))
    }
}

/// Reads entries relative to a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    root: PathBuf,
}

impl FileSystemResource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BankResource for FileSystemResource {
    fn read(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.root.join(name);
        debug!(path = ?path, "Reading bank resource");
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ResourceError::NotFound(path.display().to_string()),
            _ => ResourceError::Io {
                name: path.display().to_string(),
                source: e,
            },
        })
    }
}

/// Reads entries from the assets directory shipped next to the executable.
#[derive(Debug, Clone)]
pub struct BundledResource {
    inner: FileSystemResource,
}

impl BundledResource {
    /// Uses `$ULTRAMIDI_ASSETS` if set, otherwise `assets/` next to the executable.
    pub fn new() -> Result<Self, ResourceError> {
        let root = match env::var_os(ASSETS_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let exe = env::current_exe().map_err(|e| ResourceError::Io {
                    name: "current executable".to_string(),
                    source: e,
                })?;
                exe.parent()
                    .map(|dir| dir.join("assets"))
                    .unwrap_or_else(|| PathBuf::from("assets"))
            }
        };
        Ok(Self::with_root(root))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: FileSystemResource::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        self.inner.root()
    }
}

impl BankResource for BundledResource {
    fn read(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        self.inner.read(name)
    }
}

/// Entries held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResource {
    entries: HashMap<String, Arc<[u8]>>,
}

impl MemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, data: impl Into<Arc<[u8]>>) {
        self.entries.insert(name.to_string(), data.into());
    }

    pub fn with(mut self, name: &str, data: impl Into<Arc<[u8]>>) -> Self {
        self.insert(name, data);
        self
    }
}

impl BankResource for MemoryResource {
    fn read(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        self.entries
            .get(name)
            .map(|data| data.to_vec())
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))
    }
}
