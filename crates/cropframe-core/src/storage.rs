//! Storage capability used by the crop engine for all I/O.
//!
//! The engine never touches files directly. It receives a
//! `Weak<dyn Storage>` per request and upgrades it only for the duration of
//! each read, copy or write; when the owner has dropped the storage the
//! request fails instead of writing on its behalf.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::model::Location;

/// Reads and writes crop sources and outputs.
pub trait Storage: Send + Sync {
    /// Read the full contents of a location.
    fn read(&self, location: &Location) -> io::Result<Vec<u8>>;

    /// Copy `from` to `to` byte for byte.
    fn copy(&self, from: &Location, to: &Location) -> io::Result<()>;

    /// Replace the contents of `location` so readers never see a partial file.
    fn write_atomic(&self, location: &Location, bytes: &[u8]) -> io::Result<()>;

    /// Whether `location` can be written at all.
    fn can_write(&self, location: &Location) -> bool;

    /// Whether EXIF metadata of `location` can be read.
    fn exposes_metadata(&self, location: &Location) -> bool;
}

fn unsupported(location: &Location) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} is not a file location", location),
    )
}

/// Local filesystem storage. Content locations are not resolvable here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }

    fn path<'a>(&self, location: &'a Location) -> io::Result<&'a Path> {
        location.as_path().ok_or_else(|| unsupported(location))
    }
}

impl Storage for FsStorage {
    fn read(&self, location: &Location) -> io::Result<Vec<u8>> {
        fs::read(self.path(location)?)
    }

    fn copy(&self, from: &Location, to: &Location) -> io::Result<()> {
        if from == to {
            return Ok(());
        }
        let bytes = self.read(from)?;
        self.write_atomic(to, &bytes)
    }

    fn write_atomic(&self, location: &Location, bytes: &[u8]) -> io::Result<()> {
        let path = self.path(location)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // The temp file is removed on drop if anything below fails
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn can_write(&self, location: &Location) -> bool {
        let Some(path) = location.as_path() else {
            return false;
        };
        if path.is_dir() {
            return false;
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        }
    }

    fn exposes_metadata(&self, location: &Location) -> bool {
        matches!(location, Location::File(_))
    }
}

/// In-memory storage keyed by location, for hosts that hand over content
/// already loaded and for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<Location, Vec<u8>>>,
    hide_metadata: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses to expose source metadata.
    pub fn without_metadata() -> Self {
        Self {
            hide_metadata: true,
            ..Self::default()
        }
    }

    /// Store `bytes` under `location`, replacing any previous entry.
    pub fn insert(&self, location: Location, bytes: Vec<u8>) {
        self.lock().insert(location, bytes);
    }

    /// Copy of the bytes stored under `location`.
    pub fn get(&self, location: &Location) -> Option<Vec<u8>> {
        self.lock().get(location).cloned()
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.lock().contains_key(location)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Location, Vec<u8>>> {
        // A poisoned map still holds consistent entries
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, location: &Location) -> io::Result<Vec<u8>> {
        self.get(location).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", location))
        })
    }

    fn copy(&self, from: &Location, to: &Location) -> io::Result<()> {
        let bytes = self.read(from)?;
        self.insert(to.clone(), bytes);
        Ok(())
    }

    fn write_atomic(&self, location: &Location, bytes: &[u8]) -> io::Result<()> {
        self.insert(location.clone(), bytes.to_vec());
        Ok(())
    }

    fn can_write(&self, _location: &Location) -> bool {
        true
    }

    fn exposes_metadata(&self, _location: &Location) -> bool {
        !self.hide_metadata
    }
}
