// src/engine/io.rs
//
// I/O for uploaded files: Source enum (memory / mmap / lazy path) and atomic
// writes for generated thumbnails.

use crate::error::ImagingError;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Image source - in-memory data, memory-mapped files, or file paths
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data (from an upload buffer)
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
    /// File path for lazy loading (data is read only when needed)
    Path(PathBuf),
}

impl Source {
    /// Memory-map `path`. Empty files cannot be mapped on every platform, so
    /// they come back as an empty in-memory source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImagingError> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ImagingError::not_found(display.clone())
            } else {
                ImagingError::read_failed(display.clone(), e)
            }
        })?;
        let len = file
            .metadata()
            .map_err(|e| ImagingError::read_failed(display.clone(), e))?
            .len();
        if len == 0 {
            return Ok(Source::Memory(Arc::new(Vec::new())));
        }
        // SAFETY: the mapping is read-only and uploads are never rewritten in
        // place; a concurrent truncation would surface as SIGBUS, same as
        // any other mmap reader.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ImagingError::map_failed(display, e))?;
        Ok(Source::Mapped(Arc::new(mmap)))
    }

    /// Load the actual bytes from the source
    pub fn load(&self) -> Result<Arc<Vec<u8>>, ImagingError> {
        match self {
            Source::Memory(data) => Ok(data.clone()),
            Source::Mapped(mmap) => Ok(Arc::new(mmap.as_ref().to_vec())),
            Source::Path(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    ImagingError::read_failed(path.to_string_lossy().to_string(), e)
                })?;
                Ok(Arc::new(data))
            }
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Source::Path(p) => Some(p),
            Source::Memory(_) | Source::Mapped(_) => None,
        }
    }

    /// Borrow the bytes directly. None only for Path sources.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Source::Memory(data) => Some(data.as_slice()),
            Source::Mapped(mmap) => Some(mmap.as_ref()),
            Source::Path(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Source::Memory(data) => data.len(),
            Source::Mapped(mmap) => mmap.len(),
            Source::Path(_) => 0, // Unknown until loaded
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write `bytes` to `path` through a temp file in the same directory, so a
/// reader never sees a half-written thumbnail.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64, ImagingError> {
    let display = path.to_string_lossy().to_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| ImagingError::write_failed(display.clone(), e))?;
    tmp.write_all(bytes)
        .map_err(|e| ImagingError::write_failed(display.clone(), e))?;
    tmp.persist(path)
        .map_err(|e| ImagingError::write_failed(display, e.error))?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_maps_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m42.bin");
        std::fs::write(&path, b"orion").unwrap();

        let source = Source::open(&path).unwrap();
        assert!(matches!(source, Source::Mapped(_)));
        assert_eq!(source.as_bytes(), Some(&b"orion"[..]));
        assert_eq!(source.len(), 5);
        assert_eq!(source.load().unwrap().as_slice(), b"orion");
    }

    #[test]
    fn open_empty_file_is_empty_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        let source = Source::open(&path).unwrap();
        assert!(source.is_empty());
        assert_eq!(source.as_bytes(), Some(&[][..]));
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Source::open(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, ImagingError::NotFound { .. }));
    }

    #[test]
    fn path_source_loads_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let source = Source::Path(path.clone());
        assert_eq!(source.as_bytes(), None);
        assert_eq!(source.as_path(), Some(&path));
        assert_eq!(source.load().unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.jpg");
        std::fs::write(&path, b"old").unwrap();

        assert_eq!(write_atomic(&path, b"new bytes").unwrap(), 9);
        assert_eq!(std::fs::read(&path).unwrap(), b"new bytes");
    }

    #[test]
    fn write_atomic_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("thumb.jpg");
        let err = write_atomic(&path, b"x").unwrap_err();
        assert!(matches!(err, ImagingError::Write { .. }));
    }
}
