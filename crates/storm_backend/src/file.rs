//! File-based durable store.

use crate::context::Context;
use crate::error::{BackendError, BackendResult};
use crate::key::Key;
use crate::query::QueryDescriptor;
use crate::store::DurableStore;
use parking_lot::RwLock;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const RECORD_EXTENSION: &str = "cbor";

/// Longest hex run used for one path component; well under the usual
/// 255-byte file name limit once the extension is added.
const SEGMENT_LEN: usize = 200;

/// A durable store keeping one file per entity.
///
/// Records live at `<root>/<hex(kind)>/<hex(name)>.cbor`. Both key parts
/// are hex-encoded so that any identifier maps to a valid file name. A
/// hex name longer than one path component allows is split into nested
/// directories of fixed width, with the remainder as the file name.
///
/// # Durability
///
/// Writes go to a temporary file in the record's directory that is synced
/// and then renamed over the record, so a reader never sees a partially
/// written record. A failed write removes the temporary file.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
/// Internal locking serializes writers against readers.
///
/// # Example
///
/// ```no_run
/// use storm_backend::{Context, DurableStore, FileStore, Key};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("data")).unwrap();
/// store.put(&Context::background(), &Key::new("Note", "1"), b"data").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Opens or creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> BackendResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: &str) -> PathBuf {
        self.root.join(hex::encode(kind))
    }

    fn record_path(&self, key: &Key) -> PathBuf {
        let encoded = hex::encode(key.name());
        let mut path = self.kind_dir(key.kind());
        let mut rest = encoded.as_str();
        while rest.len() > SEGMENT_LEN {
            let (segment, tail) = rest.split_at(SEGMENT_LEN);
            path.push(segment);
            rest = tail;
        }
        path.push(format!("{rest}.{RECORD_EXTENSION}"));
        path
    }

    /// Removes directories left empty by a delete, up to the kind directory.
    fn prune_empty_dirs(&self, path: &Path, kind: &str) {
        let stop = self.kind_dir(kind);
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == stop.as_path() || fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

fn not_found_as(err: io::Error, key: &Key) -> BackendError {
    if err.kind() == io::ErrorKind::NotFound {
        BackendError::not_found(key)
    } else {
        BackendError::Io(err)
    }
}

/// Collects `(hex name, path)` for every record file below `dir`.
///
/// Directory names are the leading segments of a split name.
fn collect_records(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> BackendResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if entry.file_type()?.is_dir() {
            collect_records(&path, &format!("{prefix}{file_name}"), out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push((format!("{prefix}{stem}"), path.clone()));
            }
        }
    }
    Ok(())
}

fn decode_name(encoded: &str) -> BackendResult<String> {
    let bytes = hex::decode(encoded)
        .map_err(|e| BackendError::Corrupted(format!("bad record file name {encoded:?}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| BackendError::Corrupted(format!("bad record file name {encoded:?}: {e}")))
}

impl DurableStore for FileStore {
    fn get(&self, ctx: &Context, key: &Key) -> BackendResult<Vec<u8>> {
        ctx.check()?;
        let _guard = self.lock.read();
        fs::read(self.record_path(key)).map_err(|e| not_found_as(e, key))
    }

    fn put(&self, ctx: &Context, key: &Key, data: &[u8]) -> BackendResult<()> {
        ctx.check()?;
        let _guard = self.lock.write();
        let path = self.record_path(key);
        let dir = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| BackendError::Io(e.error))?;
        debug!(key = %key, bytes = data.len(), "wrote record file");
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &Key) -> BackendResult<()> {
        ctx.check()?;
        let _guard = self.lock.write();
        let path = self.record_path(key);
        fs::remove_file(&path).map_err(|e| not_found_as(e, key))?;
        self.prune_empty_dirs(&path, key.kind());
        Ok(())
    }

    fn query(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<Vec<(Key, Vec<u8>)>> {
        ctx.check()?;
        let _guard = self.lock.read();
        let dir = self.kind_dir(&query.kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        collect_records(&dir, "", &mut files)?;
        let mut entries = Vec::with_capacity(files.len());
        for (encoded, path) in files {
            let name = decode_name(&encoded)?;
            entries.push((Key::new(query.kind.clone(), name), fs::read(&path)?));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        query.evaluate(entries)
    }
}
