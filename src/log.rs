//! Configuration and the public operation surface.

use core::fmt::Write as _;

use heapless_bytes::Bytes;

use crate::record::{self, FaultInfo, StackSnapshot};
use crate::rotate;
use crate::store::{self, File as _, FileStore, OpenMode};
use crate::{EntryName, Error, Result};

pub const DEFAULT_DIR: &str = "/";
pub const DEFAULT_PATTERN: &str = "crashlog";
pub const DEFAULT_EXTENSION: &str = "log";
pub const DEFAULT_POINTER_PATH: &str = "/lastname.txt";

/// Read/stream chunk size for file content.
const IO_CHUNK: usize = 64;

/// Naming configuration for one crash log family.
///
/// Owned by the [`CrashLog`] it is handed to and fixed for the process
/// lifetime; there is no ambient global naming state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    dir: EntryName,
    pattern: EntryName,
    extension: EntryName,
    pointer_path: EntryName,
    active_path: EntryName,
}

impl Default for Config {
    fn default() -> Self {
        // the built-in names are known to fit PATH_MAX
        Self::new(
            DEFAULT_DIR,
            DEFAULT_PATTERN,
            DEFAULT_EXTENSION,
            DEFAULT_POINTER_PATH,
        )
        .unwrap()
    }
}

impl Config {
    /// A configuration rotating `<pattern>-<n>.<extension>` files inside
    /// `dir`, with the active path defaulting to
    /// `<dir><pattern>-1.<extension>`.
    pub fn new(dir: &str, pattern: &str, extension: &str, pointer_path: &str) -> Result<Self> {
        let mut config = Self {
            dir: owned(dir)?,
            pattern: owned(pattern)?,
            extension: owned(extension)?,
            pointer_path: owned(pointer_path)?,
            active_path: EntryName::new(),
        };
        let mut first = EntryName::new();
        write!(first, "{}-1.{}", config.pattern, config.extension)
            .map_err(|_| Error::PathOverflow)?;
        config.active_path = config.join(&first)?;
        Ok(config)
    }

    /// Overrides the path crash records are appended to. Settable once, at
    /// construction.
    ///
    /// An override that does not itself match the rotation grammar still
    /// participates in rotation: on startup it is archived under the next
    /// free family index, starting at 1 when no family member exists yet.
    pub fn with_active_path(mut self, path: &str) -> Result<Self> {
        self.active_path = owned(path)?;
        Ok(self)
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn pointer_path(&self) -> &str {
        &self.pointer_path
    }

    pub fn active_path(&self) -> &str {
        &self.active_path
    }

    /// `name` prefixed with the configured directory.
    pub fn join(&self, name: &str) -> Result<EntryName> {
        let mut path = EntryName::new();
        path.push_str(&self.dir).map_err(|_| Error::PathOverflow)?;
        if !self.dir.ends_with('/') {
            path.push('/').map_err(|_| Error::PathOverflow)?;
        }
        path.push_str(name).map_err(|_| Error::PathOverflow)?;
        Ok(path)
    }
}

fn owned(value: &str) -> Result<EntryName> {
    let mut out = EntryName::new();
    out.push_str(value).map_err(|_| Error::PathOverflow)?;
    Ok(out)
}

/// An output sink for [`CrashLog::stream_to`].
pub trait Sink {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;
}

/// A bounded, numerically indexed family of crash records on a
/// [`FileStore`].
pub struct CrashLog<S: FileStore> {
    store: S,
    config: Config,
}

impl<S: FileStore> CrashLog<S> {
    /// Takes ownership of the store and performs startup rotation: a crash
    /// record left at the active path by a prior fault is archived under
    /// the next free family index and the rotation pointer is updated.
    ///
    /// A rotation failure is recoverable and only logged; crash capture
    /// then resumes at the active path, losing the prior record.
    pub fn new(store: S, config: Config) -> Self {
        let mut log = Self { store, config };
        if rotate::rotate_on_startup(&mut log.store, &log.config).is_err() {
            warn!("startup rotation failed, prior record will be overwritten");
        }
        log
    }

    /// Captures a crash record at fault time. Never fails; degrades to "no
    /// record written". See [`crate::save_crash`].
    pub fn save_crash(&mut self, fault: &FaultInfo, stack: &StackSnapshot) {
        record::save_crash(&mut self.store, &self.config, fault, stack)
    }

    /// Removes a stored file by ordinal. See [`crate::remove`].
    pub fn remove(&mut self, ordinal: u32) -> bool {
        rotate::remove(&mut self.store, &self.config, ordinal)
    }

    /// Reads an entire file into `buf`, returning the number of bytes.
    pub fn read_to_buffer(&mut self, path: &str, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.store.open(path, OpenMode::Read)?;
        if file.len() > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        store::read_to_end(&mut file, buf)
    }

    /// Reads an entire file into an owned buffer of capacity `N`.
    pub fn read<const N: usize>(&mut self, path: &str) -> Result<Bytes<N>> {
        let mut buf = [0u8; N];
        let n = self.read_to_buffer(path, &mut buf)?;
        Bytes::from_slice(&buf[..n]).map_err(|_| Error::BufferTooSmall)
    }

    /// Streams a file's content to `sink` in small chunks.
    pub fn stream_to(&mut self, path: &str, sink: &mut impl Sink) -> Result<()> {
        let mut file = self.store.open(path, OpenMode::Read)?;
        let mut chunk = [0u8; IO_CHUNK];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            sink.write_all(&chunk[..n])?;
        }
    }

    /// Number of entries in `dir` whose name ends with `suffix`.
    pub fn count(&mut self, dir: &str, suffix: &str) -> Result<u32> {
        self.store.read_dir_and_then(dir, |entries| {
            entries.filter(|entry| entry.ends_with(suffix)).count() as u32
        })
    }

    /// Total number of entries in `dir`.
    pub fn file_count(&mut self, dir: &str) -> Result<u32> {
        self.store
            .read_dir_and_then(dir, |entries| entries.count() as u32)
    }

    /// Length of the longest entry name in `dir`, 0 when empty.
    pub fn longest_filename(&mut self, dir: &str) -> Result<usize> {
        self.store
            .read_dir_and_then(dir, |entries| entries.map(|entry| entry.len()).max())
            .map(|longest| longest.unwrap_or(0))
    }

    /// Fills `out` with entry names from `dir`, up to its capacity;
    /// returns how many were written.
    pub fn list(&mut self, dir: &str, out: &mut [EntryName]) -> Result<usize> {
        self.store.read_dir_and_then(dir, |entries| {
            let mut filled = 0;
            for entry in entries {
                if filled == out.len() {
                    break;
                }
                out[filled] = entry;
                filled += 1;
            }
            filled
        })
    }

    /// Remaining space after the capacity reserve, in bytes.
    pub fn free_space(&self) -> Result<usize> {
        store::free_space(&self.store)
    }

    /// Whether a write of `size` bytes still fits.
    pub fn check_free_space(&self, size: usize) -> bool {
        store::fits(&self.store, size)
    }

    /// Appends to the active log file, gated by the capacity reserve; a
    /// write that would not fit is silently skipped.
    pub fn append(&mut self, content: &[u8]) {
        append_to_store(&mut self.store, self.config.active_path(), content)
    }

    /// Like [`CrashLog::append`], for an arbitrary path.
    pub fn append_to(&mut self, path: &str, content: &[u8]) {
        append_to_store(&mut self.store, path, content)
    }

    /// The path crash records are currently appended to.
    pub fn active_path(&self) -> &str {
        self.config.active_path()
    }

    /// Reads the rotation pointer (the path of the most recently rotated
    /// file) into `buf`, returning the number of bytes.
    ///
    /// After a reset in the middle of a removal the pointer may name a file
    /// that no longer exists; the target is best-effort.
    pub fn last_log_path(&mut self, buf: &mut [u8]) -> Result<usize> {
        rotate::read_pointer(&mut self.store, &self.config, buf)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

fn append_to_store<S: FileStore>(store: &mut S, path: &str, content: &[u8]) {
    if !store::fits(store, content.len()) {
        warn!("append of {} bytes to {} declined, no space", content.len(), path);
        return;
    }
    let file = match store.open(path, OpenMode::Append) {
        Ok(file) => Ok(file),
        Err(Error::NotFound) => store.open(path, OpenMode::Write),
        Err(err) => Err(err),
    };
    match file {
        Ok(mut file) => {
            if file.write(content).is_err() {
                warn!("append to {} failed", path);
            }
        }
        Err(_err) => {
            warn!("append target {} unavailable: {:?}", path, _err);
        }
    }
}
