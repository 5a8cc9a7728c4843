//! The byte-file collaborator contract and the capacity gate.
//!
//! The store is non-transactional: every operation either fully completes or
//! reports failure, and nothing beyond that is guaranteed after a reset in
//! the middle of a call. Directory enumeration is single-pass and its order
//! is whatever the store yields; callers must not assume it is stable
//! across calls.

use crate::{EntryName, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate.
    Write,
    /// Append to an existing file; fails with `NotFound` if it is absent.
    Append,
}

/// Capacity query result, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreInfo {
    pub total: usize,
    pub used: usize,
}

/// An open file handle. The handle releases its resource on drop, on every
/// exit path.
pub trait File {
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Reads from the current position, advancing it; returns 0 at the end
    /// of the file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Current size of the file in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A byte-addressable, file-oriented non-volatile store.
pub trait FileStore {
    type File: File;

    fn exists(&self, path: &str) -> bool;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File>;

    fn remove(&mut self, path: &str) -> Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Enumerates the entries of `dir` within the scope of `f`.
    ///
    /// The iterator yields full entry paths, in unspecified order, exactly
    /// once each.
    fn read_dir_and_then<R, F>(&mut self, dir: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Iterator<Item = EntryName>) -> R;

    fn info(&self) -> Result<StoreInfo>;
}

/// Drains `file` into `buf` from the current position until it reports end
/// of file. [`File::read`] may return fewer bytes than requested even when
/// more remain, so a single call is not enough.
pub(crate) fn read_to_end<F: File>(file: &mut F, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(filled);
        }
        filled += n;
    }
}

/// Headroom left on the store after a 5% reserve for filesystem metadata,
/// in bytes. Negative means the reserve is already eaten into.
pub fn headroom<S: FileStore>(store: &S) -> Result<i64> {
    let info = store.info()?;
    Ok(info.total as i64 - (info.used as i64 * 105) / 100)
}

/// Headroom clamped at zero.
pub fn free_space<S: FileStore>(store: &S) -> Result<usize> {
    Ok(headroom(store)?.max(0) as usize)
}

/// Whether a write of `size` bytes still fits. `false` on any store error.
pub fn fits<S: FileStore>(store: &S, size: usize) -> bool {
    headroom(store).map_or(false, |left| left > size as i64)
}
