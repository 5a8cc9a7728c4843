//! Startup rotation and removal for the indexed log family.
//!
//! Rotation and removal are two-step protocols (rename/remove, then pointer
//! rewrite) on a non-transactional store. A reset between the steps leaves
//! the rotation pointer referencing a file that no longer exists; that is
//! not detected or repaired here, readers of the pointer must treat its
//! target as potentially stale.

use crate::log::Config;
use crate::name::{self, FindMode};
use crate::store::{self, File as _, FileStore, OpenMode};
use crate::{EntryName, Error, Result};

/// Archives the active log file left behind by a prior fault.
///
/// If the active path exists, it is renamed to the next free family name in
/// the configured directory and the rotation pointer is overwritten with
/// the new path. Returns the archived basename, or `None` when there was
/// nothing to rotate.
///
/// A rename failure is not retried; crash capture simply resumes at the
/// active path on the next fault, losing the old record.
pub fn rotate_on_startup<S: FileStore>(
    store: &mut S,
    config: &Config,
) -> Result<Option<EntryName>> {
    if !store.exists(config.active_path()) {
        return Ok(None);
    }

    // NextFree always synthesizes a candidate; it only comes back empty if
    // the synthesized name overflows the path capacity.
    let next = store
        .read_dir_and_then(config.dir(), |entries| {
            name::find(FindMode::NextFree, entries, config.pattern(), config.extension())
        })?
        .ok_or(Error::PathOverflow)?;

    let target = config.join(&next)?;
    if store.rename(config.active_path(), &target).is_err() {
        warn!("rotating {} -> {} failed", config.active_path(), target);
        return Err(Error::Storage);
    }
    info!("rotated {} -> {}", config.active_path(), target);

    write_pointer(store, config, &target)?;
    Ok(Some(next))
}

/// Overwrites the rotation pointer with `path` (an empty string clears it).
pub fn write_pointer<S: FileStore>(store: &mut S, config: &Config, path: &str) -> Result<()> {
    let mut file = store.open(config.pointer_path(), OpenMode::Write)?;
    file.write(path.as_bytes())?;
    Ok(())
}

/// Reads the rotation pointer into `buf`, returning the number of bytes.
pub fn read_pointer<S: FileStore>(store: &mut S, config: &Config, buf: &mut [u8]) -> Result<usize> {
    let mut file = store.open(config.pointer_path(), OpenMode::Read)?;
    if file.len() > buf.len() {
        return Err(Error::BufferTooSmall);
    }
    store::read_to_end(&mut file, buf)
}

/// Removes a stored file.
///
/// `ordinal == 0` removes the active log file if present and repoints the
/// rotation pointer to the most recent remaining family member; the return
/// value is whether the file existed.
///
/// `ordinal > 0` is a 1-based position into the directory enumeration order
/// (*not* the numeric suffix), counting every entry. A family member at
/// that position triggers a pointer rewrite iff it was the most recent one;
/// any other entry is deleted unconditionally. Returns `false` when the
/// directory is shorter than `ordinal`.
pub fn remove<S: FileStore>(store: &mut S, config: &Config, ordinal: u32) -> bool {
    if ordinal == 0 {
        return remove_active(store, config).unwrap_or(false);
    }

    let entry = match store.read_dir_and_then(config.dir(), |entries| {
        entries.nth(ordinal as usize - 1)
    }) {
        Ok(Some(entry)) => entry,
        _ => return false,
    };

    remove_positional(store, config, &entry).is_ok()
}

/// Most recent family member in the configured directory, as a basename.
fn most_recent<S: FileStore>(store: &mut S, config: &Config) -> Result<Option<EntryName>> {
    store.read_dir_and_then(config.dir(), |entries| {
        name::find(FindMode::MostRecent, entries, config.pattern(), config.extension())
    })
}

/// Repoints the rotation pointer at the most recent remaining family
/// member, or clears it when none remains.
fn repoint<S: FileStore>(store: &mut S, config: &Config) -> Result<()> {
    match most_recent(store, config)? {
        Some(latest) => {
            let path = config.join(&latest)?;
            write_pointer(store, config, &path)
        }
        None => write_pointer(store, config, ""),
    }
}

fn remove_active<S: FileStore>(store: &mut S, config: &Config) -> Result<bool> {
    if !store.exists(config.active_path()) {
        return Ok(false);
    }
    store.remove(config.active_path())?;
    info!("removed active log {}", config.active_path());
    repoint(store, config)?;
    Ok(true)
}

fn remove_positional<S: FileStore>(store: &mut S, config: &Config, entry: &str) -> Result<()> {
    let in_family = name::parse(entry).map_or(false, |parsed| {
        parsed.base == config.pattern() && parsed.extension == config.extension()
    });

    if !in_family {
        store.remove(entry)?;
        info!("removed {}", entry);
        return Ok(());
    }

    // The pointer only needs a rewrite if the entry being deleted is the
    // most recent family member, so look that up before deleting.
    let was_latest = match most_recent(store, config)? {
        Some(latest) => name::basename(entry) == latest.as_str(),
        None => false,
    };

    store.remove(entry)?;
    info!("removed {}", entry);

    if was_latest {
        repoint(store, config)?;
    }
    Ok(())
}
