#![no_std]

//! Crash capture and indexed log rotation on flash-backed filesystems.
//!
//! When a device suffers a fatal fault there is usually no OS facility left
//! to preserve what happened. This crate writes a compact textual record of
//! the fault (cause, program counters, stack dump) into a file on a small
//! non-volatile store, and on the next normal startup rotates that file into
//! a numerically indexed family (`<pattern>-<n>.<extension>`) so that
//! multiple fault events survive across resets without overwriting one
//! another.
//!
//! The filesystem itself is an external collaborator: anything implementing
//! the [`FileStore`] trait can back the log. The store is assumed to be
//! non-transactional, so a rename or remove interrupted by a concurrent
//! fault can be left half-done; the rotation pointer may then reference a
//! file that no longer exists and readers must treat its target as
//! potentially stale.
//!
//! # Fault-path constraints
//! [`CrashLog::save_crash`] runs inside the fault/exception context, before
//! a hardware watchdog forces the reset. It performs a single pass with one
//! reused fixed-size scratch buffer, never allocates, never recurses, and
//! never propagates errors (there is no caller left to receive them) -
//! on any failure it degrades to "no record written".
//!
//! # Record layout
//! ```text
//! Crashed at 1234 ms
//! Restart reason: 2
//! Exception cause: 3
//! epc1=0x......... epc2=0x... epc3=0x... excvaddr=0x... depc=0x...
//! >>>stack>>>
//! 3ffe0000: 03020100 07060504 0b0a0908 0f0e0d0c
//! ...
//! <<<stack<<<
//! ```
//! All addresses and words are zero-padded lowercase 8-digit hex; stack
//! words are dumped four per line, 16 bytes of stack per line.

#[macro_use]
extern crate delog;
generate_macros!();

#[cfg(test)]
#[macro_use]
extern crate std;

mod log;
mod name;
mod record;
mod rotate;
mod store;


pub use crate::log::{
    Config, CrashLog, Sink, DEFAULT_DIR, DEFAULT_EXTENSION, DEFAULT_PATTERN, DEFAULT_POINTER_PATH,
};
pub use crate::name::{find, parse, FindMode, LogFileName};
pub use crate::record::{estimated_record_size, save_crash, FaultInfo, StackSnapshot};
pub use crate::rotate::{read_pointer, remove, rotate_on_startup, write_pointer};
pub use crate::store::{fits, free_space, headroom, File, FileStore, OpenMode, StoreInfo};

/// Longest path (and directory entry name) handled by this crate.
pub const PATH_MAX: usize = 128;

/// An owned directory entry name or path, bounded by [`PATH_MAX`].
pub type EntryName = heapless::String<PATH_MAX>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The store cannot be reached or the operation failed outright.
    Storage,
    /// The target file does not exist.
    NotFound,
    /// The write was declined because it would not fit.
    NoSpace,
    /// The caller-supplied buffer is too small for the file content.
    BufferTooSmall,
    /// A path did not fit into a [`PATH_MAX`]-bounded buffer.
    PathOverflow,
    /// Formatting into a fixed scratch buffer overflowed.
    Format,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
