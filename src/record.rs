//! Fault-time capture: streams a crash record line by line into the store.
//!
//! This code runs inside the fault/exception context, racing a hardware
//! watchdog. It makes a single pass with one reused fixed-size scratch
//! buffer, no recursion and no growth, and swallows every error - at fault
//! time there is no caller left to handle a failure, and attempting more
//! work only risks additional instability.

use core::fmt::Write as _;

use crate::log::Config;
use crate::store::{self, File as _, FileStore, OpenMode};
use crate::{Error, Result};

/// Scratch line buffer; the longest line (program counters plus the stack
/// marker) is 96 bytes.
const SCRATCH: usize = 100;

/// Bytes of stack dumped per line, four 32-bit words.
const LINE_CHUNK: usize = 16;

const STACK_START_MARKER: &str = ">>>stack>>>\n";
const STACK_END_MARKER: &str = "<<<stack<<<\n\n";

/// The platform fault descriptor, captured at the instant of the fault.
///
/// Populated by the platform's fault dispatch mechanism; this crate only
/// formats it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaultInfo {
    /// Monotonic device uptime at fault time, in milliseconds.
    pub uptime_ms: u32,
    pub restart_reason: u32,
    pub exception_cause: u32,
    pub epc1: u32,
    pub epc2: u32,
    pub epc3: u32,
    pub excvaddr: u32,
    pub depc: u32,
}

/// The memory between the faulting stack pointer and the stack end.
#[derive(Clone, Copy, Debug)]
pub struct StackSnapshot<'a> {
    start: u32,
    memory: &'a [u8],
}

impl<'a> StackSnapshot<'a> {
    /// A snapshot over an already-captured byte range starting at address
    /// `start`.
    pub fn new(start: u32, memory: &'a [u8]) -> Self {
        Self { start, memory }
    }

    /// A snapshot reading the live stack between `start` and `end`.
    ///
    /// # Safety
    /// The whole range must be mapped, readable memory, and
    /// `end >= start`. The dump length (and thereby the fault-time budget)
    /// is bounded only by this range; the caller keeps it small.
    pub unsafe fn from_raw_range(start: u32, end: u32) -> Self {
        let len = end.saturating_sub(start) as usize;
        Self {
            start,
            memory: core::slice::from_raw_parts(start as usize as *const u8, len),
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last snapshotted address, saturating at the top of the
    /// 32-bit address space.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.memory.len() as u32)
    }

    pub fn memory(&self) -> &'a [u8] {
        self.memory
    }
}

/// Worst-case serialized size of a record dumping `stack_len` bytes of
/// stack. Used to pre-check headroom: once writing has begun it cannot be
/// rolled back at fault time, so the check happens before, not after.
pub fn estimated_record_size(stack_len: usize) -> usize {
    // header <= 80, program counters + marker <= 96, a full stack line is
    // 47 bytes (8-hex-digit address, ": ", four "{:08x} " words, newline),
    // closing marker 13
    let lines = (stack_len + LINE_CHUNK - 1) / LINE_CHUNK;
    80 + 96 + lines * 47 + 13
}

/// Writes the crash record for `fault` to the configured active path.
///
/// The only failure mode is "no record written"; nothing is propagated
/// beyond a best-effort diagnostic emission.
pub fn save_crash<S: FileStore>(
    store: &mut S,
    config: &Config,
    fault: &FaultInfo,
    stack: &StackSnapshot,
) {
    if let Err(_err) = save(store, config, fault, stack) {
        error_now!("crash record dropped: {:?}", _err);
    }
}

fn save<S: FileStore>(
    store: &mut S,
    config: &Config,
    fault: &FaultInfo,
    stack: &StackSnapshot,
) -> Result<()> {
    if !store::fits(store, estimated_record_size(stack.memory.len())) {
        return Err(Error::NoSpace);
    }

    let path = config.active_path();
    let mut file = match store.open(path, OpenMode::Append) {
        Ok(file) => file,
        Err(_) => store.open(path, OpenMode::Write)?,
    };

    let mut line = heapless::String::<SCRATCH>::new();
    write!(
        line,
        "Crashed at {} ms\nRestart reason: {}\nException cause: {}\n",
        fault.uptime_ms, fault.restart_reason, fault.exception_cause
    )
    .map_err(|_| Error::Format)?;
    file.write(line.as_bytes())?;

    line.clear();
    write!(
        line,
        "epc1=0x{:08x} epc2=0x{:08x} epc3=0x{:08x} excvaddr=0x{:08x} depc=0x{:08x}\n{}",
        fault.epc1, fault.epc2, fault.epc3, fault.excvaddr, fault.depc, STACK_START_MARKER
    )
    .map_err(|_| Error::Format)?;
    file.write(line.as_bytes())?;

    for (chunk_index, chunk) in stack.memory.chunks(LINE_CHUNK).enumerate() {
        line.clear();
        let address = stack.start + (chunk_index * LINE_CHUNK) as u32;
        write!(line, "{:08x}: ", address).map_err(|_| Error::Format)?;
        for word in chunk.chunks_exact(4) {
            let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            write!(line, "{:08x} ", value).map_err(|_| Error::Format)?;
        }
        line.push('\n').map_err(|_| Error::Format)?;
        file.write(line.as_bytes())?;
    }

    file.write(STACK_END_MARKER.as_bytes())?;
    Ok(())
}
