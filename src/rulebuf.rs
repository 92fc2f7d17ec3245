// rulebuf.rs - Output buffer for generated program text.
//
// One buffer per compile call. Growth is fallible so an allocation failure
// surfaces as RuleError::Memory instead of aborting the process.

use std::fmt;

use crate::error::RuleError;

/// Smallest allocation step of the buffer.
pub const BUF_INIT_SIZE: usize = 4096;
/// A `# line N` marker is written once more than this many lines accumulated.
pub const LINE_MARKER_INTERVAL: usize = 10;

#[derive(Debug, Default)]
pub struct ProgramBuffer {
    data: Vec<u8>,
    // Newline count of data[..scanned].
    lines: usize,
    scanned: usize,
    marked_lines: usize,
}

impl ProgramBuffer {
    pub fn new() -> Self {
        ProgramBuffer::default()
    }

    /// Append raw bytes.
    pub fn emit(&mut self, s: &[u8]) -> Result<(), RuleError> {
        self.reserve(s.len())?;
        self.data.extend_from_slice(s);
        Ok(())
    }

    pub fn emit_str(&mut self, s: &str) -> Result<(), RuleError> {
        self.emit(s.as_bytes())
    }

    pub fn emit_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), RuleError> {
        match args.as_str() {
            Some(s) => self.emit_str(s),
            None => self.emit_str(&fmt::format(args)),
        }
    }

    fn reserve(&mut self, additional: usize) -> Result<(), RuleError> {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let target = needed
            .max(self.data.capacity() * 2)
            .max(BUF_INIT_SIZE);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| RuleError::Memory)
    }

    /// Number of newlines written so far.
    pub fn line_count(&mut self) -> usize {
        self.lines += memchr::memchr_iter(b'\n', &self.data[self.scanned..]).count();
        self.scanned = self.data.len();
        self.lines
    }

    /// Write a `# line N` marker if enough lines were emitted since the last
    /// one. Purely cosmetic; it lets diagnostics map text lines back to blocks.
    pub fn checkpoint_line_marker(&mut self) -> Result<(), RuleError> {
        let lcount = self.line_count();
        if lcount > self.marked_lines + LINE_MARKER_INTERVAL {
            self.emit_fmt(format_args!("# line {}\n", lcount))?;
            self.marked_lines = lcount;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// `emit!(buf, "fmt", args..)` appends formatted text to a [`ProgramBuffer`].
macro_rules! emit {
    ($buf:expr, $($arg:tt)*) => {
        $buf.emit_fmt(format_args!($($arg)*))
    };
}
pub(crate) use emit;
