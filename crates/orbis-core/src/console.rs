//! Operator-facing output streams.

use std::cell::RefCell;
use std::fmt::Display;
use std::io::{self, Write};
use std::rc::Rc;

/// A writer shared between the console and anything it is lent to.
pub type SharedWriter = Rc<RefCell<dyn Write>>;

/// Standard output and standard error for one invocation.
///
/// Cloning is cheap and every clone writes to the same pair of streams, so the
/// console can be handed to the script interpreter as its output sink while
/// the dispatcher keeps using it.
#[derive(Clone)]
pub struct Console {
    out: SharedWriter,
    err: SharedWriter,
}

impl Console {
    /// Console bound to the process stdout/stderr.
    #[must_use]
    pub fn stdio() -> Self {
        let out: SharedWriter = Rc::new(RefCell::new(io::stdout()));
        let err: SharedWriter = Rc::new(RefCell::new(io::stderr()));
        Self { out, err }
    }

    /// Console writing into in-memory buffers, with a handle to read them back.
    #[must_use]
    pub fn buffered() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let out: SharedWriter = captured.out.clone();
        let err: SharedWriter = captured.err.clone();
        (Self { out, err }, captured)
    }

    /// Write one line to standard output.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the stream is closed.
    pub fn println(&self, line: impl Display) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{line}")?;
        out.flush()
    }

    /// Write one line to standard error.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the stream is closed.
    pub fn eprintln(&self, line: impl Display) -> io::Result<()> {
        let mut err = self.err.borrow_mut();
        writeln!(err, "{line}")?;
        err.flush()
    }
}

/// Read side of a [`Console::buffered`] console.
#[derive(Clone, Default)]
pub struct CapturedOutput {
    out: Rc<RefCell<Vec<u8>>>,
    err: Rc<RefCell<Vec<u8>>>,
}

impl CapturedOutput {
    #[must_use]
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.out.borrow()).into_owned()
    }

    #[must_use]
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.err.borrow()).into_owned()
    }
}
