// src/test.rs
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A convenient alias to use `?` in tests.
///
/// There is a blanket `impl From<E: Error> for Box<dyn Error>`, meaning anything that implements
/// [`std::error::Error`] can be propagated using `?`.
pub type Result = std::result::Result<(), Box<dyn std::error::Error>>;

/// An in-memory `Write` target that stays readable after being handed to an
/// engine.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other away as a `Box<dyn Write>`.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
