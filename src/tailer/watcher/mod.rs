// src/tailer/watcher/mod.rs
//! File and directory watches behind a narrow trait.
//!
//! The [`Watcher`] trait is the seam between the tailing engine and the
//! OS notification machinery: a persistent "entry created" watch on a
//! directory, a replaceable "content modified" watch on a file, and a
//! non-blocking event drain. The [`watcher`] function returns the inotify
//! implementation used in production; the [`mock`] module provides a
//! deterministic implementation for tests.

mod inotify;
#[cfg(test)]
pub(crate) mod mock;

use std::ffi::OsStr;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use self::inotify as imp;

/// Construct the production watcher.
///
/// The returned watcher's raw fd can be multiplexed with other event
/// sources; events must only be read when that fd polls readable.
///
/// # Errors
///
/// Propagates any `io::Error` caused when attempting to create the watcher.
pub fn watcher() -> io::Result<impl Watcher + AsRawFd> {
    imp::Watcher::new()
}

/// An opaque handle identifying one active watch.
///
/// The engine correlates events with `watch_*` calls through these handles,
/// and uses them as map keys.
pub trait Descriptor: Clone + Debug + Eq + Hash + PartialEq + Send {}

/// One file-system notification.
pub trait Event<D: Descriptor>: Debug {
    /// The handle of the watch that produced this event.
    fn descriptor(&self) -> &D;

    /// The created entry's name, for directory watches.
    ///
    /// `None` for file-watch events.
    fn name(&self) -> Option<&OsStr>;
}

/// A non-blocking file and directory watching API.
///
/// The engine uses it to:
///
/// - learn when an entry is created in a directory (see
///   [`Self::watch_directory`]), which is how log rotations announce
///   themselves;
/// - learn when new content is written to a file (see [`Self::watch_file`]),
///   which is the cue to drain the file's readable bytes.
pub trait Watcher {
    /// An opaque reference to a watched directory or file.
    type Descriptor: Descriptor;

    /// The type of events emitted by this watcher.
    type Event: Event<Self::Descriptor>;

    /// Construct a new instance of the `Watcher`.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to create the watcher.
    fn new() -> io::Result<Self>
    where
        Self: Sized;

    /// Watch a directory for newly created entries.
    ///
    /// # Callee responsibilities
    ///
    /// It is the caller's responsibility to ensure that:
    ///
    /// - `path` points to a directory.
    /// - `path` is canonical (implementations may not resolve symlinks).
    /// - `path` has not already been watched.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to register the watch.
    fn watch_directory(&mut self, path: &Path) -> io::Result<Self::Descriptor>;

    /// Watch a file for writes.
    ///
    /// # Callee responsibilities
    ///
    /// As for [`Self::watch_directory`], with `path` pointing to a file.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to register the watch.
    fn watch_file(&mut self, path: &Path) -> io::Result<Self::Descriptor>;

    /// Remove a previously registered watch.
    ///
    /// The engine calls this for the old file watch when a rotation replaces
    /// the watched file. Events already queued for the removed watch may
    /// still be read afterwards and must be tolerated.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to remove the watch.
    fn unwatch(&mut self, descriptor: Self::Descriptor) -> io::Result<()>;

    /// Read the currently pending events.
    ///
    /// This must never block: an empty `Vec` means the queue is drained for
    /// now. Callers drain in a loop until an empty batch is returned.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to read events.
    fn read_events(&mut self) -> io::Result<Vec<Self::Event>>;
}
