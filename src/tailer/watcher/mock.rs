// src/tailer/watcher/mock.rs
//! Mock [`Watcher`](crate::tailer::watcher::Watcher) implementation.
//!
//! This watches no actual notification channel. Watched paths are recorded,
//! invariants on their use are asserted, and tests inject events — either
//! through the `simulate_*` helpers, which also perform the corresponding
//! file-system change, or raw through [`Watcher::push_event`] to reproduce
//! awkward queue orderings.

use std::cell::RefCell;
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::tailer::watcher;

/// The watch descriptor type for [`Watcher`].
///
/// A canonical path uniquely identifies a call to
/// [`watch_directory`](watcher::Watcher::watch_directory) or
/// [`watch_file`](watcher::Watcher::watch_file), thanks to the callee
/// responsibilities (and, in this implementation, assertions) on those
/// methods.
type Descriptor = PathBuf;

impl watcher::Descriptor for Descriptor {}

/// The event type for [`Watcher`].
#[derive(Debug)]
pub(crate) struct Event {
    descriptor: Descriptor,
    name: Option<OsString>,
}

impl watcher::Event<Descriptor> for Event {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }
}

/// A mock [`Watcher`](crate::tailer::watcher::Watcher) implementation.
pub(crate) struct Watcher {
    mock: Rc<RefCell<Mock>>,
}

/// The inner-type of [`Watcher`] that maintains the list of watched paths and
/// pushed events.
struct Mock {
    watched_paths: Vec<PathBuf>,
    pending_events: Vec<Event>,
}

impl Watcher {
    /// Create a new instance.
    pub(crate) fn new() -> Self {
        Self {
            mock: Rc::new(RefCell::new(Mock {
                watched_paths: Vec::new(),
                pending_events: Vec::new(),
            })),
        }
    }

    /// Queue an event without touching the file system.
    ///
    /// Use this to reproduce queue orderings the `simulate_*` helpers can't,
    /// such as a stale modify event arriving after the rotation's create
    /// event.
    pub(crate) fn push_event(&mut self, descriptor: PathBuf, name: Option<OsString>) {
        self.mock
            .borrow_mut()
            .pending_events
            .push(Event { descriptor, name });
    }

    /// Simulate a write to a watched file.
    ///
    /// The given `text` is appended to the watched file at `path`, and an
    /// event for the file is pushed for later collection by `read_events`.
    ///
    /// # Panics
    ///
    /// This will panic if the given `path` is not in `watched_paths`.
    pub(crate) fn simulate_write(&mut self, path: &Path, text: &str) -> io::Result<()> {
        use std::io::Write;

        assert!(
            self.mock.borrow().watched_paths.contains(&path.to_path_buf()),
            "Can't simulate write to unwatched path: {:?}",
            path
        );

        write!(OpenOptions::new().append(true).open(path)?, "{}", text)?;
        self.push_event(path.to_path_buf(), None);

        Ok(())
    }

    /// Simulate a rotation of the watched file at `path`.
    ///
    /// The current file is renamed aside (as an external log writer would),
    /// an empty file is created under the original name, and a create event
    /// for the containing directory is pushed, carrying the file's name.
    ///
    /// # Panics
    ///
    /// This will panic if the containing directory is not in `watched_paths`.
    pub(crate) fn simulate_rotation(&mut self, path: &Path) -> io::Result<()> {
        let directory = path.parent().expect("rotated path has no parent").to_path_buf();
        let name = path.file_name().expect("rotated path has no file name").to_os_string();

        assert!(
            self.mock.borrow().watched_paths.contains(&directory),
            "Can't simulate rotation in unwatched directory: {:?}",
            directory
        );

        std::fs::rename(path, path.with_extension("1"))?;
        File::create(path)?;
        self.push_event(directory, Some(name));

        Ok(())
    }
}

impl Clone for Watcher {
    fn clone(&self) -> Self {
        Self {
            mock: Rc::clone(&self.mock),
        }
    }
}

impl watcher::Watcher for Watcher {
    type Descriptor = PathBuf;
    type Event = Event;

    fn new() -> io::Result<Self> {
        Ok(Self::new())
    }

    /// Watch a directory for newly created entries.
    ///
    /// This records that `path` has been watched, and returns it as the
    /// [`Descriptor`] (opaque to callers).
    ///
    /// Additionally, assertions are in place to validate the callee
    /// responsibilities of the trait method:
    ///
    /// - `path` points to a directory.
    /// - `path` is canonical.
    /// - `path` has not already been watched.
    fn watch_directory(&mut self, path: &Path) -> io::Result<Self::Descriptor> {
        let canonical_path = path.canonicalize()?;
        let watched_paths = &mut self.mock.borrow_mut().watched_paths;

        assert!(
            path.is_dir(),
            "called watch_directory with file path {:?}",
            path
        );
        assert_eq!(
            path, canonical_path,
            "called watch_directory with link {:?} to {:?}",
            path, canonical_path
        );
        assert!(
            !watched_paths.contains(&canonical_path),
            "called watch_directory with duplicate path {:?}",
            path
        );

        watched_paths.push(canonical_path.clone());
        Ok(canonical_path)
    }

    /// Watch a file for writes.
    ///
    /// This records that `path` has been watched, and returns it as the
    /// [`Descriptor`] (opaque to callers).
    ///
    /// Additionally, assertions are in place to validate the callee
    /// responsibilities of the trait method:
    ///
    /// - `path` points to a file.
    /// - `path` is canonical.
    /// - `path` has not already been watched.
    fn watch_file(&mut self, path: &Path) -> io::Result<Self::Descriptor> {
        let canonical_path = path.canonicalize()?;
        let watched_paths = &mut self.mock.borrow_mut().watched_paths;

        assert!(
            path.is_file(),
            "called watch_file with directory path {:?}",
            path
        );
        assert_eq!(
            path, canonical_path,
            "called watch_file with link {:?} to {:?}",
            path, canonical_path
        );
        assert!(
            !watched_paths.contains(&canonical_path),
            "called watch_file with duplicate path {:?}",
            path
        );

        watched_paths.push(canonical_path.clone());
        Ok(canonical_path)
    }

    /// Remove a previously registered watch.
    ///
    /// # Panics
    ///
    /// This will panic if the given `descriptor` is not in `watched_paths`,
    /// since removing an unknown watch is a bug in the caller.
    fn unwatch(&mut self, descriptor: Self::Descriptor) -> io::Result<()> {
        let watched_paths = &mut self.mock.borrow_mut().watched_paths;
        let index = watched_paths
            .iter()
            .position(|path| path == &descriptor)
            .unwrap_or_else(|| panic!("called unwatch with unwatched path {:?}", descriptor));
        watched_paths.remove(index);
        Ok(())
    }

    /// Read the currently pending events.
    ///
    /// This pops whatever events have been queued by the `simulate_*`
    /// helpers or [`push_event`](Self::push_event) since the last call.
    fn read_events(&mut self) -> io::Result<Vec<Self::Event>> {
        let pending_events = &mut self.mock.borrow_mut().pending_events;
        Ok(std::mem::replace(pending_events, Vec::new()))
    }
}
