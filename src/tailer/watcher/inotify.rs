// src/tailer/watcher/inotify.rs
//! [`Watcher`](super::Watcher) implementation based on `inotify`.

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};

use crate::tailer::watcher;

const INOTIFY_BUFFER_SIZE: usize = 1024;

type Descriptor = WatchDescriptor;

impl watcher::Descriptor for Descriptor {}

#[derive(Debug)]
pub(super) struct Event {
    descriptor: WatchDescriptor,
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

impl<'event> From<inotify::Event<&'event OsStr>> for Event {
    fn from(inotify_event: inotify::Event<&'event OsStr>) -> Self {
        Self {
            descriptor: inotify_event.wd,
            name: inotify_event.name.map(OsStr::to_os_string),
        }
    }
}

pub(super) struct Watcher {
    inner: Inotify,
    buffer: [u8; INOTIFY_BUFFER_SIZE],
}

impl watcher::Watcher for Watcher {
    type Descriptor = Descriptor;

    type Event = Event;

    fn new() -> io::Result<Self> {
        let inner = Inotify::init()?;
        Ok(Watcher {
            inner,
            buffer: [0; INOTIFY_BUFFER_SIZE],
        })
    }

    /// Watch a directory for newly created entries.
    ///
    /// # Callee responsibilities
    ///
    /// It is the caller's responsibility to ensure that:
    ///
    /// - `path` points to a directory.
    /// - `path` is canonical (symlinks are not dereferenced).
    /// - The inode behind `path` has not already been watched. `inotify`
    ///   merges duplicate watches for the same path, and returns the
    ///   `Descriptor` of the original watch.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to register the watch.
    fn watch_directory(&mut self, path: &Path) -> io::Result<Self::Descriptor> {
        let descriptor = self
            .inner
            .add_watch(path, WatchMask::CREATE | WatchMask::DONT_FOLLOW)?;
        Ok(descriptor)
    }

    /// Watch a file for writes.
    ///
    /// # Callee responsibilities
    ///
    /// As for [`watch_directory`](Self::watch_directory), with `path`
    /// pointing to a file.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when attempting to register the watch.
    fn watch_file(&mut self, path: &Path) -> io::Result<Self::Descriptor> {
        let descriptor = self
            .inner
            .add_watch(path, WatchMask::MODIFY | WatchMask::DONT_FOLLOW)?;
        Ok(descriptor)
    }

    fn unwatch(&mut self, descriptor: Self::Descriptor) -> io::Result<()> {
        self.inner.rm_watch(descriptor)
    }

    fn read_events(&mut self) -> io::Result<Vec<Self::Event>> {
        // `Inotify::init` sets `IN_NONBLOCK`, so an empty queue surfaces as
        // `WouldBlock` rather than a stall. `rm_watch` queues an `IGNORED`
        // event for the removed descriptor; those carry no information the
        // engine wants.
        match self.inner.read_events(&mut self.buffer) {
            Ok(inotify_events) => Ok(inotify_events
                .filter(|event| !event.mask.contains(EventMask::IGNORED))
                .map(Event::from)
                .collect()),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }
}

impl AsRawFd for Watcher {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}
