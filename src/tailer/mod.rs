// src/tailer/mod.rs

//! The rotation-aware tailing engine.
//!
//! An [`Engine`] owns a set of tailed log files and the event loop that
//! keeps them flowing: it multiplexes a [`watcher`](self::watcher) and an
//! interval timer with `poll(2)`, splits newly appended bytes into lines for
//! each source's [`Collector`], and emits one reporting cycle per timer
//! tick.
//!
//! The subtle part is rotation. An external log writer replaces the watched
//! file with a fresh, empty file under the same name, and the final writes
//! to the old file can share a notification batch with the creation of the
//! new one, in either order. The engine therefore never switches on sight of
//! a create event: it first drains everything readable from the old
//! descriptor, and only then removes the old watch, closes the old
//! descriptor and attaches to the replacement. Lines are neither lost nor
//! processed twice across the switch.

mod timer;
pub mod watcher;

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use log::{debug, error, trace, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};

use crate::collector::Collector;

use self::timer::{io_error, IntervalTimer};
use self::watcher::{Event, Watcher};

const POLL_WATCHER: usize = 0;
const POLL_TIMER: usize = 1;

/// One monitored log stream.
struct Source<W: Watcher> {
    /// Canonical path of the tailed file.
    path: PathBuf,

    /// The leaf name of `path` (conventionally `current`). A create event
    /// for this name in the containing directory signals a rotation.
    file_name: OsString,

    /// Watch on the containing directory. Installed once, never replaced.
    directory_descriptor: W::Descriptor,

    /// The current incarnation of the file, or `None` after a failed
    /// post-rotation reopen. The watch and the reader inside are replaced
    /// together, never separately.
    live: Option<LiveFile<W::Descriptor>>,

    collector: Box<dyn Collector>,
}

/// An open incarnation of a tailed file.
struct LiveFile<D> {
    descriptor: D,
    reader: BufReader<File>,

    /// Carry-over buffer for a trailing line the writer hasn't finished.
    /// Completed by the next drain, discarded on rotation.
    line_buf: String,
}

/// The tailing engine: sources, their watches, and the reporting sink.
pub struct Engine<W: Watcher> {
    watcher: W,
    sources: Vec<Source<W>>,
    descriptors: HashMap<W::Descriptor, usize>,
    out: Box<dyn Write>,
}

impl<W: Watcher> Engine<W> {
    /// Construct an engine that reports on `out`.
    pub fn new(watcher: W, out: Box<dyn Write>) -> Self {
        Self {
            watcher,
            sources: Vec::new(),
            descriptors: HashMap::new(),
            out,
        }
    }

    /// Start tailing the log file at `path`, feeding `collector`.
    ///
    /// The collector's schema is emitted immediately; the initial read
    /// position is the end of the file (pre-existing content is ignored).
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from canonicalizing or opening the file,
    /// installing the watches, or writing the schema. Failures here are
    /// setup failures: callers are expected to treat them as fatal.
    pub fn add_source(&mut self, path: &Path, collector: Box<dyn Collector>) -> io::Result<()> {
        let path = fs::canonicalize(path)?;
        let directory = path
            .parent()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "log path has no parent directory")
            })?
            .to_path_buf();
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?
            .to_os_string();

        debug!(
            "watching {} for re-creations of {:?}",
            directory.display(),
            file_name
        );
        let directory_descriptor = self.watcher.watch_directory(&directory)?;

        collector.print_header(&mut *self.out)?;
        self.out.flush()?;

        let index = self.sources.len();
        self.descriptors.insert(directory_descriptor.clone(), index);
        self.sources.push(Source {
            path,
            file_name,
            directory_descriptor,
            live: None,
            collector,
        });

        self.attach_file(index, true)
    }

    /// Drain the notification queue and dispatch its consequences.
    ///
    /// All readable bytes of every touched source are processed before any
    /// rotation switch: the final writes to a rotated-away file and the
    /// creation of its replacement can arrive in one batch, in either order.
    fn handle_notifications(&mut self) -> io::Result<()> {
        let mut touched = Vec::new();
        let mut rotating = Vec::new();

        loop {
            let events = self.watcher.read_events()?;
            if events.is_empty() {
                break;
            }

            for event in events {
                trace!("received watcher event: {:?}", event);

                let index = match self.descriptors.get(event.descriptor()) {
                    Some(&index) => index,
                    None => {
                        // Stale event for a watch a rotation just removed.
                        trace!("event for unregistered descriptor: {:?}", event);
                        continue;
                    }
                };

                let source = &self.sources[index];
                if *event.descriptor() == source.directory_descriptor {
                    if event.name() == Some(source.file_name.as_os_str()) {
                        debug!("{} was recreated, scheduling reopen", source.path.display());
                        if !rotating.contains(&index) {
                            rotating.push(index);
                        }
                    } else {
                        // Some other entry appeared in the directory.
                        continue;
                    }
                }
                if !touched.contains(&index) {
                    touched.push(index);
                }
            }
        }

        for &index in &touched {
            self.drain_source(index)?;
        }

        for &index in &rotating {
            if let Err(error) = self.rotate_source(index) {
                error!(
                    "cannot reopen {}: {} (source disabled until the next rotation)",
                    self.sources[index].path.display(),
                    error
                );
            }
        }

        Ok(())
    }

    /// Read and process all currently available complete lines of a source.
    ///
    /// A trailing partial line stays in the carry-over buffer.
    fn drain_source(&mut self, index: usize) -> io::Result<()> {
        let Source { live, collector, .. } = &mut self.sources[index];
        let live = match live {
            Some(live) => live,
            None => return Ok(()),
        };

        loop {
            match live.reader.read_line(&mut live.line_buf) {
                Ok(0) => break,
                Ok(_) => {
                    if live.line_buf.ends_with('\n') {
                        live.line_buf.pop();
                        collector.process(&live.line_buf);
                        live.line_buf.clear();
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    /// Switch a source to the freshly created incarnation of its file.
    ///
    /// Callers must have drained the old descriptor first. On failure the
    /// source is left without a live file; a later rotation event retries
    /// the attach.
    fn rotate_source(&mut self, index: usize) -> io::Result<()> {
        debug!("reopening {}", self.sources[index].path.display());

        if let Some(live) = self.sources[index].live.take() {
            self.descriptors.remove(&live.descriptor);
            if let Err(error) = self.watcher.unwatch(live.descriptor) {
                // The watch is already gone if the old file was unlinked.
                warn!("cannot remove stale watch: {}", error);
            }
            // Dropping the rest of `live` closes the old descriptor.
        }

        self.attach_file(index, false)?;

        // The writer may have appended before the new watch existed.
        self.drain_source(index)
    }

    /// Install a file watch and open a reader for a source's path.
    ///
    /// `tail` positions the reader at end-of-file (initial attach); a
    /// post-rotation attach reads from offset zero.
    fn attach_file(&mut self, index: usize, tail: bool) -> io::Result<()> {
        let path = self.sources[index].path.clone();
        let descriptor = self.watcher.watch_file(&path)?;

        let reader = File::open(&path).and_then(|file| {
            let mut reader = BufReader::new(file);
            if tail {
                reader.seek(io::SeekFrom::End(0))?;
            }
            Ok(reader)
        });
        let reader = match reader {
            Ok(reader) => reader,
            Err(error) => {
                // Never leave a watch behind without a matching descriptor.
                let _ = self.watcher.unwatch(descriptor);
                return Err(error);
            }
        };

        self.descriptors.insert(descriptor.clone(), index);
        self.sources[index].live = Some(LiveFile {
            descriptor,
            reader,
            line_buf: String::new(),
        });
        Ok(())
    }

    /// Emit one reporting cycle for every source, then reset their state.
    fn report(&mut self, timestamp: u64) -> io::Result<()> {
        for source in &mut self.sources {
            source.collector.postprocess();
            source.collector.print(&mut *self.out, timestamp)?;
            source.collector.clear();
        }
        self.out.flush()
    }
}

impl<W: Watcher + AsRawFd> Engine<W> {
    /// Run the event loop until `running` is cleared.
    ///
    /// The loop suspends in `poll(2)` over the watcher fd and a `timerfd`
    /// armed with `interval`; everything between wakeups is synchronous. A
    /// poll interrupted by a signal is retried (the loop condition re-checks
    /// `running`), so only the explicitly handled termination signals end
    /// the loop.
    ///
    /// # Errors
    ///
    /// Propagates timer setup failures and any `io::Error` raised while
    /// polling, draining notifications or reporting.
    pub fn run(&mut self, interval: Duration, running: &AtomicBool) -> io::Result<()> {
        let timer = IntervalTimer::new(interval)?;
        let mut poll_fds = [
            PollFd::new(self.watcher.as_raw_fd(), PollFlags::POLLIN),
            PollFd::new(timer.as_raw_fd(), PollFlags::POLLIN),
        ];

        while running.load(Ordering::Relaxed) {
            match poll(&mut poll_fds, -1) {
                Ok(_) => {}
                Err(error) if error.as_errno() == Some(Errno::EINTR) => continue,
                Err(error) => return Err(io_error(error)),
            }

            if readable(&poll_fds[POLL_WATCHER]) {
                self.handle_notifications()?;
            }
            if readable(&poll_fds[POLL_TIMER]) {
                let expirations = timer.take_expirations()?;
                trace!("timer fired ({} expirations)", expirations);
                self.report(unix_timestamp())?;
            }
        }

        debug!("stop requested, shutting down");
        Ok(())
    }
}

fn readable(poll_fd: &PollFd) -> bool {
    poll_fd
        .revents()
        .map_or(false, |revents| revents.contains(PollFlags::POLLIN))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
