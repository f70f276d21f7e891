// src/tailer/timer.rs
//! A periodic timer that can be multiplexed with other event sources.

use std::convert::TryFrom;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::time::{TimeSpec, TimeValLike};
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use nix::unistd;

/// Convert a `nix` error into the `io::Error` the rest of the crate speaks.
pub(crate) fn io_error(error: nix::Error) -> io::Error {
    match error.as_errno() {
        Some(errno) => io::Error::from_raw_os_error(errno as i32),
        None => io::Error::new(io::ErrorKind::Other, error),
    }
}

/// A non-blocking `timerfd` armed with a fixed interval.
///
/// The timer becomes readable whenever at least one interval has elapsed;
/// reading it returns the number of expirations since the last read. The fd
/// is created non-blocking and close-on-exec, and is intended to sit in the
/// engine's `poll` set next to the watcher fd.
pub(crate) struct IntervalTimer {
    inner: TimerFd,
}

impl IntervalTimer {
    /// Create a timer and arm it with `interval`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero or out-of-range interval (a zero
    /// `timerfd` interval disarms the timer, which would silently stop all
    /// reporting), and propagates timer creation or arming failures.
    pub(crate) fn new(interval: Duration) -> io::Result<Self> {
        if interval.as_nanos() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reporting interval must be non-zero",
            ));
        }
        let nanoseconds = i64::try_from(interval.as_nanos()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "reporting interval too large")
        })?;

        let mut inner = TimerFd::new(
            ClockId::CLOCK_REALTIME,
            TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC,
        )
        .map_err(io_error)?;
        inner
            .set(
                Expiration::Interval(TimeSpec::nanoseconds(nanoseconds)),
                TimerSetTimeFlags::empty(),
            )
            .map_err(io_error)?;

        Ok(Self { inner })
    }

    /// Drain the timer, returning how many intervals have elapsed since the
    /// last drain.
    ///
    /// Returns 0 if the timer has not fired. Never blocks.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` caused when reading the timer fd.
    pub(crate) fn take_expirations(&self) -> io::Result<u64> {
        let mut expirations = 0;
        loop {
            let mut buffer = [0_u8; 8];
            match unistd::read(self.inner.as_raw_fd(), &mut buffer) {
                Ok(8) => expirations += u64::from_ne_bytes(buffer),
                Ok(_) => break,
                Err(error) => match error.as_errno() {
                    Some(Errno::EAGAIN) => break,
                    Some(Errno::EINTR) => continue,
                    _ => return Err(io_error(error)),
                },
            }
        }
        Ok(expirations)
    }
}

impl AsRawFd for IntervalTimer {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}
