//! Aggregates internal I/O readiness sources into one externally pollable descriptor (§3
//! `MultiplexerSet`, §4.1).
//!
//! Backed by [`mio::Poll`], which already abstracts the two facility options named in §4.1
//! (epoll-with-timerfd on Linux, kqueue's native `EVFILT_TIMER` on the BSDs/macOS) behind one
//! portable API; platforms where `mio` has no backend fail fast with
//! [`SetupError::UnsupportedPlatform`](crate::error::SetupError::UnsupportedPlatform).

// std
use std::{
	os::fd::{AsRawFd, RawFd},
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread,
};
// self
use crate::{_prelude::*, error::SetupError};

/// Readiness mode requested for a registered socket (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
	/// Wake when the socket becomes readable.
	Read,
	/// Wake when the socket becomes writable.
	Write,
	/// Wake on either readability or writability.
	ReadWrite,
	/// Deregister the socket.
	Remove,
}

const TIMER_TOKEN: mio::Token = mio::Token(usize::MAX);

/// Aggregated readiness multiplexer exposed to the host's event loop (§4.1).
pub struct Multiplexer {
	poll: mio::Poll,
	events: mio::Events,
	registered: HashSet<RawFd>,
	timer: TimerHandle,
}
impl Multiplexer {
	/// Creates a new multiplexer with its timer disarmed.
	pub fn new() -> Result<Self, SetupError> {
		let poll = mio::Poll::new().map_err(SetupError::Multiplexer)?;
		let waker = mio::Waker::new(poll.registry(), TIMER_TOKEN).map_err(SetupError::Multiplexer)?;
		let timer = TimerHandle::new(waker);

		Ok(Self { poll, events: mio::Events::with_capacity(16), registered: HashSet::new(), timer })
	}

	/// Registers (or upgrades, or removes) a socket with the given readiness mode.
	///
	/// Adding an already-present socket upgrades its mode; removing an unregistered socket is a
	/// no-op (§4.1).
	pub fn register(&mut self, fd: RawFd, mode: Mode) -> Result<(), SetupError> {
		let mut source = mio::unix::SourceFd(&fd);

		match mode {
			Mode::Remove => {
				if self.registered.remove(&fd) {
					let _ = self.poll.registry().deregister(&mut source);
				}
			},
			_ => {
				let interest = match mode {
					Mode::Read => mio::Interest::READABLE,
					Mode::Write => mio::Interest::WRITABLE,
					Mode::ReadWrite => mio::Interest::READABLE | mio::Interest::WRITABLE,
					Mode::Remove => unreachable!(),
				};

				if self.registered.insert(fd) {
					self.poll
						.registry()
						.register(&mut source, mio::Token(fd as usize), interest)
						.map_err(SetupError::Multiplexer)?;
				} else {
					self.poll
						.registry()
						.reregister(&mut source, mio::Token(fd as usize), interest)
						.map_err(SetupError::Multiplexer)?;
				}
			},
		}

		Ok(())
	}

	/// Arms (or disarms) the timer.
	///
	/// `None` disarms it; `Some(Duration::ZERO)` fires as soon as possible (§4.1's "1 ns expiry"
	/// is implemented here as an immediate background wake rather than a literal 1 ns sleep,
	/// since `thread::sleep(Duration::ZERO)` already yields control back promptly).
	pub fn set_timer(&mut self, delay: Option<Duration>) {
		self.timer.arm(delay);
	}

	/// Blocks until the aggregated descriptor is ready or `timeout` elapses.
	pub fn wait(&mut self, timeout: Option<Duration>) -> Result<(), SetupError> {
		self.poll.poll(&mut self.events, timeout).map_err(SetupError::Multiplexer)?;

		Ok(())
	}

	/// Returns `true` if the most recent [`Multiplexer::wait`] observed the timer fire.
	pub fn timer_fired(&self) -> bool {
		self.events.iter().any(|e| e.token() == TIMER_TOKEN)
	}
}
impl AsRawFd for Multiplexer {
	fn as_raw_fd(&self) -> RawFd {
		self.poll.as_raw_fd()
	}
}
impl Drop for Multiplexer {
	fn drop(&mut self) {
		self.timer.cancel();
	}
}

/// Background-thread timer that wakes the multiplexer's `mio::Waker` after a delay.
///
/// A generation counter distinguishes a freshly armed timer from a stale one whose delay has
/// already elapsed, so re-arming before expiry never produces a phantom wake.
struct TimerHandle {
	waker: Arc<mio::Waker>,
	generation: Arc<AtomicU64>,
}
impl TimerHandle {
	fn new(waker: mio::Waker) -> Self {
		Self { waker: Arc::new(waker), generation: Arc::new(AtomicU64::new(0)) }
	}

	fn arm(&mut self, delay: Option<Duration>) {
		let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

		let Some(delay) = delay else { return };

		let waker = Arc::clone(&self.waker);
		let generation = Arc::clone(&self.generation);

		thread::spawn(move || {
			thread::sleep(delay);

			if generation.load(Ordering::SeqCst) == my_generation {
				let _ = waker.wake();
			}
		});
	}

	fn cancel(&mut self) {
		self.generation.fetch_add(1, Ordering::SeqCst);
	}
}
