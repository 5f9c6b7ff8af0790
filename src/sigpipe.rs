//! Masks `SIGPIPE` for the duration of a `poll()` call, mirroring
//! `pq_block_sigpipe`/`pq_reset_sigpipe` (§5 "Signal safety", §10.5).
//!
//! Acquired at the top of [`crate::flow::FlowContext::poll`] and released via [`Drop`], so the
//! prior signal mask is always restored even if a step panics or returns early.

// std
use std::mem::MaybeUninit;

/// RAII guard masking `SIGPIPE` on the calling thread.
///
/// Restores the thread's prior signal mask on drop, and only consumes a now-pending `SIGPIPE` if
/// it was not already pending before this guard was acquired (so a signal the host itself was
/// expecting to observe is never silently eaten).
pub struct SigpipeGuard {
	prior_mask: libc::sigset_t,
	was_pending: bool,
}
impl SigpipeGuard {
	/// Blocks `SIGPIPE` on the calling thread, recording whether it was already pending.
	pub fn block() -> Self {
		unsafe {
			let mut block_set = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();

			libc::sigemptyset(&mut block_set);
			libc::sigaddset(&mut block_set, libc::SIGPIPE);

			let mut prior_mask = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();

			libc::pthread_sigmask(libc::SIG_BLOCK, &block_set, &mut prior_mask);

			let mut pending = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();

			libc::sigpending(&mut pending);

			let was_pending = libc::sigismember(&pending, libc::SIGPIPE) == 1;

			Self { prior_mask, was_pending }
		}
	}
}
impl Drop for SigpipeGuard {
	fn drop(&mut self) {
		unsafe {
			if !self.was_pending {
				let mut pending = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();

				libc::sigpending(&mut pending);

				if libc::sigismember(&pending, libc::SIGPIPE) == 1 {
					let mut consume_set = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();

					libc::sigemptyset(&mut consume_set);
					libc::sigaddset(&mut consume_set, libc::SIGPIPE);

					let mut info = MaybeUninit::<libc::siginfo_t>::zeroed().assume_init();
					let zero_timeout =
						libc::timespec { tv_sec: 0, tv_nsec: 0 };

					libc::sigtimedwait(&consume_set, &mut info, &zero_timeout);
				}
			}

			libc::pthread_sigmask(libc::SIG_SETMASK, &self.prior_mask, std::ptr::null_mut());
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn block_and_restore_does_not_panic() {
		let guard = SigpipeGuard::block();

		drop(guard);
	}
}
