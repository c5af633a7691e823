//! The two countdown timers.
//!
//! Both decay by exactly one per [`decrement`](racy::Timer::decrement) call;
//! cadence is entirely the host's business. The `atomic` feature selects an
//! `AtomicU8`-backed variant so a host may drive ticks from an interrupt
//! handler; otherwise the plain one is used.

/// Outcome of one decrement tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Still counting down.
    On,
    /// This tick crossed 1 to 0.
    Finished,
    /// Already idle.
    Off,
}

#[cfg(not(feature = "atomic"))]
pub use racy::Timer;

#[cfg(feature = "atomic")]
pub use atomic::Timer;

pub mod racy {
    use super::TimerState;

    #[derive(Debug, Default)]
    pub struct Timer(u8);

    impl Timer {
        pub fn new() -> Self {
            Self(0)
        }

        #[inline]
        pub fn store(&mut self, value: u8) {
            self.0 = value;
        }

        #[inline]
        pub fn load(&self) -> u8 {
            self.0
        }

        #[inline]
        pub fn decrement(&mut self) -> TimerState {
            match self.0 {
                0 => TimerState::Off,
                1 => {
                    self.0 = 0;
                    TimerState::Finished
                }
                _ => {
                    self.0 -= 1;
                    TimerState::On
                }
            }
        }
    }
}

#[cfg(feature = "atomic")]
pub mod atomic {
    use core::sync::atomic::{AtomicU8, Ordering};

    use super::TimerState;

    #[derive(Debug, Default)]
    pub struct Timer(AtomicU8);

    impl Timer {
        pub fn new() -> Self {
            Self(AtomicU8::new(0))
        }

        #[inline]
        pub fn store(&mut self, value: u8) {
            self.0.store(value, Ordering::Release);
        }

        #[inline]
        pub fn load(&self) -> u8 {
            self.0.load(Ordering::Acquire)
        }

        #[inline]
        pub fn decrement(&mut self) -> TimerState {
            let prev = self
                .0
                .fetch_update(Ordering::Release, Ordering::Relaxed, |value| {
                    Some(value.saturating_sub(1))
                });
            match prev {
                Ok(value) | Err(value) => match value {
                    0 => TimerState::Off,
                    1 => TimerState::Finished,
                    _ => TimerState::On,
                },
            }
        }
    }
}
