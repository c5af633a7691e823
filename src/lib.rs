//! A `no_std` CHIP-8 virtual machine.
//!
//! The interpreter core is platform-agnostic: everything it needs from the
//! outside world (keypad state, a buzzer, random bytes) goes through the
//! [`Context`] trait, and the host drives it with two clocks of its own
//! choosing, [`Plum8::tick_chip`] per instruction and [`Plum8::tick_timers`]
//! at the 60 Hz timer cadence.
//!
//! ```ignore
//! let mut chip = Builder::new()
//!     .with_context(ctx)
//!     .with_program(include_bytes!("rom.ch8"))
//!     .build()?;
//!
//! loop {
//!     match chip.tick_chip() {
//!         Ok(()) | Err(nb::Error::WouldBlock) => {}
//!         Err(nb::Error::Other(err)) => break,
//!     }
//!     if chip.frame_updated() {
//!         present(chip.frame().as_raw());
//!         chip.clear_frame_update();
//!     }
//! }
//! ```

#![no_std]

pub mod builder;
pub mod context;
pub mod error;
pub mod font;
pub mod frame;
pub mod opcode;
pub mod plum;
pub mod timer;

pub use builder::Builder;
pub use context::Context;
pub use error::Error;
pub use frame::{Frame, FrameView, HEIGHT, WIDTH};
pub use opcode::OpCode;
pub use plum::{Plum8, ShiftSource, PROG_CAPACITY};

#[cfg(feature = "embedded-graphics")]
pub use embedded_graphics;
