//! Hardware Abstraction Layer (HAL) for codec accessory detection
//!
//! This crate provides trait-based abstractions for every resource the jack
//! detection engine touches, enabling development and testing without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Board glue (firmware: IRQ wiring, I2C bus, regulators)
//!         ↓
//! Detection engine (jack-detect crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstractions
//!
//! - [`RegisterMap`] - codec register read / write / update
//! - [`Regulator`] / [`MicBias`] - MICVDD supply and microphone bias
//! - [`WorkQueue`] - deferred work (debounce and timeout timers)
//! - [`AccessorySink`] - headset state, key and impedance reports
//!
//! GPIO outputs and delays use `embedded-hal` 1.0 traits directly.
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module (for testing)
//! - `defmt`: Enable defmt derives
//! - `serde`: Serde derives on configuration-facing types
//!
//! # Example
//!
//! ```
//! use platform::RegisterMap;
//!
//! struct OneReg(u32);
//!
//! impl RegisterMap for OneReg {
//!     type Error = core::convert::Infallible;
//!
//!     fn read(&mut self, _reg: u32) -> Result<u32, Self::Error> {
//!         Ok(self.0)
//!     }
//!
//!     fn write(&mut self, _reg: u32, val: u32) -> Result<(), Self::Error> {
//!         self.0 = val;
//!         Ok(())
//!     }
//! }
//!
//! let mut map = OneReg(0x00F0);
//! assert_eq!(map.update_bits_check(0x2A3, 0x0001, 0x0001), Ok(true));
//! assert_eq!(map.read(0x2A3), Ok(0x00F1));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod accessory;
pub mod input;
pub mod mocks;
pub mod power;
pub mod regmap;
pub mod work;

// Re-export main traits
pub use accessory::{AccessorySink, HeadsetState};
pub use input::Key;
pub use power::{MicBias, MicBiasSource, Regulator};
pub use regmap::{I2cRegmap, RegisterMap, RegmapError};
pub use work::WorkQueue;
