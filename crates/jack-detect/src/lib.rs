//! Headset jack detection for Arizona-class audio codecs
//!
//! Watches the codec's jack detect, mic detect and headphone detect blocks and
//! turns their interrupts into accessory reports: what is plugged in, whether
//! it has a microphone, the headphone load and headset button edges.
//!
//! # Architecture
//!
//! ```text
//! codec IRQs ──► JackDetect (controller) ──► Session ──► DetectionState
//!                     │                         │            │
//!                     │                         ▼            ▼
//!                     │               classifier / reader / tuning
//!                     ▼
//!            Board: RegisterMap, GPIOs, MICVDD, MICBIAS, WorkQueue, AccessorySink
//! ```
//!
//! - [`JackDetect`] serialises every entry point behind one lock.
//! - [`DetectionState`] is the detection sequence: moisture check, accessory
//!   identification, microphone detection, headphone measurement and button
//!   monitoring.
//! - [`classifier`] and [`reader`] convert raw register values into
//!   impedances and mic levels; [`tuning`] picks the output patch for a load.
//! - [`runner`] is an optional embassy task driving the controller from an
//!   interrupt channel and its own timers.
//!
//! # Features
//!
//! - `defmt`: log through defmt and derive `defmt::Format`
//! - `tracing`: log through tracing (host builds)
//! - `serde`: serde derives on [`JackConfig`] and friends

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
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![allow(clippy::doc_markdown)] // register and codec names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod board;
pub mod buttons;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod levels;
pub mod reader;
pub mod registers;
pub mod runner;
mod session;
pub mod state;
pub mod tuning;

pub use board::{Board, Peripherals, Work};
pub use classifier::{MicBucket, MicdStatus};
pub use config::{Codec, CodecKind, HpdetChannel, JackConfig, MicdMode, MicdRange};
pub use controller::JackDetect;
pub use error::{ConfigError, JackError};
pub use runner::{run, try_send_irq, JackIrq, TimerQueue};
pub use state::{DetectionState, Outcome, Reading};
pub use tuning::ImpedanceLevel;
