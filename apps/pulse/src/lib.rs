//! # pulse
//!
//! The in-process caller around `pulse-core`: loads the engine's inputs from
//! files, computes a pulse, prints it and persists a snapshot.
//!
//! Every boundary failure degrades to a safe default before the engine runs:
//!
//! | Failure | Substitute |
//! |---------|------------|
//! | config | [`PulseConfig::default`](pulse_core::PulseConfig) |
//! | inventory | empty input, every type `missing` |
//! | events | no velocity (`steady`) |
//! | snapshot write | logged, result unaffected |

pub mod cli;
pub mod loader;
pub mod snapshot;
