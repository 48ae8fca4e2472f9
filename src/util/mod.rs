//! Shared utilities.

/// Tick cadence and smoothed FPS.
pub mod frame_timing;

pub use frame_timing::FrameTiming;
