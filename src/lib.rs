// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Animated comparison of 2D embedding projections.
//!
//! Framescope is the animation and data core behind an embedding
//! comparison view: several 2D projections ("frames") of the same points
//! are shown as a scatterplot that morphs between frames, with neighbor
//! highlights and preview lines toward a candidate frame.
//!
//! # Key entry points
//!
//! - [`marks::MarkSet`] - the marks and decorations a render loop ticks
//! - [`marks::Attribute`] - one animatable, possibly computed, value
//! - [`data::ColumnarFrame`] - one projection, with a spatial index
//! - [`dataset::Dataset`] - every frame plus preview configuration
//! - [`preview::FramePreview`] - per-point preview intensities between two
//!   frames
//! - [`render::Scatterplot`] - drives a [`render::RenderBackend`] per tick
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Everything runs on one thread, one tick per rendered frame. The caller
//! feeds elapsed milliseconds into [`marks::MarkSet::advance`]; marks
//! advance before the decorations bound to them, so decorations always
//! read settled mark state. Attributes registered as preloadable hand
//! their animation to the backend as `[start, end, start_time, end_time]`
//! segments instead of being stepped on the CPU.

pub mod animation;
pub mod data;
pub mod dataset;
pub mod error;
pub mod marks;
pub mod options;
pub mod preview;
pub mod render;
pub mod util;
pub mod value;

pub use dataset::Dataset;
pub use error::{FramescopeError, Result};
pub use marks::{Mark, MarkSet, PointId};
pub use value::Value;
