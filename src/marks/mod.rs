//! Animatable marks, their decorations, and the set that drives them.

pub mod attribute;
pub mod decoration;
pub mod mark;
pub mod mark_set;
pub mod star_graph;
pub mod transition;

pub use attribute::{Attribute, Preload, Source, COMPLETION_EPSILON_MS};
pub use decoration::{
    follow, Decoration, DecorationAttribute, DecorationKind, Lookup, MarkLookup,
};
pub use mark::{Mark, MarkAttribute, PointId};
pub use mark_set::{DecorationId, MarkSet, MarkTable};
pub use star_graph::{StarGraph, StarGraphHighlighter};
pub use transition::{move_to_frame, show_preview};
