//! Want graph construction, connected components, and cycle enumeration.

pub mod components;
pub mod cycles;
pub mod want_graph;
