//! Plain data shared by the marker manager, the map and the application.
//! Nothing in here does I/O.

pub mod marker;
pub mod optimization;
pub mod vocabulary;

pub use marker::{Coords, Marker, MarkerKind};
pub use optimization::OptimizationResult;
