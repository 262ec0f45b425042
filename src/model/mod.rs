// Element & relationship model
//
// Canonical in-memory records for code entities and the typed edges between
// them, plus the raw extraction shape they are normalized from.

pub mod detail;
pub mod element;
pub mod extraction;
pub mod relationship;

pub use detail::*;
pub use element::*;
pub use extraction::*;
pub use relationship::*;
