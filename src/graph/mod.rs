// Relationship map and graph queries

pub mod closure;
pub mod map;
pub mod queries;

pub use closure::*;
pub use map::*;
