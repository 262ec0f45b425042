// Detail levels and traversal depth

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Granularity of a blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [DetailLevel::Minimal, DetailLevel::Standard, DetailLevel::Detailed];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Minimal => "minimal",
            DetailLevel::Standard => "standard",
            DetailLevel::Detailed => "detailed",
        }
    }

    /// Closure depth used by method and feature blueprints
    pub fn closure_depth(&self) -> Depth {
        match self {
            DetailLevel::Minimal => Depth::Limited(0),
            DetailLevel::Standard => Depth::Limited(1),
            DetailLevel::Detailed => Depth::Unbounded,
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        DetailLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| {
                Error::other(format!(
                    "Invalid detail level: {}. Valid options are: minimal, standard, detailed",
                    s
                ))
            })
    }
}

/// Traversal bound; `Unbounded` stops only when nothing new is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Limited(usize),
    Unbounded,
}

impl Depth {
    /// True if nodes at `depth` may still be expanded
    pub fn allows_expansion(&self, depth: usize) -> bool {
        match self {
            Depth::Limited(max) => depth < *max,
            Depth::Unbounded => true,
        }
    }
}
