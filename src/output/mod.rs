// Output generation module
//
// Both encoders render the same `BlueprintDocument`, so their ordering and
// content always agree.

pub mod json;
pub mod xml;

pub use json::*;
pub use xml::*;

use crate::blueprint::Blueprint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }

    /// File extension for written blueprints
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Render a blueprint in the given format
pub fn render(blueprint: &Blueprint, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => render_json(blueprint),
        Format::Xml => render_xml(blueprint),
    }
}

/// Render by format name, rejecting anything but `json` and `xml`
pub fn render_as(blueprint: &Blueprint, format: &str) -> Result<Vec<u8>> {
    render(blueprint, format.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintKind;
    use crate::model::{DetailLevel, Element, ElementKind};

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(" xml ".parse::<Format>().unwrap(), Format::Xml);
        let err = "yaml".parse::<Format>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == "yaml"));
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn test_render_as_dispatches() {
        let mut bp = Blueprint::new(BlueprintKind::File, DetailLevel::Minimal);
        bp.insert_element(Element::new("a.py", "foo", ElementKind::Function, 1, 1, "def foo(): pass"));
        assert!(render_as(&bp, "json").unwrap().starts_with(b"{"));
        assert!(render_as(&bp, "xml").unwrap().starts_with(b"<?xml"));
        assert!(matches!(render_as(&bp, "html"), Err(Error::UnsupportedFormat(_))));
    }
}
