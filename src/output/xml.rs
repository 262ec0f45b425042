// XML encoding of blueprints
//
// Same logical document as the JSON encoder. Source text goes into CDATA
// blocks verbatim; only attribute values and plain text nodes are escaped.

use crate::blueprint::Blueprint;
use crate::error::Result;
use crate::output::json::BlueprintDocument;

/// Render the blueprint as an XML document
pub fn render_xml(blueprint: &Blueprint) -> Result<Vec<u8>> {
    let document = BlueprintDocument::from(blueprint);
    let mut lines = Vec::new();
    lines.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string());

    let mut root = format!(
        r#"<blueprint type="{}" timestamp="{}" detail-level="{}""#,
        document.blueprint_type,
        escape(&document.generation_time.to_rfc3339()),
        document.detail_level
    );
    if let Some(name) = &document.name {
        root.push_str(&format!(r#" name="{}""#, escape(name)));
    }
    if let Some(version) = document.version {
        root.push_str(&format!(r#" version="{}""#, version));
    }
    root.push('>');
    lines.push(root);

    if let Some(feature) = &document.feature {
        lines.push("  <feature>".to_string());
        for (tag, ids) in [
            ("member", &feature.members),
            ("entry-point", &feature.entry_points),
            ("exit-point", &feature.exit_points),
        ] {
            for id in ids {
                lines.push(format!("    <{}>{}</{}>", tag, escape(id.as_str()), tag));
            }
        }
        lines.push("  </feature>".to_string());
    }

    lines.push("  <files>".to_string());
    for file in &document.files {
        lines.push(format!(
            r#"    <file path="{}" hash="{}">"#,
            escape(&file.path),
            escape(&file.content_hash)
        ));
        for element in &file.elements {
            lines.push(format!(
                r#"      <element name="{}" type="{}" line-start="{}" line-end="{}">"#,
                escape(&element.name),
                element.kind,
                element.line_start,
                element.line_end
            ));
            lines.push(format!("        <source>{}</source>", cdata(&element.source)));
            lines.push("      </element>".to_string());
        }
        lines.push("    </file>".to_string());
    }
    lines.push("  </files>".to_string());

    lines.push("  <relationships>".to_string());
    for relationship in &document.relationships {
        lines.push(format!(r#"    <relationship type="{}">"#, relationship.kind));
        lines.push(format!("      <source>{}</source>", escape(relationship.source.as_str())));
        lines.push(format!("      <target>{}</target>", escape(relationship.target.as_str())));
        lines.push("    </relationship>".to_string());
    }
    lines.push("  </relationships>".to_string());
    lines.push("</blueprint>".to_string());

    let mut xml = lines.join("\n");
    xml.push('\n');
    Ok(xml.into_bytes())
}

/// Escape reserved characters for attribute values and text nodes
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Wrap text in CDATA; a literal `]]>` is split across two sections
fn cdata(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
