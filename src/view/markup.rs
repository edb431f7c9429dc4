//! Serializable markup description of an in-memory element tree.
//!
//! ```toml
//! [root]
//! tag = "form"
//!
//! [[root.children]]
//! tag = "section"
//! classes = ["stepable"]
//!
//! [[root.children.children]]
//! tag = "button"
//! id = "to-last"
//! classes = ["stepable-trigger"]
//! attributes = { "data-step" = "2" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::memory::{Document, Element};

/// Errors raised while loading markup
#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported markup format: {0}")]
    UnsupportedFormat(String),
}

/// Supported markup file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupFormat {
    Toml,
    Json,
    Yaml,
}

impl MarkupFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, MarkupError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(MarkupFormat::Toml),
            "json" => Ok(MarkupFormat::Json),
            "yaml" | "yml" => Ok(MarkupFormat::Yaml),
            _ => Err(MarkupError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One element in a markup description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkupNode {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MarkupNode>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl MarkupNode {
    /// Build the element subtree described by this node
    pub fn build(&self) -> Element {
        let mut element = Element::new(&self.tag);
        if let Some(id) = &self.id {
            element = element.with_id(id);
        }
        for class in &self.classes {
            element.add_class(class);
        }
        for (name, value) in &self.attributes {
            element.set_attribute(name, value);
        }
        self.children
            .iter()
            .fold(element, |element, child| element.with_child(child.build()))
    }
}

/// A complete markup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    pub root: MarkupNode,
}

impl Markup {
    pub fn parse(source: &str, format: MarkupFormat) -> Result<Self, MarkupError> {
        Ok(match format {
            MarkupFormat::Toml => toml::from_str(source)?,
            MarkupFormat::Json => serde_json::from_str(source)?,
            MarkupFormat::Yaml => serde_yaml::from_str(source)?,
        })
    }

    /// Load markup from a file, choosing the format by extension
    pub fn from_path(path: &Path) -> Result<Self, MarkupError> {
        let format = MarkupFormat::from_path(path)?;
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, format)
    }

    pub fn build(&self) -> Document {
        Document::new(self.root.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOML_MARKUP: &str = r#"
[root]
tag = "form"
id = "wizard"

[[root.children]]
tag = "section"
classes = ["stepable"]

[[root.children.children]]
tag = "button"
id = "jump"
classes = ["stepable-trigger"]
attributes = { "data-step" = "2" }

[[root.children]]
tag = "section"
classes = ["stepable"]
"#;

    #[test]
    fn test_parse_toml_and_build() {
        let markup = Markup::parse(TOML_MARKUP, MarkupFormat::Toml).unwrap();
        let doc = markup.build();
        assert_eq!(doc.root().id().as_deref(), Some("wizard"));
        assert_eq!(doc.query_all(".stepable").unwrap().len(), 2);
        let jump = doc.query("#jump").unwrap().unwrap();
        assert_eq!(jump.attribute("data-step").as_deref(), Some("2"));
        assert_eq!(jump.parent().unwrap().tag(), "section");
    }

    #[test]
    fn test_parse_json_defaults_tag_to_div() {
        let markup = Markup::parse(
            r#"{"root": {"children": [{"classes": ["stepable"]}]}}"#,
            MarkupFormat::Json,
        )
        .unwrap();
        assert_eq!(markup.root.tag, "div");
        assert_eq!(markup.root.children[0].tag, "div");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "root:\n  tag: main\n  children:\n    - tag: section\n      classes: [stepable]\n";
        let markup = Markup::parse(yaml, MarkupFormat::Yaml).unwrap();
        assert_eq!(markup.build().query_all("section.stepable").unwrap().len(), 1);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            MarkupFormat::from_path(Path::new("a/b.TOML")).unwrap(),
            MarkupFormat::Toml
        );
        assert_eq!(
            MarkupFormat::from_path(Path::new("w.yml")).unwrap(),
            MarkupFormat::Yaml
        );
        assert!(matches!(
            MarkupFormat::from_path(Path::new("w.html")),
            Err(MarkupError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(TOML_MARKUP.as_bytes()).unwrap();
        let markup = Markup::from_path(file.path()).unwrap();
        assert_eq!(markup.root.children.len(), 2);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Markup::from_path(file.path()),
            Err(MarkupError::Json(_))
        ));
    }
}
