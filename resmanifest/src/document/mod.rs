// Document forest - ordered element/text nodes built from a canonical tree

pub mod xml;

use crate::error::ManifestError;
use crate::tree::{CanonicalNode, Instance};
use regex::Regex;
use std::sync::OnceLock;

/// A node of the ordered document forest handed to the serializer.
///
/// Text only ever appears as the sole child of an element named after the
/// field it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    Element {
        name: String,
        children: Vec<DocumentNode>,
    },
    Text(String),
}

impl DocumentNode {
    pub fn element(name: impl Into<String>, children: Vec<DocumentNode>) -> Self {
        DocumentNode::Element {
            name: name.into(),
            children,
        }
    }

    /// An element holding a single text child.
    pub fn text_element(name: impl Into<String>, value: impl Into<String>) -> Self {
        DocumentNode::element(name, vec![DocumentNode::Text(value.into())])
    }
}

/// Result of converting a canonical tree. `forest` is complete when `error`
/// is `None`, and holds everything converted before and after the first
/// offending field otherwise.
#[derive(Debug)]
pub struct Conversion {
    pub forest: Vec<DocumentNode>,
    pub error: Option<ManifestError>,
}

impl Conversion {
    pub fn into_result(self) -> crate::Result<Vec<DocumentNode>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.forest),
        }
    }
}

/// Convert a canonical tree into a document forest.
///
/// Fields are visited in the tree's own order and instances in list order.
/// With `root` set, the forest is wrapped in one element of that name.
///
/// A field whose name cannot be written is skipped, and conversion carries
/// on with the fields after it, so the returned forest is everything except
/// the offending fields rather than only what was built before the first
/// one. `error` holds the first such field.
pub fn to_document(tree: &CanonicalNode, root: Option<&str>) -> Conversion {
    let mut error = None;
    let children = convert_fields(tree, "", &mut error);
    let forest = match root {
        Some(tag) => vec![DocumentNode::element(tag, children)],
        None => children,
    };
    Conversion { forest, error }
}

fn convert_fields(
    node: &CanonicalNode,
    parent: &str,
    error: &mut Option<ManifestError>,
) -> Vec<DocumentNode> {
    let mut out = Vec::new();
    for field in node.fields() {
        let path = if parent.is_empty() {
            field.name.clone()
        } else {
            format!("{parent}/{}", field.name)
        };

        if let Err(e) = check_field_name(&field.name, &path) {
            log::warn!("Skipping field during conversion: {e}");
            error.get_or_insert(e);
            continue;
        }

        for instance in &field.instances {
            match instance {
                Instance::Leaf(value) => {
                    out.push(DocumentNode::text_element(&field.name, value.as_str()));
                }
                Instance::Node(inner) => {
                    let children = convert_fields(inner, &path, error);
                    out.push(DocumentNode::element(&field.name, children));
                }
            }
        }
    }
    out
}

fn positional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid regex"))
}

fn element_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // XML NameStartChar followed by NameChar, Unicode letters included.
    RE.get_or_init(|| {
        Regex::new(r"^[\p{L}\p{Nl}_:][\p{L}\p{Nl}\p{M}\p{Nd}_:.\-·]*$").expect("valid regex")
    })
}

/// Whether `name` can be written as an element tag.
pub fn is_valid_name(name: &str) -> bool {
    element_name_re().is_match(name)
}

fn check_field_name(name: &str, path: &str) -> crate::Result<()> {
    if positional_re().is_match(name) {
        return Err(ManifestError::Corruption {
            field: path.to_string(),
            reason: "positional index where a named field is expected".into(),
        });
    }
    if !is_valid_name(name) {
        return Err(ManifestError::Corruption {
            field: path.to_string(),
            reason: format!("'{name}' is not a valid element name"),
        });
    }
    Ok(())
}
