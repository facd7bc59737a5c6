//! JSON document-tree renderer
//!
//! Produces `{"type": "document", "children": [...]}` where each child is the
//! serde form of a [`DocumentNode`]. Block text is kept verbatim; inline
//! markup is not interpreted on this path.

use serde::Serialize;
use serde_json::Value;

use crate::converter::ConversionContext;
use crate::document::DocumentNode;
use crate::error::ConversionError;

/// Discriminant of the tree root
pub const DOCUMENT_TYPE: &str = "document";

#[derive(Serialize)]
struct DocumentTree<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    children: &'a [DocumentNode],
}

/// Renders document nodes as a typed JSON tree
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeRenderer;

impl TreeRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Build the tree as a JSON value
    ///
    /// # Examples
    ///
    /// ```rust
    /// use markdown_format_converter::parser::parse_document;
    /// use markdown_format_converter::tree_renderer::TreeRenderer;
    ///
    /// let tree = TreeRenderer::new().to_value(&parse_document("# Hi")).unwrap();
    /// assert_eq!(tree["type"], "document");
    /// assert_eq!(tree["children"][0]["type"], "heading");
    /// assert_eq!(tree["children"][0]["level"], 1);
    /// ```
    pub fn to_value(&self, nodes: &[DocumentNode]) -> Result<Value, ConversionError> {
        Ok(serde_json::to_value(DocumentTree {
            kind: DOCUMENT_TYPE,
            children: nodes,
        })?)
    }

    /// Build the tree with cooperative timeout checks
    pub fn to_value_with_context(
        &self,
        nodes: &[DocumentNode],
        ctx: &mut ConversionContext,
    ) -> Result<Value, ConversionError> {
        let mut children = Vec::with_capacity(nodes.len());
        for node in nodes {
            ctx.increment_and_check()?;
            children.push(serde_json::to_value(node)?);
        }

        let mut tree = serde_json::Map::new();
        tree.insert("type".to_string(), Value::from(DOCUMENT_TYPE));
        tree.insert("children".to_string(), Value::Array(children));
        Ok(Value::Object(tree))
    }

    /// Serialize the tree, indented with two spaces when `pretty` is set
    pub fn render(&self, nodes: &[DocumentNode], pretty: bool) -> Result<String, ConversionError> {
        let tree = DocumentTree {
            kind: DOCUMENT_TYPE,
            children: nodes,
        };
        let json = if pretty {
            serde_json::to_string_pretty(&tree)?
        } else {
            serde_json::to_string(&tree)?
        };
        Ok(json)
    }
}
