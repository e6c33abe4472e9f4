//! JSON documents for saving and restoring scene graphs.
//!
//! A document node is `{"attrs": {...}, "className": "...", "children": [...]}`.
//! Containers always carry `children`; shapes never do. Only attributes that
//! differ from their defaults are written, in sorted order, so the output of
//! a save/load/save cycle is byte-identical.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::node::NodeId;
use crate::stage::Stage;
use crate::{SceneError, SceneResult};

/// One node of a serialized scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Non-default attributes.
    #[serde(default)]
    pub attrs: Map<String, Value>,
    /// Node class (`Stage`, `Layer`, `Group`, `Circle`, ...).
    #[serde(rename = "className")]
    pub class_name: String,
    /// Children of containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeDocument>>,
}

impl Stage {
    /// Document for a node and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn to_document(&self, id: NodeId) -> SceneResult<NodeDocument> {
        let node = self.node(id).ok_or(SceneError::NodeNotFound(id))?;
        let children = if node.node_type().is_container() {
            Some(
                node.children()
                    .iter()
                    .map(|child| self.to_document(*child))
                    .collect::<SceneResult<Vec<_>>>()?,
            )
        } else {
            None
        };
        Ok(NodeDocument {
            attrs: node.attr_map(),
            class_name: node.class_name().to_string(),
            children,
        })
    }

    /// Serialize the whole stage.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> SceneResult<String> {
        self.node_to_json(self.root())
    }

    /// Serialize one subtree.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn node_to_json(&self, id: NodeId) -> SceneResult<String> {
        Ok(serde_json::to_string(&self.to_document(id)?)?)
    }

    /// Build a stage from JSON with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Serialization`] for malformed JSON,
    /// [`SceneError::UnknownClass`] for unknown classes and
    /// [`SceneError::InvalidDocument`] when the root is not a stage.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Self::from_json_with_config(json, EngineConfig::default())
    }

    /// Build a stage from JSON with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`Stage::from_json`].
    pub fn from_json_with_config(json: &str, config: EngineConfig) -> SceneResult<Self> {
        let doc: NodeDocument = serde_json::from_str(json)?;
        Self::from_document(&doc, config)
    }

    /// Build a stage from a parsed document.
    ///
    /// # Errors
    ///
    /// See [`Stage::from_json`].
    pub fn from_document(doc: &NodeDocument, config: EngineConfig) -> SceneResult<Self> {
        if doc.class_name != "Stage" {
            return Err(SceneError::InvalidDocument(format!(
                "root must be a Stage, found {}",
                doc.class_name
            )));
        }
        let mut stage = Self::with_config(0.0, 0.0, config);
        let root = stage.root();
        stage.set_attrs(root, &doc.attrs)?;
        for child in doc.children.iter().flatten() {
            stage.load(root, child)?;
        }
        tracing::debug!(nodes = stage.len(), "loaded stage document");
        Ok(stage)
    }

    /// Build a subtree from a document and append it to `parent`. On error
    /// nothing is added.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownClass`], [`SceneError::InvalidDocument`]
    /// or [`SceneError::InvalidHierarchy`] for documents that do not fit.
    pub fn load(&mut self, parent: NodeId, doc: &NodeDocument) -> SceneResult<NodeId> {
        let id = self.build(doc)?;
        if let Err(err) = self.add(parent, id) {
            self.destroy(id);
            return Err(err);
        }
        Ok(id)
    }

    fn build(&mut self, doc: &NodeDocument) -> SceneResult<NodeId> {
        let id = self.create(&doc.class_name)?;
        if let Err(err) = self.populate(id, doc) {
            self.destroy(id);
            return Err(err);
        }
        Ok(id)
    }

    fn populate(&mut self, id: NodeId, doc: &NodeDocument) -> SceneResult<()> {
        self.set_attrs(id, &doc.attrs)?;
        let Some(children) = &doc.children else {
            return Ok(());
        };
        if !self.node_type(id).is_some_and(|t| t.is_container()) {
            return Err(SceneError::InvalidDocument(format!(
                "{} cannot have children",
                doc.class_name
            )));
        }
        for child in children {
            let child_id = self.build(child)?;
            if let Err(err) = self.add(id, child_id) {
                self.destroy(child_id);
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "attrs": {"width": 200, "height": 100},
        "className": "Stage",
        "children": [{
            "attrs": {"id": "main"},
            "className": "Layer",
            "children": [
                {"attrs": {"x": 10, "radius": 5, "fill": "red"}, "className": "Circle"},
                {"attrs": {"name": "box"}, "className": "Group", "children": []}
            ]
        }]
    }"#;

    #[test]
    fn test_load_builds_tree() {
        let stage = Stage::from_json(SCENE).expect("load");
        assert_eq!(stage.size(), (200.0, 100.0));
        let layer = stage.find_one(stage.root(), "#main").expect("layer");
        assert_eq!(stage.children(layer).len(), 2);
        let circle = stage.find_one(layer, "Circle").expect("circle");
        assert_eq!(stage.get_attr(circle, "fill"), Value::from("red"));
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let first = Stage::from_json(SCENE).expect("load").to_json().expect("save");
        let second = Stage::from_json(&first).expect("reload").to_json().expect("resave");
        assert_eq!(first, second);
    }

    #[test]
    fn test_shapes_have_no_children_key() {
        let json = Stage::from_json(SCENE).expect("load").to_json().expect("save");
        let doc: Value = serde_json::from_str(&json).expect("json");
        let circle = &doc["children"][0]["children"][0];
        assert_eq!(circle["className"], "Circle");
        assert!(circle.get("children").is_none());
        let group = &doc["children"][0]["children"][1];
        assert_eq!(group["children"], Value::Array(Vec::new()));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Stage::from_json("{not json"),
            Err(SceneError::Serialization(_))
        ));
        assert!(matches!(
            Stage::from_json(r#"{"className": "Stage", "children": [{"className": "Text"}]}"#),
            Err(SceneError::UnknownClass(name)) if name == "Text"
        ));
        assert!(matches!(
            Stage::from_json(r#"{"className": "Layer"}"#),
            Err(SceneError::InvalidDocument(_))
        ));
        assert!(matches!(
            Stage::from_json(
                r#"{"className": "Stage", "children": [{"className": "Circle"}]}"#
            ),
            Err(SceneError::InvalidHierarchy(_))
        ));
        assert!(matches!(
            Stage::from_json(
                r#"{"className": "Stage", "children": [{"className": "Layer", "children": [
                    {"className": "Rect", "children": []}]}]}"#
            ),
            Err(SceneError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_failed_load_leaves_no_nodes() {
        let mut stage = Stage::new(10.0, 10.0);
        let layer = stage.create_layer();
        stage.add(stage.root(), layer).expect("layer");
        let before = stage.len();
        let doc: NodeDocument = serde_json::from_str(
            r#"{"className": "Group", "children": [{"className": "Rect"}, {"className": "Nope"}]}"#,
        )
        .expect("doc");
        assert!(stage.load(layer, &doc).is_err());
        assert_eq!(stage.len(), before);
    }
}
