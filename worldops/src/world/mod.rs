//! The world adapter seam.
//!
//! Handlers only see the world through [`World`]. Reads are infallible; writes
//! return `Result` because a host may refuse them. Nothing in this module
//! mutates unless the caller passes [`ExecutionMode::Apply`].

pub mod content;
pub mod discover;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::types::ExecutionMode;

pub use content::{Asset, AssetData, AssetId, FieldValue};

/// Handle to a node in the scene graph. Only meaningful for the world that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub const UNIT_SCALE: [f64; 3] = [1.0, 1.0, 1.0];

/// Behaviour attached to a node (or a prefab node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Component {
    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: BTreeMap::new(),
        }
    }
}

pub trait World {
    fn scene_name(&self) -> &str;

    /// Top-level nodes in scene order.
    fn roots(&self) -> Vec<NodeId>;
    fn name(&self, node: NodeId) -> &str;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn local_scale(&self, node: NodeId) -> [f64; 3];
    fn tag(&self, node: NodeId) -> Option<&str>;
    fn components(&self, node: NodeId) -> &[Component];

    fn create_node(&mut self, parent: Option<NodeId>, name: &str) -> Result<NodeId>;
    /// Re-parent `node`; `None` moves it to the top level.
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()>;
    fn set_local_scale(&mut self, node: NodeId, scale: [f64; 3]) -> Result<()>;
    fn add_component(&mut self, node: NodeId, type_name: &str) -> Result<()>;

    /// Content asset ids in stable order.
    fn asset_ids(&self) -> Vec<AssetId>;
    fn asset(&self, id: &str) -> Option<&Asset>;

    fn children_of(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        match parent {
            Some(node) => self.children(node),
            None => self.roots(),
        }
    }

    fn find_child(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        self.children_of(parent)
            .into_iter()
            .find(|child| self.name(*child) == name)
    }

    /// Walk a slash-separated path from the top level.
    fn find_path(&self, path: &str) -> Option<NodeId> {
        let mut current = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = Some(self.find_child(current, segment)?);
        }
        current
    }

    /// Find by slash-separated path, or by bare name anywhere (depth-first,
    /// scene order).
    fn find_node(&self, name_or_path: &str) -> Option<NodeId> {
        if name_or_path.contains('/') {
            return self.find_path(name_or_path);
        }
        self.all_nodes()
            .into_iter()
            .find(|node| self.name(*node) == name_or_path)
    }

    fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.all_nodes()
            .into_iter()
            .find(|node| self.tag(*node) == Some(tag))
    }

    /// Slash-joined names from the top level down to `node`.
    fn node_path(&self, node: NodeId) -> String {
        let mut names = vec![self.name(node).to_string()];
        let mut current = self.parent(node);
        while let Some(parent) = current {
            names.push(self.name(parent).to_string());
            current = self.parent(parent);
        }
        names.reverse();
        names.join("/")
    }

    /// `node` followed by its descendants, depth-first.
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn all_nodes(&self) -> Vec<NodeId> {
        self.roots()
            .into_iter()
            .flat_map(|root| self.subtree(root))
            .collect()
    }

    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(next) = current {
            if next == ancestor {
                return true;
            }
            current = self.parent(next);
        }
        false
    }

    /// Whether `node` or any descendant carries a component with one of the
    /// exact type names.
    fn has_component_named(&self, node: NodeId, type_names: &[&str]) -> bool {
        self.subtree(node).into_iter().any(|n| {
            self.components(n)
                .iter()
                .any(|c| type_names.contains(&c.type_name.as_str()))
        })
    }

    fn has_own_component(&self, node: NodeId, type_name: &str) -> bool {
        self.components(node)
            .iter()
            .any(|c| c.type_name == type_name)
    }
}

/// State of a named child after [`ensure_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Present(NodeId),
    Created(NodeId),
    /// Absent, and the mode forbade creating it.
    Missing,
}

impl ChildState {
    pub fn node(self) -> Option<NodeId> {
        match self {
            ChildState::Present(node) | ChildState::Created(node) => Some(node),
            ChildState::Missing => None,
        }
    }
}

/// Find `name` under `parent`, creating it only in Apply mode.
pub fn ensure_child(
    world: &mut dyn World,
    parent: Option<NodeId>,
    name: &str,
    mode: ExecutionMode,
) -> Result<ChildState> {
    if let Some(node) = world.find_child(parent, name) {
        return Ok(ChildState::Present(node));
    }
    if !mode.is_apply() {
        return Ok(ChildState::Missing);
    }
    let node = world.create_node(parent, name)?;
    tracing::debug!(%node, name, "created node");
    Ok(ChildState::Created(node))
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn contains_any_ignore_case(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| contains_ignore_case(haystack, needle))
}
