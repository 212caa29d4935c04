//! In-memory world backed by a JSON snapshot.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::world::content::{Asset, AssetId, SceneNode};
use crate::world::{Component, NodeId, World};

/// On-disk form of a [`MemoryWorld`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub scene_name: String,
    pub nodes: Vec<SceneNode>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    scale: [f64; 3],
    tag: Option<String>,
    components: Vec<Component>,
}

/// Arena-backed scene graph plus an asset catalog.
///
/// Node ids are arena indices; nodes are never removed, so ids stay valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryWorld {
    scene_name: String,
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
    assets: BTreeMap<AssetId, Asset>,
}

impl MemoryWorld {
    pub fn new(scene_name: &str) -> Self {
        Self {
            scene_name: scene_name.to_string(),
            ..Self::default()
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let mut world = Self::new(&snapshot.scene_name);
        for node in &snapshot.nodes {
            world.insert_tree(None, node);
        }
        for asset in snapshot.assets {
            world.insert_asset(asset);
        }
        world
    }

    pub fn to_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            scene_name: self.scene_name.clone(),
            nodes: self.roots.iter().map(|root| self.export_tree(*root)).collect(),
            assets: self.assets.values().cloned().collect(),
        }
    }

    /// Add or replace an asset, keyed by its path.
    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.path.clone(), asset);
    }

    /// Insert a snapshot subtree under `parent`, returning its root id.
    pub fn insert_tree(&mut self, parent: Option<NodeId>, node: &SceneNode) -> NodeId {
        let id = self.push_slot(parent, &node.name);
        let slot = &mut self.slots[id.0];
        slot.scale = node.scale;
        slot.tag.clone_from(&node.tag);
        slot.components.clone_from(&node.components);
        for child in &node.children {
            self.insert_tree(Some(id), child);
        }
        id
    }

    pub fn set_tag(&mut self, node: NodeId, tag: &str) -> Result<()> {
        self.slot_mut(node)?.tag = Some(tag.to_string());
        Ok(())
    }

    fn export_tree(&self, node: NodeId) -> SceneNode {
        let slot = &self.slots[node.0];
        SceneNode {
            name: slot.name.clone(),
            scale: slot.scale,
            tag: slot.tag.clone(),
            components: slot.components.clone(),
            children: slot
                .children
                .iter()
                .map(|child| self.export_tree(*child))
                .collect(),
        }
    }

    fn push_slot(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            scale: crate::world::UNIT_SCALE,
            tag: None,
            components: Vec::new(),
        });
        match parent {
            Some(parent) => self.slots[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.0)
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut Slot> {
        match self.slots.get_mut(node.0) {
            Some(slot) => Ok(slot),
            None => bail!("unknown node {node}"),
        }
    }
}

impl World for MemoryWorld {
    fn scene_name(&self) -> &str {
        &self.scene_name
    }

    fn roots(&self) -> Vec<NodeId> {
        self.roots.clone()
    }

    fn name(&self, node: NodeId) -> &str {
        self.slot(node).map_or("", |slot| slot.name.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).and_then(|slot| slot.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.slot(node)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn local_scale(&self, node: NodeId) -> [f64; 3] {
        self.slot(node)
            .map_or(crate::world::UNIT_SCALE, |slot| slot.scale)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.slot(node).and_then(|slot| slot.tag.as_deref())
    }

    fn components(&self, node: NodeId) -> &[Component] {
        self.slot(node)
            .map(|slot| slot.components.as_slice())
            .unwrap_or_default()
    }

    fn create_node(&mut self, parent: Option<NodeId>, name: &str) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.slot_mut(parent)?;
        }
        Ok(self.push_slot(parent, name))
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.slot_mut(node)?;
        if let Some(parent) = parent {
            self.slot_mut(parent)?;
            if self.is_within(parent, node) {
                bail!("cannot move {node} under its own descendant {parent}");
            }
        }
        match self.slots[node.0].parent {
            Some(old) => self.slots[old.0].children.retain(|child| *child != node),
            None => self.roots.retain(|root| *root != node),
        }
        match parent {
            Some(new) => self.slots[new.0].children.push(node),
            None => self.roots.push(node),
        }
        self.slots[node.0].parent = parent;
        Ok(())
    }

    fn set_local_scale(&mut self, node: NodeId, scale: [f64; 3]) -> Result<()> {
        self.slot_mut(node)?.scale = scale;
        Ok(())
    }

    fn add_component(&mut self, node: NodeId, type_name: &str) -> Result<()> {
        self.slot_mut(node)?
            .components
            .push(Component::named(type_name));
        Ok(())
    }

    fn asset_ids(&self) -> Vec<AssetId> {
        self.assets.keys().cloned().collect()
    }

    fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trip_keeps_structure() {
        let raw = r#"{
            "sceneName": "Zone1",
            "nodes": [
                {"name": "ZONE_1", "children": [
                    {"name": "Zone1_Env", "scale": [2, 1, 2], "tag": "Env",
                     "components": [{"type": "Terrain"}]}
                ]},
                {"name": "_SYSTEMS"}
            ]
        }"#;
        let snapshot: WorldSnapshot = serde_json::from_str(raw).expect("snapshot");
        let world = MemoryWorld::from_snapshot(snapshot.clone());
        let env = world.find_node("ZONE_1/Zone1_Env").expect("env");
        assert_eq!(world.local_scale(env), [2.0, 1.0, 2.0]);
        assert_eq!(world.tag(env), Some("Env"));
        assert_eq!(world.components(env)[0].type_name, "Terrain");
        assert_eq!(world.to_snapshot(), snapshot);
    }

    #[test]
    fn set_parent_moves_between_lists() {
        let mut world = MemoryWorld::new("S");
        let zone = world.create_node(None, "ZONE_1").expect("zone");
        let ground = world.create_node(None, "Ground").expect("ground");
        world.set_parent(ground, Some(zone)).expect("move");
        assert_eq!(world.roots(), vec![zone]);
        assert_eq!(world.children(zone), vec![ground]);
        assert_eq!(world.node_path(ground), "ZONE_1/Ground");
    }

    #[test]
    fn set_parent_rejects_cycles_and_unknown_ids() {
        let mut world = MemoryWorld::new("S");
        let zone = world.create_node(None, "ZONE_1").expect("zone");
        let child = world.create_node(Some(zone), "Child").expect("child");
        let err = world.set_parent(zone, Some(child)).expect_err("cycle");
        assert!(err.to_string().contains("descendant"));
        assert!(world.add_component(NodeId(99), "X").is_err());
    }
}
