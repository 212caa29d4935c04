//! Test-only fixture worlds and asset builders.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::world::content::{
    Asset, AssetData, AssetId, DropEntry, DropTableData, FieldValue, SceneNode,
};
use crate::world::memory::MemoryWorld;
use crate::world::{Component, NodeId, World};

pub const SCENE_NAME: &str = "Zone1";

fn asset(name: &str, type_name: &str, path: String, data: AssetData) -> Asset {
    Asset {
        name: name.to_string(),
        type_name: type_name.to_string(),
        path,
        data,
        fields: BTreeMap::new(),
    }
}

pub fn item_path(name: &str) -> String {
    format!("Content/Items/{name}.asset")
}

pub fn table_path(name: &str) -> String {
    format!("Content/Drops/{name}.asset")
}

/// An `ItemDefinition` at `Content/Items/<name>.asset`.
pub fn item(name: &str, item_id: Option<&str>) -> Asset {
    asset(
        name,
        "ItemDefinition",
        item_path(name),
        AssetData::ItemDefinition {
            item_id: item_id.map(str::to_string),
        },
    )
}

/// A `GateDefinition`; `required_item` is an asset path.
pub fn gate(name: &str, required_item: Option<&str>) -> Asset {
    asset(
        name,
        "GateDefinition",
        format!("Content/Gates/{name}.asset"),
        AssetData::GateDefinition {
            required_item: required_item.map(str::to_string),
        },
    )
}

pub fn drop_entry(item_name: &str, drop_chance: f64) -> DropEntry {
    DropEntry {
        item: Some(item_path(item_name)),
        drop_chance,
    }
}

pub fn drop_table(name: &str, data: DropTableData) -> Asset {
    asset(name, "DropTable", table_path(name), AssetData::DropTable(data))
}

/// An enemy data asset with the given field bag.
pub fn enemy(name: &str, fields: Vec<(&str, FieldValue)>) -> Asset {
    let mut enemy = asset(
        name,
        "EnemyDefinition",
        format!("Content/Enemies/{name}.asset"),
        AssetData::Opaque,
    );
    enemy.fields = fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    enemy
}

/// A prefab whose root node carries `components`.
pub fn prefab(name: &str, components: Vec<Component>) -> Asset {
    let mut root = SceneNode::new(name);
    root.components = components;
    asset(
        name,
        "Prefab",
        format!("Prefabs/{name}.prefab"),
        AssetData::Prefab { root },
    )
}

/// Small content catalog covering items, tables, a gate, enemies and prefabs.
///
/// - `DT_Goblin` drops `Item_GoblinEar` and `Item_AbyssalSigil`; `DT_Empty` is empty.
/// - `Item_Unused` is referenced by no table.
/// - `Gate_Zone1_Boss` requires `Item_AbyssalSigil` (itemId `sigil_abyssal`).
/// - Enemies: `Goblin` links `DT_Goblin` directly, `Orc` names `dt_goblin`
///   and the missing `DT_Missing`, `Slime` has no drop fields.
/// - Prefabs: `Enemy_Goblin` (by name), `Wolf` (by component), `Crate` (neither).
pub fn content_world() -> MemoryWorld {
    let mut world = MemoryWorld::new(SCENE_NAME);

    world.insert_asset(item("Item_AbyssalSigil", Some("sigil_abyssal")));
    world.insert_asset(item("Item_GoblinEar", None));
    world.insert_asset(item("Item_Unused", None));

    world.insert_asset(drop_table("DT_Empty", DropTableData::default()));
    world.insert_asset(drop_table(
        "DT_Goblin",
        DropTableData {
            fodder_drops: vec![drop_entry("Item_GoblinEar", 0.5)],
            normal_drops: vec![
                drop_entry("Item_GoblinEar", 0.25),
                drop_entry("Item_AbyssalSigil", 0.35),
            ],
            ..DropTableData::default()
        },
    ));

    world.insert_asset(gate(
        "Gate_Zone1_Boss",
        Some(&item_path("Item_AbyssalSigil")),
    ));

    let goblin_table = FieldValue::Link {
        asset: table_path("DT_Goblin"),
    };
    world.insert_asset(enemy("Goblin", vec![("dropTable", goblin_table.clone())]));
    world.insert_asset(enemy(
        "Orc",
        vec![(
            "lootTables",
            FieldValue::List(vec![
                FieldValue::Text("dt_goblin".to_string()),
                FieldValue::Text("DT_Missing".to_string()),
            ]),
        )],
    ));
    world.insert_asset(enemy("Slime", vec![("health", FieldValue::Number(10.0))]));

    let mut loot = Component::named("EnemyLoot");
    loot.fields.insert("dropTable".to_string(), goblin_table);
    world.insert_asset(prefab("Enemy_Goblin", vec![loot]));
    world.insert_asset(prefab("Wolf", vec![Component::named("MobBrain")]));
    world.insert_asset(prefab("Crate", Vec::new()));

    world
}

/// Unorganized zone scene on top of [`content_world`].
///
/// Has `_RUNTIME/Hero` tagged `Player` (with `PlayerInput` only), a
/// `Main Camera` tagged `MainCamera`, and loose top-level `Ground_Large` and
/// `Stone_Path_01` nodes. `_RUNTIME` is the only scene root; no zone groups.
pub fn zone_world() -> MemoryWorld {
    let mut world = content_world();
    let mut runtime = SceneNode::new("_RUNTIME");
    let mut hero = SceneNode::new("Hero");
    hero.tag = Some("Player".to_string());
    hero.components.push(Component::named("PlayerInput"));
    runtime.children.push(hero);
    world.insert_tree(None, &runtime);

    let mut camera = SceneNode::new("Main Camera");
    camera.tag = Some("MainCamera".to_string());
    world.insert_tree(None, &camera);

    world.insert_tree(None, &SceneNode::new("Ground_Large"));
    world.insert_tree(None, &SceneNode::new("Stone_Path_01"));
    world
}

/// A world whose host refuses every write. Reads go to the wrapped world.
#[derive(Debug, Clone)]
pub struct ReadOnlyWorld(pub MemoryWorld);

impl World for ReadOnlyWorld {
    fn scene_name(&self) -> &str {
        self.0.scene_name()
    }

    fn roots(&self) -> Vec<NodeId> {
        self.0.roots()
    }

    fn name(&self, node: NodeId) -> &str {
        self.0.name(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.0.parent(node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.0.children(node)
    }

    fn local_scale(&self, node: NodeId) -> [f64; 3] {
        self.0.local_scale(node)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.0.tag(node)
    }

    fn components(&self, node: NodeId) -> &[Component] {
        self.0.components(node)
    }

    fn create_node(&mut self, _parent: Option<NodeId>, name: &str) -> Result<NodeId> {
        bail!("world is read-only (create '{name}')")
    }

    fn set_parent(&mut self, node: NodeId, _parent: Option<NodeId>) -> Result<()> {
        bail!("world is read-only (move {node})")
    }

    fn set_local_scale(&mut self, node: NodeId, _scale: [f64; 3]) -> Result<()> {
        bail!("world is read-only (scale {node})")
    }

    fn add_component(&mut self, node: NodeId, type_name: &str) -> Result<()> {
        bail!("world is read-only (add {type_name} to {node})")
    }

    fn asset_ids(&self) -> Vec<AssetId> {
        self.0.asset_ids()
    }

    fn asset(&self, id: &str) -> Option<&Asset> {
        self.0.asset(id)
    }
}
