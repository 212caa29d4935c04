//! Content assets and the loose links between them.
//!
//! Assets carry a typed payload ([`AssetData`]) plus a free-form field bag.
//! Cross-asset links found in field bags may be direct references, string
//! ids that need a second lookup by name, or lists of either.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::world::{Component, UNIT_SCALE, contains_any_ignore_case};

/// Asset path, unique within a world.
pub type AssetId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub path: AssetId,
    #[serde(default)]
    pub data: AssetData,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssetData {
    DropTable(DropTableData),
    #[serde(rename_all = "camelCase")]
    ItemDefinition {
        #[serde(default)]
        item_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GateDefinition {
        #[serde(default)]
        required_item: Option<AssetId>,
    },
    Prefab {
        root: SceneNode,
    },
    #[default]
    Opaque,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropTableData {
    pub fodder_drops: Vec<DropEntry>,
    pub normal_drops: Vec<DropEntry>,
    pub elite_drops: Vec<DropEntry>,
    pub mini_boss_drops: Vec<DropEntry>,
}

impl DropTableData {
    /// Entries per tier, in [`crate::core::drop_table::TIERS`] order.
    pub fn tiers(&self) -> [(&'static str, &[DropEntry]); 4] {
        [
            ("Fodder", self.fodder_drops.as_slice()),
            ("Normal", self.normal_drops.as_slice()),
            ("Elite", self.elite_drops.as_slice()),
            ("MiniBoss", self.mini_boss_drops.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropEntry {
    /// Item definition asset id; `None` is an empty slot.
    #[serde(default)]
    pub item: Option<AssetId>,
    #[serde(default)]
    pub drop_chance: f64,
}

/// Node tree stored inside a prefab asset or a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub name: String,
    #[serde(default = "unit_scale", skip_serializing_if = "is_unit_scale")]
    pub scale: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scale: UNIT_SCALE,
            tag: None,
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Components of this node and all descendants, depth-first.
    pub fn all_components(&self) -> Vec<&Component> {
        let mut out: Vec<&Component> = self.components.iter().collect();
        for child in &self.children {
            out.extend(child.all_components());
        }
        out
    }
}

fn unit_scale() -> [f64; 3] {
    UNIT_SCALE
}

fn is_unit_scale(scale: &[f64; 3]) -> bool {
    *scale == UNIT_SCALE
}

/// Loosely typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Link { asset: AssetId },
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A link target before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRef {
    Direct(AssetId),
    Named(String),
}

/// A link plus where it was found, e.g. `field:dropTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundLink {
    pub link: LinkRef,
    pub source: String,
}

/// Field-name tokens that mark drop-table links.
pub const DROP_TABLE_TOKENS: &[&str] = &["dropTable", "dropTables", "loot"];

/// Collect links from every field whose name contains one of `tokens`
/// (case-insensitive). Returns the links and the matched field names.
pub fn extract_links(
    fields: &BTreeMap<String, FieldValue>,
    tokens: &[&str],
    source_prefix: &str,
) -> (Vec<FoundLink>, Vec<String>) {
    let mut links = Vec::new();
    let mut matched = Vec::new();
    for (name, value) in fields {
        if !contains_any_ignore_case(name, tokens) {
            continue;
        }
        let source = format!("{source_prefix}{name}");
        matched.push(source.clone());
        collect_links(value, &source, &mut links);
    }
    (links, matched)
}

fn collect_links(value: &FieldValue, source: &str, out: &mut Vec<FoundLink>) {
    match value {
        FieldValue::Link { asset } => out.push(FoundLink {
            link: LinkRef::Direct(asset.clone()),
            source: source.to_string(),
        }),
        FieldValue::Text(id) if !id.trim().is_empty() => out.push(FoundLink {
            link: LinkRef::Named(id.trim().to_string()),
            source: source.to_string(),
        }),
        FieldValue::List(items) => {
            for item in items {
                collect_links(item, source, out);
            }
        }
        _ => {}
    }
}
