//! Typed content discovery with a name-heuristic fallback.
//!
//! Every lookup tries the exact type name first. Only when that finds nothing
//! does it widen to assets whose type name satisfies the type's heuristic, and
//! the path taken is logged into the result.

use std::collections::BTreeMap;

use crate::core::types::ExecutionResult;
use crate::world::content::{Asset, AssetData, AssetId, DropTableData, FieldValue, SceneNode};
use crate::world::{World, contains_any_ignore_case, contains_ignore_case};

/// Maximum names listed per candidate log block.
pub const LIST_LIMIT: usize = 50;

/// A typed view over a content asset.
pub trait ContentType: Sized {
    /// Exact type name.
    const TYPE_NAME: &'static str;

    /// Heuristic applied to type names when the exact search is empty.
    fn fallback_match(type_name: &str) -> bool;

    fn from_asset(asset: &Asset) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
    pub path: AssetId,
    pub data: DropTableData,
}

impl ContentType for DropTable {
    const TYPE_NAME: &'static str = "DropTable";

    fn fallback_match(type_name: &str) -> bool {
        contains_ignore_case(type_name, "DropTable")
    }

    fn from_asset(asset: &Asset) -> Option<Self> {
        match &asset.data {
            AssetData::DropTable(data) => Some(Self {
                name: asset.name.clone(),
                path: asset.path.clone(),
                data: data.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub name: String,
    pub path: AssetId,
    pub item_id: Option<String>,
}

impl ItemDefinition {
    /// `itemId` when set, otherwise the asset name.
    pub fn label(&self) -> &str {
        self.item_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&self.name)
    }

    /// Match by `itemId` or asset name, case-insensitive.
    pub fn matches(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        self.item_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(token))
            || self.name.eq_ignore_ascii_case(token)
    }
}

impl ContentType for ItemDefinition {
    const TYPE_NAME: &'static str = "ItemDefinition";

    fn fallback_match(type_name: &str) -> bool {
        contains_ignore_case(type_name, "Item")
            && contains_any_ignore_case(type_name, &["Definition", "Def"])
    }

    fn from_asset(asset: &Asset) -> Option<Self> {
        let item_id = match &asset.data {
            AssetData::ItemDefinition { item_id } => item_id.clone(),
            AssetData::Opaque => asset
                .fields
                .get("itemId")
                .and_then(FieldValue::as_text)
                .map(str::to_string),
            _ => return None,
        };
        Some(Self {
            name: asset.name.clone(),
            path: asset.path.clone(),
            item_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDefinition {
    pub name: String,
    pub path: AssetId,
    pub required_item: Option<AssetId>,
}

impl ContentType for GateDefinition {
    const TYPE_NAME: &'static str = "GateDefinition";

    fn fallback_match(type_name: &str) -> bool {
        contains_ignore_case(type_name, "Gate")
            && contains_any_ignore_case(type_name, &["Definition", "Def"])
    }

    fn from_asset(asset: &Asset) -> Option<Self> {
        match &asset.data {
            AssetData::GateDefinition { required_item } => Some(Self {
                name: asset.name.clone(),
                path: asset.path.clone(),
                required_item: required_item.clone(),
            }),
            _ => None,
        }
    }
}

/// Enemy data asset. Links to drop tables live in the field bag.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDefinition {
    pub name: String,
    pub path: AssetId,
    pub type_name: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ContentType for EnemyDefinition {
    const TYPE_NAME: &'static str = "EnemyDefinition";

    fn fallback_match(type_name: &str) -> bool {
        contains_ignore_case(type_name, "Enemy")
            && contains_any_ignore_case(type_name, &["Definition", "Config"])
    }

    fn from_asset(asset: &Asset) -> Option<Self> {
        match &asset.data {
            AssetData::Prefab { .. } => None,
            _ => Some(Self {
                name: asset.name.clone(),
                path: asset.path.clone(),
                type_name: asset.type_name.clone(),
                fields: asset.fields.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    pub name: String,
    pub path: AssetId,
    pub root: SceneNode,
}

impl Prefab {
    pub fn from_asset(asset: &Asset) -> Option<Self> {
        match &asset.data {
            AssetData::Prefab { root } => Some(Self {
                name: asset.name.clone(),
                path: asset.path.clone(),
                root: root.clone(),
            }),
            _ => None,
        }
    }
}

/// What a discovery returned and how.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery<T> {
    pub items: Vec<T>,
    pub used_fallback: bool,
    /// `(name, type)` of assets the fallback heuristic matched.
    pub fallback_candidates: Vec<(String, String)>,
}

impl<T> Discovery<T> {
    pub fn names(&self) -> Vec<&str>
    where
        T: Named,
    {
        self.items.iter().map(Named::name).collect()
    }
}

pub trait Named {
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),+) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })+
    };
}

impl_named!(DropTable, ItemDefinition, GateDefinition, EnemyDefinition, Prefab);

/// Data assets (everything but prefabs), in world order.
pub fn data_assets(world: &dyn World) -> Vec<&Asset> {
    world
        .asset_ids()
        .iter()
        .filter_map(|id| world.asset(id))
        .filter(|asset| !matches!(asset.data, AssetData::Prefab { .. }))
        .collect()
}

pub fn prefabs(world: &dyn World) -> Vec<Prefab> {
    world
        .asset_ids()
        .iter()
        .filter_map(|id| world.asset(id))
        .filter_map(Prefab::from_asset)
        .collect()
}

/// Exact-then-fallback discovery of `T`, logging the path used under `op`.
pub fn discover<T: ContentType>(
    world: &dyn World,
    result: &mut ExecutionResult,
    op: &str,
) -> Discovery<T> {
    let assets = data_assets(world);
    let exact: Vec<T> = assets
        .iter()
        .filter(|asset| asset.type_name == T::TYPE_NAME)
        .filter_map(|asset| T::from_asset(asset))
        .collect();
    if !exact.is_empty() {
        result.log(
            op,
            format!("{}: {} exact type match(es)", T::TYPE_NAME, exact.len()),
        );
        return Discovery {
            items: exact,
            used_fallback: false,
            fallback_candidates: Vec::new(),
        };
    }

    let candidates: Vec<&Asset> = assets
        .into_iter()
        .filter(|asset| T::fallback_match(&asset.type_name))
        .collect();
    let label = format!("{} fallback candidates", T::TYPE_NAME);
    if candidates.is_empty() {
        result.log(op, format!("{label}: (none)"));
    } else {
        let shown = candidates.len().min(LIST_LIMIT);
        result.log(
            op,
            format!("{label}: {} candidate(s) (showing {shown})", candidates.len()),
        );
        for asset in candidates.iter().take(shown) {
            result.log(op, format!(" - {} | {}", asset.name, asset.type_name));
        }
    }
    tracing::debug!(
        type_name = T::TYPE_NAME,
        candidates = candidates.len(),
        "exact discovery empty, used fallback"
    );

    Discovery {
        items: candidates
            .iter()
            .filter_map(|asset| T::from_asset(asset))
            .collect(),
        used_fallback: true,
        fallback_candidates: candidates
            .iter()
            .map(|asset| (asset.name.clone(), asset.type_name.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExecutionMode;
    use crate::world::memory::MemoryWorld;

    fn asset(name: &str, type_name: &str, data: AssetData) -> Asset {
        Asset {
            name: name.to_string(),
            type_name: type_name.to_string(),
            path: format!("Content/{name}.asset"),
            data,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn exact_match_skips_fallback() {
        let mut world = MemoryWorld::new("S");
        world.insert_asset(asset(
            "Drops_A",
            "DropTable",
            AssetData::DropTable(DropTableData::default()),
        ));
        world.insert_asset(asset(
            "Drops_B",
            "LegacyDropTable",
            AssetData::DropTable(DropTableData::default()),
        ));
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        let found = discover::<DropTable>(&world, &mut result, "listDropTables");
        assert!(!found.used_fallback);
        assert_eq!(found.names(), vec!["Drops_A"]);
        assert_eq!(result.logs(), ["listDropTables: DropTable: 1 exact type match(es)"]);
    }

    #[test]
    fn fallback_logs_candidates_and_drops_unloadable() {
        let mut world = MemoryWorld::new("S");
        world.insert_asset(asset(
            "Drops_Legacy",
            "LegacyDropTable",
            AssetData::DropTable(DropTableData::default()),
        ));
        world.insert_asset(asset("Drops_Broken", "DropTableStub", AssetData::Opaque));
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        let found = discover::<DropTable>(&world, &mut result, "op");
        assert!(found.used_fallback);
        assert_eq!(found.names(), vec!["Drops_Legacy"]);
        assert_eq!(found.fallback_candidates.len(), 2);
        assert_eq!(
            result.logs()[0],
            "op: DropTable fallback candidates: 2 candidate(s) (showing 2)"
        );
    }

    #[test]
    fn item_fallback_reads_item_id_field() {
        let mut world = MemoryWorld::new("S");
        let mut legacy = asset("Item_Key", "ItemDef", AssetData::Opaque);
        legacy
            .fields
            .insert("itemId".to_string(), FieldValue::Text("key".to_string()));
        world.insert_asset(legacy);
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        let found = discover::<ItemDefinition>(&world, &mut result, "op");
        assert_eq!(found.items[0].item_id.as_deref(), Some("key"));
        assert!(found.items[0].matches("KEY"));
        assert!(found.items[0].matches("item_key"));
        assert_eq!(found.items[0].label(), "key");
    }
}
