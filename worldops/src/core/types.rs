//! Command protocol types shared by the parser, scope checks and dispatcher.
//!
//! Field names follow the wire format (camelCase). Payload fields are all
//! optional; which ones an op reads is decided by [`crate::core::schema`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Threshold below which `minDropChance` counts as "not provided".
pub const MIN_CHANCE_EPSILON: f64 = 1e-6;

/// Whether handlers may mutate the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    DryRun,
    Apply,
}

impl ExecutionMode {
    pub fn is_apply(self) -> bool {
        matches!(self, ExecutionMode::Apply)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::DryRun => "DryRun",
            ExecutionMode::Apply => "Apply",
        }
    }

    /// Parse a mode label. Accepts `DryRun`/`Apply` in any case plus the
    /// `dry_run`/`dry-run` spellings used on the command line.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "dryrun" | "dry_run" | "dry-run" | "0" => Some(ExecutionMode::DryRun),
            "apply" | "1" => Some(ExecutionMode::Apply),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExecutionMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecutionMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Label(String),
            Index(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Label(label) => ExecutionMode::from_label(&label).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown execution mode '{label}'"))
            }),
            Repr::Index(0) => Ok(ExecutionMode::DryRun),
            Repr::Index(1) => Ok(ExecutionMode::Apply),
            Repr::Index(other) => Err(serde::de::Error::custom(format!(
                "unknown execution mode index {other}"
            ))),
        }
    }
}

/// Safety policy applied before a command is dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SafetyScope {
    /// Recorded and reported; no op enforces it.
    pub allowed_roots: Vec<String>,
    pub denied_roots: Vec<String>,
    /// Zero or negative means unlimited.
    pub max_operations: i64,
}

impl SafetyScope {
    /// Scope an envelope carries when it does not declare one.
    pub fn envelope_default() -> Self {
        Self {
            allowed_roots: vec!["_AI_WORKSPACE".to_string(), "_RUNTIME".to_string()],
            denied_roots: vec!["ZONE_1_LOCKED".to_string()],
            max_operations: 0,
        }
    }

    pub fn operation_cap(&self) -> Option<usize> {
        usize::try_from(self.max_operations).ok().filter(|cap| *cap > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneScope {
    pub scene_name: String,
}

/// One requested operation.
///
/// A command without an `op` is inert: it is counted but skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Command {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<SafetyScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensure_camera_pan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefab_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_items: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_drop_chance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_key_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_ops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_size: Option<[f64; 3]>,
}

impl Command {
    /// Command that only names an op.
    pub fn op(op: &str) -> Self {
        Self {
            op: Some(op.to_string()),
            ..Self::default()
        }
    }

    /// Trimmed op name, `None` when missing or blank.
    pub fn op_name(&self) -> Option<&str> {
        non_blank(self.op.as_deref())
    }

    /// Path-like fields in the order the scope check visits them.
    pub fn path_fields(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("parentPath", self.parent_path.as_deref()),
            ("name", self.name.as_deref()),
            ("prefabId", self.prefab_id.as_deref()),
            ("enemyId", self.enemy_id.as_deref()),
            ("dropTableId", self.drop_table_id.as_deref()),
            ("gateId", self.gate_id.as_deref()),
            ("expectedKeyItem", self.expected_key_item.as_deref()),
            ("path", self.path.as_deref()),
        ]
    }

    /// Names of payload fields that carry a meaningful value.
    pub fn populated_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = self
            .path_fields()
            .into_iter()
            .filter(|(_, value)| non_blank(*value).is_some())
            .map(|(field, _)| field)
            .collect();
        if non_blank(self.player_tag.as_deref()).is_some() {
            fields.push("playerTag");
        }
        if self.ensure_camera_pan.is_some() {
            fields.push("ensureCameraPan");
        }
        if self.expected_items.as_ref().is_some_and(|items| !items.is_empty()) {
            fields.push("expectedItems");
        }
        if self.min_drop_chance.is_some_and(|chance| chance.abs() > MIN_CHANCE_EPSILON) {
            fields.push("minDropChance");
        }
        if self.required_amount.is_some_and(|amount| amount != 0) {
            fields.push("requiredAmount");
        }
        if non_blank(self.recipe_name.as_deref()).is_some() {
            fields.push("recipeName");
        }
        if self.recipe_ops.as_ref().is_some_and(|ops| !ops.is_empty()) {
            fields.push("recipeOps");
        }
        if self.ground_size.is_some() {
            fields.push("groundSize");
        }
        fields
    }

    pub fn expected_items(&self) -> &[String] {
        self.expected_items.as_deref().unwrap_or_default()
    }

    /// `minDropChance` when it is set above the epsilon.
    pub fn min_drop_chance(&self) -> Option<f64> {
        self.min_drop_chance.filter(|chance| *chance > MIN_CHANCE_EPSILON)
    }

    pub fn ensure_camera_pan(&self) -> bool {
        self.ensure_camera_pan.unwrap_or(true)
    }
}

/// Trim and drop empty strings.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Ordered batch of commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandList {
    #[serde(deserialize_with = "inert_nulls")]
    pub commands: Vec<Command>,
}

impl CommandList {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// `null` entries become inert commands; a `null` array becomes empty.
fn inert_nulls<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Command>, D::Error> {
    let raw: Option<Vec<Option<Command>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Versioned request wrapping a command list with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Envelope {
    pub schema_version: String,
    pub request_id: String,
    pub mode: ExecutionMode,
    pub scene: SceneScope,
    pub scope: SafetyScope,
    pub commands: CommandList,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            schema_version: "1.0".to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            mode: ExecutionMode::DryRun,
            scene: SceneScope::default(),
            scope: SafetyScope::envelope_default(),
            commands: CommandList::default(),
        }
    }
}

/// Outcome of one execution call.
///
/// Channels are append-only; `success` only ever goes from true to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    success: bool,
    mode: ExecutionMode,
    ops_planned: usize,
    ops_executed: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
    logs: Vec<String>,
}

impl ExecutionResult {
    pub fn new(mode: ExecutionMode, ops_planned: usize) -> Self {
        Self {
            success: true,
            mode,
            ops_planned,
            ops_executed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            logs: Vec::new(),
        }
    }

    pub fn log(&mut self, op: &str, message: impl fmt::Display) {
        self.logs.push(format!("{op}: {message}"));
    }

    pub fn warn(&mut self, op: &str, message: impl fmt::Display) {
        self.warnings.push(format!("{op}: {message}"));
    }

    pub fn error(&mut self, op: &str, message: impl fmt::Display) {
        self.errors.push(format!("{op}: {message}"));
        self.success = false;
    }

    /// Count one dispatched command. Saturates at `ops_planned`.
    pub fn mark_executed(&mut self) {
        if self.ops_executed < self.ops_planned {
            self.ops_executed += 1;
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn ops_planned(&self) -> usize {
        self.ops_planned
    }

    pub fn ops_executed(&self) -> usize {
        self.ops_executed
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_accepts_labels_and_indices() {
        let modes: Vec<ExecutionMode> =
            serde_json::from_str(r#"["DryRun", "apply", 0, 1, "dry-run"]"#).expect("modes");
        assert_eq!(
            modes,
            vec![
                ExecutionMode::DryRun,
                ExecutionMode::Apply,
                ExecutionMode::DryRun,
                ExecutionMode::Apply,
                ExecutionMode::DryRun,
            ]
        );
        assert!(serde_json::from_str::<ExecutionMode>("2").is_err());
        assert_eq!(
            serde_json::to_string(&ExecutionMode::Apply).expect("serialize"),
            "\"Apply\""
        );
    }

    #[test]
    fn envelope_defaults_fill_missing_fields() {
        let env: Envelope = serde_json::from_str("{}").expect("envelope");
        assert_eq!(env.schema_version, "1.0");
        assert_eq!(env.mode, ExecutionMode::DryRun);
        assert_eq!(env.scope, SafetyScope::envelope_default());
        assert!(uuid::Uuid::parse_str(&env.request_id).is_ok());
        assert!(env.commands.is_empty());
    }

    #[test]
    fn null_commands_become_inert() {
        let list: CommandList =
            serde_json::from_str(r#"{"commands":[null,{"op":"ping"}]}"#).expect("list");
        assert_eq!(list.len(), 2);
        assert_eq!(list.commands[0].op_name(), None);
        assert_eq!(list.commands[1].op_name(), Some("ping"));
    }

    #[test]
    fn populated_fields_ignore_blank_and_zero_values() {
        let cmd = Command {
            gate_id: Some("  ".to_string()),
            drop_table_id: Some("Drops_A".to_string()),
            min_drop_chance: Some(0.0),
            required_amount: Some(0),
            expected_items: Some(Vec::new()),
            ..Command::op("validateDropTable")
        };
        assert_eq!(cmd.populated_fields(), vec!["dropTableId"]);
    }

    #[test]
    fn error_flips_success_for_good() {
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        result.log("ping", "ok");
        assert!(result.success());
        result.error("ping", "boom");
        result.log("ping", "after");
        assert!(!result.success());
        assert_eq!(result.errors(), ["ping: boom"]);
        assert_eq!(result.logs(), ["ping: ok", "ping: after"]);
    }

    #[test]
    fn executed_never_exceeds_planned() {
        let mut result = ExecutionResult::new(ExecutionMode::Apply, 1);
        result.mark_executed();
        result.mark_executed();
        assert_eq!(result.ops_executed(), 1);
    }
}
