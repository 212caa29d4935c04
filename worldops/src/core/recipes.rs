//! Builtin recipe table.

/// Named, ordered op sequences `runRecipe` can expand.
pub const BUILTIN: &[(&str, &[&str])] = &[
    (
        "zone1_foundation_validate",
        &[
            "validateSceneRoots",
            "validateFoundation",
            "validateNoScaledParents",
        ],
    ),
    (
        "zone1_foundation_ensure",
        &["ensureSceneRoots", "ensureFoundation", "validateFoundation"],
    ),
    (
        "content_audit",
        &[
            "listDropTables",
            "validateAllDropTables",
            "validateOrphanItemDefinitions",
            "validateEnemyDrops",
        ],
    ),
    ("player_setup", &["ensurePlayerInputStack"]),
];

/// Look up a builtin recipe by exact name.
pub fn lookup(name: &str) -> Option<&'static [&'static str]> {
    BUILTIN
        .iter()
        .find(|(recipe, _)| *recipe == name)
        .map(|(_, ops)| *ops)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}
