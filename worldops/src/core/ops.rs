//! The closed op catalog.

use std::fmt;

macro_rules! op_catalog {
    ($($variant:ident => $name:literal,)+) => {
        /// Every op the dispatcher understands. Names are case-sensitive.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Op {
            $($variant,)+
        }

        impl Op {
            pub const ALL: &'static [Op] = &[$(Op::$variant,)+];

            pub fn parse(name: &str) -> Option<Op> {
                match name {
                    $($name => Some(Op::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Op::$variant => $name,)+
                }
            }
        }
    };
}

op_catalog! {
    Ping => "ping",
    EnsureSceneRoots => "ensureSceneRoots",
    ValidateSceneRoots => "validateSceneRoots",
    ValidateNoScaledParents => "validateNoScaledParents",
    EnsureFoundation => "ensureFoundation",
    ValidateFoundation => "validateFoundation",
    EnsurePlayerInputStack => "ensurePlayerInputStack",
    RunRecipe => "runRecipe",
    ListScriptableObjectTypes => "listScriptableObjectTypes",
    ListDropTables => "listDropTables",
    ListItemDefinitions => "listItemDefinitions",
    ListGates => "listGates",
    ValidateGate => "validateGate",
    ListEnemies => "listEnemies",
    ListEnemyPrefabs => "listEnemyPrefabs",
    ValidateCommandSchema => "validateCommandSchema",
    ValidateDropTable => "validateDropTable",
    ValidateAllDropTables => "validateAllDropTables",
    ValidateOrphanItemDefinitions => "validateOrphanItemDefinitions",
    ValidateEnemyDrops => "validateEnemyDrops",
    ValidateEnemyPrefabDrops => "validateEnemyPrefabDrops",
}

impl Op {
    /// Ops that may call mutating world methods in Apply mode.
    pub fn is_ensure(self) -> bool {
        matches!(
            self,
            Op::EnsureSceneRoots | Op::EnsureFoundation | Op::EnsurePlayerInputStack
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
