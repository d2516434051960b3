//! Priority-list rotations: document loading, compilation and evaluation
//!
//! A rotation document is loaded (imports resolved depth-first), compiled
//! against the [`Registry`](crate::registry::Registry) into an immutable
//! [`CompiledRotation`], and then evaluated against an [`EvalContext`] every
//! time the actor may act. Compilation validates everything; evaluation never
//! fails.

mod compiler;
mod condition;
mod loader;

pub use compiler::compile;
pub use condition::{Bounds, Condition, CooldownRef, EvalContext};
pub use loader::{load, LoadedEntry, LoadedRotation};

use crate::error::RotationError;
use crate::registry::{Item, Registry, Spell};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// What a rotation entry does when its condition passes.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    CastSpell(Spell),
    UseItem(Item),
    Wait(Duration),
    /// Sub-actions tried first-match-wins, like the top level.
    Macro(Vec<Action>),
}

/// A compiled rotation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub condition: Condition,
    pub tags: Vec<String>,
}

/// Immutable, thread-shareable output of compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRotation {
    pub name: String,
    pub description: String,
    pub variables: BTreeMap<String, serde_yaml::Value>,
    pub actions: Vec<Action>,
}

impl CompiledRotation {
    /// Total number of actions including macro steps.
    pub fn action_count(&self) -> usize {
        fn count(actions: &[Action]) -> usize {
            actions
                .iter()
                .map(|a| match &a.kind {
                    ActionKind::Macro(steps) => 1 + count(steps),
                    _ => 1,
                })
                .sum()
        }
        count(&self.actions)
    }
}

/// Load a rotation document and compile it against the standard registry.
pub fn load_rotation<P: AsRef<Path>>(path: P) -> Result<CompiledRotation, RotationError> {
    let path = path.as_ref();
    let loaded = load(path)?;
    let rotation = compile(&loaded, Registry::global())?;
    debug!(
        path = %path.display(),
        name = %rotation.name,
        actions = rotation.action_count(),
        "compiled rotation"
    );
    Ok(rotation)
}
