//! Compile loaded rotation entries into actions and condition trees
//!
//! Every identifier is resolved against the registry and every `${var}`
//! reference against the variable table here, so nothing is left to fail at
//! evaluation time.

use super::condition::{Bounds, Condition, CooldownRef};
use super::loader::LoadedRotation;
use super::{Action, ActionKind, CompiledRotation};
use crate::error::RotationError;
use crate::registry::{normalize, Registry};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::time::Duration;

type Variables = BTreeMap<String, Value>;

/// One entry of the `rotation:` list before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionDefinition {
    action: String,
    #[serde(default, alias = "ability")]
    spell: Option<String>,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    duration_seconds: Option<Value>,
    #[serde(default)]
    steps: Vec<Value>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    when: Option<Value>,
}

/// Compile a loaded document; the first failing entry aborts compilation.
pub fn compile(
    loaded: &LoadedRotation,
    registry: &Registry,
) -> Result<CompiledRotation, RotationError> {
    let compiler = Compiler {
        registry,
        variables: &loaded.variables,
    };
    let actions = loaded
        .entries
        .iter()
        .map(|entry| {
            compiler
                .action(&entry.definition)
                .map_err(|source| RotationError::Entry {
                    path: entry.origin.clone(),
                    index: entry.index,
                    source: Box::new(source),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledRotation {
        name: loaded.name.clone(),
        description: loaded.description.clone(),
        variables: loaded.variables.clone(),
        actions,
    })
}

struct Compiler<'a> {
    registry: &'a Registry,
    variables: &'a Variables,
}

impl Compiler<'_> {
    fn action(&self, raw: &Value) -> Result<Action, RotationError> {
        let def: ActionDefinition = serde_yaml::from_value(raw.clone())
            .map_err(|e| RotationError::Malformed(e.to_string()))?;

        let condition = match &def.when {
            Some(node) => self.condition(node)?,
            None => Condition::True,
        };

        let kind = match normalize(&def.action).as_str() {
            "cast_spell" | "cast" | "cast_ability" => {
                let name = def
                    .spell
                    .as_deref()
                    .ok_or_else(|| RotationError::MissingField("spell".to_string()))?;
                let name = self.resolve_string(&Value::from(name), "spell")?;
                let spell = self
                    .registry
                    .spell(&name)
                    .ok_or(RotationError::UnknownSpell(name))?;
                ActionKind::CastSpell(spell)
            }
            "use_item" => {
                let name = def
                    .item
                    .as_deref()
                    .ok_or_else(|| RotationError::MissingField("item".to_string()))?;
                let name = self.resolve_string(&Value::from(name), "item")?;
                let item = self
                    .registry
                    .item(&name)
                    .ok_or(RotationError::UnknownItem(name))?;
                ActionKind::UseItem(item)
            }
            "wait" => {
                let raw = def
                    .duration_seconds
                    .as_ref()
                    .ok_or_else(|| RotationError::MissingField("duration_seconds".to_string()))?;
                let seconds = self.resolve_f64(raw, "duration_seconds")?;
                if !(seconds.is_finite() && seconds > 0.0) {
                    return Err(RotationError::InvalidField {
                        field: "duration_seconds".to_string(),
                        message: format!("must be > 0 (got {seconds})"),
                    });
                }
                ActionKind::Wait(to_duration(seconds, "duration_seconds")?)
            }
            "macro" => {
                if def.steps.is_empty() {
                    return Err(RotationError::InvalidField {
                        field: "steps".to_string(),
                        message: "macro requires at least one step".to_string(),
                    });
                }
                let steps = def
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(index, step)| {
                        self.action(step).map_err(|source| RotationError::Step {
                            index,
                            source: Box::new(source),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ActionKind::Macro(steps)
            }
            _ => return Err(RotationError::UnsupportedAction(def.action.clone())),
        };

        Ok(Action {
            kind,
            condition,
            tags: def.tags,
        })
    }

    fn condition(&self, node: &Value) -> Result<Condition, RotationError> {
        match node {
            Value::Bool(true) => Ok(Condition::True),
            Value::Bool(false) => Ok(Condition::False),
            Value::Sequence(children) => Ok(Condition::All(self.children(children)?)),
            Value::Mapping(map) => self.condition_mapping(map),
            Value::Tagged(tagged) => self.condition(&tagged.value),
            Value::String(_) => match self.resolve(node)? {
                Value::Bool(b) => Ok(if b { Condition::True } else { Condition::False }),
                other => Err(RotationError::Malformed(format!(
                    "unsupported scalar condition: {}",
                    describe(&other)
                ))),
            },
            other => Err(RotationError::Malformed(format!(
                "unsupported scalar condition: {}",
                describe(other)
            ))),
        }
    }

    fn children(&self, nodes: &[Value]) -> Result<Vec<Condition>, RotationError> {
        nodes
            .iter()
            .enumerate()
            .map(|(index, child)| {
                self.condition(child)
                    .map_err(|e| e.in_condition(format!("condition {index}")))
            })
            .collect()
    }

    fn sequence<'v>(&self, node: &'v Value, key: &str) -> Result<&'v [Value], RotationError> {
        node.as_sequence().map(Vec::as_slice).ok_or_else(|| {
            RotationError::Malformed(format!("expected sequence, got {}", describe(node)))
                .in_condition(key)
        })
    }

    fn condition_mapping(&self, map: &Mapping) -> Result<Condition, RotationError> {
        if map.len() != 1 {
            return Err(RotationError::Malformed(
                "condition mapping must have exactly one entry".to_string(),
            ));
        }
        let Some((key, value)) = map.iter().next() else {
            return Err(RotationError::Malformed("empty condition mapping".to_string()));
        };
        // YAML reads bare `true:`/`false:` keys as booleans
        let key = match key {
            Value::String(s) => s.as_str(),
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
            _ => {
                return Err(RotationError::Malformed(
                    "condition key must be a string".to_string(),
                ))
            }
        };

        match key {
            "all" => {
                let nodes = self.sequence(value, "all")?;
                Ok(Condition::All(self.children(nodes).map_err(|e| e.in_condition("all"))?))
            }
            "any" => {
                let nodes = self.sequence(value, "any")?;
                Ok(Condition::Any(self.children(nodes).map_err(|e| e.in_condition("any"))?))
            }
            "not" => {
                let child = self.condition(value).map_err(|e| e.in_condition("not"))?;
                Ok(Condition::Not(Box::new(child)))
            }
            "true" => Ok(Condition::True),
            "false" => Ok(Condition::False),
            "buff_active" => {
                let params = Params::new(value, &["buff", "min_remaining", "max_remaining"])?;
                let name = self.required_string(&params, "buff")?;
                Ok(Condition::BuffActive {
                    buff: self.buff(&name)?,
                    min_remaining: self.duration(&params, "min_remaining")?,
                    max_remaining: self.duration(&params, "max_remaining")?,
                })
            }
            "debuff_active" => {
                let params = Params::new(value, &["debuff", "min_remaining", "max_remaining"])?;
                let name = self.required_string(&params, "debuff")?;
                Ok(Condition::DebuffActive {
                    debuff: self.debuff(&name)?,
                    min_remaining: self.duration(&params, "min_remaining")?,
                    max_remaining: self.duration(&params, "max_remaining")?,
                })
            }
            "dot_remaining" => {
                let params = Params::new(
                    value,
                    &["spell", "lt_seconds", "lte_seconds", "gt_seconds", "gte_seconds"],
                )?;
                let name = self.required_string(&params, "spell")?;
                Ok(Condition::DotRemaining {
                    debuff: self.debuff(&name)?,
                    bounds: self.duration_bounds(&params)?,
                })
            }
            "cooldown_ready" => {
                let params = Params::new(value, &["spell", "item"])?;
                Ok(Condition::CooldownReady(self.cooldown_ref(&params)?))
            }
            "cooldown_remaining" => {
                let params = Params::new(
                    value,
                    &["spell", "item", "lt_seconds", "lte_seconds", "gt_seconds", "gte_seconds"],
                )?;
                Ok(Condition::CooldownRemaining {
                    target: self.cooldown_ref(&params)?,
                    bounds: self.duration_bounds(&params)?,
                })
            }
            "resource_percent" => {
                let params = Params::new(value, &["resource", "lt", "lte", "gt", "gte"])?;
                let name = self.required_string(&params, "resource")?;
                let resource = self
                    .registry
                    .resource(&name)
                    .ok_or(RotationError::UnknownResource(name))?;
                Ok(Condition::ResourcePercent {
                    resource,
                    bounds: Bounds {
                        lt: self.float(&params, "lt")?,
                        lte: self.float(&params, "lte")?,
                        gt: self.float(&params, "gt")?,
                        gte: self.float(&params, "gte")?,
                    },
                })
            }
            "charges" => {
                let params = Params::new(value, &["buff", "lt", "lte", "gt", "gte"])?;
                let name = self.required_string(&params, "buff")?;
                Ok(Condition::Charges {
                    buff: self.buff(&name)?,
                    bounds: Bounds {
                        lt: self.int(&params, "lt")?,
                        lte: self.int(&params, "lte")?,
                        gt: self.int(&params, "gt")?,
                        gte: self.int(&params, "gte")?,
                    },
                })
            }
            other => Err(RotationError::UnknownCondition(other.to_string())),
        }
    }

    // ---------------------------------------------------------------
    // identifiers
    // ---------------------------------------------------------------

    fn buff(&self, name: &str) -> Result<crate::registry::Buff, RotationError> {
        self.registry
            .buff(name)
            .ok_or_else(|| RotationError::UnknownBuff(name.to_string()))
    }

    fn debuff(&self, name: &str) -> Result<crate::registry::Debuff, RotationError> {
        self.registry
            .debuff(name)
            .ok_or_else(|| RotationError::UnknownDebuff(name.to_string()))
    }

    fn cooldown_ref(&self, params: &Params) -> Result<CooldownRef, RotationError> {
        if params.get("spell").is_some() && params.get("item").is_some() {
            return Err(RotationError::InvalidField {
                field: "item".to_string(),
                message: "give either spell or item, not both".to_string(),
            });
        }
        if let Some(name) = self.string(params, "spell")? {
            let spell = self
                .registry
                .spell(&name)
                .ok_or(RotationError::UnknownSpell(name))?;
            return Ok(CooldownRef::Spell(spell));
        }
        match self.string(params, "item")? {
            Some(name) => {
                let item = self
                    .registry
                    .item(&name)
                    .ok_or(RotationError::UnknownItem(name))?;
                Ok(CooldownRef::Item(item))
            }
            None => Err(RotationError::MissingField("spell".to_string())),
        }
    }

    // ---------------------------------------------------------------
    // scalar fields
    // ---------------------------------------------------------------

    fn resolve(&self, value: &Value) -> Result<Value, RotationError> {
        if let Some(s) = value.as_str() {
            let trimmed = s.trim();
            if let Some(name) = trimmed
                .strip_prefix("${")
                .and_then(|rest| rest.strip_suffix('}'))
            {
                let name = name.trim();
                return self
                    .variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RotationError::UndefinedVariable(name.to_string()));
            }
        }
        Ok(value.clone())
    }

    fn resolve_string(&self, value: &Value, field: &str) -> Result<String, RotationError> {
        match self.resolve(value)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(RotationError::InvalidField {
                field: field.to_string(),
                message: format!("expected a string, got {}", describe(&other)),
            }),
        }
    }

    fn resolve_f64(&self, value: &Value, field: &str) -> Result<f64, RotationError> {
        let invalid = |message: String| RotationError::InvalidField {
            field: field.to_string(),
            message,
        };
        match self.resolve(value)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| invalid(format!("cannot convert {n} to a number"))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(format!("cannot convert '{s}' to a number"))),
            other => Err(invalid(format!("expected a number, got {}", describe(&other)))),
        }
    }

    fn string(&self, params: &Params, key: &str) -> Result<Option<String>, RotationError> {
        params
            .get(key)
            .map(|v| self.resolve_string(v, key))
            .transpose()
    }

    fn required_string(&self, params: &Params, key: &str) -> Result<String, RotationError> {
        self.string(params, key)?
            .ok_or_else(|| RotationError::MissingField(key.to_string()))
    }

    fn float(&self, params: &Params, key: &str) -> Result<Option<f64>, RotationError> {
        params.get(key).map(|v| self.resolve_f64(v, key)).transpose()
    }

    fn int(&self, params: &Params, key: &str) -> Result<Option<i64>, RotationError> {
        let Some(raw) = params.get(key) else {
            return Ok(None);
        };
        let invalid = |message: String| RotationError::InvalidField {
            field: key.to_string(),
            message,
        };
        match self.resolve(raw)? {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(i)),
                (None, Some(f))
                    if f.is_finite()
                        && f.fract() == 0.0
                        && f >= i64::MIN as f64
                        && f <= i64::MAX as f64 =>
                {
                    Ok(Some(f as i64))
                }
                (None, Some(_)) => Err(invalid("expected an integer".to_string())),
                _ => Err(invalid(format!("cannot convert {n} to an integer"))),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(format!("cannot convert '{s}' to an integer"))),
            other => Err(invalid(format!("expected an integer, got {}", describe(&other)))),
        }
    }

    fn duration(&self, params: &Params, key: &str) -> Result<Option<Duration>, RotationError> {
        match self.float(params, key)? {
            None => Ok(None),
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                to_duration(seconds, key).map(Some)
            }
            Some(seconds) => Err(RotationError::InvalidField {
                field: key.to_string(),
                message: format!("must be a non-negative number of seconds (got {seconds})"),
            }),
        }
    }

    fn duration_bounds(&self, params: &Params) -> Result<Bounds<Duration>, RotationError> {
        Ok(Bounds {
            lt: self.duration(params, "lt_seconds")?,
            lte: self.duration(params, "lte_seconds")?,
            gt: self.duration(params, "gt_seconds")?,
            gte: self.duration(params, "gte_seconds")?,
        })
    }
}

/// A predicate's parameter bag, checked against its allowed keys.
struct Params<'v> {
    fields: BTreeMap<&'v str, &'v Value>,
}

impl<'v> Params<'v> {
    fn new(node: &'v Value, allowed: &[&str]) -> Result<Self, RotationError> {
        let map = node.as_mapping().ok_or_else(|| {
            RotationError::Malformed(format!("expected mapping node, got {}", describe(node)))
        })?;
        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let key = key.as_str().ok_or_else(|| {
                RotationError::Malformed("parameter keys must be strings".to_string())
            })?;
            if !allowed.contains(&key) {
                return Err(RotationError::InvalidField {
                    field: key.to_string(),
                    message: format!("unknown parameter (expected one of: {})", allowed.join(", ")),
                });
            }
            fields.insert(key, value);
        }
        Ok(Self { fields })
    }

    fn get(&self, key: &str) -> Option<&'v Value> {
        self.fields.get(key).copied()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn to_duration(seconds: f64, key: &str) -> Result<Duration, RotationError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| RotationError::InvalidField {
        field: key.to_string(),
        message: format!("out of range (got {seconds})"),
    })
}
