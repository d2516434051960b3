//! Compiled condition trees and their evaluation

use crate::registry::{Buff, Debuff, Item, Resource, Spell};
use std::time::Duration;

/// Read-only view of actor state that conditions are evaluated against.
pub trait EvalContext {
    fn buff_active(&self, buff: Buff) -> bool;
    fn buff_remaining(&self, buff: Buff) -> Duration;
    fn buff_charges(&self, buff: Buff) -> u32;
    fn debuff_active(&self, debuff: Debuff) -> bool;
    fn debuff_remaining(&self, debuff: Debuff) -> Duration;
    /// Fraction of the pool, 0..=1.
    fn resource_percent(&self, resource: Resource) -> f64;
    fn cooldown_ready(&self, target: CooldownRef) -> bool;
    fn cooldown_remaining(&self, target: CooldownRef) -> Duration;
}

/// A spell or item with its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownRef {
    Spell(Spell),
    Item(Item),
}

/// Optional comparators; every one that is set must hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub lt: Option<T>,
    pub lte: Option<T>,
    pub gt: Option<T>,
    pub gte: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            lt: None,
            lte: None,
            gt: None,
            gte: None,
        }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn contains(&self, value: T) -> bool {
        self.lt.map_or(true, |b| value < b)
            && self.lte.map_or(true, |b| value <= b)
            && self.gt.map_or(true, |b| value > b)
            && self.gte.map_or(true, |b| value >= b)
    }

    pub fn is_empty(&self) -> bool {
        self.lt.is_none() && self.lte.is_none() && self.gt.is_none() && self.gte.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    BuffActive {
        buff: Buff,
        min_remaining: Option<Duration>,
        max_remaining: Option<Duration>,
    },
    DebuffActive {
        debuff: Debuff,
        min_remaining: Option<Duration>,
        max_remaining: Option<Duration>,
    },
    DotRemaining {
        debuff: Debuff,
        bounds: Bounds<Duration>,
    },
    CooldownReady(CooldownRef),
    CooldownRemaining {
        target: CooldownRef,
        bounds: Bounds<Duration>,
    },
    ResourcePercent {
        resource: Resource,
        bounds: Bounds<f64>,
    },
    Charges {
        buff: Buff,
        bounds: Bounds<i64>,
    },
}

impl Condition {
    pub fn eval(&self, ctx: &dyn EvalContext) -> bool {
        match self {
            Condition::True => true,
            Condition::False => false,
            Condition::All(children) => children.iter().all(|c| c.eval(ctx)),
            Condition::Any(children) => children.iter().any(|c| c.eval(ctx)),
            Condition::Not(child) => !child.eval(ctx),
            Condition::BuffActive {
                buff,
                min_remaining,
                max_remaining,
            } => {
                ctx.buff_active(*buff)
                    && within(ctx.buff_remaining(*buff), *min_remaining, *max_remaining)
            }
            Condition::DebuffActive {
                debuff,
                min_remaining,
                max_remaining,
            } => {
                ctx.debuff_active(*debuff)
                    && within(ctx.debuff_remaining(*debuff), *min_remaining, *max_remaining)
            }
            Condition::DotRemaining { debuff, bounds } => {
                bounds.contains(ctx.debuff_remaining(*debuff))
            }
            Condition::CooldownReady(target) => ctx.cooldown_ready(*target),
            Condition::CooldownRemaining { target, bounds } => {
                bounds.contains(ctx.cooldown_remaining(*target))
            }
            Condition::ResourcePercent { resource, bounds } => {
                bounds.contains(ctx.resource_percent(*resource))
            }
            Condition::Charges { buff, bounds } => {
                bounds.contains(i64::from(ctx.buff_charges(*buff)))
            }
        }
    }
}

fn within(remaining: Duration, min: Option<Duration>, max: Option<Duration>) -> bool {
    min.map_or(true, |m| remaining >= m) && max.map_or(true, |m| remaining <= m)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned readings, no actor involved.
    #[derive(Default)]
    struct FakeContext {
        buffs: Vec<(Buff, Duration, u32)>,
        debuffs: Vec<(Debuff, Duration)>,
        mana: f64,
        cooldowns: Vec<(CooldownRef, Duration)>,
    }

    impl EvalContext for FakeContext {
        fn buff_active(&self, buff: Buff) -> bool {
            self.buffs.iter().any(|(b, _, _)| *b == buff)
        }
        fn buff_remaining(&self, buff: Buff) -> Duration {
            self.buffs
                .iter()
                .find(|(b, _, _)| *b == buff)
                .map_or(Duration::ZERO, |(_, r, _)| *r)
        }
        fn buff_charges(&self, buff: Buff) -> u32 {
            self.buffs
                .iter()
                .find(|(b, _, _)| *b == buff)
                .map_or(0, |(_, _, c)| *c)
        }
        fn debuff_active(&self, debuff: Debuff) -> bool {
            self.debuffs.iter().any(|(d, _)| *d == debuff)
        }
        fn debuff_remaining(&self, debuff: Debuff) -> Duration {
            self.debuffs
                .iter()
                .find(|(d, _)| *d == debuff)
                .map_or(Duration::ZERO, |(_, r)| *r)
        }
        fn resource_percent(&self, _resource: Resource) -> f64 {
            self.mana
        }
        fn cooldown_ready(&self, target: CooldownRef) -> bool {
            self.cooldown_remaining(target).is_zero()
        }
        fn cooldown_remaining(&self, target: CooldownRef) -> Duration {
            self.cooldowns
                .iter()
                .find(|(t, _)| *t == target)
                .map_or(Duration::ZERO, |(_, r)| *r)
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn logical_combinators() {
        let ctx = FakeContext::default();
        assert!(Condition::All(vec![]).eval(&ctx));
        assert!(!Condition::Any(vec![]).eval(&ctx));
        assert!(Condition::Any(vec![Condition::False, Condition::True]).eval(&ctx));
        assert!(!Condition::All(vec![Condition::True, Condition::False]).eval(&ctx));
        assert!(Condition::Not(Box::new(Condition::False)).eval(&ctx));
    }

    #[test]
    fn dot_remaining_combines_comparators() {
        let ctx = FakeContext {
            debuffs: vec![(Debuff::Immolate, secs(2.5))],
            ..Default::default()
        };
        let window = Condition::DotRemaining {
            debuff: Debuff::Immolate,
            bounds: Bounds {
                lt: Some(secs(3.0)),
                gte: Some(secs(2.0)),
                ..Default::default()
            },
        };
        assert!(window.eval(&ctx));

        let missing = Condition::DotRemaining {
            debuff: Debuff::Corruption,
            bounds: Bounds {
                lt: Some(secs(3.0)),
                gt: Some(secs(1.0)),
                ..Default::default()
            },
        };
        assert!(!missing.eval(&ctx), "zero remaining fails gt");
    }

    #[test]
    fn buff_active_respects_remaining_window() {
        let ctx = FakeContext {
            buffs: vec![(Buff::Backdraft, secs(6.0), 2)],
            ..Default::default()
        };
        let cond = |min: Option<f64>, max: Option<f64>| Condition::BuffActive {
            buff: Buff::Backdraft,
            min_remaining: min.map(secs),
            max_remaining: max.map(secs),
        };
        assert!(cond(None, None).eval(&ctx));
        assert!(cond(Some(5.0), Some(6.0)).eval(&ctx));
        assert!(!cond(Some(7.0), None).eval(&ctx));
        assert!(!Condition::BuffActive {
            buff: Buff::Pyroclasm,
            min_remaining: None,
            max_remaining: None
        }
        .eval(&ctx));

        let charges = Condition::Charges {
            buff: Buff::Backdraft,
            bounds: Bounds {
                gte: Some(2),
                lt: Some(3),
                ..Default::default()
            },
        };
        assert!(charges.eval(&ctx));
    }

    #[test]
    fn resource_and_cooldowns() {
        let ctx = FakeContext {
            mana: 0.25,
            cooldowns: vec![(CooldownRef::Spell(Spell::ChaosBolt), secs(4.0))],
            ..Default::default()
        };
        let low_mana = Condition::ResourcePercent {
            resource: Resource::Mana,
            bounds: Bounds {
                lt: Some(0.3),
                ..Default::default()
            },
        };
        assert!(low_mana.eval(&ctx));
        assert!(!Condition::CooldownReady(CooldownRef::Spell(Spell::ChaosBolt)).eval(&ctx));
        assert!(Condition::CooldownReady(CooldownRef::Item(Item::RunicManaPotion)).eval(&ctx));
        assert!(Condition::CooldownRemaining {
            target: CooldownRef::Spell(Spell::ChaosBolt),
            bounds: Bounds {
                lte: Some(secs(4.0)),
                ..Default::default()
            },
        }
        .eval(&ctx));
    }
}
