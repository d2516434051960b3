//! Damage-over-time ticks

use super::*;
use crate::actor::DotSnapshot;

/// One resolved tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    pub debuff: Debuff,
    pub damage: f64,
    pub crit: bool,
    /// Nightfall granted Shadow Trance on this tick.
    pub shadow_trance: bool,
}

/// Curse of Agony ramps: weak for four ticks, normal for four, strong after.
fn agony_stage(tick: u32) -> f64 {
    match tick {
        0 => 1.0,
        1..=4 => 0.5,
        5..=8 => 1.0,
        _ => 1.5,
    }
}

fn roll_chance(rng: &mut impl Rng, chance: f64) -> bool {
    if chance >= 1.0 {
        true
    } else if chance > 0.0 {
        rng.gen::<f64>() < chance
    } else {
        false
    }
}

impl SpellBook<'_> {
    /// Resolve the next tick of `debuff` at the actor's current time.
    ///
    /// Returns `None` when the debuff has lapsed; a tick landing exactly on
    /// the expiry still counts.
    pub fn resolve_tick(
        &self,
        actor: &mut Actor,
        debuff: Debuff,
        rng: &mut impl Rng,
    ) -> Option<TickResult> {
        let now = actor.now;
        let dot = actor.dot(debuff)?;
        if !dot.aura.is_active() || now > dot.aura.expires_at() {
            return None;
        }
        let snapshot = dot.snapshot;
        let tick_number = dot.tick_number();

        let mut crit = false;
        let damage = match snapshot {
            DotSnapshot::None => return None,
            DotSnapshot::Flat {
                tick_damage,
                crit_chance,
            } => {
                let mut damage = if debuff == Debuff::Immolate {
                    tick_damage
                        * self.cataclysmic_burst_multiplier(actor)
                        * self.fire_target_multiplier(actor)
                } else {
                    tick_damage * self.shadow_target_multiplier(actor)
                };
                crit = roll_chance(rng, crit_chance);
                if crit {
                    damage *= self.crit_multiplier();
                }
                damage
            }
            DotSnapshot::Ramped { base_tick, sp_tick } => {
                (base_tick * agony_stage(tick_number) + sp_tick)
                    * self.shadow_target_multiplier(actor)
            }
        };

        if let Some(dot) = actor.dot_mut(debuff) {
            dot.record_tick(now);
        }

        let mut shadow_trance = false;
        match debuff {
            Debuff::Immolate if self.has_rune(Rune::AgentOfChaos) => {
                actor.reduce_cooldown(
                    Spell::ChaosBolt,
                    secs(AGENT_OF_CHAOS_CHAOS_BOLT_REDUCTION),
                );
            }
            Debuff::Corruption => shadow_trance = self.nightfall_proc(actor, rng),
            _ => {}
        }

        Some(TickResult {
            debuff,
            damage,
            crit,
            shadow_trance,
        })
    }

    fn nightfall_proc(&self, actor: &mut Actor, rng: &mut impl Rng) -> bool {
        let nightfall = &self.config.talents.nightfall;
        if nightfall.points == 0 || actor.buff_active(Buff::ShadowTrance) {
            return false;
        }
        let chance = f64::from(nightfall.points) * nightfall.proc_chance_per_point;
        if rng.gen::<f64>() < chance {
            actor.gain_buff(Buff::ShadowTrance);
            true
        } else {
            false
        }
    }
}
