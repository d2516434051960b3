//! Actor-backed evaluation context for rotation conditions

use crate::actor::Actor;
use crate::config::SimConfig;
use crate::registry::{Buff, Debuff, Resource, Rune};
use crate::rotation::{CooldownRef, EvalContext};
use std::time::Duration;

/// Reads the actor at its current timestamp.
///
/// Without the Life Tap glyph the Life Tap buff can never be gained, so it
/// reads as permanently active and "refresh when missing" rules stay quiet.
pub struct ActorContext<'a> {
    actor: &'a Actor,
    life_tap_glyph: bool,
}

impl<'a> ActorContext<'a> {
    pub fn new(actor: &'a Actor, config: &SimConfig) -> Self {
        Self {
            actor,
            life_tap_glyph: config.has_rune(Rune::GlyphOfLifeTap),
        }
    }

    fn permanent(&self, buff: Buff) -> bool {
        buff == Buff::LifeTapBuff && !self.life_tap_glyph
    }
}

impl EvalContext for ActorContext<'_> {
    fn buff_active(&self, buff: Buff) -> bool {
        self.permanent(buff) || self.actor.buff_active(buff)
    }

    fn buff_remaining(&self, buff: Buff) -> Duration {
        if self.permanent(buff) {
            return Duration::MAX;
        }
        self.actor.buff(buff).remaining(self.actor.now)
    }

    fn buff_charges(&self, buff: Buff) -> u32 {
        if self.permanent(buff) {
            return 1;
        }
        self.actor.buff_stacks(buff)
    }

    fn debuff_active(&self, debuff: Debuff) -> bool {
        self.actor.debuff_active(debuff)
    }

    fn debuff_remaining(&self, debuff: Debuff) -> Duration {
        self.actor.debuff_aura(debuff).remaining(self.actor.now)
    }

    fn resource_percent(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Mana => self.actor.mana_fraction(),
        }
    }

    fn cooldown_ready(&self, target: CooldownRef) -> bool {
        match target {
            CooldownRef::Spell(spell) => self.actor.cooldown_ready(spell),
            CooldownRef::Item(item) => self.actor.item_ready(item),
        }
    }

    fn cooldown_remaining(&self, target: CooldownRef) -> Duration {
        match target {
            CooldownRef::Spell(spell) => self.actor.cooldown_remaining(spell),
            CooldownRef::Item(item) => self.actor.item_remaining(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Stats;
    use crate::registry::{Item, Spell};

    #[test]
    fn life_tap_buff_is_permanent_without_the_glyph() {
        let config = SimConfig::default();
        let actor = Actor::new(Stats::default(), &config);
        let ctx = ActorContext::new(&actor, &config);
        assert!(ctx.buff_active(Buff::LifeTapBuff));
        assert_eq!(ctx.buff_remaining(Buff::LifeTapBuff), Duration::MAX);

        let mut glyphed = config.clone();
        glyphed.equip(Rune::GlyphOfLifeTap);
        let ctx = ActorContext::new(&actor, &glyphed);
        assert!(!ctx.buff_active(Buff::LifeTapBuff));
    }

    #[test]
    fn reads_live_actor_state() {
        let config = SimConfig::default();
        let mut actor = Actor::new(Stats::default(), &config);
        actor.gain_buff(Buff::Pyroclasm);
        actor.start_cooldown(Spell::ChaosBolt, Duration::from_secs(12));
        actor.start_item_cooldown(Item::RunicManaPotion, Duration::from_secs(60));
        actor.mana = actor.stats.max_mana / 4.0;
        actor.now = Duration::from_secs(2);

        let ctx = ActorContext::new(&actor, &config);
        assert!(ctx.buff_active(Buff::Pyroclasm));
        assert_eq!(ctx.buff_remaining(Buff::Pyroclasm), Duration::from_secs(8));
        assert!(!ctx.debuff_active(Debuff::Immolate));
        assert_eq!(ctx.debuff_remaining(Debuff::Immolate), Duration::ZERO);
        assert_eq!(ctx.resource_percent(Resource::Mana), 0.25);
        assert!(!ctx.cooldown_ready(CooldownRef::Spell(Spell::ChaosBolt)));
        assert_eq!(
            ctx.cooldown_remaining(CooldownRef::Spell(Spell::ChaosBolt)),
            Duration::from_secs(10)
        );
        assert_eq!(
            ctx.cooldown_remaining(CooldownRef::Item(Item::RunicManaPotion)),
            Duration::from_secs(58)
        );
        assert!(ctx.cooldown_ready(CooldownRef::Item(Item::PotionOfWildMagic)));
    }
}
