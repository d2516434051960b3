//! Shadow spells and curses

use super::*;
use crate::actor::DotSnapshot;

impl SpellBook<'_> {
    pub(super) fn shadow_bolt(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.shadow_bolt;
        let trance = actor.buff_active(Buff::ShadowTrance);
        let cast_time = if trance { 0.0 } else { data.cast_time };
        let mut result = self.begin(actor, Spell::ShadowBolt, cast_time);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);

        let hit = self.roll_hit(actor, rng);
        if trance {
            actor.clear_buff(Buff::ShadowTrance);
        }
        if !hit {
            return result;
        }
        result.hit = true;

        let base = roll_range(rng, data.base_damage_min, data.base_damage_max);
        let mut damage = self.spell_damage(actor, base, data.sp_coefficient)
            * self.shadow_target_multiplier(actor);
        if self.roll_crit(actor, 0.0, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
        }
        result.damage = damage;
        result
    }

    /// The cooldown starts before the hit roll, so a miss still burns it.
    pub(super) fn shadowburn(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.shadowburn;
        let mut result = self.begin(actor, Spell::Shadowburn, data.cast_time);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        if data.cooldown > 0.0 {
            actor.start_cooldown(Spell::Shadowburn, secs(data.cooldown));
        }
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let base = roll_range(rng, data.base_damage_min, data.base_damage_max);
        let mut damage = self.spell_damage(actor, base, data.sp_coefficient)
            * self.shadow_target_multiplier(actor);
        if self.roll_crit(actor, 0.0, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
        }
        result.damage = damage;
        result
    }

    pub(super) fn corruption(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.corruption;
        let mut result = self.begin(actor, Spell::Corruption, 0.0);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        // a miss leaves any running application and its pending ticks in place
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let ticks = data.dot_ticks.max(1);
        let total = self.spell_damage(actor, data.dot_damage, data.sp_coefficient_dot);
        let snapshot = DotSnapshot::Flat {
            tick_damage: total / f64::from(ticks),
            crit_chance: 0.0,
        };
        let now = actor.now;
        let interval = secs(data.dot_duration / f64::from(ticks));
        let change = actor.corruption.apply(
            now,
            secs(data.dot_duration),
            ticks,
            interval,
            snapshot,
            total,
        );
        actor.note_debuff(Debuff::Corruption, change);
        result.applied_dot = Some(Debuff::Corruption);
        result
    }

    /// Base and spell power components are snapshotted separately so ticks
    /// can ramp the base part by stage.
    pub(super) fn curse_of_agony(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.curse_of_agony;
        let mut result = self.begin(actor, Spell::CurseOfAgony, 0.0);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        // a miss leaves any running application and its pending ticks in place
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let ticks = data.dot_ticks.max(1);
        let base_total = self.spell_damage(actor, data.dot_damage, 0.0);
        let sp_total = self.spell_damage(actor, 0.0, data.sp_coefficient_dot);
        let snapshot = DotSnapshot::Ramped {
            base_tick: base_total / f64::from(ticks),
            sp_tick: sp_total / f64::from(ticks),
        };
        let now = actor.now;
        let interval = secs(data.dot_duration / f64::from(ticks));
        let change = actor.curse_of_agony.apply(
            now,
            secs(data.dot_duration),
            ticks,
            interval,
            snapshot,
            base_total + sp_total,
        );
        actor.note_debuff(Debuff::CurseOfAgony, change);
        result.applied_dot = Some(Debuff::CurseOfAgony);
        result
    }

    /// Always lands.
    pub(super) fn curse_of_the_elements(&self, actor: &mut Actor) -> CastResult {
        let data = &self.config.spells.curse_of_the_elements;
        let mut result = self.begin(actor, Spell::CurseOfTheElements, 0.0);
        self.pay(actor, &mut result, data.mana_cost);
        result.hit = true;
        actor.apply_curse_of_the_elements(secs(data.duration));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup;
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn shadow_trance_makes_shadow_bolt_instant() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        actor.gain_buff(Buff::ShadowTrance);

        let result = book.resolve(&mut actor, Spell::ShadowBolt, &mut rng);
        assert_eq!(result.cast_time, Duration::ZERO);
        assert!(!actor.buff_active(Buff::ShadowTrance));

        let result = book.resolve(&mut actor, Spell::ShadowBolt, &mut rng);
        assert_eq!(result.cast_time, Duration::from_secs_f64(2.5));
    }

    #[test]
    fn shadowburn_cooldown_starts_on_a_miss() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        actor.stats.hit_pct = -1000.0;

        let result = book.resolve(&mut actor, Spell::Shadowburn, &mut rng);
        assert!(!result.hit);
        assert_eq!(result.damage, 0.0);
        assert_eq!(actor.cooldown_remaining(Spell::Shadowburn), Duration::from_secs(15));
    }

    #[test]
    fn curses_snapshot_their_own_way() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        actor.stats.hit_pct = 100.0;

        book.resolve(&mut actor, Spell::Corruption, &mut rng);
        assert!(matches!(
            actor.corruption.snapshot,
            DotSnapshot::Flat { crit_chance, .. } if crit_chance == 0.0
        ));
        assert_eq!(actor.corruption.tick_interval, Duration::from_secs(3));

        book.resolve(&mut actor, Spell::CurseOfAgony, &mut rng);
        match actor.curse_of_agony.snapshot {
            DotSnapshot::Ramped { base_tick, sp_tick } => {
                let expected_base = 1740.0 * 1.25 * 1.15 / 12.0;
                assert!((base_tick - expected_base).abs() < 1e-6);
                assert!(sp_tick > 0.0);
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
        assert_eq!(actor.curse_of_agony.tick_interval, Duration::from_secs(2));
    }

    #[test]
    fn curse_of_the_elements_always_lands() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        actor.stats.hit_pct = -1000.0;
        let result = book.resolve(&mut actor, Spell::CurseOfTheElements, &mut rng);
        assert!(result.hit);
        assert!(actor.debuff_active(Debuff::CurseOfTheElements));
        assert_eq!(book.shadow_target_multiplier(&actor), CURSE_OF_THE_ELEMENTS_BONUS);
    }
}
