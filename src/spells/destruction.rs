//! Fire spells: Immolate, Incinerate, Chaos Bolt, Conflagrate, Soul Fire

use super::*;
use crate::actor::DotSnapshot;

impl SpellBook<'_> {
    pub(super) fn immolate(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.immolate;
        let mut result = self.begin(actor, Spell::Immolate, data.cast_time);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        // a miss leaves any running application and its pending ticks in place
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let agent = self.has_rune(Rune::AgentOfChaos);
        let base_ticks = data.dot_ticks.max(1);
        let (mut duration, mut ticks) = (data.dot_duration, base_ticks);
        if agent {
            duration += AGENT_OF_CHAOS_EXTRA_SECONDS;
            ticks += AGENT_OF_CHAOS_EXTRA_TICKS;
        }
        let haste = if agent { actor.haste_multiplier() } else { 1.0 };
        let improved = self.config.talents.improved_immolate.damage_multiplier;
        let mastery = self.has_rune(Rune::DestructionMastery);

        let forced = self.consume_empowered_imp(actor);
        let mut direct =
            self.spell_damage(actor, data.direct_damage, data.sp_coefficient_direct) * improved;
        if mastery {
            direct *= DESTRUCTION_MASTERY_IMMOLATE;
        }
        if agent {
            direct *= AGENT_OF_CHAOS_DIRECT_PENALTY;
        }
        let crit = forced || self.roll_crit(actor, 0.0, rng);
        if crit {
            direct *= self.crit_multiplier();
        }
        direct *= self.fire_target_multiplier(actor);

        let mut total = self.spell_damage(actor, data.dot_damage, data.sp_coefficient_dot)
            * improved
            * self.config.talents.aftermath.dot_damage_multiplier;
        if mastery {
            total *= DESTRUCTION_MASTERY_IMMOLATE;
        }
        if agent {
            total *= f64::from(ticks) / f64::from(base_ticks);
        }
        let snapshot = DotSnapshot::Flat {
            tick_damage: total / f64::from(ticks),
            crit_chance: self.snapshot_crit(actor, 0.0),
        };

        result.crit = crit;
        result.damage = direct;
        result.mana_gained += self.soul_leech_proc(actor, rng);

        let now = actor.now;
        let interval = secs(duration / f64::from(ticks) / haste);
        let change = actor
            .immolate
            .apply(now, secs(duration / haste), ticks, interval, snapshot, total);
        actor.note_debuff(Debuff::Immolate, change);
        result.applied_dot = Some(Debuff::Immolate);
        result
    }

    pub(super) fn incinerate(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.incinerate;
        let mut result = self.begin(actor, Spell::Incinerate, data.cast_time);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let immolated = actor.debuff_active(Debuff::Immolate);
        let mut base = roll_range(rng, data.base_damage_min, data.base_damage_max);
        if immolated {
            base += roll_range(rng, data.immolate_bonus_min, data.immolate_bonus_max);
        }
        let mut damage = self.spell_damage(actor, base, data.sp_coefficient);
        damage = self.fire_and_brimstone(actor, Spell::Incinerate, damage);
        damage *= self.fire_target_multiplier(actor);
        if self.roll_crit(actor, 0.0, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
        }
        if self.has_rune(Rune::GlyphOfIncinerate) {
            damage *= GLYPH_OF_INCINERATE_BONUS;
        }
        result.damage = damage;

        if self.has_rune(Rune::CataclysmicBurst) && immolated {
            actor.gain_buff(Buff::CataclysmicBurst);
            actor
                .immolate
                .aura
                .extend(secs(CATACLYSMIC_BURST_EXTEND_SECONDS));
        }
        result.mana_gained += self.soul_leech_proc(actor, rng);
        result
    }

    pub(super) fn chaos_bolt(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.chaos_bolt;
        let mut result = self.begin(actor, Spell::ChaosBolt, data.cast_time);
        if self.has_rune(Rune::GuldansChosen) {
            actor.update_buff(Buff::GuldansChosen, |aura, now| aura.set_stacks(now, 1));
        }
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let base = roll_range(rng, data.base_damage_min, data.base_damage_max);
        let mut damage = self.spell_damage(actor, base, data.sp_coefficient);
        damage = self.fire_and_brimstone(actor, Spell::ChaosBolt, damage);
        damage *= self.fire_target_multiplier(actor);
        if self.roll_crit(actor, 0.0, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
        }
        result.damage = damage;
        result.mana_gained += self.soul_leech_proc(actor, rng);

        let mut cooldown = data.cooldown;
        if self.has_rune(Rune::GlyphOfChaosBolt) {
            cooldown -= GLYPH_OF_CHAOS_BOLT_REDUCTION;
        }
        actor.start_cooldown(Spell::ChaosBolt, secs(cooldown));
        result
    }

    pub(super) fn conflagrate(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.conflagrate;
        let talents = &self.config.talents;
        let mut result = self.begin(actor, Spell::Conflagrate, 0.0);
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let mut dot_total = actor.immolate.snapshot_total;
        if !(actor.debuff_active(Debuff::Immolate) && dot_total > 0.0) {
            let immolate = &self.config.spells.immolate;
            dot_total = self.spell_damage(actor, immolate.dot_damage, immolate.sp_coefficient_dot)
                * talents.improved_immolate.damage_multiplier
                * talents.aftermath.dot_damage_multiplier;
        }
        dot_total *= self.cataclysmic_burst_multiplier(actor);

        let mut damage = dot_total
            * data.immolate_dot_percentage
            * talents.emberstorm.damage_multiplier
            * self.fire_target_multiplier(actor);
        let bonus = talents.fire_and_brimstone.conflagrate_crit_bonus;
        if self.consume_empowered_imp(actor) || self.roll_crit(actor, bonus, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
            if talents.pyroclasm.points > 0 {
                actor.gain_buff(Buff::Pyroclasm);
            }
        }
        result.damage = damage + damage * data.conflag_dot_percentage;

        self.add_heating_up(actor);
        result.mana_gained += self.soul_leech_proc(actor, rng);
        if self.has_rune(Rune::DecisiveDecimation) {
            actor.gain_buff(Buff::DecisiveDecimation);
        }
        if self.has_rune(Rune::CataclysmicBurst) {
            actor.clear_buff(Buff::CataclysmicBurst);
        }
        if !self.has_rune(Rune::GlyphOfConflagrate) {
            actor.clear_dot(Debuff::Immolate);
        }
        self.grant_backdraft(actor);
        actor.start_cooldown(Spell::Conflagrate, secs(data.cooldown));
        result
    }

    pub(super) fn soul_fire(&self, actor: &mut Actor, rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.soul_fire;
        let mut result = self.begin(actor, Spell::SoulFire, data.cast_time);
        if actor.buff_active(Buff::DecisiveDecimation) {
            result.cast_time = scale(result.cast_time, 1.0 - DECISIVE_DECIMATION_CAST_REDUCTION);
            actor.clear_buff(Buff::DecisiveDecimation);
        }
        self.apply_backdraft(actor, &mut result);
        self.pay(actor, &mut result, data.mana_cost);
        if !self.roll_hit(actor, rng) {
            return result;
        }
        result.hit = true;

        let base = roll_range(rng, data.base_damage_min, data.base_damage_max);
        let mut damage = self.spell_damage(actor, base, data.sp_coefficient);
        damage *= self.fire_target_multiplier(actor);
        if self.consume_empowered_imp(actor) || self.roll_crit(actor, 0.0, rng) {
            result.crit = true;
            damage *= self.crit_multiplier();
        }
        result.damage = damage;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup;
    use super::*;
    use crate::config::SimConfig;

    fn capped(config: &SimConfig) -> (Actor, rand::rngs::SmallRng) {
        let (mut actor, rng) = setup(config);
        actor.stats.hit_pct = 100.0;
        (actor, rng)
    }

    #[test]
    fn immolate_applies_a_snapshotted_dot() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);

        let result = book.resolve(&mut actor, Spell::Immolate, &mut rng);
        assert!(result.hit);
        assert!(result.damage > 0.0);
        assert_eq!(result.applied_dot, Some(Debuff::Immolate));
        assert_eq!(result.mana_spent, config.spells.immolate.mana_cost);
        assert!(actor.debuff_active(Debuff::Immolate));
        assert_eq!(actor.immolate.total_ticks, 5);
        assert_eq!(actor.immolate.tick_interval, Duration::from_secs(3));
        match actor.immolate.snapshot {
            DotSnapshot::Flat { tick_damage, .. } => {
                assert!((tick_damage * 5.0 - actor.immolate.snapshot_total).abs() < 1e-6)
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
    }

    #[test]
    fn missed_immolate_keeps_the_running_dot() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);
        book.resolve(&mut actor, Spell::Immolate, &mut rng);
        let mut queue = crate::scheduler::EventQueue::new();
        let handle = queue.schedule(Duration::from_secs(3), ());
        actor.immolate.set_handle(Some(handle));
        let snapshot = actor.immolate.snapshot_total;
        let expires = actor.immolate.aura.expires_at();

        actor.now = Duration::from_secs(1);
        actor.stats.hit_pct = -1000.0;
        let result = book.resolve(&mut actor, Spell::Immolate, &mut rng);
        assert!(!result.hit);
        assert_eq!(result.applied_dot, None);
        assert!(actor.debuff_active(Debuff::Immolate));
        assert!(actor.immolate.has_pending_tick());
        assert_eq!(actor.immolate.snapshot_total, snapshot);
        assert_eq!(actor.immolate.aura.expires_at(), expires);
    }

    #[test]
    fn agent_of_chaos_extends_and_hastes_immolate() {
        let mut config = SimConfig::default();
        config.equip(Rune::AgentOfChaos);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);
        actor.stats.haste_pct = 20.0;

        book.resolve(&mut actor, Spell::Immolate, &mut rng);
        assert_eq!(actor.immolate.total_ticks, 6);
        let expected = 18.0 / 6.0 / 1.2;
        assert!((actor.immolate.tick_interval.as_secs_f64() - expected).abs() < 1e-6);
        assert!((actor.immolate.aura.expires_at().as_secs_f64() - 15.0).abs() < 1e-6);
    }

    #[test]
    fn conflagrate_consumes_immolate_and_grants_backdraft() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);

        book.resolve(&mut actor, Spell::Immolate, &mut rng);
        let snapshot = actor.immolate.snapshot_total;
        let result = book.resolve(&mut actor, Spell::Conflagrate, &mut rng);
        assert!(result.hit);
        assert!(!actor.debuff_active(Debuff::Immolate));
        assert_eq!(actor.buff_stacks(Buff::Backdraft), 3);
        assert!(!actor.cooldown_ready(Spell::Conflagrate));

        let base = snapshot * 0.6 * 1.15;
        let expected = if result.crit { base * 2.0 * 1.4 } else { base * 1.4 };
        assert!((result.damage - expected).abs() < 1e-6);
        if result.crit {
            assert!(actor.buff_active(Buff::Pyroclasm));
        }
    }

    #[test]
    fn glyph_of_conflagrate_keeps_immolate() {
        let mut config = SimConfig::default();
        config.equip(Rune::GlyphOfConflagrate);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);
        book.resolve(&mut actor, Spell::Immolate, &mut rng);
        book.resolve(&mut actor, Spell::Conflagrate, &mut rng);
        assert!(actor.debuff_active(Debuff::Immolate));
    }

    #[test]
    fn chaos_bolt_starts_its_cooldown_and_guldans_chosen() {
        let mut config = SimConfig::default();
        config.equip(Rune::GuldansChosen);
        config.equip(Rune::GlyphOfChaosBolt);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);

        book.resolve(&mut actor, Spell::ChaosBolt, &mut rng);
        assert_eq!(actor.cooldown_remaining(Spell::ChaosBolt), Duration::from_secs(10));
        assert!(actor.buff_active(Buff::GuldansChosen));
    }

    #[test]
    fn incinerate_feeds_cataclysmic_burst() {
        let mut config = SimConfig::default();
        config.equip(Rune::CataclysmicBurst);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);

        book.resolve(&mut actor, Spell::Incinerate, &mut rng);
        assert_eq!(actor.buff_stacks(Buff::CataclysmicBurst), 0, "needs Immolate");

        book.resolve(&mut actor, Spell::Immolate, &mut rng);
        let expiry = actor.immolate.aura.expires_at();
        book.resolve(&mut actor, Spell::Incinerate, &mut rng);
        assert_eq!(actor.buff_stacks(Buff::CataclysmicBurst), 1);
        assert_eq!(actor.immolate.aura.expires_at(), expiry + Duration::from_secs(2));
    }

    #[test]
    fn decisive_decimation_speeds_up_soul_fire() {
        let mut config = SimConfig::default();
        config.equip(Rune::DecisiveDecimation);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);

        book.resolve(&mut actor, Spell::Conflagrate, &mut rng);
        assert!(actor.buff_active(Buff::DecisiveDecimation));
        // Backdraft from Conflagrate also applies
        let result = book.resolve(&mut actor, Spell::SoulFire, &mut rng);
        assert!(!actor.buff_active(Buff::DecisiveDecimation));
        assert!((result.cast_time.as_secs_f64() - 6.0 * 0.7 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn empowered_imp_forces_a_crit() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = capped(&config);
        actor.stats.crit_pct = -100.0;
        actor.gain_buff(Buff::EmpoweredImp);

        let result = book.resolve(&mut actor, Spell::SoulFire, &mut rng);
        assert!(result.crit);
        assert!(!actor.buff_active(Buff::EmpoweredImp));
        let result = book.resolve(&mut actor, Spell::SoulFire, &mut rng);
        assert!(!result.crit);
    }
}
