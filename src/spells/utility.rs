//! Life Tap

use super::*;

impl SpellBook<'_> {
    /// Converts health into mana; never misses and ignores Backdraft.
    pub(super) fn life_tap(&self, actor: &mut Actor, _rng: &mut impl Rng) -> CastResult {
        let data = &self.config.spells.life_tap;
        let mut result = self.begin(actor, Spell::LifeTap, 0.0);
        result.hit = true;
        let mana = data.mana_base + actor.stats.spell_power * data.spellpower_coefficient;
        result.mana_gained = actor.gain_mana(mana);

        if self.has_rune(Rune::GlyphOfLifeTap) {
            let bonus = actor.stats.spirit * GLYPH_OF_LIFE_TAP_SPIRIT;
            actor.update_buff(Buff::LifeTapBuff, |aura, now| {
                let change = aura.add_stacks(now, 1);
                aura.set_value(bonus);
                change
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup;
    use super::*;

    #[test]
    fn life_tap_restores_mana() {
        let config = SimConfig::default();
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        actor.mana = 1000.0;

        let result = book.resolve(&mut actor, Spell::LifeTap, &mut rng);
        assert!(result.hit);
        assert_eq!(result.mana_gained, 2000.0 + 1800.0 * 0.5);
        assert_eq!(actor.mana, 3900.0);
        assert!(!actor.buff_active(Buff::LifeTapBuff));
    }

    #[test]
    fn glyph_grants_spell_power() {
        let mut config = SimConfig::default();
        config.equip(Rune::GlyphOfLifeTap);
        let book = SpellBook::new(&config, TargetKind::Boss);
        let (mut actor, mut rng) = setup(&config);
        let before = book.effective_spell_power(&actor);

        book.resolve(&mut actor, Spell::LifeTap, &mut rng);
        assert!(actor.buff_active(Buff::LifeTapBuff));
        let gained = book.effective_spell_power(&actor) - before;
        assert!((gained - actor.stats.spirit * 0.2).abs() < 1e-9);
    }
}
