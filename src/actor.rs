//! Simulated character state: stats, mana, cooldowns and auras

use crate::aura::{Aura, AuraChange, Timer};
use crate::config::{secs, PlayerStats, SimConfig};
use crate::registry::{Buff, Debuff, Item, Spell};
use crate::scheduler::EventHandle;
use std::collections::HashMap;
use std::time::Duration;

const CATACLYSMIC_BURST_MAX_STACKS: u32 = 4;
const HEATING_UP_MAX_STACKS: u32 = 5;
const HEATING_UP_DURATION: f64 = 15.0;
const GULDANS_CHOSEN_DURATION: f64 = 4.0;
const LIFE_TAP_BUFF_DURATION: f64 = 40.0;

/// Static stat block; percentages are whole numbers (25.0 = 25%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub spell_power: f64,
    pub crit_pct: f64,
    pub haste_pct: f64,
    pub spirit: f64,
    pub hit_pct: f64,
    pub max_mana: f64,
    pub intellect: f64,
}

impl From<&PlayerStats> for Stats {
    fn from(stats: &PlayerStats) -> Self {
        Self {
            spell_power: stats.spell_power,
            crit_pct: stats.crit_percent,
            haste_pct: stats.haste_percent,
            spirit: stats.spirit,
            hit_pct: stats.hit_percent,
            max_mana: stats.max_mana,
            intellect: stats.intellect,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::from(&PlayerStats::default())
    }
}

/// Damage captured when a periodic effect is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DotSnapshot {
    #[default]
    None,
    /// Same damage every tick, optionally able to crit.
    Flat { tick_damage: f64, crit_chance: f64 },
    /// Curse of Agony: `base_tick` scales with the tick's stage, `sp_tick` does not.
    Ramped { base_tick: f64, sp_tick: f64 },
}

/// A periodic-damage debuff on the target.
#[derive(Debug, Clone)]
pub struct Dot {
    pub aura: Aura,
    pub tick_interval: Duration,
    pub last_tick: Duration,
    pub ticks_remaining: u32,
    pub total_ticks: u32,
    pub ticks_done: u32,
    pub snapshot: DotSnapshot,
    /// Total damage the application was snapshotted for.
    pub snapshot_total: f64,
    handle: Option<EventHandle>,
}

impl Dot {
    fn new(label: &'static str) -> Self {
        Self {
            aura: Aura::new(label, Duration::ZERO, 1),
            tick_interval: Duration::ZERO,
            last_tick: Duration::ZERO,
            ticks_remaining: 0,
            total_ticks: 0,
            ticks_done: 0,
            snapshot: DotSnapshot::None,
            snapshot_total: 0.0,
            handle: None,
        }
    }

    /// (Re)apply from `now`, replacing the previous snapshot and tick chain.
    pub fn apply(
        &mut self,
        now: Duration,
        duration: Duration,
        ticks: u32,
        interval: Duration,
        snapshot: DotSnapshot,
        snapshot_total: f64,
    ) -> Option<AuraChange> {
        self.cancel_ticks();
        self.tick_interval = interval;
        self.last_tick = now;
        self.ticks_remaining = ticks;
        self.total_ticks = ticks;
        self.ticks_done = 0;
        self.snapshot = snapshot;
        self.snapshot_total = snapshot_total;
        self.aura.apply_for(now, duration)
    }

    pub fn clear(&mut self, now: Duration) -> Option<AuraChange> {
        self.cancel_ticks();
        self.ticks_remaining = 0;
        self.total_ticks = 0;
        self.ticks_done = 0;
        self.snapshot = DotSnapshot::None;
        self.snapshot_total = 0.0;
        self.aura.clear(now)
    }

    pub fn is_active_at(&self, now: Duration) -> bool {
        self.aura.active_at(now)
    }

    /// When the next tick lands, if it still fits inside the debuff window.
    pub fn next_tick_at(&self) -> Option<Duration> {
        if !self.aura.is_active() || self.tick_interval.is_zero() {
            return None;
        }
        let next = self.last_tick.saturating_add(self.tick_interval);
        (next <= self.aura.expires_at()).then_some(next)
    }

    /// 1-based index of the tick about to happen.
    pub fn tick_number(&self) -> u32 {
        self.ticks_done + 1
    }

    pub fn record_tick(&mut self, at: Duration) {
        self.last_tick = at;
        self.ticks_done += 1;
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
    }

    pub fn set_handle(&mut self, handle: Option<EventHandle>) {
        self.handle = handle;
    }

    pub fn has_pending_tick(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    fn cancel_ticks(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// Which aura a recorded change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraSlot {
    Buff(Buff),
    Debuff(Debuff),
}

impl AuraSlot {
    pub fn label(self) -> &'static str {
        match self {
            AuraSlot::Buff(buff) => buff.label(),
            AuraSlot::Debuff(debuff) => debuff.label(),
        }
    }
}

/// The simulated character plus the debuffs it owns on the target.
#[derive(Debug, Clone)]
pub struct Actor {
    pub stats: Stats,
    pub mana: f64,
    pub now: Duration,
    pub gcd: Timer,
    cooldowns: HashMap<Spell, Timer>,
    item_cooldowns: HashMap<Item, Timer>,
    buffs: Vec<Aura>,
    pub immolate: Dot,
    pub corruption: Dot,
    pub curse_of_agony: Dot,
    pub curse_of_the_elements: Aura,
    pub soul_leech_last_tick: Duration,
    changes: Vec<(AuraSlot, AuraChange)>,
}

impl Actor {
    /// Fresh actor at full mana with no auras and the GCD ready.
    pub fn new(stats: Stats, config: &SimConfig) -> Self {
        let talents = &config.talents;
        let buffs = Buff::ALL
            .iter()
            .map(|buff| match buff {
                Buff::Pyroclasm => Aura::new(buff.label(), secs(talents.pyroclasm.duration), 1),
                Buff::Backdraft => Aura::new(
                    buff.label(),
                    secs(talents.backdraft.duration),
                    talents.backdraft.charges,
                ),
                Buff::GuldansChosen => {
                    Aura::new(buff.label(), secs(GULDANS_CHOSEN_DURATION), 1)
                }
                Buff::CataclysmicBurst => {
                    Aura::indefinite(buff.label(), CATACLYSMIC_BURST_MAX_STACKS)
                }
                Buff::HeatingUp => Aura::new(
                    buff.label(),
                    secs(HEATING_UP_DURATION),
                    HEATING_UP_MAX_STACKS,
                ),
                Buff::DecisiveDecimation => Aura::indefinite(buff.label(), 1),
                Buff::ImprovedSoulLeech => Aura::new(
                    buff.label(),
                    secs(talents.improved_soul_leech.hot_duration),
                    1,
                ),
                Buff::LifeTapBuff => Aura::new(buff.label(), secs(LIFE_TAP_BUFF_DURATION), 1),
                Buff::ShadowTrance => {
                    Aura::new(buff.label(), secs(talents.nightfall.buff_duration), 1)
                }
                Buff::EmpoweredImp => {
                    Aura::new(buff.label(), secs(talents.empowered_imp.buff_duration), 1)
                }
                Buff::WildMagic => Aura::new(
                    buff.label(),
                    secs(config.items.potion_of_wild_magic.duration),
                    1,
                ),
            })
            .collect();

        Self {
            stats,
            mana: stats.max_mana,
            now: Duration::ZERO,
            gcd: Timer::default(),
            cooldowns: HashMap::new(),
            item_cooldowns: HashMap::new(),
            buffs,
            immolate: Dot::new(Debuff::Immolate.label()),
            corruption: Dot::new(Debuff::Corruption.label()),
            curse_of_agony: Dot::new(Debuff::CurseOfAgony.label()),
            curse_of_the_elements: Aura::new(
                Debuff::CurseOfTheElements.label(),
                secs(config.spells.curse_of_the_elements.duration),
                1,
            ),
            soul_leech_last_tick: Duration::ZERO,
            changes: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // auras
    // ------------------------------------------------------------------

    pub fn buff(&self, buff: Buff) -> &Aura {
        &self.buffs[buff.index()]
    }

    pub fn buff_active(&self, buff: Buff) -> bool {
        self.buff(buff).active_at(self.now)
    }

    pub fn buff_stacks(&self, buff: Buff) -> u32 {
        if self.buff_active(buff) {
            self.buff(buff).stacks()
        } else {
            0
        }
    }

    /// Mutate a buff at the current time, recording any state change.
    pub fn update_buff<F>(&mut self, buff: Buff, f: F)
    where
        F: FnOnce(&mut Aura, Duration) -> Option<AuraChange>,
    {
        let now = self.now;
        if let Some(change) = f(&mut self.buffs[buff.index()], now) {
            self.changes.push((AuraSlot::Buff(buff), change));
        }
    }

    /// Apply one stack (refreshing) of a buff.
    pub fn gain_buff(&mut self, buff: Buff) {
        self.update_buff(buff, |aura, now| aura.add_stacks(now, 1));
    }

    pub fn clear_buff(&mut self, buff: Buff) {
        self.update_buff(buff, |aura, now| aura.clear(now));
    }

    pub fn dot(&self, debuff: Debuff) -> Option<&Dot> {
        match debuff {
            Debuff::Immolate => Some(&self.immolate),
            Debuff::Corruption => Some(&self.corruption),
            Debuff::CurseOfAgony => Some(&self.curse_of_agony),
            Debuff::CurseOfTheElements => None,
        }
    }

    pub fn dot_mut(&mut self, debuff: Debuff) -> Option<&mut Dot> {
        match debuff {
            Debuff::Immolate => Some(&mut self.immolate),
            Debuff::Corruption => Some(&mut self.corruption),
            Debuff::CurseOfAgony => Some(&mut self.curse_of_agony),
            Debuff::CurseOfTheElements => None,
        }
    }

    pub fn debuff_aura(&self, debuff: Debuff) -> &Aura {
        match self.dot(debuff) {
            Some(dot) => &dot.aura,
            None => &self.curse_of_the_elements,
        }
    }

    pub fn debuff_active(&self, debuff: Debuff) -> bool {
        self.debuff_aura(debuff).active_at(self.now)
    }

    /// Record a change produced by a debuff operation.
    pub fn note_debuff(&mut self, debuff: Debuff, change: Option<AuraChange>) {
        if let Some(change) = change {
            self.changes.push((AuraSlot::Debuff(debuff), change));
        }
    }

    pub fn apply_curse_of_the_elements(&mut self, duration: Duration) {
        let change = self.curse_of_the_elements.apply_for(self.now, duration);
        self.note_debuff(Debuff::CurseOfTheElements, change);
    }

    pub fn clear_dot(&mut self, debuff: Debuff) {
        let now = self.now;
        let change = self.dot_mut(debuff).and_then(|dot| dot.clear(now));
        self.note_debuff(debuff, change);
        if debuff == Debuff::Immolate {
            self.clear_buff(Buff::CataclysmicBurst);
        }
    }

    /// Lazily expire every aura whose window has closed.
    pub fn expire_auras(&mut self) {
        let now = self.now;
        for buff in Buff::ALL {
            let aura = &mut self.buffs[buff.index()];
            let at = aura.expires_at();
            if aura.check_expiration(now) {
                self.changes.push((AuraSlot::Buff(buff), AuraChange::Expired { at }));
            }
        }
        for debuff in [Debuff::Immolate, Debuff::Corruption, Debuff::CurseOfAgony] {
            let expired = self.dot(debuff).is_some_and(|dot| {
                dot.aura.is_active() && dot.aura.duration().is_some() && now >= dot.aura.expires_at()
            });
            if expired {
                self.clear_dot(debuff);
            }
        }
        let at = self.curse_of_the_elements.expires_at();
        if self.curse_of_the_elements.check_expiration(now) {
            self.changes.push((
                AuraSlot::Debuff(Debuff::CurseOfTheElements),
                AuraChange::Expired { at },
            ));
        }
    }

    /// Take the aura changes recorded since the last drain.
    pub fn drain_changes(&mut self) -> std::vec::Drain<'_, (AuraSlot, AuraChange)> {
        self.changes.drain(..)
    }

    // ------------------------------------------------------------------
    // cooldowns
    // ------------------------------------------------------------------

    pub fn cooldown_ready(&self, spell: Spell) -> bool {
        self.cooldowns
            .get(&spell)
            .map_or(true, |timer| timer.ready(self.now))
    }

    pub fn cooldown_remaining(&self, spell: Spell) -> Duration {
        self.cooldowns
            .get(&spell)
            .map_or(Duration::ZERO, |timer| timer.remaining(self.now))
    }

    pub fn start_cooldown(&mut self, spell: Spell, cooldown: Duration) {
        let now = self.now;
        self.cooldowns.entry(spell).or_default().reset(now, cooldown);
    }

    pub fn reduce_cooldown(&mut self, spell: Spell, amount: Duration) {
        if let Some(timer) = self.cooldowns.get_mut(&spell) {
            timer.reduce(amount);
        }
    }

    pub fn item_ready(&self, item: Item) -> bool {
        self.item_cooldowns
            .get(&item)
            .map_or(true, |timer| timer.ready(self.now))
    }

    pub fn item_remaining(&self, item: Item) -> Duration {
        self.item_cooldowns
            .get(&item)
            .map_or(Duration::ZERO, |timer| timer.remaining(self.now))
    }

    pub fn start_item_cooldown(&mut self, item: Item, cooldown: Duration) {
        let now = self.now;
        self.item_cooldowns.entry(item).or_default().reset(now, cooldown);
    }

    // ------------------------------------------------------------------
    // mana
    // ------------------------------------------------------------------

    pub fn has_mana(&self, cost: f64) -> bool {
        self.mana >= cost
    }

    pub fn spend_mana(&mut self, cost: f64) {
        self.mana = (self.mana - cost).max(0.0);
    }

    /// Add mana up to the pool size; returns the amount actually gained.
    pub fn gain_mana(&mut self, amount: f64) -> f64 {
        let before = self.mana;
        self.mana = (self.mana + amount).min(self.stats.max_mana);
        self.mana - before
    }

    /// Current mana as a fraction of the pool, 0..=1.
    pub fn mana_fraction(&self) -> f64 {
        if self.stats.max_mana <= 0.0 {
            0.0
        } else {
            self.mana / self.stats.max_mana
        }
    }

    pub fn haste_multiplier(&self) -> f64 {
        let mult = 1.0 + self.stats.haste_pct / 100.0;
        if mult > 0.0 {
            mult
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new(Stats::default(), &SimConfig::default())
    }

    #[test]
    fn starts_fresh() {
        let actor = actor();
        assert_eq!(actor.mana, actor.stats.max_mana);
        assert!(actor.gcd.ready(Duration::ZERO));
        assert!(Buff::ALL.iter().all(|b| !actor.buff_active(*b)));
        assert!(actor.cooldown_ready(Spell::ChaosBolt));
        assert!(actor.item_ready(Item::RunicManaPotion));
    }

    #[test]
    fn mana_is_clamped() {
        let mut actor = actor();
        actor.spend_mana(actor.stats.max_mana + 50.0);
        assert_eq!(actor.mana, 0.0);
        let gained = actor.gain_mana(actor.stats.max_mana * 2.0);
        assert_eq!(gained, actor.stats.max_mana);
        assert_eq!(actor.mana_fraction(), 1.0);
    }

    #[test]
    fn cooldowns_track_time() {
        let mut actor = actor();
        actor.start_cooldown(Spell::Conflagrate, Duration::from_secs(10));
        actor.now = Duration::from_secs(4);
        assert!(!actor.cooldown_ready(Spell::Conflagrate));
        assert_eq!(actor.cooldown_remaining(Spell::Conflagrate), Duration::from_secs(6));
        actor.reduce_cooldown(Spell::Conflagrate, Duration::from_secs(6));
        assert!(actor.cooldown_ready(Spell::Conflagrate));
    }

    #[test]
    fn buff_changes_are_recorded_and_expire() {
        let mut actor = actor();
        actor.gain_buff(Buff::Pyroclasm);
        assert!(actor.buff_active(Buff::Pyroclasm));
        actor.now = Duration::from_secs(10);
        actor.expire_auras();
        assert!(!actor.buff_active(Buff::Pyroclasm));

        let changes: Vec<_> = actor.drain_changes().collect();
        assert_eq!(
            changes,
            vec![
                (AuraSlot::Buff(Buff::Pyroclasm), AuraChange::Gained { stacks: 1 }),
                (
                    AuraSlot::Buff(Buff::Pyroclasm),
                    AuraChange::Expired { at: Duration::from_secs(10) }
                ),
            ]
        );
    }

    #[test]
    fn immolate_expiry_clears_cataclysmic_burst() {
        let mut actor = actor();
        let now = actor.now;
        actor.immolate.apply(
            now,
            Duration::from_secs(15),
            5,
            Duration::from_secs(3),
            DotSnapshot::Flat { tick_damage: 100.0, crit_chance: 0.0 },
            500.0,
        );
        actor.gain_buff(Buff::CataclysmicBurst);
        assert_eq!(actor.buff_stacks(Buff::CataclysmicBurst), 1);

        actor.now = Duration::from_secs(15);
        actor.expire_auras();
        assert!(!actor.debuff_active(Debuff::Immolate));
        assert_eq!(actor.buff_stacks(Buff::CataclysmicBurst), 0);
        assert_eq!(actor.immolate.snapshot, DotSnapshot::None);
    }

    #[test]
    fn dot_tick_window() {
        let mut dot = Dot::new("test");
        dot.apply(
            Duration::ZERO,
            Duration::from_secs(6),
            2,
            Duration::from_secs(3),
            DotSnapshot::None,
            0.0,
        );
        assert_eq!(dot.next_tick_at(), Some(Duration::from_secs(3)));
        dot.record_tick(Duration::from_secs(3));
        assert_eq!(dot.next_tick_at(), Some(Duration::from_secs(6)));
        dot.record_tick(Duration::from_secs(6));
        assert_eq!(dot.next_tick_at(), None);
        assert_eq!(dot.ticks_remaining, 0);
        assert_eq!(dot.tick_number(), 3);
    }
}
