//! Simulation result statistics

use crate::registry::{Buff, Spell};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for one spell (or a DoT's ticks, recorded under its spell)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellStats {
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub ticks: u64,
    pub tick_crits: u64,
    pub damage: f64,
    /// Smallest non-zero damage event; `f64::INFINITY` until one is seen.
    pub min_hit: f64,
    pub max_hit: f64,
}

impl Default for SpellStats {
    fn default() -> Self {
        Self {
            casts: 0,
            hits: 0,
            crits: 0,
            misses: 0,
            ticks: 0,
            tick_crits: 0,
            damage: 0.0,
            min_hit: f64::INFINITY,
            max_hit: 0.0,
        }
    }
}

impl SpellStats {
    pub fn record_cast(&mut self, hit: bool, crit: bool, damage: f64) {
        self.casts += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        if crit {
            self.crits += 1;
        }
        self.note_damage(damage);
    }

    pub fn record_tick(&mut self, crit: bool, damage: f64) {
        self.ticks += 1;
        if crit {
            self.tick_crits += 1;
        }
        self.note_damage(damage);
    }

    fn note_damage(&mut self, damage: f64) {
        if damage <= 0.0 {
            return;
        }
        self.damage += damage;
        self.min_hit = self.min_hit.min(damage);
        self.max_hit = self.max_hit.max(damage);
    }

    pub fn merge(&mut self, other: &SpellStats) {
        self.casts += other.casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
        self.ticks += other.ticks;
        self.tick_crits += other.tick_crits;
        self.damage += other.damage;
        self.min_hit = self.min_hit.min(other.min_hit);
        self.max_hit = self.max_hit.max(other.max_hit);
    }

    pub fn damage_events(&self) -> u64 {
        self.hits + self.ticks
    }
}

/// Counters for one or more iterations. Merging is commutative and
/// associative, so iterations can be folded in any order or grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationResult {
    pub iterations: u64,
    /// Simulated seconds, summed over iterations.
    pub duration: f64,
    pub total_damage: f64,
    pub total_casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub oom_events: u64,
    pub item_uses: u64,
    pub life_taps: u64,
    pub shadow_trance_procs: u64,
    /// Backdraft charges integrated over time.
    pub backdraft_charge_seconds: f64,
    pub spells: BTreeMap<Spell, SpellStats>,
    /// Seconds each buff was active.
    pub buff_uptime: BTreeMap<Buff, f64>,
}

impl SimulationResult {
    /// Empty result for a single iteration of `duration` seconds.
    pub fn for_iteration(duration: f64) -> Self {
        Self {
            iterations: 1,
            duration,
            ..Self::default()
        }
    }

    pub fn record_cast(&mut self, spell: Spell, hit: bool, crit: bool, damage: f64) {
        self.total_casts += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        if crit {
            self.crits += 1;
        }
        self.total_damage += damage.max(0.0);
        if spell == Spell::LifeTap {
            self.life_taps += 1;
        }
        self.spells.entry(spell).or_default().record_cast(hit, crit, damage);
    }

    pub fn record_tick(&mut self, spell: Spell, crit: bool, damage: f64) {
        self.total_damage += damage.max(0.0);
        self.spells.entry(spell).or_default().record_tick(crit, damage);
    }

    pub fn add_uptime(&mut self, buff: Buff, seconds: f64) {
        if seconds > 0.0 {
            *self.buff_uptime.entry(buff).or_default() += seconds;
        }
    }

    pub fn merge(&mut self, other: &SimulationResult) {
        self.iterations += other.iterations;
        self.duration += other.duration;
        self.total_damage += other.total_damage;
        self.total_casts += other.total_casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
        self.oom_events += other.oom_events;
        self.item_uses += other.item_uses;
        self.life_taps += other.life_taps;
        self.shadow_trance_procs += other.shadow_trance_procs;
        self.backdraft_charge_seconds += other.backdraft_charge_seconds;
        for (spell, stats) in &other.spells {
            self.spells.entry(*spell).or_default().merge(stats);
        }
        for (buff, seconds) in &other.buff_uptime {
            *self.buff_uptime.entry(*buff).or_default() += seconds;
        }
    }

    /// Fold a sequence of results in order.
    pub fn merge_all<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a SimulationResult>,
    {
        results.into_iter().fold(Self::default(), |mut acc, result| {
            acc.merge(result);
            acc
        })
    }

    pub fn dps(&self) -> f64 {
        if self.duration > 0.0 {
            self.total_damage / self.duration
        } else {
            0.0
        }
    }
}

/// Per-spell line of the aggregate report
#[derive(Debug, Clone, Serialize)]
pub struct SpellSummary {
    pub spell: Spell,
    pub label: &'static str,
    pub casts: f64,
    pub ticks: f64,
    pub damage: f64,
    pub damage_share: f64,
    pub avg_hit: f64,
    pub min_hit: f64,
    pub max_hit: f64,
    pub crit_pct: f64,
    pub miss_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuffUptime {
    pub buff: Buff,
    pub label: &'static str,
    pub seconds: f64,
    pub percent: f64,
}

/// Aggregated statistics from multiple iterations; counts are per-iteration
/// averages unless named otherwise.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    pub iterations: u64,
    pub duration_seconds: f64,
    pub dps: f64,
    pub avg_damage: f64,
    pub avg_casts: f64,
    pub hit_pct: f64,
    pub crit_pct: f64,
    pub miss_pct: f64,
    pub oom_events: u64,
    pub avg_oom_events: f64,
    pub avg_item_uses: f64,
    pub avg_life_taps: f64,
    pub avg_shadow_trance_procs: f64,
    pub backdraft_avg_charges: f64,
    pub spells: Vec<SpellSummary>,
    pub buffs: Vec<BuffUptime>,
    #[serde(skip)]
    pub totals: SimulationResult,
}

impl AggregateResult {
    pub fn from_totals(totals: SimulationResult) -> Self {
        if totals.iterations == 0 {
            return Self::default();
        }
        let n = totals.iterations as f64;
        let attempts = (totals.hits + totals.misses) as f64;
        let pct = |part: u64, whole: f64| {
            if whole > 0.0 {
                part as f64 / whole * 100.0
            } else {
                0.0
            }
        };

        let mut spells: Vec<SpellSummary> = totals
            .spells
            .iter()
            .map(|(spell, stats)| {
                let events = stats.damage_events() as f64;
                SpellSummary {
                    spell: *spell,
                    label: spell.label(),
                    casts: stats.casts as f64 / n,
                    ticks: stats.ticks as f64 / n,
                    damage: stats.damage / n,
                    damage_share: if totals.total_damage > 0.0 {
                        stats.damage / totals.total_damage * 100.0
                    } else {
                        0.0
                    },
                    avg_hit: if events > 0.0 { stats.damage / events } else { 0.0 },
                    min_hit: if stats.min_hit.is_finite() { stats.min_hit } else { 0.0 },
                    max_hit: stats.max_hit,
                    crit_pct: pct(stats.crits + stats.tick_crits, events),
                    miss_pct: pct(stats.misses, (stats.hits + stats.misses) as f64),
                }
            })
            .collect();
        spells.sort_by(|a, b| b.damage.total_cmp(&a.damage));

        let buffs = totals
            .buff_uptime
            .iter()
            .map(|(buff, seconds)| BuffUptime {
                buff: *buff,
                label: buff.label(),
                seconds: seconds / n,
                percent: if totals.duration > 0.0 {
                    seconds / totals.duration * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Self {
            iterations: totals.iterations,
            duration_seconds: totals.duration / n,
            dps: totals.dps(),
            avg_damage: totals.total_damage / n,
            avg_casts: totals.total_casts as f64 / n,
            hit_pct: pct(totals.hits, attempts),
            crit_pct: pct(totals.crits, totals.hits as f64),
            miss_pct: pct(totals.misses, attempts),
            oom_events: totals.oom_events,
            avg_oom_events: totals.oom_events as f64 / n,
            avg_item_uses: totals.item_uses as f64 / n,
            avg_life_taps: totals.life_taps as f64 / n,
            avg_shadow_trance_procs: totals.shadow_trance_procs as f64 / n,
            backdraft_avg_charges: if totals.duration > 0.0 {
                totals.backdraft_charge_seconds / totals.duration
            } else {
                0.0
            },
            spells,
            buffs,
            totals,
        }
    }

    /// Aggregate a list of per-iteration results
    pub fn from_results(results: &[SimulationResult]) -> Self {
        Self::from_totals(SimulationResult::merge_all(results))
    }

    pub fn print_report(&self) {
        println!("=== Destruction Simulation Results ===");
        println!("Iterations: {}", self.iterations);
        println!("Fight length: {:.1}s", self.duration_seconds);
        println!();
        println!("DPS: {:.1}", self.dps);
        println!("Avg Damage: {:.0}", self.avg_damage);
        println!("Avg Casts: {:.1}", self.avg_casts);
        println!(
            "Hit: {:.2}%  Crit: {:.2}%  Miss: {:.2}%",
            self.hit_pct, self.crit_pct, self.miss_pct
        );
        println!();
        println!("--- Spells ---");
        for spell in &self.spells {
            println!(
                "{:<22} {:>6.1} casts {:>6.1} ticks {:>10.0} dmg ({:>5.1}%)  avg {:>7.0}  min {:>7.0}  max {:>7.0}  crit {:>5.1}%  miss {:>4.1}%",
                spell.label,
                spell.casts,
                spell.ticks,
                spell.damage,
                spell.damage_share,
                spell.avg_hit,
                spell.min_hit,
                spell.max_hit,
                spell.crit_pct,
                spell.miss_pct,
            );
        }
        println!();
        println!("--- Buff Uptime ---");
        for buff in &self.buffs {
            println!("{:<22} {:>7.1}s ({:>5.1}%)", buff.label, buff.seconds, buff.percent);
        }
        println!();
        println!("--- Resources ---");
        println!("Life Taps: {:.1}", self.avg_life_taps);
        println!("Out of mana events: {} ({:.2} per fight)", self.oom_events, self.avg_oom_events);
        println!("Item uses: {:.2}", self.avg_item_uses);
        println!("Shadow Trance procs: {:.2}", self.avg_shadow_trance_procs);
        println!("Backdraft avg charges: {:.2}", self.backdraft_avg_charges);
    }
}
