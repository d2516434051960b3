//! The Imp: an autonomous Firebolt caster with its own mana pool

use crate::actor::Stats;
use crate::config::SimConfig;
use rand::Rng;
use std::time::Duration;

const BASE_INTELLECT: f64 = 264.0;
const BASE_SPIRIT: f64 = 260.0;
const INTELLECT_INHERITANCE: f64 = 0.30;
const SPIRIT_INHERITANCE: f64 = 0.30;
const SPELL_POWER_INHERITANCE: f64 = 0.15;
const CRIT_BASE_PERCENT: f64 = 0.94;
const INTELLECT_PER_CRIT_PERCENT: f64 = 60.0;
const MANA_PER_INTELLECT: f64 = 9.0;
const FALLBACK_MANA: f64 = 2000.0;
const SPIRIT_TO_MP5: f64 = 0.169;
const CASTING_REGEN_FRACTION: f64 = 0.15;

const FIREBOLT_CAST_MS: u64 = 2500;
const FIREBOLT_MIN_CAST_MS: u64 = 500;
const FIREBOLT_MANA_COST: f64 = 115.0;
const FIREBOLT_BASE_MIN: f64 = 89.0;
const FIREBOLT_BASE_MAX: f64 = 101.0;
const FIREBOLT_SP_COEFFICIENT: f64 = 0.571;

/// A resolved Firebolt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Firebolt {
    pub damage: f64,
    pub crit: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Imp {
    spell_power: f64,
    crit_chance: f64,
    mana: f64,
    max_mana: f64,
    mp5_casting: f64,
    mp5_ooc: f64,
    cast_time: Duration,
    last_mana_update: Duration,
}

impl Imp {
    /// Summon with stats inherited from the owner.
    pub fn new(owner: &Stats, config: &SimConfig) -> Self {
        let intellect = BASE_INTELLECT + owner.intellect.max(0.0) * INTELLECT_INHERITANCE;
        let spirit = BASE_SPIRIT + owner.spirit.max(0.0) * SPIRIT_INHERITANCE;
        let max_mana = match intellect * MANA_PER_INTELLECT {
            mana if mana > 0.0 => mana,
            _ => FALLBACK_MANA,
        };
        let mp5_ooc = spirit * SPIRIT_TO_MP5;

        Self {
            spell_power: owner.spell_power * SPELL_POWER_INHERITANCE,
            crit_chance: (intellect / INTELLECT_PER_CRIT_PERCENT + CRIT_BASE_PERCENT) / 100.0,
            mana: max_mana,
            max_mana,
            mp5_casting: mp5_ooc * CASTING_REGEN_FRACTION,
            mp5_ooc,
            cast_time: firebolt_cast_time(config),
            last_mana_update: Duration::ZERO,
        }
    }

    pub fn cast_time(&self) -> Duration {
        self.cast_time
    }

    pub fn mana(&self) -> f64 {
        self.mana
    }

    /// Pay for a Firebolt starting no earlier than `desired`; returns the
    /// actual start, pushed back until out-of-combat regeneration covers
    /// any shortfall.
    pub fn begin_cast(&mut self, desired: Duration) -> Duration {
        let desired = desired.max(self.last_mana_update);
        self.regen(desired, self.mp5_casting);
        if self.mana >= FIREBOLT_MANA_COST {
            self.mana -= FIREBOLT_MANA_COST;
            self.last_mana_update = desired;
            return desired;
        }

        let per_second = match self.mp5_ooc / 5.0 {
            rate if rate > 0.0 => rate,
            _ => 1.0,
        };
        let seconds = (FIREBOLT_MANA_COST - self.mana) / per_second;
        let delay = Duration::from_nanos((seconds * 1e9).ceil() as u64);
        let start = desired + delay;
        self.regen(start, self.mp5_ooc);
        self.mana = self.mana.max(FIREBOLT_MANA_COST) - FIREBOLT_MANA_COST;
        self.last_mana_update = start;
        start
    }

    fn regen(&mut self, now: Duration, mp5: f64) {
        if mp5 <= 0.0 || now <= self.last_mana_update {
            return;
        }
        let elapsed = (now - self.last_mana_update).as_secs_f64();
        self.mana = (self.mana + mp5 * elapsed / 5.0).min(self.max_mana);
        self.last_mana_update = now;
    }

    /// Roll damage, then crit.
    pub fn firebolt(&self, config: &SimConfig, rng: &mut impl Rng) -> Firebolt {
        let mut damage = FIREBOLT_BASE_MIN
            + (FIREBOLT_BASE_MAX - FIREBOLT_BASE_MIN) * rng.gen::<f64>()
            + self.spell_power * FIREBOLT_SP_COEFFICIENT;
        let empowered = &config.talents.empowered_imp;
        if empowered.points > 0 {
            damage *= 1.0 + f64::from(empowered.points) * empowered.damage_per_point;
        }
        let crit = rng.gen::<f64>() < self.crit_chance;
        if crit {
            damage *= config.talents.ruin.crit_multiplier;
        }
        Firebolt { damage, crit }
    }
}

/// Demonic Power shortens the cast, never below half a second.
fn firebolt_cast_time(config: &SimConfig) -> Duration {
    let base = Duration::from_millis(FIREBOLT_CAST_MS);
    let power = &config.talents.demonic_power;
    let reduction = f64::from(power.points) * power.firebolt_cast_reduction;
    if reduction.is_nan() || reduction <= 0.0 {
        return base;
    }
    let mut cut = Duration::from_secs_f64(reduction.min(1e6));
    if cut >= base {
        cut = base - Duration::from_millis(FIREBOLT_MIN_CAST_MS);
    }
    base - cut
}
