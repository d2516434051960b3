//! Batch analysis: stat weights and single-stat sweeps
//!
//! Both tools only ever call [`Simulator::run_with_seed`] on perturbed stat
//! blocks. Work units are independent and write to index-addressed slots,
//! so the output order never depends on scheduling.

use crate::actor::Stats;
use crate::error::{Error, Result};
use crate::simulation::Simulator;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One Spirit is worth this much spell power in the Pawn summary.
const SPIRIT_WEIGHT_VS_SP: f64 = 0.6;

fn build_pool(threads: usize) -> Result<ThreadPool> {
    let threads = if threads == 0 { num_cpus::get() } else { threads };
    ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| Error::Batch(format!("failed to build thread pool: {e}")))
}

// ---------------------------------------------------------------------------
// stat weights
// ---------------------------------------------------------------------------

/// Stats perturbed by the central-difference estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStat {
    SpellPower,
    Crit,
    Hit,
    Haste,
}

impl WeightStat {
    pub const ALL: [WeightStat; 4] = [
        WeightStat::SpellPower,
        WeightStat::Crit,
        WeightStat::Hit,
        WeightStat::Haste,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WeightStat::SpellPower => "Spell Power",
            WeightStat::Crit => "Crit",
            WeightStat::Hit => "Hit",
            WeightStat::Haste => "Haste",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            WeightStat::SpellPower => "SP",
            WeightStat::Crit => "% crit",
            WeightStat::Hit => "% hit",
            WeightStat::Haste => "% haste",
        }
    }

    /// Step used on each side of the baseline.
    pub fn delta(self) -> f64 {
        match self {
            WeightStat::SpellPower => 10.0,
            WeightStat::Crit | WeightStat::Hit | WeightStat::Haste => 1.0,
        }
    }

    fn perturb(self, base: &Stats, amount: f64) -> Stats {
        let mut stats = *base;
        match self {
            WeightStat::SpellPower => stats.spell_power += amount,
            WeightStat::Crit => stats.crit_pct += amount,
            WeightStat::Hit => stats.hit_pct += amount,
            WeightStat::Haste => stats.haste_pct += amount,
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatWeight {
    pub stat: WeightStat,
    pub delta: f64,
    /// DPS per unit of the stat.
    pub weight: f64,
    pub dps_plus: f64,
    pub dps_minus: f64,
    /// Weight relative to one spell power; zero when spell power is worthless.
    pub normalized: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatWeights {
    pub seed: u64,
    pub iterations: usize,
    pub duration_seconds: f64,
    pub baseline_dps: f64,
    pub weights: Vec<StatWeight>,
    /// Absent when the spell power weight is zero.
    pub pawn: Option<String>,
}

impl StatWeights {
    pub fn weight(&self, stat: WeightStat) -> Option<&StatWeight> {
        self.weights.iter().find(|w| w.stat == stat)
    }

    pub fn print_report(&self, verbose: bool) {
        println!("Stat Weights (central diff, shared seed {})", self.seed);
        println!(
            "Iterations: {}, Duration: {:.0}s",
            self.iterations, self.duration_seconds
        );
        println!();
        println!("Baseline DPS: {:.2}", self.baseline_dps);
        println!();
        if verbose {
            println!(
                "{:<12} {:>10} {:>10} {:>10} {:>10}",
                "Stat", "Delta", "DPS/Unit", "Plus DPS", "Minus DPS"
            );
        } else {
            println!("{:<12} {:>10} {:>10}", "Stat", "Delta", "DPS/Unit");
        }
        for w in &self.weights {
            let delta = format!("{:+.0} {}", w.delta, w.stat.unit());
            if verbose {
                println!(
                    "{:<12} {:>10} {:>10.2} {:>10.2} {:>10.2}",
                    w.stat.label(),
                    delta,
                    w.weight,
                    w.dps_plus,
                    w.dps_minus
                );
            } else {
                println!("{:<12} {:>10} {:>10.2}", w.stat.label(), delta, w.weight);
            }
        }

        let Some(pawn) = &self.pawn else {
            return;
        };
        println!();
        println!("Normalized (SP = 1.0)");
        for w in &self.weights {
            println!("{:<12} {:>10.3}", w.stat.label(), w.normalized);
        }
        println!("{:<12} {:>10.3}", "Spirit", SPIRIT_WEIGHT_VS_SP);
        println!();
        println!("Pawn: {pawn}");
    }
}

/// Central-difference stat weights, every run sharing the simulator's seed.
pub fn stat_weights(sim: &Simulator, base: &Stats, threads: usize) -> Result<StatWeights> {
    let seed = sim.seed();
    let pool = build_pool(threads)?;

    // slot 0 is the baseline, then (+δ, −δ) per stat
    let mut jobs = vec![*base];
    for stat in WeightStat::ALL {
        jobs.push(stat.perturb(base, stat.delta()));
        jobs.push(stat.perturb(base, -stat.delta()));
    }
    info!(runs = jobs.len(), seed, "computing stat weights");

    let dps: Vec<f64> = pool.install(|| {
        jobs.par_iter()
            .map(|stats| sim.run_with_seed(stats, seed).dps)
            .collect()
    });

    let mut weights: Vec<StatWeight> = WeightStat::ALL
        .iter()
        .enumerate()
        .map(|(i, &stat)| {
            let (plus, minus) = (dps[1 + 2 * i], dps[2 + 2 * i]);
            StatWeight {
                stat,
                delta: stat.delta(),
                weight: (plus - minus) / (2.0 * stat.delta()),
                dps_plus: plus,
                dps_minus: minus,
                normalized: 0.0,
            }
        })
        .collect();

    let sp = weights
        .iter()
        .find(|w| w.stat == WeightStat::SpellPower)
        .map_or(0.0, |w| w.weight);
    let pawn = if sp != 0.0 {
        for w in &mut weights {
            w.normalized = w.weight / sp;
        }
        Some(pawn_string(&weights, sp, sim))
    } else {
        None
    };

    let params = sim.params();
    Ok(StatWeights {
        seed,
        iterations: params.iterations,
        duration_seconds: params.duration.as_secs_f64(),
        baseline_dps: dps[0],
        weights,
        pawn,
    })
}

/// Per-rating values relative to one spell power.
fn pawn_string(weights: &[StatWeight], sp: f64, sim: &Simulator) -> String {
    let conversions = &sim.config().constants.stat_conversions;
    let per_rating = |stat: WeightStat, rating_per_percent: f64| {
        let weight = weights.iter().find(|w| w.stat == stat).map_or(0.0, |w| w.weight);
        if weight == 0.0 || rating_per_percent <= 0.0 {
            0.0
        } else {
            weight / rating_per_percent / sp
        }
    };
    format!(
        "( Pawn: v1: \"StatWeights (Sim)\": SpellPower=1, CritRating={:.2}, HasteRating={:.2}, HitRating={:.2}, Spirit={:.2} )",
        per_rating(WeightStat::Crit, conversions.crit_rating_per_percent),
        per_rating(WeightStat::Haste, conversions.haste_rating_per_percent),
        per_rating(WeightStat::Hit, conversions.hit_rating_per_percent),
        SPIRIT_WEIGHT_VS_SP
    )
}

// ---------------------------------------------------------------------------
// sweep
// ---------------------------------------------------------------------------

/// Stat swept across a range; values are absolute, not offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStat {
    Crit,
    Haste,
    Sp,
}

impl SweepStat {
    pub fn from_name(name: &str) -> Option<SweepStat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "crit" => Some(SweepStat::Crit),
            "haste" => Some(SweepStat::Haste),
            "sp" | "spellpower" | "spell_power" => Some(SweepStat::Sp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SweepStat::Crit => "crit",
            SweepStat::Haste => "haste",
            SweepStat::Sp => "sp",
        }
    }

    /// Default `(start, stop, step)`; spell power starts from the baseline.
    fn default_range(self, base: &Stats) -> (f64, f64, f64) {
        match self {
            SweepStat::Crit => (0.0, 50.0, 0.5),
            SweepStat::Haste => (0.0, 40.0, 0.5),
            SweepStat::Sp => (base.spell_power, base.spell_power + 800.0, 10.0),
        }
    }

    fn apply(self, base: &Stats, value: f64) -> Stats {
        let mut stats = *base;
        match self {
            SweepStat::Crit => stats.crit_pct = value,
            SweepStat::Haste => stats.haste_pct = value,
            SweepStat::Sp => stats.spell_power = value,
        }
        stats
    }
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub stat: SweepStat,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
    pub avg_seeds: usize,
    /// Worker threads; 0 uses every core.
    pub threads: usize,
    pub include_delta: bool,
    pub output_dir: PathBuf,
}

impl SweepOptions {
    pub fn new(stat: SweepStat) -> Self {
        Self {
            stat,
            start: None,
            stop: None,
            step: None,
            avg_seeds: 1,
            threads: 0,
            include_delta: true,
            output_dir: PathBuf::from("output/stat_curves"),
        }
    }

    /// Resolved sweep values, `start..=stop` by `step`.
    pub fn values(&self, base: &Stats) -> Result<Vec<f64>> {
        let (default_start, default_stop, default_step) = self.stat.default_range(base);
        let start = self.start.unwrap_or(default_start);
        let stop = self.stop.unwrap_or(default_stop);
        let step = self.step.unwrap_or(default_step);

        if !(step.is_finite() && step > 0.0) {
            return Err(Error::Batch(format!("step must be > 0 (got {step:.2})")));
        }
        if !(start.is_finite() && stop.is_finite()) || stop <= start {
            return Err(Error::Batch(format!(
                "stop must be > start (start={start:.2}, stop={stop:.2})"
            )));
        }

        let count = ((stop - start) / step + 1e-9).floor() as usize + 1;
        Ok((0..count).map(|i| start + step * i as f64).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub value: f64,
    pub dps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub stat: SweepStat,
    pub seeds_per_point: usize,
    pub points: Vec<SweepPoint>,
    pub path: PathBuf,
}

/// Sweep one stat and write `<output_dir>/<stat>.csv`.
pub fn sweep(sim: &Simulator, base: &Stats, options: &SweepOptions) -> Result<SweepReport> {
    let values = options.values(base)?;
    let avg_seeds = options.avg_seeds.max(1);

    let mut seeder = SmallRng::seed_from_u64(sim.seed());
    let seeds: Vec<Vec<u64>> = values
        .iter()
        .map(|_| (0..avg_seeds).map(|_| seeder.gen::<u64>()).collect())
        .collect();

    info!(
        stat = options.stat.name(),
        points = values.len(),
        avg_seeds,
        "starting sweep"
    );
    let pool = build_pool(options.threads)?;
    let points: Vec<SweepPoint> = pool.install(|| {
        values
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(&value, seeds)| {
                let stats = options.stat.apply(base, value);
                let total: f64 = seeds
                    .iter()
                    .map(|&seed| sim.run_with_seed(&stats, seed).dps)
                    .sum();
                SweepPoint {
                    value,
                    dps: total / seeds.len() as f64,
                }
            })
            .collect()
    });

    let path = options
        .output_dir
        .join(format!("{}.csv", options.stat.name()));
    write_csv(&path, &points, options.include_delta)?;
    info!(path = %path.display(), "sweep complete");

    Ok(SweepReport {
        stat: options.stat,
        seeds_per_point: avg_seeds,
        points,
        path,
    })
}

/// `stat_value,dps[,dps_per_point]`; the first point has an empty delta.
pub fn write_csv(path: &Path, points: &[SweepPoint], include_delta: bool) -> Result<()> {
    let output_err = |source: std::io::Error| Error::Output {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(output_err)?;
    }
    let mut out = BufWriter::new(File::create(path).map_err(output_err)?);

    let header = if include_delta {
        "stat_value,dps,dps_per_point"
    } else {
        "stat_value,dps"
    };
    writeln!(out, "{header}").map_err(output_err)?;

    for (i, point) in points.iter().enumerate() {
        write!(out, "{:.4},{:.4}", point.value, point.dps).map_err(output_err)?;
        if include_delta {
            match i.checked_sub(1).map(|p| &points[p]) {
                Some(prev) => {
                    let per_point = (point.dps - prev.dps) / (point.value - prev.value);
                    write!(out, ",{per_point:.6}").map_err(output_err)?;
                }
                None => write!(out, ",").map_err(output_err)?,
            }
        }
        writeln!(out).map_err(output_err)?;
    }
    out.flush().map_err(output_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, TargetKind};
    use crate::registry::Spell;
    use crate::rotation::{Action, ActionKind, CompiledRotation, Condition};
    use crate::simulation::SimParams;
    use std::time::Duration;

    fn simulator(seed: u64) -> Simulator {
        let rotation = CompiledRotation {
            name: "incinerate".to_string(),
            description: String::new(),
            variables: Default::default(),
            actions: vec![Action {
                kind: ActionKind::CastSpell(Spell::Incinerate),
                condition: Condition::True,
                tags: Vec::new(),
            }],
        };
        let params = SimParams {
            duration: Duration::from_secs(30),
            iterations: 2,
            target: TargetKind::Boss,
        };
        Simulator::new(SimConfig::default(), params, rotation, seed, None)
    }

    #[test]
    fn spell_power_is_worth_damage() {
        let sim = simulator(7);
        let weights = stat_weights(&sim, &Stats::default(), 2).unwrap();
        assert_eq!(weights.weights.len(), 4);
        let sp = weights.weight(WeightStat::SpellPower).unwrap();
        assert!(sp.weight > 0.0);
        assert!(sp.dps_plus > sp.dps_minus);
        assert!((sp.normalized - 1.0).abs() < 1e-12);
        assert!(weights.pawn.as_deref().unwrap().contains("SpellPower=1"));
        // above the hit cap, hit is worthless
        let hit = weights.weight(WeightStat::Hit).unwrap();
        assert!(hit.dps_plus >= weights.baseline_dps);
    }

    #[test]
    fn sweep_values_follow_defaults() {
        let base = Stats::default();
        let values = SweepOptions::new(SweepStat::Sp).values(&base).unwrap();
        assert_eq!(values.len(), 81);
        assert_eq!(values[0], 1800.0);
        assert!((values[80] - 2600.0).abs() < 1e-9);

        let mut crit = SweepOptions::new(SweepStat::Crit);
        crit.stop = Some(2.0);
        assert_eq!(crit.values(&base).unwrap(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn sweep_rejects_bad_ranges() {
        let base = Stats::default();
        let mut options = SweepOptions::new(SweepStat::Haste);
        options.step = Some(0.0);
        assert!(matches!(options.values(&base), Err(Error::Batch(_))));
        options.step = Some(1.0);
        options.start = Some(10.0);
        options.stop = Some(5.0);
        assert!(matches!(options.values(&base), Err(Error::Batch(_))));
    }

    #[test]
    fn stat_names_accept_aliases() {
        assert_eq!(SweepStat::from_name("SP"), Some(SweepStat::Sp));
        assert_eq!(SweepStat::from_name("spell_power"), Some(SweepStat::Sp));
        assert_eq!(SweepStat::from_name("Haste"), Some(SweepStat::Haste));
        assert_eq!(SweepStat::from_name("mastery"), None);
    }

    #[test]
    fn sweep_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let sim = simulator(11);
        let mut options = SweepOptions::new(SweepStat::Crit);
        options.start = Some(10.0);
        options.stop = Some(30.0);
        options.step = Some(10.0);
        options.avg_seeds = 2;
        options.threads = 2;
        options.output_dir = dir.path().join("curves");

        let report = sweep(&sim, &Stats::default(), &options).unwrap();
        assert_eq!(report.points.len(), 3);
        assert_eq!(report.path, dir.path().join("curves").join("crit.csv"));

        let text = std::fs::read_to_string(&report.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "stat_value,dps,dps_per_point");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("10.0000,") && lines[1].ends_with(','));
        assert_eq!(lines[3].split(',').count(), 3);

        let again = sweep(&sim, &Stats::default(), &options).unwrap();
        assert_eq!(report.points, again.points);
    }
}
