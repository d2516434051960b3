//! Core simulation engine
//!
//! One iteration is a single fight: the actor acts whenever its GCD is
//! ready, choosing the first rotation entry whose condition passes, while
//! DoT ticks and pet casts run off an [`EventQueue`]. Time only moves
//! through `advance_time`, which accrues buff uptime, applies mana
//! regeneration, runs due events and expires auras, in that order.

mod combat_log;
mod context;
mod pet;

pub use context::ActorContext;

use crate::actor::{Actor, Stats};
use crate::config::{secs, SimConfig, TargetKind};
use crate::registry::{Buff, Debuff, Item, Spell};
use crate::rotation::{Action, ActionKind, CompiledRotation};
use crate::scheduler::EventQueue;
use crate::spells::{CastFailure, CastOutcome, CastResult, SpellBook};
use crate::stats::{AggregateResult, SimulationResult};
use combat_log::CombatLog;
use pet::Imp;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const PERIODIC: [Debuff; 3] = [Debuff::Immolate, Debuff::Corruption, Debuff::CurseOfAgony];

/// Fight shape for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub duration: Duration,
    pub iterations: usize,
    pub target: TargetKind,
}

impl SimParams {
    pub fn from_config(config: &SimConfig) -> Self {
        let simulation = &config.player.simulation;
        Self {
            duration: secs(simulation.duration_seconds),
            iterations: simulation.iterations.max(1),
            target: config.player.target.kind,
        }
    }
}

/// Work scheduled on the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimEvent {
    DotTick(Debuff),
    PetCast,
}

/// Everything one iteration produced.
struct IterationOutput {
    result: SimulationResult,
    log: Vec<String>,
    casts: Vec<CastResult>,
}

/// Runs iterations of a fight against a compiled rotation.
///
/// Shareable across threads: the rotation and configuration are read-only
/// and each iteration owns its actor, RNG and event queue.
pub struct Simulator {
    config: SimConfig,
    params: SimParams,
    rotation: CompiledRotation,
    seed: u64,
    log: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Simulator {
    /// `log` enables the combat log; lines are written to it in iteration
    /// order once each iteration finishes.
    pub fn new(
        config: SimConfig,
        params: SimParams,
        rotation: CompiledRotation,
        seed: u64,
        log: Option<Box<dyn Write + Send>>,
    ) -> Self {
        Self {
            config,
            params,
            rotation,
            seed,
            log: log.map(Mutex::new),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    pub fn rotation(&self) -> &CompiledRotation {
        &self.rotation
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn logging_enabled(&self) -> bool {
        self.log.is_some()
    }

    /// Run every iteration sequentially with the base seed.
    pub fn run(&self, stats: &Stats) -> AggregateResult {
        self.run_with_seed(stats, self.seed)
    }

    pub fn run_with_seed(&self, stats: &Stats, seed: u64) -> AggregateResult {
        info!(
            iterations = self.params.iterations,
            duration = self.params.duration.as_secs_f64(),
            seed,
            rotation = %self.rotation.name,
            "starting run"
        );
        let mut totals = SimulationResult::default();
        for index in 0..self.params.iterations {
            let output = self.simulate(stats, seed, index, false);
            totals.merge(&output.result);
            self.flush_log(output.log);
        }
        self.finish(totals)
    }

    /// Spread iterations over a rayon pool; results are merged in
    /// iteration order, so totals match [`Simulator::run`].
    pub fn run_parallel(&self, stats: &Stats) -> AggregateResult {
        let threads = num_cpus::get().max(1);
        let pool = match ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool,
            Err(err) => {
                warn!(error = %err, "thread pool unavailable, running sequentially");
                return self.run(stats);
            }
        };
        info!(
            iterations = self.params.iterations,
            threads,
            seed = self.seed,
            rotation = %self.rotation.name,
            "starting parallel run"
        );

        let outputs: Vec<IterationOutput> = pool.install(|| {
            (0..self.params.iterations)
                .into_par_iter()
                .map(|index| self.simulate(stats, self.seed, index, false))
                .collect()
        });

        let mut totals = SimulationResult::default();
        for output in outputs {
            totals.merge(&output.result);
            self.flush_log(output.log);
        }
        self.finish(totals)
    }

    /// A single iteration's counters.
    pub fn run_iteration(&self, stats: &Stats, index: usize) -> SimulationResult {
        self.simulate(stats, self.seed, index, false).result
    }

    /// Every player cast of one iteration, in order.
    pub fn trace_iteration(&self, stats: &Stats, index: usize) -> Vec<CastResult> {
        self.simulate(stats, self.seed, index, true).casts
    }

    fn simulate(&self, stats: &Stats, seed: u64, index: usize, trace: bool) -> IterationOutput {
        let seed = seed.wrapping_add(index as u64);
        let iteration = Iteration::new(self, stats, seed, trace);
        let output = iteration.run();
        debug!(
            index,
            seed,
            damage = output.result.total_damage,
            casts = output.result.total_casts,
            "iteration finished"
        );
        output
    }

    fn flush_log(&self, lines: Vec<String>) {
        let Some(sink) = &self.log else {
            return;
        };
        let mut sink = match sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        for line in lines {
            if let Err(err) = writeln!(sink, "{line}") {
                warn!(error = %err, "combat log write failed");
                return;
            }
        }
        if let Err(err) = sink.flush() {
            warn!(error = %err, "combat log flush failed");
        }
    }

    fn finish(&self, totals: SimulationResult) -> AggregateResult {
        let aggregate = AggregateResult::from_totals(totals);
        info!(
            dps = aggregate.dps,
            iterations = aggregate.iterations,
            oom_events = aggregate.oom_events,
            "run finished"
        );
        aggregate
    }
}

/// State of one fight.
struct Iteration<'a> {
    book: SpellBook<'a>,
    rotation: &'a CompiledRotation,
    duration: Duration,
    actor: Actor,
    rng: SmallRng,
    queue: EventQueue<SimEvent>,
    pet: Option<Imp>,
    result: SimulationResult,
    log: Option<CombatLog>,
    casts: Option<Vec<CastResult>>,
}

impl<'a> Iteration<'a> {
    fn new(sim: &'a Simulator, stats: &Stats, seed: u64, trace: bool) -> Self {
        let config = &sim.config;
        Self {
            book: SpellBook::new(config, sim.params.target),
            rotation: &sim.rotation,
            duration: sim.params.duration,
            actor: Actor::new(*stats, config),
            rng: SmallRng::seed_from_u64(seed),
            queue: EventQueue::new(),
            pet: config.has_imp().then(|| Imp::new(stats, config)),
            result: SimulationResult::for_iteration(sim.params.duration.as_secs_f64()),
            log: sim.logging_enabled().then(CombatLog::default),
            casts: trace.then(Vec::new),
        }
    }

    fn config(&self) -> &'a SimConfig {
        self.book.config()
    }

    fn run(mut self) -> IterationOutput {
        self.prepare();
        while self.actor.now < self.duration {
            self.run_due_events();
            let now = self.actor.now;
            if !self.actor.gcd.ready(now) {
                let remaining = self.actor.gcd.remaining(now);
                self.wait(remaining);
                continue;
            }
            let rotation = self.rotation;
            if !self.run_actions(&rotation.actions) {
                // nothing fired; guarantee progress
                let step = self.config().constants.base_gcd();
                self.wait(step);
            }
        }
        self.flush_changes();

        IterationOutput {
            result: self.result,
            log: self.log.map(CombatLog::into_lines).unwrap_or_default(),
            casts: self.casts.unwrap_or_default(),
        }
    }

    fn prepare(&mut self) {
        if self.config().player.target.debuffs.curse_of_the_elements {
            self.actor.apply_curse_of_the_elements(self.duration);
        }
        if let Some(imp) = &self.pet {
            let cast_time = imp.cast_time().as_secs_f64();
            self.log_line(format_args!("Imp summoned (Firebolt every {cast_time:.2}s)"));
            self.schedule_pet_cast(Duration::ZERO);
        }
        self.flush_changes();
    }

    // ------------------------------------------------------------------
    // time
    // ------------------------------------------------------------------

    /// Let `duration` pass (clamped to the end of the fight), stepping
    /// exactly onto every event on the way.
    fn wait(&mut self, duration: Duration) {
        let end = self.actor.now.saturating_add(duration).min(self.duration);
        loop {
            self.run_due_events();
            let now = self.actor.now;
            if now >= end {
                break;
            }
            let mut step = end - now;
            if let Some(next) = self.queue.next_delta(now) {
                step = step.min(next);
            }
            self.advance_time(step);
        }
    }

    fn advance_time(&mut self, step: Duration) {
        let start = self.actor.now;
        let end = start + step;
        self.accrue_uptime(start, end);
        self.actor.now = end;
        self.soul_leech_regen();
        self.run_due_events();
        self.actor.expire_auras();
        self.flush_changes();
    }

    /// Credit each active buff with its overlap of `[start, end)`.
    fn accrue_uptime(&mut self, start: Duration, end: Duration) {
        for buff in Buff::ALL {
            let aura = self.actor.buff(buff);
            if !aura.is_active() {
                continue;
            }
            let until = match aura.duration() {
                Some(_) => aura.expires_at().min(end),
                None => end,
            };
            let overlap = until.saturating_sub(start).as_secs_f64();
            if overlap <= 0.0 {
                continue;
            }
            let stacks = aura.stacks();
            self.result.add_uptime(buff, overlap);
            if buff == Buff::Backdraft {
                self.result.backdraft_charge_seconds += overlap * f64::from(stacks);
            }
        }
    }

    /// Improved Soul Leech mana ticks up to the current time.
    fn soul_leech_regen(&mut self) {
        let leech = &self.config().talents.improved_soul_leech;
        let interval = secs(leech.hot_tick_interval);
        if leech.points == 0 || interval.is_zero() {
            return;
        }
        let aura = self.actor.buff(Buff::ImprovedSoulLeech);
        if !aura.is_active() {
            return;
        }
        let until = aura.expires_at().min(self.actor.now);
        let per_tick = self.actor.stats.max_mana * leech.hot_mana_per_tick;
        while self.actor.soul_leech_last_tick.saturating_add(interval) <= until {
            self.actor.soul_leech_last_tick += interval;
            let gained = self.actor.gain_mana(per_tick);
            if gained > 0.0 {
                let at = self.actor.soul_leech_last_tick;
                let mana = self.actor.mana;
                self.log_at(
                    at,
                    format_args!("RESOURCE mana +{gained:.0} (Improved Soul Leech) -> {mana:.0}"),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // events
    // ------------------------------------------------------------------

    fn run_due_events(&mut self) {
        while let Some((at, event)) = self.queue.pop_ready(self.actor.now) {
            match event {
                SimEvent::DotTick(debuff) => self.dot_tick(debuff),
                SimEvent::PetCast => self.pet_cast(at),
            }
        }
    }

    fn dot_tick(&mut self, debuff: Debuff) {
        if let Some(dot) = self.actor.dot_mut(debuff) {
            dot.set_handle(None);
        }
        let book = self.book;
        let Some(tick) = book.resolve_tick(&mut self.actor, debuff, &mut self.rng) else {
            return;
        };
        self.result.record_tick(debuff.spell(), tick.crit, tick.damage);
        if tick.shadow_trance {
            self.result.shadow_trance_procs += 1;
        }
        let crit = if tick.crit { " (crit)" } else { "" };
        self.log_line(format_args!(
            "DOT_TICK {} dmg={:.0}{crit}",
            debuff.label(),
            tick.damage
        ));
        self.schedule_tick(debuff);
        self.flush_changes();
    }

    /// Start a tick chain for `debuff` unless one is already pending.
    fn schedule_tick(&mut self, debuff: Debuff) {
        let Some(dot) = self.actor.dot(debuff) else {
            return;
        };
        if dot.has_pending_tick() {
            return;
        }
        let Some(at) = dot.next_tick_at() else {
            return;
        };
        let handle = self.queue.schedule(at, SimEvent::DotTick(debuff));
        if let Some(dot) = self.actor.dot_mut(debuff) {
            dot.set_handle(Some(handle));
        }
    }

    fn schedule_pet_cast(&mut self, from: Duration) {
        let Some(imp) = self.pet.as_mut() else {
            return;
        };
        let complete = imp.begin_cast(from).saturating_add(imp.cast_time());
        if complete <= self.duration {
            self.queue.schedule(complete, SimEvent::PetCast);
        }
    }

    fn pet_cast(&mut self, at: Duration) {
        let config = self.config();
        let Some(imp) = self.pet.as_ref() else {
            return;
        };
        let bolt = imp.firebolt(config, &mut self.rng);
        let mana = imp.mana();
        self.result
            .record_cast(Spell::ImpFirebolt, true, bolt.crit, bolt.damage);
        let outcome = if bolt.crit { "CRIT" } else { "HIT" };
        self.log_at(
            at,
            format_args!("PET_CAST Firebolt {outcome} dmg={:.0} (imp mana {mana:.0})", bolt.damage),
        );
        self.schedule_pet_cast(at);

        let empowered = &config.talents.empowered_imp;
        if bolt.crit && empowered.points > 0 {
            let chance = (f64::from(empowered.points) * empowered.proc_chance_per_point).min(1.0);
            if self.rng.gen::<f64>() < chance {
                self.actor.gain_buff(Buff::EmpoweredImp);
            }
        }
        self.flush_changes();
    }

    // ------------------------------------------------------------------
    // rotation
    // ------------------------------------------------------------------

    /// First-match-wins walk; true when an action consumed the decision.
    fn run_actions(&mut self, actions: &'a [Action]) -> bool {
        for action in actions {
            let passes = {
                let ctx = ActorContext::new(&self.actor, self.config());
                action.condition.eval(&ctx)
            };
            if passes && self.execute(action) {
                return true;
            }
        }
        false
    }

    fn execute(&mut self, action: &'a Action) -> bool {
        match &action.kind {
            ActionKind::CastSpell(spell) => self.cast(*spell),
            ActionKind::UseItem(item) => {
                self.use_item(*item);
                // off the GCD: the walk continues
                false
            }
            ActionKind::Wait(duration) => {
                self.log_line(format_args!("WAIT {:.2}s", duration.as_secs_f64()));
                self.wait(*duration);
                true
            }
            ActionKind::Macro(steps) => self.run_actions(steps),
        }
    }

    fn cast(&mut self, spell: Spell) -> bool {
        let now = self.actor.now;
        let mana_before = self.actor.mana;
        let book = self.book;
        let result = match book.try_cast(&mut self.actor, spell, &mut self.rng) {
            CastOutcome::Cast(result) => result,
            CastOutcome::Failed(reason) => {
                if reason == CastFailure::Mana {
                    self.result.oom_events += 1;
                }
                self.log_line(format_args!("CAST_FAIL {spell} ({reason})"));
                return false;
            }
        };

        self.log_line(format_args!("CAST_START {spell} (mana={mana_before:.0})"));
        self.result
            .record_cast(spell, result.hit, result.crit, result.damage);
        let outcome = match (result.hit, result.crit) {
            (false, _) => "MISS",
            (true, true) => "CRIT",
            (true, false) => "HIT",
        };
        self.log_line(format_args!(
            "CAST_RESULT {spell} {outcome} dmg={:.0} cast={:.2}s gcd={:.2}s",
            result.damage,
            result.cast_time.as_secs_f64(),
            result.gcd.as_secs_f64()
        ));
        if result.mana_gained > 0.0 {
            let mana = self.actor.mana;
            self.log_line(format_args!(
                "RESOURCE mana +{:.0} ({spell}) -> {mana:.0}",
                result.mana_gained
            ));
        }

        self.actor.gcd.reset(now, result.gcd);
        for debuff in PERIODIC {
            self.schedule_tick(debuff);
        }
        self.flush_changes();

        let busy = result.busy_for();
        if let Some(casts) = self.casts.as_mut() {
            casts.push(result);
        }
        self.wait(busy);
        true
    }

    /// Use an item if it is off cooldown; never consumes time.
    fn use_item(&mut self, item: Item) {
        if !self.actor.item_ready(item) {
            return;
        }
        let items = &self.config().items;
        match item {
            Item::RunicManaPotion => {
                let potion = &items.runic_mana_potion;
                let spread = (potion.mana_max - potion.mana_min).max(0.0);
                let amount = potion.mana_min + self.rng.gen::<f64>() * spread;
                let gained = self.actor.gain_mana(amount);
                self.actor
                    .start_item_cooldown(item, secs(potion.cooldown));
                let mana = self.actor.mana;
                self.log_line(format_args!("ITEM_USE {}", item.label()));
                self.log_line(format_args!(
                    "RESOURCE mana +{gained:.0} ({}) -> {mana:.0}",
                    item.label()
                ));
            }
            Item::PotionOfWildMagic => {
                self.actor.gain_buff(Buff::WildMagic);
                self.actor
                    .start_item_cooldown(item, secs(items.potion_of_wild_magic.cooldown));
                self.log_line(format_args!("ITEM_USE {}", item.label()));
            }
        }
        self.result.item_uses += 1;
        self.flush_changes();
    }

    // ------------------------------------------------------------------
    // logging
    // ------------------------------------------------------------------

    fn log_line(&mut self, message: std::fmt::Arguments<'_>) {
        let now = self.actor.now;
        self.log_at(now, message);
    }

    fn log_at(&mut self, at: Duration, message: std::fmt::Arguments<'_>) {
        if let Some(log) = self.log.as_mut() {
            log.record(at, message);
        }
    }

    /// Drain recorded aura changes into the log.
    fn flush_changes(&mut self) {
        let now = self.actor.now;
        match self.log.as_mut() {
            Some(log) => {
                for (slot, change) in self.actor.drain_changes() {
                    log.record_change(now, slot, change);
                }
            }
            None => {
                self.actor.drain_changes();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::Condition;

    fn action(kind: ActionKind, condition: Condition) -> Action {
        Action {
            kind,
            condition,
            tags: Vec::new(),
        }
    }

    fn rotation(actions: Vec<Action>) -> CompiledRotation {
        CompiledRotation {
            name: "test".to_string(),
            description: String::new(),
            variables: Default::default(),
            actions,
        }
    }

    fn simulator(config: SimConfig, actions: Vec<Action>, seconds: u64) -> Simulator {
        let params = SimParams {
            duration: Duration::from_secs(seconds),
            iterations: 3,
            target: TargetKind::Boss,
        };
        Simulator::new(config, params, rotation(actions), 42, None)
    }

    #[test]
    fn first_passing_entry_is_cast() {
        let sim = simulator(
            SimConfig::default(),
            vec![
                action(ActionKind::CastSpell(Spell::ChaosBolt), Condition::False),
                action(ActionKind::CastSpell(Spell::Incinerate), Condition::True),
                action(ActionKind::CastSpell(Spell::ShadowBolt), Condition::True),
            ],
            10,
        );
        let casts = sim.trace_iteration(&Stats::default(), 0);
        assert!(!casts.is_empty());
        assert!(casts.iter().all(|c| c.spell == Spell::Incinerate));
    }

    #[test]
    fn failed_cast_falls_through_to_the_next_entry() {
        let sim = simulator(
            SimConfig::default(),
            vec![
                action(ActionKind::CastSpell(Spell::ChaosBolt), Condition::True),
                action(ActionKind::CastSpell(Spell::Incinerate), Condition::True),
            ],
            20,
        );
        let casts = sim.trace_iteration(&Stats::default(), 0);
        assert_eq!(casts[0].spell, Spell::ChaosBolt);
        assert_eq!(casts[1].spell, Spell::Incinerate);
        assert!(casts.iter().filter(|c| c.spell == Spell::ChaosBolt).count() >= 2);
    }

    #[test]
    fn empty_rotation_still_reaches_the_end() {
        let sim = simulator(SimConfig::default(), Vec::new(), 30);
        let result = sim.run_iteration(&Stats::default(), 0);
        assert_eq!(result.total_casts, 0);
        assert_eq!(result.duration, 30.0);
    }

    #[test]
    fn dots_tick_until_expiry() {
        let mut config = SimConfig::default();
        config.talents.improved_soul_leech.points = 0;
        let immolate_once = action(
            ActionKind::CastSpell(Spell::Immolate),
            Condition::Not(Box::new(Condition::DebuffActive {
                debuff: Debuff::Immolate,
                min_remaining: None,
                max_remaining: None,
            })),
        );
        let sim = simulator(config, vec![immolate_once], 14);
        let mut stats = Stats::default();
        stats.haste_pct = 0.0;
        let result = sim.run_iteration(&stats, 0);
        let immolate = &result.spells[&Spell::Immolate];
        assert_eq!(immolate.casts, 1);
        // cast at 0 with ticks every 3s: 3, 6, 9, 12
        assert_eq!(immolate.ticks, 4);
    }

    #[test]
    fn out_of_mana_casts_are_counted() {
        let mut stats = Stats::default();
        stats.max_mana = 600.0;
        let mut config = SimConfig::default();
        config.talents.improved_soul_leech.points = 0;
        let sim = simulator(
            config,
            vec![action(ActionKind::CastSpell(Spell::Incinerate), Condition::True)],
            10,
        );
        let result = sim.run_iteration(&stats, 0);
        assert_eq!(result.spells[&Spell::Incinerate].casts, 1);
        assert!(result.oom_events > 0);
    }

    #[test]
    fn items_are_off_the_gcd() {
        let mut stats = Stats::default();
        stats.haste_pct = 0.0;
        let sim = simulator(
            SimConfig::default(),
            vec![
                action(ActionKind::UseItem(Item::PotionOfWildMagic), Condition::True),
                action(ActionKind::CastSpell(Spell::Incinerate), Condition::True),
            ],
            5,
        );
        let result = sim.run_iteration(&stats, 0);
        assert_eq!(result.item_uses, 1);
        assert_eq!(result.spells[&Spell::Incinerate].casts, 2);
        assert!(result.buff_uptime[&Buff::WildMagic] > 4.9);
    }

    #[test]
    fn imp_casts_on_its_own() {
        let mut config = SimConfig::default();
        config.player.pet.summon = "imp".to_string();
        let sim = simulator(config, Vec::new(), 20);
        let result = sim.run_iteration(&Stats::default(), 0);
        // one Firebolt every 2s
        assert_eq!(result.spells[&Spell::ImpFirebolt].casts, 10);
        assert_eq!(result.total_casts, 10);
    }

    #[test]
    fn combat_log_is_written_in_order() {
        #[derive(Clone, Default)]
        struct Shared(std::sync::Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let sink = Shared::default();
        let params = SimParams {
            duration: Duration::from_secs(6),
            iterations: 1,
            target: TargetKind::Boss,
        };
        let sim = Simulator::new(
            SimConfig::default(),
            params,
            rotation(vec![action(ActionKind::CastSpell(Spell::Immolate), Condition::True)]),
            1,
            Some(Box::new(sink.clone())),
        );
        sim.run(&Stats::default());

        let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("[   0.00s] CAST_START Immolate"), "{first}");
        assert!(text.contains("CAST_RESULT Immolate"));
        assert!(text.contains("DEBUFF_APPLY Immolate"));
    }
}
