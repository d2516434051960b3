//! Configuration structures for loading simulator YAML/JSON files
//!
//! A single document carries four sections: `constants`, `spells`,
//! `talents` and `player`. Every field has a default matching a standard
//! level-80 destruction setup, so sparse documents are valid.

use crate::error::ConfigError;
use crate::registry::{normalize, Rarity, Rune};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Convert configured seconds into a duration; negative or NaN clamps to
/// zero and values too large to represent saturate.
pub fn secs(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Hit cap class of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    Boss,
    Equal,
}

// Case-insensitive, accepts "equal_level" too
impl<'de> Deserialize<'de> for TargetKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match normalize(&s).as_str() {
            "boss" => Ok(TargetKind::Boss),
            "equal" | "equal_level" => Ok(TargetKind::Equal),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["boss", "equal", "equal_level"],
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// constants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HitMechanics {
    pub boss_hit_cap: f64,
    pub equal_level_miss_chance: f64,
}

impl Default for HitMechanics {
    fn default() -> Self {
        Self {
            boss_hit_cap: 17.0,
            equal_level_miss_chance: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcdConfig {
    pub base: f64,
    pub minimum: f64,
}

impl Default for GcdConfig {
    fn default() -> Self {
        Self {
            base: 1.5,
            minimum: 1.0,
        }
    }
}

/// Rating conversions used by the stat-weight summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatConversions {
    pub crit_rating_per_percent: f64,
    pub haste_rating_per_percent: f64,
    pub hit_rating_per_percent: f64,
}

impl Default for StatConversions {
    fn default() -> Self {
        Self {
            crit_rating_per_percent: 14.0,
            haste_rating_per_percent: 10.0,
            hit_rating_per_percent: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    pub hit_mechanics: HitMechanics,
    pub gcd: GcdConfig,
    pub stat_conversions: StatConversions,
}

impl Constants {
    pub fn base_gcd(&self) -> Duration {
        secs(self.gcd.base)
    }

    pub fn min_gcd(&self) -> Duration {
        secs(self.gcd.minimum)
    }
}

// ---------------------------------------------------------------------------
// spells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmolateData {
    pub direct_damage: f64,
    pub dot_damage: f64,
    pub dot_duration: f64,
    pub dot_ticks: u32,
    pub cast_time: f64,
    pub mana_cost: f64,
    pub sp_coefficient_direct: f64,
    pub sp_coefficient_dot: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncinerateData {
    pub base_damage_min: f64,
    pub base_damage_max: f64,
    pub immolate_bonus_min: f64,
    pub immolate_bonus_max: f64,
    pub cast_time: f64,
    pub mana_cost: f64,
    pub sp_coefficient: f64,
}

/// Shape shared by the plain direct-damage spells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectSpellData {
    pub base_damage_min: f64,
    pub base_damage_max: f64,
    pub cast_time: f64,
    pub cooldown: f64,
    pub mana_cost: f64,
    pub sp_coefficient: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflagrateData {
    pub immolate_dot_percentage: f64,
    pub conflag_dot_percentage: f64,
    pub cooldown: f64,
    pub mana_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeTapData {
    pub mana_base: f64,
    pub spellpower_coefficient: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DotSpellData {
    pub dot_damage: f64,
    pub dot_duration: f64,
    pub dot_ticks: u32,
    pub mana_cost: f64,
    pub sp_coefficient_dot: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurseData {
    pub duration: f64,
    pub mana_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellTable {
    pub immolate: ImmolateData,
    pub incinerate: IncinerateData,
    pub chaos_bolt: DirectSpellData,
    pub conflagrate: ConflagrateData,
    pub life_tap: LifeTapData,
    pub soul_fire: DirectSpellData,
    pub shadow_bolt: DirectSpellData,
    pub shadowburn: DirectSpellData,
    pub corruption: DotSpellData,
    pub curse_of_agony: DotSpellData,
    pub curse_of_the_elements: CurseData,
}

impl Default for SpellTable {
    fn default() -> Self {
        Self {
            immolate: ImmolateData {
                direct_damage: 460.0,
                dot_damage: 785.0,
                dot_duration: 15.0,
                dot_ticks: 5,
                cast_time: 1.5,
                mana_cost: 495.0,
                sp_coefficient_direct: 0.2,
                sp_coefficient_dot: 1.0,
            },
            incinerate: IncinerateData {
                base_damage_min: 582.0,
                base_damage_max: 676.0,
                immolate_bonus_min: 145.0,
                immolate_bonus_max: 169.0,
                cast_time: 2.5,
                mana_cost: 485.0,
                sp_coefficient: 0.7139,
            },
            chaos_bolt: DirectSpellData {
                base_damage_min: 1429.0,
                base_damage_max: 1813.0,
                cast_time: 2.5,
                cooldown: 12.0,
                mana_cost: 200.0,
                sp_coefficient: 0.7142,
            },
            conflagrate: ConflagrateData {
                immolate_dot_percentage: 0.6,
                conflag_dot_percentage: 0.4,
                cooldown: 10.0,
                mana_cost: 370.0,
            },
            life_tap: LifeTapData {
                mana_base: 2000.0,
                spellpower_coefficient: 0.5,
            },
            soul_fire: DirectSpellData {
                base_damage_min: 1323.0,
                base_damage_max: 1657.0,
                cast_time: 6.0,
                cooldown: 0.0,
                mana_cost: 455.0,
                sp_coefficient: 1.15,
            },
            shadow_bolt: DirectSpellData {
                base_damage_min: 690.0,
                base_damage_max: 770.0,
                cast_time: 2.5,
                cooldown: 0.0,
                mana_cost: 450.0,
                sp_coefficient: 0.857,
            },
            shadowburn: DirectSpellData {
                base_damage_min: 775.0,
                base_damage_max: 865.0,
                cast_time: 0.0,
                cooldown: 15.0,
                mana_cost: 400.0,
                sp_coefficient: 0.4286,
            },
            corruption: DotSpellData {
                dot_damage: 1080.0,
                dot_duration: 18.0,
                dot_ticks: 6,
                mana_cost: 300.0,
                sp_coefficient_dot: 1.2,
            },
            curse_of_agony: DotSpellData {
                dot_damage: 1740.0,
                dot_duration: 24.0,
                dot_ticks: 12,
                mana_cost: 300.0,
                sp_coefficient_dot: 1.2,
            },
            curse_of_the_elements: CurseData {
                duration: 300.0,
                mana_cost: 0.0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManaPotionData {
    pub mana_min: f64,
    pub mana_max: f64,
    pub cooldown: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WildMagicData {
    pub spell_power: f64,
    pub crit_percent: f64,
    pub duration: f64,
    pub cooldown: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTable {
    pub runic_mana_potion: ManaPotionData,
    pub potion_of_wild_magic: WildMagicData,
}

impl Default for ManaPotionData {
    fn default() -> Self {
        Self {
            mana_min: 4200.0,
            mana_max: 4400.0,
            cooldown: 60.0,
        }
    }
}

impl Default for WildMagicData {
    fn default() -> Self {
        Self {
            spell_power: 200.0,
            crit_percent: 4.5,
            duration: 15.0,
            cooldown: 60.0,
        }
    }
}

impl Default for ItemTable {
    fn default() -> Self {
        Self {
            runic_mana_potion: ManaPotionData::default(),
            potion_of_wild_magic: WildMagicData::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// talents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Multiplier {
    pub damage_multiplier: f64,
}

impl Default for Multiplier {
    fn default() -> Self {
        Self {
            damage_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Aftermath {
    pub dot_damage_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FireAndBrimstone {
    pub damage_multiplier: f64,
    pub conflagrate_crit_bonus: f64,
    pub applies_to_incinerate: bool,
    pub applies_to_chaos_bolt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruin {
    pub crit_multiplier: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowAndFlame {
    pub bonus_sp_percentage: f64,
}

/// Talent granting flat crit per point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CritTalent {
    pub points: u32,
    pub crit_bonus_per_point: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pyroclasm {
    pub points: u32,
    pub damage_multiplier: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Backdraft {
    pub points: u32,
    pub charges: u32,
    pub duration: f64,
    pub cast_time_reduction: f64,
    pub gcd_reduction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImprovedSoulLeech {
    pub points: u32,
    pub proc_chance: f64,
    pub instant_mana_return: f64,
    pub hot_duration: f64,
    pub hot_tick_interval: f64,
    pub hot_mana_per_tick: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpoweredImp {
    pub points: u32,
    pub damage_per_point: f64,
    pub proc_chance_per_point: f64,
    pub buff_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemonicPower {
    pub points: u32,
    pub firebolt_cast_reduction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Nightfall {
    pub points: u32,
    pub proc_chance_per_point: f64,
    pub buff_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Talents {
    pub emberstorm: Multiplier,
    pub improved_immolate: Multiplier,
    pub aftermath: Aftermath,
    pub fire_and_brimstone: FireAndBrimstone,
    pub ruin: Ruin,
    pub shadow_and_flame: ShadowAndFlame,
    pub devastation: CritTalent,
    pub backlash: CritTalent,
    pub pyroclasm: Pyroclasm,
    pub backdraft: Backdraft,
    pub improved_soul_leech: ImprovedSoulLeech,
    pub empowered_imp: EmpoweredImp,
    pub demonic_power: DemonicPower,
    pub nightfall: Nightfall,
}

impl Default for Aftermath {
    fn default() -> Self {
        Self {
            dot_damage_multiplier: 1.1,
        }
    }
}

impl Default for FireAndBrimstone {
    fn default() -> Self {
        Self {
            damage_multiplier: 1.1,
            conflagrate_crit_bonus: 0.25,
            applies_to_incinerate: true,
            applies_to_chaos_bolt: true,
        }
    }
}

impl Default for Ruin {
    fn default() -> Self {
        Self {
            crit_multiplier: 2.0,
        }
    }
}

impl Default for Pyroclasm {
    fn default() -> Self {
        Self {
            points: 2,
            damage_multiplier: 1.06,
            duration: 10.0,
        }
    }
}

impl Default for Backdraft {
    fn default() -> Self {
        Self {
            points: 3,
            charges: 3,
            duration: 15.0,
            cast_time_reduction: 0.3,
            gcd_reduction: 0.3,
        }
    }
}

impl Default for ImprovedSoulLeech {
    fn default() -> Self {
        Self {
            points: 2,
            proc_chance: 0.3,
            instant_mana_return: 0.02,
            hot_duration: 15.0,
            hot_tick_interval: 5.0,
            hot_mana_per_tick: 0.0025,
        }
    }
}

impl Default for EmpoweredImp {
    fn default() -> Self {
        Self {
            points: 3,
            damage_per_point: 0.1,
            proc_chance_per_point: 0.333,
            buff_duration: 8.0,
        }
    }
}

impl Default for DemonicPower {
    fn default() -> Self {
        Self {
            points: 2,
            firebolt_cast_reduction: 0.25,
        }
    }
}

impl Default for Nightfall {
    fn default() -> Self {
        Self {
            points: 0,
            proc_chance_per_point: 0.02,
            buff_duration: 10.0,
        }
    }
}

impl Default for Talents {
    fn default() -> Self {
        Self {
            emberstorm: Multiplier {
                damage_multiplier: 1.15,
            },
            improved_immolate: Multiplier {
                damage_multiplier: 1.3,
            },
            aftermath: Aftermath::default(),
            fire_and_brimstone: FireAndBrimstone::default(),
            ruin: Ruin::default(),
            shadow_and_flame: ShadowAndFlame::default(),
            devastation: CritTalent {
                points: 1,
                crit_bonus_per_point: 0.05,
            },
            backlash: CritTalent {
                points: 3,
                crit_bonus_per_point: 0.01,
            },
            pyroclasm: Pyroclasm::default(),
            backdraft: Backdraft::default(),
            improved_soul_leech: ImprovedSoulLeech::default(),
            empowered_imp: EmpoweredImp::default(),
            demonic_power: DemonicPower::default(),
            nightfall: Nightfall::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterInfo {
    pub name: String,
    pub level: u32,
}

impl Default for CharacterInfo {
    fn default() -> Self {
        Self {
            name: "Warlock".to_string(),
            level: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub spell_power: f64,
    pub crit_percent: f64,
    pub haste_percent: f64,
    pub spirit: f64,
    pub hit_percent: f64,
    pub max_mana: f64,
    pub intellect: f64,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            spell_power: 1800.0,
            crit_percent: 25.0,
            haste_percent: 10.0,
            spirit: 300.0,
            hit_percent: 17.0,
            max_mana: 20000.0,
            intellect: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDebuffs {
    /// Keep Curse of the Elements on the target for the whole fight.
    pub curse_of_the_elements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub level: u32,
    pub debuffs: TargetDebuffs,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            kind: TargetKind::Boss,
            level: 83,
            debuffs: TargetDebuffs::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub duration_seconds: f64,
    pub iterations: usize,
    /// Base seed; `None` draws one from entropy at startup.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration_seconds: 180.0,
            iterations: 1000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    /// `imp`, `none` or empty.
    pub summon: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneSlots {
    pub legendary: Vec<String>,
    pub epic: Vec<String>,
    pub rare: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneLimits {
    pub legendary: usize,
    pub epic: usize,
    pub rare: usize,
}

impl Default for RuneLimits {
    fn default() -> Self {
        Self {
            legendary: 1,
            epic: 2,
            rare: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneConfig {
    pub equipped: RuneSlots,
    pub limits: RuneLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub character: CharacterInfo,
    pub stats: PlayerStats,
    pub target: TargetConfig,
    pub simulation: SimulationSettings,
    /// Rotation document, relative to the config file.
    pub rotation: String,
    pub pet: PetConfig,
    pub runes: RuneConfig,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            character: CharacterInfo::default(),
            stats: PlayerStats::default(),
            target: TargetConfig::default(),
            simulation: SimulationSettings::default(),
            rotation: "rotations/destruction-default.yaml".to_string(),
            pet: PetConfig::default(),
            runes: RuneConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// document
// ---------------------------------------------------------------------------

/// Full simulator configuration loaded from YAML/JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub constants: Constants,
    pub spells: SpellTable,
    pub items: ItemTable,
    pub talents: Talents,
    pub player: Player,

    #[serde(skip)]
    active_runes: BTreeSet<Rune>,
    #[serde(skip)]
    source_dir: Option<PathBuf>,
}

impl SimConfig {
    /// Load and validate a configuration file; JSON or YAML by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let mut config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        config.source_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Check numeric fields and resolve the rune selection.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let sim = &self.player.simulation;
        if !(sim.duration_seconds.is_finite() && sim.duration_seconds > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "player.simulation.duration_seconds".to_string(),
                message: format!("must be > 0 (got {})", sim.duration_seconds),
            });
        }
        if Duration::try_from_secs_f64(sim.duration_seconds).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "player.simulation.duration_seconds".to_string(),
                message: format!("too large (got {})", sim.duration_seconds),
            });
        }
        if sim.iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "player.simulation.iterations".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.player.stats.max_mana <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "player.stats.max_mana".to_string(),
                message: format!("must be > 0 (got {})", self.player.stats.max_mana),
            });
        }
        if self.constants.gcd.base <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "constants.gcd.base".to_string(),
                message: format!("must be > 0 (got {})", self.constants.gcd.base),
            });
        }
        match normalize(&self.player.pet.summon).as_str() {
            "" | "none" | "imp" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "player.pet.summon".to_string(),
                    message: format!("unknown pet '{other}' (use imp|none)"),
                })
            }
        }
        self.active_runes = validate_runes(&self.player.runes)?;
        Ok(())
    }

    pub fn has_rune(&self, rune: Rune) -> bool {
        self.active_runes.contains(&rune)
    }

    pub fn active_runes(&self) -> impl Iterator<Item = Rune> + '_ {
        self.active_runes.iter().copied()
    }

    /// Equip a rune programmatically, bypassing slot limits.
    pub fn equip(&mut self, rune: Rune) {
        let slot = match rune.rarity() {
            Rarity::Legendary => &mut self.player.runes.equipped.legendary,
            Rarity::Epic => &mut self.player.runes.equipped.epic,
            Rarity::Rare => &mut self.player.runes.equipped.rare,
        };
        if self.active_runes.insert(rune) {
            slot.push(rune.name().to_string());
        }
    }

    pub fn has_imp(&self) -> bool {
        normalize(&self.player.pet.summon) == "imp"
    }

    /// Rotation document path, resolved against the config file's directory.
    pub fn rotation_path(&self) -> PathBuf {
        let rotation = Path::new(&self.player.rotation);
        match &self.source_dir {
            Some(dir) if rotation.is_relative() => dir.join(rotation),
            _ => rotation.to_path_buf(),
        }
    }
}

fn validate_runes(config: &RuneConfig) -> Result<BTreeSet<Rune>, ConfigError> {
    let mut active = BTreeSet::new();
    let slots = [
        (&config.equipped.legendary, config.limits.legendary, Rarity::Legendary),
        (&config.equipped.epic, config.limits.epic, Rarity::Epic),
        (&config.equipped.rare, config.limits.rare, Rarity::Rare),
    ];
    for (names, limit, expected) in slots {
        if limit > 0 && names.len() > limit {
            return Err(ConfigError::RuneLimitExceeded {
                rarity: expected.to_string(),
                count: names.len(),
                limit,
            });
        }
        for raw in names {
            let rune = Rune::from_name(raw).ok_or_else(|| ConfigError::UnknownRune(raw.clone()))?;
            if rune.rarity() != expected {
                return Err(ConfigError::RuneRarityMismatch {
                    name: rune.name().to_string(),
                    actual: rune.rarity().to_string(),
                    listed: expected.to_string(),
                });
            }
            if !active.insert(rune) {
                return Err(ConfigError::DuplicateRune(rune.name().to_string()));
            }
        }
    }
    Ok(active)
}
