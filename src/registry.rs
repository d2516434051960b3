//! Closed identifier sets for spells, auras, resources, items and runes
//!
//! Rotation documents and configuration files refer to everything by
//! snake_case name. Names are resolved once, at load time, into the enums
//! below; the simulation never handles raw strings.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Canonical form of a user-supplied identifier.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Every ability the simulator can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Spell {
    Immolate,
    Incinerate,
    ChaosBolt,
    Conflagrate,
    LifeTap,
    SoulFire,
    ShadowBolt,
    Shadowburn,
    Corruption,
    CurseOfAgony,
    CurseOfTheElements,
    /// Cast by the Imp, never by the player.
    ImpFirebolt,
}

impl Spell {
    pub const ALL: [Spell; 12] = [
        Spell::Immolate,
        Spell::Incinerate,
        Spell::ChaosBolt,
        Spell::Conflagrate,
        Spell::LifeTap,
        Spell::SoulFire,
        Spell::ShadowBolt,
        Spell::Shadowburn,
        Spell::Corruption,
        Spell::CurseOfAgony,
        Spell::CurseOfTheElements,
        Spell::ImpFirebolt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Spell::Immolate => "immolate",
            Spell::Incinerate => "incinerate",
            Spell::ChaosBolt => "chaos_bolt",
            Spell::Conflagrate => "conflagrate",
            Spell::LifeTap => "life_tap",
            Spell::SoulFire => "soul_fire",
            Spell::ShadowBolt => "shadow_bolt",
            Spell::Shadowburn => "shadowburn",
            Spell::Corruption => "corruption",
            Spell::CurseOfAgony => "curse_of_agony",
            Spell::CurseOfTheElements => "curse_of_the_elements",
            Spell::ImpFirebolt => "imp_firebolt",
        }
    }

    /// Human-readable label used in reports and the combat log.
    pub fn label(self) -> &'static str {
        match self {
            Spell::Immolate => "Immolate",
            Spell::Incinerate => "Incinerate",
            Spell::ChaosBolt => "Chaos Bolt",
            Spell::Conflagrate => "Conflagrate",
            Spell::LifeTap => "Life Tap",
            Spell::SoulFire => "Soul Fire",
            Spell::ShadowBolt => "Shadow Bolt",
            Spell::Shadowburn => "Shadowburn",
            Spell::Corruption => "Corruption",
            Spell::CurseOfAgony => "Curse of Agony",
            Spell::CurseOfTheElements => "Curse of the Elements",
            Spell::ImpFirebolt => "Firebolt (Imp)",
        }
    }

    /// Whether a rotation may ask for this spell.
    pub fn castable(self) -> bool {
        !matches!(self, Spell::ImpFirebolt)
    }

    pub fn from_name(name: &str) -> Option<Spell> {
        let name = normalize(name);
        Spell::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Player-side auras (and the Heating Up target stack, which rotations
/// query like a buff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Buff {
    Pyroclasm,
    Backdraft,
    GuldansChosen,
    CataclysmicBurst,
    HeatingUp,
    DecisiveDecimation,
    ImprovedSoulLeech,
    LifeTapBuff,
    ShadowTrance,
    EmpoweredImp,
    WildMagic,
}

impl Buff {
    pub const ALL: [Buff; 11] = [
        Buff::Pyroclasm,
        Buff::Backdraft,
        Buff::GuldansChosen,
        Buff::CataclysmicBurst,
        Buff::HeatingUp,
        Buff::DecisiveDecimation,
        Buff::ImprovedSoulLeech,
        Buff::LifeTapBuff,
        Buff::ShadowTrance,
        Buff::EmpoweredImp,
        Buff::WildMagic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Buff::Pyroclasm => "pyroclasm",
            Buff::Backdraft => "backdraft",
            Buff::GuldansChosen => "guldans_chosen",
            Buff::CataclysmicBurst => "cataclysmic_burst",
            Buff::HeatingUp => "heating_up",
            Buff::DecisiveDecimation => "decisive_decimation",
            Buff::ImprovedSoulLeech => "improved_soul_leech",
            Buff::LifeTapBuff => "life_tap_buff",
            Buff::ShadowTrance => "shadow_trance",
            Buff::EmpoweredImp => "empowered_imp",
            Buff::WildMagic => "wild_magic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Buff::Pyroclasm => "Pyroclasm",
            Buff::Backdraft => "Backdraft",
            Buff::GuldansChosen => "Gul'dan's Chosen",
            Buff::CataclysmicBurst => "Cataclysmic Burst",
            Buff::HeatingUp => "Heating Up",
            Buff::DecisiveDecimation => "Decisive Decimation",
            Buff::ImprovedSoulLeech => "Improved Soul Leech",
            Buff::LifeTapBuff => "Life Tap",
            Buff::ShadowTrance => "Shadow Trance",
            Buff::EmpoweredImp => "Empowered Imp",
            Buff::WildMagic => "Wild Magic",
        }
    }

    /// Slot in per-buff arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Buff> {
        let name = normalize(name);
        if name == "soul_leech" {
            return Some(Buff::ImprovedSoulLeech);
        }
        Buff::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Target debuffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Debuff {
    Immolate,
    Corruption,
    CurseOfAgony,
    CurseOfTheElements,
}

impl Debuff {
    pub const ALL: [Debuff; 4] = [
        Debuff::Immolate,
        Debuff::Corruption,
        Debuff::CurseOfAgony,
        Debuff::CurseOfTheElements,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Debuff::Immolate => "immolate",
            Debuff::Corruption => "corruption",
            Debuff::CurseOfAgony => "curse_of_agony",
            Debuff::CurseOfTheElements => "curse_of_the_elements",
        }
    }

    pub fn label(self) -> &'static str {
        self.spell().label()
    }

    /// The spell that applies this debuff.
    pub fn spell(self) -> Spell {
        match self {
            Debuff::Immolate => Spell::Immolate,
            Debuff::Corruption => Spell::Corruption,
            Debuff::CurseOfAgony => Spell::CurseOfAgony,
            Debuff::CurseOfTheElements => Spell::CurseOfTheElements,
        }
    }

    /// Debuffs that deal periodic damage.
    pub fn is_periodic(self) -> bool {
        !matches!(self, Debuff::CurseOfTheElements)
    }

    pub fn from_name(name: &str) -> Option<Debuff> {
        let name = normalize(name);
        Debuff::ALL.into_iter().find(|d| d.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Mana,
}

impl Resource {
    pub const ALL: [Resource; 1] = [Resource::Mana];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Mana => "mana",
        }
    }

    pub fn from_name(name: &str) -> Option<Resource> {
        let name = normalize(name);
        Resource::ALL.into_iter().find(|r| r.name() == name)
    }
}

/// Consumables usable through `use_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    RunicManaPotion,
    PotionOfWildMagic,
}

impl Item {
    pub const ALL: [Item; 2] = [Item::RunicManaPotion, Item::PotionOfWildMagic];

    pub fn name(self) -> &'static str {
        match self {
            Item::RunicManaPotion => "runic_mana_potion",
            Item::PotionOfWildMagic => "potion_of_wild_magic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Item::RunicManaPotion => "Runic Mana Potion",
            Item::PotionOfWildMagic => "Potion of Wild Magic",
        }
    }

    pub fn from_name(name: &str) -> Option<Item> {
        let name = normalize(name);
        Item::ALL.into_iter().find(|i| i.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Legendary,
    Epic,
    Rare,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rarity::Legendary => "legendary",
            Rarity::Epic => "epic",
            Rarity::Rare => "rare",
        })
    }
}

/// Equippable enchantments that alter spell behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rune {
    DestructionMastery,
    CataclysmicBurst,
    HeatingUp,
    DecisiveDecimation,
    GuldansChosen,
    AgentOfChaos,
    GlyphOfLifeTap,
    GlyphOfConflagrate,
    DemonicAegis,
    Suppression,
    GlyphOfChaosBolt,
    GlyphOfIncinerate,
}

impl Rune {
    pub const ALL: [Rune; 12] = [
        Rune::DestructionMastery,
        Rune::CataclysmicBurst,
        Rune::HeatingUp,
        Rune::DecisiveDecimation,
        Rune::GuldansChosen,
        Rune::AgentOfChaos,
        Rune::GlyphOfLifeTap,
        Rune::GlyphOfConflagrate,
        Rune::DemonicAegis,
        Rune::Suppression,
        Rune::GlyphOfChaosBolt,
        Rune::GlyphOfIncinerate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rune::DestructionMastery => "destruction_mastery",
            Rune::CataclysmicBurst => "cataclysmic_burst",
            Rune::HeatingUp => "heating_up",
            Rune::DecisiveDecimation => "decisive_decimation",
            Rune::GuldansChosen => "guldans_chosen",
            Rune::AgentOfChaos => "agent_of_chaos",
            Rune::GlyphOfLifeTap => "glyph_of_life_tap",
            Rune::GlyphOfConflagrate => "glyph_of_conflagrate",
            Rune::DemonicAegis => "demonic_aegis",
            Rune::Suppression => "suppression",
            Rune::GlyphOfChaosBolt => "glyph_of_chaos_bolt",
            Rune::GlyphOfIncinerate => "glyph_of_incinerate",
        }
    }

    pub fn rarity(self) -> Rarity {
        match self {
            Rune::DestructionMastery | Rune::CataclysmicBurst => Rarity::Legendary,
            Rune::HeatingUp
            | Rune::DecisiveDecimation
            | Rune::GuldansChosen
            | Rune::AgentOfChaos => Rarity::Epic,
            _ => Rarity::Rare,
        }
    }

    pub fn from_name(name: &str) -> Option<Rune> {
        let name = normalize(name);
        Rune::ALL.into_iter().find(|r| r.name() == name)
    }
}

/// Read-only lookup tables handed to the rotation compiler.
///
/// Built once per process; see [`Registry::global`].
#[derive(Debug, Clone)]
pub struct Registry {
    spells: BTreeMap<String, Spell>,
    buffs: BTreeMap<String, Buff>,
    debuffs: BTreeMap<String, Debuff>,
    resources: BTreeMap<String, Resource>,
    items: BTreeMap<String, Item>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// The standard identifier sets.
    pub fn standard() -> Self {
        let mut buffs: BTreeMap<String, Buff> =
            Buff::ALL.iter().map(|b| (b.name().to_string(), *b)).collect();
        buffs.insert("soul_leech".to_string(), Buff::ImprovedSoulLeech);

        Self {
            spells: Spell::ALL
                .iter()
                .filter(|s| s.castable())
                .map(|s| (s.name().to_string(), *s))
                .collect(),
            buffs,
            debuffs: Debuff::ALL.iter().map(|d| (d.name().to_string(), *d)).collect(),
            resources: Resource::ALL.iter().map(|r| (r.name().to_string(), *r)).collect(),
            items: Item::ALL.iter().map(|i| (i.name().to_string(), *i)).collect(),
        }
    }

    /// Process-wide instance, populated on first use and never mutated.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::standard)
    }

    pub fn spell(&self, name: &str) -> Option<Spell> {
        self.spells.get(&normalize(name)).copied()
    }

    pub fn buff(&self, name: &str) -> Option<Buff> {
        self.buffs.get(&normalize(name)).copied()
    }

    pub fn debuff(&self, name: &str) -> Option<Debuff> {
        self.debuffs.get(&normalize(name)).copied()
    }

    pub fn resource(&self, name: &str) -> Option<Resource> {
        self.resources.get(&normalize(name)).copied()
    }

    pub fn item(&self, name: &str) -> Option<Item> {
        self.items.get(&normalize(name)).copied()
    }

    /// Name listing for authoring tools.
    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            spells: self.spells.keys().cloned().collect(),
            buffs: self.buffs.keys().cloned().collect(),
            debuffs: self.debuffs.keys().cloned().collect(),
            resources: self.resources.keys().cloned().collect(),
            items: self.items.keys().cloned().collect(),
            runes: Rune::ALL
                .iter()
                .map(|r| (r.name().to_string(), r.rarity()))
                .collect(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrySummary {
    pub spells: Vec<String>,
    pub buffs: Vec<String>,
    pub debuffs: Vec<String>,
    pub resources: Vec<String>,
    pub items: Vec<String>,
    pub runes: BTreeMap<String, Rarity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for spell in Spell::ALL {
            assert_eq!(Spell::from_name(spell.name()), Some(spell));
        }
        for buff in Buff::ALL {
            assert_eq!(Buff::from_name(buff.name()), Some(buff));
        }
        for rune in Rune::ALL {
            assert_eq!(Rune::from_name(rune.name()), Some(rune));
        }
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let registry = Registry::standard();
        assert_eq!(registry.spell("  Chaos_Bolt "), Some(Spell::ChaosBolt));
        assert_eq!(registry.buff("SOUL_LEECH"), Some(Buff::ImprovedSoulLeech));
        assert_eq!(registry.item("runic_mana_potion"), Some(Item::RunicManaPotion));
    }

    #[test]
    fn pet_spells_are_not_castable_from_rotations() {
        let registry = Registry::standard();
        assert_eq!(registry.spell("imp_firebolt"), None);
        assert!(!registry.summary().spells.contains(&"imp_firebolt".to_string()));
    }

    #[test]
    fn rune_rarities() {
        assert_eq!(Rune::DestructionMastery.rarity(), Rarity::Legendary);
        assert_eq!(Rune::AgentOfChaos.rarity(), Rarity::Epic);
        assert_eq!(Rune::Suppression.rarity(), Rarity::Rare);
    }
}
