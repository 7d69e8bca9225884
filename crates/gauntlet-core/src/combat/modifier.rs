//! Damage modifier pipeline stages.
//!
//! Each stage maps an incoming [`DamageEvent`] to a new damage amount. A
//! [`HealthTracker`] applies its stages in insertion order, handing each one
//! an event rebuilt with the running amount.
//!
//! # Stages
//!
//! | Stage | Effect |
//! |-------|--------|
//! | [`ResistanceTable`] | `amount * multiplier(type)`, default 1.0 |
//! | [`ArmorModifier`] | flat reduction, half vs Explosive, none vs Magic |
//! | [`CriticalHitModifier`] | random multiplier with an injected RNG |
//!
//! Stages may return values `<= 0`; the tracker treats that as "no damage".

use std::collections::BTreeMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DamageEvent, DamageType, HealthTracker, ModifierId};

/// One stage in a damage pipeline.
///
/// Implementations take `&mut self` so stages with internal state (such as an
/// RNG) can advance it.
pub trait DamageModifier {
    /// Returns the damage amount after this stage.
    fn modify(&mut self, event: &DamageEvent) -> f32;
}

// =============================================================================
// Resistance
// =============================================================================

/// Per-type damage multipliers.
///
/// `1.0` is neutral, `0.5` halves, `1.5` is a weakness, `0.0` is immunity.
/// Types without an entry use `1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResistanceTable {
    multipliers: BTreeMap<DamageType, f32>,
}

impl ResistanceTable {
    /// Creates a table where every type is neutral.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, damage_type: DamageType, multiplier: f32) -> Self {
        self.set(damage_type, multiplier);
        self
    }

    /// Sets the multiplier for a type. Negative values clamp to 0.
    pub fn set(&mut self, damage_type: DamageType, multiplier: f32) {
        self.multipliers.insert(damage_type, multiplier.max(0.0));
    }

    /// Returns the multiplier for a type.
    #[must_use]
    pub fn multiplier(&self, damage_type: DamageType) -> f32 {
        self.multipliers.get(&damage_type).copied().unwrap_or(1.0)
    }
}

impl DamageModifier for ResistanceTable {
    fn modify(&mut self, event: &DamageEvent) -> f32 {
        event.amount * self.multiplier(event.damage_type)
    }
}

// =============================================================================
// Armor
// =============================================================================

/// Flat damage reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmorModifier {
    armor: f32,
}

impl ArmorModifier {
    /// Armor fraction that applies against [`DamageType::Explosive`].
    pub const EXPLOSIVE_ARMOR_FACTOR: f32 = 0.5;

    /// Creates an armor stage. Negative armor clamps to 0.
    #[must_use]
    pub fn new(armor: f32) -> Self {
        Self {
            armor: armor.max(0.0),
        }
    }

    /// Returns the configured armor value.
    #[must_use]
    pub const fn armor(&self) -> f32 {
        self.armor
    }

    /// Replaces the armor value. Negative armor clamps to 0.
    pub fn set_armor(&mut self, armor: f32) {
        self.armor = armor.max(0.0);
    }

    /// Armor that counts against the given damage type.
    #[must_use]
    pub fn effective_armor(&self, damage_type: DamageType) -> f32 {
        match damage_type {
            DamageType::Explosive => self.armor * Self::EXPLOSIVE_ARMOR_FACTOR,
            DamageType::Magic => 0.0,
            _ => self.armor,
        }
    }
}

impl DamageModifier for ArmorModifier {
    fn modify(&mut self, event: &DamageEvent) -> f32 {
        (event.amount - self.effective_armor(event.damage_type)).max(0.0)
    }
}

// =============================================================================
// Critical Hits
// =============================================================================

/// Probabilistic damage multiplier.
///
/// Each call draws a uniform value in `[0, 1)` from the owned RNG; a draw
/// below `chance` multiplies the damage. Tests inject a fixed RNG to force
/// either outcome.
///
/// # Example
///
/// ```
/// use gauntlet_core::combat::{CriticalHitModifier, DamageEvent, DamageModifier, DamageType};
///
/// // chance 1.0 always crits
/// let mut crit = CriticalHitModifier::from_seed(1.0, 3.0, 7);
/// let amount = crit.modify(&DamageEvent::new(10.0, DamageType::Pierce));
/// assert!((amount - 30.0).abs() < 0.0001);
/// ```
#[derive(Debug, Clone)]
pub struct CriticalHitModifier<R: RngCore = ChaCha8Rng> {
    chance: f32,
    multiplier: f32,
    rng: R,
}

impl CriticalHitModifier<ChaCha8Rng> {
    /// Default critical chance.
    pub const DEFAULT_CHANCE: f32 = 0.1;
    /// Default critical multiplier.
    pub const DEFAULT_MULTIPLIER: f32 = 2.0;

    /// Creates a modifier backed by a seeded `ChaCha8Rng`.
    #[must_use]
    pub fn from_seed(chance: f32, multiplier: f32, seed: u64) -> Self {
        Self::new(chance, multiplier, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> CriticalHitModifier<R> {
    /// Creates a modifier drawing from `rng`.
    ///
    /// `chance` clamps to `[0, 1]`; `multiplier` clamps to at least 1.
    #[must_use]
    pub fn new(chance: f32, multiplier: f32, rng: R) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            multiplier: multiplier.max(1.0),
            rng,
        }
    }

    /// Returns the clamped critical chance.
    #[must_use]
    pub const fn chance(&self) -> f32 {
        self.chance
    }

    /// Returns the clamped critical multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> f32 {
        self.multiplier
    }
}

impl<R: RngCore> DamageModifier for CriticalHitModifier<R> {
    fn modify(&mut self, event: &DamageEvent) -> f32 {
        let roll: f32 = self.rng.gen();
        if roll < self.chance {
            debug!(
                amount = event.amount,
                multiplier = self.multiplier,
                "critical hit"
            );
            event.amount * self.multiplier
        } else {
            event.amount
        }
    }
}

// =============================================================================
// Shared Profiles
// =============================================================================

/// A named, shareable mitigation setup.
///
/// Profiles are plain data loaded from configuration. [`apply_to`](Self::apply_to)
/// installs the matching pipeline stages on a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistanceProfile {
    /// Display name.
    pub name: String,
    /// Per-type multipliers; missing types are neutral.
    pub resistances: BTreeMap<DamageType, f32>,
    /// Whether an armor stage is installed.
    pub has_armor: bool,
    /// Armor value used when `has_armor` is set.
    pub armor_value: f32,
    /// Whether attackers may roll critical hits against this profile.
    pub can_receive_critical_hits: bool,
    /// Multiplier for critical hits against this profile.
    pub critical_hit_multiplier: f32,
}

impl Default for ResistanceProfile {
    fn default() -> Self {
        Self {
            name: String::from("Default Profile"),
            resistances: BTreeMap::new(),
            has_armor: false,
            armor_value: 0.0,
            can_receive_critical_hits: true,
            critical_hit_multiplier: CriticalHitModifier::DEFAULT_MULTIPLIER,
        }
    }
}

impl ResistanceProfile {
    /// Highest resistance multiplier a profile may declare.
    pub const MAX_MULTIPLIER: f32 = 3.0;

    /// Returns the configured multiplier for a type.
    #[must_use]
    pub fn resistance(&self, damage_type: DamageType) -> f32 {
        self.resistances.get(&damage_type).copied().unwrap_or(1.0)
    }

    /// Builds the resistance stage for this profile.
    #[must_use]
    pub fn resistance_table(&self) -> ResistanceTable {
        self.resistances
            .iter()
            .fold(ResistanceTable::new(), |table, (ty, mult)| table.with(*ty, *mult))
    }

    /// Installs this profile's stages on `health`.
    ///
    /// The resistance table is always added; an armor stage follows when
    /// `has_armor` is set with a positive value. Returns the ids of the
    /// installed stages in order.
    pub fn apply_to(&self, health: &mut HealthTracker) -> Vec<ModifierId> {
        let mut installed = vec![health.add_damage_modifier(Box::new(self.resistance_table()))];
        if self.has_armor && self.armor_value > 0.0 {
            installed.push(health.add_damage_modifier(Box::new(ArmorModifier::new(
                self.armor_value,
            ))));
        }
        installed
    }

    /// Builds a critical-hit stage for attacks against this profile, or
    /// `None` if the profile is immune to critical hits.
    #[must_use]
    pub fn critical_hit_modifier<R: RngCore>(
        &self,
        chance: f32,
        rng: R,
    ) -> Option<CriticalHitModifier<R>> {
        self.can_receive_critical_hits
            .then(|| CriticalHitModifier::new(chance, self.critical_hit_multiplier, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use rand::rngs::mock::StepRng;

    fn hit(amount: f32, damage_type: DamageType) -> DamageEvent {
        DamageEvent::new(amount, damage_type)
    }

    /// RNG whose `gen::<f32>()` is always 0.0.
    fn always_low() -> StepRng {
        StepRng::new(0, 0)
    }

    /// RNG whose `gen::<f32>()` is always just under 1.0.
    fn always_high() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    mod resistance_tests {
        use super::*;

        #[test]
        fn missing_type_is_neutral() {
            let mut table = ResistanceTable::new();
            assert!((table.modify(&hit(40.0, DamageType::Ice)) - 40.0).abs() < 0.0001);
        }

        #[test]
        fn multiplier_scales_damage() {
            let mut table = ResistanceTable::new()
                .with(DamageType::Fire, 0.5)
                .with(DamageType::Poison, 1.5);

            assert!((table.modify(&hit(20.0, DamageType::Fire)) - 10.0).abs() < 0.0001);
            assert!((table.modify(&hit(20.0, DamageType::Poison)) - 30.0).abs() < 0.0001);
        }

        #[test]
        fn zero_multiplier_is_immunity() {
            let mut table = ResistanceTable::new().with(DamageType::Lightning, 0.0);
            assert!(table.modify(&hit(99.0, DamageType::Lightning)).abs() < 0.0001);
        }

        #[test]
        fn negative_multiplier_clamps_to_zero() {
            let table = ResistanceTable::new().with(DamageType::Blunt, -2.0);
            assert!(table.multiplier(DamageType::Blunt).abs() < 0.0001);
        }
    }

    mod armor_tests {
        use super::*;

        #[test]
        fn flat_reduction() {
            let mut armor = ArmorModifier::new(5.0);
            assert!((armor.modify(&hit(12.0, DamageType::Slash)) - 7.0).abs() < 0.0001);
        }

        #[test]
        fn never_negative() {
            let mut armor = ArmorModifier::new(50.0);
            assert!(armor.modify(&hit(12.0, DamageType::Blunt)).abs() < 0.0001);
        }

        #[test]
        fn magic_ignores_armor() {
            let mut armor = ArmorModifier::new(10.0);
            assert!((armor.modify(&hit(12.0, DamageType::Magic)) - 12.0).abs() < 0.0001);
        }

        #[test]
        fn explosive_uses_half_armor() {
            let mut armor = ArmorModifier::new(10.0);
            assert!((armor.modify(&hit(12.0, DamageType::Explosive)) - 7.0).abs() < 0.0001);
        }

        #[test]
        fn negative_armor_clamps() {
            let mut armor = ArmorModifier::new(-4.0);
            assert!(armor.armor().abs() < 0.0001);
            armor.set_armor(-1.0);
            assert!(armor.armor().abs() < 0.0001);
        }
    }

    mod critical_hit_tests {
        use super::*;

        #[test]
        fn low_roll_under_chance_multiplies() {
            let mut crit = CriticalHitModifier::new(0.1, 2.0, always_low());
            assert!((crit.modify(&hit(10.0, DamageType::Slash)) - 20.0).abs() < 0.0001);
        }

        #[test]
        fn high_roll_passes_through() {
            let mut crit = CriticalHitModifier::new(0.5, 2.0, always_high());
            assert!((crit.modify(&hit(10.0, DamageType::Slash)) - 10.0).abs() < 0.0001);
        }

        #[test]
        fn zero_chance_never_crits() {
            let mut crit = CriticalHitModifier::new(0.0, 4.0, always_low());
            assert!((crit.modify(&hit(10.0, DamageType::Slash)) - 10.0).abs() < 0.0001);
        }

        #[test]
        fn inputs_are_clamped() {
            let crit = CriticalHitModifier::new(3.0, 0.2, always_low());
            assert!((crit.chance() - 1.0).abs() < 0.0001);
            assert!((crit.multiplier() - 1.0).abs() < 0.0001);

            let crit = CriticalHitModifier::new(-1.0, 2.0, always_low());
            assert!(crit.chance().abs() < 0.0001);
        }

        #[test]
        fn seeded_modifier_is_reproducible() {
            let mut a = CriticalHitModifier::from_seed(0.5, 2.0, 99);
            let mut b = CriticalHitModifier::from_seed(0.5, 2.0, 99);
            for _ in 0..32 {
                let event = hit(10.0, DamageType::Pierce);
                assert!((a.modify(&event) - b.modify(&event)).abs() < 0.0001);
            }
        }
    }

    mod profile_tests {
        use super::*;

        fn plated() -> ResistanceProfile {
            let mut profile = ResistanceProfile {
                name: String::from("plated"),
                has_armor: true,
                armor_value: 4.0,
                ..ResistanceProfile::default()
            };
            profile.resistances.insert(DamageType::Slash, 0.5);
            profile
        }

        #[test]
        fn apply_installs_resistance_then_armor() {
            let mut health = HealthTracker::new(EntityId::new(1), 100.0);
            let installed = plated().apply_to(&mut health);
            assert_eq!(installed.len(), 2);
            assert_eq!(health.modifier_count(), 2);

            // 20 slash -> 10 after resistance -> 6 after armor
            let dealt = health.take_damage(&hit(20.0, DamageType::Slash));
            assert!((dealt - 6.0).abs() < 0.0001);
        }

        #[test]
        fn apply_without_armor_installs_only_table() {
            let profile = ResistanceProfile {
                has_armor: true,
                armor_value: 0.0,
                ..ResistanceProfile::default()
            };
            let mut health = HealthTracker::new(EntityId::new(1), 100.0);
            assert_eq!(profile.apply_to(&mut health).len(), 1);
        }

        #[test]
        fn crit_immunity_yields_no_modifier() {
            let profile = ResistanceProfile {
                can_receive_critical_hits: false,
                ..ResistanceProfile::default()
            };
            assert!(profile.critical_hit_modifier(0.5, always_low()).is_none());
            assert!(plated().critical_hit_modifier(0.5, always_low()).is_some());
        }

        #[test]
        fn deserializes_with_defaults() {
            let json = r#"{ "name": "ghost", "resistances": { "Magic": 0.0 } }"#;
            let profile: ResistanceProfile = serde_json::from_str(json).unwrap();

            assert_eq!(profile.name, "ghost");
            assert!(profile.resistance(DamageType::Magic).abs() < 0.0001);
            assert!((profile.resistance(DamageType::Fire) - 1.0).abs() < 0.0001);
            assert!(profile.can_receive_critical_hits);
        }
    }
}
