//! Prints the waves a config would generate, then plays it headless.
//!
//! ```text
//! cargo run --example wave_preview -- [config.json] [waves]
//! RUST_LOG=gauntlet_core=debug cargo run --example wave_preview
//! ```

use gauntlet_core::agent::{AttackStyle, EnemyProfile, Lunge, RangedBand};
use gauntlet_core::config::{ConfigError, GauntletConfig};
use gauntlet_core::entity::ProfileId;
use gauntlet_core::simulation::Simulation;
use gauntlet_core::wave::{preview_waves, EnemyTier, EnemyTypeDefinition};
use glam::Vec3;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn demo_config() -> GauntletConfig {
    let mut config = GauntletConfig {
        seed: 2024,
        spawn_points: vec![Vec3::new(-8.0, 0.0, -8.0), Vec3::new(8.0, 0.0, -8.0)],
        ..GauntletConfig::default()
    };
    for (id, health) in [("grunt", 60.0), ("brute", 150.0), ("warlord", 600.0)] {
        config.enemy_profiles.insert(
            ProfileId::new(id),
            EnemyProfile {
                name: id.to_owned(),
                max_health: health,
                ..EnemyProfile::default()
            },
        );
    }
    config.enemy_profiles.insert(
        ProfileId::new("archer"),
        EnemyProfile {
            name: String::from("archer"),
            max_health: 40.0,
            lose_target_range: 30.0,
            attack_style: AttackStyle::Ranged(RangedBand::default()),
            ..EnemyProfile::default()
        },
    );
    if let Some(brute) = config.enemy_profiles.get_mut(&ProfileId::new("brute")) {
        brute.attack_style = AttackStyle::Melee {
            lunge: Some(Lunge::default()),
        };
    }
    config.waves.available_enemy_types = vec![
        EnemyTypeDefinition::new("Grunt", "grunt", "grunt", EnemyTier::Basic),
        EnemyTypeDefinition::new("Archer", "archer", "archer", EnemyTier::Basic).with_weight(0.5),
        EnemyTypeDefinition::new("Brute", "brute", "brute", EnemyTier::Advanced).from_wave(3),
        EnemyTypeDefinition::new("Warlord", "warlord", "warlord", EnemyTier::Boss).from_wave(10),
    ];
    config
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GauntletConfig::from_json_file(path)?,
        None => demo_config(),
    };
    let waves: u32 = args.next().and_then(|n| n.parse().ok()).unwrap_or(12);

    for wave in preview_waves(1..=waves, &config.waves, config.seed) {
        println!("{}", serde_json::to_string(&wave)?);
    }

    let mut sim = Simulation::new(config)?;
    let steps = sim.run(20_000);
    println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    if sim.is_over() {
        println!("player fell after {steps} steps on wave {}", sim.current_wave());
    } else {
        println!("player survived {steps} steps, reached wave {}", sim.current_wave());
    }
    Ok(())
}
