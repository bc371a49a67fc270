//! End-to-end instance tests: arenas built from TOML, ticked through the full
//! pipeline with Rapier doing gravity and contacts.

use battle_agent::config::ArenaConfig;
use battle_agent::game::actions::{ActionVector, ControlInputs};
use battle_agent::game::combat::FireEvent;
use battle_agent::game::instance::{ControllerError, GameInstance};

const ARENA: &str = r#"
    name = "Test Range"
    tick_rate = 50

    [[parts]]
    id = 1
    position = [0.0, -0.5, 0.0]
    size = [100.0, 1.0, 100.0]

    [[parts]]
    id = 3
    position = [0.0, 1.0, -15.0]
    size = [1.0, 2.0, 1.0]
    category = "target"

    [[characters]]
    id = 10
    position = [0.0, 1.0, 0.0]
    muzzle = [0.0, 0.5, -0.6]
"#;

fn arena(toml: &str) -> GameInstance {
    let config: ArenaConfig = toml::from_str(toml).unwrap();
    GameInstance::from_config(&config).unwrap()
}

fn bullet_events(report: &battle_agent::game::instance::TickReport) -> usize {
    report
        .events
        .iter()
        .filter(|e| matches!(e.event, FireEvent::BulletFired { .. }))
        .count()
}

#[test]
fn test_first_shot_hits_target_dummy() {
    let mut instance = arena(ARENA);
    let report = instance.tick();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let hit = report
        .events
        .iter()
        .find_map(|e| match e.event {
            FireEvent::BulletFired { hit, .. } => Some(hit),
            _ => None,
        })
        .expect("bullet should fire on the first tick");
    let hit = hit.expect("target dummy is straight ahead");
    assert_eq!(hit.entity, Some(3));
    // Muzzle at z = -0.6, dummy face at z = -14.5.
    assert!((hit.distance - 13.9).abs() < 1.0e-3, "distance {}", hit.distance);

    assert_eq!(instance.projectiles.len(), 1);
    assert_eq!(instance.projectiles[0].owner, 10);
}

#[test]
fn test_ten_bullets_then_empty() {
    let mut instance = arena(ARENA);
    let mut bullets = 0;
    let mut bombs = 0;
    for tick in 0..550 {
        let report = instance.tick();
        bullets += bullet_events(&report);
        bombs += report.events.len() - bullet_events(&report);
        assert!(instance.projectiles.len() <= 2, "tick {}", tick);
        if tick == 499 {
            assert_eq!(bullets, 10);
            let snapshot = instance.snapshot();
            assert_eq!(snapshot.characters[0].bullets.count, 0);
        }
    }
    assert_eq!(bullets, 10);
    assert_eq!(bombs, 1);
    // The last bullet's projectile has expired by now.
    assert!(instance.projectiles.is_empty());
}

#[test]
fn test_refill_restores_fire() {
    let mut instance = arena(ARENA);
    for _ in 0..550 {
        instance.tick();
    }
    instance.refill_ammo(10).unwrap();
    let report = instance.tick();
    assert_eq!(bullet_events(&report), 1);
}

#[test]
fn test_character_lands_and_becomes_grounded() {
    let mut instance = arena(
        r#"
        name = "Drop"
        [controller]
        allow_battle = false
        [[parts]]
        id = 100
        position = [0.0, -0.5, 0.0]
        size = [100.0, 1.0, 100.0]
        [[characters]]
        id = 1
        position = [0.0, 5.0, 0.0]
        "#,
    );

    instance.tick();
    assert!(!instance.character(1).unwrap().state().grounded);

    let mut landed_at = None;
    for tick in 1..200 {
        instance.tick();
        if instance.character(1).unwrap().state().grounded {
            landed_at = Some(tick);
            break;
        }
    }
    let landed_at = landed_at.expect("character never landed");
    // Four meters of free fall takes about 0.9 s.
    assert!(landed_at > 30, "landed too early at tick {}", landed_at);

    let y = instance.character(1).unwrap().state().position.y;
    assert!((y - 1.0).abs() < 0.1, "resting height {}", y);
}

#[test]
fn test_jump_leaves_ground_and_returns() {
    let mut instance = arena(
        r#"
        name = "Jump"
        [controller]
        allow_battle = false
        [[parts]]
        id = 100
        position = [0.0, -0.5, 0.0]
        size = [100.0, 1.0, 100.0]
        [[characters]]
        id = 1
        position = [0.0, 1.0, 0.0]
        "#,
    );
    for _ in 0..5 {
        instance.tick();
    }
    assert!(instance.character(1).unwrap().state().grounded);

    instance.apply_action(1, ActionVector::new([0, 0, 1, 0, 0]).unwrap()).unwrap();
    instance.tick();
    instance.apply_action(1, ActionVector::default()).unwrap();

    let mut peak: f32 = 0.0;
    let mut airborne_ticks = 0;
    for _ in 0..100 {
        instance.tick();
        let state = instance.character(1).unwrap().state();
        peak = peak.max(state.position.y);
        if !state.grounded {
            airborne_ticks += 1;
        }
    }
    assert!(airborne_ticks > 10);
    // v²/2g ≈ 1.27 m above the resting height.
    assert!(peak > 2.0, "peak {}", peak);
    assert!(instance.character(1).unwrap().state().grounded);
}

#[test]
fn test_human_input_turns_character() {
    let mut instance = arena(ARENA);
    instance
        .apply_human_input(
            10,
            &ControlInputs {
                turn: 0.8,
                ..Default::default()
            },
        )
        .unwrap();
    for _ in 0..10 {
        instance.tick();
    }
    let yaw = instance.character(10).unwrap().state().yaw;
    // 300 deg/s for 0.2 s.
    assert!((yaw - 60.0_f32.to_radians()).abs() < 1.0e-3, "yaw {}", yaw);
}

#[test]
fn test_missing_muzzle_is_local_to_character() {
    let mut instance = arena(
        r#"
        name = "Unarmed"
        [[parts]]
        id = 100
        position = [0.0, -0.5, 0.0]
        size = [100.0, 1.0, 100.0]
        [[characters]]
        id = 1
        position = [0.0, 1.0, 0.0]
        [[characters]]
        id = 2
        position = [5.0, 1.0, 0.0]
        muzzle = [0.0, 0.5, -0.6]
        "#,
    );
    let report = instance.tick();
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        ControllerError::MissingMuzzle { character: 1, .. }
    ));
    assert!(report.events.iter().all(|e| e.character == 2));
    assert_eq!(bullet_events(&report), 1);
}

#[test]
fn test_unarmed_character_still_moves() {
    let mut instance = arena(
        r#"
        name = "Unarmed walk"
        [[parts]]
        id = 100
        position = [0.0, -0.5, 0.0]
        size = [100.0, 1.0, 100.0]
        [[characters]]
        id = 1
        position = [0.0, 1.0, 0.0]
        "#,
    );
    instance.queue_action(1, ActionVector::new([1, 0, 0, 0, 0]).unwrap());

    for _ in 0..50 {
        let report = instance.tick();
        // Every tick the gun would fire, and every tick only combat fails.
        assert_eq!(report.failures.len(), 1);
        assert!(report.events.is_empty());
    }

    let character = instance.character(1).unwrap();
    let state = character.state();
    assert!(state.grounded);
    // One second forward at 6 m/s.
    assert!(state.position.z < -4.0, "z = {}", state.position.z);
    assert_eq!(character.ammo().bullets.count(), 10);
    assert_eq!(character.ammo().bombs.count(), 1);
}

#[test]
fn test_identical_inputs_give_identical_runs() {
    let script: Vec<[i32; 5]> = (0..150)
        .map(|i| match i % 30 {
            0..=9 => [1, 0, 0, 0, 0],
            10..=14 => [1, 1, 1, 0, 0],
            15..=24 => [2, 2, 0, 1, 0],
            _ => [0, 0, 0, 0, 1],
        })
        .collect();

    let run = || {
        let mut instance = arena(ARENA);
        let mut snapshots = Vec::new();
        for slots in &script {
            instance.queue_action(10, ActionVector::new(*slots).unwrap());
            instance.tick();
            snapshots.push(instance.snapshot());
        }
        snapshots
    };

    assert_eq!(run(), run());
}

#[test]
fn test_snapshot_serializes() {
    let mut instance = arena(ARENA);
    instance.tick();
    let json = serde_json::to_value(instance.snapshot()).unwrap();
    assert_eq!(json["tick"], 1);
    assert_eq!(json["characters"][0]["id"], 10);
    assert_eq!(json["characters"][0]["bullets"]["count"], 9);
    assert_eq!(json["projectiles"].as_array().unwrap().len(), 1);
}
