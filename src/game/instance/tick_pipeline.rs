use super::observation::TickReport;
use super::GameInstance;

/// Executes simulation phases for one tick.
/// Ordered so each character sees the world as the previous step left it:
/// input -> sync -> controllers -> physics -> projectiles -> sync back.
pub(super) fn run_tick_phases(instance: &mut GameInstance, dt: f32) -> TickReport {
    let mut report = TickReport::default();

    // Apply queued actions before any controller reads its inputs.
    instance.drain_actions(&mut report);

    // Update query pipeline so ground and hit-scan rays see current poses.
    instance.physics.update_queries();

    // Pull the latest body state into each character.
    let missing = instance.sync_characters_from_physics();
    for &id in &missing {
        report.fail(id, super::ControllerError::MissingBody(id));
    }

    // Run every controller in id order. Failures stay local to the character.
    let physics = &instance.physics;
    let mut outputs = Vec::with_capacity(instance.characters.len());
    for (&id, character) in instance.characters.iter_mut() {
        if missing.contains(&id) {
            continue;
        }
        match character.tick(physics, dt) {
            Ok(output) => outputs.push((id, output)),
            Err(e) => report.fail(id, e),
        }
    }

    // Write motion to bodies, spawn projectiles and record fire events.
    for (id, output) in outputs {
        if let Err(e) = instance.apply_tick_output(id, &output) {
            report.fail(id, e);
            continue;
        }
        if let Some(e) = output.combat_failure {
            report.fail(id, e);
        }
        report.events.extend(output.events.into_iter().map(|event| super::CharacterEvent {
            character: id,
            event,
        }));
    }

    // Step physics simulation.
    instance.physics.step(dt);

    // Move projectiles and drop the expired ones.
    instance.tick_projectiles(dt);

    // Sync physics results back so snapshots show post-step state.
    instance.sync_characters_from_physics();

    report
}
