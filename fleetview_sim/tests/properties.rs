//! Property tests: arbitrary toggle sequences against a simulated fleet.

use fleetview_core::{EngineConfig, EngineEvent};
use fleetview_sim::{SimConfig, SimWorld};
use proptest::prelude::*;

const VEHICLES: usize = 6;

fn manual_world(seed: u64) -> SimWorld {
    SimWorld::new(
        SimConfig {
            seed,
            num_vehicles: VEHICLES,
            ..SimConfig::default()
        },
        EngineConfig {
            track_all_on_start: false,
            ..EngineConfig::default()
        },
    )
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// One user action per element: (vehicle index, settle afterwards?)
fn toggle_batches() -> impl Strategy<Value = Vec<Vec<(usize, bool)>>> {
    prop::collection::vec(
        prop::collection::vec((0..VEHICLES, any::<bool>()), 0..6),
        1..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the toggle order, the surface ends up showing exactly the
    /// wanted vehicles and never holds an orphan on the way.
    #[test]
    fn prop_toggles_converge(seed in 0u64..1_000, batches in toggle_batches()) {
        let outcome: Result<(), String> = block_on(async move {
            let mut world = manual_world(seed);
            world.start();
            world.attach_surface().map_err(|e| e.to_string())?;

            for batch in batches {
                world.step().await;
                for (index, settle) in batch {
                    let id = world.vehicle_ids()[index].clone();
                    world.toggle(id).map_err(|e| e.to_string())?;
                    if settle {
                        world.settle().await;
                    }
                }
                world.settle().await;
                world.audit().map_err(|e| e.to_string())?;
            }

            world.clean_round().await;
            world.audit().map_err(|e| e.to_string())?;
            world.check_convergence().map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        });
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }

    /// Removing one vehicle leaves every other marker at its position.
    #[test]
    fn prop_removal_preserves_others(seed in 0u64..1_000, victim in 0..VEHICLES) {
        let outcome: Result<(), String> = block_on(async move {
            let mut world = manual_world(seed);
            world.start();
            world.attach_surface().map_err(|e| e.to_string())?;
            world.step().await;
            for id in world.vehicle_ids() {
                world.toggle(id).map_err(|e| e.to_string())?;
            }
            world.settle().await;

            let before = world.snapshot().rendered;
            let victim_id = world.vehicle_ids()[victim].clone();
            world.send(EngineEvent::ToggleTrack(victim_id.clone())).map_err(|e| e.to_string())?;
            world.settle().await;
            world.audit().map_err(|e| e.to_string())?;

            let after = world.snapshot().rendered;
            if after.len() + 1 != before.len() {
                return Err(format!("{} rendered before, {} after", before.len(), after.len()));
            }
            for entity in &after {
                let old = before
                    .iter()
                    .find(|b| b.id == entity.id)
                    .ok_or_else(|| format!("{} appeared from nowhere", entity.id))?;
                if (old.latitude, old.longitude, old.trail_points)
                    != (entity.latitude, entity.longitude, entity.trail_points)
                {
                    return Err(format!("{} changed while {} was removed", entity.id, victim_id));
                }
            }
            Ok::<(), String>(())
        });
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }
}
