//! Vista Runtime
//!
//! Headless driver for the entity view updater. Runs a short scripted
//! session (spawn, move, mispredict, teleport, despawn) against the headless
//! scene and logs what the views did.
//!
//! Usage: `vista [settings.json]`

use anyhow::{Context, Result};
use glam::Vec2;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use vista_core::headless::{HeadlessFrame, HeadlessGame};
use vista_core::{AssetGuid, EntityRef, SessionInfo, Transform2D, ViewAsset};
use vista_view::headless::HeadlessScene;
use vista_view::{EntityViewUpdater, PrefabId, SceneGraph, ViewPool, ViewPrefab, ViewSettings};

const CRATE_VIEW: AssetGuid = AssetGuid::new(0xC0FFEE);
const FRAME_DELTA: f32 = 1.0 / 60.0;

fn load_settings() -> Result<ViewSettings> {
    match std::env::args().nth(1) {
        Some(path) => ViewSettings::load(&path).with_context(|| format!("loading view settings from {path}")),
        None => Ok(ViewSettings::default()),
    }
}

fn frame(number: i32, entity: Option<(EntityRef, Transform2D)>) -> HeadlessFrame {
    let mut frame = HeadlessFrame::new(number).verified();
    frame.register_asset(ViewAsset::new(CRATE_VIEW, "Crate"));
    if let Some((entity, transform)) = entity {
        frame.set_view(entity, CRATE_VIEW);
        frame.set_transform_2d(entity, transform);
    }
    frame
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Vista v{}", vista_core::VERSION);

    let settings = load_settings()?;
    let reset_scale = settings.pool.reset_scale;

    let mut updater = EntityViewUpdater::new(settings);
    updater
        .prefabs_mut()
        .register(CRATE_VIEW, Rc::new(ViewPrefab::new(PrefabId(1), "Crate")));
    updater.set_pool(ViewPool::new(reset_scale))?;

    let mut scene = HeadlessScene::new();
    updater.prepare_pool(&mut scene);

    let mut game = HeadlessGame::new(1);
    game.session = SessionInfo {
        is_predicted: true,
        is_interpolatable: true,
        ..SessionInfo::default()
    };
    game.interpolation_factor = 0.5;
    updater.on_game_init(&game);

    let entity = EntityRef::new(1, 1);
    let mut position = Vec2::ZERO;

    for tick in 1..=8 {
        let teleport = tick == 5;
        if teleport {
            position = Vec2::new(40.0, 0.0);
            updater.teleport_all_entities();
        } else {
            position.x += 1.0;
        }

        let transform = if teleport {
            Transform2D::new(position, 0.0).teleported_at(tick)
        } else {
            Transform2D::new(position, 0.0)
        };

        let (verified, predicted) = match tick {
            // the local prediction ran ahead and gets corrected next tick
            3 => (
                frame(tick, Some((entity, transform))),
                frame(tick, Some((entity, Transform2D::new(position + Vec2::new(0.5, 0.0), 0.0)))),
            ),
            8 => (frame(tick, None), frame(tick, None)),
            _ => {
                let shared = frame(tick, Some((entity, transform)));
                (shared.clone(), shared)
            }
        };

        game.push(verified, predicted);
        if let Some(verified) = game.verified.as_ref() {
            updater.on_simulate_finished(&game, verified);
        }
        updater.update(&game, &mut scene, FRAME_DELTA);
        updater.late_update(&game, &mut scene);

        match updater.get_view(entity) {
            Some(view) => tracing::info!(
                tick,
                node = view.node().0,
                active = scene.is_active(view.node()),
                position = ?scene.node(view.node()).map(|node| node.position),
                error = ?view.error_visual_vector(),
                "view state"
            ),
            None => tracing::info!(tick, "no view bound"),
        }
    }

    let stats = updater.stats();
    tracing::info!(
        created = stats.views_created,
        destroyed = stats.views_destroyed,
        live = stats.live_views(),
        pooled = updater.pool().map_or(0, |pool| pool.pooled_count()),
        "session finished"
    );

    updater.shutdown(&mut scene);
    tracing::info!(nodes = scene.node_count(), "shutdown complete");

    Ok(())
}
