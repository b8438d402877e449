use super::*;
use crate::headless::HeadlessScene;
use std::cell::RefCell;
use std::rc::Rc;
use vista_core::headless::{HeadlessFrame, HeadlessGame};
use vista_core::math::{planar_rotation_to_world, planar_to_world, with_vertical};
use vista_core::{Transform2D, Transform2DVertical, Transform3D};

const DT: f32 = 1.0 / 60.0;
const TICK: f32 = 1.0 / 60.0;

fn entity() -> EntityRef {
    EntityRef::new(4, 1)
}

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

#[derive(Default)]
struct Events {
    initialized: u32,
    activated: u32,
    deactivated: u32,
    updated: u32,
    late_updated: u32,
}

struct EventCounter(Rc<RefCell<Events>>);

impl EntityViewBehaviour for EventCounter {
    fn on_initialize(&mut self, _contexts: &ViewContexts) {
        self.0.borrow_mut().initialized += 1;
    }
    fn on_activate(&mut self, _view: &ViewEntity, _frame: &dyn Frame) {
        self.0.borrow_mut().activated += 1;
    }
    fn on_deactivate(&mut self) {
        self.0.borrow_mut().deactivated += 1;
    }
    fn on_update_view(&mut self, _cx: &mut ComponentContext<'_>) {
        self.0.borrow_mut().updated += 1;
    }
    fn on_late_update_view(&mut self, _cx: &mut ComponentContext<'_>) {
        self.0.borrow_mut().late_updated += 1;
    }
}

fn make_view(scene: &mut HeadlessScene, template: ViewTemplate) -> EntityView {
    let node = scene.spawn_node("view");
    let mut view = EntityView::new(node, template);
    view.set_entity(entity());
    view
}

fn frame_2d(number: i32, position: Vec2) -> HeadlessFrame {
    let mut frame = HeadlessFrame::new(number);
    frame.set_transform_2d(entity(), Transform2D::new(position, 0.0));
    frame
}

fn activate(view: &mut EntityView, game: &HeadlessGame, scene: &mut HeadlessScene, timer: &SnapshotInterpolationTimer) {
    let contexts = ViewContexts::new();
    let frame = game.predicted.as_ref().expect("predicted frame");
    let mut cx = ViewUpdateContext {
        game,
        scene,
        snapshot: timer,
        delta_time: DT,
    };
    view.activate(&mut cx, frame, &contexts);
}

fn update(
    view: &mut EntityView,
    game: &HeadlessGame,
    scene: &mut HeadlessScene,
    timer: &SnapshotInterpolationTimer,
    delta_time: f32,
    clock_aliasing: bool,
    error_correction: bool,
) {
    let mut cx = ViewUpdateContext {
        game,
        scene,
        snapshot: timer,
        delta_time,
    };
    view.update_view(&mut cx, clock_aliasing, error_correction);
}

#[test]
fn spawn_snaps_to_current_transform() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(10, Vec2::new(5.0, 3.0)));
    game.interpolation_factor = 0.0;
    let mut view = make_view(&mut scene, ViewTemplate::default());

    activate(&mut view, &game, &mut scene, &timer);

    let node = scene.node(view.node()).unwrap();
    assert_eq!(node.position, planar_to_world(Vec2::new(5.0, 3.0)));
    assert_eq!(view.error_visual_vector(), Vec3::ZERO);
    assert_eq!(view.error_visual_quaternion(), Quat::IDENTITY);
}

#[test]
fn spawn_without_transform_leaves_node_untouched() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let game = HeadlessGame::new(1).with_lockstep_frame(HeadlessFrame::new(3));
    let mut view = make_view(&mut scene, ViewTemplate::default());

    activate(&mut view, &game, &mut scene, &timer);
    assert_eq!(scene.node(view.node()).unwrap().position, Vec3::ZERO);
}

#[test]
fn clock_aliasing_blends_previous_and_predicted() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);

    game.push(frame_2d(1, Vec2::ZERO), frame_2d(2, Vec2::new(2.0, 0.0)));
    game.interpolation_factor = 0.5;
    update(&mut view, &game, &mut scene, &timer, DT, true, false);

    let position = scene.node(view.node()).unwrap().position;
    assert!(approx(position, planar_to_world(Vec2::new(1.0, 0.0))));
}

#[test]
fn teleport_marker_bypasses_interpolation() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);

    let mut predicted = HeadlessFrame::new(2);
    predicted.set_transform_2d(entity(), Transform2D::new(Vec2::new(8.0, 0.0), 0.0).teleported_at(2));
    game.push(frame_2d(1, Vec2::ZERO), predicted);
    game.interpolation_factor = 0.25;
    update(&mut view, &game, &mut scene, &timer, DT, true, true);

    let position = scene.node(view.node()).unwrap().position;
    assert_eq!(position, planar_to_world(Vec2::new(8.0, 0.0)));
}

#[test]
fn vertical_offset_lifts_planar_position() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut frame = frame_2d(1, Vec2::new(1.0, 2.0));
    frame.set_vertical(entity(), Transform2DVertical::new(3.0));
    let game = HeadlessGame::new(1).with_lockstep_frame(frame);
    let mut view = make_view(&mut scene, ViewTemplate::default());

    activate(&mut view, &game, &mut scene, &timer);

    let expected = with_vertical(planar_to_world(Vec2::new(1.0, 2.0)), 3.0);
    assert_eq!(scene.node(view.node()).unwrap().position, expected);
}

#[test]
fn misprediction_accumulates_visual_error_3d() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut origin = HeadlessFrame::new(1);
    origin.set_transform_3d(entity(), Transform3D::new(Vec3::ZERO, Quat::IDENTITY));
    let mut game = HeadlessGame::new(1).with_lockstep_frame(origin);
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);

    // the re-simulated previous frame disagrees with what was shown
    let mut resimulated = HeadlessFrame::new(1);
    resimulated.set_transform_3d(entity(), Transform3D::new(Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY));
    let mut predicted = HeadlessFrame::new(2);
    predicted.set_transform_3d(entity(), Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quat::IDENTITY));
    game.previous_update_predicted = Some(resimulated.clone());
    game.predicted_previous = Some(resimulated);
    game.predicted = Some(predicted);
    game.interpolation_factor = 1.0;

    update(&mut view, &game, &mut scene, &timer, 0.0, true, true);

    assert_eq!(view.error_visual_vector(), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(scene.node(view.node()).unwrap().position, Vec3::new(1.5, 0.0, 0.0));
}

#[test]
fn misprediction_accumulates_visual_error_2d() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut origin = HeadlessFrame::new(1);
    origin.set_transform_2d(entity(), Transform2D::new(Vec2::ZERO, 0.3));
    origin.set_vertical(entity(), Transform2DVertical::new(1.0));
    let mut game = HeadlessGame::new(1).with_lockstep_frame(origin);
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);

    // the re-simulated frame has no vertical component at all
    let mut resimulated = HeadlessFrame::new(1);
    resimulated.set_transform_2d(entity(), Transform2D::new(Vec2::new(-0.5, 0.0), 0.1));
    let mut predicted = HeadlessFrame::new(2);
    predicted.set_transform_2d(entity(), Transform2D::new(Vec2::new(0.5, 0.0), 0.1));
    game.previous_update_predicted = Some(resimulated.clone());
    game.predicted_previous = Some(resimulated);
    game.predicted = Some(predicted);
    game.interpolation_factor = 1.0;

    update(&mut view, &game, &mut scene, &timer, 0.0, true, true);

    let expected = with_vertical(planar_to_world(Vec2::new(0.5, 0.0)), 1.0);
    assert!(approx(view.error_visual_vector(), expected));
    assert!(view
        .error_visual_quaternion()
        .abs_diff_eq(planar_rotation_to_world(0.2), 1e-5));
}

#[test]
fn planar_rotation_error_composes_with_existing_error() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut origin = HeadlessFrame::new(1);
    origin.set_transform_2d(entity(), Transform2D::new(Vec2::ZERO, 0.25));
    let mut game = HeadlessGame::new(1).with_lockstep_frame(origin);
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);
    view.error_visual_quaternion = planar_rotation_to_world(0.1);

    let mut resimulated = HeadlessFrame::new(1);
    resimulated.set_transform_2d(entity(), Transform2D::new(Vec2::ZERO, 0.0));
    let mut predicted = HeadlessFrame::new(2);
    predicted.set_transform_2d(entity(), Transform2D::new(Vec2::ZERO, 0.0));
    game.previous_update_predicted = Some(resimulated.clone());
    game.predicted_previous = Some(resimulated);
    game.predicted = Some(predicted);
    game.interpolation_factor = 1.0;

    update(&mut view, &game, &mut scene, &timer, 0.0, true, true);

    assert_eq!(view.error_visual_vector(), Vec3::ZERO);
    assert!(view
        .error_visual_quaternion()
        .abs_diff_eq(planar_rotation_to_world(0.35), 1e-5));
}

#[test]
fn wrapped_rotation_error_snaps() {
    let mut scene = HeadlessScene::new();
    let mut view = make_view(&mut scene, ViewTemplate::default());
    // 3.1 - (-3.1): the long way round, past the rotation teleport distance
    view.error_visual_quaternion = planar_rotation_to_world(6.2);

    let mut param = UpdatePositionParameter {
        new_rotation: planar_rotation_to_world(3.0),
        uninterpolated_rotation: planar_rotation_to_world(3.1),
        ..Default::default()
    };
    view.update_render_position(&mut scene, DT, &mut param);

    assert!(param.rotation_error_teleport);
    assert_eq!(view.error_visual_quaternion(), Quat::IDENTITY);
    let rotation = scene.node(view.node()).unwrap().rotation;
    assert!(rotation.abs_diff_eq(planar_rotation_to_world(3.1), 1e-5));
}

#[test]
fn missing_error_reference_resets_error() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let mut game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));
    let mut view = make_view(&mut scene, ViewTemplate::default());
    activate(&mut view, &game, &mut scene, &timer);
    view.error_visual_vector = Vec3::new(0.5, 0.0, 0.0);

    game.previous_update_predicted = Some(HeadlessFrame::new(1));
    update(&mut view, &game, &mut scene, &timer, DT, true, true);
    assert_eq!(view.error_visual_vector(), Vec3::ZERO);
}

#[test]
fn error_beyond_teleport_distance_snaps() {
    let mut scene = HeadlessScene::new();
    let mut view = make_view(&mut scene, ViewTemplate::default());
    view.error_visual_vector = Vec3::new(2.5, 0.0, 0.0);
    view.error_visual_quaternion = Quat::from_rotation_y(1.0);

    let mut param = UpdatePositionParameter {
        new_position: Vec3::new(4.0, 0.0, 0.0),
        uninterpolated_position: Vec3::new(5.0, 0.0, 0.0),
        ..Default::default()
    };
    view.update_render_position(&mut scene, DT, &mut param);

    assert!(param.position_error_teleport);
    assert!(param.rotation_error_teleport);
    assert_eq!(param.error_visual_vector, Vec3::ZERO);
    assert_eq!(view.error_visual_vector(), Vec3::ZERO);
    assert_eq!(view.error_visual_quaternion(), Quat::IDENTITY);
    assert_eq!(scene.node(view.node()).unwrap().position, Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn error_at_teleport_distance_is_smoothed() {
    let mut scene = HeadlessScene::new();
    let mut view = make_view(&mut scene, ViewTemplate::default());
    view.error_visual_vector = Vec3::new(2.0, 0.0, 0.0);

    let mut param = UpdatePositionParameter::default();
    view.update_render_position(&mut scene, DT, &mut param);

    assert!(!param.position_error_teleport);
    assert_eq!(scene.node(view.node()).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
    assert!(view.error_visual_vector().x < 2.0);
}

#[test]
fn error_decays_monotonically_to_zero() {
    let mut scene = HeadlessScene::new();
    let mut view = make_view(&mut scene, ViewTemplate::default());
    view.error_visual_vector = Vec3::new(0.6, 0.0, -0.4);

    let mut previous = view.error_visual_vector().length();
    let mut steps = 0;
    while view.error_visual_vector() != Vec3::ZERO {
        let mut param = UpdatePositionParameter::default();
        view.update_render_position(&mut scene, DT, &mut param);

        let error = view.error_visual_vector();
        assert!(error.length() < previous, "step {steps}: {error:?}");
        assert!(error.x >= 0.0 && error.y == 0.0 && error.z <= 0.0);
        previous = error.length();

        steps += 1;
        assert!(steps < 1000);
    }
}

#[test]
fn snapshot_interpolation_replays_verified_samples() {
    let mut scene = HeadlessScene::new();
    let mut timer = SnapshotInterpolationTimer::default();
    let template = ViewTemplate {
        flags: ViewFlags::ENABLE_SNAPSHOT_INTERPOLATION,
        interpolation_mode: InterpolationMode::SnapshotInterpolation,
        ..Default::default()
    };
    let game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(10, Vec2::new(10.0, 0.0)).verified());
    let mut view = make_view(&mut scene, template);
    activate(&mut view, &game, &mut scene, &timer);
    assert!(view.is_snapshot_subscribed());

    view.record_snapshot(&frame_2d(8, Vec2::ZERO).verified());
    view.record_snapshot(&frame_2d(9, Vec2::new(4.0, 0.0)).verified());
    view.record_snapshot(&frame_2d(9, Vec2::new(100.0, 0.0)));
    assert_eq!(view.interpolation_buffer().map(|b| b.len()), Some(2));

    timer.advance(10, TICK, TICK);
    timer.advance(10, TICK, TICK * 0.5);
    update(&mut view, &game, &mut scene, &timer, DT, true, true);

    assert!(view.uses_snapshot_interpolation());
    let position = scene.node(view.node()).unwrap().position;
    assert!(approx(position, planar_to_world(Vec2::new(2.0, 0.0))));
}

#[test]
fn auto_mode_follows_culling() {
    let mut scene = HeadlessScene::new();
    let template = ViewTemplate {
        flags: ViewFlags::ENABLE_SNAPSHOT_INTERPOLATION,
        interpolation_mode: InterpolationMode::Auto,
        ..Default::default()
    };
    let mut view = make_view(&mut scene, template);

    let mut frame = frame_2d(1, Vec2::ZERO);
    let game = HeadlessGame::new(1).with_lockstep_frame(frame.clone());
    view.refresh_interpolation_mode(&game);
    assert!(!view.uses_snapshot_interpolation());

    frame.set_culled(entity(), true);
    let game = HeadlessGame::new(1).with_lockstep_frame(frame);
    view.refresh_interpolation_mode(&game);
    assert!(view.uses_snapshot_interpolation());
}

#[test]
fn snapshot_mode_without_flag_falls_back() {
    let mut scene = HeadlessScene::new();
    let template = ViewTemplate {
        interpolation_mode: InterpolationMode::SnapshotInterpolation,
        ..Default::default()
    };
    let mut view = make_view(&mut scene, template);
    let game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));

    view.refresh_interpolation_mode(&game);
    assert!(!view.uses_snapshot_interpolation());
    if cfg!(debug_assertions) {
        assert_eq!(view.interpolation_mode(), InterpolationMode::Prediction);
    }
}

#[test]
fn initializes_once_across_reuse() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let events = Rc::new(RefCell::new(Events::default()));
    let game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));
    let mut view = make_view(&mut scene, ViewTemplate::default()).with_behaviour(Box::new(EventCounter(events.clone())));

    view.deactivate();
    assert_eq!(events.borrow().deactivated, 0);

    activate(&mut view, &game, &mut scene, &timer);
    view.deactivate();
    activate(&mut view, &game, &mut scene, &timer);

    let events = events.borrow();
    assert_eq!(events.initialized, 1);
    assert_eq!(events.activated, 2);
    assert_eq!(events.deactivated, 1);
}

#[test]
fn disabled_position_updates_keep_node_still() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let template = ViewTemplate {
        flags: ViewFlags::DISABLE_UPDATE_POSITION,
        ..Default::default()
    };
    let mut game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ONE));
    let mut view = make_view(&mut scene, template);
    activate(&mut view, &game, &mut scene, &timer);

    game.push(frame_2d(1, Vec2::ONE), frame_2d(2, Vec2::new(9.0, 9.0)));
    update(&mut view, &game, &mut scene, &timer, DT, true, false);

    assert_eq!(scene.node(view.node()).unwrap().position, planar_to_world(Vec2::ONE));
}

#[test]
fn disabled_view_updates_skip_hooks() {
    let mut scene = HeadlessScene::new();
    let timer = SnapshotInterpolationTimer::default();
    let events = Rc::new(RefCell::new(Events::default()));
    let template = ViewTemplate {
        flags: ViewFlags::DISABLE_UPDATE_VIEW,
        ..Default::default()
    };
    let game = HeadlessGame::new(1).with_lockstep_frame(frame_2d(1, Vec2::ZERO));
    let mut view = make_view(&mut scene, template).with_behaviour(Box::new(EventCounter(events.clone())));
    activate(&mut view, &game, &mut scene, &timer);

    update(&mut view, &game, &mut scene, &timer, DT, true, false);
    let mut cx = ComponentContext::new(&game, &mut scene, Some(view.view_entity()));
    view.late_update_view(&mut cx);

    assert_eq!(events.borrow().updated, 0);
    assert_eq!(events.borrow().late_updated, 0);

    view.set_flag(ViewFlags::DISABLE_UPDATE_VIEW, false);
    update(&mut view, &game, &mut scene, &timer, DT, true, false);
    assert_eq!(events.borrow().updated, 1);
}
