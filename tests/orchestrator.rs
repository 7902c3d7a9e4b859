use worlds_wasm::gpu::headless::{Command, HeadlessGpu};
use worlds_wasm::gpu::{Gpu, TargetId};
use worlds_wasm::scene::SceneStatus;
use worlds_wasm::transition::SwitchOutcome;
use worlds_wasm::{EngineOptions, PointerSample, RenderOrchestrator, SceneId, ThemeSet, Viewport};

const VIEWPORT: Viewport = Viewport {
    width: 320,
    height: 180,
};

fn options() -> EngineOptions {
    EngineOptions {
        density: 0.01,
        ..EngineOptions::default()
    }
}

fn setup(gpu: &mut HeadlessGpu) -> RenderOrchestrator {
    RenderOrchestrator::new(gpu, ThemeSet::default(), &options(), VIEWPORT).unwrap()
}

fn rest() -> PointerSample {
    PointerSample::at_rest(VIEWPORT)
}

fn draws_into(commands: &[Command], target: Option<TargetId>) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, Command::Draw { target: t, .. } if *t == target))
        .count()
}

#[test]
fn cyberpunk_fade_lands_exactly_on_its_background() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    let themes = ThemeSet::default();

    assert_eq!(orchestrator.switch_to_key("cyberpunk"), SwitchOutcome::Started);
    let mut report = None;
    // four 0.125s frames sum to exactly 0.5s
    for _ in 0..4 {
        report = Some(orchestrator.frame(&mut gpu, 0.125, &rest(), false));
    }
    let report = report.unwrap();
    assert!(!report.transitioning);
    assert_eq!(report.active, SceneId::City);
    assert_eq!(report.background, themes.background(SceneId::City));
    assert_eq!(report.background.to_css_hex(), "#050505");
}

#[test]
fn background_blends_while_fading() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    let themes = ThemeSet::default();

    orchestrator.switch_to(SceneId::Flow);
    let report = orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    assert!(report.transitioning);
    assert_eq!(report.progress, 0.25);
    let expected = themes
        .background(SceneId::Fluid)
        .lerp(themes.background(SceneId::Flow), 0.25);
    assert_eq!(report.background, expected);
}

#[test]
fn idle_frame_renders_only_the_active_world() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    let (current, next) = orchestrator.targets();

    assert_eq!(orchestrator.switch_to(SceneId::Fluid), SwitchOutcome::Ignored);
    orchestrator.frame(&mut gpu, 1.0 / 60.0, &rest(), false);
    let commands = gpu.take_commands();
    assert!(draws_into(&commands, Some(current)) > 0);
    assert_eq!(draws_into(&commands, Some(next)), 0);
    assert!(!commands.contains(&Command::Bind(Some(next))));
    // composite
    assert_eq!(draws_into(&commands, None), 1);
}

#[test]
fn fading_frame_renders_both_worlds() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    let (current, next) = orchestrator.targets();

    orchestrator.switch_to(SceneId::Mandala);
    orchestrator.frame(&mut gpu, 1.0 / 60.0, &rest(), false);
    let commands = gpu.take_commands();
    assert!(draws_into(&commands, Some(current)) > 0);
    // core and four rings
    assert_eq!(draws_into(&commands, Some(next)), 5);
}

#[test]
fn hidden_worlds_keep_simulating_and_are_not_reset() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    for _ in 0..30 {
        orchestrator.frame(&mut gpu, 0.1, &rest(), false);
    }
    let before = orchestrator.vault().get(SceneId::Rain).sim_time();
    assert!(before > 2.9, "hidden world clock = {before}");

    orchestrator.switch_to(SceneId::Rain);
    orchestrator.frame(&mut gpu, 0.1, &rest(), false);
    let after = orchestrator.vault().get(SceneId::Rain).sim_time();
    assert!(after > before);
}

#[test]
fn redirect_restarts_progress_toward_new_target() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);

    orchestrator.switch_to(SceneId::City);
    orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    assert_eq!(orchestrator.transition().progress(), 0.5);

    assert_eq!(orchestrator.switch_to(SceneId::Rain), SwitchOutcome::Redirected);
    assert_eq!(orchestrator.transition().progress(), 0.0);
    assert_eq!(orchestrator.transition().active(), SceneId::Fluid);
    assert_eq!(orchestrator.transition().pending(), SceneId::Rain);

    for _ in 0..4 {
        orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    }
    assert_eq!(orchestrator.transition().active(), SceneId::Rain);
    assert!(!orchestrator.transition().is_transitioning());
}

#[test]
fn pause_freezes_worlds_but_not_the_fade() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    orchestrator.frame(&mut gpu, 0.1, &rest(), false);
    let frozen: Vec<f64> = orchestrator.vault().iter().map(|h| h.sim_time()).collect();

    orchestrator.switch_to(SceneId::City);
    gpu.take_commands();
    let report = orchestrator.frame(&mut gpu, 0.125, &rest(), true);
    assert!(report.transitioning);
    assert_eq!(report.progress, 0.25);
    let paused: Vec<f64> = orchestrator.vault().iter().map(|h| h.sim_time()).collect();
    assert_eq!(frozen, paused);
    assert_eq!(draws_into(&gpu.take_commands(), None), 1);
}

#[test]
fn resize_mid_fade_keeps_progress() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    orchestrator.switch_to(SceneId::Flow);
    orchestrator.frame(&mut gpu, 0.125, &rest(), false);

    orchestrator.resize(&mut gpu, Viewport::new(640, 480)).unwrap();
    let (current, next) = orchestrator.targets();
    assert_eq!(gpu.target_size(current), Some((640, 480)));
    assert_eq!(gpu.target_size(next), Some((640, 480)));
    assert_eq!(orchestrator.transition().progress(), 0.25);

    gpu.take_commands();
    let sample = PointerSample::at_rest(orchestrator.viewport());
    orchestrator.frame(&mut gpu, 0.125, &sample, false);
    let commands = gpu.take_commands();
    assert!(commands.contains(&Command::Viewport(640, 480)));
    assert_eq!(orchestrator.transition().progress(), 0.5);
}

#[test]
fn failed_resize_keeps_previous_targets_and_viewport() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    let before = orchestrator.targets();
    gpu.set_target_budget(Some(1));

    assert!(orchestrator.resize(&mut gpu, Viewport::new(640, 480)).is_err());
    assert_eq!(orchestrator.viewport(), VIEWPORT);
    assert_eq!(orchestrator.targets(), before);
    assert_eq!(gpu.target_size(before.0), Some((320, 180)));
    assert_eq!(gpu.target_size(before.1), Some((320, 180)));

    gpu.take_commands();
    orchestrator.frame(&mut gpu, 0.016, &rest(), false);
    assert!(gpu.take_commands().contains(&Command::Viewport(320, 180)));

    gpu.set_target_budget(None);
    orchestrator.resize(&mut gpu, Viewport::new(640, 480)).unwrap();
    assert_eq!(gpu.target_size(before.0), None);
    assert_eq!(gpu.target_size(before.1), None);
}

#[test]
fn zero_sized_viewport_is_clamped() {
    let mut gpu = HeadlessGpu::new();
    let zero = Viewport {
        width: 0,
        height: 0,
    };
    let mut orchestrator =
        RenderOrchestrator::new(&mut gpu, ThemeSet::default(), &options(), zero).unwrap();
    let (current, _) = orchestrator.targets();
    assert_eq!(gpu.target_size(current), Some((1, 1)));
    orchestrator.resize(&mut gpu, zero).unwrap();
    let sample = PointerSample::at_rest(orchestrator.viewport());
    orchestrator.frame(&mut gpu, 0.016, &sample, false);
}

#[test]
fn broken_world_degrades_to_flat_fill() {
    let mut gpu = HeadlessGpu::new();
    gpu.break_program("petals");
    let mut orchestrator = setup(&mut gpu);
    let (_, next) = orchestrator.targets();
    let flow = orchestrator.vault().get(SceneId::Flow);
    assert!(matches!(flow.status(), SceneStatus::Fallback(_)));
    let background = flow.background();

    orchestrator.switch_to(SceneId::Flow);
    gpu.take_commands();
    orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    let commands = gpu.take_commands();
    assert_eq!(draws_into(&commands, Some(next)), 0);
    assert!(commands.contains(&Command::Clear {
        target: Some(next),
        color: background,
    }));

    for _ in 0..4 {
        orchestrator.frame(&mut gpu, 0.125, &rest(), false);
    }
    assert_eq!(orchestrator.transition().active(), SceneId::Flow);
}

#[test]
fn missing_composite_clears_screen_to_active_background() {
    let mut gpu = HeadlessGpu::new();
    gpu.break_program("composite");
    let mut orchestrator = setup(&mut gpu);
    gpu.take_commands();
    let report = orchestrator.frame(&mut gpu, 0.016, &rest(), false);
    let commands = gpu.take_commands();
    assert_eq!(draws_into(&commands, None), 0);
    assert!(commands.contains(&Command::Clear {
        target: None,
        color: report.background,
    }));
}

#[test]
fn iris_wipe_swaps_while_screen_is_covered() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    orchestrator.begin_theme_change(SceneId::Mandala);

    let mut smallest = f32::MAX;
    let mut swapped_at = None;
    for frame in 0..600 {
        let report = orchestrator.frame(&mut gpu, 1.0 / 60.0, &rest(), false);
        gpu.take_commands();
        smallest = smallest.min(report.iris_radius);
        if swapped_at.is_none() && report.transitioning {
            swapped_at = Some(report.iris_radius);
        }
        if report.active == SceneId::Mandala && orchestrator.iris().is_idle() {
            assert!(frame > 60);
            break;
        }
    }
    assert_eq!(orchestrator.transition().active(), SceneId::Mandala);
    assert!(orchestrator.iris().is_idle());
    assert_eq!(smallest, 0.0);
    // the default swap point sits a quarter of the way into closing, by
    // which time the expo-out curve has covered most of the screen
    assert!(swapped_at.unwrap() < 0.5);
}

#[test]
fn unknown_theme_keys_fall_back_to_default() {
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator = setup(&mut gpu);
    orchestrator.switch_to(SceneId::Rain);
    orchestrator.frame(&mut gpu, 1.0, &rest(), false);
    assert_eq!(orchestrator.transition().active(), SceneId::Rain);

    assert_eq!(orchestrator.switch_to_key("vaporwave"), SwitchOutcome::Started);
    assert_eq!(orchestrator.transition().pending(), SceneId::Fluid);
}
