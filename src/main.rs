//! Host dry run: drives every world through a headless GPU for a few
//! simulated seconds and logs what the compositor would have shown.
//!
//! `RUST_LOG=debug cargo run` prints each frame.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use worlds_wasm::gpu::headless::HeadlessGpu;
    use worlds_wasm::{
        EngineOptions, PointerTracker, RenderOrchestrator, SceneId, ThemeSet, Viewport,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let viewport = Viewport::new(1280, 720);
    let options = EngineOptions {
        density: 0.05,
        ..EngineOptions::default()
    };
    let mut gpu = HeadlessGpu::new();
    let mut orchestrator =
        match RenderOrchestrator::new(&mut gpu, ThemeSet::default(), &options, viewport) {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                log::error!("could not start: {err}");
                std::process::exit(1);
            }
        };

    let mut pointer = PointerTracker::centered(viewport);
    let dt = 1.0 / 60.0;
    let mut frame = 0u32;
    for id in SceneId::ALL.into_iter().skip(1).chain([SceneId::Fluid]) {
        orchestrator.switch_to(id);
        for _ in 0..90 {
            let t = frame as f32 * dt;
            pointer.record(640.0 + 300.0 * t.cos(), 360.0 + 200.0 * (t * 1.3).sin());
            let report = orchestrator.frame(&mut gpu, dt, &pointer.sample(viewport), false);
            let commands = gpu.take_commands();
            log::debug!(
                "frame {frame}: {} -> {} at {:.2}, bg {}, {} commands",
                report.active,
                report.pending,
                report.progress,
                report.background.to_css_hex(),
                commands.len()
            );
            frame += 1;
        }
        log::info!("settled on `{}`", orchestrator.transition().active());
    }

    orchestrator.begin_theme_change(SceneId::Mandala);
    while orchestrator.transition().active() != SceneId::Mandala || !orchestrator.iris().is_idle() {
        orchestrator.frame(&mut gpu, dt, &pointer.sample(viewport), false);
        gpu.take_commands();
        frame += 1;
    }
    log::info!("iris wipe finished after {frame} frames");
}

#[cfg(target_arch = "wasm32")]
fn main() {}
