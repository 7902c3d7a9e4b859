use glam::Vec2;
use worlds_wasm::camera::Camera;
use worlds_wasm::{PointerSample, PointerTracker, Viewport};

fn approx_eq2(a: Vec2, b: Vec2, eps: f32) -> bool {
    (a - b).abs().max_element() < eps
}

#[test]
fn screen_corners_map_to_ndc_corners_at_any_aspect() {
    for viewport in [Viewport::new(1920, 1080), Viewport::new(1080, 1920)] {
        let w = viewport.width as f32;
        let h = viewport.height as f32;
        assert!(approx_eq2(viewport.to_ndc(Vec2::ZERO), Vec2::new(-1.0, 1.0), 1e-6));
        assert!(approx_eq2(viewport.to_ndc(Vec2::new(w, h)), Vec2::new(1.0, -1.0), 1e-6));
        assert!(approx_eq2(viewport.to_uv(Vec2::new(w, 0.0)), Vec2::new(1.0, 1.0), 1e-6));
        assert!(approx_eq2(
            viewport.to_world_span(Vec2::new(w, h * 0.5), 150.0),
            Vec2::new(150.0, 0.0),
            1e-3
        ));
    }
}

#[test]
fn ray_cast_width_follows_aspect_and_height_does_not() {
    let wide = Camera::new(Viewport::new(1920, 1080));
    let tall = Camera::new(Viewport::new(1080, 1920));
    let top = |camera: &Camera| camera.unproject_to_plane(Vec2::new(0.0, 1.0), 0.0).unwrap();
    let right = |camera: &Camera| camera.unproject_to_plane(Vec2::new(1.0, 0.0), 0.0).unwrap();

    assert!((top(&wide).y - top(&tall).y).abs() < 1e-3);
    let ratio = right(&wide).x / right(&tall).x;
    let expected = (1920.0 / 1080.0) / (1080.0 / 1920.0);
    assert!((ratio - expected).abs() < 1e-2, "ratio = {ratio}");
}

#[test]
fn tracker_sample_uses_the_viewport_it_is_taken_against() {
    let mut tracker = PointerTracker::new();
    tracker.record(100.0, 50.0);
    let small = tracker.sample(Viewport::new(200, 100));
    let large = tracker.sample(Viewport::new(400, 200));
    assert_eq!(small.ndc(), Vec2::ZERO);
    assert_eq!(large.uv(), Vec2::new(0.25, 0.75));
    assert_eq!(PointerSample::at_rest(Viewport::new(0, 0)).viewport, Viewport::new(1, 1));
}
