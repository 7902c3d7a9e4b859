use worlds_wasm::SceneId;

const PAGE: &str = include_str!("../static/index.html");

#[test]
fn page_background_is_driven_by_the_engine_alone() {
    assert!(!PAGE.contains("transition"), "page eases its own background");
    assert!(PAGE.contains(r#"<canvas id="c">"#));
}

#[test]
fn every_theme_button_names_a_world() {
    let keys: Vec<&str> = PAGE
        .split(r#"data-theme=""#)
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect();
    assert_eq!(keys.len(), SceneId::ALL.len());
    for key in keys {
        assert!(SceneId::from_key(key).is_some(), "unknown theme {key}");
    }
}
