//! Browser entry points.

mod render;
pub mod webgl;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::rc::Rc;

use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::config::{EngineOptions, ThemeConfig, ThemeSet};
use crate::orchestrator::resolve_key;

pub use render::App;

/// Canvas id the page's markup uses for the auto-started backdrop.
const DEFAULT_CANVAS: &str = "c";

thread_local! {
    static CURRENT: RefCell<Option<Rc<RefCell<App>>>> = const { RefCell::new(None) };
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StartConfig {
    themes: BTreeMap<String, ThemeConfig>,
    options: EngineOptions,
}

fn js_error(err: impl Display) -> JsValue {
    JsError::new(&err.to_string()).into()
}

#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return Ok(());
    };
    if document.get_element_by_id(DEFAULT_CANVAS).is_some() {
        log::info!("starting backdrop on #{DEFAULT_CANVAS}");
        Backdrop::start(DEFAULT_CANVAS)?;
    }
    Ok(())
}

fn canvas_by_id(id: &str) -> Result<HtmlCanvasElement, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or("no document")?
        .get_element_by_id(id)
        .ok_or_else(|| js_error(format!("no element with id `{id}`")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error(format!("`{id}` is not a canvas")))
}

/// Handle to a running backdrop. Only one runs per page; starting another
/// stops the previous one.
#[wasm_bindgen]
pub struct Backdrop {
    app: Rc<RefCell<App>>,
}

#[wasm_bindgen]
impl Backdrop {
    /// Starts on `canvasId` with the built-in themes.
    pub fn start(canvas_id: &str) -> Result<Backdrop, JsValue> {
        Self::start_with_themes(canvas_id, JsValue::UNDEFINED)
    }

    /// Starts with `{ themes: { <id>: ThemeConfig }, options: EngineOptions }`.
    /// Either key may be omitted.
    #[wasm_bindgen(js_name = startWithThemes)]
    pub fn start_with_themes(canvas_id: &str, config: JsValue) -> Result<Backdrop, JsValue> {
        let config = if config.is_null() || config.is_undefined() {
            StartConfig::default()
        } else {
            serde_wasm_bindgen::from_value::<StartConfig>(config).map_err(js_error)?
        };
        config.options.validate().map_err(js_error)?;
        let themes = ThemeSet::from_overrides(config.themes).map_err(js_error)?;
        let canvas = canvas_by_id(canvas_id)?;
        let app = render::start(canvas, themes, &config.options)?;

        CURRENT.with(|current| {
            if let Some(previous) = current.borrow_mut().replace(app.clone()) {
                log::info!("replacing running backdrop");
                previous.borrow_mut().stop();
            }
        });
        Ok(Backdrop { app })
    }

    /// Handle to the backdrop started most recently, if any.
    pub fn current() -> Option<Backdrop> {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .map(|app| Backdrop { app: app.clone() })
        })
    }

    /// Cross-fades to the theme `id`. Unknown ids fall back to the default
    /// world. Returns whether a fade started or was redirected.
    #[wasm_bindgen(js_name = switchTo)]
    pub fn switch_to(&self, id: &str) -> bool {
        let outcome = self.app.borrow_mut().switch_to(resolve_key(id));
        outcome != crate::transition::SwitchOutcome::Ignored
    }

    /// Iris wipe to the theme `id`.
    #[wasm_bindgen(js_name = beginThemeChange)]
    pub fn begin_theme_change(&self, id: &str) {
        self.app.borrow_mut().begin_theme_change(resolve_key(id));
    }

    #[wasm_bindgen(js_name = setPaused)]
    pub fn set_paused(&self, paused: bool) {
        self.app.borrow_mut().set_paused(paused);
    }

    #[wasm_bindgen(js_name = togglePause)]
    pub fn toggle_pause(&self) -> bool {
        let mut app = self.app.borrow_mut();
        let paused = !app.paused();
        app.set_paused(paused);
        paused
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.app.borrow().paused()
    }

    #[wasm_bindgen(js_name = setTransitionSeconds)]
    pub fn set_transition_seconds(&self, seconds: f32) {
        self.app.borrow_mut().set_transition_seconds(seconds);
    }

    /// Theme id on screen, or being faded to.
    #[wasm_bindgen(js_name = currentTheme)]
    pub fn current_theme(&self) -> String {
        self.app.borrow().current().key().to_owned()
    }

    /// Stops the loop and detaches listeners. The running slot is cleared
    /// if it still points at this backdrop.
    pub fn stop(&self) {
        self.app.borrow_mut().stop();
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            if current.as_ref().is_some_and(|app| Rc::ptr_eq(app, &self.app)) {
                *current = None;
            }
        });
    }
}
