use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    window, HtmlCanvasElement, HtmlElement, PointerEvent, WebGl2RenderingContext as GL, Window,
};

use super::webgl::WebGl2Gpu;
use crate::color::Rgb;
use crate::config::{EngineOptions, ThemeSet};
use crate::orchestrator::RenderOrchestrator;
use crate::physics::Viewport;
use crate::pointer::PointerTracker;
use crate::scene::SceneId;
use crate::transition::SwitchOutcome;

/// Longest step a single frame may take, so a backgrounded tab does not
/// fast-forward the fade on return.
const MAX_FRAME_SECONDS: f64 = 0.1;
/// Cap on devicePixelRatio; higher densities cost fill rate for no gain.
const MAX_PIXEL_RATIO: f64 = 2.0;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Browser hooks owned by a running app, released together on stop.
struct Hooks {
    window: Window,
    on_pointer: Closure<dyn FnMut(PointerEvent)>,
    on_resize: Closure<dyn FnMut()>,
    frame: FrameCallback,
    frame_request: Rc<Cell<Option<i32>>>,
}

impl Hooks {
    fn release(self) {
        if let Some(request) = self.frame_request.take() {
            let _ = self.window.cancel_animation_frame(request);
        }
        let listeners = [
            ("pointermove", self.on_pointer.as_ref()),
            ("resize", self.on_resize.as_ref()),
        ];
        for (event, listener) in listeners {
            if let Err(err) = self
                .window
                .remove_event_listener_with_callback(event, listener.unchecked_ref())
            {
                log::warn!("could not remove {event} listener: {err:?}");
            }
        }
        // The frame closure owns a handle to the app.
        self.frame.borrow_mut().take();
    }
}

/// One running backdrop bound to a canvas.
pub struct App {
    gpu: WebGl2Gpu,
    orchestrator: RenderOrchestrator,
    pointer: Rc<RefCell<PointerTracker>>,
    pending_size: Rc<Cell<Option<Viewport>>>,
    body: Option<HtmlElement>,
    background: Option<Rgb>,
    paused: bool,
    last_timestamp: Option<f64>,
    hooks: Option<Hooks>,
}

impl App {
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("{}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn switch_to(&mut self, id: SceneId) -> SwitchOutcome {
        self.orchestrator.switch_to(id)
    }

    pub fn begin_theme_change(&mut self, id: SceneId) {
        self.orchestrator.begin_theme_change(id);
    }

    pub fn set_transition_seconds(&mut self, seconds: f32) {
        self.orchestrator.set_transition_duration(seconds);
    }

    /// World on screen, or the one being faded to.
    pub fn current(&self) -> SceneId {
        let transition = self.orchestrator.transition();
        if transition.is_transitioning() {
            transition.pending()
        } else {
            transition.active()
        }
    }

    /// Cancels the pending frame and detaches every listener. Once the
    /// last handle is dropped the app and its GL resources are freed.
    pub fn stop(&mut self) {
        if let Some(hooks) = self.hooks.take() {
            hooks.release();
            log::info!("backdrop stopped");
        }
    }

    pub fn stopped(&self) -> bool {
        self.hooks.is_none()
    }

    fn frame(&mut self, timestamp: f64) {
        let elapsed = match self.last_timestamp.replace(timestamp) {
            Some(previous) => ((timestamp - previous) / 1000.0).clamp(0.0, MAX_FRAME_SECONDS),
            None => 0.0,
        };
        let dt = elapsed as f32;

        if let Some(viewport) = self.pending_size.take() {
            if let Err(err) = self.orchestrator.resize(&mut self.gpu, viewport) {
                log::warn!("resize deferred to next frame: {err}");
                if self.pending_size.get().is_none() {
                    self.pending_size.set(Some(viewport));
                }
            }
        }

        let sample = self.pointer.borrow().sample(self.orchestrator.viewport());
        let report = self
            .orchestrator
            .frame(&mut self.gpu, dt, &sample, self.paused);
        if self.background != Some(report.background) {
            self.background = Some(report.background);
            if let Some(body) = &self.body {
                let _ = body
                    .style()
                    .set_property("background-color", &report.background.to_css_hex());
            }
        }
    }
}

fn pixel_ratio(window: &Window) -> f64 {
    window.device_pixel_ratio().clamp(1.0, MAX_PIXEL_RATIO)
}

/// Window size in physical pixels.
fn window_viewport(window: &Window) -> Result<Viewport, JsValue> {
    let ratio = pixel_ratio(window);
    let width = window.inner_width()?.as_f64().unwrap_or(1.0);
    let height = window.inner_height()?.as_f64().unwrap_or(1.0);
    Ok(Viewport::new(
        (width * ratio).round() as u32,
        (height * ratio).round() as u32,
    ))
}

fn fit_canvas(canvas: &HtmlCanvasElement, viewport: Viewport) {
    canvas.set_width(viewport.width);
    canvas.set_height(viewport.height);
}

/// Builds the orchestrator on `canvas` and starts the animation loop.
pub fn start(
    canvas: HtmlCanvasElement,
    themes: ThemeSet,
    options: &EngineOptions,
) -> Result<Rc<RefCell<App>>, JsValue> {
    let window = window().ok_or("no window")?;
    let gl: GL = canvas
        .get_context("webgl2")?
        .ok_or("WebGL2 not supported")?
        .dyn_into()?;

    let viewport = window_viewport(&window)?;
    fit_canvas(&canvas, viewport);

    let mut gpu = WebGl2Gpu::new(gl);
    let orchestrator = RenderOrchestrator::new(&mut gpu, themes, options, viewport)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let pointer = Rc::new(RefCell::new(PointerTracker::centered(viewport)));
    let pending_size = Rc::new(Cell::new(None));

    // Pointer positions arrive in CSS pixels; the tracker works in the
    // canvas's physical pixels.
    let on_pointer = {
        let pointer = pointer.clone();
        let window = window.clone();
        Closure::wrap(Box::new(move |event: PointerEvent| {
            let ratio = pixel_ratio(&window);
            pointer.borrow_mut().record(
                (event.client_x() as f64 * ratio) as f32,
                (event.client_y() as f64 * ratio) as f32,
            );
        }) as Box<dyn FnMut(PointerEvent)>)
    };
    window.add_event_listener_with_callback("pointermove", on_pointer.as_ref().unchecked_ref())?;

    // The canvas follows the window right away; targets follow on the next
    // frame so a burst of resize events costs one reallocation.
    let on_resize = {
        let canvas = canvas.clone();
        let pending_size = pending_size.clone();
        let window = window.clone();
        Closure::wrap(Box::new(move || {
            if let Ok(viewport) = window_viewport(&window) {
                fit_canvas(&canvas, viewport);
                pending_size.set(Some(viewport));
            }
        }) as Box<dyn FnMut()>)
    };
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;

    // `f` holds the animation-frame closure so it can re-register itself.
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let frame_request = Rc::new(Cell::new(None));
    let body = window.document().and_then(|document| document.body());
    let app = Rc::new(RefCell::new(App {
        gpu,
        orchestrator,
        pointer,
        pending_size,
        body,
        background: None,
        paused: false,
        last_timestamp: None,
        hooks: Some(Hooks {
            window: window.clone(),
            on_pointer,
            on_resize,
            frame: f.clone(),
            frame_request: frame_request.clone(),
        }),
    }));

    let g = f.clone();
    let looped = app.clone();
    let requests = frame_request.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
        requests.set(None);
        let mut app = looped.borrow_mut();
        if app.stopped() {
            return;
        }
        app.frame(timestamp);
        drop(app);

        if let (Some(window), Some(callback)) = (web_sys::window(), f.borrow().as_ref()) {
            match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                Ok(request) => requests.set(Some(request)),
                Err(err) => log::error!("could not schedule next frame: {err:?}"),
            }
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(callback) = g.borrow().as_ref() {
        let request = window.request_animation_frame(callback.as_ref().unchecked_ref())?;
        frame_request.set(Some(request));
    }

    Ok(app)
}
