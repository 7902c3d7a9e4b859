//! Multi-world animated backdrop.
//!
//! Five generative worlds run side by side; one is shown at a time and
//! switching cross-fades between two off-screen renders. Everything except
//! [`wasm`] is target independent and drives the GPU through
//! [`gpu::Gpu`], so the whole pipeline runs on the host against
//! [`gpu::headless::HeadlessGpu`].

pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod gpu;
pub mod iris;
pub mod orchestrator;
pub mod physics;
pub mod pointer;
pub mod registry;
pub mod scene;
pub mod transition;

// Only compile browser glue when targeting wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use color::Rgb;
pub use config::{EngineOptions, ThemeConfig, ThemeSet};
pub use error::{ConfigError, GpuError};
pub use orchestrator::{FrameReport, RenderOrchestrator};
pub use physics::Viewport;
pub use pointer::{PointerSample, PointerTracker};
pub use scene::SceneId;
