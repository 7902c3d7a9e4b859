//! Theme palettes and physics tuning supplied by the page's settings layer.
//!
//! Everything here is read-only once the vault is built: configs are
//! validated on load and then handed to each world by value.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::color::Rgb;
use crate::error::ConfigError;
use crate::scene::SceneId;

/// Colors a world renders with.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Palette {
    #[serde(rename = "hexBg")]
    pub background: Rgb,
    #[serde(rename = "hexAccent")]
    pub accent: Rgb,
    #[serde(rename = "hexSecondary")]
    pub secondary: Rgb,
}

/// Named physics knobs. Units follow the worlds that consume them:
/// `influence_radius` is in screen pixels, `viscosity` is a per-frame
/// velocity retention factor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsTuning {
    pub speed: f32,
    pub turbulence: f32,
    pub viscosity: f32,
    pub cursor_force: f32,
    pub influence_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThemeConfig {
    pub name: String,
    #[serde(rename = "colors")]
    pub palette: Palette,
    pub physics: PhysicsTuning,
}

impl ThemeConfig {
    /// Built-in theme for a world.
    pub fn builtin(id: SceneId) -> Self {
        let hex = |s: &str| Rgb::from_hex(s).unwrap_or(Rgb::BLACK);
        let (name, bg, accent, secondary, physics) = match id {
            SceneId::Fluid => (
                "Liquid State",
                "#020408",
                "#38bdf8",
                "#818cf8",
                PhysicsTuning {
                    speed: 0.2,
                    turbulence: 1.5,
                    viscosity: 0.88,
                    cursor_force: 0.32,
                    influence_radius: 320.0,
                },
            ),
            SceneId::City => (
                "Cyber Grid",
                "#050505",
                "#00f5d4",
                "#ff006e",
                PhysicsTuning {
                    speed: 0.5,
                    turbulence: 0.0,
                    viscosity: 0.92,
                    cursor_force: 0.18,
                    influence_radius: 260.0,
                },
            ),
            SceneId::Flow => (
                "Organic Flow",
                "#fff5f5",
                "#dc143c",
                "#b22222",
                PhysicsTuning {
                    speed: 0.1,
                    turbulence: 0.3,
                    viscosity: 0.92,
                    cursor_force: 0.6,
                    influence_radius: 300.0,
                },
            ),
            SceneId::Rain => (
                "Deep Focus",
                "#1e1c2d",
                "#f5c2e7",
                "#89dceb",
                PhysicsTuning {
                    speed: 0.05,
                    turbulence: 0.1,
                    viscosity: 0.95,
                    cursor_force: 0.10,
                    influence_radius: 200.0,
                },
            ),
            SceneId::Mandala => (
                "Royal Legacy",
                "#1c0404",
                "#ff9933",
                "#ffd700",
                PhysicsTuning {
                    speed: 0.1,
                    turbulence: 0.2,
                    viscosity: 0.85,
                    cursor_force: 0.45,
                    influence_radius: 350.0,
                },
            ),
        };
        Self {
            name: name.to_owned(),
            palette: Palette {
                background: hex(bg),
                accent: hex(accent),
                secondary: hex(secondary),
            },
            physics,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        let fields = [
            ("speed", p.speed),
            ("turbulence", p.turbulence),
            ("viscosity", p.viscosity),
            ("cursorForce", p.cursor_force),
            ("influenceRadius", p.influence_radius),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite {
                    theme: self.name.clone(),
                    field,
                });
            }
        }
        if !(0.0..1.0).contains(&p.viscosity) {
            return Err(ConfigError::InvalidViscosity {
                theme: self.name.clone(),
                value: p.viscosity,
            });
        }
        if p.influence_radius <= 0.0 {
            return Err(ConfigError::NonPositive {
                theme: self.name.clone(),
                field: "influenceRadius",
            });
        }
        for (field, value) in [
            ("speed", p.speed),
            ("turbulence", p.turbulence),
            ("cursorForce", p.cursor_force),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative {
                    theme: self.name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// One validated theme per world.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSet {
    themes: [ThemeConfig; SceneId::COUNT],
}

impl Default for ThemeSet {
    fn default() -> Self {
        Self {
            themes: SceneId::ALL.map(ThemeConfig::builtin),
        }
    }
}

impl ThemeSet {
    /// Overlays supplied themes (keyed by theme id, e.g. `"cyberpunk"`) on
    /// top of the built-ins. Unknown keys and invalid values are rejected.
    pub fn from_overrides(
        overrides: BTreeMap<String, ThemeConfig>,
    ) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for (key, theme) in overrides {
            let id = SceneId::from_key(&key).ok_or_else(|| ConfigError::UnknownTheme(key))?;
            theme.validate()?;
            set.themes[id.index()] = theme;
        }
        Ok(set)
    }

    pub fn get(&self, id: SceneId) -> &ThemeConfig {
        &self.themes[id.index()]
    }

    pub fn background(&self, id: SceneId) -> Rgb {
        self.get(id).palette.background
    }
}

/// Iris wipe timings, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IrisTiming {
    pub closing: f32,
    pub hold: f32,
    pub opening: f32,
    /// Point within `closing` at which the scene swap is requested.
    pub swap_at: f32,
}

impl Default for IrisTiming {
    fn default() -> Self {
        Self {
            closing: 2.0,
            hold: 1.0,
            opening: 2.0,
            swap_at: 0.5,
        }
    }
}

impl IrisTiming {
    /// First-visit variant: the swap waits until the iris is mostly shut.
    pub fn onboarding() -> Self {
        Self {
            swap_at: 1.5,
            ..Self::default()
        }
    }
}

/// Upper bound on [`EngineOptions::density`].
pub const MAX_DENSITY: f32 = 4.0;
/// Upper bound on [`EngineOptions::petal_count`].
pub const MAX_PETALS: usize = 200_000;
/// Upper bound on [`EngineOptions::transition_seconds`].
pub const MAX_TRANSITION_SECONDS: f32 = 60.0;

/// Engine-level knobs that are not part of any single theme.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Wall-clock length of a cross-fade.
    pub transition_seconds: f32,
    pub iris: IrisTiming,
    /// Theme id shown first, typically restored by the settings layer.
    pub initial_scene: String,
    /// Multiplier on instance counts; lower it on weak devices.
    pub density: f32,
    pub petal_count: usize,
    /// Seed for the initial particle layouts.
    pub seed: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            transition_seconds: 0.5,
            iris: IrisTiming::default(),
            initial_scene: SceneId::Fluid.key().to_owned(),
            density: 1.0,
            petal_count: 40_000,
            seed: 0x5eed_cafe,
        }
    }
}

impl EngineOptions {
    pub fn initial_scene_id(&self) -> SceneId {
        SceneId::from_key(&self.initial_scene).unwrap_or_else(|| {
            log::warn!(
                "unknown initial scene `{}`, starting on `{}`",
                self.initial_scene,
                SceneId::Fluid.key()
            );
            SceneId::Fluid
        })
    }

    /// Rejects knobs that would stall the fade or blow up instance
    /// buffers. Iris timings are sanitized by the wipe itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |field, value: f64| ConfigError::OutOfRange { field, value };
        if !(self.density > 0.0 && self.density <= MAX_DENSITY) {
            return Err(out_of_range("density", f64::from(self.density)));
        }
        if !(1..=MAX_PETALS).contains(&self.petal_count) {
            return Err(out_of_range("petalCount", self.petal_count as f64));
        }
        if !(self.transition_seconds > 0.0 && self.transition_seconds <= MAX_TRANSITION_SECONDS) {
            return Err(out_of_range(
                "transitionSeconds",
                f64::from(self.transition_seconds),
            ));
        }
        Ok(())
    }

    /// Scales a nominal instance count by `density`, keeping at least one.
    /// Density is clamped to [`MAX_DENSITY`] even if validation was skipped.
    pub fn scaled(&self, nominal: usize) -> usize {
        let density = if self.density.is_finite() {
            self.density.clamp(0.0, MAX_DENSITY)
        } else {
            1.0
        };
        ((nominal as f32 * density).round() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_valid() {
        let set = ThemeSet::default();
        for id in SceneId::ALL {
            set.get(id).validate().unwrap();
        }
        assert_eq!(set.background(SceneId::City).to_css_hex(), "#050505");
    }

    #[test]
    fn rejects_out_of_range_physics() {
        let mut theme = ThemeConfig::builtin(SceneId::Rain);
        theme.physics.viscosity = 1.0;
        assert!(matches!(
            theme.validate(),
            Err(ConfigError::InvalidViscosity { .. })
        ));

        let mut theme = ThemeConfig::builtin(SceneId::Rain);
        theme.physics.influence_radius = 0.0;
        assert!(matches!(theme.validate(), Err(ConfigError::NonPositive { .. })));

        let mut theme = ThemeConfig::builtin(SceneId::Rain);
        theme.physics.speed = f32::NAN;
        assert!(matches!(theme.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn overrides_replace_only_named_themes() {
        let mut custom = ThemeConfig::builtin(SceneId::Flow);
        custom.physics.influence_radius = 123.0;
        let mut overrides = BTreeMap::new();
        overrides.insert("sakura".to_owned(), custom.clone());
        let set = ThemeSet::from_overrides(overrides).unwrap();
        assert_eq!(set.get(SceneId::Flow), &custom);
        assert_eq!(set.get(SceneId::Fluid), &ThemeConfig::builtin(SceneId::Fluid));

        let mut bogus = BTreeMap::new();
        bogus.insert("vaporwave".to_owned(), custom);
        assert!(matches!(
            ThemeSet::from_overrides(bogus),
            Err(ConfigError::UnknownTheme(_))
        ));
    }

    #[test]
    fn density_scales_counts() {
        let options = EngineOptions {
            density: 0.25,
            ..EngineOptions::default()
        };
        assert_eq!(options.scaled(40_000), 10_000);
        assert_eq!(options.scaled(1), 1);

        let huge = EngineOptions {
            density: 1e30,
            ..EngineOptions::default()
        };
        assert_eq!(huge.scaled(40_000), 160_000);
    }

    #[test]
    fn engine_options_reject_runaway_counts_and_stalled_fades() {
        EngineOptions::default().validate().unwrap();
        let with = |edit: fn(&mut EngineOptions)| {
            let mut options = EngineOptions::default();
            edit(&mut options);
            options
        };
        let bad = [
            with(|o| o.density = 1e30),
            with(|o| o.density = 0.0),
            with(|o| o.density = f32::NAN),
            with(|o| o.petal_count = 0),
            with(|o| o.petal_count = usize::MAX),
            with(|o| o.transition_seconds = 0.0),
            with(|o| o.transition_seconds = f32::INFINITY),
        ];
        for options in bad {
            assert!(
                matches!(options.validate(), Err(ConfigError::OutOfRange { .. })),
                "{options:?}"
            );
        }
    }
}
