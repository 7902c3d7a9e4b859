//! The fixed set of resident worlds.

use crate::config::{EngineOptions, ThemeSet};
use crate::gpu::Gpu;
use crate::pointer::PointerSample;
use crate::scene::{SceneHandle, SceneId, SceneStatus};

/// Arena of all five scene handles, indexed by [`SceneId::index`]. Built
/// once, eagerly; nothing is ever removed.
#[derive(Debug)]
pub struct SceneVault {
    handles: [SceneHandle; SceneId::COUNT],
}

impl SceneVault {
    /// Constructs and warms up every world. Worlds that fail to prepare are
    /// kept as flat fallbacks so the vault is always complete.
    pub fn build(gpu: &mut dyn Gpu, themes: &ThemeSet, options: &EngineOptions) -> Self {
        let handles = SceneId::ALL
            .map(|id| SceneHandle::build(id, themes.get(id).clone(), options, gpu));
        let fallbacks = handles
            .iter()
            .filter(|h| matches!(h.status(), SceneStatus::Fallback(_)))
            .count();
        if fallbacks > 0 {
            log::warn!("{fallbacks} of {} worlds running as fallbacks", SceneId::COUNT);
        }
        Self { handles }
    }

    pub fn get(&self, id: SceneId) -> &SceneHandle {
        &self.handles[id.index()]
    }

    pub fn get_mut(&mut self, id: SceneId) -> &mut SceneHandle {
        &mut self.handles[id.index()]
    }

    /// Out-of-range indices resolve to the default world.
    pub fn get_by_index(&self, index: usize) -> &SceneHandle {
        self.get(SceneId::from_index(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneHandle> {
        self.handles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneHandle> {
        self.handles.iter_mut()
    }

    /// Steps every world, visible or not.
    pub fn advance_all(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        for handle in self.iter_mut() {
            handle.advance(dt, pointer, paused);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessGpu;
    use crate::physics::Viewport;

    fn options() -> EngineOptions {
        EngineOptions {
            density: 0.01,
            ..EngineOptions::default()
        }
    }

    #[test]
    fn warms_up_every_world_eagerly() {
        let mut gpu = HeadlessGpu::new();
        let vault = SceneVault::build(&mut gpu, &ThemeSet::default(), &options());
        for id in SceneId::ALL {
            assert_eq!(vault.get(id).id(), id);
            assert_eq!(vault.get(id).status(), &SceneStatus::Ready);
        }
        for label in ["fluid", "grid", "petals", "lit"] {
            assert!(gpu.compiled().contains(&label), "{label} not compiled");
        }
        assert_eq!(vault.get_by_index(99).id(), SceneId::Fluid);
    }

    #[test]
    fn broken_program_only_degrades_its_world() {
        let mut gpu = HeadlessGpu::new();
        gpu.break_program("petals");
        let mut vault = SceneVault::build(&mut gpu, &ThemeSet::default(), &options());
        assert!(matches!(
            vault.get(SceneId::Flow).status(),
            SceneStatus::Fallback(_)
        ));
        assert_eq!(vault.get(SceneId::Rain).status(), &SceneStatus::Ready);

        let sample = PointerSample::at_rest(Viewport::new(320, 200));
        vault.advance_all(0.25, &sample, false);
        assert!(vault.iter().all(|h| h.sim_time() == 0.25));
    }
}
