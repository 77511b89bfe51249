//! Per-frame driver.
//!
//! The host calls [`FrameScheduler::tick`] once per display frame. It
//! advances `animated` shader uniforms (elapsed time, pointer hit, camera)
//! and emits diagnostics at a fixed interval rather than every frame.

use glam::Vec3;

use crate::render::materializer::MaterializedModel;
use crate::resources::lifecycle::{LiveCounts, ResourceLifecycleManager};
use crate::resources::uniforms::{UniformType, UniformValue};
use crate::utils::FpsCounter;

/// Host-supplied frame timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl FrameInput {
    #[must_use]
    pub fn new(dt: f32) -> Self {
        Self { dt }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
}

/// Result of one tick. `fps`/`live` are only filled on diagnostic frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub elapsed: f32,
    pub fps: Option<f32>,
    pub live: Option<LiveCounts>,
}

#[derive(Default)]
pub struct FrameScheduler {
    frame: u64,
    elapsed: f32,
    pointer_hit: Option<Vec3>,
    camera: Option<CameraState>,
    diagnostics: FpsCounter,
}

impl FrameScheduler {
    #[must_use]
    pub fn new(diagnostics_interval: f32) -> Self {
        Self {
            diagnostics: FpsCounter::with_interval(diagnostics_interval),
            ..Self::default()
        }
    }

    /// World-space point under the pointer, or `None` when it left the mesh.
    pub fn set_pointer_hit(&mut self, hit: Option<Vec3>) {
        self.pointer_hit = hit;
    }

    pub fn set_camera(&mut self, position: Vec3, target: Vec3) {
        self.camera = Some(CameraState { position, target });
    }

    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Restarts animated time, e.g. after a new mesh was installed.
    pub fn reset_clock(&mut self) {
        self.elapsed = 0.0;
    }

    /// Value an animated uniform takes this frame, if the scheduler drives it.
    fn animated_value(&self, name: &str, ty: UniformType) -> Option<UniformValue> {
        match ty {
            UniformType::Float => Some(UniformValue::Float(self.elapsed)),
            UniformType::Vec3 if name.contains("camera") => self.camera.map(|c| UniformValue::Vec3(c.position)),
            UniformType::Vec3 => self.pointer_hit.map(UniformValue::Vec3),
            _ => None,
        }
    }

    pub fn tick(
        &mut self,
        input: FrameInput,
        model: Option<&mut MaterializedModel>,
        manager: &mut ResourceLifecycleManager,
    ) -> FrameStats {
        let dt = if input.dt.is_finite() { input.dt.max(0.0) } else { 0.0 };
        self.frame += 1;
        self.elapsed += dt;

        if let Some(model) = model
            && let Some(binder) = model.binder.as_mut()
        {
            let animated: Vec<(String, UniformType)> = binder
                .descriptor()
                .uniforms
                .iter()
                .filter(|(_, spec)| spec.animated)
                .map(|(name, spec)| (name.clone(), spec.ty))
                .collect();
            let mut changed = false;
            for (name, ty) in animated {
                if let Some(value) = self.animated_value(&name, ty) {
                    changed |= binder.set_animated(&name, value);
                }
            }
            if changed {
                model.sync_uniforms(manager);
            }
        }

        let mut stats = FrameStats {
            frame: self.frame,
            elapsed: self.elapsed,
            fps: None,
            live: None,
        };
        if let Some(fps) = self.diagnostics.update(dt) {
            let live = manager.live_counts();
            log::debug!(
                "{fps:.1} fps | {} geometries, {} materials, {} textures, {} groups",
                live.geometries,
                live.materials,
                live.textures,
                live.groups
            );
            stats.fps = Some(fps);
            stats.live = Some(live);
        }
        stats
    }
}
