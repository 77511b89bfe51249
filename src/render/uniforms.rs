//! Shader uniform binding.
//!
//! [`resolve_uniforms`] turns a descriptor plus a sparse override map into a
//! complete, typed uniform set. [`UniformBinder`] keeps the overrides for one
//! live shader material and exposes them as editable controls.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde_json::Value;

use crate::errors::ShaderError;
use crate::render::catalog::{ShaderDescriptor, UniformSpec};
use crate::resources::material::ShaderMaterial;
use crate::resources::uniforms::{UniformType, UniformValue};

/// Converts a raw JSON value according to the declared type.
///
/// Colors accept `[r, g, b]`, `{r, g, b}` or `"#rrggbb"`; vectors accept arrays
/// or `{x, y[, z]}`. Returns `None` for shapes that do not fit.
#[must_use]
pub fn convert_value(ty: UniformType, value: &Value) -> Option<UniformValue> {
    match ty {
        UniformType::Float => value.as_f64().map(|v| UniformValue::Float(v as f32)),
        UniformType::Int => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.round() as i64))
            .map(|v| UniformValue::Int(v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)),
        UniformType::Bool => value
            .as_bool()
            .or_else(|| value.as_f64().map(|v| v != 0.0))
            .map(UniformValue::Bool),
        UniformType::Color => parse_color(value).map(UniformValue::Color),
        UniformType::Vec2 => components::<2>(value, ["x", "y"]).map(|c| UniformValue::Vec2(Vec2::from_array(c))),
        UniformType::Vec3 => components::<3>(value, ["x", "y", "z"]).map(|c| UniformValue::Vec3(Vec3::from_array(c))),
        UniformType::Texture => None,
    }
}

fn components<const N: usize>(value: &Value, keys: [&str; N]) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    match value {
        Value::Array(items) if items.len() >= N => {
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item.as_f64()? as f32;
            }
        }
        Value::Object(map) => {
            for (slot, key) in out.iter_mut().zip(keys) {
                *slot = map.get(key)?.as_f64()? as f32;
            }
        }
        _ => return None,
    }
    Some(out)
}

fn parse_color(value: &Value) -> Option<Vec3> {
    if let Some(hex) = value.as_str() {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let rgb = u32::from_str_radix(hex, 16).ok()?;
        let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
        return Some(Vec3::new(channel(16), channel(8), channel(0)));
    }
    components::<3>(value, ["r", "g", "b"]).map(Vec3::from_array)
}

/// Type-appropriate zero, used when a schema default is missing or malformed.
fn zero_value(ty: UniformType) -> Option<UniformValue> {
    match ty {
        UniformType::Float => Some(UniformValue::Float(0.0)),
        UniformType::Int => Some(UniformValue::Int(0)),
        UniformType::Bool => Some(UniformValue::Bool(false)),
        UniformType::Color => Some(UniformValue::Color(Vec3::ZERO)),
        UniformType::Vec2 => Some(UniformValue::Vec2(Vec2::ZERO)),
        UniformType::Vec3 => Some(UniformValue::Vec3(Vec3::ZERO)),
        UniformType::Texture => None,
    }
}

fn default_value(name: &str, spec: &UniformSpec) -> Option<UniformValue> {
    convert_value(spec.ty, &spec.default).or_else(|| {
        if spec.ty != UniformType::Texture && !spec.default.is_null() {
            log::warn!("Uniform '{name}': default {} does not match type {:?}", spec.default, spec.ty);
        }
        zero_value(spec.ty)
    })
}

/// Every data uniform of `descriptor`: the override when present and
/// convertible, otherwise the schema default. Texture uniforms are skipped.
#[must_use]
pub fn resolve_uniforms(descriptor: &ShaderDescriptor, overrides: &BTreeMap<String, Value>) -> BTreeMap<String, UniformValue> {
    descriptor
        .uniforms
        .iter()
        .filter_map(|(name, spec)| {
            let overridden = overrides.get(name).and_then(|raw| {
                let v = convert_value(spec.ty, raw);
                if v.is_none() {
                    log::warn!("Shader '{}': ignoring override {raw} for '{name}'", descriptor.id);
                }
                v
            });
            let value = overridden.or_else(|| default_value(name, spec))?;
            Some((name.clone(), value))
        })
        .collect()
}

/// Widget shape of an editable uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    ColorPicker,
    /// One slider per component.
    PerAxis { axes: usize, min: f32, max: f32, step: f32 },
    Checkbox,
}

/// One entry of the debug control surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub kind: ControlKind,
    pub value: UniformValue,
}

fn control_kind(spec: &UniformSpec) -> ControlKind {
    let (default_max, default_step) = if spec.ty == UniformType::Int { (10.0, 1.0) } else { (1.0, 0.01) };
    let min = spec.min.map_or(0.0, |v| v as f32);
    let max = spec.max.map_or(default_max, |v| v as f32).max(min);
    let step = spec.step.map_or(default_step, |v| v as f32);
    match spec.ty {
        UniformType::Float | UniformType::Int => ControlKind::Slider { min, max, step },
        UniformType::Color => ControlKind::ColorPicker,
        UniformType::Vec2 => ControlKind::PerAxis { axes: 2, min, max, step },
        UniformType::Vec3 => ControlKind::PerAxis { axes: 3, min, max, step },
        UniformType::Bool | UniformType::Texture => ControlKind::Checkbox,
    }
}

/// Live binding between one shader's schema, its override map and the
/// material it drives.
#[derive(Debug, Clone)]
pub struct UniformBinder {
    descriptor: Arc<ShaderDescriptor>,
    overrides: BTreeMap<String, Value>,
    /// Current values of `animated` uniforms, written by the frame scheduler.
    animated: BTreeMap<String, UniformValue>,
    version: u64,
}

impl UniformBinder {
    #[must_use]
    pub fn new(descriptor: Arc<ShaderDescriptor>) -> Self {
        Self {
            descriptor,
            overrides: BTreeMap::new(),
            animated: BTreeMap::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &Arc<ShaderDescriptor> {
        &self.descriptor
    }

    #[must_use]
    pub fn overrides(&self) -> &BTreeMap<String, Value> {
        &self.overrides
    }

    /// Bumped on every change; lets callers skip re-uploading unchanged sets.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Schema defaults, overrides, then current animated values.
    #[must_use]
    pub fn resolved(&self) -> BTreeMap<String, UniformValue> {
        let mut values = resolve_uniforms(&self.descriptor, &self.overrides);
        for (name, value) in &self.animated {
            values.insert(name.clone(), *value);
        }
        values
    }

    fn invalid(&self, name: &str, message: impl Into<String>) -> ShaderError {
        ShaderError::InvalidUniform {
            id: self.descriptor.id.clone(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Stores a raw override. It must convert under the declared type.
    pub fn set_override(&mut self, name: &str, raw: Value) -> Result<(), ShaderError> {
        let spec = self
            .descriptor
            .uniform(name)
            .ok_or_else(|| self.invalid(name, "not declared"))?;
        if convert_value(spec.ty, &raw).is_none() {
            return Err(self.invalid(name, format!("{raw} is not a valid {:?}", spec.ty)));
        }
        self.overrides.insert(name.to_string(), raw);
        self.version += 1;
        Ok(())
    }

    /// Controls for every entry that is neither hidden nor animated.
    #[must_use]
    pub fn controls(&self) -> Vec<ControlSpec> {
        let resolved = resolve_uniforms(&self.descriptor, &self.overrides);
        self.descriptor
            .uniforms
            .iter()
            .filter(|(_, spec)| spec.is_editable())
            .filter_map(|(name, spec)| {
                Some(ControlSpec {
                    name: name.clone(),
                    kind: control_kind(spec),
                    value: *resolved.get(name)?,
                })
            })
            .collect()
    }

    /// Writes a control edit back into the override map. Slider values are
    /// clamped to the declared range.
    pub fn apply_edit(&mut self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        let spec = self
            .descriptor
            .uniform(name)
            .ok_or_else(|| self.invalid(name, "not declared"))?;
        if !spec.is_editable() {
            return Err(self.invalid(name, "not editable"));
        }
        if value.uniform_type() != spec.ty {
            return Err(self.invalid(
                name,
                format!("expected {:?}, got {:?}", spec.ty, value.uniform_type()),
            ));
        }

        let value = match (control_kind(spec), value) {
            (ControlKind::Slider { min, max, .. }, UniformValue::Float(v)) => UniformValue::Float(v.clamp(min, max)),
            (ControlKind::Slider { min, max, .. }, UniformValue::Int(v)) => {
                let lo = min.ceil() as i32;
                UniformValue::Int(v.clamp(lo, (max.floor() as i32).max(lo)))
            }
            (_, v) => v,
        };
        self.overrides.insert(name.to_string(), value.to_json());
        self.version += 1;
        Ok(())
    }

    /// Drops every override and animated value in one step.
    pub fn reset(&mut self) {
        self.overrides.clear();
        self.animated.clear();
        self.version += 1;
    }

    /// Names of uniforms the frame scheduler advances.
    #[must_use]
    pub fn animated_names(&self) -> Vec<String> {
        self.descriptor.animated_uniforms().map(str::to_string).collect()
    }

    /// Sets the current value of an animated uniform. Ignored for names not
    /// declared `animated`.
    pub fn set_animated(&mut self, name: &str, value: UniformValue) -> bool {
        let declared = self
            .descriptor
            .uniform(name)
            .is_some_and(|spec| spec.animated && spec.ty == value.uniform_type());
        if declared {
            self.animated.insert(name.to_string(), value);
            self.version += 1;
        }
        declared
    }

    /// Copies the resolved data uniforms into `material`. Texture uniforms are
    /// left untouched.
    pub fn apply_to(&self, material: &mut ShaderMaterial) {
        for (name, value) in self.resolved() {
            material.set_value(&name, value);
        }
    }

    /// Draws the control surface. Returns `true` if anything was edited.
    #[cfg(feature = "debug_ui")]
    pub fn show_controls(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        for control in self.controls() {
            let edited = match (control.kind, control.value) {
                (ControlKind::Slider { min, max, step }, UniformValue::Float(mut v)) => ui
                    .add(egui::Slider::new(&mut v, min..=max).step_by(f64::from(step)).text(&control.name))
                    .changed()
                    .then_some(UniformValue::Float(v)),
                (ControlKind::Slider { min, max, .. }, UniformValue::Int(mut v)) => ui
                    .add(egui::Slider::new(&mut v, min as i32..=max as i32).text(&control.name))
                    .changed()
                    .then_some(UniformValue::Int(v)),
                (ControlKind::ColorPicker, UniformValue::Color(c)) => {
                    let mut rgb = c.to_array();
                    ui.horizontal(|ui| {
                        ui.label(&control.name);
                        ui.color_edit_button_rgb(&mut rgb).changed()
                    })
                    .inner
                    .then(|| UniformValue::Color(Vec3::from_array(rgb)))
                }
                (ControlKind::PerAxis { min, max, step, .. }, UniformValue::Vec2(v)) => {
                    let mut axes = v.to_array();
                    per_axis(ui, &control.name, &mut axes, min, max, step)
                        .then(|| UniformValue::Vec2(Vec2::from_array(axes)))
                }
                (ControlKind::PerAxis { min, max, step, .. }, UniformValue::Vec3(v)) => {
                    let mut axes = v.to_array();
                    per_axis(ui, &control.name, &mut axes, min, max, step)
                        .then(|| UniformValue::Vec3(Vec3::from_array(axes)))
                }
                (ControlKind::Checkbox, UniformValue::Bool(mut b)) => ui
                    .checkbox(&mut b, &control.name)
                    .changed()
                    .then_some(UniformValue::Bool(b)),
                _ => None,
            };
            if let Some(value) = edited {
                changed |= self.apply_edit(&control.name, value).is_ok();
            }
        }
        if ui.button("Reset").clicked() {
            self.reset();
            changed = true;
        }
        changed
    }
}

#[cfg(feature = "debug_ui")]
fn per_axis(ui: &mut egui::Ui, name: &str, axes: &mut [f32], min: f32, max: f32, step: f32) -> bool {
    ui.horizontal(|ui| {
        ui.label(name);
        let mut changed = false;
        for axis in axes.iter_mut() {
            changed |= ui
                .add(egui::DragValue::new(axis).speed(f64::from(step)).range(min..=max))
                .changed();
        }
        changed
    })
    .inner
}
