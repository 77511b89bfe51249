//! Shader program compilation and caching.
//!
//! A [`ShaderCompiler`] turns a vertex/fragment pair into a program or a
//! diagnostic. The backend compiler lives with the host; the crate ships
//! [`GlslValidator`], which performs the structural checks that catch broken
//! catalog entries before they reach the GPU.
//!
//! [`ShaderProgramCache`] keys compiled programs by an xxh3 hash of their
//! sources and remembers failures per shader id, so one broken shader is
//! reported once and never retried until its failure is cleared.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::ShaderError;
use crate::render::catalog::ShaderDescriptor;
use crate::resources::uniforms::UniformType;

/// Borrowed sources for one program.
#[derive(Debug, Clone)]
pub struct ProgramSource<'a> {
    pub id: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    /// Uniforms the program must declare.
    pub uniforms: Vec<(&'a str, UniformType)>,
}

impl<'a> ProgramSource<'a> {
    #[must_use]
    pub fn from_descriptor(descriptor: &'a ShaderDescriptor) -> Self {
        Self {
            id: &descriptor.id,
            vertex: &descriptor.vertex_source,
            fragment: &descriptor.fragment_source,
            uniforms: descriptor
                .uniforms
                .iter()
                .map(|(name, spec)| (name.as_str(), spec.ty))
                .collect(),
        }
    }

    /// Hash of both stages. Identical sources share one program.
    #[must_use]
    pub fn key(&self) -> u64 {
        let mut buf = String::with_capacity(self.vertex.len() + self.fragment.len() + 1);
        buf.push_str(self.vertex);
        buf.push('\0');
        buf.push_str(self.fragment);
        xxh3_64(buf.as_bytes())
    }
}

pub trait ShaderCompiler {
    /// Compiles `source`, returning the diagnostic on failure.
    fn compile(&mut self, source: &ProgramSource<'_>) -> Result<(), String>;
}

/// Structural GLSL checks: an entry point per stage, balanced braces and a
/// declaration of the right type for every schema uniform.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlslValidator;

impl GlslValidator {
    fn has_entry_point(src: &str) -> bool {
        src.match_indices("void").any(|(i, _)| {
            let rest = src[i + 4..].trim_start();
            rest.strip_prefix("main")
                .is_some_and(|r| r.trim_start().starts_with('('))
        })
    }

    fn braces_balanced(src: &str) -> bool {
        let mut depth = 0i32;
        for c in src.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }

    /// `uniform <type> <name>;` declarations as (name, type).
    fn declared_uniforms(src: &str) -> impl Iterator<Item = (&str, &str)> {
        src.lines().filter_map(|line| {
            let decl = line.trim().strip_prefix("uniform ")?;
            let decl = decl.trim_end().strip_suffix(';')?;
            let mut tokens = decl.split_whitespace();
            let mut ty = tokens.next()?;
            if matches!(ty, "highp" | "mediump" | "lowp") {
                ty = tokens.next()?;
            }
            let name = tokens.next()?;
            Some((name, ty))
        })
    }
}

impl ShaderCompiler for GlslValidator {
    fn compile(&mut self, source: &ProgramSource<'_>) -> Result<(), String> {
        for (stage, src) in [("vertex", source.vertex), ("fragment", source.fragment)] {
            if !Self::has_entry_point(src) {
                return Err(format!("{stage} stage has no main()"));
            }
            if !Self::braces_balanced(src) {
                return Err(format!("{stage} stage has unbalanced braces"));
            }
        }

        let declared: FxHashMap<&str, &str> = Self::declared_uniforms(source.vertex)
            .chain(Self::declared_uniforms(source.fragment))
            .collect();

        for (name, ty) in &source.uniforms {
            match declared.get(name) {
                None => return Err(format!("uniform '{name}' is not declared")),
                Some(found) if *found != ty.glsl_name() => {
                    return Err(format!(
                        "uniform '{name}' declared as {found}, schema says {}",
                        ty.glsl_name()
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

pub struct ShaderProgramCache<C: ShaderCompiler = GlslValidator> {
    compiler: C,
    programs: FxHashMap<u64, String>,
    failures: FxHashMap<String, ShaderError>,
}

impl Default for ShaderProgramCache<GlslValidator> {
    fn default() -> Self {
        Self::new(GlslValidator)
    }
}

impl<C: ShaderCompiler> ShaderProgramCache<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            programs: FxHashMap::default(),
            failures: FxHashMap::default(),
        }
    }

    /// Returns the program key, compiling on first use.
    pub fn get_or_compile(&mut self, source: &ProgramSource<'_>) -> Result<u64, ShaderError> {
        if let Some(err) = self.failures.get(source.id) {
            return Err(err.clone());
        }

        let key = source.key();
        if self.programs.contains_key(&key) {
            return Ok(key);
        }

        match self.compiler.compile(source) {
            Ok(()) => {
                log::debug!("Compiled shader program '{}' ({key:016x})", source.id);
                self.programs.insert(key, source.id.to_string());
                Ok(key)
            }
            Err(message) => {
                let err = ShaderError::CompileFailed {
                    id: source.id.to_string(),
                    message,
                };
                log::error!("{err}");
                self.failures.insert(source.id.to_string(), err.clone());
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn is_failed(&self, id: &str) -> bool {
        self.failures.contains_key(id)
    }

    /// Allows a failed shader to be compiled again (e.g. after editing it).
    pub fn clear_failure(&mut self, id: &str) -> bool {
        self.failures.remove(id).is_some()
    }

    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}
