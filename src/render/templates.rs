//! GLSL template environment.
//!
//! Generated materials (triplanar) are rendered from minijinja templates
//! embedded next to the builtin catalog. Blocks use `{$ ... $}`, line
//! statements `$$`.

use std::sync::OnceLock;

use minijinja::{Environment, Error, syntax::SyntaxConfig};
use serde::Serialize;

use crate::errors::Result;
use crate::render::catalog::embedded_source;

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn get_env() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(template_loader);

        env
    })
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if name.ends_with(".glsl") {
        name.to_string()
    } else {
        format!("{name}.glsl")
    };
    Ok(embedded_source(&filename))
}

/// Renders the embedded template `name` with `ctx`.
pub fn render_template<S: Serialize>(name: &str, ctx: S) -> Result<String> {
    let template = get_env().get_template(name)?;
    Ok(template.render(ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn triplanar_template_toggles_maps() {
        let ctx = json!({
            "use_normal_map": false,
            "use_roughness_map": true,
            "normal_strength": 1.0,
            "roughness": 0.5,
            "opacity": 1.0,
        });
        let src = render_template("triplanar.frag", ctx).unwrap();
        assert!(!src.contains("normal_map"));
        assert!(src.contains("uniform sampler2D roughness_map;"));
        assert!(src.contains("float roughness = 0.5;"));
        assert!(!src.contains("{$"));
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = render_template("triplanar.frag", json!({ "use_normal_map": true, "use_roughness_map": false }));
        assert!(err.is_err());
    }
}
