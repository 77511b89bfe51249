//! Loads one mesh from a local storage root, materializes it in every
//! built-in render mode and prints what each mode keeps alive.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example inspect_mesh -- ./storage output bunny.glb
//! ```

use meshview::{AssetReaderVariant, FrameInput, LoadOutcome, MeshCategory, MeshSource, RenderMode, ViewerSettings, ViewerSlot};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [root, category, filename, ..] = args.as_slice() else {
        anyhow::bail!("usage: inspect_mesh <root> <category> <filename>");
    };
    let category: MeshCategory = category.parse()?;

    let reader = AssetReaderVariant::from_source(root)?;
    let mut slot = ViewerSlot::new(ViewerSettings::default(), reader)?;

    let source = MeshSource::new(root.as_str(), category, filename.as_str());
    match pollster::block_on(slot.load(source)) {
        LoadOutcome::Installed { load_id } => println!("load #{load_id} installed"),
        LoadOutcome::Failed { error, .. } => anyhow::bail!("load failed: {error}"),
        LoadOutcome::Stale { .. } => unreachable!("only one load was requested"),
    }

    let mut modes = vec![
        RenderMode::Solid,
        RenderMode::Wireframe,
        RenderMode::NormalMap,
        RenderMode::Flat,
        RenderMode::Smooth,
        RenderMode::Textured,
    ];
    modes.extend(
        meshview::ShaderCatalog::builtin()?
            .ids()
            .map(|id| RenderMode::Shader(id.to_string())),
    );

    for mode in modes {
        slot.set_mode(mode.clone());
        // Two frames so animated uniforms have moved.
        slot.tick(FrameInput::new(1.0 / 60.0));
        slot.tick(FrameInput::new(1.0 / 60.0));

        let live = slot.live_counts();
        let model = slot.model();
        let note = match model.and_then(|m| m.fallback.as_ref()) {
            Some(err) => format!(" (fell back: {err})"),
            None => String::new(),
        };
        let points = model
            .and_then(|m| m.point_count)
            .map(|n| format!(", {n} points"))
            .unwrap_or_default();
        println!(
            "{mode:<24} {} geometries, {} materials, {} textures{points}{note}",
            live.geometries, live.materials, live.textures
        );
    }

    let report = slot.unmount();
    println!("released {} resources", report.events.len());
    Ok(())
}
