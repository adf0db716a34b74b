use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use material_graph_export::config::ExportConfig;
use material_graph_export::dsl;
use material_graph_export::material::curve_atlas::CURVE_ATLAS_FILE;
use material_graph_export::material::export::{ExportResult, MaterialFailure, collect_all_materials};
use material_graph_export::material::texture_registry::TextureRegistry;
use material_graph_export::material::types::MaterialRecord;
use serde::Serialize;

const MATERIALS_FILE: &str = "materials.json";

#[derive(Debug, Default, Clone)]
struct Cli {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    always_two_sided: bool,
    no_flip_uv_y: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --input"));
                };
                cli.input = Some(PathBuf::from(v));
                i += 2;
            }
            "--output-dir" | "--outputdir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output-dir"));
                };
                cli.output_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--config" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --config"));
                };
                cli.config = Some(PathBuf::from(v));
                i += 2;
            }
            "--always-two-sided" => {
                cli.always_two_sided = true;
                i += 1;
            }
            "--no-flip-uv-y" => {
                cli.no_flip_uv_y = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --input <doc.json>, --output-dir <dir>, --config <config.json>, --always-two-sided, --no-flip-uv-y)"
                ));
            }
        }
    }
    Ok(cli)
}

/// Document config, replaced by a config file when given, then CLI flags on
/// top.
fn effective_config(cli: &Cli, doc: &dsl::ExportDSL) -> Result<ExportConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => ExportConfig::load_from_path(path)?,
        None => doc.config.clone().unwrap_or_default(),
    };
    if cli.always_two_sided {
        config.always_two_sided = true;
    }
    if cli.no_flip_uv_y {
        config.flip_uv_y = false;
    }
    Ok(config)
}

#[derive(Serialize)]
struct MaterialsDump<'a> {
    materials: &'a [MaterialRecord],
    textures: &'a TextureRegistry,
    failures: &'a [MaterialFailure],
}

fn write_outputs(result: &ExportResult, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let dump = MaterialsDump {
        materials: &result.materials,
        textures: &result.textures,
        failures: &result.failures,
    };
    let path = output_dir.join(MATERIALS_FILE);
    let text = serde_json::to_string_pretty(&dump)?;
    std::fs::write(&path, text)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());

    if !result.curve_atlas.is_empty() {
        let path = output_dir.join(CURVE_ATLAS_FILE);
        result.curve_atlas.save_exr(&path)?;
        log::info!(
            "wrote {} ({} curves)",
            path.display(),
            result.curve_atlas.claimed()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;
    let input = cli
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input <doc.json> is required"))?;

    let doc = dsl::load_export_from_path(input)?;
    let config = effective_config(&cli, &doc)?;
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    let result = collect_all_materials(&doc, config)?;
    write_outputs(&result, &output_dir)?;

    log::info!(
        "exported {} materials, {} textures, {} failures",
        result.materials.len(),
        result.textures.len(),
        result.failures.len()
    );
    for f in &result.failures {
        eprintln!("[export] {}: {}", f.name, f.message);
    }
    Ok(())
}
