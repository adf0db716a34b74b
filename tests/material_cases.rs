use std::{path::PathBuf, process::Command};

use material_graph_export::config::ExportConfig;
use material_graph_export::dsl;
use material_graph_export::material::curve_atlas::{CURVE_ATLAS_FILE, CURVE_ATLAS_NAME};
use material_graph_export::material::export::{
    DEFAULT_MATERIAL_NAME, ExportResult, collect_all_materials,
};
use material_graph_export::material::texture_registry::ColorSpaceHint;
use material_graph_export::material::types::{Channel, MaterialRecord};

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn case_path(case_name: &str) -> PathBuf {
    manifest_dir()
        .join("tests")
        .join("cases")
        .join(case_name)
        .join("doc.json")
}

fn export_case(case_name: &str) -> ExportResult {
    let path = case_path(case_name);
    let doc = dsl::load_export_from_path(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e:#}", path.display()));
    let config = doc.config.clone().unwrap_or_default();
    collect_all_materials(&doc, config).unwrap()
}

fn material<'a>(result: &'a ExportResult, name: &str) -> &'a MaterialRecord {
    result
        .materials
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("material {name} missing"))
}

#[test]
fn mixed_scene_exports_every_material_in_order() {
    let result = export_case("mixed_scene");
    assert!(result.failures.is_empty(), "failures: {:?}", result.failures);
    let names: Vec<&str> = result.materials.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![DEFAULT_MATERIAL_NAME, "Wood_Floor", "Tinted", "Viewport_Only"]
    );
}

#[test]
fn mixed_scene_textures_carry_colorspace_hints() {
    let result = export_case("mixed_scene");
    let wood = result.textures.get("wood_png").expect("wood texture");
    assert_eq!(wood.hint, ColorSpaceHint::Srgb);
    assert_eq!(wood.path.as_deref(), Some("textures/wood.png"));

    let normal = result.textures.get("normal_png").expect("normal texture");
    assert_eq!(normal.hint, ColorSpaceHint::Normal);

    let curves = result.textures.get(CURVE_ATLAS_NAME).expect("curve atlas");
    assert_eq!(curves.hint, ColorSpaceHint::Linear);
    assert_eq!(curves.path.as_deref(), Some(CURVE_ATLAS_FILE));
    assert_eq!(result.textures.len(), 3);
}

#[test]
fn mixed_scene_principled_channels() {
    let result = export_case("mixed_scene");
    let wood = material(&result, "Wood_Floor");

    let base = wood.output(Channel::BaseColor).expect("base color");
    assert_eq!(wood.expressions.get(base.index).unwrap().kind, "Texture");
    assert_eq!(base.output, 5);

    // The wood texture feeds both the base color and the ramp: one sample.
    assert_eq!(wood.expressions.count_kind("Texture"), 2);

    let normal = wood.output_expr(Channel::Normal).expect("normal");
    assert!(normal.function().unwrap().ends_with("NormalStrength"));

    assert!(
        wood.expressions
            .iter()
            .filter_map(|e| e.function())
            .any(|f| f.ends_with("ColorRamp"))
    );
    assert_eq!(result.curve_atlas.claimed(), 1);
    assert_eq!(result.curve_atlas.size(), 64);
}

#[test]
fn mixed_scene_group_is_inlined() {
    let result = export_case("mixed_scene");
    let tinted = material(&result, "Tinted");
    let base = tinted.output_expr(Channel::BaseColor).expect("base color");
    assert_eq!(base.kind, "LinearInterpolate");
    assert_eq!(tinted.expressions.count_kind("OneMinus"), 1);
    assert!(tinted.diagnostics.is_empty(), "{:?}", tinted.diagnostics);
}

#[test]
fn mixed_scene_material_without_nodes_uses_viewport_values() {
    let result = export_case("mixed_scene");
    let basic = material(&result, "Viewport_Only");
    let roughness = basic.output_expr(Channel::Roughness).expect("roughness");
    assert_eq!(roughness.constant(), Some("0.700000"));
    assert!(basic.output(Channel::Normal).is_none());
}

#[test]
fn export_is_deterministic() {
    let a = serde_json::to_string(&export_case("mixed_scene").materials).unwrap();
    let b = serde_json::to_string(&export_case("mixed_scene").materials).unwrap();
    assert_eq!(a, b);
}

#[test]
fn headless_cli_writes_materials_and_curves() {
    let out_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("mixed_scene_out");
    let _ = std::fs::remove_dir_all(&out_dir);

    let status = Command::new(env!("CARGO_BIN_EXE_material-graph-export"))
        .arg("--input")
        .arg(case_path("mixed_scene"))
        .arg("--output-dir")
        .arg(&out_dir)
        .status()
        .expect("failed to run exporter");
    assert!(status.success(), "exporter exited with {status}");

    let text = std::fs::read_to_string(out_dir.join("materials.json")).unwrap();
    let dump: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(dump["materials"].as_array().unwrap().len(), 4);
    assert!(dump["failures"].as_array().unwrap().is_empty());
    assert!(out_dir.join(CURVE_ATLAS_FILE).exists());
}

#[test]
fn broken_material_does_not_stop_the_export() {
    let doc = dsl::parse_export(
        &serde_json::json!({
            "version": "1.0",
            "metadata": { "name": "broken" },
            "materials": [
                {
                    "name": "Dangling",
                    "nodeTree": {
                        "nodes": [
                            {
                                "id": "out",
                                "type": "OUTPUT_MATERIAL",
                                "inputs": [{ "id": "Surface", "type": "SHADER" }]
                            }
                        ],
                        "connections": [
                            {
                                "id": "l1",
                                "from": { "nodeId": "ghost", "portId": "BSDF" },
                                "to": { "nodeId": "out", "portId": "Surface" }
                            }
                        ]
                    }
                },
                { "name": "Plain", "useNodes": false }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let result = collect_all_materials(&doc, ExportConfig::default()).unwrap();
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].name, "Dangling");
    assert_eq!(result.materials.len(), 1);
    assert_eq!(result.materials[0].name, "Plain");
    assert!(result.curve_atlas.is_empty());
    assert!(result.textures.is_empty());
}

#[test]
fn headless_cli_rejects_oversized_curve_atlas() {
    let out_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("oversized_atlas_out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let config_path = out_dir.join("config.json");
    std::fs::write(&config_path, r#"{ "curveAtlasSize": 4294967295 }"#).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_material-graph-export"))
        .arg("--input")
        .arg(case_path("mixed_scene"))
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("failed to run exporter");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("curve atlas size"), "stderr: {stderr}");
    assert!(!out_dir.join("materials.json").exists());
}
