//! Material-level driver: compiles every material of a document and
//! finalizes the export-run resources.

use anyhow::{Context, Result};
use serde::Serialize;

use super::context::{CompileContext, ExportSession};
use super::curve_atlas::{CURVE_ATLAS_FILE, CURVE_ATLAS_NAME, CurveAtlas};
use super::diagnostics::DiagnosticKind;
use super::resolver::resolve;
use super::texture_registry::{ColorSpaceHint, TextureRegistry};
use super::types::{
    BlendMode, Channel, Expression, ExprRef, MaterialRecord, Resolved, ShaderAggregate,
    ShadingModel,
};
use super::utils::{ENGINE_DITHER_TEMPORAL_AA, content_fn, push_color, push_scalar, sanitize_name};
use crate::config::ExportConfig;
use crate::dsl::{BlendMethod, ExportDSL, MaterialDSL, Node, NodeTree, is_linked, parse_bool, parse_str};
use crate::graph::validate_tree;

pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";
const DEFAULT_GREY: f32 = 0.906332;

/// A material that could not be compiled. Its siblings are unaffected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ExportResult {
    pub materials: Vec<MaterialRecord>,
    pub textures: TextureRegistry,
    pub curve_atlas: CurveAtlas,
    pub failures: Vec<MaterialFailure>,
}

/// Compile every material of `doc` against one shared texture registry and
/// curve atlas.
///
/// Only an unusable config fails the whole run. A material that fails is
/// recorded in `failures`; atlas rows it claimed before failing stay claimed
/// and baked, which leaves unused rows but never corrupts a sibling's row.
pub fn collect_all_materials(doc: &ExportDSL, config: ExportConfig) -> Result<ExportResult> {
    let mut session = ExportSession::new(config)?;
    let mut materials = Vec::new();
    let mut failures = Vec::new();

    if doc.include_default_material {
        log::debug!("creating default material");
        materials.push(default_material());
    }

    for material in &doc.materials {
        match compile_material(doc, &mut session, material) {
            Ok(record) => materials.push(record),
            Err(err) => {
                log::error!("material '{}' failed: {err:#}", material.name);
                failures.push(MaterialFailure {
                    name: material.name.clone(),
                    message: format!("{err:#}"),
                });
            }
        }
    }

    if !session.curves.is_empty() {
        session.textures.get_or_create(
            CURVE_ATLAS_NAME,
            Some(CURVE_ATLAS_FILE),
            ColorSpaceHint::Linear,
        );
    }

    Ok(ExportResult {
        materials,
        textures: session.textures,
        curve_atlas: session.curves,
        failures,
    })
}

/// Fallback for objects without any material slot.
pub fn default_material() -> MaterialRecord {
    let mut record = MaterialRecord::new(DEFAULT_MATERIAL_NAME);
    let base = push_color(
        &mut record.expressions,
        [DEFAULT_GREY, DEFAULT_GREY, DEFAULT_GREY, 1.0],
    );
    let roughness = push_scalar(&mut record.expressions, 0.4);
    record.outputs.insert(Channel::BaseColor, base);
    record.outputs.insert(Channel::Roughness, roughness);
    record
}

/// Material without a node tree: the viewport values become constants.
pub fn basic_material(material: &MaterialDSL) -> MaterialRecord {
    let mut record = MaterialRecord::new(sanitize_name(&material.name));
    let list = &mut record.expressions;
    let outputs = [
        (Channel::BaseColor, push_color(list, material.diffuse_color)),
        (Channel::Roughness, push_scalar(list, material.roughness)),
        (Channel::Metallic, push_scalar(list, material.metallic)),
        (Channel::Specular, push_scalar(list, material.specular_intensity)),
    ];
    record.outputs.extend(outputs);
    record
}

/// Compile one material.
pub fn compile_material(
    doc: &ExportDSL,
    session: &mut ExportSession,
    material: &MaterialDSL,
) -> Result<MaterialRecord> {
    let tree = match (&material.node_tree, material.use_nodes) {
        (Some(tree), true) => tree,
        _ => {
            log::debug!("creating material {} without nodes", material.name);
            return Ok(basic_material(material));
        }
    };
    log::info!("Collecting material: {}", material.name);
    validate_tree(tree).with_context(|| format!("material '{}'", material.name))?;

    let name = sanitize_name(&material.name);
    let always_two_sided = session.config.always_two_sided;
    let mut ctx = CompileContext::new(doc, session, name.clone(), &material.uv_layers, tree);
    let mut record = MaterialRecord::new(name);

    let Some(output) = active_material_output(tree) else {
        ctx.report_warn(
            DiagnosticKind::Structural,
            format!("Material {} with use_nodes does not have nodes", material.name),
            true,
        );
        record.diagnostics = ctx.diagnostics;
        return Ok(record);
    };

    let mut channels = surface(&mut ctx, material, output)?;
    route_whitelist_through_passthrough(&mut ctx, &mut channels);

    let mut can_be_two_sided = true;
    match material.blend_method {
        BlendMethod::Clip => {
            record.blend_mode = BlendMode::Masked;
            record.opacity_mask_clip_value = Some(material.alpha_threshold.max(0.01));
        }
        BlendMethod::Hashed => {
            record.blend_mode = BlendMode::Masked;
            record.opacity_mask_clip_value = Some(0.5);
            if let Some(alpha) = channels.get(Channel::Opacity) {
                let dither = ctx.push(
                    Expression::function_call(ENGINE_DITHER_TEMPORAL_AA).input(0, alpha),
                );
                channels.set(Channel::Opacity, dither);
            }
        }
        BlendMethod::Blend => record.blend_mode = BlendMode::Translucent,
        // Opacity also shows up on materials set up for the path tracer,
        // which reads best single-sided.
        BlendMethod::Opaque => can_be_two_sided = !channels.contains(Channel::Opacity),
    }

    if channels.contains(Channel::ClearCoat) {
        record.shading_model = ShadingModel::ClearCoat;
    }

    let mut two_sided = ctx.two_sided_hint || (always_two_sided && can_be_two_sided);
    if material.use_backface_culling {
        two_sided = false;
    }
    record.two_sided = two_sided;

    record.outputs = channels.into_map();
    record.expressions = std::mem::take(&mut ctx.expressions);
    record.diagnostics = std::mem::take(&mut ctx.diagnostics);
    Ok(record)
}

/// Active material output, preferring the realtime target, then the shared
/// one, then the path tracer.
pub fn active_material_output(tree: &NodeTree) -> Option<&Node> {
    ["EEVEE", "ALL", "CYCLES"]
        .into_iter()
        .find_map(|target| output_for_target(tree, target))
}

fn output_for_target<'t>(tree: &'t NodeTree, target: &str) -> Option<&'t Node> {
    let mut candidates = tree
        .nodes
        .iter()
        .filter(|n| n.node_type == "OUTPUT_MATERIAL")
        .filter(|n| parse_str(&n.params, "target").unwrap_or("ALL") == target)
        .peekable();
    let first = candidates.peek().copied();
    candidates
        .find(|n| parse_bool(&n.params, "isActiveOutput").unwrap_or(false))
        .or(first)
}

/// Resolve the surface, or the transparent stand-in for volume-only
/// materials.
fn surface(
    ctx: &mut CompileContext<'_>,
    material: &MaterialDSL,
    output: &Node,
) -> Result<ShaderAggregate> {
    let tree = ctx.tree();
    let linked = |name: &str| {
        output
            .input(name)
            .is_some_and(|s| is_linked(tree, &output.id, &s.id))
    };

    if linked("Volume") && !linked("Surface") {
        ctx.report_warn(
            DiagnosticKind::PartialFeature,
            format!(
                "Material {} has volume nodes, which are unsupported. Writing transparent material.",
                material.name
            ),
            true,
        );
        let base = ctx.vector([0.0; 3]);
        let refraction = ctx.scalar(1.0);
        let opacity = ctx.scalar(0.0);
        return Ok(ShaderAggregate::new()
            .with(Channel::BaseColor, base)
            .with(Channel::Refraction, refraction)
            .with(Channel::Opacity, opacity));
    }

    let Some(socket) = output.input("Surface") else {
        return Ok(ShaderAggregate::new());
    };
    Ok(match resolve(ctx, output, socket, false, false)? {
        Some(Resolved::Shader(s)) => s,
        Some(Resolved::Value(e)) => ShaderAggregate::new().with(Channel::EmissiveColor, e),
        None => ShaderAggregate::new(),
    })
}

/// Textures sampled for bump are also wired into BaseColor through neutral
/// passthroughs, so the target does not classify them as normal maps.
fn route_whitelist_through_passthrough(ctx: &mut CompileContext<'_>, channels: &mut ShaderAggregate) {
    if ctx.whitelist.is_empty() {
        return;
    }
    let textures = std::mem::take(&mut ctx.whitelist);

    // Each link of the chain takes its texture in slot 0 and the next link in
    // slot 1. Links are emitted back to front so every input points at an
    // earlier index; the wiring matches a front-to-back chain with forward
    // references, only the indices differ.
    let mut next: Option<ExprRef> = None;
    for texture in textures.iter().rev() {
        let link = Expression::function_call(content_fn("Passthrough"))
            .input(0, *texture)
            .input(1, next);
        next = Some(ctx.push(link));
    }

    let main = Expression::function_call(content_fn("Passthrough"))
        .input(0, channels.get(Channel::BaseColor))
        .input(1, next);
    let main = ctx.push(main);
    channels.set(Channel::BaseColor, main);
}
