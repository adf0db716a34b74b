//! Converter nodes: channel packing, ranges, ramps and the math-adjacent
//! utilities.

use anyhow::{Result, anyhow};

use super::color_nodes::curve_lookup_args;
use super::{multi, param_bool, param_str, param_str_or, with_indexed_inputs, with_named_inputs};
use crate::dsl::Node;
use crate::material::context::CompileContext;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::error::CompileError;
use crate::material::resolver::{input, shader_at};
use crate::material::types::{Channel, Expression, Translated};
use crate::material::utils::{ENGINE_BREAK_FLOAT3, ENGINE_MAKE_FLOAT3, content_fn};

/// Emit a function call fed by the node's first three inputs.
fn combine(ctx: &mut CompileContext<'_>, node: &Node, function: String) -> Result<Translated> {
    let call = Expression::function_call(function);
    Ok(with_indexed_inputs(ctx, call, node, &[0, 1, 2], false)?.into())
}

/// Emit a function call over the node's first input, exposing `outputs`.
fn separate(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    function: String,
    outputs: &[&'static str],
) -> Result<Translated> {
    let call = Expression::function_call(function);
    let expr = with_indexed_inputs(ctx, call, node, &[0], false)?;
    Ok(multi(expr, outputs))
}

pub fn blackbody(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    Ok(with_indexed_inputs(ctx, Expression::new("BlackBody"), node, &[0], false)?.into())
}

pub fn clamp(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let value = input(ctx, node, "Value")?;
    let min = input(ctx, node, "Min")?;
    let max = input(ctx, node, "Max")?;
    let (low, high) = match param_str_or(node, "clampType", "MINMAX") {
        "MINMAX" => (min, max),
        // Bounds may arrive swapped.
        "RANGE" => {
            let low = ctx.push(Expression::new("Min").input(0, min).input(1, max));
            let high = ctx.push(Expression::new("Max").input(0, min).input(1, max));
            (Some(low), Some(high))
        }
        other => return Err(anyhow!("node '{}' has unknown clamp type '{other}'", node.id)),
    };
    let clamped = Expression::new("Clamp")
        .input(0, value)
        .input(1, low)
        .input(2, high);
    Ok(ctx.push(clamped).into())
}

/// Color ramp, baked into a curve atlas row and sampled by factor.
pub fn color_ramp(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let ramp = node
        .color_ramp
        .as_ref()
        .ok_or_else(|| CompileError::MissingNodeData {
            node: node.id.clone(),
            what: "colorRamp",
        })?;
    let claim = ctx.session.curves.bake_color_ramp(ramp)?;

    let fac = input(ctx, node, "Fac")?;
    let [index, size, texture] = curve_lookup_args(ctx, claim);
    let lookup = Expression::function_call(content_fn("ColorRamp"))
        .input(0, fac)
        .input(1, index)
        .input(2, size)
        .input(3, texture);
    Ok(ctx.push(lookup).into())
}

pub fn combine_xyz(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    combine(ctx, node, ENGINE_MAKE_FLOAT3.to_string())
}

pub fn combine_rgb(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    combine(ctx, node, content_fn("CombineRGB"))
}

pub fn combine_hsv(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    combine(ctx, node, content_fn("HSV_To_RGB"))
}

pub fn combine_color(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let function = match param_str(node, "mode")? {
        "RGB" => content_fn("CombineRGB"),
        "HSV" => content_fn("HSV_To_RGB"),
        other => return Err(anyhow!("node '{}' has unsupported color mode '{other}'", node.id)),
    };
    combine(ctx, node, function)
}

pub fn separate_xyz(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    separate(ctx, node, ENGINE_BREAK_FLOAT3.to_string(), &["X", "Y", "Z"])
}

pub fn separate_rgb(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    separate(ctx, node, content_fn("SeparateRGB"), &["R", "G", "B"])
}

pub fn separate_hsv(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    separate(ctx, node, content_fn("RGB_To_HSV"), &["H", "S", "V"])
}

/// Outputs keep their RGB names whatever the mode.
pub fn separate_color(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let function = match param_str(node, "mode")? {
        "RGB" => ENGINE_BREAK_FLOAT3.to_string(),
        "HSV" => content_fn("RGB_To_HSV"),
        other => return Err(anyhow!("node '{}' has unsupported color mode '{other}'", node.id)),
    };
    separate(ctx, node, function, &["Red", "Green", "Blue"])
}

pub fn rgb_to_bw(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = Expression::function_call(content_fn("RGB_To_BW"));
    Ok(with_indexed_inputs(ctx, call, node, &[0], false)?.into())
}

pub fn map_range(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let interpolation = param_str_or(node, "interpolationType", "LINEAR");
    let clamped = param_bool(node, "clamp");
    let name = match (interpolation, clamped) {
        ("LINEAR", false) => "MapRange_Linear",
        ("LINEAR", true) => "MapRange_Linear_Clamped",
        ("STEPPED", false) => "MapRange_Stepped",
        ("STEPPED", true) => "MapRange_Stepped_Clamped",
        ("SMOOTHSTEP", _) => "MapRange_SmoothStep",
        ("SMOOTHERSTEP", _) => "MapRange_SmootherStep",
        (other, _) => {
            return Err(anyhow!(
                "node '{}' has unknown interpolation '{other}'",
                node.id
            ));
        }
    };

    let mut names = vec!["Value", "From Min", "From Max", "To Min", "To Max"];
    if interpolation == "STEPPED" {
        names.push("Steps");
    }
    let call = Expression::function_call(content_fn(name));
    Ok(with_named_inputs(ctx, call, node, &names)?.into())
}

/// Approximates shading as base color plus emission.
pub fn shader_to_rgb(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    ctx.report_warn(
        DiagnosticKind::PartialFeature,
        "Unsupported material node 'Shader To RGB', lighting effects will be lost.",
        true,
    );
    let Some(shader) = shader_at(ctx, node, 0)? else {
        return Ok(Translated::Nothing);
    };
    let base = shader.get(Channel::BaseColor);
    let emissive = shader.get(Channel::EmissiveColor);
    Ok(match (base, emissive) {
        (Some(b), Some(e)) => ctx
            .push(Expression::new("Add").input(0, b).input(1, e))
            .into(),
        (b, e) => b.or(e).into(),
    })
}
