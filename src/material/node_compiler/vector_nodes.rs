//! Vector nodes: bump and normal handling, mapping, transforms and vector math.

use anyhow::{Result, anyhow};

use super::math_nodes;
use super::{multi, param_bool, param_str, param_str_or, with_indexed_inputs};
use crate::dsl::Node;
use crate::material::context::CompileContext;
use crate::material::defaults::default_vector;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::resolver::{input, input_at, input_with};
use crate::material::types::{Expression, TextureContext, Translated};
use crate::material::utils::{content_fn, mapping_function};

/// Bump from a height field. Everything feeding strength, distance and
/// height is read in bump context.
pub fn bump(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let sign = if param_bool(node, "invert") { -1.0 } else { 1.0 };
    let sign = ctx.scalar(sign);
    let (strength, distance, height) = ctx.with_texture_context(TextureContext::Bump, |ctx| {
        Ok((
            input(ctx, node, "Strength")?,
            input(ctx, node, "Distance")?,
            input(ctx, node, "Height")?,
        ))
    })?;
    let normal = input_with(ctx, node, "Normal", false, true)?;
    let call = Expression::function_call(content_fn("Bump"))
        .input(0, sign)
        .input(1, strength)
        .input(2, distance)
        .input(3, height)
        .input(4, normal);
    Ok(ctx.push(call).into())
}

pub fn mapping(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let vector_type = param_str_or(node, "vectorType", "POINT");
    let function = mapping_function(vector_type).ok_or_else(|| {
        anyhow!("node '{}' has unknown mapping type '{vector_type}'", node.id)
    })?;

    let vector = input(ctx, node, "Vector")?;
    let rotation = input(ctx, node, "Rotation")?;
    let scale = input(ctx, node, "Scale")?;
    let mut call = Expression::function_call(function).input(0, vector);
    // Directions ignore translation.
    if !matches!(vector_type, "NORMAL" | "VECTOR") {
        let location = input(ctx, node, "Location")?;
        call = call.input(1, location);
    }
    let call = call.input(2, rotation).input(3, scale);
    Ok(ctx.push(call).into())
}

/// The normal node's direction lives on its output socket.
pub fn normal(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let direction = node
        .outputs
        .first()
        .and_then(|s| s.default)
        .map_or([0.0, 0.0, 1.0], default_vector);
    let direction = ctx.vector(direction);
    let incoming = input_at(ctx, node, 0, false)?;
    let call = Expression::function_call(content_fn("Normal"))
        .input(0, direction)
        .input(1, incoming);
    Ok(multi(ctx.push(call), &["Normal", "Dot"]))
}

pub fn normal_map(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let strength = input(ctx, node, "Strength")?;
    let color = ctx.with_texture_context(TextureContext::Normal, |ctx| input(ctx, node, "Color"))?;
    let call = Expression::function_call(content_fn("NormalStrength"))
        .input(0, strength)
        .input(1, color);
    Ok(ctx.push(call).into())
}

fn space_name(node: &Node, space: &str) -> Result<&'static str> {
    Ok(match space {
        "WORLD" => "World",
        "CAMERA" => "Camera",
        "OBJECT" => "Object",
        other => return Err(anyhow!("node '{}' has unknown space '{other}'", node.id)),
    })
}

/// Change of space. The transform function exposes one output per vector
/// interpretation: point, vector, normal.
pub fn vect_transform(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let value = input_at(ctx, node, 0, false)?;
    let from = param_str(node, "convertFrom")?;
    let to = param_str(node, "convertTo")?;
    if from == to {
        return Ok(value.into());
    }

    let function = content_fn(&format!(
        "VectorTransform{}To{}",
        space_name(node, from)?,
        space_name(node, to)?
    ));
    let output = match param_str_or(node, "vectorType", "VECTOR") {
        "POINT" => 0,
        "VECTOR" => 1,
        "NORMAL" => {
            ctx.report_warn(
                DiagnosticKind::PartialFeature,
                "Unsupported vector type:Normal in Vector Transform node.",
                true,
            );
            2
        }
        other => return Err(anyhow!("node '{}' has unknown vector type '{other}'", node.id)),
    };
    let call = ctx.push(Expression::function_call(function).input(0, value));
    Ok(call.with_output(output).into())
}

pub fn vector_rotate(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let rotation_type = param_str_or(node, "rotationType", "AXIS_ANGLE");
    let euler = rotation_type == "EULER_XYZ";
    let function = if euler {
        "VectorRotateEulerAngles"
    } else {
        "VectorRotateAngleAxis"
    };

    let sign = ctx.scalar(if param_bool(node, "invert") { -1.0 } else { 1.0 });
    let vector = input(ctx, node, "Vector")?;
    let center = input_with(ctx, node, "Center", true, false)?;
    let mut call = Expression::function_call(content_fn(function))
        .input(0, sign)
        .input(1, vector)
        .input(2, center);

    if euler {
        let rotation = input(ctx, node, "Rotation")?;
        call = call.input(3, rotation);
    } else {
        let axis = match rotation_type {
            "X_AXIS" => Some(ctx.vector([1.0, 0.0, 0.0])),
            "Y_AXIS" => Some(ctx.vector([0.0, 1.0, 0.0])),
            "Z_AXIS" => Some(ctx.vector([0.0, 0.0, 1.0])),
            _ => input_with(ctx, node, "Axis", true, false)?,
        };
        let angle = input(ctx, node, "Angle")?;
        call = call.input(3, axis).input(4, angle);
    }
    Ok(ctx.push(call).into())
}

/// Vector operations with a native expression: (input count, kind).
fn vector_kind(op: &str) -> Option<(usize, &'static str)> {
    Some(match op {
        "CROSS_PRODUCT" => (2, "CrossProduct"),
        "DOT_PRODUCT" => (2, "DotProduct"),
        "DISTANCE" => (2, "Distance"),
        "NORMALIZE" => (1, "Normalize"),
        "FRACTION" => (1, "Frac"),
        _ => return None,
    })
}

fn vector_function(op: &str) -> Option<(usize, &'static str)> {
    Some(match op {
        "WRAP" => (3, "VectWrap"),
        "SNAP" => (2, "VectSnap"),
        "PROJECT" => (2, "VectProject"),
        "REFLECT" => (2, "VectReflect"),
        _ => return None,
    })
}

/// Operations that behave the same on vectors and scalars.
fn shared_with_scalar(op: &str) -> bool {
    matches!(
        op,
        "ADD"
            | "SUBTRACT"
            | "MULTIPLY"
            | "DIVIDE"
            | "ABSOLUTE"
            | "MINIMUM"
            | "MAXIMUM"
            | "FLOOR"
            | "CEIL"
            | "MODULO"
            | "SINE"
            | "COSINE"
            | "TANGENT"
    )
}

// Input layout of the vector math node: A, B, C, Scale.
const VECT_MATH_SCALE: usize = 3;

pub fn vect_math(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let op = param_str(node, "operation")?;

    if shared_with_scalar(op) {
        if let Some(out) = math_nodes::operation(ctx, node, op)? {
            return Ok(out.into());
        }
    }
    if let Some((count, kind)) = vector_kind(op) {
        return Ok(math_nodes::generic(ctx, kind, node, count)?.into());
    }
    if let Some((count, name)) = vector_function(op) {
        let indices: Vec<usize> = (0..count).collect();
        let call = Expression::function_call(content_fn(name));
        return Ok(with_indexed_inputs(ctx, call, node, &indices, true)?.into());
    }

    match op {
        "SCALE" => {
            let expr = Expression::new("Multiply");
            Ok(with_indexed_inputs(ctx, expr, node, &[0, VECT_MATH_SCALE], true)?.into())
        }
        "LENGTH" => {
            let a = input_at(ctx, node, 0, false)?;
            let origin = ctx.vector([0.0; 3]);
            Ok(ctx
                .push(Expression::new("Distance").input(0, a).input(1, origin))
                .into())
        }
        other => Err(anyhow!(
            "node '{}' has unknown vector math operation '{other}'",
            node.id
        )),
    }
}
