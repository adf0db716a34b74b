//! Scalar math.

use std::f32::consts::TAU;

use anyhow::{Result, anyhow};

use super::{param_bool, param_str, with_indexed_inputs};
use crate::dsl::Node;
use crate::material::context::CompileContext;
use crate::material::resolver::input_at;
use crate::material::types::{Expression, ExprRef, Translated};
use crate::material::utils::content_fn;

/// Operations with a native two-input expression.
pub(crate) fn binary_kind(op: &str) -> Option<&'static str> {
    Some(match op {
        "ADD" => "Add",
        "SUBTRACT" => "Subtract",
        "MULTIPLY" => "Multiply",
        "DIVIDE" => "Divide",
        "POWER" => "Power",
        "MINIMUM" => "Min",
        "MAXIMUM" => "Max",
        "MODULO" => "Fmod",
        "ARCTAN2" => "Arctangent2",
        _ => return None,
    })
}

/// Operations with a native one-input expression.
pub(crate) fn unary_kind(op: &str) -> Option<&'static str> {
    Some(match op {
        "SQRT" => "SquareRoot",
        "ABSOLUTE" => "Abs",
        "ROUND" => "Round",
        "FLOOR" => "Floor",
        "CEIL" => "Ceil",
        "FRACT" => "Frac",
        "SINE" => "Sine",
        "COSINE" => "Cosine",
        "TANGENT" => "Tangent",
        "ARCSINE" => "Arcsine",
        "ARCCOSINE" => "Arccosine",
        "ARCTANGENT" => "Arctangent",
        "SIGN" => "Sign",
        "TRUNC" => "Truncate",
        _ => return None,
    })
}

/// Operations shipped as content functions: (input count, function name).
fn custom_function(op: &str) -> Option<(usize, &'static str)> {
    Some(match op {
        "INVERSE_SQRT" => (1, "MathInvSqrt"),
        "EXPONENT" => (1, "MathExp"),
        "SINH" => (1, "MathSinH"),
        "COSH" => (1, "MathCosH"),
        "TANH" => (1, "MathTanH"),
        "MULTIPLY_ADD" => (3, "MathMultiplyAdd"),
        "COMPARE" => (3, "MathCompare"),
        "SMOOTH_MIN" => (3, "MathSmoothMin"),
        "SMOOTH_MAX" => (3, "MathSmoothMax"),
        "WRAP" => (3, "MathWrap"),
        "SNAP" => (2, "MathSnap"),
        "PINGPONG" => (2, "MathPingPong"),
        _ => return None,
    })
}

/// Emit expression `kind` fed by the node's first `count` inputs, literal
/// defaults forced.
pub(crate) fn generic(
    ctx: &mut CompileContext<'_>,
    kind: &str,
    node: &Node,
    count: usize,
) -> Result<ExprRef> {
    let indices: Vec<usize> = (0..count).collect();
    with_indexed_inputs(ctx, Expression::new(kind), node, &indices, true)
}

/// Translate `op` as a scalar operation. `None` when the operation is not a
/// scalar math operation at all.
pub(crate) fn operation(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    op: &str,
) -> Result<Option<ExprRef>> {
    if let Some(kind) = binary_kind(op) {
        return generic(ctx, kind, node, 2).map(Some);
    }
    if let Some(kind) = unary_kind(op) {
        return generic(ctx, kind, node, 1).map(Some);
    }
    if let Some((count, name)) = custom_function(op) {
        let indices: Vec<usize> = (0..count).collect();
        let call = Expression::function_call(content_fn(name));
        return with_indexed_inputs(ctx, call, node, &indices, false).map(Some);
    }

    let out = match op {
        "RADIANS" | "DEGREES" => {
            let a = input_at(ctx, node, 0, false)?;
            let factor = if op == "RADIANS" { TAU / 360.0 } else { 360.0 / TAU };
            let factor = ctx.scalar(factor);
            ctx.push(Expression::new("Multiply").input(0, a).input(1, factor))
        }
        "LOGARITHM" => {
            let a = input_at(ctx, node, 0, false)?;
            let base = input_at(ctx, node, 1, false)?;
            let log_a = ctx.push(Expression::new("Logarithm2").input(0, a));
            let log_base = ctx.push(Expression::new("Logarithm2").input(0, base));
            ctx.push(Expression::new("Divide").input(0, log_a).input(1, log_base))
        }
        "LESS_THAN" | "GREATER_THAN" => {
            let a = input_at(ctx, node, 0, false)?;
            let b = input_at(ctx, node, 1, false)?;
            let one = ctx.scalar(1.0);
            let zero = ctx.scalar(0.0);
            // If slots: A, B, A > B, A == B, A < B
            let (greater, equal, less) = if op == "LESS_THAN" {
                (zero, one, one)
            } else {
                (one, zero, zero)
            };
            ctx.push(
                Expression::new("If")
                    .input(0, a)
                    .input(1, b)
                    .input(2, greater)
                    .input(3, equal)
                    .input(4, less),
            )
        }
        _ => return Ok(None),
    };
    Ok(Some(out))
}

pub fn math(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let op = param_str(node, "operation")?;
    let mut out = operation(ctx, node, op)?
        .ok_or_else(|| anyhow!("node '{}' has unknown math operation '{op}'", node.id))?;
    if param_bool(node, "useClamp") {
        out = ctx.push(Expression::new("Saturate").input(0, out));
    }
    Ok(out.into())
}
