//! Merging of shader bundles for `ADD_SHADER` and `MIX_SHADER`.
//!
//! The target shades one BSDF per pixel, so both merges are approximations.
//! Channels are always visited in `Channel` order, which keeps the emitted
//! expression indices reproducible.

use std::collections::BTreeSet;

use anyhow::Result;

use super::context::CompileContext;
use super::diagnostics::DiagnosticKind;
use super::error::CompileError;
use super::resolver::{input_socket_any, input_socket_at, shader_at, value_of};
use super::types::{Channel, Expression, ExprRef, ShaderAggregate};
use crate::dsl::Node;

fn operand(ctx: &mut CompileContext<'_>, node: &Node, index: usize) -> Result<ShaderAggregate> {
    match shader_at(ctx, node, index)? {
        Some(s) => Ok(s),
        None => {
            let socket = input_socket_at(node, index)?;
            Err(CompileError::EmptyShaderOperand {
                node: node.id.clone(),
                socket: socket.name().to_string(),
            }
            .into())
        }
    }
}

fn channel_union(a: &ShaderAggregate, b: &ShaderAggregate) -> BTreeSet<Channel> {
    a.channels().chain(b.channels()).map(|(c, _)| c).collect()
}

fn is_additive(channel: Channel) -> bool {
    matches!(channel, Channel::BaseColor | Channel::EmissiveColor)
}

fn add_pair(ctx: &mut CompileContext<'_>, channel: Channel, a: ExprRef, b: ExprRef) -> ExprRef {
    if is_additive(channel) {
        ctx.push(Expression::new("Add").input(0, a).input(1, b))
    } else {
        let half = ctx.scalar(0.5);
        ctx.push(
            Expression::new("LinearInterpolate")
                .input(0, a)
                .input(1, b)
                .input(2, half),
        )
    }
}

/// Combine the shaders on inputs 0 and 1.
///
/// Emission and base color add up; every other channel is a 50% blend. A
/// channel only one side carries is blended against a synthesized default
/// for the other side: fully opaque for `Opacity`, zero otherwise. A
/// one-sided `Normal` is dropped.
pub fn add_shader(ctx: &mut CompileContext<'_>, node: &Node) -> Result<ShaderAggregate> {
    ctx.report_warn(
        DiagnosticKind::PartialFeature,
        "'Add Shader' is only an approximation, deferred shading cannot sum BSDF lobes.",
        true,
    );
    let a = operand(ctx, node, 0)?;
    let b = operand(ctx, node, 1)?;

    let mut out = ShaderAggregate::new();
    for channel in channel_union(&a, &b) {
        let merged = match (a.get(channel), b.get(channel)) {
            (Some(ea), Some(eb)) => add_pair(ctx, channel, ea, eb),
            (Some(_), None) | (None, Some(_)) if channel == Channel::Normal => continue,
            (ea, eb) => {
                let fill = if channel == Channel::Opacity { 1.0 } else { 0.0 };
                let ea = match ea {
                    Some(e) => e,
                    None => ctx.scalar(fill),
                };
                let eb = match eb {
                    Some(e) => e,
                    None => ctx.scalar(fill),
                };
                add_pair(ctx, channel, ea, eb)
            }
        };
        out.set(channel, merged);
    }
    Ok(out)
}

/// Blend the shaders on inputs 1 and 2 by the node's factor.
///
/// When either side is transparent both sides get an `Opacity` channel,
/// fully opaque where it was missing. Channels present on both sides are
/// interpolated; the rest pass through.
pub fn mix_shader(ctx: &mut CompileContext<'_>, node: &Node) -> Result<ShaderAggregate> {
    ctx.report_warn(
        DiagnosticKind::PartialFeature,
        "'Mix Shader' is only an approximation, deferred shading cannot blend BSDFs.",
        true,
    );
    let mut a = operand(ctx, node, 1)?;
    let mut b = operand(ctx, node, 2)?;

    if a.contains(Channel::Opacity) || b.contains(Channel::Opacity) {
        if !a.contains(Channel::Opacity) {
            let one = ctx.scalar(1.0);
            a.set(Channel::Opacity, one);
        }
        if !b.contains(Channel::Opacity) {
            let one = ctx.scalar(1.0);
            b.set(Channel::Opacity, one);
        }
    }

    let fac_socket = input_socket_any(node, &["Fac", "Factor"])?;
    let fac = value_of(ctx, node, fac_socket, false, false)?;

    let mut out = ShaderAggregate::new();
    for channel in channel_union(&a, &b) {
        let merged = match (a.get(channel), b.get(channel)) {
            (Some(ea), Some(eb)) => ctx.push(
                Expression::new("LinearInterpolate")
                    .input(0, ea)
                    .input(1, eb)
                    .input(2, fac),
            ),
            (Some(e), None) | (None, Some(e)) => e,
            (None, None) => continue,
        };
        out.set(channel, merged);
    }
    Ok(out)
}
