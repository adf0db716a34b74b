//! Defaults for disconnected sockets and texture-coordinate mapping.

use anyhow::{Result, anyhow};

use super::context::CompileContext;
use super::diagnostics::DiagnosticKind;
use super::error::CompileError;
use super::resolver;
use super::types::{Channel, Expression, ExprRef, Resolved, ShaderAggregate, TextureContext};
use super::utils::{ENGINE_BREAK_FLOAT3, ENGINE_MAKE_FLOAT3, mapping_function};
use crate::dsl::{Node, Socket, SocketDefault, SocketType, TextureMapping, is_linked};

/// Produces the coordinate a texture node samples when nothing is wired to
/// its vector input.
pub type CoordGenerator = fn(&mut CompileContext<'_>) -> ExprRef;

fn default_scalar(d: Option<SocketDefault>) -> f32 {
    match d {
        Some(SocketDefault::Scalar(v)) => v,
        Some(SocketDefault::Vector(v)) => v[0],
        Some(SocketDefault::Color(c)) => c[0],
        None => 0.0,
    }
}

fn default_color(d: Option<SocketDefault>) -> [f32; 4] {
    match d {
        Some(SocketDefault::Color(c)) => c,
        Some(SocketDefault::Vector(v)) => [v[0], v[1], v[2], 1.0],
        Some(SocketDefault::Scalar(s)) => [s, s, s, 1.0],
        None => [0.0, 0.0, 0.0, 1.0],
    }
}

pub(crate) fn default_vector(d: SocketDefault) -> [f32; 3] {
    match d {
        SocketDefault::Vector(v) => v,
        SocketDefault::Color(c) => [c[0], c[1], c[2]],
        SocketDefault::Scalar(s) => [s, s, s],
    }
}

/// Synthesize a constant for an input that has no usable link.
///
/// Scalars and colors always produce something. Vectors only do when the
/// default is a real literal, or when `force_default` asks for it anyway.
/// Shader inputs fall back to a holdout-like stub.
pub fn socket_default(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    socket: &Socket,
    force_default: bool,
    skip_default_warn: bool,
) -> Option<Resolved> {
    match socket.socket_type {
        SocketType::Value => {
            let v = default_scalar(socket.default);
            return Some(ctx.scalar(v).into());
        }
        SocketType::Rgba => {
            let mut c = default_color(socket.default);
            if ctx.texture_context() == Some(TextureContext::Normal) {
                for ch in c.iter_mut().take(3) {
                    *ch = *ch * 2.0 - 1.0;
                }
            }
            return Some(ctx.color(c).into());
        }
        SocketType::Vector => {
            if force_default || !socket.procedural {
                if let Some(d) = socket.default {
                    return Some(ctx.vector(default_vector(d)).into());
                }
            }
        }
        SocketType::Shader => {
            let base = ctx.scalar(0.0);
            let rough = ctx.scalar(1.0);
            let stub = ShaderAggregate::new()
                .with(Channel::BaseColor, base)
                .with(Channel::Roughness, rough);
            return Some(stub.into());
        }
    }

    if !skip_default_warn {
        ctx.report_warn(
            DiagnosticKind::MissingDefault,
            format!(
                "Node {} ({}) field {} ({:?}) has no links, and no default value.",
                node.display_name(),
                node.node_type,
                socket.name(),
                socket.socket_type
            ),
            false,
        );
    }
    None
}

/// Resolve a texture node's vector input and apply the node's own mapping
/// block on top of it.
///
/// The input is only walked when linked. `generator` supplies the implicit
/// coordinate when something downstream needs one: always with `force_exp`,
/// otherwise only when the mapping block is not the identity. An identity
/// mapping adds no expressions.
pub fn mapped_vector(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    socket_name: &str,
    generator: CoordGenerator,
    force_exp: bool,
) -> Result<Option<ExprRef>> {
    let socket = node
        .input(socket_name)
        .ok_or_else(|| CompileError::MissingSocket {
            node: node.id.clone(),
            socket: socket_name.to_string(),
        })?;

    let mut result = None;
    if is_linked(ctx.tree(), &node.id, &socket.id) {
        result = resolver::value_of(ctx, node, socket, false, false)?;
    }
    if result.is_none() && force_exp {
        result = Some(generator(ctx));
    }

    let identity = TextureMapping::default();
    let mapping = node.texture_mapping.as_ref().unwrap_or(&identity);

    if mapping.has_axis_remap() {
        let source = match result {
            Some(r) => r,
            None => generator(ctx),
        };
        let broken = ctx.push(Expression::function_call(ENGINE_BREAK_FLOAT3).input(0, source));
        let mut make = Expression::function_call(ENGINE_MAKE_FLOAT3);
        for (idx, axis) in mapping.axes.iter().enumerate() {
            if let Some(target) = ["X", "Y", "Z"].iter().position(|a| *a == axis.as_str()) {
                make = make.input(idx, broken.with_output(target));
            }
        }
        result = Some(ctx.push(make));
    }

    if mapping.has_transform() {
        let source = match result {
            Some(r) => r,
            None => generator(ctx),
        };
        let function = mapping_function(&mapping.vector_type).ok_or_else(|| {
            anyhow!(
                "node '{}' has unknown mapping vector type '{}'",
                node.id,
                mapping.vector_type
            )
        })?;
        let loc = ctx.vector(mapping.translation);
        let rot = ctx.vector(mapping.rotation);
        let scale = ctx.vector(mapping.scale);
        let mapped = Expression::function_call(function)
            .input(0, source)
            .input(1, loc)
            .input(2, rot)
            .input(3, scale);
        result = Some(ctx.push(mapped));
    }

    Ok(result)
}
