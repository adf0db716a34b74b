//! Input nodes: geometry queries, constants and texture coordinates.

use anyhow::Result;

use super::{multi, unknown_output};
use crate::dsl::{Node, Socket, SocketDefault, parse_f32, parse_str};
use crate::material::context::CompileContext;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::resolver::{input, input_with};
use crate::material::types::{Expression, ExprRef, Translated};
use crate::material::utils::{content_fn, fmt_color, fmt_f32};

/// Pseudo-UVW coordinates derived from object bounds.
pub fn texcoord_generated(ctx: &mut CompileContext<'_>) -> ExprRef {
    ctx.push(Expression::function_call(content_fn("TexCoord_Generated")))
}

/// Coordinates of UV layer `index` as a three-component vector.
///
/// V is flipped on query when configured; samplers flip it back.
pub fn texcoord(ctx: &mut CompileContext<'_>, index: usize) -> ExprRef {
    let mut uv = ctx.push(
        Expression::new("TextureCoordinate")
            .attr("Index", index.to_string())
            .attr("UTiling", fmt_f32(1.0))
            .attr("VTiling", fmt_f32(1.0)),
    );
    if ctx.config().flip_uv_y {
        uv = ctx.push(Expression::function_call(content_fn("FlipY")).input(0, uv));
    }
    let zero = ctx.scalar(0.0);
    ctx.push(Expression::new("AppendVector").input(0, uv).input(1, zero))
}

/// First UV layer; the implicit coordinate of image textures.
pub fn default_texcoord(ctx: &mut CompileContext<'_>) -> ExprRef {
    texcoord(ctx, 0)
}

fn unsupported(ctx: &mut CompileContext<'_>, message: String) {
    ctx.report_warn(DiagnosticKind::PartialFeature, message, true);
}

fn function(ctx: &mut CompileContext<'_>, name: &str) -> ExprRef {
    ctx.push(Expression::function_call(content_fn(name)))
}

pub fn ambient_occlusion(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
) -> Result<Translated> {
    match output.name() {
        "Color" => {
            unsupported(
                ctx,
                "Unsupported material node: AMBIENT_OCCLUSION, exporting plain color instead".into(),
            );
            Ok(input(ctx, node, "Color")?.into())
        }
        "AO" => {
            unsupported(
                ctx,
                "Unsupported material node: AMBIENT_OCCLUSION, exporting 1.0 value instead".into(),
            );
            Ok(ctx.scalar(1.0).into())
        }
        _ => Err(unknown_output(node, output)),
    }
}

/// Vertex color lookup. Anything but `Fac` and `Vector` reads as color.
pub fn attribute(ctx: &mut CompileContext<'_>, output: &Socket) -> Result<Translated> {
    let vc = ctx.push(Expression::new("VertexColor"));
    let expr = match output.name() {
        "Fac" => {
            let third = ctx.vector([0.333333; 3]);
            ctx.push(Expression::new("DotProduct").input(0, vc).input(1, third))
        }
        "Vector" => vc,
        _ => ctx.push(
            Expression::new("AppendVector")
                .input(0, vc)
                .input(1, vc.with_output(4)),
        ),
    };
    Ok(expr.into())
}

pub fn vertex_color(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
) -> Result<Translated> {
    match output.name() {
        "Color" => {
            let vc = ctx.push(Expression::new("VertexColor"));
            Ok(ctx
                .push(
                    Expression::new("AppendVector")
                        .input(0, vc)
                        .input(1, vc.with_output(4)),
                )
                .into())
        }
        "Alpha" => Ok(ctx.push(Expression::new("VertexColor")).with_output(4).into()),
        _ => Err(unknown_output(node, output)),
    }
}

pub fn bevel(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    unsupported(ctx, "Unsupported node 'Bevel', writing unmodified normal".into());
    let normal = match input_with(ctx, node, "Normal", false, true)? {
        Some(n) => n,
        None => ctx.vector([0.0, 0.0, 1.0]),
    };
    Ok(normal.into())
}

pub fn fresnel(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let ior = input(ctx, node, "IOR")?;
    Ok(ctx
        .push(Expression::function_call(content_fn("BlenderFresnel")).input(0, ior))
        .into())
}

pub fn new_geometry(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
) -> Result<Translated> {
    let expr = match output.name() {
        "Position" => function(ctx, "BlenderWorldPosition"),
        "Normal" => ctx.push(Expression::new("VertexNormalWS")),
        "Tangent" => ctx.push(Expression::new("VertexTangentWS")),
        "True Normal" => function(ctx, "BlenderTrueNormal"),
        "Incoming" => function(ctx, "Incoming"),
        "Backfacing" => {
            ctx.two_sided_hint = true;
            function(ctx, "Backfacing")
        }
        name @ ("Parametric" | "Pointiness") => {
            unsupported(ctx, format!("Unsupported node 'Geometry:{name}'."));
            ctx.scalar(0.5)
        }
        "Random Per Island" => {
            unsupported(ctx, "Unsupported node 'Geometry:Random Per Island'.".into());
            ctx.scalar(0.0)
        }
        _ => return Err(unknown_output(node, output)),
    };
    Ok(expr.into())
}

pub fn layer_weight(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let blend = input(ctx, node, "Blend")?;
    let normal = input_with(ctx, node, "Normal", false, true)?;
    let expr = ctx.push(
        Expression::function_call(content_fn("LayerWeight"))
            .input(0, blend)
            .input(1, normal),
    );
    Ok(multi(expr, &["Fresnel", "Facing"]))
}

pub fn light_path(ctx: &mut CompileContext<'_>, output: &Socket) -> Result<Translated> {
    unsupported(
        ctx,
        format!("Unsupported node 'Light Path:{}'. Writing 1.0 value.", output.name()),
    );
    Ok(ctx.scalar(1.0).into())
}

pub fn object_info(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
) -> Result<Translated> {
    let expr = match output.name() {
        "Location" => {
            unsupported(
                ctx,
                "Node 'Object Info:Location' gets inverted Y coordinates, matching the target coordinate system."
                    .into(),
            );
            function(ctx, "Object_Location")
        }
        "Color" => {
            unsupported(ctx, "Node 'Object Info:Color' is not supported, writing white color.".into());
            ctx.vector([1.0, 1.0, 1.0])
        }
        "Alpha" => {
            unsupported(ctx, "Node 'Object Info:Alpha' is not supported, writing 1.0 instead.".into());
            ctx.scalar(1.0)
        }
        "Object Index" => {
            unsupported(
                ctx,
                "Node 'Object Info:Object Index' is not supported, writing PerInstanceRandom instead."
                    .into(),
            );
            ctx.push(Expression::new("PerInstanceRandom"))
        }
        "Material Index" => {
            unsupported(
                ctx,
                "Node 'Object Info:Material Index' is not supported, writing 0 instead.".into(),
            );
            ctx.scalar(0.0)
        }
        "Random" => {
            unsupported(ctx, "Node 'Object Info:Random' only works for instanced meshes.".into());
            ctx.push(Expression::new("PerInstanceRandom"))
        }
        _ => return Err(unknown_output(node, output)),
    };
    Ok(expr.into())
}

pub fn particle_info(ctx: &mut CompileContext<'_>, output: &Socket) -> Result<Translated> {
    unsupported(
        ctx,
        format!("Unsupported node 'Particle Info:{}'. Writing value 0.", output.name()),
    );
    Ok(ctx.scalar(0.0).into())
}

/// Constant color. The node label names the constant so it stays editable
/// as a parameter on the target side.
pub fn rgb(ctx: &mut CompileContext<'_>, node: &Node, output: &Socket) -> Result<Translated> {
    let c = match output.default {
        Some(SocketDefault::Color(c)) => c,
        Some(SocketDefault::Vector(v)) => [v[0], v[1], v[2], 1.0],
        Some(SocketDefault::Scalar(s)) => [s, s, s, 1.0],
        None => [0.0, 0.0, 0.0, 1.0],
    };
    let mut constant = Expression::new("Color").attr("constant", fmt_color(c));
    if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
        constant = constant.attr("Name", label);
    }
    let rgb = ctx.push(constant);
    let alpha = ctx.scalar(c[3]);
    Ok(ctx
        .push(Expression::new("AppendVector").input(0, rgb).input(1, alpha))
        .into())
}

pub fn tex_coord(ctx: &mut CompileContext<'_>, node: &Node, output: &Socket) -> Result<Translated> {
    let expr = match output.name() {
        "Generated" => texcoord_generated(ctx),
        "Normal" => ctx.push(Expression::new("VertexNormalWS")),
        "UV" => texcoord(ctx, 0),
        "Object" => function(ctx, "BlenderLocalPosition"),
        "Camera" => function(ctx, "TexCoord_Camera"),
        "Window" => function(ctx, "TexCoord_Window"),
        "Reflection" => ctx.push(Expression::new("ReflectionVectorWS")),
        _ => return Err(unknown_output(node, output)),
    };
    Ok(expr.into())
}

/// Texture coordinates of the layer named by `uvMap`, defaulting to the
/// first layer when the name is unknown.
pub fn uv_map(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let index = parse_str(&node.params, "uvMap")
        .and_then(|name| ctx.uv_layers.iter().position(|l| l == name))
        .unwrap_or(0);
    Ok(texcoord(ctx, index).into())
}

pub fn value(ctx: &mut CompileContext<'_>, node: &Node, output: &Socket) -> Result<Translated> {
    let v = match output.default {
        Some(SocketDefault::Scalar(v)) => v,
        _ => parse_f32(&node.params, "value").unwrap_or(0.0),
    };
    let mut constant = Expression::new("Scalar").attr("constant", fmt_f32(v));
    if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
        constant = constant.attr("Name", label);
    }
    Ok(ctx.push(constant).into())
}

pub fn wireframe(ctx: &mut CompileContext<'_>) -> Result<Translated> {
    unsupported(ctx, "Unsupported node 'Wireframe'. Writing value 0.".into());
    Ok(ctx.scalar(0.0).into())
}
