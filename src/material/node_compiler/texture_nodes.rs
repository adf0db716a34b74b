//! Procedural and image textures.
//!
//! Procedural textures call one content function per variant and expose
//! their outputs through a multi-output record. The vector input goes
//! through the node's mapping block; when nothing is wired the functions
//! fall back to generated coordinates.

use anyhow::{Result, anyhow};

use super::input_nodes::{default_texcoord, texcoord_generated};
use super::{multi, param_f32_or, param_str, param_str_or};
use crate::dsl::{Node, parse_str};
use crate::material::context::CompileContext;
use crate::material::defaults::mapped_vector;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::resolver::{input, input_socket, value_of};
use crate::material::texture_registry::ColorSpaceHint;
use crate::material::types::{Expression, ExprRef, TextureContext, Translated};
use crate::material::utils::content_fn;

/// `1D`..`4D` to the suffix used by function names.
fn dimensions(node: &Node, key: &'static str) -> Result<&'static str> {
    Ok(match param_str_or(node, key, "3D") {
        "1D" => "1d",
        "2D" => "2d",
        "3D" => "3d",
        "4D" => "4d",
        other => return Err(anyhow!("node '{}' has unknown dimensions '{other}'", node.id)),
    })
}

/// Resolve an input that must produce something, without a missing-default
/// warning.
fn required(ctx: &mut CompileContext<'_>, node: &Node, name: &str) -> Result<Option<ExprRef>> {
    let socket = input_socket(node, name)?;
    value_of(ctx, node, socket, false, true)
}

/// Function call with the mapped vector in slot 0 and `names` after it.
fn vector_function(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    function: &str,
    names: &[&str],
) -> Result<Expression> {
    let vector = mapped_vector(ctx, node, "Vector", texcoord_generated, false)?;
    let mut call = Expression::function_call(content_fn(function)).input(0, vector);
    for (i, name) in names.iter().enumerate() {
        call = call.input(i + 1, input(ctx, node, name)?);
    }
    Ok(call)
}

pub fn brick(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let mut call = vector_function(
        ctx,
        node,
        "TexBrick",
        &[
            "Color1",
            "Color2",
            "Mortar",
            "Scale",
            "Mortar Size",
            "Mortar Smooth",
            "Bias",
            "Brick Width",
            "Row Height",
        ],
    )?;
    let params = [
        ("offset", 0.5),
        ("offsetFrequency", 2.0),
        ("squash", 1.0),
        ("squashFrequency", 2.0),
    ];
    for (i, (key, default)) in params.into_iter().enumerate() {
        let v = ctx.scalar(param_f32_or(node, key, default));
        call = call.input(10 + i, v);
    }
    Ok(multi(ctx.push(call), &["Color", "Fac"]))
}

pub fn checker(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = vector_function(ctx, node, "TexChecker", &["Color1", "Color2", "Scale"])?;
    Ok(multi(ctx.push(call), &["Color", "Fac"]))
}

pub fn gradient(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let variant = match param_str(node, "gradientType")? {
        "LINEAR" => "Linear",
        "QUADRATIC" => "Quadratic",
        "EASING" => "Easing",
        "DIAGONAL" => "Diagonal",
        "SPHERICAL" => "Spherical",
        "QUADRATIC_SPHERE" => "QuadraticSphere",
        "RADIAL" => "Radial",
        other => return Err(anyhow!("node '{}' has unknown gradient type '{other}'", node.id)),
    };
    let call = vector_function(ctx, node, &format!("TexGradient_{variant}"), &[])?;
    Ok(multi(ctx.push(call), &["Color", "Fac"]))
}

/// Sample an image through the texture registry.
///
/// Under a normal-map context the texture is registered as a normal map
/// and remapped back to `[0, 1]`. Under a bump context it is registered as
/// linear data and whitelisted for the passthrough post-pass.
pub fn image(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let doc = ctx.doc;
    let Some(image) = parse_str(&node.params, "image").and_then(|name| doc.image(name)) else {
        return Ok(ctx.scalar(0.0).into());
    };

    let context = ctx.texture_context();
    let hint = match context {
        Some(TextureContext::Normal) => ColorSpaceHint::Normal,
        Some(TextureContext::Bump) => ColorSpaceHint::Linear,
        None if image.is_data => ColorSpaceHint::Linear,
        None => ColorSpaceHint::Srgb,
    };
    let name = ctx
        .session
        .textures
        .get_or_create(&image.name, image.path.as_deref(), hint);

    let mut coords = None;
    if let Some(uv) = mapped_vector(ctx, node, "Vector", default_texcoord, false)? {
        let projected = match param_str_or(node, "projection", "FLAT") {
            "FLAT" => Some(
                Expression::new("ComponentMask")
                    .attr("R", "True")
                    .attr("G", "True"),
            ),
            "BOX" => Some(Expression::function_call(content_fn("TexImage_ProjBox"))),
            "SPHERE" => Some(Expression::function_call(content_fn("TexImage_ProjSphere"))),
            "TUBE" => Some(Expression::function_call(content_fn("TexImage_ProjTube"))),
            other => {
                ctx.report_error(
                    DiagnosticKind::PartialFeature,
                    format!("node TEX_IMAGE has unhandled projection: {other}"),
                    true,
                );
                None
            }
        };
        let mut uv = match projected {
            Some(p) => ctx.push(p.input(0, uv)),
            None => uv,
        };
        if ctx.config().flip_uv_y {
            uv = ctx.push(Expression::function_call(content_fn("FlipY")).input(0, uv));
        }
        coords = Some(uv);
    }

    let texture = ctx.push(
        Expression::new("Texture")
            .attr("PathName", name)
            .input("Coordinates", coords),
    );

    if context == Some(TextureContext::Normal) {
        let remapped = ctx.push(
            Expression::function_call(content_fn("NormalTo01")).input(0, texture.with_output(5)),
        );
        return Ok(multi(remapped, &["Color", "Alpha"]));
    }
    if context == Some(TextureContext::Bump) {
        ctx.whitelist.push(texture);
    }
    Ok(multi(texture, &["", "", "", "", "Alpha", "Color"]))
}

pub fn magic(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = vector_function(ctx, node, "TexMagic", &["Scale", "Distortion"])?;
    let depth = ctx.scalar(param_f32_or(node, "turbulenceDepth", 2.0));
    Ok(multi(ctx.push(call.input(3, depth)), &["Color", "Fac"]))
}

/// Musgrave has no content function; it compiles to an inline shader call.
pub fn musgrave(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let variant = match param_str(node, "musgraveType")? {
        "MULTIFRACTAL" => "multi_fractal",
        "RIDGED_MULTIFRACTAL" => "ridged_multi_fractal",
        "HYBRID_MULTIFRACTAL" => "hybrid_multi_fractal",
        "FBM" => "fBm",
        "HETERO_TERRAIN" => "hetero_terrain",
        other => return Err(anyhow!("node '{}' has unknown musgrave type '{other}'", node.id)),
    };
    let dims = dimensions(node, "musgraveDimensions")?;
    let function_name = format!("node_tex_musgrave_{variant}_{dims}");

    // Eight positional arguments; unused ones are passed as literal zeros.
    let mut arguments: Vec<String> = Vec::with_capacity(8);
    let mut bound: Vec<(String, Option<ExprRef>)> = Vec::new();

    if dims != "1d" {
        let vector = mapped_vector(ctx, node, "Vector", texcoord_generated, true)?;
        arguments.push("Vector".into());
        bound.push(("Vector".into(), vector));
    } else {
        arguments.push("0".into());
    }

    let uses_offset = matches!(
        variant,
        "ridged_multi_fractal" | "hybrid_multi_fractal" | "hetero_terrain"
    );
    let uses_gain = matches!(variant, "ridged_multi_fractal" | "hybrid_multi_fractal");
    let params = [
        ("W", dims == "1d" || dims == "4d"),
        ("Scale", true),
        ("Detail", true),
        ("Dimension", true),
        ("Lacunarity", true),
        ("Offset", uses_offset),
        ("Gain", uses_gain),
    ];
    for (name, used) in params {
        if used {
            arguments.push(name.into());
            let value = required(ctx, node, name)?;
            bound.push((name.into(), value));
        } else {
            arguments.push("0".into());
        }
    }

    let mut custom = Expression::new("Custom")
        .attr("Description", function_name.clone())
        .attr("OutputType", "1")
        .attr("Include", "/Plugin/DatasmithBlenderContent/BlenderMaterialTexMusgrave.ush")
        .attr(
            "Code",
            format!("float r; {function_name}({}, r); return r;", arguments.join(", ")),
        );
    for (i, (name, value)) in bound.into_iter().enumerate() {
        custom = custom.attr(format!("Arg{i}"), name).input(i, value);
    }
    Ok(ctx.push(custom).into())
}

pub fn noise(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let dims = dimensions(node, "noiseDimensions")?;
    let mut call = Expression::function_call(content_fn(&format!("TexNoise_{dims}")));
    let mut slot = 0;
    if dims != "1d" {
        let vector = mapped_vector(ctx, node, "Vector", texcoord_generated, true)?;
        call = call.input(slot, vector);
        slot += 1;
    }
    let w = (dims == "1d" || dims == "4d").then_some("W");
    for name in w.into_iter().chain(["Scale", "Detail", "Roughness", "Distortion"]) {
        call = call.input(slot, required(ctx, node, name)?);
        slot += 1;
    }
    Ok(multi(ctx.push(call), &["Fac", "Color"]))
}

pub fn sky(ctx: &mut CompileContext<'_>) -> Result<Translated> {
    ctx.report_warn(
        DiagnosticKind::UnsupportedNode,
        "Unsupported node 'Sky Texture', Writing value 0.",
        true,
    );
    Ok(ctx.scalar(0.0).into())
}

pub fn voronoi(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let dims = dimensions(node, "voronoiDimensions")?;
    let feature = param_str_or(node, "feature", "F1");
    let feature_fn = match feature {
        "F1" => "f1",
        "F2" => "f2",
        "SMOOTH_F1" => "smooth_f1",
        "DISTANCE_TO_EDGE" => "distance_to_edge",
        "N_SPHERE_RADIUS" => "n_sphere_radius",
        other => return Err(anyhow!("node '{}' has unknown voronoi feature '{other}'", node.id)),
    };
    let mut call =
        Expression::function_call(content_fn(&format!("TexVoronoi_{feature_fn}_{dims}")));

    let mut slot = 0;
    if dims != "1d" {
        let vector = mapped_vector(ctx, node, "Vector", texcoord_generated, true)?;
        call = call.input(slot, vector);
        slot += 1;
    }
    if dims == "1d" || dims == "4d" {
        call = call.input(slot, required(ctx, node, "W")?);
        slot += 1;
    }
    call = call.input(slot, required(ctx, node, "Scale")?);
    slot += 1;
    if feature == "SMOOTH_F1" {
        call = call.input(slot, required(ctx, node, "Smoothness")?);
        slot += 1;
    }

    let uses_metric = dims != "1d" && !matches!(feature, "DISTANCE_TO_EDGE" | "N_SPHERE_RADIUS");
    let metric = param_str_or(node, "distance", "EUCLIDEAN");
    if uses_metric {
        // The exponent slot is reserved even when the metric ignores it.
        if metric == "MINKOWSKI" {
            call = call.input(slot, required(ctx, node, "Exponent")?);
        }
        slot += 1;
    }
    call = call.input(slot, required(ctx, node, "Randomness")?);
    slot += 1;
    if uses_metric {
        let code = match metric {
            "EUCLIDEAN" => 0.0,
            "MANHATTAN" => 1.0,
            "CHEBYCHEV" => 2.0,
            "MINKOWSKI" => 3.0,
            other => return Err(anyhow!("node '{}' has unknown voronoi metric '{other}'", node.id)),
        };
        let code = ctx.scalar(code);
        call = call.input(slot, code);
    }

    let outputs: &[&'static str] = match (feature, dims) {
        ("DISTANCE_TO_EDGE", _) => &["Distance"],
        ("N_SPHERE_RADIUS", _) => &["Radius"],
        (_, "1d") => &["Distance", "Color", "W"],
        (_, "4d") => &["Distance", "Color", "Position", "W"],
        _ => &["Distance", "Color", "Position"],
    };
    Ok(multi(ctx.push(call), outputs))
}

pub fn wave(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = vector_function(
        ctx,
        node,
        "TexWave",
        &[
            "Scale",
            "Distortion",
            "Detail",
            "Detail Scale",
            "Detail Roughness",
            "Phase Offset",
        ],
    )?;
    let (wave_type, direction) = match param_str_or(node, "waveType", "BANDS") {
        "RINGS" => {
            let d = param_str_or(node, "ringsDirection", "X");
            (1.0, ["X", "Y", "Z", "SPHERICAL"].iter().position(|x| *x == d))
        }
        _ => {
            let d = param_str_or(node, "bandsDirection", "X");
            (0.0, ["X", "Y", "Z", "DIAGONAL"].iter().position(|x| *x == d))
        }
    };
    let profile = param_str_or(node, "waveProfile", "SIN");
    let profile = ["SIN", "SAW", "TRI"].iter().position(|x| *x == profile);

    let wave_type = ctx.scalar(wave_type);
    let direction = ctx.scalar(direction.unwrap_or(0) as f32);
    let profile = ctx.scalar(profile.unwrap_or(0) as f32);
    let call = call.input(7, wave_type).input(8, direction).input(9, profile);
    Ok(multi(ctx.push(call), &["Color", "Fac"]))
}

pub fn white_noise(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let dims = dimensions(node, "noiseDimensions")?;
    let mut call = Expression::function_call(content_fn(&format!("TexWhiteNoise_{dims}")));
    let mut slot = 0;
    if dims != "1d" {
        call = call.input(slot, required(ctx, node, "Vector")?);
        slot += 1;
    }
    if dims == "1d" || dims == "4d" {
        call = call.input(slot, required(ctx, node, "W")?);
    }
    Ok(multi(ctx.push(call), &["Value", "Color"]))
}
