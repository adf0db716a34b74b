//! Color adjustment and blending nodes.

use anyhow::{Result, anyhow};

use super::{param_bool, param_str, param_str_or, with_named_inputs};
use crate::dsl::Node;
use crate::material::context::CompileContext;
use crate::material::curve_atlas::CURVE_ATLAS_NAME;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::error::CompileError;
use crate::material::resolver::{input, input_at};
use crate::material::types::{Expression, ExprRef, Translated};
use crate::material::utils::content_fn;

/// Content function implementing a color blend mode.
pub(crate) fn blend_function(node: &Node, blend_type: &str) -> Result<String> {
    let name = match blend_type {
        "MIX" => "Blend_Mix",
        "DARKEN" => "Blend_Darken",
        "MULTIPLY" => "Blend_Multiply",
        "BURN" => "Blend_ColorBurn",
        "LIGHTEN" => "Blend_Lighten",
        "SCREEN" => "Blend_Screen",
        "DODGE" => "Blend_Dodge",
        "ADD" => "Blend_Add",
        "OVERLAY" => "Blend_Overlay",
        "SOFT_LIGHT" => "Blend_SoftLight",
        "LINEAR_LIGHT" => "Blend_LinearLight",
        "DIFFERENCE" => "Blend_Difference",
        "EXCLUSION" => "Blend_Exclusion",
        "SUBTRACT" => "Blend_Subtract",
        "DIVIDE" => "Blend_Divide",
        "HUE" => "Blend_Hue",
        "SATURATION" => "Blend_Saturation",
        "COLOR" => "Blend_Color",
        "VALUE" => "Blend_Value",
        other => return Err(anyhow!("node '{}' has unknown blend type '{other}'", node.id)),
    };
    Ok(content_fn(name))
}

fn saturate(ctx: &mut CompileContext<'_>, value: impl Into<Option<ExprRef>>) -> ExprRef {
    ctx.push(Expression::new("Saturate").input(0, value))
}

/// Row index, atlas size and atlas texture: the trailing arguments of every
/// curve lookup function.
pub(crate) fn curve_lookup_args(ctx: &mut CompileContext<'_>, claim: u32) -> [ExprRef; 3] {
    let size = ctx.session.curves.size();
    let index = ctx.scalar(claim as f32);
    let size = ctx.scalar(size as f32);
    let texture = ctx.push(Expression::new("TextureObject").attr("Texture", CURVE_ATLAS_NAME));
    [index, size, texture]
}

pub fn bright_contrast(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = Expression::function_call(content_fn("BrightContrast"));
    Ok(with_named_inputs(ctx, call, node, &["Color", "Bright", "Contrast"])?.into())
}

pub fn gamma(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    Ok(with_named_inputs(ctx, Expression::new("Power"), node, &["Color", "Gamma"])?.into())
}

pub fn hue_sat(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let call = Expression::function_call(content_fn("AdjustHSV"));
    let names = ["Hue", "Saturation", "Value", "Fac", "Color"];
    Ok(with_named_inputs(ctx, call, node, &names)?.into())
}

pub fn invert(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let color = input(ctx, node, "Color")?;
    let inverted = ctx.push(Expression::new("OneMinus").input(0, color));
    let fac = input(ctx, node, "Fac")?;
    let blend = Expression::new("LinearInterpolate")
        .input(0, color)
        .input(1, inverted)
        .input(2, fac);
    Ok(ctx.push(blend).into())
}

pub fn light_falloff(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    ctx.report_warn(
        DiagnosticKind::PartialFeature,
        "Unsupported node 'Light Falloff', returning unmodified light strength",
        true,
    );
    Ok(input(ctx, node, "Strength")?.into())
}

/// Legacy color mix. The factor is always clamped, the result only on
/// request.
pub fn mix_rgb(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let fac = input(ctx, node, "Fac")?;
    let fac = saturate(ctx, fac);
    let a = input(ctx, node, "Color1")?;
    let b = input(ctx, node, "Color2")?;
    let function = blend_function(node, param_str_or(node, "blendType", "MIX"))?;
    let mut out = ctx.push(
        Expression::function_call(function)
            .input(0, fac)
            .input(1, a)
            .input(2, b),
    );
    if param_bool(node, "useClamp") {
        out = saturate(ctx, out);
    }
    Ok(out.into())
}

/// RGB curves, baked into the curve atlas and sampled per channel.
pub fn curve_rgb(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let mapping = node
        .curve_mapping
        .as_ref()
        .ok_or_else(|| CompileError::MissingNodeData {
            node: node.id.clone(),
            what: "curveMapping",
        })?;
    let claim = ctx.session.curves.bake_curve_mapping(mapping)?;

    let fac = input(ctx, node, "Fac")?;
    let color = input(ctx, node, "Color")?;
    let [index, size, texture] = curve_lookup_args(ctx, claim);
    let lookup = ctx.push(
        Expression::function_call(content_fn("RGBCurveLookup2"))
            .input(0, color)
            .input(1, index)
            .input(2, size)
            .input(3, texture),
    );
    let blend = Expression::new("LinearInterpolate")
        .input(0, color)
        .input(1, lookup)
        .input(2, fac);
    Ok(ctx.push(blend).into())
}

// Input layout of the unified mix node.
const MIX_FACTOR_SCALAR: usize = 0;
const MIX_FACTOR_VECTOR: usize = 1;
const MIX_A_SCALAR: usize = 2;
const MIX_B_SCALAR: usize = 3;
const MIX_A_VECTOR: usize = 4;
const MIX_B_VECTOR: usize = 5;
const MIX_A_RGBA: usize = 6;
const MIX_B_RGBA: usize = 7;

/// Unified mix node for floats, vectors and colors.
pub fn mix(ctx: &mut CompileContext<'_>, node: &Node) -> Result<Translated> {
    let data_type = param_str(node, "dataType")?;
    let non_uniform = param_str_or(node, "factorMode", "UNIFORM") == "NON_UNIFORM";
    let factor_slot = if data_type == "VECTOR" && non_uniform {
        MIX_FACTOR_VECTOR
    } else {
        MIX_FACTOR_SCALAR
    };
    let mut factor = input_at(ctx, node, factor_slot, false)?;
    if param_bool(node, "clampFactor") {
        factor = Some(saturate(ctx, factor));
    }

    let result = match data_type {
        "FLOAT" | "VECTOR" => {
            let (a, b, force) = if data_type == "FLOAT" {
                (MIX_A_SCALAR, MIX_B_SCALAR, false)
            } else {
                (MIX_A_VECTOR, MIX_B_VECTOR, true)
            };
            let a = input_at(ctx, node, a, force)?;
            let b = input_at(ctx, node, b, force)?;
            ctx.push(
                Expression::new("LinearInterpolate")
                    .input(0, a)
                    .input(1, b)
                    .input(2, factor),
            )
        }
        "RGBA" => {
            let a = input_at(ctx, node, MIX_A_RGBA, false)?;
            let b = input_at(ctx, node, MIX_B_RGBA, false)?;
            let function = blend_function(node, param_str_or(node, "blendType", "MIX"))?;
            let blended = ctx.push(
                Expression::function_call(function)
                    .input(0, factor)
                    .input(1, a)
                    .input(2, b),
            );
            if param_bool(node, "clampResult") {
                saturate(ctx, blended)
            } else {
                blended
            }
        }
        other => return Err(anyhow!("node '{}' has unknown mix data type '{other}'", node.id)),
    };
    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::CurveMappingDSL;
    use crate::material::test_utils::{
        color_in, color_out, empty_doc, node, tree, value_in, vector_in, with_ctx, with_param,
    };
    use serde_json::json;

    fn mix_node(data_type: &str) -> Node {
        with_param(
            node(
                "mix",
                "MIX",
                vec![
                    value_in("Factor", 0.5),
                    vector_in("Factor_Vector", [0.5; 3]),
                    value_in("A", 0.0),
                    value_in("B", 1.0),
                    vector_in("A_Vector", [0.0; 3]),
                    vector_in("B_Vector", [1.0; 3]),
                    color_in("A_Color", [0.0, 0.0, 0.0, 1.0]),
                    color_in("B_Color", [1.0; 4]),
                ],
                vec![color_out("Result")],
            ),
            "dataType",
            json!(data_type),
        )
    }

    #[test]
    fn mix_rgb_clamps_factor_and_optionally_result() {
        let n = with_param(
            with_param(
                node(
                    "m",
                    "MIX_RGB",
                    vec![
                        value_in("Fac", 0.5),
                        color_in("Color1", [1.0, 0.0, 0.0, 1.0]),
                        color_in("Color2", [0.0, 0.0, 1.0, 1.0]),
                    ],
                    vec![color_out("Color")],
                ),
                "blendType",
                json!("MULTIPLY"),
            ),
            "useClamp",
            json!(true),
        );
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let Translated::Value(out) = mix_rgb(ctx, &n).unwrap() else {
                panic!("expected value")
            };
            assert_eq!(ctx.expressions[out.index].kind, "Saturate");
            let blend = ctx.expressions[out.index].input_ref("0").unwrap();
            assert_eq!(
                ctx.expressions[blend.index].function(),
                Some(content_fn("Blend_Multiply").as_str())
            );
            assert_eq!(ctx.expressions.count_kind("Saturate"), 2);
        });
    }

    #[test]
    fn mix_float_lerps_scalar_slots() {
        let n = mix_node("FLOAT");
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let Translated::Value(out) = mix(ctx, &n).unwrap() else {
                panic!("expected value")
            };
            let lerp = &ctx.expressions[out.index];
            assert_eq!(lerp.kind, "LinearInterpolate");
            let b = lerp.input_ref("1").unwrap();
            assert_eq!(ctx.expressions[b.index].constant(), Some("1.000000"));
        });
    }

    #[test]
    fn mix_color_uses_blend_function() {
        let n = with_param(mix_node("RGBA"), "blendType", json!("SCREEN"));
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let Translated::Value(out) = mix(ctx, &n).unwrap() else {
                panic!("expected value")
            };
            assert_eq!(
                ctx.expressions[out.index].function(),
                Some(content_fn("Blend_Screen").as_str())
            );
        });
    }

    #[test]
    fn unknown_blend_type_fails() {
        let n = with_param(mix_node("RGBA"), "blendType", json!("PINLIGHT"));
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            assert!(mix(ctx, &n).is_err());
        });
    }

    #[test]
    fn curve_rgb_claims_an_atlas_row() {
        let mut n = node(
            "curve",
            "CURVE_RGB",
            vec![value_in("Fac", 1.0), color_in("Color", [0.5; 4])],
            vec![color_out("Color")],
        );
        n.curve_mapping = Some(CurveMappingDSL::default());
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            curve_rgb(ctx, &n).unwrap();
            assert_eq!(ctx.session.curves.claimed(), 1);
            let texture = ctx
                .expressions
                .iter()
                .find(|e| e.kind == "TextureObject")
                .unwrap();
            assert_eq!(texture.attributes["Texture"], CURVE_ATLAS_NAME);
        });
    }

    #[test]
    fn curve_rgb_without_mapping_is_structural() {
        let n = node(
            "curve",
            "CURVE_RGB",
            vec![value_in("Fac", 1.0), color_in("Color", [0.5; 4])],
            vec![color_out("Color")],
        );
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let err = curve_rgb(ctx, &n).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CompileError>(),
                Some(CompileError::MissingNodeData { what: "curveMapping", .. })
            ));
        });
    }
}
