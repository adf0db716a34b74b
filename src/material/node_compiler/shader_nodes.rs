//! BSDF nodes. Each variant maps its inputs onto a fixed set of material
//! channels; the result stays an open aggregate until the export driver
//! writes it to the material.

use anyhow::Result;

use super::NodeKind;
use crate::dsl::{Node, Socket, SocketDefault, is_linked};
use crate::material::context::CompileContext;
use crate::material::diagnostics::DiagnosticKind;
use crate::material::resolver::{input, input_socket, input_socket_any, value_of};
use crate::material::types::{Channel, Expression, ExprRef, ShaderAggregate, Translated};

/// True when `socket` is wired, or its literal default is not `neutral`.
fn linked_or_not(ctx: &CompileContext<'_>, node: &Node, socket: &Socket, neutral: f32) -> bool {
    if is_linked(ctx.tree(), &node.id, &socket.id) {
        return true;
    }
    match socket.default {
        Some(SocketDefault::Scalar(v)) => v != neutral,
        _ => false,
    }
}

fn incomplete(ctx: &mut CompileContext<'_>, node: &Node) {
    ctx.report_warn(
        DiagnosticKind::PartialFeature,
        format!("{} incomplete implementation", node.node_type),
        true,
    );
}

fn principled(ctx: &mut CompileContext<'_>, node: &Node) -> Result<ShaderAggregate> {
    let mut bsdf = ShaderAggregate::new()
        .with(Channel::BaseColor, input(ctx, node, "Base Color")?)
        .with(Channel::Metallic, input(ctx, node, "Metallic")?)
        .with(Channel::Roughness, input(ctx, node, "Roughness")?);

    let specular = input_socket_any(node, &["Specular IOR Level", "Specular"])?;
    bsdf.set(Channel::Specular, value_of(ctx, node, specular, false, false)?);

    let alpha = input_socket(node, "Alpha")?;
    if linked_or_not(ctx, node, alpha, 1.0) {
        bsdf.set(Channel::Opacity, value_of(ctx, node, alpha, false, false)?);
    }

    let emission = input_socket_any(node, &["Emission Color", "Emission"])?;
    let strength = input_socket(node, "Emission Strength")?;
    let emissive = if linked_or_not(ctx, node, strength, 1.0) {
        let color = value_of(ctx, node, emission, false, false)?;
        let strength = value_of(ctx, node, strength, false, false)?;
        Some(ctx.push(Expression::new("Multiply").input(0, color).input(1, strength)))
    } else {
        value_of(ctx, node, emission, false, false)?
    };
    bsdf.set(Channel::EmissiveColor, emissive);

    let coat = input_socket_any(node, &["Coat Weight", "Clearcoat"])?;
    if linked_or_not(ctx, node, coat, 0.0) {
        let weight = value_of(ctx, node, coat, false, false)?;
        let rough_socket = input_socket_any(node, &["Coat Roughness", "Clearcoat Roughness"])?;
        let rough = value_of(ctx, node, rough_socket, false, false)?;
        bsdf.set(Channel::ClearCoat, weight);
        bsdf.set(Channel::ClearCoatRoughness, rough);
    }
    Ok(bsdf)
}

fn emission(ctx: &mut CompileContext<'_>, node: &Node) -> Result<ShaderAggregate> {
    let color = input(ctx, node, "Color")?;
    let strength_socket = input_socket(node, "Strength")?;
    let emissive = if linked_or_not(ctx, node, strength_socket, 1.0) {
        let strength = value_of(ctx, node, strength_socket, false, false)?;
        Some(ctx.push(Expression::new("Multiply").input(0, color).input(1, strength)))
    } else {
        color
    };
    Ok(ShaderAggregate::new().with(Channel::EmissiveColor, emissive))
}

fn constant(ctx: &mut CompileContext<'_>, v: f32) -> Option<ExprRef> {
    Some(ctx.scalar(v))
}

/// Build the aggregate for any shader-producing node kind.
pub fn translate_bsdf(
    ctx: &mut CompileContext<'_>,
    kind: &NodeKind,
    node: &Node,
) -> Result<Translated> {
    use NodeKind as K;
    let mut bsdf = match kind {
        K::BsdfPrincipled => principled(ctx, node)?,
        K::EeveeSpecular => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Base Color")?)
                .with(Channel::Roughness, input(ctx, node, "Roughness")?)
        }
        K::BsdfDiffuse | K::BsdfToon => {
            if *kind == K::BsdfToon {
                incomplete(ctx, node);
            }
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Roughness, constant(ctx, 1.0))
                .with(Channel::Metallic, constant(ctx, 0.0))
        }
        K::BsdfGlossy => ShaderAggregate::new()
            .with(Channel::BaseColor, input(ctx, node, "Color")?)
            .with(Channel::Roughness, input(ctx, node, "Roughness")?)
            .with(Channel::Metallic, constant(ctx, 1.0)),
        K::BsdfVelvet => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Roughness, constant(ctx, 1.0))
        }
        K::BsdfTransparent => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Refraction, constant(ctx, 1.0))
                .with(Channel::Opacity, constant(ctx, 0.0))
        }
        K::BsdfTranslucent | K::SubsurfaceScattering => {
            incomplete(ctx, node);
            ShaderAggregate::new().with(Channel::BaseColor, input(ctx, node, "Color")?)
        }
        K::BsdfGlass => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Metallic, constant(ctx, 1.0))
                .with(Channel::Roughness, input(ctx, node, "Roughness")?)
                .with(Channel::Refraction, input(ctx, node, "IOR")?)
                .with(Channel::Opacity, constant(ctx, 0.5))
        }
        K::BsdfHair => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Roughness, constant(ctx, 0.5))
        }
        K::BsdfRefraction => {
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Roughness, input(ctx, node, "Roughness")?)
                .with(Channel::Refraction, input(ctx, node, "IOR")?)
                .with(Channel::Opacity, constant(ctx, 0.5))
        }
        K::BsdfAnisotropic => {
            // Anisotropy, rotation and tangent have no target channel.
            incomplete(ctx, node);
            ShaderAggregate::new()
                .with(Channel::BaseColor, input(ctx, node, "Color")?)
                .with(Channel::Roughness, input(ctx, node, "Roughness")?)
        }
        K::Emission => emission(ctx, node)?,
        K::Holdout => {
            let black = ctx.vector([0.0, 0.0, 0.0]);
            ShaderAggregate::new()
                .with(Channel::BaseColor, black)
                .with(Channel::Roughness, constant(ctx, 1.0))
        }
        other => anyhow::bail!("{other:?} is not a shader node"),
    };

    if let Some(normal) = node.input("Normal") {
        if is_linked(ctx.tree(), &node.id, &normal.id) {
            bsdf.set(Channel::Normal, value_of(ctx, node, normal, false, false)?);
        }
    }
    Ok(bsdf.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::test_utils::{
        color_in, color_out, empty_doc, link, node, shader_out, tree, value_in, vector_in,
        with_ctx,
    };

    fn principled_node(alpha: f32, strength: f32, coat: f32) -> Node {
        node(
            "p",
            "BSDF_PRINCIPLED",
            vec![
                color_in("Base Color", [0.8, 0.8, 0.8, 1.0]),
                value_in("Metallic", 0.0),
                value_in("Roughness", 0.5),
                value_in("Specular IOR Level", 0.5),
                value_in("Alpha", alpha),
                color_in("Emission Color", [0.0, 0.0, 0.0, 1.0]),
                value_in("Emission Strength", strength),
                value_in("Coat Weight", coat),
                value_in("Coat Roughness", 0.03),
                vector_in("Normal", [0.0; 3]),
            ],
            vec![shader_out("BSDF")],
        )
    }

    fn channels(t: &Translated) -> Vec<&'static str> {
        match t {
            Translated::Shader(s) => s.channels().map(|(c, _)| c.as_str()).collect(),
            other => panic!("expected shader, got {other:?}"),
        }
    }

    #[test]
    fn principled_skips_neutral_optional_channels() {
        let p = principled_node(1.0, 1.0, 0.0);
        let t = tree(vec![p.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let out = translate_bsdf(ctx, &NodeKind::BsdfPrincipled, &p).unwrap();
            assert_eq!(
                channels(&out),
                vec!["BaseColor", "EmissiveColor", "Metallic", "Roughness", "Specular"]
            );
            assert_eq!(ctx.expressions.count_kind("Multiply"), 0);
        });
    }

    #[test]
    fn principled_adds_opacity_emission_strength_and_coat() {
        let p = principled_node(0.5, 2.0, 1.0);
        let t = tree(vec![p.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let out = translate_bsdf(ctx, &NodeKind::BsdfPrincipled, &p).unwrap();
            let names = channels(&out);
            assert!(names.contains(&"Opacity"));
            assert!(names.contains(&"ClearCoat"));
            assert!(names.contains(&"ClearCoatRoughness"));
            let Translated::Shader(s) = out else { unreachable!() };
            let emissive = &ctx.expressions[s.get(Channel::EmissiveColor).unwrap().index];
            assert_eq!(emissive.kind, "Multiply");
        });
    }

    #[test]
    fn diffuse_uses_fixed_roughness_and_metallic() {
        let d = node(
            "d",
            "BSDF_DIFFUSE",
            vec![color_in("Color", [0.5; 4]), vector_in("Normal", [0.0; 3])],
            vec![shader_out("BSDF")],
        );
        let t = tree(vec![d.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let Translated::Shader(s) = translate_bsdf(ctx, &NodeKind::BsdfDiffuse, &d).unwrap()
            else {
                panic!("expected shader");
            };
            let rough = &ctx.expressions[s.get(Channel::Roughness).unwrap().index];
            assert_eq!(rough.constant(), Some("1.000000"));
            let metal = &ctx.expressions[s.get(Channel::Metallic).unwrap().index];
            assert_eq!(metal.constant(), Some("0.000000"));
            assert!(!s.contains(Channel::Normal));
            assert!(ctx.diagnostics.is_empty());
        });
    }

    #[test]
    fn linked_normal_becomes_a_channel() {
        let mut rgb = node("rgb", "RGB", vec![], vec![color_out("Color")]);
        rgb.outputs[0].default = Some(SocketDefault::Color([0.5, 0.5, 1.0, 1.0]));
        let g = node(
            "g",
            "BSDF_GLOSSY",
            vec![
                color_in("Color", [1.0; 4]),
                value_in("Roughness", 0.2),
                vector_in("Normal", [0.0; 3]),
            ],
            vec![shader_out("BSDF")],
        );
        let t = tree(vec![rgb, g.clone()], vec![link("rgb", "Color", "g", "Normal")]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let out = translate_bsdf(ctx, &NodeKind::BsdfGlossy, &g).unwrap();
            assert!(channels(&out).contains(&"Normal"));
        });
    }

    #[test]
    fn emission_multiplies_only_for_non_unit_strength() {
        let e = |strength| {
            node(
                "e",
                "EMISSION",
                vec![color_in("Color", [1.0; 4]), value_in("Strength", strength)],
                vec![shader_out("Emission")],
            )
        };
        let doc = empty_doc();
        for (strength, multiplies) in [(1.0, 0), (5.0, 1)] {
            let n = e(strength);
            let t = tree(vec![n.clone()], vec![]);
            with_ctx(&doc, &t, |ctx| {
                translate_bsdf(ctx, &NodeKind::Emission, &n).unwrap();
                assert_eq!(ctx.expressions.count_kind("Multiply"), multiplies);
            });
        }
    }

    #[test]
    fn approximate_variants_warn_once() {
        let glass = node(
            "glass",
            "BSDF_GLASS",
            vec![
                color_in("Color", [1.0; 4]),
                value_in("Roughness", 0.0),
                value_in("IOR", 1.45),
            ],
            vec![shader_out("BSDF")],
        );
        let t = tree(vec![glass.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            translate_bsdf(ctx, &NodeKind::BsdfGlass, &glass).unwrap();
            translate_bsdf(ctx, &NodeKind::BsdfGlass, &glass).unwrap();
            assert_eq!(ctx.diagnostics.len(), 1);
            assert_eq!(ctx.diagnostics[0].message, "BSDF_GLASS incomplete implementation");
        });
    }
}
