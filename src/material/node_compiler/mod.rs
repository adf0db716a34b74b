//! Node translators and the dispatch over node types.

pub mod color_nodes;
pub mod converter_nodes;
pub mod input_nodes;
pub mod math_nodes;
pub mod shader_nodes;
pub mod texture_nodes;
pub mod vector_nodes;

use anyhow::{Result, bail};

use super::context::CompileContext;
use super::error::CompileError;
use super::resolver::{input_socket, input_socket_at, value_of};
use super::types::{Expression, ExprRef, MultiOutput, Translated};
use crate::dsl::{Node, Socket, parse_bool, parse_f32, parse_str};

/// Every node type the compiler knows, plus a fallback for the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    // Structural
    Group,
    GroupInput,
    Reroute,
    AddShader,
    MixShader,

    // Shaders
    BsdfPrincipled,
    EeveeSpecular,
    BsdfDiffuse,
    BsdfToon,
    BsdfGlossy,
    BsdfVelvet,
    BsdfTransparent,
    BsdfTranslucent,
    BsdfGlass,
    BsdfHair,
    SubsurfaceScattering,
    BsdfRefraction,
    BsdfAnisotropic,
    Emission,
    Holdout,

    // Inputs
    AmbientOcclusion,
    Attribute,
    VertexColor,
    Bevel,
    Fresnel,
    NewGeometry,
    LayerWeight,
    LightPath,
    ObjectInfo,
    ParticleInfo,
    Rgb,
    TexCoord,
    UvMap,
    Value,
    Wireframe,

    // Textures
    TexBrick,
    TexChecker,
    TexGradient,
    TexImage,
    TexMagic,
    TexMusgrave,
    TexNoise,
    TexSky,
    TexVoronoi,
    TexWave,
    TexWhiteNoise,

    // Color
    BrightContrast,
    Gamma,
    HueSat,
    Invert,
    LightFalloff,
    MixRgb,
    CurveRgb,
    Mix,

    // Vector
    Bump,
    Mapping,
    Normal,
    NormalMap,
    VectTransform,
    VectorRotate,
    VectMath,

    // Converter
    Blackbody,
    Clamp,
    ValToRgb,
    CombXyz,
    CombRgb,
    CombHsv,
    CombineColor,
    SepXyz,
    SepRgb,
    SepHsv,
    SeparateColor,
    RgbToBw,
    MapRange,
    Math,
    ShaderToRgb,

    Unsupported(String),
}

impl NodeKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "GROUP" => NodeKind::Group,
            "GROUP_INPUT" => NodeKind::GroupInput,
            "REROUTE" => NodeKind::Reroute,
            "ADD_SHADER" => NodeKind::AddShader,
            "MIX_SHADER" => NodeKind::MixShader,

            "BSDF_PRINCIPLED" => NodeKind::BsdfPrincipled,
            "EEVEE_SPECULAR" => NodeKind::EeveeSpecular,
            "BSDF_DIFFUSE" => NodeKind::BsdfDiffuse,
            "BSDF_TOON" => NodeKind::BsdfToon,
            "BSDF_GLOSSY" => NodeKind::BsdfGlossy,
            "BSDF_VELVET" => NodeKind::BsdfVelvet,
            "BSDF_TRANSPARENT" => NodeKind::BsdfTransparent,
            "BSDF_TRANSLUCENT" => NodeKind::BsdfTranslucent,
            "BSDF_GLASS" => NodeKind::BsdfGlass,
            "BSDF_HAIR" => NodeKind::BsdfHair,
            "SUBSURFACE_SCATTERING" => NodeKind::SubsurfaceScattering,
            "BSDF_REFRACTION" => NodeKind::BsdfRefraction,
            "BSDF_ANISOTROPIC" => NodeKind::BsdfAnisotropic,
            "EMISSION" => NodeKind::Emission,
            "HOLDOUT" => NodeKind::Holdout,

            "AMBIENT_OCCLUSION" => NodeKind::AmbientOcclusion,
            "ATTRIBUTE" => NodeKind::Attribute,
            "VERTEX_COLOR" => NodeKind::VertexColor,
            "BEVEL" => NodeKind::Bevel,
            "FRESNEL" => NodeKind::Fresnel,
            "NEW_GEOMETRY" => NodeKind::NewGeometry,
            "LAYER_WEIGHT" => NodeKind::LayerWeight,
            "LIGHT_PATH" => NodeKind::LightPath,
            "OBJECT_INFO" => NodeKind::ObjectInfo,
            "PARTICLE_INFO" => NodeKind::ParticleInfo,
            "RGB" => NodeKind::Rgb,
            "TEX_COORD" => NodeKind::TexCoord,
            "UVMAP" => NodeKind::UvMap,
            "VALUE" => NodeKind::Value,
            "WIREFRAME" => NodeKind::Wireframe,

            "TEX_BRICK" => NodeKind::TexBrick,
            "TEX_CHECKER" => NodeKind::TexChecker,
            "TEX_GRADIENT" => NodeKind::TexGradient,
            "TEX_IMAGE" => NodeKind::TexImage,
            "TEX_MAGIC" => NodeKind::TexMagic,
            "TEX_MUSGRAVE" => NodeKind::TexMusgrave,
            "TEX_NOISE" => NodeKind::TexNoise,
            "TEX_SKY" => NodeKind::TexSky,
            "TEX_VORONOI" => NodeKind::TexVoronoi,
            "TEX_WAVE" => NodeKind::TexWave,
            "TEX_WHITE_NOISE" => NodeKind::TexWhiteNoise,

            "BRIGHTCONTRAST" => NodeKind::BrightContrast,
            "GAMMA" => NodeKind::Gamma,
            "HUE_SAT" => NodeKind::HueSat,
            "INVERT" => NodeKind::Invert,
            "LIGHT_FALLOFF" => NodeKind::LightFalloff,
            "MIX_RGB" => NodeKind::MixRgb,
            "CURVE_RGB" => NodeKind::CurveRgb,
            "MIX" => NodeKind::Mix,

            "BUMP" => NodeKind::Bump,
            "MAPPING" => NodeKind::Mapping,
            "NORMAL" => NodeKind::Normal,
            "NORMAL_MAP" => NodeKind::NormalMap,
            "VECT_TRANSFORM" => NodeKind::VectTransform,
            "VECTOR_ROTATE" => NodeKind::VectorRotate,
            "VECT_MATH" => NodeKind::VectMath,

            "BLACKBODY" => NodeKind::Blackbody,
            "CLAMP" => NodeKind::Clamp,
            "VALTORGB" => NodeKind::ValToRgb,
            "COMBXYZ" => NodeKind::CombXyz,
            "COMBRGB" => NodeKind::CombRgb,
            "COMBHSV" => NodeKind::CombHsv,
            "COMBINE_COLOR" => NodeKind::CombineColor,
            "SEPXYZ" => NodeKind::SepXyz,
            "SEPRGB" => NodeKind::SepRgb,
            "SEPHSV" => NodeKind::SepHsv,
            "SEPARATE_COLOR" => NodeKind::SeparateColor,
            "RGBTOBW" => NodeKind::RgbToBw,
            "MAP_RANGE" => NodeKind::MapRange,
            "MATH" => NodeKind::Math,
            "SHADERTORGB" => NodeKind::ShaderToRgb,

            other => NodeKind::Unsupported(other.to_string()),
        }
    }
}

/// Translate output `output` of `node`.
///
/// Structural kinds are handled by the resolver before this is reached.
pub fn translate(
    ctx: &mut CompileContext<'_>,
    kind: &NodeKind,
    node: &Node,
    output: &Socket,
) -> Result<Translated> {
    use NodeKind as K;
    match kind {
        K::Group | K::GroupInput | K::Reroute | K::AddShader | K::MixShader | K::Unsupported(_) => {
            bail!(
                "node '{}' ({}) is resolved structurally, not translated",
                node.id,
                node.node_type
            )
        }

        K::BsdfPrincipled
        | K::EeveeSpecular
        | K::BsdfDiffuse
        | K::BsdfToon
        | K::BsdfGlossy
        | K::BsdfVelvet
        | K::BsdfTransparent
        | K::BsdfTranslucent
        | K::BsdfGlass
        | K::BsdfHair
        | K::SubsurfaceScattering
        | K::BsdfRefraction
        | K::BsdfAnisotropic
        | K::Emission
        | K::Holdout => shader_nodes::translate_bsdf(ctx, kind, node),

        K::AmbientOcclusion => input_nodes::ambient_occlusion(ctx, node, output),
        K::Attribute => input_nodes::attribute(ctx, output),
        K::VertexColor => input_nodes::vertex_color(ctx, node, output),
        K::Bevel => input_nodes::bevel(ctx, node),
        K::Fresnel => input_nodes::fresnel(ctx, node),
        K::NewGeometry => input_nodes::new_geometry(ctx, node, output),
        K::LayerWeight => input_nodes::layer_weight(ctx, node),
        K::LightPath => input_nodes::light_path(ctx, output),
        K::ObjectInfo => input_nodes::object_info(ctx, node, output),
        K::ParticleInfo => input_nodes::particle_info(ctx, output),
        K::Rgb => input_nodes::rgb(ctx, node, output),
        K::TexCoord => input_nodes::tex_coord(ctx, node, output),
        K::UvMap => input_nodes::uv_map(ctx, node),
        K::Value => input_nodes::value(ctx, node, output),
        K::Wireframe => input_nodes::wireframe(ctx),

        K::TexBrick => texture_nodes::brick(ctx, node),
        K::TexChecker => texture_nodes::checker(ctx, node),
        K::TexGradient => texture_nodes::gradient(ctx, node),
        K::TexImage => texture_nodes::image(ctx, node),
        K::TexMagic => texture_nodes::magic(ctx, node),
        K::TexMusgrave => texture_nodes::musgrave(ctx, node),
        K::TexNoise => texture_nodes::noise(ctx, node),
        K::TexSky => texture_nodes::sky(ctx),
        K::TexVoronoi => texture_nodes::voronoi(ctx, node),
        K::TexWave => texture_nodes::wave(ctx, node),
        K::TexWhiteNoise => texture_nodes::white_noise(ctx, node),

        K::BrightContrast => color_nodes::bright_contrast(ctx, node),
        K::Gamma => color_nodes::gamma(ctx, node),
        K::HueSat => color_nodes::hue_sat(ctx, node),
        K::Invert => color_nodes::invert(ctx, node),
        K::LightFalloff => color_nodes::light_falloff(ctx, node),
        K::MixRgb => color_nodes::mix_rgb(ctx, node),
        K::CurveRgb => color_nodes::curve_rgb(ctx, node),
        K::Mix => color_nodes::mix(ctx, node),

        K::Bump => vector_nodes::bump(ctx, node),
        K::Mapping => vector_nodes::mapping(ctx, node),
        K::Normal => vector_nodes::normal(ctx, node),
        K::NormalMap => vector_nodes::normal_map(ctx, node),
        K::VectTransform => vector_nodes::vect_transform(ctx, node),
        K::VectorRotate => vector_nodes::vector_rotate(ctx, node),
        K::VectMath => vector_nodes::vect_math(ctx, node),

        K::Blackbody => converter_nodes::blackbody(ctx, node),
        K::Clamp => converter_nodes::clamp(ctx, node),
        K::ValToRgb => converter_nodes::color_ramp(ctx, node),
        K::CombXyz => converter_nodes::combine_xyz(ctx, node),
        K::CombRgb => converter_nodes::combine_rgb(ctx, node),
        K::CombHsv => converter_nodes::combine_hsv(ctx, node),
        K::CombineColor => converter_nodes::combine_color(ctx, node),
        K::SepXyz => converter_nodes::separate_xyz(ctx, node),
        K::SepRgb => converter_nodes::separate_rgb(ctx, node),
        K::SepHsv => converter_nodes::separate_hsv(ctx, node),
        K::SeparateColor => converter_nodes::separate_color(ctx, node),
        K::RgbToBw => converter_nodes::rgb_to_bw(ctx, node),
        K::MapRange => converter_nodes::map_range(ctx, node),
        K::Math => math_nodes::math(ctx, node),
        K::ShaderToRgb => converter_nodes::shader_to_rgb(ctx, node),
    }
}

/// Required string parameter.
pub(crate) fn param_str<'n>(node: &'n Node, key: &'static str) -> Result<&'n str> {
    parse_str(&node.params, key).ok_or_else(|| {
        CompileError::MissingNodeData {
            node: node.id.clone(),
            what: key,
        }
        .into()
    })
}

pub(crate) fn param_str_or<'n>(node: &'n Node, key: &str, default: &'n str) -> &'n str {
    parse_str(&node.params, key).unwrap_or(default)
}

pub(crate) fn param_f32_or(node: &Node, key: &str, default: f32) -> f32 {
    parse_f32(&node.params, key).unwrap_or(default)
}

pub(crate) fn param_bool(node: &Node, key: &str) -> bool {
    parse_bool(&node.params, key).unwrap_or(false)
}

/// Emit `expr` with the node inputs at `indices` wired to slots 0, 1, ...
pub(crate) fn with_indexed_inputs(
    ctx: &mut CompileContext<'_>,
    mut expr: Expression,
    node: &Node,
    indices: &[usize],
    force_default: bool,
) -> Result<ExprRef> {
    for (slot, &index) in indices.iter().enumerate() {
        let socket = input_socket_at(node, index)?;
        let value = value_of(ctx, node, socket, force_default, false)?;
        expr = expr.input(slot, value);
    }
    Ok(ctx.push(expr))
}

/// Emit `expr` with the named node inputs wired to slots 0, 1, ...
pub(crate) fn with_named_inputs(
    ctx: &mut CompileContext<'_>,
    mut expr: Expression,
    node: &Node,
    names: &[&str],
) -> Result<ExprRef> {
    for (slot, name) in names.iter().enumerate() {
        let socket = input_socket(node, name)?;
        let value = value_of(ctx, node, socket, false, false)?;
        expr = expr.input(slot, value);
    }
    Ok(ctx.push(expr))
}

pub(crate) fn multi(expr: ExprRef, outputs: &[&'static str]) -> Translated {
    Translated::Multi(MultiOutput::new(expr, outputs))
}

pub(crate) fn unknown_output(node: &Node, output: &Socket) -> anyhow::Error {
    CompileError::UnknownOutput {
        node: node.id.clone(),
        node_type: node.node_type.clone(),
        output: output.name().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_closed_variants() {
        assert_eq!(NodeKind::from_tag("BSDF_PRINCIPLED"), NodeKind::BsdfPrincipled);
        assert_eq!(NodeKind::from_tag("VALTORGB"), NodeKind::ValToRgb);
        assert_eq!(
            NodeKind::from_tag("SCRIPT"),
            NodeKind::Unsupported("SCRIPT".to_string())
        );
    }
}
