//! Naming and literal-formatting helpers shared by every translator.

use super::types::{Expression, ExpressionList, ExprRef};

const FORBIDDEN_NAME_CHARS: &[char] = &[
    ' ', '.', ',', '/', '?', '<', '>', ';', ':', '\'', '"', '~', '`', '[', ']', '{', '}', '\\',
    '|', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '=',
];

/// Make a name acceptable as a target-format identifier.
///
/// Forbidden characters become `_`. The target rejects identifiers that start
/// with an underscore, so such names get a leading `0`.
pub fn sanitize_name(name: &str) -> String {
    let out: String = name
        .chars()
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if out.starts_with('_') {
        format!("0{out}")
    } else {
        out
    }
}

pub fn fmt_f32(v: f32) -> String {
    format!("{v:.6}")
}

pub fn fmt_color(c: [f32; 4]) -> String {
    format!(
        "(R={:.6},G={:.6},B={:.6},A={:.6})",
        c[0], c[1], c[2], c[3]
    )
}

/// Vectors travel as color constants with a unit alpha.
pub fn fmt_vector(v: [f32; 3]) -> String {
    fmt_color([v[0], v[1], v[2], 1.0])
}

/// Path of a function asset shipped with the exporter's content plugin.
pub fn content_fn(name: &str) -> String {
    format!("/DatasmithBlenderContent/MaterialFunctions/{name}")
}

pub const ENGINE_BREAK_FLOAT3: &str =
    "/Engine/Functions/Engine_MaterialFunctions02/Utility/BreakOutFloat3Components";
pub const ENGINE_MAKE_FLOAT3: &str =
    "/Engine/Functions/Engine_MaterialFunctions02/Utility/MakeFloat3";
pub const ENGINE_DITHER_TEMPORAL_AA: &str =
    "/Engine/Functions/Engine_MaterialFunctions02/Utility/DitherTemporalAA";

/// Mapping function for a vector interpretation (`POINT`, `TEXTURE`,
/// `VECTOR`, `NORMAL`).
pub fn mapping_function(vector_type: &str) -> Option<String> {
    let name = match vector_type {
        "POINT" => "MappingPoint3D",
        "TEXTURE" => "MappingTexture3D",
        "VECTOR" => "MappingVector",
        "NORMAL" => "MappingNormal",
        _ => return None,
    };
    Some(content_fn(name))
}

pub fn push_scalar(list: &mut ExpressionList, v: f32) -> ExprRef {
    list.push(Expression::new("Scalar").attr("constant", fmt_f32(v)))
}

pub fn push_vector(list: &mut ExpressionList, v: [f32; 3]) -> ExprRef {
    list.push(Expression::new("Color").attr("constant", fmt_vector(v)))
}

/// A color constant is emitted as rgb and alpha joined by an AppendVector, so
/// the result carries four components the way the target expects.
pub fn push_color(list: &mut ExpressionList, c: [f32; 4]) -> ExprRef {
    let rgb = list.push(Expression::new("Color").attr("constant", fmt_color(c)));
    let alpha = push_scalar(list, c[3]);
    list.push(Expression::new("AppendVector").input(0, rgb).input(1, alpha))
}
