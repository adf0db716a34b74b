//! Core type definitions for the material compiler.

use std::collections::BTreeMap;

use serde::Serialize;

use super::diagnostics::Diagnostic;

/// Reference to one output slot of an emitted expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExprRef {
    pub index: usize,
    pub output: usize,
}

impl ExprRef {
    pub fn new(index: usize) -> Self {
        Self { index, output: 0 }
    }

    pub fn with_output(self, output: usize) -> Self {
        Self {
            index: self.index,
            output,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExprInput {
    pub slot: String,
    pub source: ExprRef,
}

/// One instruction of the target material's flattened expression list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Expression {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
    pub inputs: Vec<ExprInput>,
}

impl Expression {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
            inputs: Vec::new(),
        }
    }

    /// A call into a reusable material function asset.
    pub fn function_call(path: impl Into<String>) -> Self {
        Self::new("FunctionCall").attr("Function", path)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Wire `source` into `slot`. A missing source leaves the slot
    /// unconnected so the target falls back to its own default.
    pub fn input(mut self, slot: impl ToString, source: impl Into<Option<ExprRef>>) -> Self {
        if let Some(source) = source.into() {
            self.inputs.push(ExprInput {
                slot: slot.to_string(),
                source,
            });
        }
        self
    }

    pub fn input_ref(&self, slot: &str) -> Option<ExprRef> {
        self.inputs
            .iter()
            .find(|i| i.slot == slot)
            .map(|i| i.source)
    }

    pub fn function(&self) -> Option<&str> {
        self.attributes.get("Function").map(String::as_str)
    }

    pub fn constant(&self) -> Option<&str> {
        self.attributes.get("constant").map(String::as_str)
    }
}

/// Append-only list; an expression's index is its position and never changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExpressionList {
    items: Vec<Expression>,
}

impl ExpressionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expr: Expression) -> ExprRef {
        let index = self.items.len();
        self.items.push(expr);
        ExprRef::new(index)
    }

    pub fn get(&self, index: usize) -> Option<&Expression> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.items.iter()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.items.iter().filter(|e| e.kind == kind).count()
    }
}

impl std::ops::Index<usize> for ExpressionList {
    type Output = Expression;

    fn index(&self, index: usize) -> &Expression {
        &self.items[index]
    }
}

/// Material slot names. Declared in lexicographic order so every ordered map
/// keyed by `Channel` iterates deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Channel {
    BaseColor,
    ClearCoat,
    ClearCoatRoughness,
    EmissiveColor,
    Metallic,
    Normal,
    Opacity,
    Refraction,
    Roughness,
    Specular,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::BaseColor => "BaseColor",
            Channel::ClearCoat => "ClearCoat",
            Channel::ClearCoatRoughness => "ClearCoatRoughness",
            Channel::EmissiveColor => "EmissiveColor",
            Channel::Metallic => "Metallic",
            Channel::Normal => "Normal",
            Channel::Opacity => "Opacity",
            Channel::Refraction => "Refraction",
            Channel::Roughness => "Roughness",
            Channel::Specular => "Specular",
        }
    }
}

/// A BSDF that has not been written to the material yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ShaderAggregate {
    channels: BTreeMap<Channel, ExprRef>,
}

impl ShaderAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: Channel, expr: impl Into<Option<ExprRef>>) -> Self {
        self.set(channel, expr);
        self
    }

    /// Absent expressions leave the channel unset.
    pub fn set(&mut self, channel: Channel, expr: impl Into<Option<ExprRef>>) {
        if let Some(e) = expr.into() {
            self.channels.insert(channel, e);
        }
    }

    pub fn get(&self, channel: Channel) -> Option<ExprRef> {
        self.channels.get(&channel).copied()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = (Channel, ExprRef)> + '_ {
        self.channels.iter().map(|(c, e)| (*c, *e))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<Channel, ExprRef> {
        self.channels
    }
}

/// What resolving a socket produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Value(ExprRef),
    Shader(ShaderAggregate),
}

impl From<ExprRef> for Resolved {
    fn from(e: ExprRef) -> Self {
        Resolved::Value(e)
    }
}

impl From<ShaderAggregate> for Resolved {
    fn from(s: ShaderAggregate) -> Self {
        Resolved::Shader(s)
    }
}

/// A node whose single expression exposes several named outputs.
///
/// `outputs[i]` names output slot `i`; an empty name marks a slot that no
/// socket maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiOutput {
    pub index: usize,
    pub outputs: Vec<&'static str>,
}

impl MultiOutput {
    pub fn new(expr: ExprRef, outputs: &[&'static str]) -> Self {
        Self {
            index: expr.index,
            outputs: outputs.to_vec(),
        }
    }

    /// Exact name lookup. The source tool renamed "Fac" sockets to "Factor";
    /// a request for "Factor" still finds a slot registered as "Fac".
    pub fn select(&self, socket_name: &str) -> Option<ExprRef> {
        let position = if socket_name == "Factor" && self.outputs.contains(&"Fac") {
            self.outputs.iter().position(|n| *n == "Fac")
        } else {
            self.outputs.iter().position(|n| *n == socket_name)
        };
        position.map(|p| ExprRef::new(self.index).with_output(p))
    }
}

/// What a node translator hands back to the resolver.
#[derive(Clone, Debug, PartialEq)]
pub enum Translated {
    Value(ExprRef),
    Multi(MultiOutput),
    Shader(ShaderAggregate),
    Nothing,
}

impl From<ExprRef> for Translated {
    fn from(e: ExprRef) -> Self {
        Translated::Value(e)
    }
}

impl From<Option<ExprRef>> for Translated {
    fn from(e: Option<ExprRef>) -> Self {
        e.map_or(Translated::Nothing, Translated::Value)
    }
}

impl From<ShaderAggregate> for Translated {
    fn from(s: ShaderAggregate) -> Self {
        Translated::Shader(s)
    }
}

impl From<Option<Resolved>> for Translated {
    fn from(r: Option<Resolved>) -> Self {
        match r {
            Some(Resolved::Value(e)) => Translated::Value(e),
            Some(Resolved::Shader(s)) => Translated::Shader(s),
            None => Translated::Nothing,
        }
    }
}

/// Ambient interpretation mode for defaults and textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureContext {
    Bump,
    Normal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BlendMode {
    Opaque,
    Masked,
    Translucent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShadingModel {
    DefaultLit,
    ClearCoat,
}

/// The compiled material handed to the target-format serializer.
#[derive(Clone, Debug, Serialize)]
pub struct MaterialRecord {
    pub name: String,
    pub expressions: ExpressionList,
    pub outputs: BTreeMap<Channel, ExprRef>,
    pub blend_mode: BlendMode,
    pub opacity_mask_clip_value: Option<f32>,
    pub shading_model: ShadingModel,
    pub two_sided: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl MaterialRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expressions: ExpressionList::new(),
            outputs: BTreeMap::new(),
            blend_mode: BlendMode::Opaque,
            opacity_mask_clip_value: None,
            shading_model: ShadingModel::DefaultLit,
            two_sided: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn output(&self, channel: Channel) -> Option<ExprRef> {
        self.outputs.get(&channel).copied()
    }

    /// The expression feeding `channel`, if any.
    pub fn output_expr(&self, channel: Channel) -> Option<&Expression> {
        self.output(channel)
            .and_then(|r| self.expressions.get(r.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_list_indices_are_append_positions() {
        let mut list = ExpressionList::new();
        let a = list.push(Expression::new("Scalar").attr("constant", "1.000000"));
        let b = list.push(Expression::new("Scalar").attr("constant", "2.000000"));
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_eq!(list[1].constant(), Some("2.000000"));
    }

    #[test]
    fn absent_inputs_are_skipped() {
        let e = Expression::new("Multiply")
            .input(0, ExprRef::new(3))
            .input(1, None);
        assert_eq!(e.inputs.len(), 1);
        assert_eq!(e.input_ref("0"), Some(ExprRef::new(3)));
    }

    #[test]
    fn multi_output_selects_slot_by_name() {
        let m = MultiOutput::new(ExprRef::new(7), &["Color", "Fac"]);
        assert_eq!(m.select("Fac"), Some(ExprRef { index: 7, output: 1 }));
        assert_eq!(m.select("Factor"), Some(ExprRef { index: 7, output: 1 }));
        assert_eq!(m.select("Color"), Some(ExprRef { index: 7, output: 0 }));
        assert_eq!(m.select("Alpha"), None);
    }

    #[test]
    fn factor_alias_does_not_generalize() {
        let m = MultiOutput::new(ExprRef::new(2), &["Value", "Color"]);
        assert_eq!(m.select("Val"), None);
        assert_eq!(m.select("Factor"), None);
    }

    #[test]
    fn channels_iterate_lexicographically() {
        let agg = ShaderAggregate::new()
            .with(Channel::Roughness, ExprRef::new(1))
            .with(Channel::BaseColor, ExprRef::new(0))
            .with(Channel::EmissiveColor, None);
        let names: Vec<&str> = agg.channels().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["BaseColor", "Roughness"]);
    }
}
