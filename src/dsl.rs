use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;

/// The read-only export document: every material, node group and image the
/// authoring tool handed over for one export run.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportDSL {
    pub version: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub materials: Vec<MaterialDSL>,
    #[serde(default)]
    pub groups: Vec<GroupDSL>,
    #[serde(default)]
    pub images: Vec<ImageDSL>,
    /// Emit the fallback material for objects without any material slot.
    #[serde(default, rename = "includeDefaultMaterial")]
    pub include_default_material: bool,
    #[serde(default)]
    pub config: Option<ExportConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metadata {
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    Blend,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MaterialDSL {
    pub name: String,
    #[serde(default = "default_true", rename = "useNodes")]
    pub use_nodes: bool,
    #[serde(default, rename = "blendMethod")]
    pub blend_method: BlendMethod,
    #[serde(default = "default_alpha_threshold", rename = "alphaThreshold")]
    pub alpha_threshold: f32,
    #[serde(default, rename = "useBackfaceCulling")]
    pub use_backface_culling: bool,

    // Viewport values used when the material has no node tree.
    #[serde(default = "default_diffuse_color", rename = "diffuseColor")]
    pub diffuse_color: [f32; 4],
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "default_specular", rename = "specularIntensity")]
    pub specular_intensity: f32,

    /// UV layer names of the owning mesh, in layer order.
    #[serde(default, rename = "uvLayers")]
    pub uv_layers: Vec<String>,

    #[serde(default, rename = "nodeTree")]
    pub node_tree: Option<NodeTree>,
}

fn default_true() -> bool {
    true
}

fn default_alpha_threshold() -> f32 {
    0.5
}

fn default_diffuse_color() -> [f32; 4] {
    [0.8, 0.8, 0.8, 1.0]
}

fn default_roughness() -> f32 {
    0.4
}

fn default_specular() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NodeTree {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// A reusable subgraph referenced by `GROUP` nodes through `params.groupId`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GroupDSL {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub tree: NodeTree,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageDSL {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "isData")]
    pub is_data: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub inputs: Vec<Socket>,
    #[serde(default)]
    pub outputs: Vec<Socket>,

    #[serde(default, rename = "textureMapping")]
    pub texture_mapping: Option<TextureMapping>,
    #[serde(default, rename = "colorRamp")]
    pub color_ramp: Option<ColorRampDSL>,
    #[serde(default, rename = "curveMapping")]
    pub curve_mapping: Option<CurveMappingDSL>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketType {
    Value,
    Vector,
    Rgba,
    Shader,
}

/// Literal default stored on a socket. Vectors and colors are told apart by
/// their arity.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum SocketDefault {
    Scalar(f32),
    Vector([f32; 3]),
    Color([f32; 4]),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Socket {
    /// Stable identifier, unique per node side. Links and group bindings use it.
    pub id: String,
    /// Display name. Multi-output lookups use it.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
    #[serde(default)]
    pub default: Option<SocketDefault>,
    /// The node computes this input itself when it is left disconnected
    /// (generated or UV coordinates), so `default` is not a usable literal.
    #[serde(default)]
    pub procedural: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Socket {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

/// The mapping sub-block texture nodes carry next to their vector input.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TextureMapping {
    #[serde(default = "default_axes")]
    pub axes: [String; 3],
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default = "default_vector_type", rename = "vectorType")]
    pub vector_type: String,
}

fn default_axes() -> [String; 3] {
    ["X".to_string(), "Y".to_string(), "Z".to_string()]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_vector_type() -> String {
    "POINT".to_string()
}

impl Default for TextureMapping {
    fn default() -> Self {
        Self {
            axes: default_axes(),
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: default_scale(),
            vector_type: default_vector_type(),
        }
    }
}

impl TextureMapping {
    pub fn has_axis_remap(&self) -> bool {
        self.axes != default_axes()
    }

    pub fn has_transform(&self) -> bool {
        self.translation != [0.0; 3] || self.rotation != [0.0; 3] || self.scale != default_scale()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ColorRampDSL {
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
    pub elements: Vec<ColorRampElement>,
}

fn default_interpolation() -> String {
    "LINEAR".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct ColorRampElement {
    pub position: f32,
    pub color: [f32; 4],
}

/// RGB curves: red, green, blue and the combined curve, each a list of
/// `[x, y]` control points.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct CurveMappingDSL {
    pub curves: [Vec<[f32; 2]>; 4],
}

pub fn load_export_from_path(path: impl AsRef<std::path::Path>) -> Result<ExportDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read export json at {}", path.display()))?;
    parse_export(&text)
}

pub fn parse_export(text: &str) -> Result<ExportDSL> {
    serde_json::from_str(text).context("failed to parse export json")
}

impl ExportDSL {
    pub fn group(&self, id: &str) -> Option<&GroupDSL> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn image(&self, name: &str) -> Option<&ImageDSL> {
        self.images.iter().find(|i| i.name == name)
    }
}

impl NodeTree {
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.name() == name)
    }

    pub fn input_by_id(&self, id: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.id == id)
    }

    pub fn output_by_id(&self, id: &str) -> Option<&Socket> {
        self.outputs.iter().find(|s| s.id == id)
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

pub fn incoming_connection<'a>(
    tree: &'a NodeTree,
    to_node_id: &str,
    to_port_id: &str,
) -> Option<&'a Connection> {
    tree.connections
        .iter()
        .find(|c| c.to.node_id == to_node_id && c.to.port_id == to_port_id)
}

pub fn is_linked(tree: &NodeTree, node_id: &str, port_id: &str) -> bool {
    incoming_connection(tree, node_id, port_id).is_some()
}

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn parse_bool(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}
