//! Builders for unit tests.
//!
//! Sockets built here use their display name as id, so links and lookups in
//! tests can refer to sockets by name.

use std::collections::HashMap;

use crate::config::ExportConfig;
use crate::dsl::{
    Connection, Endpoint, ExportDSL, GroupDSL, MaterialDSL, Metadata, Node, NodeTree, Socket,
    SocketDefault, SocketType,
};

use super::context::{CompileContext, ExportSession};

pub fn node(id: &str, node_type: &str, inputs: Vec<Socket>, outputs: Vec<Socket>) -> Node {
    Node {
        id: id.to_string(),
        node_type: node_type.to_string(),
        label: None,
        params: HashMap::new(),
        inputs,
        outputs,
        texture_mapping: None,
        color_ramp: None,
        curve_mapping: None,
    }
}

pub fn with_param(mut n: Node, key: &str, value: serde_json::Value) -> Node {
    n.params.insert(key.to_string(), value);
    n
}

fn socket(name: &str, socket_type: SocketType, default: Option<SocketDefault>) -> Socket {
    Socket {
        id: name.to_string(),
        name: None,
        socket_type,
        default,
        procedural: false,
        enabled: true,
    }
}

pub fn value_in(name: &str, default: f32) -> Socket {
    socket(name, SocketType::Value, Some(SocketDefault::Scalar(default)))
}

pub fn color_in(name: &str, default: [f32; 4]) -> Socket {
    socket(name, SocketType::Rgba, Some(SocketDefault::Color(default)))
}

pub fn vector_in(name: &str, default: [f32; 3]) -> Socket {
    socket(name, SocketType::Vector, Some(SocketDefault::Vector(default)))
}

/// A vector input the node fills in itself when left disconnected.
pub fn procedural_vector_in(name: &str) -> Socket {
    Socket {
        procedural: true,
        ..socket(name, SocketType::Vector, Some(SocketDefault::Vector([0.0; 3])))
    }
}

pub fn shader_in(name: &str) -> Socket {
    socket(name, SocketType::Shader, None)
}

/// Shader inputs that share a display name need distinct ids.
pub fn shader_in_id(id: &str, name: &str) -> Socket {
    Socket {
        name: Some(name.to_string()),
        ..socket(id, SocketType::Shader, None)
    }
}

pub fn value_out(name: &str) -> Socket {
    socket(name, SocketType::Value, None)
}

pub fn color_out(name: &str) -> Socket {
    socket(name, SocketType::Rgba, None)
}

pub fn vector_out(name: &str) -> Socket {
    socket(name, SocketType::Vector, None)
}

pub fn shader_out(name: &str) -> Socket {
    socket(name, SocketType::Shader, None)
}

pub fn link(from_node: &str, from_port: &str, to_node: &str, to_port: &str) -> Connection {
    Connection {
        id: format!("{from_node}.{from_port}->{to_node}.{to_port}"),
        from: Endpoint {
            node_id: from_node.to_string(),
            port_id: from_port.to_string(),
        },
        to: Endpoint {
            node_id: to_node.to_string(),
            port_id: to_port.to_string(),
        },
    }
}

pub fn tree(nodes: Vec<Node>, connections: Vec<Connection>) -> NodeTree {
    NodeTree { nodes, connections }
}

pub fn group(id: &str, tree: NodeTree) -> GroupDSL {
    GroupDSL {
        id: id.to_string(),
        name: Some(id.to_string()),
        tree,
    }
}

pub fn empty_doc() -> ExportDSL {
    ExportDSL {
        version: "1.0".to_string(),
        metadata: Metadata {
            name: "test".to_string(),
            created: None,
            modified: None,
        },
        materials: Vec::new(),
        groups: Vec::new(),
        images: Vec::new(),
        include_default_material: false,
        config: None,
    }
}

pub fn material(name: &str, tree: NodeTree) -> MaterialDSL {
    let mut m: MaterialDSL = serde_json::from_value(serde_json::json!({ "name": name }))
        .expect("minimal material json");
    m.node_tree = Some(tree);
    m
}

/// Active material output node targeting every renderer.
pub fn output_node(id: &str) -> Node {
    with_param(
        with_param(
            node(
                id,
                "OUTPUT_MATERIAL",
                vec![shader_in("Surface"), shader_in("Volume")],
                vec![],
            ),
            "target",
            serde_json::json!("ALL"),
        ),
        "isActiveOutput",
        serde_json::json!(true),
    )
}

/// Run `f` against a fresh compile context rooted at `tree`.
pub fn with_ctx<T>(
    doc: &ExportDSL,
    tree: &NodeTree,
    f: impl FnOnce(&mut CompileContext<'_>) -> T,
) -> T {
    with_ctx_config(doc, tree, ExportConfig::default(), f)
}

pub fn with_ctx_config<T>(
    doc: &ExportDSL,
    tree: &NodeTree,
    config: ExportConfig,
    f: impl FnOnce(&mut CompileContext<'_>) -> T,
) -> T {
    let mut session = ExportSession::new(config).expect("valid test config");
    let mut ctx = CompileContext::new(doc, &mut session, "TestMaterial", &[], tree);
    f(&mut ctx)
}
