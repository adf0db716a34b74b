//! Socket resolution: the recursive entry point of the compiler.
//!
//! An input socket resolves either to a synthesized default or to whatever
//! its upstream output produces. Upstream results are memoized per scope,
//! keyed by the output socket, so several inputs fed by one output share a
//! single expression. Type coercion is applied per requesting input, after
//! the cache.

use anyhow::Result;

use super::context::CompileContext;
use super::defaults;
use super::diagnostics::DiagnosticKind;
use super::error::CompileError;
use super::group_inline;
use super::node_compiler::{self, NodeKind};
use super::shader_aggregate;
use super::types::{
    Channel, Expression, ExprRef, Resolved, ShaderAggregate, Translated,
};
use super::utils::content_fn;
use crate::dsl::{Node, Socket, SocketType, incoming_connection};

/// Resolve `socket`, an input of `node`.
///
/// `force_default` makes procedural vector defaults usable as literals.
/// `skip_default_warn` silences the missing-default diagnostic for inputs
/// the caller treats as optional.
pub fn resolve(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    socket: &Socket,
    force_default: bool,
    skip_default_warn: bool,
) -> Result<Option<Resolved>> {
    log::debug!(
        "{}{}:{}/{:?}:{}",
        ctx.trace_prefix(),
        node.node_type,
        node.display_name(),
        socket.socket_type,
        socket.name()
    );

    let tree = ctx.tree();
    let upstream = match incoming_connection(tree, &node.id, &socket.id) {
        Some(link) => {
            let from_node = tree
                .node(&link.from.node_id)
                .ok_or_else(|| CompileError::MissingNode(link.from.node_id.clone()))?;
            let from_socket = from_node.output_by_id(&link.from.port_id).ok_or_else(|| {
                CompileError::UnknownOutput {
                    node: from_node.id.clone(),
                    node_type: from_node.node_type.clone(),
                    output: link.from.port_id.clone(),
                }
            })?;
            from_socket.enabled.then_some((from_node, from_socket))
        }
        None => None,
    };

    let Some((from_node, from_socket)) = upstream else {
        return Ok(defaults::socket_default(
            ctx,
            node,
            socket,
            force_default,
            skip_default_warn,
        ));
    };

    let produced = match ctx.cached_output(&from_node.id, &from_socket.id) {
        Some(hit) => hit.clone(),
        None => {
            ctx.enter();
            let result = resolve_output(ctx, from_node, from_socket, socket);
            ctx.leave();
            let result = result?;
            // Group inputs depend on the requesting socket, so they stay uncached.
            if from_node.node_type != "GROUP_INPUT" {
                ctx.cache_output(&from_node.id, &from_socket.id, result.clone());
            }
            result
        }
    };

    coerce(ctx, produced, from_node, from_socket.socket_type, socket.socket_type)
}

/// Resolve an input expected to carry a value rather than a shader.
pub fn value_of(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    socket: &Socket,
    force_default: bool,
    skip_default_warn: bool,
) -> Result<Option<ExprRef>> {
    match resolve(ctx, node, socket, force_default, skip_default_warn)? {
        Some(Resolved::Value(e)) => Ok(Some(e)),
        Some(Resolved::Shader(_)) => Err(CompileError::ShaderInValueSocket {
            node: node.id.clone(),
        }
        .into()),
        None => Ok(None),
    }
}

pub fn input_socket<'n>(node: &'n Node, name: &str) -> Result<&'n Socket> {
    node.input(name).ok_or_else(|| {
        CompileError::MissingSocket {
            node: node.id.clone(),
            socket: name.to_string(),
        }
        .into()
    })
}

pub fn input_socket_at(node: &Node, index: usize) -> Result<&Socket> {
    node.inputs.get(index).ok_or_else(|| {
        CompileError::MissingSocket {
            node: node.id.clone(),
            socket: format!("#{index}"),
        }
        .into()
    })
}

/// First input among `names` that exists on the node. Covers sockets the
/// source tool renamed between versions.
pub fn input_socket_any<'n>(node: &'n Node, names: &[&str]) -> Result<&'n Socket> {
    names
        .iter()
        .find_map(|n| node.input(n))
        .ok_or_else(|| {
            CompileError::MissingSocket {
                node: node.id.clone(),
                socket: names.join("|"),
            }
            .into()
        })
}

/// Value of the input called `name`.
pub fn input(ctx: &mut CompileContext<'_>, node: &Node, name: &str) -> Result<Option<ExprRef>> {
    let socket = input_socket(node, name)?;
    value_of(ctx, node, socket, false, false)
}

pub fn input_with(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    name: &str,
    force_default: bool,
    skip_default_warn: bool,
) -> Result<Option<ExprRef>> {
    let socket = input_socket(node, name)?;
    value_of(ctx, node, socket, force_default, skip_default_warn)
}

/// Value of the input at position `index`.
pub fn input_at(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    index: usize,
    force_default: bool,
) -> Result<Option<ExprRef>> {
    let socket = input_socket_at(node, index)?;
    value_of(ctx, node, socket, force_default, false)
}

/// Shader bundle arriving at input `index`.
pub fn shader_at(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    index: usize,
) -> Result<Option<ShaderAggregate>> {
    let socket = input_socket_at(node, index)?;
    Ok(match resolve(ctx, node, socket, false, false)? {
        Some(Resolved::Shader(s)) => Some(s),
        Some(Resolved::Value(_)) | None => None,
    })
}

/// Produce the value of output `output` of `node`, as requested by the input
/// socket `target` downstream.
fn resolve_output(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
    target: &Socket,
) -> Result<Option<Resolved>> {
    if let Some(cached) = ctx.cached_node(&node.id) {
        return select_output(node, cached.select(output.name()), output).map(Some);
    }

    let kind = NodeKind::from_tag(&node.node_type);
    match kind {
        NodeKind::Group => group_inline::inline_group(ctx, node, output),
        NodeKind::GroupInput => Ok(group_inline::group_input(ctx, output, target)),
        NodeKind::Reroute => {
            let socket = input_socket(node, "Input")?;
            resolve(ctx, node, socket, false, false)
        }
        NodeKind::AddShader => Ok(Some(shader_aggregate::add_shader(ctx, node)?.into())),
        NodeKind::MixShader => Ok(Some(shader_aggregate::mix_shader(ctx, node)?.into())),
        NodeKind::Unsupported(tag) => {
            ctx.report_error(
                DiagnosticKind::UnsupportedNode,
                format!("Node {}:{} not handled", tag, output.name()),
                false,
            );
            Ok(Some(ctx.scalar(0.0).into()))
        }
        kind => match node_compiler::translate(ctx, &kind, node, output)? {
            Translated::Value(e) => Ok(Some(e.into())),
            Translated::Shader(s) => Ok(Some(s.into())),
            Translated::Multi(multi) => {
                let selected = multi.select(output.name());
                ctx.cache_node(&node.id, multi);
                select_output(node, selected, output).map(Some)
            }
            Translated::Nothing => Ok(None),
        },
    }
}

fn select_output(node: &Node, selected: Option<ExprRef>, output: &Socket) -> Result<Resolved> {
    selected.map(Resolved::Value).ok_or_else(|| {
        CompileError::UnknownOutput {
            node: node.id.clone(),
            node_type: node.node_type.clone(),
            output: output.name().to_string(),
        }
        .into()
    })
}

/// Adapt a produced value to the socket type of the input that asked for it.
fn coerce(
    ctx: &mut CompileContext<'_>,
    produced: Option<Resolved>,
    producer: &Node,
    from: SocketType,
    to: SocketType,
) -> Result<Option<Resolved>> {
    let Some(produced) = produced else {
        return Ok(None);
    };
    let value = match (produced, to) {
        (Resolved::Shader(s), SocketType::Shader) => return Ok(Some(Resolved::Shader(s))),
        (Resolved::Shader(_), _) => {
            return Err(CompileError::ShaderInValueSocket {
                node: producer.id.clone(),
            }
            .into());
        }
        (Resolved::Value(e), _) => e,
    };

    let coerced = match (from, to) {
        (SocketType::Rgba | SocketType::Vector, SocketType::Value) => {
            let third = ctx.vector([0.333333; 3]);
            ctx.push(Expression::new("DotProduct").input(0, value).input(1, third))
        }
        (SocketType::Rgba, SocketType::Vector) => ctx.push(
            Expression::new("ComponentMask")
                .attr("R", "True")
                .attr("G", "True")
                .attr("B", "True")
                .input(0, value),
        ),
        (SocketType::Vector, SocketType::Rgba) => {
            let alpha = ctx.scalar(1.0);
            ctx.push(Expression::new("AppendVector").input(0, value).input(1, alpha))
        }
        (SocketType::Value, SocketType::Rgba) => ctx.push(
            Expression::function_call(content_fn("CombineRGB"))
                .input(0, value)
                .input(1, value)
                .input(2, value),
        ),
        (_, SocketType::Shader) => {
            let black = ctx.color([0.0, 0.0, 0.0, 1.0]);
            let wrapped = ShaderAggregate::new()
                .with(Channel::BaseColor, black)
                .with(Channel::EmissiveColor, value);
            return Ok(Some(wrapped.into()));
        }
        _ => value,
    };
    Ok(Some(coerced.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::test_utils::{
        color_in, color_out, empty_doc, link, node, shader_in, tree, value_in, value_out,
        vector_in, vector_out, with_ctx, with_param,
    };
    use serde_json::json;

    fn rgb(id: &str) -> Node {
        let mut n = node(id, "RGB", vec![], vec![color_out("Color")]);
        n.outputs[0].default = Some(crate::dsl::SocketDefault::Color([0.1, 0.2, 0.3, 1.0]));
        n
    }

    #[test]
    fn unconnected_scalar_emits_one_constant() {
        let n = node("m", "MATH", vec![value_in("Value", 0.5)], vec![value_out("Value")]);
        let t = tree(vec![n.clone()], vec![]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &n, "Value").unwrap();
            assert_eq!(r, Some(ExprRef::new(0)));
            assert_eq!(ctx.expressions.len(), 1);
            assert_eq!(ctx.expressions[0].constant(), Some("0.500000"));
        });
    }

    #[test]
    fn shared_upstream_output_is_emitted_once() {
        let consumer = node(
            "mix",
            "MIX_RGB",
            vec![color_in("Color1", [0.0; 4]), color_in("Color2", [0.0; 4])],
            vec![color_out("Color")],
        );
        let t = tree(
            vec![rgb("rgb"), consumer.clone()],
            vec![
                link("rgb", "Color", "mix", "Color1"),
                link("rgb", "Color", "mix", "Color2"),
            ],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let a = input(ctx, &consumer, "Color1").unwrap();
            let b = input(ctx, &consumer, "Color2").unwrap();
            assert_eq!(a, b);
            assert_eq!(ctx.expressions.count_kind("Color"), 1);
        });
    }

    #[test]
    fn resolution_is_idempotent() {
        let consumer = node("m", "MATH", vec![value_in("Value", 0.0)], vec![value_out("Value")]);
        let t = tree(
            vec![
                with_param(
                    node("v", "VALUE", vec![], vec![value_out("Value")]),
                    "value",
                    json!(2.0),
                ),
                consumer.clone(),
            ],
            vec![link("v", "Value", "m", "Value")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let first = input(ctx, &consumer, "Value").unwrap();
            let len = ctx.expressions.len();
            let second = input(ctx, &consumer, "Value").unwrap();
            assert_eq!(first, second);
            assert_eq!(ctx.expressions.len(), len);
        });
    }

    #[test]
    fn color_into_scalar_is_averaged() {
        let consumer = node("m", "MATH", vec![value_in("Value", 0.0)], vec![value_out("Value")]);
        let t = tree(
            vec![rgb("rgb"), consumer.clone()],
            vec![link("rgb", "Color", "m", "Value")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &consumer, "Value").unwrap().unwrap();
            let dot = &ctx.expressions[r.index];
            assert_eq!(dot.kind, "DotProduct");
            let weights = dot.input_ref("1").unwrap();
            assert_eq!(
                ctx.expressions[weights.index].constant(),
                Some("(R=0.333333,G=0.333333,B=0.333333,A=1.000000)")
            );
        });
    }

    #[test]
    fn color_into_vector_drops_alpha() {
        let consumer = node("n", "NORMALIZE", vec![vector_in("Vector", [0.0; 3])], vec![]);
        let t = tree(
            vec![rgb("rgb"), consumer.clone()],
            vec![link("rgb", "Color", "n", "Vector")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &consumer, "Vector").unwrap().unwrap();
            let mask = &ctx.expressions[r.index];
            assert_eq!(mask.kind, "ComponentMask");
            assert_eq!(mask.attributes.get("B").map(String::as_str), Some("True"));
            assert!(!mask.attributes.contains_key("A"));
        });
    }

    #[test]
    fn vector_into_color_appends_alpha() {
        let consumer = node("c", "INVERT", vec![color_in("Color", [0.0; 4])], vec![]);
        let producer = node("sep", "COMBXYZ", vec![value_in("X", 1.0), value_in("Y", 0.0), value_in("Z", 0.0)], vec![vector_out("Vector")]);
        let t = tree(
            vec![producer, consumer.clone()],
            vec![link("sep", "Vector", "c", "Color")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &consumer, "Color").unwrap().unwrap();
            let append = &ctx.expressions[r.index];
            assert_eq!(append.kind, "AppendVector");
            let alpha = append.input_ref("1").unwrap();
            assert_eq!(ctx.expressions[alpha.index].constant(), Some("1.000000"));
        });
    }

    #[test]
    fn scalar_round_trip_through_color() {
        // Scalar -> Color broadcast -> Scalar average.
        let to_color = node("inv", "INVERT", vec![value_in("Fac", 0.0), color_in("Color", [0.0; 4])], vec![color_out("Color")]);
        let back = node("m", "MATH", vec![value_in("Value", 0.0)], vec![value_out("Value")]);
        let t = tree(
            vec![
                with_param(node("v", "VALUE", vec![], vec![value_out("Value")]), "value", json!(0.25)),
                to_color.clone(),
                back.clone(),
            ],
            vec![link("v", "Value", "inv", "Color")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let color = input(ctx, &to_color, "Color").unwrap().unwrap();
            let combine = &ctx.expressions[color.index];
            assert_eq!(combine.function(), Some(content_fn("CombineRGB").as_str()));
            let s = combine.input_ref("0").unwrap();
            assert_eq!(combine.input_ref("1"), Some(s));
            assert_eq!(combine.input_ref("2"), Some(s));
            assert_eq!(ctx.expressions[s.index].constant(), Some("0.250000"));
        });
    }

    #[test]
    fn value_into_shader_becomes_emissive() {
        let out = node("out", "OUTPUT_MATERIAL", vec![shader_in("Surface")], vec![]);
        let t = tree(
            vec![rgb("rgb"), out.clone()],
            vec![link("rgb", "Color", "out", "Surface")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = resolve(ctx, &out, &out.inputs[0], false, false).unwrap();
            let Some(Resolved::Shader(s)) = r else {
                panic!("expected shader");
            };
            assert!(s.contains(Channel::BaseColor));
            assert!(s.contains(Channel::EmissiveColor));
            assert_eq!(s.len(), 2);
        });
    }

    #[test]
    fn unsupported_nodes_degrade_to_zero() {
        let consumer = node("m", "MATH", vec![value_in("Value", 0.0)], vec![value_out("Value")]);
        let t = tree(
            vec![
                node("x", "SCRIPT", vec![], vec![value_out("Value")]),
                consumer.clone(),
            ],
            vec![link("x", "Value", "m", "Value")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &consumer, "Value").unwrap().unwrap();
            assert_eq!(ctx.expressions[r.index].constant(), Some("0.000000"));
            assert_eq!(ctx.diagnostics[0].kind, DiagnosticKind::UnsupportedNode);
            assert_eq!(ctx.diagnostics[0].message, "Node SCRIPT:Value not handled");
        });
    }

    #[test]
    fn disabled_upstream_socket_falls_back_to_default() {
        let consumer = node("m", "MATH", vec![value_in("Value", 0.75)], vec![value_out("Value")]);
        let mut producer = node("v", "VALUE", vec![], vec![value_out("Value")]);
        producer.outputs[0].enabled = false;
        let t = tree(vec![producer, consumer.clone()], vec![link("v", "Value", "m", "Value")]);
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let r = input(ctx, &consumer, "Value").unwrap().unwrap();
            assert_eq!(ctx.expressions[r.index].constant(), Some("0.750000"));
        });
    }

    #[test]
    fn multi_output_nodes_reuse_their_expression() {
        let consumer = node(
            "m",
            "MATH",
            vec![value_in("A", 0.0), value_in("B", 0.0)],
            vec![value_out("Value")],
        );
        let sep = node(
            "sep",
            "SEPXYZ",
            vec![vector_in("Vector", [1.0, 2.0, 3.0])],
            vec![value_out("X"), value_out("Y"), value_out("Z")],
        );
        let t = tree(
            vec![sep, consumer.clone()],
            vec![link("sep", "X", "m", "A"), link("sep", "Z", "m", "B")],
        );
        let doc = empty_doc();
        with_ctx(&doc, &t, |ctx| {
            let a = input(ctx, &consumer, "A").unwrap().unwrap();
            let b = input(ctx, &consumer, "B").unwrap().unwrap();
            assert_eq!(a.index, b.index);
            assert_eq!(a.output, 0);
            assert_eq!(b.output, 2);
        });
    }
}
