//! Node group inlining.
//!
//! A `GROUP` node compiles as if its subgraph were pasted at the call site.
//! The instance's inputs are resolved in the caller's scope first, then the
//! subgraph is walked in a fresh scope whose `GROUP_INPUT` node hands those
//! captured values back out.

use std::collections::HashMap;

use anyhow::Result;

use super::context::{Binding, CompileContext, ScopeFrame};
use super::diagnostics::DiagnosticKind;
use super::error::CompileError;
use super::resolver::resolve;
use super::types::Resolved;
use crate::dsl::{Node, NodeTree, Socket, SocketType, is_linked, parse_bool, parse_str};

/// The `GROUP_OUTPUT` node flagged active, else the first one found.
pub fn active_group_output(tree: &NodeTree) -> Option<&Node> {
    let mut outputs = tree.nodes.iter().filter(|n| n.node_type == "GROUP_OUTPUT");
    let first = outputs.clone().next();
    outputs
        .find(|n| parse_bool(&n.params, "isActiveOutput").unwrap_or(false))
        .or(first)
}

pub fn inline_group(
    ctx: &mut CompileContext<'_>,
    node: &Node,
    output: &Socket,
) -> Result<Option<Resolved>> {
    let group_id = parse_str(&node.params, "groupId").ok_or_else(|| CompileError::MissingNodeData {
        node: node.id.clone(),
        what: "groupId",
    })?;
    let doc = ctx.doc;
    let group = doc.group(group_id).ok_or_else(|| CompileError::MissingGroup {
        node: node.id.clone(),
        group: group_id.to_string(),
    })?;

    let mut bindings = HashMap::new();
    for input in &node.inputs {
        let linked = is_linked(ctx.tree(), &node.id, &input.id);
        let value = resolve(ctx, node, input, true, false)?;
        bindings.insert(input.id.clone(), Binding { value, linked });
    }

    let tree = &group.tree;
    let output_node =
        active_group_output(tree).ok_or_else(|| CompileError::MissingGroupOutput(group.id.clone()))?;
    let inner_socket = output_node
        .input_by_id(&output.id)
        .ok_or_else(|| CompileError::MissingSocket {
            node: output_node.id.clone(),
            socket: output.id.clone(),
        })?;

    log::debug!("{}entering group {}", ctx.trace_prefix(), group.id);
    ctx.with_group_scope(ScopeFrame::with_bindings(tree, bindings), |ctx| {
        resolve(ctx, output_node, inner_socket, false, false)
    })
}

/// Value bound to group input `output` for the inner socket `target`.
///
/// A procedural vector input inside the group (a texture that defaults to
/// its own coordinates) gets nothing when the instance left the matching
/// input unlinked, so the inner node keeps its own default behavior.
pub fn group_input(ctx: &mut CompileContext<'_>, output: &Socket, target: &Socket) -> Option<Resolved> {
    let Some(binding) = ctx.binding(&output.id) else {
        ctx.report_warn(
            DiagnosticKind::MissingDefault,
            format!("group input '{}' has no binding in this scope", output.name()),
            true,
        );
        return None;
    };
    if target.socket_type == SocketType::Vector && target.procedural && !binding.linked {
        return None;
    }
    binding.value.clone()
}
