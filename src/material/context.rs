//! Per-material compile state.
//!
//! Everything that lives for one material compile is an explicit field of
//! [`CompileContext`]. The export-run resources (texture registry and curve
//! atlas) are borrowed from an [`ExportSession`] so they outlive a material.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use super::curve_atlas::CurveAtlas;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::texture_registry::TextureRegistry;
use super::types::{
    Expression, ExpressionList, ExprRef, MultiOutput, Resolved, TextureContext,
};
use super::utils::{push_color, push_scalar, push_vector};
use crate::config::ExportConfig;
use crate::dsl::{ExportDSL, NodeTree};

/// Resources shared by every material of one export run.
#[derive(Debug)]
pub struct ExportSession {
    pub config: ExportConfig,
    pub textures: TextureRegistry,
    pub curves: CurveAtlas,
}

impl ExportSession {
    /// Fails when the configured atlas size is out of range.
    pub fn new(config: ExportConfig) -> Result<Self> {
        let curves = CurveAtlas::new(config.curve_atlas_size)?;
        Ok(Self {
            config,
            textures: TextureRegistry::new(),
            curves,
        })
    }
}

/// What a group instance handed to one of its inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub value: Option<Resolved>,
    pub linked: bool,
}

/// Resolution scope: the tree being walked plus caches private to it.
///
/// The material's own tree is the root scope; every inlined group gets a new
/// one so node ids inside a group never hit the caller's caches.
#[derive(Debug)]
pub struct ScopeFrame<'a> {
    pub tree: &'a NodeTree,
    /// Group instance inputs keyed by socket id. Empty at the root.
    pub bindings: HashMap<String, Binding>,
    outputs: HashMap<(String, String), Option<Resolved>>,
    nodes: HashMap<String, MultiOutput>,
}

impl<'a> ScopeFrame<'a> {
    pub fn root(tree: &'a NodeTree) -> Self {
        Self::with_bindings(tree, HashMap::new())
    }

    pub fn with_bindings(tree: &'a NodeTree, bindings: HashMap<String, Binding>) -> Self {
        Self {
            tree,
            bindings,
            outputs: HashMap::new(),
            nodes: HashMap::new(),
        }
    }
}

pub struct CompileContext<'a> {
    pub doc: &'a ExportDSL,
    pub session: &'a mut ExportSession,
    pub material_name: String,
    pub uv_layers: &'a [String],
    pub expressions: ExpressionList,
    /// Textures sampled under a bump context, routed through a passthrough
    /// wrapper once the surface is compiled.
    pub whitelist: Vec<ExprRef>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set by nodes that only make sense on two-sided geometry.
    pub two_sided_hint: bool,
    scope: ScopeFrame<'a>,
    group_depth: usize,
    texture_contexts: Vec<TextureContext>,
    reported: HashSet<String>,
    depth: usize,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        doc: &'a ExportDSL,
        session: &'a mut ExportSession,
        material_name: impl Into<String>,
        uv_layers: &'a [String],
        tree: &'a NodeTree,
    ) -> Self {
        Self {
            doc,
            session,
            material_name: material_name.into(),
            uv_layers,
            expressions: ExpressionList::new(),
            whitelist: Vec::new(),
            diagnostics: Vec::new(),
            two_sided_hint: false,
            scope: ScopeFrame::root(tree),
            group_depth: 0,
            texture_contexts: Vec::new(),
            reported: HashSet::new(),
            depth: 0,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.session.config
    }

    /// Tree of the innermost active scope.
    pub fn tree(&self) -> &'a NodeTree {
        self.scope.tree
    }

    pub fn group_depth(&self) -> usize {
        self.group_depth
    }

    pub fn binding(&self, socket_id: &str) -> Option<&Binding> {
        self.scope.bindings.get(socket_id)
    }

    /// Run `f` with `frame` as the active scope. The caller's scope is
    /// restored whether or not `f` fails.
    pub fn with_group_scope<T>(
        &mut self,
        frame: ScopeFrame<'a>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let outer = std::mem::replace(&mut self.scope, frame);
        self.group_depth += 1;
        let result = f(self);
        self.group_depth -= 1;
        self.scope = outer;
        result
    }

    pub fn texture_context(&self) -> Option<TextureContext> {
        self.texture_contexts.last().copied()
    }

    /// Run `f` with `mode` pushed on the texture context stack; popped on
    /// every exit path.
    pub fn with_texture_context<T>(
        &mut self,
        mode: TextureContext,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.texture_contexts.push(mode);
        let result = f(self);
        self.texture_contexts.pop();
        result
    }

    pub(crate) fn cached_output(&self, node_id: &str, port_id: &str) -> Option<&Option<Resolved>> {
        self.scope
            .outputs
            .get(&(node_id.to_string(), port_id.to_string()))
    }

    pub(crate) fn cache_output(&mut self, node_id: &str, port_id: &str, value: Option<Resolved>) {
        self.scope
            .outputs
            .insert((node_id.to_string(), port_id.to_string()), value);
    }

    pub(crate) fn cached_node(&self, node_id: &str) -> Option<&MultiOutput> {
        self.scope.nodes.get(node_id)
    }

    pub(crate) fn cache_node(&mut self, node_id: &str, multi: MultiOutput) {
        self.scope.nodes.insert(node_id.to_string(), multi);
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Indentation used by the resolution trace.
    pub(crate) fn trace_prefix(&self) -> String {
        "|   ".repeat(self.depth)
    }

    pub fn push(&mut self, expr: Expression) -> ExprRef {
        self.expressions.push(expr)
    }

    pub fn scalar(&mut self, v: f32) -> ExprRef {
        push_scalar(&mut self.expressions, v)
    }

    pub fn vector(&mut self, v: [f32; 3]) -> ExprRef {
        push_vector(&mut self.expressions, v)
    }

    pub fn color(&mut self, c: [f32; 4]) -> ExprRef {
        push_color(&mut self.expressions, c)
    }

    /// Log and record a warning. With `once`, repeated messages within this
    /// material are dropped.
    pub fn report_warn(&mut self, kind: DiagnosticKind, message: impl Into<String>, once: bool) {
        self.report(Diagnostic::warning(kind, message), once);
    }

    pub fn report_error(&mut self, kind: DiagnosticKind, message: impl Into<String>, once: bool) {
        self.report(Diagnostic::error(kind, message), once);
    }

    fn report(&mut self, diag: Diagnostic, once: bool) {
        if once && !self.reported.insert(diag.message.clone()) {
            return;
        }
        diag.emit_log(&self.material_name);
        self.diagnostics.push(diag);
    }
}
