//! Non-fatal compile diagnostics.
//!
//! Every diagnostic is logged through the `log` facade and also kept on the
//! material record so callers can inspect what was approximated or dropped.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A socket had neither a link nor a usable default.
    MissingDefault,
    /// No translator exists for a node type.
    UnsupportedNode,
    /// A translator exists but only approximates the source behavior.
    PartialFeature,
    Structural,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn emit_log(&self, material: &str) {
        match self.severity {
            Severity::Warning => log::warn!("[{material}] {}", self.message),
            Severity::Error => log::error!("[{material}] {}", self.message),
        }
    }
}
