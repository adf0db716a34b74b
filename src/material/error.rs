use thiserror::Error;

/// Structural failures that abort the material being compiled. Sibling
/// materials are unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("node '{node}' has no input socket '{socket}'")]
    MissingSocket { node: String, socket: String },

    #[error("node not found: {0}")]
    MissingNode(String),

    #[error("{node}: shader operand '{socket}' resolved to nothing")]
    EmptyShaderOperand { node: String, socket: String },

    #[error("node '{node}' ({node_type}) has no output named '{output}'")]
    UnknownOutput {
        node: String,
        node_type: String,
        output: String,
    },

    #[error("group node '{node}' references missing group '{group}'")]
    MissingGroup { node: String, group: String },

    #[error("group '{0}' has no GROUP_OUTPUT node")]
    MissingGroupOutput(String),

    #[error("node '{node}' is missing required data '{what}'")]
    MissingNodeData { node: String, what: &'static str },

    #[error("curve atlas size {size} is out of range (1..={max})")]
    InvalidCurveAtlasSize { size: u32, max: u32 },

    #[error("curve atlas is full ({capacity} rows claimed)")]
    CurveAtlasFull { capacity: u32 },

    #[error("shader output of '{node}' was connected to a value socket")]
    ShaderInValueSocket { node: String },
}
