//! Compilation and evaluation errors

use thiserror::Error;

use quill_core::Raised;

pub type CompileResult<T> = Result<T, CompileError>;

/// Static errors, detected during translation. These are fatal to the
/// compilation of the enclosing unit; no partial compiled unit is produced
/// for the construct that triggered them.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("'break' outside loop")]
    BreakOutsideLoop,

    #[error("'continue' outside loop")]
    ContinueOutsideLoop,

    #[error("'return' outside function")]
    ReturnOutsideFunction,

    #[error("'yield' outside function")]
    YieldOutsideFunction,

    #[error("'return' with a value inside a generator")]
    ReturnValueInGenerator,

    #[error("augmented assignment to multiple targets")]
    AugmentedAssignToTuple,

    #[error("local variable '{name}' referenced before assignment")]
    LocalReferencedBeforeAssignment { name: String },

    #[error("name '{name}' is a parameter and declared global")]
    GlobalParameter { name: String },

    #[error("name '{name}' is declared global after use")]
    GlobalAfterUse { name: String },

    #[error("name '{name}' is declared global and defined locally")]
    GlobalConflictsWithDefinition { name: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("internal compiler error: {0}")]
    Internal(String),
}

/// Errors surfaced by the entry points when evaluating compiled code.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A language-level exception propagated out of the outermost frame.
    #[error("uncaught {0}")]
    Uncaught(Raised),

    /// An internal host fault. Cleanup blocks have run; the condition is a
    /// defect, not a user-facing error.
    #[error("internal fault: {0}")]
    Fault(String),
}
