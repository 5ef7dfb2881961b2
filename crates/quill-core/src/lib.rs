//! Quill Core Runtime
//!
//! This crate provides the runtime surface compiled Quill code executes
//! against:
//! - Value representation and the object model protocols
//! - Exception class hierarchy and the propagation value
//! - Builtin function/type registry
//!
//! The compiler core (`quill-compiler`) consumes these as its external
//! collaborators; nothing here knows about ASTs or scopes.

#![warn(rust_2018_idioms)]

pub mod builtins;
pub mod exceptions;
pub mod object;
pub mod value;

pub use builtins::Builtins;
pub use exceptions::{classes, throw, CallResult, ExceptionSet, Failure, Raised};
pub use value::{
    collect_positional, BuiltinObj, CallArgs, CallFn, ClassObj, DictKey, FunctionObj, InstanceObj,
    ModuleObj, Namespace, Value,
};
