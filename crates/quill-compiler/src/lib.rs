//! Quill Compiler Core
//!
//! Compiles a parsed module tree directly to executable form: every
//! statement and expression becomes a host closure wired to the closures
//! of its children, so running a module is plain closure invocation with
//! no interpreter loop in between.
//!
//! Name resolution is static. A scope classifier decides, per occurrence,
//! whether an identifier is a fixed module slot, a dynamic module name, a
//! lexical local frame slot or a class-namespace entry; the decision is
//! baked into the emitted closure. Non-local control (`return`, `break`,
//! `continue`, exceptions) travels as the `Err` channel of every compiled
//! closure.
//!
//! The crate is parser-agnostic: callers hand `Session::compile_module` an
//! already-parsed [`ast`] tree, and install a [`SourceParser`] so `exec`
//! and `eval` can compile source at run time.

#![warn(rust_2018_idioms)]

pub mod args;
pub mod ast;
pub mod env;
pub mod error;
pub mod generator;
pub mod resolve;
pub mod scope;
pub mod session;
pub mod storage;
mod translate;

pub use error::{CompileError, CompileResult, ExecError};
pub use generator::{contains_yield, EagerGenerator, GeneratorRewriter};
pub use session::{CompiledModule, FnParser, Session, SharedOutput, SourceParser};
pub use storage::{Activation, ModuleGlobals, Signal};

pub use quill_core::{Builtins, Failure, Raised, Value};
