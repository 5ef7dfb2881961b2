//! Compilation sessions and entry points
//!
//! A `Session` owns everything shared across compilations: the builtin
//! registry, the parser used by `exec`/`eval` at run time, the generator
//! rewrite strategy, the print sink, and the accumulated diagnostics.
//! `compile_module` produces a `CompiledModule`; evaluating one is
//! idempotent, since each evaluation creates fresh module storage.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use quill_core::{Builtins, Failure, ModuleObj, Value};

use crate::ast::{Expr, Stmt};
use crate::env::ScopeEnv;
use crate::error::{CompileError, CompileResult, ExecError};
use crate::generator::{EagerGenerator, GeneratorRewriter};
use crate::scope;
use crate::storage::{Activation, ModuleGlobals, Signal, StmtCode};
use crate::translate::Translator;

/// The boundary with the parser. `exec` and `eval` call back into it at
/// run time; everything else hands the session an already-parsed tree.
pub trait SourceParser {
    fn parse_module(&self, source: &str) -> Result<Vec<Stmt>, String>;
    fn parse_expr(&self, source: &str) -> Result<Expr, String>;
}

/// Parser assembled from closures, for embedders that already have a
/// front end and for tests with canned sources.
pub struct FnParser {
    pub module: Box<dyn Fn(&str) -> Result<Vec<Stmt>, String>>,
    pub expr: Box<dyn Fn(&str) -> Result<Expr, String>>,
}

impl FnParser {
    /// A parser that rejects every source, for sessions whose input never
    /// uses `exec` or `eval`.
    pub fn unavailable() -> FnParser {
        FnParser {
            module: Box::new(|_| Err("no parser installed".to_string())),
            expr: Box::new(|_| Err("no parser installed".to_string())),
        }
    }
}

impl SourceParser for FnParser {
    fn parse_module(&self, source: &str) -> Result<Vec<Stmt>, String> {
        (self.module)(source)
    }

    fn parse_expr(&self, source: &str) -> Result<Expr, String> {
        (self.expr)(source)
    }
}

pub(crate) struct SessionInner {
    pub(crate) builtins: Rc<Builtins>,
    pub(crate) parser: Box<dyn SourceParser>,
    pub(crate) rewriter: Box<dyn GeneratorRewriter>,
    out: RefCell<Box<dyn Write>>,
    warnings: RefCell<Vec<String>>,
    ignore_assert: Cell<bool>,
}

impl SessionInner {
    pub(crate) fn warn(&self, message: impl Into<String>) {
        self.warnings.borrow_mut().push(message.into());
    }

    /// Write one `print` unit: the rendered text plus a newline, or a
    /// trailing space when the statement ended with a comma.
    pub(crate) fn write_print(&self, text: &str, soft: bool) -> Result<(), Failure> {
        let mut out = self.out.borrow_mut();
        let end = if soft { " " } else { "\n" };
        write!(out, "{}{}", text, end)
            .map_err(|e| Failure::Fault(format!("output write failed: {}", e)))
    }

    /// Consume the one-shot assertion-failure suppression flag.
    pub(crate) fn take_ignore_assert(&self) -> bool {
        self.ignore_assert.replace(false)
    }
}

/// A compilation session.
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    /// Session with the bundled eager generator rewrite, printing to
    /// standard output.
    pub fn new(parser: Box<dyn SourceParser>) -> Session {
        Session::with_parts(parser, Box::new(EagerGenerator), Box::new(io::stdout()))
    }

    pub fn with_parts(
        parser: Box<dyn SourceParser>,
        rewriter: Box<dyn GeneratorRewriter>,
        out: Box<dyn Write>,
    ) -> Session {
        Session {
            inner: Rc::new(SessionInner {
                builtins: Builtins::new(),
                parser,
                rewriter,
                out: RefCell::new(out),
                warnings: RefCell::new(Vec::new()),
                ignore_assert: Cell::new(false),
            }),
        }
    }

    /// Diagnostics accumulated so far, in emission order.
    pub fn warnings(&self) -> Vec<String> {
        self.inner.warnings.borrow().clone()
    }

    /// Suppress the next assertion failure (only). Embedders use this to
    /// resume past a single failing `assert`.
    pub fn ignore_next_assert_failure(&self) {
        self.inner.ignore_assert.set(true);
    }

    /// Compile a parsed module body into its executable form.
    pub fn compile_module(&self, name: &str, body: &[Stmt]) -> CompileResult<CompiledModule> {
        let (_, module_names) = scope::classify_module(body)?;
        let env = ScopeEnv::module(Rc::from(module_names.clone()));
        let code = Translator::new(self.inner.clone()).compile_suite(body, &env)?;
        Ok(CompiledModule {
            name: name.to_string(),
            module_names,
            code,
            sess: self.inner.clone(),
        })
    }

    /// Parse and compile module source through the session's parser.
    pub fn compile_source(&self, name: &str, source: &str) -> CompileResult<CompiledModule> {
        let body = self
            .inner
            .parser
            .parse_module(source)
            .map_err(CompileError::Parse)?;
        self.compile_module(name, &body)
    }
}

/// The executable form of a module.
pub struct CompiledModule {
    name: String,
    module_names: Vec<String>,
    code: StmtCode,
    sess: Rc<SessionInner>,
}

impl CompiledModule {
    /// The statically known module-level names, in slot order.
    pub fn module_names(&self) -> &[String] {
        &self.module_names
    }

    /// Run the module body against fresh storage and return the resulting
    /// module object. Each call starts from a clean slate.
    pub fn evaluate(&self) -> Result<Value, ExecError> {
        let globals = ModuleGlobals::new(&self.name, &self.module_names, self.sess.builtins.clone());
        let mut act = Activation::for_module(globals.clone());
        match (self.code)(&mut act) {
            Ok(()) => {}
            Err(Signal::Raise(raised)) => return Err(ExecError::Uncaught(raised)),
            Err(Signal::Fault(message)) => return Err(ExecError::Fault(message)),
            Err(_) => return Err(ExecError::Fault("control signal escaped a module body".into())),
        }
        Ok(Value::Module(Rc::new(ModuleObj {
            name: self.name.clone(),
            attrs: RefCell::new(globals.snapshot()),
        })))
    }
}

/// Print sink backed by a shared string buffer, for embedders (and tests)
/// that capture everything `print` produces.
#[derive(Clone, Default)]
pub struct SharedOutput {
    buffer: Rc<RefCell<String>>,
}

impl SharedOutput {
    pub fn new() -> SharedOutput {
        SharedOutput::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// A boxed writer appending to the same buffer.
    pub fn sink(&self) -> Box<dyn Write> {
        Box::new(self.clone())
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .borrow_mut()
            .push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
