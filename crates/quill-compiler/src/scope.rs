//! Scope classifier
//!
//! Static pass over one function, class or module body. Runs before that
//! body's translation because the set of true locals must be known before
//! any identifier lookup can be decided.
//!
//! The traversal distinguishes value positions (reads) from target
//! positions (writes). It does not descend into nested function or class
//! bodies, which classify independently; only their decorator, base and
//! default-value expressions belong to the enclosing scope.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{CompClause, Expr, ExceptHandler, FuncDef, Params, Stmt, Target};
use crate::error::{CompileError, CompileResult};

/// Classification of one body: the three disjoint-by-construction sets.
#[derive(Debug, Default)]
pub struct ScopeInfo {
    /// Names assigned anywhere in the body, nested def/class names, and
    /// comprehension/loop targets. For functions, the parameters come
    /// first, in frame order.
    pub locals: Vec<String>,
    /// Names in an explicit `global` statement.
    pub declared_global: FxHashSet<String>,
    /// Names read but never locally assigned nor declared global.
    /// Informational; a module turns these into module names.
    pub free: Vec<String>,
}

/// Classify a function body. `params` is the flattened frame-order
/// parameter name list; parameters are always locals, never free.
pub fn classify_function(params: &[String], body: &[Stmt]) -> CompileResult<ScopeInfo> {
    let mut c = Classifier::new(params, true);
    c.suite(body)?;
    Ok(c.finish())
}

/// Classify a class body. A name may be read from the enclosing scope and
/// then shadowed by a class-namespace write, so the binding-order rule is
/// relaxed here.
pub fn classify_class(body: &[Stmt]) -> CompileResult<ScopeInfo> {
    let mut c = Classifier::new(&[], false);
    c.suite(body)?;
    Ok(c.finish())
}

/// Classify a module body and return both the info and the fixed, ordered
/// module-level name list: the union of locals, declared globals and free
/// names (a module has no enclosing scope, so free references are module
/// references).
pub fn classify_module(body: &[Stmt]) -> CompileResult<(ScopeInfo, Vec<String>)> {
    let mut c = Classifier::new(&[], false);
    c.suite(body)?;
    let info = c.finish();
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();
    for n in info
        .locals
        .iter()
        .chain(info.declared_global.iter())
        .chain(info.free.iter())
    {
        if seen.insert(n.clone()) {
            names.push(n.clone());
        }
    }
    Ok((info, names))
}

struct Classifier {
    params: FxHashSet<String>,
    locals: Vec<String>,
    local_set: FxHashSet<String>,
    globals: FxHashSet<String>,
    free: Vec<String>,
    free_set: FxHashSet<String>,
    /// Function bodies enforce the binding-order rule: a write to a name
    /// already recorded as free is a static error.
    strict: bool,
}

impl Classifier {
    fn new(params: &[String], strict: bool) -> Classifier {
        let mut c = Classifier {
            params: params.iter().cloned().collect(),
            locals: Vec::new(),
            local_set: FxHashSet::default(),
            globals: FxHashSet::default(),
            free: Vec::new(),
            free_set: FxHashSet::default(),
            strict,
        };
        for p in params {
            if c.local_set.insert(p.clone()) {
                c.locals.push(p.clone());
            }
        }
        c
    }

    fn finish(self) -> ScopeInfo {
        ScopeInfo {
            locals: self.locals,
            declared_global: self.globals,
            free: self.free,
        }
    }

    fn read(&mut self, name: &str) {
        if self.local_set.contains(name) || self.globals.contains(name) {
            return;
        }
        if self.free_set.insert(name.to_string()) {
            self.free.push(name.to_string());
        }
    }

    fn bind(&mut self, name: &str) -> CompileResult<()> {
        if self.globals.contains(name) || self.local_set.contains(name) {
            return Ok(());
        }
        if self.free_set.contains(name) {
            if self.strict {
                return Err(CompileError::LocalReferencedBeforeAssignment {
                    name: name.to_string(),
                });
            }
            // Module/class scope: the earlier read referred to the same
            // storage, so the name simply becomes local as well.
        }
        self.local_set.insert(name.to_string());
        self.locals.push(name.to_string());
        Ok(())
    }

    /// Bind the name of a nested `def`/`class`, which is an assignment in
    /// this scope and must not collide with a `global` declaration.
    fn bind_definition(&mut self, name: &str) -> CompileResult<()> {
        if self.globals.contains(name) {
            return Err(CompileError::GlobalConflictsWithDefinition {
                name: name.to_string(),
            });
        }
        self.bind(name)
    }

    fn declare_global(&mut self, name: &str) -> CompileResult<()> {
        if self.params.contains(name) {
            return Err(CompileError::GlobalParameter {
                name: name.to_string(),
            });
        }
        if self.local_set.contains(name) || self.free_set.contains(name) {
            return Err(CompileError::GlobalAfterUse {
                name: name.to_string(),
            });
        }
        self.globals.insert(name.to_string());
        Ok(())
    }

    fn suite(&mut self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expr(e) => self.expr(e),
            Stmt::Assign { targets, value } => {
                self.expr(value)?;
                for t in targets {
                    self.target(t)?;
                }
                Ok(())
            }
            Stmt::AugAssign { target, value, .. } => {
                self.expr(value)?;
                self.target(target)
            }
            Stmt::Del(targets) => {
                for t in targets {
                    self.target(t)?;
                }
                Ok(())
            }
            Stmt::Print { items, dest, .. } => {
                if let Some(d) = dest {
                    self.expr(d)?;
                }
                for item in items {
                    self.expr(item)?;
                }
                Ok(())
            }
            Stmt::If { arms, orelse } => {
                for (test, suite) in arms {
                    self.expr(test)?;
                    self.suite(suite)?;
                }
                self.suite(orelse)
            }
            Stmt::While { test, body, orelse } => {
                self.expr(test)?;
                self.suite(body)?;
                self.suite(orelse)
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.expr(iter)?;
                self.target(target)?;
                self.suite(body)?;
                self.suite(orelse)
            }
            Stmt::Break | Stmt::Continue | Stmt::Pass => Ok(()),
            Stmt::Return(value) => {
                if let Some(v) = value {
                    self.expr(v)?;
                }
                Ok(())
            }
            Stmt::Yield(value) => self.expr(value),
            Stmt::Global(names) => {
                for n in names {
                    self.declare_global(n)?;
                }
                Ok(())
            }
            Stmt::FuncDef(def) => self.funcdef_signature(def),
            Stmt::ClassDef { name, bases, body: _ } => {
                for b in bases {
                    self.expr(b)?;
                }
                self.bind_definition(name)
            }
            Stmt::Raise {
                exc,
                arg,
                traceback,
            } => {
                self.expr(exc)?;
                if let Some(a) = arg {
                    self.expr(a)?;
                }
                if let Some(t) = traceback {
                    self.expr(t)?;
                }
                Ok(())
            }
            Stmt::TryExcept {
                body,
                handlers,
                orelse,
            } => {
                self.suite(body)?;
                for ExceptHandler {
                    types,
                    binding,
                    body,
                } in handlers
                {
                    if let Some(t) = types {
                        self.expr(t)?;
                    }
                    if let Some(b) = binding {
                        self.target(b)?;
                    }
                    self.suite(body)?;
                }
                self.suite(orelse)
            }
            Stmt::TryFinally { body, finalizer } => {
                self.suite(body)?;
                self.suite(finalizer)
            }
            Stmt::Assert { test, message } => {
                self.expr(test)?;
                if let Some(m) = message {
                    self.expr(m)?;
                }
                Ok(())
            }
            Stmt::Exec {
                source,
                globals,
                locals,
            } => {
                self.expr(source)?;
                if let Some(g) = globals {
                    self.expr(g)?;
                }
                if let Some(l) = locals {
                    self.expr(l)?;
                }
                Ok(())
            }
        }
    }

    /// A nested function contributes its name, decorators and default
    /// expressions to the enclosing scope; its body classifies on its own.
    fn funcdef_signature(&mut self, def: &FuncDef) -> CompileResult<()> {
        for d in &def.decorators {
            self.expr(d)?;
        }
        self.params_defaults(&def.params)?;
        self.bind_definition(&def.name)
    }

    fn params_defaults(&mut self, params: &Params) -> CompileResult<()> {
        for (_, default) in &params.keywords {
            self.expr(default)?;
        }
        Ok(())
    }

    fn target(&mut self, target: &Target) -> CompileResult<()> {
        match target {
            Target::Name(n) => self.bind(n),
            Target::Attribute { object, .. } => self.expr(object),
            Target::Subscript { object, index } => {
                self.expr(object)?;
                self.expr(index)
            }
            Target::Tuple(items) => {
                for t in items {
                    self.target(t)?;
                }
                Ok(())
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Name(n) => {
                self.read(n);
                Ok(())
            }
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => Ok(()),
            Expr::Tuple(items) | Expr::List(items) => {
                for e in items {
                    self.expr(e)?;
                }
                Ok(())
            }
            Expr::Dict(pairs) => {
                for (k, v) in pairs {
                    self.expr(k)?;
                    self.expr(v)?;
                }
                Ok(())
            }
            Expr::ListComp { item, clauses } => {
                for CompClause {
                    target,
                    iter,
                    conds,
                } in clauses
                {
                    self.expr(iter)?;
                    self.target(target)?;
                    for c in conds {
                        self.expr(c)?;
                    }
                }
                self.expr(item)
            }
            Expr::Attribute { object, .. } => self.expr(object),
            Expr::Subscript { object, index } => {
                self.expr(object)?;
                self.expr(index)
            }
            Expr::Call {
                callee,
                args,
                keywords,
                star_args,
                star_kwargs,
            } => {
                self.expr(callee)?;
                for a in args {
                    self.expr(a)?;
                }
                for (_, v) in keywords {
                    self.expr(v)?;
                }
                if let Some(s) = star_args {
                    self.expr(s)?;
                }
                if let Some(s) = star_kwargs {
                    self.expr(s)?;
                }
                Ok(())
            }
            Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::BoolOp { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Lambda { params, .. } => self.params_defaults(params),
        }
    }
}

/// Index map over an ordered local name list.
pub fn index_locals(locals: &[String]) -> FxHashMap<String, usize> {
    locals
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect()
}
