//! Generator rewriting
//!
//! A function body containing `yield` is rewritten, AST to AST, before
//! classification and translation. The rewrite strategy is pluggable so a
//! lazy implementation can replace the bundled eager one without touching
//! the translator.

use crate::ast::{Expr, FuncDef, Stmt, Target};
use crate::error::CompileError;

/// Hidden accumulator local. The leading dot keeps it out of reach of
/// source-level identifiers.
const YIELDS: &str = ".yields";

/// Whether a suite yields directly. Nested function and lambda bodies are
/// their own generators (or not); their yields do not count here.
pub fn contains_yield(body: &[Stmt]) -> bool {
    body.iter().any(stmt_yields)
}

fn stmt_yields(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Yield(_) => true,
        Stmt::If { arms, orelse } => {
            arms.iter().any(|(_, suite)| contains_yield(suite)) || contains_yield(orelse)
        }
        Stmt::While { body, orelse, .. } | Stmt::For { body, orelse, .. } => {
            contains_yield(body) || contains_yield(orelse)
        }
        Stmt::TryExcept {
            body,
            handlers,
            orelse,
        } => {
            contains_yield(body)
                || handlers.iter().any(|h| contains_yield(&h.body))
                || contains_yield(orelse)
        }
        Stmt::TryFinally { body, finalizer } => contains_yield(body) || contains_yield(finalizer),
        _ => false,
    }
}

/// A strategy turning a yielding body into a plain one.
pub trait GeneratorRewriter {
    fn rewrite(&self, func: &FuncDef) -> Result<Vec<Stmt>, CompileError>;
}

/// The bundled strategy: run the body eagerly, collecting every yielded
/// value into a hidden list, and return the list. Callers iterate the
/// result as they would any sequence. `return` inside the body finishes
/// the collection early.
pub struct EagerGenerator;

impl GeneratorRewriter for EagerGenerator {
    fn rewrite(&self, func: &FuncDef) -> Result<Vec<Stmt>, CompileError> {
        let mut out = Vec::with_capacity(func.body.len() + 2);
        out.push(Stmt::Assign {
            targets: vec![Target::Name(YIELDS.to_string())],
            value: Expr::List(Vec::new()),
        });
        for stmt in &func.body {
            out.push(rewrite_stmt(stmt)?);
        }
        out.push(return_yields());
        Ok(out)
    }
}

fn return_yields() -> Stmt {
    Stmt::Return(Some(Expr::Name(YIELDS.to_string())))
}

fn rewrite_suite(suite: &[Stmt]) -> Result<Vec<Stmt>, CompileError> {
    suite.iter().map(rewrite_stmt).collect()
}

fn rewrite_stmt(stmt: &Stmt) -> Result<Stmt, CompileError> {
    Ok(match stmt {
        Stmt::Yield(value) => Stmt::AugAssign {
            target: Target::Name(YIELDS.to_string()),
            op: crate::ast::BinOp::Add,
            value: Expr::List(vec![value.clone()]),
        },
        // A generator's `return` must be bare; it ends the collection.
        Stmt::Return(Some(_)) => return Err(CompileError::ReturnValueInGenerator),
        Stmt::Return(None) => return_yields(),
        Stmt::If { arms, orelse } => Stmt::If {
            arms: arms
                .iter()
                .map(|(test, suite)| Ok((test.clone(), rewrite_suite(suite)?)))
                .collect::<Result<_, CompileError>>()?,
            orelse: rewrite_suite(orelse)?,
        },
        Stmt::While { test, body, orelse } => Stmt::While {
            test: test.clone(),
            body: rewrite_suite(body)?,
            orelse: rewrite_suite(orelse)?,
        },
        Stmt::For {
            target,
            iter,
            body,
            orelse,
        } => Stmt::For {
            target: target.clone(),
            iter: iter.clone(),
            body: rewrite_suite(body)?,
            orelse: rewrite_suite(orelse)?,
        },
        Stmt::TryExcept {
            body,
            handlers,
            orelse,
        } => Stmt::TryExcept {
            body: rewrite_suite(body)?,
            handlers: handlers
                .iter()
                .map(|h| {
                    Ok(crate::ast::ExceptHandler {
                        types: h.types.clone(),
                        binding: h.binding.clone(),
                        body: rewrite_suite(&h.body)?,
                    })
                })
                .collect::<Result<_, CompileError>>()?,
            orelse: rewrite_suite(orelse)?,
        },
        Stmt::TryFinally { body, finalizer } => Stmt::TryFinally {
            body: rewrite_suite(body)?,
            finalizer: rewrite_suite(finalizer)?,
        },
        // Nested definitions keep their own bodies untouched.
        other => other.clone(),
    })
}
