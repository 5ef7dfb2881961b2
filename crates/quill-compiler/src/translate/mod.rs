//! AST translation
//!
//! Turns statements and expressions into directly executable host
//! closures. Translation walks each node once, decides every name lookup
//! and every static check from the `ScopeEnv` facts, and emits a closure
//! wired to the closures of its children. Running the result needs no
//! further dispatch on the AST.

use std::rc::Rc;

use quill_core::{classes, object, Raised, Value};

use crate::args::BindingSpec;
use crate::ast::{synthetic_param_name, Expr, FuncDef, Param, Params, Stmt, Target};
use crate::env::ScopeEnv;
use crate::error::CompileResult;
use crate::generator::contains_yield;
use crate::resolve;
use crate::scope;
use crate::session::SessionInner;
use crate::storage::{Activation, ExprCode, Signal, StmtCode, StoreCode};

mod expr;
mod stmt;

pub(crate) struct Translator {
    sess: Rc<SessionInner>,
}

impl Translator {
    pub(crate) fn new(sess: Rc<SessionInner>) -> Translator {
        Translator { sess }
    }

    /// Compile a suite into one unit running its statements in order.
    pub(crate) fn compile_suite(&self, body: &[Stmt], env: &ScopeEnv) -> CompileResult<StmtCode> {
        let stmts: Vec<StmtCode> = body
            .iter()
            .map(|s| self.compile_stmt(s, env))
            .collect::<CompileResult<_>>()?;
        Ok(Rc::new(move |act: &mut Activation| {
            for stmt in &stmts {
                stmt(act)?;
            }
            Ok(())
        }))
    }

    /// Compile a store into an assignment target.
    pub(crate) fn compile_store(&self, target: &Target, env: &ScopeEnv) -> CompileResult<StoreCode> {
        match target {
            Target::Name(n) => Ok(resolve::write(n, env)),
            Target::Attribute { object: obj, name } => {
                let obj = self.compile_expr(obj, env)?;
                let name = name.clone();
                Ok(Rc::new(move |act: &mut Activation, value: Value| {
                    let receiver = obj(act)?;
                    object::set_attr(&receiver, &name, value)?;
                    Ok(())
                }))
            }
            Target::Subscript { object: obj, index } => {
                let obj = self.compile_expr(obj, env)?;
                let index = self.compile_expr(index, env)?;
                Ok(Rc::new(move |act: &mut Activation, value: Value| {
                    let receiver = obj(act)?;
                    let key = index(act)?;
                    object::set_item(&receiver, &key, value)?;
                    Ok(())
                }))
            }
            Target::Tuple(items) => {
                let stores: Vec<StoreCode> = items
                    .iter()
                    .map(|t| self.compile_store(t, env))
                    .collect::<CompileResult<_>>()?;
                Ok(Rc::new(move |act: &mut Activation, value: Value| {
                    let mut elements = Vec::with_capacity(stores.len());
                    object::iterate::<Signal>(&value, &mut |v| {
                        elements.push(v);
                        Ok(())
                    })?;
                    if elements.len() != stores.len() {
                        return Err(Signal::Raise(Raised::new(
                            &classes().value_error,
                            format!(
                                "unpack expected {} values, got {}",
                                stores.len(),
                                elements.len()
                            ),
                        )));
                    }
                    for (store, v) in stores.iter().zip(elements) {
                        store(act, v)?;
                    }
                    Ok(())
                }))
            }
        }
    }

    /// Compile a deletion of a target.
    pub(crate) fn compile_delete(&self, target: &Target, env: &ScopeEnv) -> CompileResult<StmtCode> {
        match target {
            Target::Name(n) => Ok(resolve::delete(n, env)),
            Target::Attribute { object: obj, name } => {
                let obj = self.compile_expr(obj, env)?;
                let name = name.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    object::del_attr(&receiver, &name)?;
                    Ok(())
                }))
            }
            Target::Subscript { object: obj, index } => {
                let obj = self.compile_expr(obj, env)?;
                let index = self.compile_expr(index, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    let key = index(act)?;
                    object::del_item(&receiver, &key)?;
                    Ok(())
                }))
            }
            Target::Tuple(items) => {
                let deletes: Vec<StmtCode> = items
                    .iter()
                    .map(|t| self.compile_delete(t, env))
                    .collect::<CompileResult<_>>()?;
                Ok(Rc::new(move |act: &mut Activation| {
                    for del in &deletes {
                        del(act)?;
                    }
                    Ok(())
                }))
            }
        }
    }

    /// Compile a `def` or `lambda` into a closure that, run at definition
    /// time, evaluates the keyword defaults and produces the function
    /// value. The function captures the defining module's storage; its
    /// free names resolve there, never in an enclosing frame.
    pub(crate) fn compile_callable(
        &self,
        name: &str,
        params: &Params,
        body: Vec<Stmt>,
        env: &ScopeEnv,
    ) -> CompileResult<ExprCode> {
        // Tuple-shaped formals receive a synthetic parameter and a
        // destructuring assignment at the head of the body.
        let mut full_body: Vec<Stmt> = Vec::new();
        for (i, p) in params.required.iter().enumerate() {
            if matches!(p, Param::Tuple(_)) {
                full_body.push(Stmt::Assign {
                    targets: vec![param_target(p)],
                    value: Expr::Name(synthetic_param_name(i)),
                });
            }
        }
        full_body.extend(body);

        let full_body = if contains_yield(&full_body) {
            let def = FuncDef {
                name: name.to_string(),
                params: params.clone(),
                body: full_body,
                decorators: Vec::new(),
            };
            self.sess.rewriter.rewrite(&def)?
        } else {
            full_body
        };

        let frame_names = params.frame_names();
        let info = scope::classify_function(&frame_names, &full_body)?;
        let fenv = env.function(&info);
        let body_code = self.compile_suite(&full_body, &fenv)?;

        let spec = Rc::new(BindingSpec {
            function: name.to_string(),
            required: frame_names[..params.required.len()].to_vec(),
            keywords: params.keywords.iter().map(|(n, _)| n.clone()).collect(),
            rest_pos: params.rest_pos.clone(),
            rest_kw: params.rest_kw.clone(),
        });
        let default_codes: Vec<ExprCode> = params
            .keywords
            .iter()
            .map(|(_, d)| self.compile_expr(d, env))
            .collect::<CompileResult<_>>()?;
        let local_names = fenv.local_names.clone();
        let fname = name.to_string();

        Ok(Rc::new(move |act: &mut Activation| {
            let mut defaults = Vec::with_capacity(default_codes.len());
            for code in &default_codes {
                defaults.push(code(act)?);
            }
            let globals = act.globals.clone();
            let spec = spec.clone();
            let body_code = body_code.clone();
            let local_names = local_names.clone();
            Ok(object::make_function(fname.clone(), move |call_args| {
                let mut frame = Activation::with_locals(globals.clone(), local_names.clone());
                crate::args::bind(&spec, &defaults, call_args, &mut frame.locals)?;
                match body_code(&mut frame) {
                    Ok(()) => Ok(Value::None),
                    Err(Signal::Return(v)) => Ok(v),
                    Err(signal) => Err(signal.into_failure()),
                }
            }))
        }))
    }
}

fn param_target(p: &Param) -> Target {
    match p {
        Param::Name(n) => Target::Name(n.clone()),
        Param::Tuple(items) => Target::Tuple(items.iter().map(param_target).collect()),
    }
}
