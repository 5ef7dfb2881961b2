//! Expression translation.

use std::rc::Rc;

use quill_core::{classes, object, throw, CallArgs, Value};

use crate::ast::{BoolOpKind, CompClause, Expr, Stmt};
use crate::env::{ContextKind, ScopeEnv};
use crate::error::CompileResult;
use crate::resolve;
use crate::session::SessionInner;
use crate::storage::{
    namespace_to_dict, Activation, ExprCode, ModuleGlobals, Signal, StoreCode,
};
use crate::translate::stmt::{dict_to_namespace, syntax_error};
use crate::translate::Translator;

impl Translator {
    pub(crate) fn compile_expr(&self, expr: &Expr, env: &ScopeEnv) -> CompileResult<ExprCode> {
        match expr {
            Expr::Name(n) => Ok(resolve::read(n, env)),

            Expr::Int(i) => {
                let i = *i;
                Ok(Rc::new(move |_: &mut Activation| Ok(Value::Int(i))))
            }
            Expr::Float(f) => {
                let f = *f;
                Ok(Rc::new(move |_: &mut Activation| Ok(Value::Float(f))))
            }
            Expr::Str(s) => {
                let v = Value::str(s.clone());
                Ok(Rc::new(move |_: &mut Activation| Ok(v.clone())))
            }

            Expr::Tuple(items) => {
                let items = self.compile_all(items, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut values = Vec::with_capacity(items.len());
                    for item in &items {
                        values.push(item(act)?);
                    }
                    Ok(Value::tuple(values))
                }))
            }

            Expr::List(items) => {
                let items = self.compile_all(items, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut values = Vec::with_capacity(items.len());
                    for item in &items {
                        values.push(item(act)?);
                    }
                    Ok(Value::list(values))
                }))
            }

            Expr::Dict(pairs) => {
                let pairs: Vec<(ExprCode, ExprCode)> = pairs
                    .iter()
                    .map(|(k, v)| Ok((self.compile_expr(k, env)?, self.compile_expr(v, env)?)))
                    .collect::<CompileResult<_>>()?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut values = Vec::with_capacity(pairs.len());
                    for (k, v) in &pairs {
                        values.push((k(act)?, v(act)?));
                    }
                    Ok(object::make_dict(values)?)
                }))
            }

            Expr::ListComp { item, clauses } => {
                let clauses: Vec<ClauseCode> = clauses
                    .iter()
                    .map(|c| self.compile_clause(c, env))
                    .collect::<CompileResult<_>>()?;
                let item = self.compile_expr(item, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut out = Vec::new();
                    run_clauses(&clauses, &item, act, &mut out)?;
                    Ok(Value::list(out))
                }))
            }

            Expr::Attribute { object: obj, name } => {
                let obj = self.compile_expr(obj, env)?;
                let name = name.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    Ok(object::get_attr(&receiver, &name)?)
                }))
            }

            Expr::Subscript { object: obj, index } => {
                let obj = self.compile_expr(obj, env)?;
                let index = self.compile_expr(index, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    let key = index(act)?;
                    Ok(object::get_item(&receiver, &key)?)
                }))
            }

            Expr::Binary { op, left, right } => {
                let op = *op;
                let left = self.compile_expr(left, env)?;
                let right = self.compile_expr(right, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let l = left(act)?;
                    let r = right(act)?;
                    Ok(object::binary(op, &l, &r)?)
                }))
            }

            Expr::Unary { op, operand } => {
                let op = *op;
                let operand = self.compile_expr(operand, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let v = operand(act)?;
                    Ok(object::unary(op, &v)?)
                }))
            }

            Expr::Compare { op, left, right } => {
                let op = *op;
                let left = self.compile_expr(left, env)?;
                let right = self.compile_expr(right, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let l = left(act)?;
                    let r = right(act)?;
                    Ok(object::compare(op, &l, &r)?)
                }))
            }

            Expr::BoolOp { op, left, right } => {
                let op = *op;
                let left = self.compile_expr(left, env)?;
                let right = self.compile_expr(right, env)?;
                // The result is the operand that decided the outcome, not
                // a coerced boolean.
                Ok(Rc::new(move |act: &mut Activation| {
                    let l = left(act)?;
                    let l_true = object::truthy(&l)?;
                    match op {
                        BoolOpKind::And => {
                            if l_true {
                                right(act)
                            } else {
                                Ok(l)
                            }
                        }
                        BoolOpKind::Or => {
                            if l_true {
                                Ok(l)
                            } else {
                                right(act)
                            }
                        }
                    }
                }))
            }

            Expr::Lambda { params, body } => {
                let body = vec![Stmt::Return(Some((**body).clone()))];
                self.compile_callable("<lambda>", params, body, env)
            }

            Expr::Call {
                callee,
                args,
                keywords,
                star_args,
                star_kwargs,
            } => self.compile_call(callee, args, keywords, star_args.as_deref(), star_kwargs.as_deref(), env),
        }
    }

    fn compile_all(&self, exprs: &[Expr], env: &ScopeEnv) -> CompileResult<Vec<ExprCode>> {
        exprs.iter().map(|e| self.compile_expr(e, env)).collect()
    }

    fn compile_clause(&self, clause: &CompClause, env: &ScopeEnv) -> CompileResult<ClauseCode> {
        Ok(ClauseCode {
            iter: self.compile_expr(&clause.iter, env)?,
            store: self.compile_store(&clause.target, env)?,
            conds: self.compile_all(&clause.conds, env)?,
        })
    }

    /// Call sites intercept the `eval`/`locals`/`globals` markers by
    /// identity before the generic protocol, because those three need the
    /// caller's scope. Everything else evaluates its arguments and goes
    /// through `object::call`.
    fn compile_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        keywords: &[(String, Expr)],
        star_args: Option<&Expr>,
        star_kwargs: Option<&Expr>,
        env: &ScopeEnv,
    ) -> CompileResult<ExprCode> {
        let callee = self.compile_expr(callee, env)?;
        let args = self.compile_all(args, env)?;
        let keywords: Vec<(String, ExprCode)> = keywords
            .iter()
            .map(|(n, e)| Ok((n.clone(), self.compile_expr(e, env)?)))
            .collect::<CompileResult<_>>()?;
        let star_seq = star_args.map(|e| self.compile_expr(e, env)).transpose()?;
        let star_map = star_kwargs.map(|e| self.compile_expr(e, env)).transpose()?;
        let sess = self.sess.clone();
        let call_env = env.clone();

        Ok(Rc::new(move |act: &mut Activation| {
            let callee_value = callee(act)?;
            let plain_positional = keywords.is_empty() && star_seq.is_none() && star_map.is_none();

            if sess.builtins.is_locals(&callee_value) || sess.builtins.is_globals(&callee_value) {
                let name = if sess.builtins.is_locals(&callee_value) {
                    "locals"
                } else {
                    "globals"
                };
                if !args.is_empty() || !plain_positional {
                    return Err(Signal::from(throw(
                        &classes().type_error,
                        format!("{}() takes no arguments", name),
                    )));
                }
                if name == "globals" {
                    return Ok(act.globals.as_dict());
                }
                return scope_snapshot(&call_env, act);
            }

            if sess.builtins.is_eval(&callee_value) {
                if !plain_positional {
                    return Err(Signal::from(throw(
                        &classes().type_error,
                        "eval() takes only positional arguments",
                    )));
                }
                if args.is_empty() || args.len() > 3 {
                    return Err(Signal::from(throw(
                        &classes().type_error,
                        format!("eval() takes 1..3 arguments ({} given)", args.len()),
                    )));
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in &args {
                    values.push(arg(act)?);
                }
                return eval_in_scope(&sess, &call_env, act, &values);
            }

            let mut positional = Vec::with_capacity(args.len());
            for arg in &args {
                positional.push(arg(act)?);
            }
            let mut kw_values = Vec::with_capacity(keywords.len());
            for (name, code) in &keywords {
                kw_values.push((name.clone(), code(act)?));
            }
            let seq_value = match &star_seq {
                Some(code) => Some(code(act)?),
                None => None,
            };
            let map_value = match &star_map {
                Some(code) => Some(code(act)?),
                None => None,
            };
            Ok(object::call(
                &callee_value,
                &CallArgs {
                    positional: &positional,
                    keywords: &kw_values,
                    star_seq: seq_value.as_ref(),
                    star_map: map_value.as_ref(),
                },
            )?)
        }))
    }
}

struct ClauseCode {
    iter: ExprCode,
    store: StoreCode,
    conds: Vec<ExprCode>,
}

fn run_clauses(
    clauses: &[ClauseCode],
    item: &ExprCode,
    act: &mut Activation,
    out: &mut Vec<Value>,
) -> Result<(), Signal> {
    let Some((first, rest)) = clauses.split_first() else {
        out.push(item(act)?);
        return Ok(());
    };
    let seq = (first.iter)(act)?;
    object::iterate::<Signal>(&seq, &mut |element| {
        (first.store)(act, element)?;
        for cond in &first.conds {
            if !object::truthy(&cond(act)?)? {
                return Ok(());
            }
        }
        run_clauses(rest, item, act, out)
    })
}

/// The `locals()` view of the calling scope, decided by the compile-time
/// context kind.
fn scope_snapshot(env: &ScopeEnv, act: &mut Activation) -> Result<Value, Signal> {
    match env.context {
        ContextKind::Module => Ok(act.globals.as_dict()),
        ContextKind::Function => Ok(namespace_to_dict(&act.locals_namespace())),
        ContextKind::Class => {
            let Some(ns) = &act.class_ns else {
                return Err(Signal::Fault(
                    "class-context locals() outside a class body".into(),
                ));
            };
            Ok(namespace_to_dict(&ns.borrow()))
        }
    }
}

/// `eval` with one argument evaluates in the calling scope; with explicit
/// globals (and optional locals) dicts it evaluates against fresh
/// namespaces built from them.
fn eval_in_scope(
    sess: &Rc<SessionInner>,
    call_env: &ScopeEnv,
    act: &mut Activation,
    args: &[Value],
) -> Result<Value, Signal> {
    let Some(src) = args[0].as_str() else {
        return Err(Signal::from(throw(
            &classes().type_error,
            format!("eval() source must be a string, not {}", args[0].type_name()),
        )));
    };
    let parsed = sess.parser.parse_expr(src).map_err(syntax_error)?;

    if args.len() == 1 {
        let code = Translator::new(sess.clone())
            .compile_expr(&parsed, call_env)
            .map_err(|e| syntax_error(e.to_string()))?;
        return code(act);
    }

    let globals_ns = dict_to_namespace(&args[1], "eval globals")?;
    let locals_ns = if args.len() == 3 {
        dict_to_namespace(&args[2], "eval locals")?
    } else {
        quill_core::Namespace::default()
    };
    let mut local_names: Vec<String> = locals_ns.keys().cloned().collect();
    local_names.sort();
    let unit_env = ScopeEnv::exec_unit(Rc::from(Vec::<String>::new()), &local_names);
    let code = Translator::new(sess.clone())
        .compile_expr(&parsed, &unit_env)
        .map_err(|e| syntax_error(e.to_string()))?;

    let unit_globals = ModuleGlobals::for_dynamic("<eval>", globals_ns, sess.builtins.clone());
    let mut frame = Activation::with_locals(unit_globals, unit_env.local_names.clone());
    for (i, n) in unit_env.local_names.iter().enumerate() {
        if let Some(v) = locals_ns.get(n) {
            frame.locals[i] = v.clone();
        }
    }
    code(&mut frame)
}
