//! Statement translation.

use std::cell::RefCell;
use std::rc::Rc;

use quill_core::{classes, object, CallArgs, DictKey, Failure, Namespace, Raised, Value};

use crate::ast::{render_expr, BinOp, ExceptHandler, Stmt, Target};
use crate::env::ScopeEnv;
use crate::error::{CompileError, CompileResult};
use crate::resolve;
use crate::scope;
use crate::storage::{Activation, ExprCode, ModuleGlobals, Signal, StmtCode, StoreCode};
use crate::translate::Translator;

impl Translator {
    pub(crate) fn compile_stmt(&self, stmt: &Stmt, env: &ScopeEnv) -> CompileResult<StmtCode> {
        match stmt {
            Stmt::Expr(e) => {
                let code = self.compile_expr(e, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    code(act)?;
                    Ok(())
                }))
            }

            Stmt::Assign { targets, value } => {
                let value = self.compile_expr(value, env)?;
                let stores: Vec<StoreCode> = targets
                    .iter()
                    .map(|t| self.compile_store(t, env))
                    .collect::<CompileResult<_>>()?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let v = value(act)?;
                    for store in &stores {
                        store(act, v.clone())?;
                    }
                    Ok(())
                }))
            }

            Stmt::AugAssign { target, op, value } => self.compile_aug_assign(target, *op, value, env),

            Stmt::Del(targets) => {
                let deletes: Vec<StmtCode> = targets
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

            Stmt::Print {
                items,
                trailing_comma,
                dest,
            } => {
                if dest.is_some() {
                    self.sess
                        .warn("print destination is not supported; output goes to the session sink");
                }
                let items: Vec<ExprCode> = items
                    .iter()
                    .map(|e| self.compile_expr(e, env))
                    .collect::<CompileResult<_>>()?;
                let soft = *trailing_comma;
                let sess = self.sess.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in &items {
                        parts.push(object::render(&item(act)?));
                    }
                    sess.write_print(&parts.join(" "), soft)?;
                    Ok(())
                }))
            }

            Stmt::If { arms, orelse } => {
                let arms: Vec<(ExprCode, StmtCode)> = arms
                    .iter()
                    .map(|(test, suite)| {
                        Ok((self.compile_expr(test, env)?, self.compile_suite(suite, env)?))
                    })
                    .collect::<CompileResult<_>>()?;
                let orelse = self.compile_suite(orelse, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    for (test, suite) in &arms {
                        if object::truthy(&test(act)?)? {
                            return suite(act);
                        }
                    }
                    orelse(act)
                }))
            }

            Stmt::While { test, body, orelse } => {
                let test = self.compile_expr(test, env)?;
                let body = self.compile_suite(body, &env.loop_body())?;
                // The else suite runs on normal exhaustion only, outside
                // the loop's break/continue extent.
                let orelse = self.compile_suite(orelse, env)?;
                Ok(Rc::new(move |act: &mut Activation| loop {
                    if !object::truthy(&test(act)?)? {
                        return orelse(act);
                    }
                    match body(act) {
                        Ok(()) | Err(Signal::Continue) => {}
                        Err(Signal::Break) => return Ok(()),
                        Err(signal) => return Err(signal),
                    }
                }))
            }

            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iter = self.compile_expr(iter, env)?;
                let store = self.compile_store(target, env)?;
                let body = self.compile_suite(body, &env.loop_body())?;
                let orelse = self.compile_suite(orelse, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let seq = iter(act)?;
                    let result = object::iterate::<Signal>(&seq, &mut |element| {
                        store(act, element)?;
                        match body(act) {
                            Err(Signal::Continue) => Ok(()),
                            other => other,
                        }
                    });
                    match result {
                        Ok(()) => orelse(act),
                        Err(Signal::Break) => Ok(()),
                        Err(signal) => Err(signal),
                    }
                }))
            }

            Stmt::Break => {
                if !env.in_loop {
                    return Err(CompileError::BreakOutsideLoop);
                }
                Ok(Rc::new(|_: &mut Activation| Err(Signal::Break)))
            }

            Stmt::Continue => {
                if !env.in_loop {
                    return Err(CompileError::ContinueOutsideLoop);
                }
                Ok(Rc::new(|_: &mut Activation| Err(Signal::Continue)))
            }

            Stmt::Pass => Ok(Rc::new(|_: &mut Activation| Ok(()))),

            Stmt::Return(value) => {
                if !env.in_function {
                    return Err(CompileError::ReturnOutsideFunction);
                }
                let value = value
                    .as_ref()
                    .map(|v| self.compile_expr(v, env))
                    .transpose()?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let v = match &value {
                        Some(code) => code(act)?,
                        None => Value::None,
                    };
                    Err(Signal::Return(v))
                }))
            }

            // Function bodies rewrite their yields away before reaching
            // here, so a surviving yield is outside any function.
            Stmt::Yield(_) => Err(CompileError::YieldOutsideFunction),

            // Consumed entirely by the scope classifier.
            Stmt::Global(_) => Ok(Rc::new(|_: &mut Activation| Ok(()))),

            Stmt::FuncDef(def) => {
                let code = self.compile_callable(&def.name, &def.params, def.body.clone(), env)?;
                let decorators: Vec<ExprCode> = def
                    .decorators
                    .iter()
                    .map(|d| self.compile_expr(d, env))
                    .collect::<CompileResult<_>>()?;
                let store = resolve::write(&def.name, env);
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut value = code(act)?;
                    for decorator in decorators.iter().rev() {
                        let d = decorator(act)?;
                        let arg = [value];
                        value = object::call(&d, &CallArgs::positional_only(&arg))?;
                    }
                    store(act, value)
                }))
            }

            Stmt::ClassDef { name, bases, body } => {
                let bases: Vec<ExprCode> = bases
                    .iter()
                    .map(|b| self.compile_expr(b, env))
                    .collect::<CompileResult<_>>()?;
                let info = scope::classify_class(body)?;
                let cenv = env.class_body(&info);
                let body_code = self.compile_suite(body, &cenv)?;
                let store = resolve::write(name, env);
                let name = name.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let mut base_values = Vec::with_capacity(bases.len());
                    for base in &bases {
                        base_values.push(base(act)?);
                    }
                    let ns = Rc::new(RefCell::new(Namespace::default()));
                    let saved = act.class_ns.replace(ns.clone());
                    let result = body_code(act);
                    act.class_ns = saved;
                    result?;
                    let namespace = ns.borrow().clone();
                    let class = object::make_class(&name, &base_values, namespace)?;
                    store(act, class)
                }))
            }

            Stmt::Raise {
                exc,
                arg,
                traceback,
            } => {
                if traceback.is_some() {
                    self.sess.warn("raise: traceback argument is ignored");
                }
                let exc = self.compile_expr(exc, env)?;
                let arg = arg.as_ref().map(|a| self.compile_expr(a, env)).transpose()?;
                let sess = self.sess.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let exc_value = exc(act)?;
                    let arg_value = match &arg {
                        Some(code) => Some(code(act)?),
                        None => None,
                    };
                    if arg_value.is_some() && matches!(exc_value, Value::Instance(_)) {
                        sess.warn("raise: argument ignored when raising an instance");
                    }
                    let raised = object::raise_value(&exc_value, arg_value)?;
                    Err(Signal::Raise(raised))
                }))
            }

            Stmt::TryExcept {
                body,
                handlers,
                orelse,
            } => {
                let body = self.compile_suite(body, env)?;
                let handlers: Vec<HandlerCode> = handlers
                    .iter()
                    .map(|h| self.compile_handler(h, env))
                    .collect::<CompileResult<_>>()?;
                let orelse = self.compile_suite(orelse, env)?;
                Ok(Rc::new(move |act: &mut Activation| match body(act) {
                    Ok(()) => orelse(act),
                    Err(Signal::Raise(raised)) => {
                        for handler in &handlers {
                            if handler_matches(handler.types.as_ref(), &raised, act)? {
                                if let Some(bind) = &handler.binding {
                                    bind(act, raised.value.clone())?;
                                }
                                return (handler.body)(act);
                            }
                        }
                        Err(Signal::Raise(raised))
                    }
                    Err(other) => Err(other),
                }))
            }

            Stmt::TryFinally { body, finalizer } => {
                let body = self.compile_suite(body, env)?;
                let finalizer = self.compile_suite(finalizer, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let result = body(act);
                    // The finalizer runs on every exit; its own signal
                    // supersedes the body's.
                    finalizer(act)?;
                    result
                }))
            }

            Stmt::Assert { test, message } => {
                let source = render_expr(test);
                let test = self.compile_expr(test, env)?;
                let message = message
                    .as_ref()
                    .map(|m| self.compile_expr(m, env))
                    .transpose()?;
                let sess = self.sess.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    if object::truthy(&test(act)?)? {
                        return Ok(());
                    }
                    if sess.take_ignore_assert() {
                        return Ok(());
                    }
                    let text = match &message {
                        Some(code) => object::render(&code(act)?),
                        None => source.clone(),
                    };
                    Err(Signal::Raise(Raised::new(&classes().assertion_error, text)))
                }))
            }

            Stmt::Exec {
                source,
                globals,
                locals,
            } => self.compile_exec(source, globals.as_ref(), locals.as_ref(), env),
        }
    }

    fn compile_aug_assign(
        &self,
        target: &Target,
        op: BinOp,
        value: &crate::ast::Expr,
        env: &ScopeEnv,
    ) -> CompileResult<StmtCode> {
        let value = self.compile_expr(value, env)?;
        match target {
            Target::Tuple(_) => Err(CompileError::AugmentedAssignToTuple),
            Target::Name(n) => {
                let load = resolve::read(n, env);
                let store = resolve::write(n, env);
                Ok(Rc::new(move |act: &mut Activation| {
                    let current = load(act)?;
                    let rhs = value(act)?;
                    let result = augmented(op, &current, &rhs)?;
                    store(act, result)
                }))
            }
            Target::Attribute { object: obj, name } => {
                let obj = self.compile_expr(obj, env)?;
                let name = name.clone();
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    let current = object::get_attr(&receiver, &name)?;
                    let rhs = value(act)?;
                    let result = augmented(op, &current, &rhs)?;
                    object::set_attr(&receiver, &name, result)?;
                    Ok(())
                }))
            }
            Target::Subscript { object: obj, index } => {
                let obj = self.compile_expr(obj, env)?;
                let index = self.compile_expr(index, env)?;
                Ok(Rc::new(move |act: &mut Activation| {
                    let receiver = obj(act)?;
                    let key = index(act)?;
                    let current = object::get_item(&receiver, &key)?;
                    let rhs = value(act)?;
                    let result = augmented(op, &current, &rhs)?;
                    object::set_item(&receiver, &key, result)?;
                    Ok(())
                }))
            }
        }
    }

    fn compile_handler(&self, handler: &ExceptHandler, env: &ScopeEnv) -> CompileResult<HandlerCode> {
        Ok(HandlerCode {
            types: handler
                .types
                .as_ref()
                .map(|t| self.compile_expr(t, env))
                .transpose()?,
            binding: handler
                .binding
                .as_ref()
                .map(|b| self.compile_store(b, env))
                .transpose()?,
            body: self.compile_suite(&handler.body, env)?,
        })
    }

    /// `exec` compiles its source at run time against fresh or borrowed
    /// namespaces, runs it, and copies the resulting bindings back.
    fn compile_exec(
        &self,
        source: &crate::ast::Expr,
        globals: Option<&crate::ast::Expr>,
        locals: Option<&crate::ast::Expr>,
        env: &ScopeEnv,
    ) -> CompileResult<StmtCode> {
        let source = self.compile_expr(source, env)?;
        let globals = globals.map(|g| self.compile_expr(g, env)).transpose()?;
        let locals = locals.map(|l| self.compile_expr(l, env)).transpose()?;
        let sess = self.sess.clone();
        let outer = env.clone();
        Ok(Rc::new(move |act: &mut Activation| {
            let source_value = source(act)?;
            let Some(src) = source_value.as_str() else {
                return Err(Signal::from(quill_core::throw(
                    &classes().type_error,
                    format!("exec source must be a string, not {}", source_value.type_name()),
                )));
            };
            let src = src.to_string();
            let globals_value = match &globals {
                Some(code) => Some(code(act)?),
                None => None,
            };
            let locals_value = match &locals {
                Some(code) => Some(code(act)?),
                None => None,
            };
            let globals_ns = match &globals_value {
                Some(v) => dict_to_namespace(v, "exec globals")?,
                None => act.globals.snapshot(),
            };
            let locals_ns = match &locals_value {
                Some(v) => dict_to_namespace(v, "exec locals")?,
                None if globals_value.is_some() => Namespace::default(),
                None => act.locals_namespace(),
            };

            let stmts = sess.parser.parse_module(&src).map_err(syntax_error)?;
            let (info, _) =
                scope::classify_module(&stmts).map_err(|e| syntax_error(e.to_string()))?;

            // Frame layout: the supplied locals first, then every name the
            // unit itself binds (its writes shadow the surrounding module
            // for the unit's extent and are copied back afterwards).
            // Functions the unit defines resolve those names dynamically,
            // so they see them only once the unit has finished and copied
            // back, not mid-execution.
            let mut local_names: Vec<String> = locals_ns.keys().cloned().collect();
            local_names.sort();
            for n in &info.locals {
                if !local_names.contains(n) && !info.declared_global.contains(n) {
                    local_names.push(n.clone());
                }
            }
            let mut unit_env = ScopeEnv::exec_unit(Rc::from(Vec::<String>::new()), &local_names);
            unit_env.declared_global = Rc::new(info.declared_global.clone());

            let unit = Translator::new(sess.clone())
                .compile_suite(&stmts, &unit_env)
                .map_err(|e| syntax_error(e.to_string()))?;

            let unit_globals =
                ModuleGlobals::for_dynamic("<exec>", globals_ns, sess.builtins.clone());
            let mut frame =
                Activation::with_locals(unit_globals.clone(), unit_env.local_names.clone());
            for (i, n) in unit_env.local_names.iter().enumerate() {
                if let Some(v) = locals_ns.get(n) {
                    frame.locals[i] = v.clone();
                }
            }

            match unit(&mut frame) {
                Ok(()) => {}
                Err(Signal::Raise(r)) => return Err(Signal::Raise(r)),
                Err(Signal::Fault(m)) => return Err(Signal::Fault(m)),
                Err(_) => {
                    return Err(Signal::Fault("control signal escaped an exec unit".into()))
                }
            }

            let locals_out = frame.locals_namespace();
            let globals_out = unit_globals.snapshot();
            match (&globals_value, &locals_value) {
                (Some(g), Some(l)) => {
                    update_dict(g, &globals_out);
                    update_dict(l, &locals_out);
                }
                (Some(g), None) => {
                    update_dict(g, &globals_out);
                    update_dict(g, &locals_out);
                }
                (None, Some(l)) => {
                    write_back(&outer, act, &globals_out);
                    update_dict(l, &locals_out);
                }
                (None, None) => {
                    write_back(&outer, act, &globals_out);
                    write_back(&outer, act, &locals_out);
                }
            }
            Ok(())
        }))
    }
}

struct HandlerCode {
    types: Option<ExprCode>,
    binding: Option<StoreCode>,
    body: StmtCode,
}

fn augmented(op: BinOp, current: &Value, rhs: &Value) -> Result<Value, Failure> {
    match object::inplace_binary(op, current, rhs)? {
        Some(v) => Ok(v),
        None => object::binary(op, current, rhs),
    }
}

fn handler_matches(
    types: Option<&ExprCode>,
    raised: &Raised,
    act: &mut Activation,
) -> Result<bool, Signal> {
    let Some(code) = types else {
        // Bare clause: matches every language-level exception.
        return Ok(true);
    };
    let target = code(act)?;
    catch_target_matches(&target, raised)
}

fn catch_target_matches(target: &Value, raised: &Raised) -> Result<bool, Signal> {
    match target {
        Value::Class(class) => Ok(raised.class.derives_from(class)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if catch_target_matches(option, raised)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(Signal::Raise(Raised::new(
            &classes().type_error,
            "except clause target must be a class or tuple of classes",
        ))),
    }
}

pub(crate) fn syntax_error(message: impl std::fmt::Display) -> Signal {
    Signal::Raise(Raised::new(&classes().syntax_error, message.to_string()))
}

pub(crate) fn dict_to_namespace(v: &Value, what: &str) -> Result<Namespace, Signal> {
    let Value::Dict(map) = v else {
        return Err(Signal::from(quill_core::throw(
            &classes().type_error,
            format!("{} must be a dict, not {}", what, v.type_name()),
        )));
    };
    let mut out = Namespace::default();
    for (k, value) in map.borrow().iter() {
        let DictKey::Str(name) = k else {
            return Err(Signal::from(quill_core::throw(
                &classes().type_error,
                format!("{} keys must be strings", what),
            )));
        };
        out.insert(name.to_string(), value.clone());
    }
    Ok(out)
}

fn update_dict(target: &Value, ns: &Namespace) {
    if let Value::Dict(map) = target {
        let mut map = map.borrow_mut();
        for (k, v) in ns {
            map.insert(DictKey::Str(k.as_str().into()), v.clone());
        }
    }
}

/// Write an exec unit's resulting bindings into the surrounding scope,
/// honoring the surrounding compile-time resolution: lexical local first,
/// then module slot, then the dynamic table.
fn write_back(env: &ScopeEnv, act: &mut Activation, ns: &Namespace) {
    for (name, value) in ns {
        if !env.is_declared_global(name) {
            if let Some(idx) = env.visible(name) {
                act.locals[idx] = value.clone();
                continue;
            }
        }
        match env.module_slot(name) {
            Some(idx) => act.globals.write_slot(idx, value.clone()),
            None => act.globals.write_dynamic(name, value.clone()),
        }
    }
}
