//! Name resolution & assignment protocol
//!
//! For each identifier occurrence the storage strategy is decided at
//! compile time from the current facts: context kind, membership in the
//! lexically visible locals, membership in this scope's `global`
//! declarations, and membership in the fixed module name list. The
//! decision compiles to a closure; nothing is re-resolved at run time.
//!
//! Binding errors carry four distinct message variants (module/static,
//! module/dynamic, local, class) for diagnostic precision.

use std::rc::Rc;

use quill_core::{classes, Raised, Value};

use crate::env::{ContextKind, ScopeEnv};
use crate::storage::{Activation, ExprCode, Signal, StmtCode, StoreCode};

fn name_error(msg: String) -> Signal {
    Signal::Raise(Raised::new(&classes().name_error, msg))
}

fn unbound_static(name: &str) -> Signal {
    name_error(format!("module variable '{}' is unbound", name))
}

fn undefined_dynamic(name: &str) -> Signal {
    name_error(format!("module variable '{}' is not defined", name))
}

fn unbound_local(name: &str) -> Signal {
    name_error(format!("local variable '{}' referenced before assignment", name))
}

fn undefined_class(name: &str) -> Signal {
    name_error(format!("class attribute '{}' is not defined", name))
}

/// Compile a read of `name`.
pub fn read(name: &str, env: &ScopeEnv) -> ExprCode {
    if env.context == ContextKind::Class && !env.is_declared_global(name) {
        return class_read(name, env);
    }
    match local_slot(name, env) {
        Some(idx) => local_read(name, idx),
        None => module_read(name, env),
    }
}

/// Compile a write to `name`.
pub fn write(name: &str, env: &ScopeEnv) -> StoreCode {
    if env.context == ContextKind::Class && !env.is_declared_global(name) {
        let name = name.to_string();
        return Rc::new(move |act: &mut Activation, value: Value| {
            let Some(ns) = &act.class_ns else {
                return Err(Signal::Fault(format!(
                    "class-namespace write of '{}' outside a class body",
                    name
                )));
            };
            ns.borrow_mut().insert(name.clone(), value);
            Ok(())
        });
    }
    match local_slot(name, env) {
        Some(idx) => Rc::new(move |act: &mut Activation, value: Value| {
            act.locals[idx] = value;
            Ok(())
        }),
        None => module_write(name, env),
    }
}

/// Compile a delete of `name`.
pub fn delete(name: &str, env: &ScopeEnv) -> StmtCode {
    if env.context == ContextKind::Class && !env.is_declared_global(name) {
        let name = name.to_string();
        return Rc::new(move |act: &mut Activation| {
            let Some(ns) = &act.class_ns else {
                return Err(Signal::Fault(format!(
                    "class-namespace delete of '{}' outside a class body",
                    name
                )));
            };
            if ns.borrow_mut().remove(&name).is_none() {
                return Err(undefined_class(&name));
            }
            Ok(())
        });
    }
    match local_slot(name, env) {
        Some(idx) => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation| {
                if act.locals[idx].is_unbound() {
                    return Err(unbound_local(&name));
                }
                act.locals[idx] = Value::Unbound;
                Ok(())
            })
        }
        None => module_delete(name, env),
    }
}

/// Frame index if `name` resolves to a true lexical local here. A name
/// declared `global` never does, regardless of visibility.
fn local_slot(name: &str, env: &ScopeEnv) -> Option<usize> {
    if env.is_declared_global(name) {
        return None;
    }
    env.visible(name)
}

fn local_read(name: &str, idx: usize) -> ExprCode {
    let name = name.to_string();
    Rc::new(move |act: &mut Activation| {
        let v = act.locals[idx].clone();
        if v.is_unbound() {
            return Err(unbound_local(&name));
        }
        Ok(v)
    })
}

fn module_read(name: &str, env: &ScopeEnv) -> ExprCode {
    match env.module_slot(name) {
        Some(idx) => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation| {
                act.globals
                    .read_slot(idx)
                    .ok_or_else(|| unbound_static(&name))
            })
        }
        None => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation| {
                act.globals
                    .read_dynamic(&name)
                    .ok_or_else(|| undefined_dynamic(&name))
            })
        }
    }
}

fn module_write(name: &str, env: &ScopeEnv) -> StoreCode {
    match env.module_slot(name) {
        Some(idx) => Rc::new(move |act: &mut Activation, value: Value| {
            act.globals.write_slot(idx, value);
            Ok(())
        }),
        None => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation, value: Value| {
                act.globals.write_dynamic(&name, value);
                Ok(())
            })
        }
    }
}

fn module_delete(name: &str, env: &ScopeEnv) -> StmtCode {
    match env.module_slot(name) {
        Some(idx) => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation| {
                if !act.globals.delete_slot(idx) {
                    return Err(unbound_static(&name));
                }
                Ok(())
            })
        }
        None => {
            let name = name.to_string();
            Rc::new(move |act: &mut Activation| {
                if !act.globals.delete_dynamic(&name) {
                    return Err(undefined_dynamic(&name));
                }
                Ok(())
            })
        }
    }
}

/// Class-context read: class namespace first, then the visible lexical
/// local if one exists, then module storage.
fn class_read(name: &str, env: &ScopeEnv) -> ExprCode {
    let fallback = match env.visible(name) {
        Some(idx) => local_read(name, idx),
        None => module_read(name, env),
    };
    let name = name.to_string();
    Rc::new(move |act: &mut Activation| {
        if let Some(ns) = &act.class_ns {
            if let Some(v) = ns.borrow().get(&name) {
                return Ok(v.clone());
            }
        }
        fallback(act)
    })
}
