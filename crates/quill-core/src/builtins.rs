//! Builtin registry
//!
//! Name-keyed registry of builtin values: functions, constants and the
//! exception classes. The compiler consults it twice: at module setup, to
//! seed slots whose names shadow a builtin, and as the final fallback of a
//! dynamic global lookup.
//!
//! `eval`, `locals` and `globals` are registered as markers. They need the
//! caller's scope, which an ordinary call cannot see, so the compiler
//! special-cases them at every call site by identity (never by name, which
//! shadowing would make ambiguous). Reaching their registry closure means
//! they escaped every call site, which is a fault, not a user error.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::exceptions::{classes, throw, CallResult, ExceptionSet, Failure};
use crate::object;
use crate::value::{collect_positional, BuiltinObj, CallArgs, CallFn, Value};

/// The builtin registry for a compilation session.
pub struct Builtins {
    entries: FxHashMap<String, Value>,
    eval_marker: Value,
    locals_marker: Value,
    globals_marker: Value,
    pub exceptions: ExceptionSet,
}

fn builtin(name: &str, f: impl Fn(&CallArgs<'_>) -> CallResult + 'static) -> Value {
    Value::Builtin(Rc::new(BuiltinObj {
        name: name.to_string(),
        call: Box::new(f) as CallFn,
    }))
}

/// Positional-only argument extraction shared by the simple builtins.
fn positional(name: &str, args: &CallArgs<'_>) -> Result<Vec<Value>, Failure> {
    if !args.keywords.is_empty() || args.star_map.is_some() {
        return Err(throw(
            &classes().type_error,
            format!("{}() takes no keyword arguments", name),
        ));
    }
    collect_positional(args)
}

fn arity(name: &str, got: usize, min: usize, max: usize) -> Result<(), Failure> {
    if got < min || got > max {
        return Err(throw(
            &classes().type_error,
            format!("{}() takes {}..{} arguments ({} given)", name, min, max, got),
        ));
    }
    Ok(())
}

fn scope_marker(name: &'static str) -> Value {
    builtin(name, move |_| {
        Err(Failure::Fault(format!(
            "{}() invoked outside a compiled call site",
            name
        )))
    })
}

impl Builtins {
    pub fn new() -> Rc<Builtins> {
        let exceptions = classes();
        let mut entries: FxHashMap<String, Value> = FxHashMap::default();

        entries.insert("None".into(), Value::None);
        entries.insert("True".into(), Value::Bool(true));
        entries.insert("False".into(), Value::Bool(false));

        entries.insert(
            "len".into(),
            builtin("len", |args| {
                let pos = positional("len", args)?;
                arity("len", pos.len(), 1, 1)?;
                let n = match &pos[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::Tuple(t) => t.len(),
                    Value::List(l) => l.borrow().len(),
                    Value::Dict(d) => d.borrow().len(),
                    other => {
                        return Err(throw(
                            &classes().type_error,
                            format!("object of type {} has no len()", other.type_name()),
                        ))
                    }
                };
                Ok(Value::Int(n as i64))
            }),
        );

        entries.insert(
            "range".into(),
            builtin("range", |args| {
                let pos = positional("range", args)?;
                arity("range", pos.len(), 1, 3)?;
                let int_arg = |v: &Value| {
                    v.as_int().ok_or_else(|| {
                        throw(&classes().type_error, "range() arguments must be integers")
                    })
                };
                let (start, stop, step) = match pos.len() {
                    1 => (0, int_arg(&pos[0])?, 1),
                    2 => (int_arg(&pos[0])?, int_arg(&pos[1])?, 1),
                    _ => (int_arg(&pos[0])?, int_arg(&pos[1])?, int_arg(&pos[2])?),
                };
                if step == 0 {
                    return Err(throw(&classes().value_error, "range() step must not be zero"));
                }
                let mut items = Vec::new();
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    items.push(Value::Int(i));
                    i += step;
                }
                Ok(Value::list(items))
            }),
        );

        entries.insert(
            "str".into(),
            builtin("str", |args| {
                let pos = positional("str", args)?;
                arity("str", pos.len(), 1, 1)?;
                Ok(Value::str(object::render(&pos[0])))
            }),
        );

        entries.insert(
            "repr".into(),
            builtin("repr", |args| {
                let pos = positional("repr", args)?;
                arity("repr", pos.len(), 1, 1)?;
                Ok(Value::str(object::repr(&pos[0])))
            }),
        );

        entries.insert(
            "type".into(),
            builtin("type", |args| {
                let pos = positional("type", args)?;
                arity("type", pos.len(), 1, 1)?;
                Ok(match &pos[0] {
                    Value::Instance(inst) => Value::Class(inst.class.clone()),
                    other => Value::str(other.type_name()),
                })
            }),
        );

        entries.insert(
            "isinstance".into(),
            builtin("isinstance", |args| {
                let pos = positional("isinstance", args)?;
                arity("isinstance", pos.len(), 2, 2)?;
                // A tuple of classes matches if any member matches.
                if let Value::Tuple(options) = &pos[1] {
                    for option in options.iter() {
                        if object::isinstance(&pos[0], option)? {
                            return Ok(Value::Bool(true));
                        }
                    }
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(object::isinstance(&pos[0], &pos[1])?))
            }),
        );

        entries.insert(
            "abs".into(),
            builtin("abs", |args| {
                let pos = positional("abs", args)?;
                arity("abs", pos.len(), 1, 1)?;
                match &pos[0] {
                    Value::Int(i) => Ok(Value::Int(i.abs())),
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => Err(throw(
                        &classes().type_error,
                        format!("bad operand type for abs(): {}", other.type_name()),
                    )),
                }
            }),
        );

        entries.insert(
            "min".into(),
            builtin("min", |args| reduce_extremum("min", args, object::CmpOp::Lt)),
        );
        entries.insert(
            "max".into(),
            builtin("max", |args| reduce_extremum("max", args, object::CmpOp::Gt)),
        );

        for class in [
            &exceptions.base_exception,
            &exceptions.exception,
            &exceptions.type_error,
            &exceptions.name_error,
            &exceptions.value_error,
            &exceptions.key_error,
            &exceptions.index_error,
            &exceptions.attribute_error,
            &exceptions.zero_division_error,
            &exceptions.assertion_error,
            &exceptions.runtime_error,
            &exceptions.syntax_error,
        ] {
            entries.insert(class.name.clone(), Value::Class(class.clone()));
        }

        let eval_marker = scope_marker("eval");
        let locals_marker = scope_marker("locals");
        let globals_marker = scope_marker("globals");
        entries.insert("eval".into(), eval_marker.clone());
        entries.insert("locals".into(), locals_marker.clone());
        entries.insert("globals".into(), globals_marker.clone());

        Rc::new(Builtins {
            entries,
            eval_marker,
            locals_marker,
            globals_marker,
            exceptions,
        })
    }

    /// Look up a builtin's value. `Some` also answers "does this name
    /// shadow a builtin" during module slot seeding.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }

    pub fn is_eval(&self, v: &Value) -> bool {
        v.same_object(&self.eval_marker)
    }

    pub fn is_locals(&self, v: &Value) -> bool {
        v.same_object(&self.locals_marker)
    }

    pub fn is_globals(&self, v: &Value) -> bool {
        v.same_object(&self.globals_marker)
    }
}

fn reduce_extremum(name: &str, args: &CallArgs<'_>, keep: object::CmpOp) -> CallResult {
    let pos = positional(name, args)?;
    // One argument means "reduce over this iterable".
    let items = if pos.len() == 1 {
        let mut collected = Vec::new();
        object::iterate::<Failure>(&pos[0], &mut |v| {
            collected.push(v);
            Ok(())
        })?;
        collected
    } else {
        pos
    };
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => match object::compare(keep, &item, &current)? {
                Value::Bool(true) => item,
                _ => current,
            },
        });
    }
    best.ok_or_else(|| throw(&classes().value_error, format!("{}() of empty sequence", name)))
}
