//! Object model operations consumed by compiled code
//!
//! Everything the compiler core needs from the runtime: truthiness, string
//! rendering, attribute and subscript protocols, operator dispatch (with
//! an in-place success signal), callback-driven iteration, instance
//! testing, and class/dict/function construction.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::exceptions::{classes, throw, CallResult, Failure, Raised};
use crate::value::{
    collect_positional, CallArgs, CallFn, ClassObj, DictKey, FunctionObj, InstanceObj, Namespace,
    Value,
};

/// Binary operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

/// Unary operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
        }
    }
}

/// Comparison operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

fn type_error(msg: impl Into<String>) -> Failure {
    throw(&classes().type_error, msg)
}

/// Boolean coercion.
pub fn truthy(v: &Value) -> Result<bool, Failure> {
    Ok(match v {
        Value::Unbound => {
            return Err(Failure::Fault("unbound value escaped into truth test".into()))
        }
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Tuple(t) => !t.is_empty(),
        Value::List(l) => !l.borrow().is_empty(),
        Value::Dict(d) => !d.borrow().is_empty(),
        _ => true,
    })
}

/// String form, as `print` and `str()` produce it.
pub fn render(v: &Value) -> String {
    match v {
        Value::Str(s) => s.to_string(),
        _ => repr(v),
    }
}

/// Quoted/structural form, used inside containers and for diagnostics.
pub fn repr(v: &Value) -> String {
    match v {
        Value::Unbound => "<unbound>".to_string(),
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{:?}", f),
        Value::Str(s) => format!("'{}'", s),
        Value::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(repr).collect();
            if parts.len() == 1 {
                format!("({},)", parts[0])
            } else {
                format!("({})", parts.join(", "))
            }
        }
        Value::List(items) => {
            let parts: Vec<String> = items.borrow().iter().map(repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Dict(map) => {
            let parts: Vec<String> = map
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", repr(&k.to_value()), repr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Class(c) => format!("<class '{}'>", c.name),
        Value::Instance(i) => format!("<{} instance>", i.class.name),
        Value::Function(f) => format!("<function {}>", f.name),
        Value::Builtin(b) => format!("<builtin {}>", b.name),
        Value::Module(m) => format!("<module '{}'>", m.name),
    }
}

/// Structural equality, the semantics of `==`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|w| values_equal(v, w)).unwrap_or(false))
        }
        _ => a.same_object(b),
    }
}

/// Binary operator dispatch.
pub fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> CallResult {
    use BinOp::*;
    match (op, lhs, rhs) {
        (_, Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b),
        (_, Value::Float(a), Value::Float(b)) => float_binary(op, *a, *b),
        (_, Value::Int(a), Value::Float(b)) => float_binary(op, *a as f64, *b),
        (_, Value::Float(a), Value::Int(b)) => float_binary(op, *a, *b as f64),
        (Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (Mul, Value::Str(s), Value::Int(n)) | (Mul, Value::Int(n), Value::Str(s)) => {
            Ok(Value::str(s.repeat((*n).max(0) as usize)))
        }
        (Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        _ => Err(type_error(format!(
            "unsupported operand types for {}: {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> CallResult {
    Ok(Value::Int(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(throw(&classes().zero_division_error, "integer division by zero"));
            }
            a.div_euclid(b)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(throw(&classes().zero_division_error, "integer modulo by zero"));
            }
            a.rem_euclid(b)
        }
    }))
}

fn float_binary(op: BinOp, a: f64, b: f64) -> CallResult {
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(throw(&classes().zero_division_error, "float division by zero"));
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(throw(&classes().zero_division_error, "float modulo by zero"));
            }
            a.rem_euclid(b)
        }
    }))
}

/// In-place operator attempt. `Ok(Some(v))` means the receiver mutated in
/// place and `v` is the (same) resulting object; `Ok(None)` means the type
/// does not support in-place mutation and the caller must fall back to the
/// non-mutating operator plus a normal store.
pub fn inplace_binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Option<Value>, Failure> {
    match (op, lhs) {
        (BinOp::Add, Value::List(items)) => {
            let mut appended = Vec::new();
            iterate::<Failure>(rhs, &mut |v| {
                appended.push(v);
                Ok(())
            })?;
            items.borrow_mut().extend(appended);
            Ok(Some(lhs.clone()))
        }
        _ => Ok(None),
    }
}

/// Unary operator dispatch.
pub fn unary(op: UnaryOp, v: &Value) -> CallResult {
    match (op, v) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, _) => Ok(Value::Bool(!truthy(v)?)),
        _ => Err(type_error(format!(
            "bad operand type for unary {}: {}",
            op.symbol(),
            v.type_name()
        ))),
    }
}

/// Comparison dispatch.
pub fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> CallResult {
    let result = match op {
        CmpOp::Eq => values_equal(lhs, rhs),
        CmpOp::Ne => !values_equal(lhs, rhs),
        _ => {
            let ordering = match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
                (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
                (Value::Str(a), Value::Str(b)) => Some(a.as_ref().cmp(b.as_ref())),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return Err(type_error(format!(
                    "cannot order {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            };
            match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

/// Callback-driven traversal of an iterable value, one invocation per
/// element. Containers are snapshotted first so the body may mutate them.
pub fn iterate<E: From<Failure>>(
    v: &Value,
    f: &mut dyn FnMut(Value) -> Result<(), E>,
) -> Result<(), E> {
    match v {
        Value::List(items) => {
            let snapshot: Vec<Value> = items.borrow().clone();
            for item in snapshot {
                f(item)?;
            }
            Ok(())
        }
        Value::Tuple(items) => {
            for item in items.iter() {
                f(item.clone())?;
            }
            Ok(())
        }
        Value::Str(s) => {
            for ch in s.chars() {
                f(Value::str(ch.to_string()))?;
            }
            Ok(())
        }
        Value::Dict(map) => {
            let keys: Vec<DictKey> = map.borrow().keys().cloned().collect();
            for k in keys {
                f(k.to_value())?;
            }
            Ok(())
        }
        _ => Err(type_error(format!("{} object is not iterable", v.type_name())).into()),
    }
}

/// Instance test against a class value.
pub fn isinstance(v: &Value, class: &Value) -> Result<bool, Failure> {
    let Value::Class(target) = class else {
        return Err(type_error("isinstance() second argument must be a class"));
    };
    Ok(match v {
        Value::Instance(inst) => inst.class.derives_from(target),
        _ => false,
    })
}

fn bind_method(instance: &Rc<InstanceObj>, func: &Rc<FunctionObj>) -> Value {
    let receiver = Value::Instance(instance.clone());
    let func = func.clone();
    let name = func.name.clone();
    make_function(name, move |args| {
        let mut positional = Vec::with_capacity(args.positional.len() + 1);
        positional.push(receiver.clone());
        positional.extend(args.positional.iter().cloned());
        (func.call)(&CallArgs {
            positional: &positional,
            keywords: args.keywords,
            star_seq: args.star_seq,
            star_map: args.star_map,
        })
    })
}

/// Attribute read.
pub fn get_attr(obj: &Value, name: &str) -> CallResult {
    match obj {
        Value::Instance(inst) => {
            if let Some(v) = inst.attrs.borrow().get(name) {
                return Ok(v.clone());
            }
            match inst.class.lookup(name) {
                Some(Value::Function(f)) => Ok(bind_method(inst, &f)),
                Some(v) => Ok(v),
                None => Err(throw(
                    &classes().attribute_error,
                    format!("{} instance has no attribute '{}'", inst.class.name, name),
                )),
            }
        }
        Value::Class(class) => class.lookup(name).ok_or_else(|| {
            throw(
                &classes().attribute_error,
                format!("class {} has no attribute '{}'", class.name, name),
            )
        }),
        Value::Module(module) => module.attrs.borrow().get(name).cloned().ok_or_else(|| {
            throw(
                &classes().attribute_error,
                format!("module '{}' has no attribute '{}'", module.name, name),
            )
        }),
        _ => Err(throw(
            &classes().attribute_error,
            format!("{} object has no attribute '{}'", obj.type_name(), name),
        )),
    }
}

/// Attribute write.
pub fn set_attr(obj: &Value, name: &str, value: Value) -> Result<(), Failure> {
    let attrs = match obj {
        Value::Instance(inst) => &inst.attrs,
        Value::Class(class) => &class.attrs,
        Value::Module(module) => &module.attrs,
        _ => {
            return Err(type_error(format!(
                "cannot set attribute '{}' on {} object",
                name,
                obj.type_name()
            )))
        }
    };
    attrs.borrow_mut().insert(name.to_string(), value);
    Ok(())
}

/// Attribute delete.
pub fn del_attr(obj: &Value, name: &str) -> Result<(), Failure> {
    let attrs = match obj {
        Value::Instance(inst) => &inst.attrs,
        Value::Class(class) => &class.attrs,
        Value::Module(module) => &module.attrs,
        _ => {
            return Err(type_error(format!(
                "cannot delete attribute '{}' on {} object",
                name,
                obj.type_name()
            )))
        }
    };
    if attrs.borrow_mut().remove(name).is_none() {
        return Err(throw(
            &classes().attribute_error,
            format!("no attribute '{}'", name),
        ));
    }
    Ok(())
}

fn list_index(len: usize, key: &Value) -> Result<usize, Failure> {
    let Value::Int(i) = key else {
        return Err(type_error(format!(
            "sequence indices must be integers, not {}",
            key.type_name()
        )));
    };
    let idx = if *i < 0 { *i + len as i64 } else { *i };
    if idx < 0 || idx as usize >= len {
        return Err(throw(&classes().index_error, "sequence index out of range"));
    }
    Ok(idx as usize)
}

/// Convert a value into a dict key, rejecting unhashable types.
pub fn dict_key(v: &Value) -> Result<DictKey, Failure> {
    match v {
        Value::None => Ok(DictKey::None),
        Value::Bool(b) => Ok(DictKey::Bool(*b)),
        Value::Int(i) => Ok(DictKey::Int(*i)),
        Value::Str(s) => Ok(DictKey::Str(s.clone())),
        Value::Tuple(items) => Ok(DictKey::Tuple(
            items.iter().map(dict_key).collect::<Result<_, _>>()?,
        )),
        _ => Err(type_error(format!("unhashable type: {}", v.type_name()))),
    }
}

/// Subscript read.
pub fn get_item(obj: &Value, key: &Value) -> CallResult {
    match obj {
        Value::List(items) => {
            let items = items.borrow();
            let idx = list_index(items.len(), key)?;
            Ok(items[idx].clone())
        }
        Value::Tuple(items) => {
            let idx = list_index(items.len(), key)?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = list_index(chars.len(), key)?;
            Ok(Value::str(chars[idx].to_string()))
        }
        Value::Dict(map) => {
            let k = dict_key(key)?;
            map.borrow().get(&k).cloned().ok_or_else(|| {
                throw(&classes().key_error, repr(key))
            })
        }
        _ => Err(type_error(format!(
            "{} object is not subscriptable",
            obj.type_name()
        ))),
    }
}

/// Subscript write.
pub fn set_item(obj: &Value, key: &Value, value: Value) -> Result<(), Failure> {
    match obj {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let idx = list_index(items.len(), key)?;
            items[idx] = value;
            Ok(())
        }
        Value::Dict(map) => {
            let k = dict_key(key)?;
            map.borrow_mut().insert(k, value);
            Ok(())
        }
        _ => Err(type_error(format!(
            "{} object does not support item assignment",
            obj.type_name()
        ))),
    }
}

/// Subscript delete.
pub fn del_item(obj: &Value, key: &Value) -> Result<(), Failure> {
    match obj {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let idx = list_index(items.len(), key)?;
            items.remove(idx);
            Ok(())
        }
        Value::Dict(map) => {
            let k = dict_key(key)?;
            if map.borrow_mut().remove(&k).is_none() {
                return Err(throw(&classes().key_error, repr(key)));
            }
            Ok(())
        }
        _ => Err(type_error(format!(
            "{} object does not support item deletion",
            obj.type_name()
        ))),
    }
}

/// Construct a class object from its name, evaluated base list and the
/// namespace produced by executing the class body.
pub fn make_class(name: &str, bases: &[Value], namespace: Namespace) -> CallResult {
    let mut base_classes = Vec::with_capacity(bases.len());
    for base in bases {
        match base {
            Value::Class(c) => base_classes.push(c.clone()),
            _ => {
                return Err(type_error(format!(
                    "base of class {} is not a class ({})",
                    name,
                    base.type_name()
                )))
            }
        }
    }
    let class = ClassObj::new(name, base_classes);
    *class.attrs.borrow_mut() = namespace;
    Ok(Value::Class(class))
}

/// Construct a function object from a name and a host closure.
pub fn make_function(
    name: impl Into<String>,
    call: impl Fn(&CallArgs<'_>) -> CallResult + 'static,
) -> Value {
    Value::Function(Rc::new(FunctionObj {
        name: name.into(),
        call: Box::new(call) as CallFn,
    }))
}

/// Construct a dict from evaluated key/value pairs.
pub fn make_dict(pairs: Vec<(Value, Value)>) -> CallResult {
    let mut map = FxHashMap::default();
    for (k, v) in pairs {
        map.insert(dict_key(&k)?, v);
    }
    Ok(Value::Dict(Rc::new(RefCell::new(map))))
}

/// The generic call protocol: functions and builtins run their closure,
/// classes instantiate.
pub fn call(callee: &Value, args: &CallArgs<'_>) -> CallResult {
    match callee {
        Value::Function(f) => (f.call)(args),
        Value::Builtin(b) => (b.call)(args),
        Value::Class(class) => instantiate(class, args),
        _ => Err(type_error(format!(
            "{} object is not callable",
            callee.type_name()
        ))),
    }
}

fn instantiate(class: &Rc<ClassObj>, args: &CallArgs<'_>) -> CallResult {
    let instance = Rc::new(InstanceObj {
        class: class.clone(),
        attrs: RefCell::new(Namespace::default()),
    });
    if let Some(Value::Function(init)) = class.lookup("__init__") {
        let bound = bind_method(&instance, &init);
        call(&bound, args)?;
    } else {
        if !args.keywords.is_empty() || args.star_map.is_some() {
            return Err(type_error(format!(
                "{}() takes no keyword arguments",
                class.name
            )));
        }
        let positional = collect_positional(args)?;
        if !positional.is_empty() {
            instance
                .attrs
                .borrow_mut()
                .insert("args".to_string(), Value::tuple(positional));
        }
    }
    Ok(Value::Instance(instance))
}

/// Raise an already-constructed instance, or instantiate-and-raise a
/// class. This is the object-model half of the `raise` construct.
pub fn raise_value(exc: &Value, arg: Option<Value>) -> Result<Raised, Failure> {
    match exc {
        Value::Class(class) => {
            let positional: Vec<Value> = arg.into_iter().collect();
            let instance = instantiate(class, &CallArgs::positional_only(&positional))?;
            match instance {
                Value::Instance(inst) => Ok(Raised::from_instance(inst)),
                _ => Err(Failure::Fault("class instantiation produced non-instance".into())),
            }
        }
        Value::Instance(inst) => Ok(Raised::from_instance(inst.clone())),
        _ => Err(type_error(format!(
            "exceptions must be classes or instances, not {}",
            exc.type_name()
        ))),
    }
}
