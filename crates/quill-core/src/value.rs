//! Value representation for compiled Quill code
//!
//! A single tagged enum covers every runtime value the compiler core can
//! produce or consume. Heap-shaped values (strings, containers, classes,
//! instances, callables) are reference-counted; mutation goes through
//! `RefCell` since compiled code executes single-threaded.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::exceptions::{CallResult, Failure};

/// A name-keyed attribute table (class bodies, instances, modules).
pub type Namespace = FxHashMap<String, Value>;

/// Runtime value.
///
/// `Unbound` is the storage sentinel distinguishing "never assigned" from
/// any legitimate value. It lives only inside module slots and local
/// frames; reading it is a binding error, so user code never observes it.
#[derive(Debug, Clone)]
pub enum Value {
    Unbound,
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Rc<[Value]>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<FxHashMap<DictKey, Value>>>),
    Class(Rc<ClassObj>),
    Instance(Rc<InstanceObj>),
    Function(Rc<FunctionObj>),
    Builtin(Rc<BuiltinObj>),
    Module(Rc<ModuleObj>),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    /// Build a list value.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Build a tuple value.
    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(items.into())
    }

    /// Build an empty dict value.
    pub fn empty_dict() -> Value {
        Value::Dict(Rc::new(RefCell::new(FxHashMap::default())))
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, Value::Unbound)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unbound => "unbound",
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Module(_) => "module",
        }
    }

    /// Identity comparison: pointer equality for heap values, value
    /// equality for immediates.
    pub fn same_object(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Hashable key subset for dict storage.
///
/// Unhashable values (lists, dicts, instances) are rejected with a
/// `TypeError` at insertion time by `object::make_dict` and subscript
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Tuple(Vec<DictKey>),
}

impl DictKey {
    /// Convert a key back into an ordinary value.
    pub fn to_value(&self) -> Value {
        match self {
            DictKey::None => Value::None,
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(i) => Value::Int(*i),
            DictKey::Str(s) => Value::Str(s.clone()),
            DictKey::Tuple(items) => Value::Tuple(items.iter().map(DictKey::to_value).collect()),
        }
    }
}

/// Class object: name, base classes and attribute table.
#[derive(Debug)]
pub struct ClassObj {
    pub name: String,
    pub bases: Vec<Rc<ClassObj>>,
    pub attrs: RefCell<Namespace>,
}

impl ClassObj {
    pub fn new(name: impl Into<String>, bases: Vec<Rc<ClassObj>>) -> Rc<ClassObj> {
        Rc::new(ClassObj {
            name: name.into(),
            bases,
            attrs: RefCell::new(Namespace::default()),
        })
    }

    /// Look up an attribute on this class or, depth-first, on its bases.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.attrs.borrow().get(name) {
            return Some(v.clone());
        }
        self.bases.iter().find_map(|b| b.lookup(name))
    }

    /// True if `self` is `target` or derives from it.
    pub fn derives_from(self: &Rc<Self>, target: &Rc<ClassObj>) -> bool {
        if Rc::ptr_eq(self, target) {
            return true;
        }
        self.bases.iter().any(|b| b.derives_from(target))
    }
}

/// Instance of a user-defined class.
#[derive(Debug)]
pub struct InstanceObj {
    pub class: Rc<ClassObj>,
    pub attrs: RefCell<Namespace>,
}

/// Module object: the attribute view of an evaluated module.
#[derive(Debug)]
pub struct ModuleObj {
    pub name: String,
    pub attrs: RefCell<Namespace>,
}

/// Flattened call arguments.
///
/// A leading run of positional values, alternating keyword name/value
/// pairs, and the two out-of-band carriers for caller-side `*seq` and
/// `**map` expansion. The carriers are passed as distinguished trailing
/// slots rather than spliced into the positional run; the callee's binder
/// decides how they land.
pub struct CallArgs<'a> {
    pub positional: &'a [Value],
    pub keywords: &'a [(String, Value)],
    pub star_seq: Option<&'a Value>,
    pub star_map: Option<&'a Value>,
}

impl<'a> CallArgs<'a> {
    /// Positional-only argument run.
    pub fn positional_only(positional: &'a [Value]) -> CallArgs<'a> {
        CallArgs {
            positional,
            keywords: &[],
            star_seq: None,
            star_map: None,
        }
    }

    /// True if no argument of any kind was supplied.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
            && self.keywords.is_empty()
            && self.star_seq.is_none()
            && self.star_map.is_none()
    }
}

/// The calling convention every callable implements.
pub type CallFn = Box<dyn Fn(&CallArgs<'_>) -> CallResult>;

/// Function object produced by compiling a `def` or `lambda`.
pub struct FunctionObj {
    pub name: String,
    pub call: CallFn,
}

impl fmt::Debug for FunctionObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Builtin function object from the registry.
pub struct BuiltinObj {
    pub name: String,
    pub call: CallFn,
}

impl fmt::Debug for BuiltinObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// Collect the full positional run of a call: the leading positional
/// values followed by the elements of the `*seq` carrier, in order.
pub fn collect_positional(args: &CallArgs<'_>) -> Result<Vec<Value>, Failure> {
    let mut out: Vec<Value> = args.positional.to_vec();
    if let Some(seq) = args.star_seq {
        crate::object::iterate::<Failure>(seq, &mut |v| {
            out.push(v);
            Ok(())
        })?;
    }
    Ok(out)
}
