//! Run-time storage for compiled units
//!
//! Module globals (fixed slot array plus dynamic table), the per-call
//! activation frame, and the `Signal` channel that carries every
//! non-local transfer out of compiled closures.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use quill_core::{Builtins, DictKey, Failure, Namespace, Raised, Value};

/// Non-local control transfer out of a compiled closure.
///
/// Loops intercept `Break`/`Continue`, function frames intercept
/// `Return`, `try/except` intercepts `Raise`. `Fault` is an internal host
/// condition: it unwinds through `finally` blocks like everything else
/// but no `except` clause ever matches it.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Break,
    Continue,
    Raise(Raised),
    Fault(String),
}

impl From<Failure> for Signal {
    fn from(f: Failure) -> Signal {
        match f {
            Failure::Exception(r) => Signal::Raise(r),
            Failure::Fault(msg) => Signal::Fault(msg),
        }
    }
}

impl Signal {
    /// Convert back into the call-boundary failure type. Loop-control
    /// signals cannot legally cross a call boundary.
    pub fn into_failure(self) -> Failure {
        match self {
            Signal::Raise(r) => Failure::Exception(r),
            Signal::Fault(msg) => Failure::Fault(msg),
            Signal::Return(_) => Failure::Fault("return signal escaped its frame".into()),
            Signal::Break | Signal::Continue => {
                Failure::Fault("loop control signal escaped its frame".into())
            }
        }
    }
}

/// Result of executing one compiled statement.
pub type ExecOutcome = Result<(), Signal>;
/// Result of evaluating one compiled expression.
pub type EvalOutcome = Result<Value, Signal>;

/// Executable form of a statement.
pub type StmtCode = Rc<dyn Fn(&mut Activation) -> ExecOutcome>;
/// Executable form of an expression.
pub type ExprCode = Rc<dyn Fn(&mut Activation) -> EvalOutcome>;
/// Executable form of a store into some target.
pub type StoreCode = Rc<dyn Fn(&mut Activation, Value) -> ExecOutcome>;

/// Module-level storage.
///
/// Every module-level name known at compile time has exactly one fixed
/// slot, created when the module's executable form is invoked and alive
/// for the module's lifetime. Names introduced only at run time live in
/// the dynamic table. Slots whose name shadows a builtin are seeded with
/// the builtin's value; a `user_bound` flag distinguishes that seed from
/// a user assignment so deletion can tell them apart.
pub struct ModuleGlobals {
    pub name: String,
    names: Vec<String>,
    slots: RefCell<Vec<Value>>,
    user_bound: RefCell<Vec<bool>>,
    dynamic: RefCell<Namespace>,
    pub builtins: Rc<Builtins>,
}

impl ModuleGlobals {
    /// Storage for a statically compiled module.
    pub fn new(name: &str, module_names: &[String], builtins: Rc<Builtins>) -> Rc<ModuleGlobals> {
        let slots: Vec<Value> = module_names
            .iter()
            .map(|n| builtins.lookup(n).unwrap_or(Value::Unbound))
            .collect();
        Rc::new(ModuleGlobals {
            name: name.to_string(),
            names: module_names.to_vec(),
            user_bound: RefCell::new(vec![false; slots.len()]),
            slots: RefCell::new(slots),
            dynamic: RefCell::new(Namespace::default()),
            builtins,
        })
    }

    /// Storage for a dynamically executed unit: no fixed slots, all
    /// writes land in the dynamic table, which is pre-seeded from the
    /// supplied globals mapping.
    pub fn for_dynamic(name: &str, seed: Namespace, builtins: Rc<Builtins>) -> Rc<ModuleGlobals> {
        Rc::new(ModuleGlobals {
            name: name.to_string(),
            names: Vec::new(),
            slots: RefCell::new(Vec::new()),
            user_bound: RefCell::new(Vec::new()),
            dynamic: RefCell::new(seed),
            builtins,
        })
    }

    pub fn slot_names(&self) -> &[String] {
        &self.names
    }

    /// Read a slot; `None` means unbound.
    pub fn read_slot(&self, idx: usize) -> Option<Value> {
        let v = self.slots.borrow()[idx].clone();
        if v.is_unbound() {
            None
        } else {
            Some(v)
        }
    }

    pub fn write_slot(&self, idx: usize, value: Value) {
        self.slots.borrow_mut()[idx] = value;
        self.user_bound.borrow_mut()[idx] = true;
    }

    /// Delete a slot binding. Returns false if the name was not bound by
    /// user code. A slot shadowing a builtin is re-seeded with the
    /// builtin's value, so a subsequent read sees the builtin again.
    pub fn delete_slot(&self, idx: usize) -> bool {
        if !self.user_bound.borrow()[idx] {
            return false;
        }
        let reseed = self
            .builtins
            .lookup(&self.names[idx])
            .unwrap_or(Value::Unbound);
        self.slots.borrow_mut()[idx] = reseed;
        self.user_bound.borrow_mut()[idx] = false;
        true
    }

    /// Dynamic lookup with builtin fallback.
    pub fn read_dynamic(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.dynamic.borrow().get(name) {
            return Some(v.clone());
        }
        self.builtins.lookup(name)
    }

    pub fn write_dynamic(&self, name: &str, value: Value) {
        self.dynamic.borrow_mut().insert(name.to_string(), value);
    }

    pub fn delete_dynamic(&self, name: &str) -> bool {
        self.dynamic.borrow_mut().remove(name).is_some()
    }

    /// All user-bound names and their values: fixed slots bound by user
    /// code first, then the dynamic table.
    pub fn snapshot(&self) -> Namespace {
        let mut out = Namespace::default();
        let slots = self.slots.borrow();
        let bound = self.user_bound.borrow();
        for (i, name) in self.names.iter().enumerate() {
            if bound[i] && !slots[i].is_unbound() {
                out.insert(name.clone(), slots[i].clone());
            }
        }
        for (k, v) in self.dynamic.borrow().iter() {
            out.insert(k.clone(), v.clone());
        }
        out
    }

    /// The snapshot as a dict value, the shape `globals()` returns.
    pub fn as_dict(&self) -> Value {
        namespace_to_dict(&self.snapshot())
    }
}

/// Convert a namespace into a str-keyed dict value.
pub fn namespace_to_dict(ns: &Namespace) -> Value {
    let mut map = FxHashMap::default();
    for (k, v) in ns {
        map.insert(DictKey::Str(k.as_str().into()), v.clone());
    }
    Value::Dict(Rc::new(RefCell::new(map)))
}

/// One executing frame: the module storage it runs against, its local
/// slots (every one `Unbound` until bound), and the class namespace
/// active while a class body executes.
pub struct Activation {
    pub globals: Rc<ModuleGlobals>,
    pub locals: Vec<Value>,
    pub local_names: Rc<[String]>,
    pub class_ns: Option<Rc<RefCell<Namespace>>>,
}

impl Activation {
    /// Frame for a module body (no locals of its own).
    pub fn for_module(globals: Rc<ModuleGlobals>) -> Activation {
        Activation {
            globals,
            locals: Vec::new(),
            local_names: Rc::from(Vec::new()),
            class_ns: None,
        }
    }

    /// Frame with `local_names.len()` unbound local slots.
    pub fn with_locals(globals: Rc<ModuleGlobals>, local_names: Rc<[String]>) -> Activation {
        let locals = vec![Value::Unbound; local_names.len()];
        Activation {
            globals,
            locals,
            local_names,
            class_ns: None,
        }
    }

    /// Bound locals by name, the shape `locals()` returns in a function.
    pub fn locals_namespace(&self) -> Namespace {
        let mut out = Namespace::default();
        for (i, name) in self.local_names.iter().enumerate() {
            if !self.locals[i].is_unbound() {
                out.insert(name.clone(), self.locals[i].clone());
            }
        }
        out
    }
}
