//! Exception hierarchy and the propagation value
//!
//! `BaseException` is the catches-everything root; every builtin exception
//! class sits beneath `Exception`. The classes are ordinary `ClassObj`
//! values, so user code can subclass, rebind and raise them like any other
//! class. One set is built per thread; compiled output is single-threaded,
//! so every module evaluated on a thread shares the same class identities
//! (needed for `except` matching across modules).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::{ClassObj, InstanceObj, Namespace, Value};

/// A propagating language-level exception: the class it matches against
/// plus the instance bound by `except ... as e`.
#[derive(Debug, Clone)]
pub struct Raised {
    pub class: Rc<ClassObj>,
    pub value: Value,
}

impl Raised {
    /// Wrap an existing instance.
    pub fn from_instance(instance: Rc<InstanceObj>) -> Raised {
        Raised {
            class: instance.class.clone(),
            value: Value::Instance(instance),
        }
    }

    /// Build a new instance of `class` carrying `message` as its single
    /// constructor argument.
    pub fn new(class: &Rc<ClassObj>, message: impl Into<String>) -> Raised {
        let instance = Rc::new(InstanceObj {
            class: class.clone(),
            attrs: RefCell::new(Namespace::default()),
        });
        instance.attrs.borrow_mut().insert(
            "args".to_string(),
            Value::tuple(vec![Value::str(message.into())]),
        );
        Raised {
            class: class.clone(),
            value: Value::Instance(instance),
        }
    }

    /// The message carried in the instance's `args` tuple, if any.
    pub fn message(&self) -> Option<String> {
        let Value::Instance(inst) = &self.value else {
            return None;
        };
        let attrs = inst.attrs.borrow();
        let Some(Value::Tuple(args)) = attrs.get("args") else {
            return None;
        };
        args.first().map(crate::object::render)
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}: {}", self.class.name, msg),
            None => write!(f, "{}", self.class.name),
        }
    }
}

/// Why evaluation of compiled code stopped.
///
/// `Exception` is catchable by user `try/except`; `Fault` is an internal
/// host condition that still unwinds through `finally` blocks but never
/// matches an `except` clause.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    #[error("{0}")]
    Exception(Raised),

    #[error("internal fault: {0}")]
    Fault(String),
}

/// Result of invoking a callable or an object-model operation.
pub type CallResult = Result<Value, Failure>;

/// Raise `class` with a message, as a `Failure`.
pub fn throw(class: &Rc<ClassObj>, message: impl Into<String>) -> Failure {
    Failure::Exception(Raised::new(class, message))
}

/// The builtin exception classes.
#[derive(Clone)]
pub struct ExceptionSet {
    pub base_exception: Rc<ClassObj>,
    pub exception: Rc<ClassObj>,
    pub type_error: Rc<ClassObj>,
    pub name_error: Rc<ClassObj>,
    pub value_error: Rc<ClassObj>,
    pub key_error: Rc<ClassObj>,
    pub index_error: Rc<ClassObj>,
    pub attribute_error: Rc<ClassObj>,
    pub zero_division_error: Rc<ClassObj>,
    pub assertion_error: Rc<ClassObj>,
    pub runtime_error: Rc<ClassObj>,
    pub syntax_error: Rc<ClassObj>,
}

impl ExceptionSet {
    fn build() -> ExceptionSet {
        let base_exception = ClassObj::new("BaseException", vec![]);
        let exception = ClassObj::new("Exception", vec![base_exception.clone()]);
        let derive = |name: &str| ClassObj::new(name, vec![exception.clone()]);
        ExceptionSet {
            type_error: derive("TypeError"),
            name_error: derive("NameError"),
            value_error: derive("ValueError"),
            key_error: derive("KeyError"),
            index_error: derive("IndexError"),
            attribute_error: derive("AttributeError"),
            zero_division_error: derive("ZeroDivisionError"),
            assertion_error: derive("AssertionError"),
            runtime_error: derive("RuntimeError"),
            syntax_error: derive("SyntaxError"),
            base_exception,
            exception,
        }
    }
}

thread_local! {
    static CLASSES: ExceptionSet = ExceptionSet::build();
}

/// The per-thread exception class set.
pub fn classes() -> ExceptionSet {
    CLASSES.with(|c| c.clone())
}
