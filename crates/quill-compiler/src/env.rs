//! Compile-time fact propagation
//!
//! `ScopeEnv` is the fact set threaded by reference through every nested
//! translation: current context kind, the fixed module name list, the
//! lexically visible locals of the current static scope, the names
//! declared `global` here, and the loop/function nesting flags. Entering a
//! nested construct clones the env and overrides what changes; the inner
//! copy shadows the outer one without destroying it, and the outer env is
//! simply used again on exit. The heavy members are `Rc`-shared, so a
//! clone is cheap. There is no global mutable state.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::scope::{index_locals, ScopeInfo};

/// Compilation context kind, governing identifier storage strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Module,
    Function,
    Class,
}

/// The compile-time fact set.
#[derive(Clone)]
pub struct ScopeEnv {
    pub context: ContextKind,
    /// Fixed, ordered module-level name list; position is the slot index.
    pub module_names: Rc<[String]>,
    /// Names lexically visible as true locals, with their frame indices.
    pub local_index: Rc<FxHashMap<String, usize>>,
    /// Frame-order local names (for `locals()` snapshots and frame size).
    pub local_names: Rc<[String]>,
    /// Names declared `global` in the current scope.
    pub declared_global: Rc<FxHashSet<String>>,
    /// Whether `break`/`continue` are legal here.
    pub in_loop: bool,
    /// Whether `return` is legal here.
    pub in_function: bool,
}

impl ScopeEnv {
    /// Facts for a module body.
    pub fn module(module_names: Rc<[String]>) -> ScopeEnv {
        ScopeEnv {
            context: ContextKind::Module,
            module_names,
            local_index: Rc::new(FxHashMap::default()),
            local_names: Rc::from(Vec::new()),
            declared_global: Rc::new(FxHashSet::default()),
            in_loop: false,
            in_function: false,
        }
    }

    /// Facts for a dynamically executed module unit: the supplied locals'
    /// names are treated as true lexical locals for its extent.
    pub fn exec_unit(module_names: Rc<[String]>, local_names: &[String]) -> ScopeEnv {
        let mut env = ScopeEnv::module(module_names);
        env.local_index = Rc::new(index_locals(local_names));
        env.local_names = Rc::from(local_names.to_vec());
        env
    }

    /// Facts for a function body, from its classification.
    pub fn function(&self, info: &ScopeInfo) -> ScopeEnv {
        ScopeEnv {
            context: ContextKind::Function,
            module_names: self.module_names.clone(),
            local_index: Rc::new(index_locals(&info.locals)),
            local_names: Rc::from(info.locals.clone()),
            declared_global: Rc::new(info.declared_global.clone()),
            in_loop: false,
            in_function: true,
        }
    }

    /// Facts for a class body. The enclosing visible locals remain
    /// visible (class reads fall back to them before module storage);
    /// the context kind and the class's own `global` declarations change,
    /// and the nesting flags reset: a class body is neither a loop body
    /// nor a function body, whatever encloses it.
    pub fn class_body(&self, info: &ScopeInfo) -> ScopeEnv {
        ScopeEnv {
            context: ContextKind::Class,
            declared_global: Rc::new(info.declared_global.clone()),
            in_loop: false,
            in_function: false,
            ..self.clone()
        }
    }

    /// The same facts with `break`/`continue` enabled. Applied to a loop
    /// body only; a loop's `else` suite keeps the enclosing facts.
    pub fn loop_body(&self) -> ScopeEnv {
        ScopeEnv {
            in_loop: true,
            ..self.clone()
        }
    }

    /// Frame index of a lexically visible local.
    pub fn visible(&self, name: &str) -> Option<usize> {
        self.local_index.get(name).copied()
    }

    /// Slot index of a statically known module-level name.
    pub fn module_slot(&self, name: &str) -> Option<usize> {
        self.module_names.iter().position(|n| n == name)
    }

    pub fn is_declared_global(&self, name: &str) -> bool {
        self.declared_global.contains(name)
    }
}
