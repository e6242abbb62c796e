use crate::object::Object;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// Environments are shared between the call frame that created them and every closure that
/// captured them.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    store: HashMap<String, Rc<Object>>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Default::default()
    }

    /// A fresh top-level environment, ready to be shared.
    pub fn new_shared() -> Env {
        Rc::new(RefCell::new(Self::new()))
    }

    /// A child scope whose lookups fall back to `outer`.
    pub fn extend(outer: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    /// Binds `key` in this frame only, shadowing any outer binding.
    pub fn set(&mut self, key: &str, value: Rc<Object>) -> Rc<Object> {
        self.store.insert(key.to_string(), Rc::clone(&value));
        value
    }

    pub fn get(&self, key: &str) -> Option<Rc<Object>> {
        match self.store.get(key) {
            Some(value) => Some(Rc::clone(value)),
            None => self.outer.as_ref().and_then(|outer| outer.borrow().get(key)),
        }
    }
}
