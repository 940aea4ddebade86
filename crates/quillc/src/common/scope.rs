//! Nested symbol tables shared by the analyzer and the interpreter
//!
//! A frame owns its own bindings and holds a reference-counted handle to
//! its parent; lookup walks outward until the chain is exhausted. The
//! analyzer instantiates this with static bindings, the interpreter with
//! value bindings, so the frame is generic over both binding types.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame
pub type ScopeRef<V, F> = Rc<RefCell<Scope<V, F>>>;

/// One frame of the scope chain: variables keyed by name, functions keyed
/// by (name, arity)
#[derive(Debug)]
pub struct Scope<V, F> {
    variables: HashMap<String, V>,
    functions: HashMap<(String, usize), F>,
    parent: Option<ScopeRef<V, F>>,
}

impl<V: Clone, F: Clone> Scope<V, F> {
    /// Root frame with no parent
    pub fn root() -> ScopeRef<V, F> {
        Rc::new(RefCell::new(Self {
            variables: HashMap::new(),
            functions: HashMap::new(),
            parent: None,
        }))
    }

    /// New child frame referencing (not owning) `parent`
    pub fn child_of(parent: &ScopeRef<V, F>) -> ScopeRef<V, F> {
        Rc::new(RefCell::new(Self {
            variables: HashMap::new(),
            functions: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Define a variable in this frame
    pub fn define_variable(&mut self, name: impl Into<String>, binding: V) -> Result<(), String> {
        let name = name.into();
        if self.variables.contains_key(&name) {
            return Err(format!("variable '{}' already defined in this scope", name));
        }
        self.variables.insert(name, binding);
        Ok(())
    }

    /// Define a function in this frame; identity is (name, arity)
    pub fn define_function(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        binding: F,
    ) -> Result<(), String> {
        let name = name.into();
        if self.functions.contains_key(&(name.clone(), arity)) {
            return Err(format!(
                "function '{}/{}' already defined in this scope",
                name, arity
            ));
        }
        self.functions.insert((name, arity), binding);
        Ok(())
    }

    /// Look up a variable, walking outward through parent frames
    pub fn lookup_variable(&self, name: &str) -> Option<V> {
        if let Some(binding) = self.variables.get(name) {
            Some(binding.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup_variable(name)
        } else {
            None
        }
    }

    /// Look up a function by name and arity, walking outward
    pub fn lookup_function(&self, name: &str, arity: usize) -> Option<F> {
        if let Some(binding) = self.functions.get(&(name.to_string(), arity)) {
            Some(binding.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup_function(name, arity)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let root: ScopeRef<i32, ()> = Scope::root();
        root.borrow_mut().define_variable("x", 1).unwrap();

        let child = Scope::child_of(&root);
        child.borrow_mut().define_variable("y", 2).unwrap();

        assert_eq!(child.borrow().lookup_variable("x"), Some(1));
        assert_eq!(child.borrow().lookup_variable("y"), Some(2));
        assert_eq!(root.borrow().lookup_variable("y"), None);
    }

    #[test]
    fn test_shadowing_resolves_to_innermost() {
        let root: ScopeRef<i32, ()> = Scope::root();
        root.borrow_mut().define_variable("x", 1).unwrap();

        let child = Scope::child_of(&root);
        child.borrow_mut().define_variable("x", 2).unwrap();

        assert_eq!(child.borrow().lookup_variable("x"), Some(2));
        assert_eq!(root.borrow().lookup_variable("x"), Some(1));
    }

    #[test]
    fn test_duplicate_in_same_frame_rejected() {
        let root: ScopeRef<i32, ()> = Scope::root();
        root.borrow_mut().define_variable("x", 1).unwrap();
        assert!(root.borrow_mut().define_variable("x", 2).is_err());
    }

    #[test]
    fn test_functions_keyed_by_arity() {
        let root: ScopeRef<(), i32> = Scope::root();
        root.borrow_mut().define_function("f", 1, 10).unwrap();
        root.borrow_mut().define_function("f", 2, 20).unwrap();

        assert_eq!(root.borrow().lookup_function("f", 1), Some(10));
        assert_eq!(root.borrow().lookup_function("f", 2), Some(20));
        assert_eq!(root.borrow().lookup_function("f", 0), None);
    }
}
