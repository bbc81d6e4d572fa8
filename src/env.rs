use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::object::Object;

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One scope: a name table plus the link to the scope it was created
/// in. Functions capture the link, so a scope stays alive as long as
/// any closure over it does.
#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<EnvironmentRef>,
    values: HashMap<String, Object>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvironmentRef) -> Self {
        Self {
            enclosing: Some(enclosing),
            values: HashMap::new(),
        }
    }

    /// Binds in this scope, shadowing any outer binding of the same
    /// name. Parameters and loop variables come through here.
    pub fn define(&mut self, name: &str, value: Object) {
        let _ = self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => None,
        }
    }

    /// Updates the nearest binding of `name`; a name bound nowhere in
    /// the chain binds in this scope. This is what lets a closure
    /// mutate variables of its defining scope.
    pub fn assign(&mut self, name: &str, value: Object) {
        if let Some(value) = self.try_assign(name, value) {
            self.define(name, value);
        }
    }

    // Walks outward looking for an existing binding; hands the value
    // back untouched when there is none.
    fn try_assign(&mut self, name: &str, value: Object) -> Option<Object> {
        if self.values.contains_key(name) {
            let _ = self.values.insert(name.to_string(), value);
            return None;
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().try_assign(name, value),
            None => Some(value),
        }
    }

    /// Removes a binding from this scope only; outer bindings of the
    /// same name become visible again. Loops use this to restore their
    /// control variables.
    pub fn delete(&mut self, name: &str) -> Option<Object> {
        self.values.remove(name)
    }
}

impl From<Environment> for EnvironmentRef {
    fn from(env: Environment) -> Self {
        Rc::new(RefCell::new(env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define() {
        let mut env = Environment::new();

        assert_eq!(env.get("foo"), None);
        env.define("foo", Object::Number(42.0));
        assert_eq!(env.get("foo"), Some(Object::Number(42.0)));
        env.define("foo", Object::Null);
        assert_eq!(env.get("foo"), Some(Object::Null));
    }

    #[test]
    fn test_assign_binds_unbound_names_locally() {
        let mut env = Environment::new();

        env.assign("foo", Object::Boolean(true));
        assert_eq!(env.get("foo"), Some(Object::Boolean(true)));
    }

    #[test]
    fn test_get_enclosed() {
        let mut outer = Environment::new();
        outer.define("foo", Object::Boolean(true));

        let inner = Environment::with_enclosing(outer.into());
        assert_eq!(inner.get("foo"), Some(Object::Boolean(true)));
    }

    #[test]
    fn test_define_shadows_enclosed() {
        let mut outer = Environment::new();
        outer.define("foo", Object::Boolean(true));

        let outer = EnvironmentRef::from(outer);
        let mut inner = Environment::with_enclosing(outer.clone());

        inner.define("foo", Object::Null);
        assert_eq!(inner.get("foo"), Some(Object::Null));
        assert_eq!(outer.borrow().get("foo"), Some(Object::Boolean(true)));
    }

    #[test]
    fn test_assign_updates_the_nearest_binding() {
        let mut outer = Environment::new();
        outer.define("x", Object::Number(1.0));

        let outer = EnvironmentRef::from(outer);
        let mut inner = Environment::with_enclosing(outer.clone());

        inner.assign("x", Object::Number(2.0));
        assert!(inner.delete("x").is_none());
        assert_eq!(outer.borrow().get("x"), Some(Object::Number(2.0)));
    }

    #[test]
    fn test_delete_is_local() {
        let mut outer = Environment::new();
        outer.define("x", Object::Number(1.0));

        let outer = EnvironmentRef::from(outer);
        let mut inner = Environment::with_enclosing(outer.clone());
        inner.define("x", Object::Number(2.0));

        assert_eq!(inner.delete("x"), Some(Object::Number(2.0)));
        assert_eq!(inner.get("x"), Some(Object::Number(1.0)));
        assert_eq!(outer.borrow().get("x"), Some(Object::Number(1.0)));
    }
}
