use std::{cell::RefCell, fmt, rc::Rc};

use crate::{Error, MutableSetting};

struct Binding<T> {
    name: String,
    values: RefCell<Vec<T>>,
}

/// A named, dynamically scoped variable.
///
/// Each variable keeps a stack of values.  [`set_scope`](DynamicVar::set_scope)
/// pushes a new binding that shadows the previous one until it is
/// [`unset`](DynamicVar::unset), and [`set`](DynamicVar::set) replaces the
/// innermost binding.  Clones refer to the same variable.
pub struct DynamicVar<T> {
    binding: Rc<Binding<T>>,
}

impl<T> Clone for DynamicVar<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Rc::clone(&self.binding),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicVar")
            .field("name", &self.binding.name)
            .field("values", &self.binding.values.borrow())
            .finish()
    }
}

impl<T> DynamicVar<T> {
    /// Creates a variable with no value.
    pub fn new(name: impl Into<String>) -> Self {
        DynamicVar {
            binding: Rc::new(Binding {
                name: name.into(),
                values: RefCell::new(vec![]),
            }),
        }
    }

    /// Creates a variable with a single, global, binding.
    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        let var = Self::new(name);
        var.binding.values.borrow_mut().push(value);
        var
    }

    pub fn name(&self) -> &str {
        &self.binding.name
    }

    /// Returns true if the variable has a value.
    pub fn boundp(&self) -> bool {
        !self.binding.values.borrow().is_empty()
    }

    /// Returns the number of bindings on the variable's stack.
    pub fn depth(&self) -> usize {
        self.binding.values.borrow().len()
    }

    /// Returns true if `self` and `other` are the same variable.
    pub fn eq(&self, other: &DynamicVar<T>) -> bool {
        Rc::ptr_eq(&self.binding, &other.binding)
    }

    /// Sets a value to `self` in the innermost scope.  The value previously
    /// held by that scope is lost.  If the variable is void, a global binding
    /// is created.
    pub fn set(&self, to_set: T) {
        let mut values = self.binding.values.borrow_mut();
        match values.last_mut() {
            Some(top) => *top = to_set,
            None => values.push(to_set),
        }
    }

    /// Sets a value to `self` in a new scope, such that when it is `unset`,
    /// the previous value becomes active again.
    pub fn set_scope(&self, to_set: T) {
        self.binding.values.borrow_mut().push(to_set);
    }

    /// Unsets the value from the most recent scope.
    ///
    /// Returns an Error if the variable is void.
    pub fn unset(&self) -> Result<(), Error> {
        match self.binding.values.borrow_mut().pop() {
            Some(_) => Ok(()),
            None => Err(self.void()),
        }
    }

    /// Runs `body` with `value` bound to `self` in a new scope.  The binding
    /// is removed when `body` returns or panics.
    ///
    /// Unlike [`with_override`](crate::with_override), this shadows the
    /// current value rather than replacing it, so it also works on a void
    /// variable.
    pub fn let_bind<R>(&self, value: T, body: impl FnOnce() -> R) -> R {
        struct Unbind<'a, T>(&'a DynamicVar<T>);

        impl<T> Drop for Unbind<'_, T> {
            fn drop(&mut self) {
                self.0.binding.values.borrow_mut().pop();
            }
        }

        self.set_scope(value);
        let _unbind = Unbind(self);
        body()
    }

    fn void(&self) -> Error {
        Error::uninitialized(format!(
            "Variable definition is void: {}",
            self.binding.name
        ))
    }
}

impl<T: Clone> DynamicVar<T> {
    /// Gets the value of `self` from the innermost scope.
    ///
    /// Returns an Error if the variable is void.
    pub fn get(&self) -> Result<T, Error> {
        self.binding
            .values
            .borrow()
            .last()
            .cloned()
            .ok_or_else(|| self.void())
    }
}

impl<T: Clone> MutableSetting for DynamicVar<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.binding.name
    }

    fn read(&self) -> Result<T, Error> {
        self.get()
    }

    fn write(&self, value: T) -> Result<T, Error> {
        let mut values = self.binding.values.borrow_mut();
        match values.last_mut() {
            Some(top) => Ok(std::mem::replace(top, value)),
            None => Err(self.void()),
        }
    }
}
