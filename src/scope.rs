use crate::{DropFailure, Error, MutableSetting, OverrideGuard};

trait Pending {
    fn restore(&mut self) -> Result<(), Error>;
}

impl<S: MutableSetting + ?Sized> Pending for OverrideGuard<'_, S> {
    fn restore(&mut self) -> Result<(), Error> {
        OverrideGuard::restore(self)
    }
}

/// A group of overrides, possibly on different settings, that are released
/// together.
///
/// Overrides are restored in the reverse order of installation, either by
/// [`remove_all`](Scope::remove_all) or when the scope is dropped.  If a
/// restoration triggered by `Drop` fails, the remaining overrides are still
/// restored, and then the scope's [`DropFailure`] policy applies to the first
/// failure.
#[derive(Default)]
pub struct Scope<'a> {
    pending: Vec<Box<dyn Pending + 'a>>,
    on_drop_failure: DropFailure,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope with an explicit policy for failures during a
    /// restoration triggered by `Drop`.
    pub fn with_drop_failure(on_drop_failure: DropFailure) -> Self {
        Scope {
            pending: vec![],
            on_drop_failure,
        }
    }

    /// Installs `value` into `setting` until the scope is released.
    pub fn set<S>(&mut self, setting: &'a S, value: S::Value) -> Result<&mut Self, Error>
    where
        S: MutableSetting + ?Sized + 'a,
        S::Value: 'a,
    {
        let guard = OverrideGuard::install_with(setting, value, self.on_drop_failure)?;
        self.pending.push(Box::new(guard));
        Ok(self)
    }

    /// Returns the number of overrides waiting to be restored.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Restores every pending override, most recent first.
    ///
    /// A failed restoration does not stop the remaining ones.  The first
    /// failure is returned.  If a setting panics while being restored, the
    /// remaining overrides are restored, still most recent first, while the
    /// panic unwinds.
    pub fn remove_all(&mut self) -> Result<(), Error> {
        struct Rest<'s, 'a>(&'s mut Vec<Box<dyn Pending + 'a>>);

        impl Drop for Rest<'_, '_> {
            fn drop(&mut self) {
                // only reached with records left when a restoration panicked;
                // failures are already logged by the guards.
                while let Some(mut pending) = self.0.pop() {
                    let _ = pending.restore();
                }
            }
        }

        let mut rest = Rest(&mut self.pending);
        let mut first_err = None;
        while let Some(mut pending) = rest.0.pop() {
            if let Err(err) = pending.restore() {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.remove_all() {
            self.on_drop_failure.handle(&err);
        }
    }
}

/// Runs `body` with a fresh [`Scope`], and releases everything it installed
/// once `body` returns or panics.
///
/// As with [`with_override`](crate::with_override), a restoration failure is
/// returned in preference to an error from `body`.
///
/// ## Example
/// ```rust
/// # use dynscope::{with_scope, DynamicVar, Error, Options};
/// #
/// # fn main() -> Result<(), Error> {
/// let width = DynamicVar::with_value("width", 80);
/// let options = Options::new();
/// options.set("digits", Some(7));
///
/// let digits = options.option("digits");
/// with_scope(|scope| {
///     scope.set(&width, 40)?.set(&digits, Some(3))?;
///     assert_eq!(width.get()?, 40);
///     assert_eq!(options.get("digits"), Some(3));
///     Ok::<_, Error>(())
/// })?;
///
/// assert_eq!(width.get()?, 80);
/// assert_eq!(options.get("digits"), Some(7));
/// #
/// # Ok(())
/// # }
/// ```
pub fn with_scope<'a, T, E, F>(body: F) -> Result<T, E>
where
    E: From<Error>,
    F: FnOnce(&mut Scope<'a>) -> Result<T, E>,
{
    let mut scope = Scope::new();
    let result = body(&mut scope);
    scope.remove_all()?;
    result
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        panic::{AssertUnwindSafe, catch_unwind},
    };

    use super::*;
    use crate::{DynamicVar, ErrorKind, setting};

    // A setting whose writes start failing once `broken` is set.
    fn flaky<'a>(
        value: &'a Cell<i64>,
        broken: &'a Cell<bool>,
    ) -> impl MutableSetting<Value = i64> + 'a {
        setting::from_fns(
            "flaky",
            move || Ok(value.get()),
            move |v| {
                if broken.get() {
                    Err(Error::os_error("device went away"))
                } else {
                    Ok(value.replace(v))
                }
            },
        )
    }

    #[test]
    fn test_remove_all_is_lifo() -> Result<(), Error> {
        let var = DynamicVar::with_value("var", "A");
        let mut scope = Scope::new();
        scope.set(&var, "B")?;
        scope.set(&var, "C")?;
        assert_eq!(scope.len(), 2);
        assert_eq!(var.get()?, "C");
        scope.remove_all()?;
        assert!(scope.is_empty());
        assert_eq!(var.get()?, "A");
        Ok(())
    }

    #[test]
    fn test_drop_restores() -> Result<(), Error> {
        let var = DynamicVar::with_value("var", 1);
        let other = DynamicVar::with_value("other", 10);
        {
            let mut scope = Scope::new();
            scope.set(&var, 2)?.set(&other, 20)?.set(&var, 3)?;
            assert_eq!((var.get()?, other.get()?), (3, 20));
        }
        assert_eq!((var.get()?, other.get()?), (1, 10));
        Ok(())
    }

    #[test]
    fn test_remove_all_continues_after_failure() {
        let order = RefCell::new(vec![]);
        let first = Cell::new(0);
        let second = Cell::new(0);
        let broken = Cell::new(false);
        let first_setting = setting::from_fns(
            "first",
            || Ok(first.get()),
            |v| {
                order.borrow_mut().push("first");
                Ok(first.replace(v))
            },
        );
        let second_setting = setting::from_fns(
            "second",
            || Ok(second.get()),
            |v| {
                order.borrow_mut().push("second");
                if broken.get() {
                    return Err(Error::os_error("gone"));
                }
                Ok(second.replace(v))
            },
        );

        let mut scope = Scope::new();
        scope.set(&first_setting, 1).unwrap();
        scope.set(&second_setting, 2).unwrap();
        order.borrow_mut().clear();
        broken.set(true);

        let err = scope.remove_all().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RestorationFailure);
        assert_eq!(err.trace(), &["second".to_string()]);
        assert_eq!(*order.borrow(), vec!["second", "first"]);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_with_scope_propagates_body_error() {
        let var = DynamicVar::with_value("var", 1);
        let result: Result<(), Error> = with_scope(|scope| {
            scope.set(&var, 2)?;
            Err(Error::invalid_argument("nope"))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(var.get().unwrap(), 1);
    }

    #[test]
    fn test_drop_with_failing_record_restores_the_rest() {
        let var = DynamicVar::with_value("var", "A");
        let value = Cell::new(1);
        let broken = Cell::new(false);
        let setting = flaky(&value, &broken);

        let mut scope = Scope::new();
        scope.set(&var, "B").unwrap();
        scope.set(&var, "C").unwrap();
        scope.set(&setting, 2).unwrap();
        broken.set(true);

        let result = catch_unwind(AssertUnwindSafe(move || drop(scope)));

        assert!(result.is_err());
        assert_eq!(var.get().unwrap(), "A");
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn test_drop_while_unwinding_keeps_the_original_panic() {
        let var = DynamicVar::with_value("var", "A");
        let value = Cell::new(1);
        let broken = Cell::new(false);
        let setting = flaky(&value, &broken);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut scope = Scope::new();
            scope.set(&var, "B").unwrap();
            scope.set(&setting, 2).unwrap();
            scope.set(&var, "C").unwrap();
            broken.set(true);
            panic!("interrupted");
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"interrupted"));
        assert_eq!(var.get().unwrap(), "A");
    }

    #[test]
    fn test_panicking_restore_still_restores_the_rest() {
        let var = DynamicVar::with_value("var", "A");
        let armed = Cell::new(false);
        let explosive = setting::from_fns(
            "explosive",
            || Ok(0),
            |v: i64| {
                if armed.get() {
                    panic!("write exploded");
                }
                Ok(v)
            },
        );

        let mut scope = Scope::new();
        scope.set(&var, "B").unwrap();
        scope.set(&explosive, 1).unwrap();
        scope.set(&var, "C").unwrap();
        armed.set(true);

        let result = catch_unwind(AssertUnwindSafe(|| scope.remove_all()));

        assert!(result.is_err());
        assert!(scope.is_empty());
        assert_eq!(var.get().unwrap(), "A");
    }
}
