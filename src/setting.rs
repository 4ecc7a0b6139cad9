use std::marker::PhantomData;

use crate::Error;

/// A named piece of ambient state that can be read and replaced.
///
/// Methods take `&self`: a setting owns whatever interior mutability it
/// needs, so that code running under an override can keep reading the
/// setting while the override holds a reference to it.
///
/// `read` must not have side effects, and writing the same value twice must
/// leave the setting as if it had been written once.
pub trait MutableSetting {
    /// The type of the values held by the setting.
    type Value;

    /// The name of the setting, used in errors and log events.
    fn name(&self) -> &str;

    /// Returns the current value.
    fn read(&self) -> Result<Self::Value, Error>;

    /// Replaces the current value, and returns the value it replaced.
    ///
    /// On error, the setting must be left unchanged.
    fn write(&self, value: Self::Value) -> Result<Self::Value, Error>;
}

impl<S: MutableSetting + ?Sized> MutableSetting for &S {
    type Value = S::Value;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self) -> Result<Self::Value, Error> {
        (**self).read()
    }

    fn write(&self, value: Self::Value) -> Result<Self::Value, Error> {
        (**self).write(value)
    }
}

/// A setting made from a reader and a writer that returns the previous
/// value.  Created with [`from_fns`].
pub struct FnSetting<V, R, W> {
    name: String,
    read: R,
    write: W,
    _value: PhantomData<fn(V) -> V>,
}

/// Makes a setting out of a reader, and a writer that returns the value it
/// replaced.
///
/// ## Example
/// ```rust
/// # use std::cell::Cell;
/// # use dynscope::{setting, with_override, Error, MutableSetting};
/// #
/// # fn main() -> Result<(), Error> {
/// let digits = Cell::new(7);
/// let setting = setting::from_fns(
///     "digits",
///     || Ok(digits.get()),
///     |value| Ok(digits.replace(value)),
/// );
///
/// let seen = with_override(&setting, 3, || setting.read())?;
/// assert_eq!(seen, 3);
/// assert_eq!(digits.get(), 7);
/// #
/// # Ok(())
/// # }
/// ```
pub fn from_fns<V, R, W>(name: impl Into<String>, read: R, write: W) -> FnSetting<V, R, W>
where
    R: Fn() -> Result<V, Error>,
    W: Fn(V) -> Result<V, Error>,
{
    FnSetting {
        name: name.into(),
        read,
        write,
        _value: PhantomData,
    }
}

impl<V, R, W> MutableSetting for FnSetting<V, R, W>
where
    R: Fn() -> Result<V, Error>,
    W: Fn(V) -> Result<V, Error>,
{
    type Value = V;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<V, Error> {
        (self.read)()
    }

    fn write(&self, value: V) -> Result<V, Error> {
        (self.write)(value)
    }
}

/// A setting made from a reader and a writer that does not report the
/// previous value.  Created with [`from_setter`].
pub struct SetterSetting<V, R, S> {
    name: String,
    read: R,
    set: S,
    _value: PhantomData<fn(V) -> V>,
}

/// Makes a setting out of a reader and a plain setter.  The previous value is
/// obtained by reading before every write.
///
/// If the read fails, the setter is not called.
pub fn from_setter<V, R, S>(name: impl Into<String>, read: R, set: S) -> SetterSetting<V, R, S>
where
    R: Fn() -> Result<V, Error>,
    S: Fn(V) -> Result<(), Error>,
{
    SetterSetting {
        name: name.into(),
        read,
        set,
        _value: PhantomData,
    }
}

impl<V, R, S> MutableSetting for SetterSetting<V, R, S>
where
    R: Fn() -> Result<V, Error>,
    S: Fn(V) -> Result<(), Error>,
{
    type Value = V;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<V, Error> {
        (self.read)()
    }

    fn write(&self, value: V) -> Result<V, Error> {
        let previous = (self.read)()?;
        (self.set)(value)?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    #[test]
    fn test_setter_reads_before_writing() -> Result<(), Error> {
        let log = RefCell::new(vec![]);
        let value = Cell::new(1);
        let setting = from_setter(
            "value",
            || {
                log.borrow_mut().push("read");
                Ok(value.get())
            },
            |v| {
                log.borrow_mut().push("set");
                value.set(v);
                Ok(())
            },
        );

        assert_eq!(setting.write(2)?, 1);
        assert_eq!(value.get(), 2);
        assert_eq!(*log.borrow(), vec!["read", "set"]);
        Ok(())
    }

    #[test]
    fn test_setter_skips_set_when_read_fails() {
        let called = Cell::new(false);
        let setting = from_setter(
            "broken",
            || -> Result<i64, Error> { Err(Error::uninitialized("broken")) },
            |_| {
                called.set(true);
                Ok(())
            },
        );
        assert!(setting.write(1).is_err());
        assert!(!called.get());
    }

    #[test]
    fn test_reference_is_a_setting() -> Result<(), Error> {
        let value = Cell::new("a");
        let setting = from_fns("letter", || Ok(value.get()), |v| Ok(value.replace(v)));
        let by_ref = &setting;
        assert_eq!(by_ref.name(), "letter");
        assert_eq!(by_ref.write("b")?, "a");
        assert_eq!(setting.read()?, "b");
        Ok(())
    }
}
