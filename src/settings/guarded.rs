use std::marker::PhantomData;

use crate::{Error, MutableSetting};

/// A binding that traps every access.
///
/// Reading fails with a `GuardedRead` error carrying `message`, and writing
/// fails with `ReadOnly`.  Useful to catch code that relies on a name it
/// should not use, such as an abbreviation that is easy to shadow.
///
/// ## Example
/// ```rust
/// # use dynscope::{ErrorKind, Guarded, MutableSetting};
/// let t: Guarded<bool> = Guarded::new("T", "use TRUE, not T");
///
/// let err = t.read().unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::GuardedRead);
/// assert_eq!(err.desc(), "T: use TRUE, not T");
/// ```
#[derive(Debug, Clone)]
pub struct Guarded<T> {
    name: String,
    message: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> Guarded<T> {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Guarded {
            name: name.into(),
            message: message.into(),
            _value: PhantomData,
        }
    }
}

impl<T> MutableSetting for Guarded<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<T, Error> {
        Err(Error::guarded_read(format!("{}: {}", self.name, self.message)).with_trace(&self.name))
    }

    fn write(&self, _: T) -> Result<T, Error> {
        Err(Error::read_only(format!("cannot assign to {}", self.name)).with_trace(&self.name))
    }
}
