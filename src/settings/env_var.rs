use std::env::{self, VarError};

use crate::{Error, MutableSetting};

/// A variable of the process environment.  The value is `None` while the
/// variable is unset.
///
/// The environment is shared by every thread of the process.  Overrides must
/// not race with other threads reading or writing the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    name: String,
}

impl EnvVar {
    /// Returns an Error if `name` is empty, or contains `=` or a NUL
    /// character.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() || name.contains(['=', '\0']) {
            return Err(Error::invalid_argument(format!(
                "invalid environment variable name: {:?}",
                name
            )));
        }
        Ok(EnvVar { name })
    }
}

impl MutableSetting for EnvVar {
    type Value = Option<String>;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Option<String>, Error> {
        match env::var(&self.name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(Error::invalid_argument(format!(
                "environment variable {} is not valid unicode",
                self.name
            ))),
        }
    }

    fn write(&self, value: Option<String>) -> Result<Option<String>, Error> {
        if value.as_ref().is_some_and(|v| v.contains('\0')) {
            return Err(Error::invalid_argument(format!(
                "value for environment variable {} contains a NUL character",
                self.name
            )));
        }
        let previous = self.read()?;
        // SAFETY: the name and value were checked for the characters that make
        // these calls panic.  Callers are responsible for not touching the
        // environment from other threads while it is being overridden.
        unsafe {
            match value {
                Some(value) => env::set_var(&self.name, value),
                None => env::remove_var(&self.name),
            }
        }
        Ok(previous)
    }
}
