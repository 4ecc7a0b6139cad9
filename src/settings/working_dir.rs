use std::{env, path::PathBuf};

use crate::{Error, MutableSetting};

/// The working directory of the process.
///
/// Like the environment, the working directory is shared by every thread of
/// the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingDir;

impl MutableSetting for WorkingDir {
    type Value = PathBuf;

    fn name(&self) -> &str {
        "working directory"
    }

    fn read(&self) -> Result<PathBuf, Error> {
        env::current_dir().map_err(|err| {
            Error::os_error(format!("unable to read the working directory: {}", err))
        })
    }

    fn write(&self, value: PathBuf) -> Result<PathBuf, Error> {
        let previous = self.read()?;
        env::set_current_dir(&value).map_err(|err| {
            Error::os_error(format!("unable to change directory to {}: {}", value.display(), err))
        })?;
        Ok(previous)
    }
}
