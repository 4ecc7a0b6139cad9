use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use crate::{Error, MutableSetting};

/// Every option of an [`Options`] table.
pub type OptionTable<V> = BTreeMap<String, V>;

/// A set of changes to an [`Options`] table.  `None` removes an option.
pub type OptionPatch<V> = BTreeMap<String, Option<V>>;

/// A shared table of named options.  Clones refer to the same table.
///
/// The table is itself a [`MutableSetting`] whose value is the whole
/// [`OptionTable`]: writing replaces every option and returns the table it
/// replaced.  [`patched`](Options::patched) builds a table with a few options
/// changed, for overriding only those.
#[derive(Debug)]
pub struct Options<V> {
    table: Rc<RefCell<OptionTable<V>>>,
}

impl<V> Clone for Options<V> {
    fn clone(&self) -> Self {
        Self {
            table: Rc::clone(&self.table),
        }
    }
}

impl<V> Default for Options<V> {
    fn default() -> Self {
        Self {
            table: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }
}

impl<V: Clone> Options<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of an option, or `None` if it is not set.
    pub fn get(&self, key: &str) -> Option<V> {
        self.table.borrow().get(key).cloned()
    }

    /// Sets or, with `None`, removes an option.  Returns the value it
    /// replaced.
    pub fn set(&self, key: impl Into<String>, value: Option<V>) -> Option<V> {
        let mut table = self.table.borrow_mut();
        let key = key.into();
        match value {
            Some(value) => table.insert(key, value),
            None => table.remove(&key),
        }
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Returns a copy of the table with `patch` applied.  The table itself is
    /// not changed.
    ///
    /// ## Example
    /// ```rust
    /// # use dynscope::{with_override, Error, MutableSetting, OptionPatch, Options};
    /// #
    /// # fn main() -> Result<(), Error> {
    /// let options = Options::new();
    /// options.set("digits", Some(7));
    /// options.set("warn", Some(0));
    ///
    /// let patch: OptionPatch<i64> = [
    ///     ("digits".to_string(), Some(3)),
    ///     ("warn".to_string(), None),
    /// ].into();
    /// let table = options.patched(patch);
    ///
    /// with_override(&options, table.clone(), || {
    ///     assert_eq!(options.read()?, table);
    ///     assert_eq!(options.get("warn"), None);
    ///     Ok::<_, Error>(())
    /// })?;
    /// assert_eq!(options.get("warn"), Some(0));
    /// #
    /// # Ok(())
    /// # }
    /// ```
    pub fn patched(&self, patch: OptionPatch<V>) -> OptionTable<V> {
        let mut table = self.table.borrow().clone();
        for (key, value) in patch {
            match value {
                Some(value) => table.insert(key, value),
                None => table.remove(&key),
            };
        }
        table
    }

    /// Returns a setting for a single option of this table.
    pub fn option(&self, key: impl Into<String>) -> OptionSetting<V> {
        OptionSetting {
            options: self.clone(),
            key: key.into(),
        }
    }
}

impl<V: Clone> MutableSetting for Options<V> {
    type Value = OptionTable<V>;

    fn name(&self) -> &str {
        "options"
    }

    fn read(&self) -> Result<OptionTable<V>, Error> {
        Ok(self.table.borrow().clone())
    }

    fn write(&self, table: OptionTable<V>) -> Result<OptionTable<V>, Error> {
        Ok(std::mem::replace(&mut *self.table.borrow_mut(), table))
    }
}

/// A single option of an [`Options`] table, as a setting whose value is
/// `None` while the option is unset.
#[derive(Debug, Clone)]
pub struct OptionSetting<V> {
    options: Options<V>,
    key: String,
}

impl<V: Clone> MutableSetting for OptionSetting<V> {
    type Value = Option<V>;

    fn name(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<V>, Error> {
        Ok(self.options.get(&self.key))
    }

    fn write(&self, value: Option<V>) -> Result<Option<V>, Error> {
        Ok(self.options.set(self.key.clone(), value))
    }
}
