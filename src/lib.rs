/*!
Dynscope temporarily replaces a piece of ambient state, such as the working
directory, an environment variable, an option table or a dynamically scoped
variable, for the duration of a computation, and guarantees that the previous
value is put back exactly once, however the computation ends.

Ambient state is represented by a [`MutableSetting`], a named `{read, write}`
pair that is passed around explicitly instead of being looked up as a hidden
global.

## Getting started

Here's an example:
*/

/*!
  ```rust
  use dynscope::{with_override, DynamicVar, Error};

  fn main() -> Result<(), Error> {
      // A dynamically scoped variable, with a global value of "A".
      let mode = DynamicVar::with_value("mode", "A");

      // Code deep down the call stack reads the variable directly.
      let current_mode = || mode.get();

      let seen = with_override(&mode, "B", || {
          with_override(&mode, "C", current_mode)
      })?;

      assert_eq!(seen, "C");
      assert_eq!(mode.get()?, "A");
      Ok(())
  }
  ```
*/

/*!
## Next steps

1. [`with_override`] runs a closure with a new value installed, and restores
   the previous one when the closure returns, fails or panics.
   [`with_override_ref`] also hands the installed value to the closure, and
   [`with_override_async`] keeps the override installed across `.await`s.

1. [`OverrideGuard`] is the RAII guard the functions above are built from, and
   [`Scope`] releases a whole group of guards, most recent first.

1. The [`settings`] module has ready-made settings for the process
   environment and working directory, option tables, dynamically scoped
   variables and guarded bindings.  [`setting::from_fns`] and
   [`setting::from_setter`] turn a pair of closures into a setting.

## Logging

Every override emits `tracing` events: `trace` when it is installed or
restored, and `error` when a restoration fails.  Install a subscriber in
the application to see them.
*/

mod error;
pub use error::{Error, ErrorKind};

pub mod setting;
pub use setting::MutableSetting;

mod scoped;
pub use scoped::{
    DropFailure, OverrideGuard, Phase, with_override, with_override_async, with_override_ref,
};

mod scope;
pub use scope::{Scope, with_scope};

pub mod settings;
pub use settings::{
    DynamicVar, EnvVar, Guarded, OptionPatch, OptionSetting, OptionTable, Options, WorkingDir,
};
