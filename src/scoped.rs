use std::future::Future;

use tracing::{error, trace};

use crate::{Error, MutableSetting};

/// The lifecycle of a single override.
///
/// A guard only exists once installation succeeded, so
/// [`OverrideGuard::phase`] reports `Active`, `Done` or `Failed`.  The
/// earlier phases appear in the `trace` events emitted by
/// [`OverrideGuard::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been written yet.
    Idle,
    /// The new value is being written.
    Installing,
    /// The new value is installed and the previous one is held for
    /// restoration.
    Active,
    /// The previous value is being written back.
    Restoring,
    /// The previous value was restored.
    Done,
    /// Restoring the previous value failed.  The setting's state is unknown.
    Failed,
}

/// What an [`OverrideGuard`] does when it is dropped while still pending and
/// the restoration it then attempts fails.
///
/// The failure is always logged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropFailure {
    /// Panic with the restoration error, unless the thread is already
    /// unwinding, in which case the logged event is all that is emitted.
    #[default]
    Panic,
    /// Abort the process.
    Abort,
}

impl DropFailure {
    pub(crate) fn handle(self, err: &Error) {
        match self {
            DropFailure::Abort => std::process::abort(),
            DropFailure::Panic if !std::thread::panicking() => panic!("{}", err.format()),
            DropFailure::Panic => {}
        }
    }
}

/// An installed override.  Restores the previous value of its setting when
/// [`restore`](OverrideGuard::restore)d or dropped, whichever comes first.
///
/// Guards restore in the order they are released, so they must be released
/// in the reverse order of installation.  Keeping them in local variables
/// does that automatically.
#[must_use = "the override is restored as soon as the guard is dropped"]
pub struct OverrideGuard<'a, S: MutableSetting + ?Sized> {
    setting: &'a S,
    previous: Option<S::Value>,
    phase: Phase,
    on_drop_failure: DropFailure,
}

impl<'a, S: MutableSetting + ?Sized> OverrideGuard<'a, S> {
    /// Installs `value` into `setting`, and returns a guard holding the value
    /// it replaced.
    ///
    /// Returns a `SettingWriteError` if the value could not be installed, in
    /// which case there is nothing to restore.
    pub fn install(setting: &'a S, value: S::Value) -> Result<Self, Error> {
        Self::install_with(setting, value, DropFailure::default())
    }

    /// Same as [`install`](OverrideGuard::install), with an explicit policy
    /// for failures during a restoration triggered by `Drop`.
    pub fn install_with(
        setting: &'a S,
        value: S::Value,
        on_drop_failure: DropFailure,
    ) -> Result<Self, Error> {
        let mut phase = Phase::Idle;
        trace!(setting = setting.name(), ?phase, "installing override");
        phase = Phase::Installing;
        let previous = setting.write(value).map_err(|err| {
            trace!(setting = setting.name(), ?phase, %err, "install failed");
            Error::setting_write_error(format!(
                "unable to install a new value for `{}`: {}",
                setting.name(),
                err
            ))
            .with_trace(setting.name())
        })?;
        phase = Phase::Active;
        trace!(setting = setting.name(), ?phase, "override installed");
        Ok(OverrideGuard {
            setting,
            previous: Some(previous),
            phase,
            on_drop_failure,
        })
    }

    /// Returns the current phase of the override.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the value that will be restored, if restoration is still
    /// pending.
    pub fn previous(&self) -> Option<&S::Value> {
        self.previous.as_ref()
    }

    /// Returns the name of the overridden setting.
    pub fn setting_name(&self) -> &str {
        self.setting.name()
    }

    /// Writes the previous value back into the setting.
    ///
    /// Returns a `RestorationFailure` if the write fails.  The setting is then
    /// in an unknown state and the phase is `Failed`; the restoration is not
    /// retried, and calling `restore` again returns a `RestorationFailure`
    /// without writing.  After a successful restoration, further calls do
    /// nothing.
    pub fn restore(&mut self) -> Result<(), Error> {
        let Some(previous) = self.previous.take() else {
            return match self.phase {
                Phase::Failed => Err(Error::restoration_failure(format!(
                    "an earlier restoration of `{}` failed",
                    self.setting.name()
                ))
                .with_trace(self.setting.name())),
                _ => Ok(()),
            };
        };
        self.phase = Phase::Restoring;
        match self.setting.write(previous) {
            Ok(_) => {
                self.phase = Phase::Done;
                trace!(setting = self.setting.name(), phase = ?self.phase, "override restored");
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Failed;
                error!(
                    setting = self.setting.name(),
                    %err,
                    "unable to restore previous value; ambient state may be inconsistent"
                );
                Err(Error::restoration_failure(format!(
                    "unable to restore the previous value of `{}`: {}",
                    self.setting.name(),
                    err
                ))
                .with_trace(self.setting.name()))
            }
        }
    }
}

impl<S: MutableSetting + ?Sized> Drop for OverrideGuard<'_, S> {
    fn drop(&mut self) {
        if self.previous.is_none() {
            return;
        }
        if let Err(err) = self.restore() {
            self.on_drop_failure.handle(&err);
        }
    }
}

/// Runs `body` with `value` installed in `setting`, then restores the
/// previous value.
///
/// The previous value is restored exactly once: when `body` returns `Ok`,
/// when it returns `Err`, and when it panics.  Errors from `body` are
/// returned unchanged after the restoration.  If the restoration itself
/// fails, its `RestorationFailure` is returned instead, even when `body`
/// failed as well.
///
/// ## Example
/// ```rust
/// # use dynscope::{with_override, DynamicVar, Error};
/// #
/// # fn main() -> Result<(), Error> {
/// let digits = DynamicVar::with_value("digits", 7);
///
/// let shown = with_override(&digits, 3, || digits.get())?;
///
/// assert_eq!(shown, 3);
/// assert_eq!(digits.get()?, 7);
/// #
/// # Ok(())
/// # }
/// ```
pub fn with_override<S, T, E, F>(setting: &S, value: S::Value, body: F) -> Result<T, E>
where
    S: MutableSetting + ?Sized,
    E: From<Error>,
    F: FnOnce() -> Result<T, E>,
{
    let mut guard = OverrideGuard::install(setting, value)?;
    let result = body();
    guard.restore()?;
    result
}

/// Same as [`with_override`], but passes the installed value to `body`, for
/// bodies that need to work on the new value directly rather than find it
/// through the setting.
///
/// ## Example
/// ```rust
/// # use std::{cell::RefCell, rc::Rc};
/// # use dynscope::{with_override_ref, DynamicVar, Error};
/// #
/// # fn main() -> Result<(), Error> {
/// type Sink = Rc<RefCell<Vec<String>>>;
///
/// let output: DynamicVar<Sink> = DynamicVar::with_value("output", Sink::default());
/// let emit = |line: &str| -> Result<(), Error> {
///     output.get()?.borrow_mut().push(line.to_string());
///     Ok(())
/// };
///
/// let captured = with_override_ref(&output, Sink::default(), |sink| {
///     emit("hello")?;
///     emit("world")?;
///     Ok::<_, Error>(sink.borrow().clone())
/// })?;
///
/// assert_eq!(captured, vec!["hello", "world"]);
/// assert!(output.get()?.borrow().is_empty());
/// #
/// # Ok(())
/// # }
/// ```
pub fn with_override_ref<S, T, E, F>(setting: &S, value: S::Value, body: F) -> Result<T, E>
where
    S: MutableSetting + ?Sized,
    S::Value: Clone,
    E: From<Error>,
    F: FnOnce(&S::Value) -> Result<T, E>,
{
    let installed = value.clone();
    let mut guard = OverrideGuard::install(setting, value)?;
    let result = body(&installed);
    guard.restore()?;
    result
}

/// Async version of [`with_override`].
///
/// The override stays installed across every `.await` in the body.  If the
/// returned future is dropped before it completes, the previous value is
/// restored while the future is being dropped.
pub async fn with_override_async<S, T, E, F, Fut>(
    setting: &S,
    value: S::Value,
    body: F,
) -> Result<T, E>
where
    S: MutableSetting + ?Sized,
    E: From<Error>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut guard = OverrideGuard::install(setting, value)?;
    let result = body().await;
    guard.restore()?;
    result
}
