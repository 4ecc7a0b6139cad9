use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    path::PathBuf,
    sync::Mutex,
};

use dynscope::{EnvVar, Error, ErrorKind, MutableSetting, Scope, WorkingDir, with_override};

// The environment and the working directory are shared by all the tests in
// this binary.
static PROCESS: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    PROCESS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn test_env_var() -> Result<(), Error> {
    let _lock = lock();
    let var = EnvVar::new("DYNSCOPE_TEST_ENV_VAR")?;
    var.write(None)?;

    let seen = with_override(&var, Some("on".to_string()), || {
        Ok::<_, Error>(std::env::var("DYNSCOPE_TEST_ENV_VAR").ok())
    })?;
    assert_eq!(seen.as_deref(), Some("on"));
    assert_eq!(var.read()?, None);

    var.write(Some("outer".to_string()))?;
    with_override(&var, None, || {
        assert!(std::env::var_os("DYNSCOPE_TEST_ENV_VAR").is_none());
        Ok::<_, Error>(())
    })?;
    assert_eq!(var.read()?.as_deref(), Some("outer"));
    var.write(None)?;
    Ok(())
}

#[test]
fn test_working_dir() -> Result<(), Error> {
    let _lock = lock();
    let original = WorkingDir.read()?;
    let dir = tempfile::tempdir()?;
    let target = dir.path().canonicalize()?;

    let seen = with_override(&WorkingDir, target.clone(), || {
        Ok::<_, Error>(std::env::current_dir()?.canonicalize()?)
    })?;
    assert_eq!(seen, target);
    assert_eq!(WorkingDir.read()?, original);
    Ok(())
}

#[test]
fn test_working_dir_missing() -> Result<(), Error> {
    let _lock = lock();
    let original = WorkingDir.read()?;
    let dir = tempfile::tempdir()?;
    let missing: PathBuf = dir.path().join("does-not-exist");

    let err = with_override(&WorkingDir, missing, || Ok::<_, Error>(())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SettingWriteError);
    assert_eq!(WorkingDir.read()?, original);
    Ok(())
}

#[test]
fn test_panic_restores_process_state() -> Result<(), Error> {
    let _lock = lock();
    let original = WorkingDir.read()?;
    let var = EnvVar::new("DYNSCOPE_TEST_PANIC")?;
    var.write(None)?;
    let dir = tempfile::tempdir()?;

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut scope = Scope::new();
        scope.set(&var, Some("1".to_string()))?;
        scope.set(&WorkingDir, dir.path().to_path_buf())?;
        if var.read()?.is_some() {
            panic!("interrupted while overridden");
        }
        Ok::<_, Error>(())
    }));

    assert!(result.is_err());
    assert_eq!(var.read()?, None);
    assert_eq!(WorkingDir.read()?, original);
    Ok(())
}
