use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use xymon_config::Config;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` in edition 2024; the mutex keeps
        // tests in this binary from racing on it.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

#[test]
fn malformed_configs_return_aggregated_error() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let cli_path = temp_dir.path().join("cli_xymon.toml");
    let env_path = temp_dir.path().join("env_xymon.toml");

    fs::write(&cli_path, r#"servers = ["xymon.example.org" "backup"]"#)
        .expect("write malformed cli config");
    fs::write(&env_path, "timeout_secs = not_a_number").expect("write malformed env config");

    let _env = EnvOverride::set_var("XYMON_CONFIG_PATH", env_path.as_os_str());

    let args = vec![
        OsString::from("xymon"),
        OsString::from("--config-path"),
        cli_path.clone().into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    let message = error.to_string();
    assert!(
        message.contains("multiple configuration errors"),
        "expected aggregate message, got {message:?}"
    );

    match error.as_ref() {
        OrthoError::Aggregate(aggregate) => {
            let mentioned_paths = aggregate
                .iter()
                .filter_map(|err| match err {
                    OrthoError::File { path, .. } => Some(path.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>();

            assert_eq!(
                mentioned_paths.len(),
                2,
                "expected both failing files to be reported, got {mentioned_paths:?}"
            );
            assert!(mentioned_paths.contains(&cli_path));
            assert!(mentioned_paths.contains(&env_path));
        }
        other => panic!("expected aggregated error, got {other:?}"),
    }
}

#[test]
fn unknown_dispatch_mode_is_rejected() {
    let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("xymon.toml");
    fs::write(&path, "dispatch = \"parallel\"\n").expect("write config");

    let args = vec![
        OsString::from("xymon"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    assert!(Config::load_from_iter(args).is_err());
}
