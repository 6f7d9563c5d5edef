use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

use clap::Parser;
use saltdag::cli::CliArgs;
use saltdag::config::load_and_validate;
use saltdag::errors::SaltdagError;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn cli(config: &Path, data_dir: &Path, extra: &[&str]) -> CliArgs {
    let mut argv: Vec<OsString> = vec!["saltdag".into(), "--config".into(), config.into()];
    argv.push("--data-dir".into());
    argv.push(data_dir.into());
    argv.extend(extra.iter().map(OsString::from));
    CliArgs::try_parse_from(argv).unwrap()
}

#[test]
fn missing_config_file_is_a_configuration_error() {
    let err = load_and_validate("does/not/exist/Saltdag.toml").unwrap_err();
    assert!(matches!(err, SaltdagError::ConfigError(_)));
    assert!(err.to_string().contains("does/not/exist"));
}

#[test]
fn malformed_toml_is_rejected() {
    let file = config_file("[run\nworkers = 2\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SaltdagError::TomlError(_)));
    assert!(err.is_configuration());
}

#[test]
fn wrong_value_types_are_rejected() {
    let file = config_file("[download]\nshards = \"four\"\n");
    assert!(load_and_validate(file.path()).is_err());
}

#[test]
fn semantic_errors_are_reported() {
    let file = config_file("[download]\nn_items = 7\nshards = 2\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SaltdagError::ConfigError(_)));

    let file = config_file("[train]\nlr = nan\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(err.to_string().contains("lr"), "{err}");
}

#[tokio::test]
async fn cli_worker_override_of_zero_is_rejected() {
    let data = tempfile::tempdir().unwrap();
    let file = config_file("");
    let args = cli(file.path(), data.path(), &["--workers", "0"]);

    let err = saltdag::run(args).await.unwrap_err();
    assert!(matches!(err, SaltdagError::InvalidWorkerCount(0)));
}

#[tokio::test]
async fn incomplete_training_config_fails_before_running() {
    let data = tempfile::tempdir().unwrap();
    let file = config_file("[train]\nbatch_size = 8\n");
    let args = cli(file.path(), data.path(), &[]);

    let err = saltdag::run(args).await.unwrap_err();
    assert!(matches!(err, SaltdagError::InvalidParam { .. }), "{err}");
    assert_eq!(std::fs::read_dir(data.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    let data = tempfile::tempdir().unwrap();
    let file = config_file(
        "[train]\nbatch_size = 8\ntest_split = 0.2\nnum_classes = 2\nlr = 0.1\nseed = 1\nepochs = 1\n",
    );
    let args = cli(file.path(), data.path(), &["--dry-run"]);

    let outcome = saltdag::run(args).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(std::fs::read_dir(data.path()).unwrap().count(), 0);
}
