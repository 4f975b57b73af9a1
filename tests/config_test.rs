//! Configuration loading and validation tests.

use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use tunesmith::config::{self, Config};
use tunesmith::AudioFormat;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tunesmith.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.conversion.format, AudioFormat::Mp3);
    assert_eq!(config.conversion.bitrate, 128);
    assert!(config.conversion.max_concurrent >= 1);
    assert_eq!(config.tools.timeout_secs, 3600);
    assert!(config.tools.ffmpeg_path.is_none());
    assert_eq!(config.output.archive_name, "converted.zip");
    assert_eq!(config.output.archive_path(), PathBuf::from("./converted.zip"));
    config::validate_config(&config).unwrap();
}

#[test]
fn empty_file_gives_defaults() {
    let (_dir, path) = write_config("");
    let config = config::load_config(&path).unwrap();
    assert_eq!(config.conversion.format, AudioFormat::Mp3);
    assert_eq!(config.output.archive_name, "converted.zip");
}

#[test]
fn default_params_carry_bitrate() {
    let params = Config::default().conversion.params();
    assert_eq!(params.format, AudioFormat::Mp3);
    assert_eq!(params.bitrate_kbps, Some(128));
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn load_full_config() {
    let (_dir, path) = write_config(
        r#"
[conversion]
format = "flac"
bitrate = 320
max_concurrent = 3

[tools]
timeout_secs = 60

[output]
archive_name = "batch.zip"
dir = "/tmp/out"
"#,
    );

    let config = config::load_config(&path).unwrap();
    assert_eq!(config.conversion.format, AudioFormat::Flac);
    assert_eq!(config.conversion.bitrate, 320);
    assert_eq!(config.conversion.max_concurrent, 3);
    assert_eq!(config.tools.timeout_secs, 60);
    assert_eq!(
        config.output.archive_path(),
        PathBuf::from("/tmp/out/batch.zip")
    );
}

#[test]
fn custom_path_is_used() {
    let (_dir, path) = write_config("[conversion]\nformat = \"ogg\"\n");
    let config = config::load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.conversion.format, AudioFormat::Ogg);
}

#[test]
fn missing_file_is_an_error() {
    let err = config::load_config(&PathBuf::from("/nonexistent/tunesmith.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn unknown_format_is_a_parse_error() {
    let (_dir, path) = write_config("[conversion]\nformat = \"opus\"\n");
    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn zero_concurrency_is_rejected() {
    let (_dir, path) = write_config("[conversion]\nmax_concurrent = 0\n");
    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("max_concurrent"));
}

#[test]
fn zero_timeout_is_rejected() {
    let (_dir, path) = write_config("[tools]\ntimeout_secs = 0\n");
    assert!(config::load_config(&path).is_err());
}

#[test]
fn archive_name_must_be_a_zip_file_name() {
    let mut config = Config::default();

    config.output.archive_name = "  ".into();
    assert!(config::validate_config(&config).is_err());

    config.output.archive_name = "out.tar".into();
    assert!(config::validate_config(&config).is_err());

    config.output.archive_name = "sub/out.zip".into();
    assert!(config::validate_config(&config).is_err());

    config.output.archive_name = "OUT.ZIP".into();
    assert!(config::validate_config(&config).is_ok());
}

#[test]
fn unusual_bitrate_is_only_a_warning() {
    let mut config = Config::default();
    config.conversion.bitrate = 4000;
    assert!(config::validate_config(&config).is_ok());
    assert_eq!(config.conversion.params().bitrate_kbps, Some(4000));
}
