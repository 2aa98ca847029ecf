use duppur::cli::CommonArgs;
use duppur::config::{Config, ConfigError};
use duppur::index::SortMode;
use duppur::progress::ReportInterval;
use duppur::scanner::HashAlgorithm;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config, Config::default());
    let settings = config.validate().unwrap();
    assert_eq!(settings.algorithm, HashAlgorithm::Sha512);
    assert_eq!(settings.sort, SortMode::Hash);
    assert_eq!(settings.interval, ReportInterval::Unbounded);
    assert!(settings.exclusions.is_trivial());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let toml_content = r#"
hash_function = "blake3"
sort = 2
parallel = true
logger_interval_secs = 30
excludes = [".*/\\.git/.*", ".*\\.tmp"]
"#;
    fs::write(&config_path, toml_content).unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.hash_function, "blake3");
    assert!(config.parallel);
    assert!(!config.consolidate_directories);
    let settings = config.validate().unwrap();
    assert_eq!(settings.algorithm, HashAlgorithm::Blake3);
    assert_eq!(settings.sort, SortMode::Path);
    assert_eq!(
        settings.interval,
        ReportInterval::Every(Duration::from_secs(30))
    );
    assert!(settings.exclusions.is_excluded("/repo/.git/HEAD"));
    assert!(!settings.exclusions.is_excluded("/repo/src/main.rs"));
}

#[test]
fn test_config_load_from_env() {
    // A prefix of its own so concurrent runs of the application are unaffected
    std::env::set_var("DUPPUR_CFGTEST_HASH_FUNCTION", "md5");
    std::env::set_var("DUPPUR_CFGTEST_CONSOLIDATE_DIRECTORIES", "true");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("DUPPUR_CFGTEST_"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.hash_function, "md5");
    assert!(config.consolidate_directories);

    std::env::remove_var("DUPPUR_CFGTEST_HASH_FUNCTION");
    std::env::remove_var("DUPPUR_CFGTEST_CONSOLIDATE_DIRECTORIES");
}

#[test]
fn test_explicit_missing_file_rejected() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let err = Config::load(Some(&missing)).unwrap_err();

    assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
}

#[test]
fn test_malformed_file_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "sort = \"not a number\"\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();

    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_cli_overrides_file() {
    let file = Config {
        hash_function: "sha-256".to_string(),
        sort: 0,
        excludes: vec![".*\\.bak".to_string()],
        ..Config::default()
    };
    let args = CommonArgs {
        hash_function: Some("sha-384".to_string()),
        sort: Some(2),
        parallel: true,
        excludes: vec![".*\\.tmp".to_string()],
        ..CommonArgs::default()
    };

    let merged = file.merge_cli(&args);

    assert_eq!(merged.hash_function, "sha-384");
    assert_eq!(merged.sort, 2);
    assert!(merged.parallel);
    assert_eq!(merged.excludes, vec![".*\\.bak", ".*\\.tmp"]);
}

#[test]
fn test_validation_errors() {
    let bad_hash = Config {
        hash_function: "crc32".to_string(),
        ..Config::default()
    };
    assert!(matches!(bad_hash.validate(), Err(ConfigError::Hash(_))));

    let bad_sort = Config {
        sort: 7,
        ..Config::default()
    };
    assert!(matches!(bad_sort.validate(), Err(ConfigError::Sort(_))));

    let bad_pattern = Config {
        excludes: vec!["(".to_string()],
        ..Config::default()
    };
    assert!(matches!(bad_pattern.validate(), Err(ConfigError::Filter(_))));

    let bad_interval = Config {
        logger_interval_secs: Some(0),
        ..Config::default()
    };
    assert!(matches!(
        bad_interval.validate(),
        Err(ConfigError::InvalidInterval)
    ));
}
