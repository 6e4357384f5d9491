//! 配置加载集成测试
//!
//! 测试配置文件加载、校验、合并以及日志配置的转换

use std::path::PathBuf;
use std::time::Duration;

use chips_updater::core::settings::{FileSettingsStore, SettingsStore, UpdateSettings};
use chips_updater::{LoggerConfig, RotationStrategy, UpdateError, UpdaterConfig};
use tempfile::TempDir;

/// 测试从 YAML 文件加载完整配置
#[tokio::test]
async fn test_load_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("updater.yaml");
    tokio::fs::write(
        &path,
        r#"
scheduler:
  main_actions_interval_secs: 30
  sub_actions_interval_secs: 5
logging:
  level: debug
  file_output: true
  log_dir: /var/log/chips
  rotation: hourly
paths:
  install_dir: /data/modules
core:
  current_version: 0.0.29
"#,
    )
    .await
    .unwrap();

    let config = UpdaterConfig::from_file(&path).await.unwrap();

    assert_eq!(config.config_path.as_ref(), Some(&path));
    assert_eq!(config.scheduler.main_interval(), Duration::from_secs(30));
    assert_eq!(config.scheduler.sub_interval(), Duration::from_secs(5));
    assert_eq!(config.scheduler.restart_delay(), Duration::from_secs(10));
    assert_eq!(config.paths.install_dir, PathBuf::from("/data/modules"));
    assert_eq!(config.core.current_version, "0.0.29");
    assert_eq!(config.core.package_prefix, "cleep_");

    // 日志配置转换
    let logger = LoggerConfig::from_log_config(&config.logging);
    assert_eq!(logger.level, "debug");
    assert_eq!(logger.file_output, Some(PathBuf::from("/var/log/chips")));
    assert_eq!(logger.rotation, RotationStrategy::Hourly);
}

/// 测试按扩展名加载 JSON 配置
#[tokio::test]
async fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("updater.json");
    tokio::fs::write(
        &path,
        r#"{"scheduler": {"restart_delay_secs": 2}, "logging": {"json_format": true}}"#,
    )
    .await
    .unwrap();

    let config = UpdaterConfig::from_file(&path).await.unwrap();
    assert_eq!(config.scheduler.restart_delay(), Duration::from_secs(2));
    assert_eq!(config.scheduler.main_actions_interval_secs, 60);
    assert!(config.logging.json_format);
}

/// 测试加载失败和校验失败
#[tokio::test]
async fn test_invalid_config_files() {
    let temp_dir = TempDir::new().unwrap();

    let missing = UpdaterConfig::from_file(temp_dir.path().join("missing.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(missing, UpdateError::ConfigLoadFailed(_)));
    assert_eq!(missing.error_code(), "CONFIG-001");

    let zero = temp_dir.path().join("zero.yaml");
    tokio::fs::write(&zero, "scheduler:\n  sub_actions_interval_secs: 0\n")
        .await
        .unwrap();
    let err = UpdaterConfig::from_file(&zero).await.unwrap_err();
    assert!(matches!(err, UpdateError::InvalidConfigValue { .. }));

    let broken = temp_dir.path().join("broken.yaml");
    tokio::fs::write(&broken, "scheduler: [1, 2").await.unwrap();
    let err = UpdaterConfig::from_file(&broken).await.unwrap_err();
    assert!(matches!(err, UpdateError::Yaml(_)));
}

/// 测试文件配置与命令行覆盖合并
#[tokio::test]
async fn test_merge_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("updater.yaml");
    tokio::fs::write(&path, "logging:\n  level: warn\n").await.unwrap();

    let mut config = UpdaterConfig::from_file(&path).await.unwrap();
    config.merge(UpdaterConfig::builder().log_level("trace").build());

    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.scheduler.main_actions_interval_secs, 60);
}

/// 测试设置文件的保存和恢复
#[tokio::test]
async fn test_settings_roundtrip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state/updater.json");
    let store = FileSettingsStore::new(&path);

    let mut settings = store.load().await.unwrap();
    assert_eq!(settings, UpdateSettings::default());

    settings.modules_update_enabled = true;
    settings.modules_last_check = Some(1_700_000_000);
    store.save(&settings).await.unwrap();

    let reloaded = FileSettingsStore::new(&path).load().await.unwrap();
    assert_eq!(reloaded, settings);

    let raw: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
    assert_eq!(raw["modules_update_enabled"], true);
}
