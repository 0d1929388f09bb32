use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ShellError;
use crate::models::{BackgroundPolicy, OperatingMode, ServiceSecrets, SpawnConfig};
use crate::services::readiness_probe::ProbeSettings;
use crate::utils::app_paths;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_DEV_SERVER_URL: &str = "http://localhost:5173";
const MODE_ENV: &str = "GUANJIA_MODE";

/// 壳层运行配置
///
/// 缺省值即可直接运行；可选的 JSON 配置文件按字段覆盖，
/// 运行模式还可用环境变量 GUANJIA_MODE 强制指定。
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub operating_mode: OperatingMode,
    pub backend_executable: PathBuf,
    pub storage_path: PathBuf,
    pub secrets: ServiceSecrets,
    /// 后端监听地址，健康检查在此之上拼接路径
    pub base_url: String,
    pub dev_server_url: String,
    pub frontend_dir: PathBuf,
    pub probe: ProbeSettings,
    pub background_policy: BackgroundPolicy,
}

/// 配置文件的磁盘形态，所有字段可缺省
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfigFile {
    pub operating_mode: Option<OperatingMode>,
    pub backend_executable: Option<PathBuf>,
    pub storage_path: Option<PathBuf>,
    pub secrets: Option<ServiceSecrets>,
    pub base_url: Option<String>,
    pub dev_server_url: Option<String>,
    pub frontend_dir: Option<PathBuf>,
    pub probe: Option<ProbeSettings>,
    pub background_policy: Option<BackgroundPolicy>,
}

impl ShellConfig {
    /// 配置文件路径：~/.guanjia-shell/config.json
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".guanjia-shell").join("config.json"))
    }

    /// 加载配置：文件存在则按字段覆盖缺省值，否则纯缺省
    pub fn load() -> Result<Self, ShellError> {
        let file = match Self::config_path() {
            Some(path) if path.exists() => Some(Self::read_file(&path)?),
            _ => None,
        };
        Ok(Self::from_parts(file.unwrap_or_default(), Self::mode_from_env()))
    }

    fn read_file(path: &PathBuf) -> Result<ShellConfigFile, ShellError> {
        let content = fs::read_to_string(path).map_err(|e| ShellError::Config {
            path: path.clone(),
            message: format!("读取失败: {}", e),
        })?;

        serde_json::from_str(&content).map_err(|e| ShellError::Config {
            path: path.clone(),
            message: format!("解析失败: {}", e),
        })
    }

    fn mode_from_env() -> Option<OperatingMode> {
        match std::env::var(MODE_ENV).ok()?.as_str() {
            "production" => Some(OperatingMode::Production),
            "development" => Some(OperatingMode::Development),
            other => {
                tracing::warn!(value = other, "无法识别的 {} 取值, 已忽略", MODE_ENV);
                None
            }
        }
    }

    /// 合并顺序：环境变量 > 配置文件 > 缺省值。
    /// 路径类缺省值依赖最终确定的运行模式，所以先定模式再补其余。
    pub fn from_parts(file: ShellConfigFile, env_mode: Option<OperatingMode>) -> Self {
        let operating_mode = env_mode
            .or(file.operating_mode)
            .unwrap_or(OperatingMode::Production);

        Self {
            operating_mode,
            backend_executable: file
                .backend_executable
                .unwrap_or_else(|| app_paths::default_backend_executable(operating_mode)),
            storage_path: file
                .storage_path
                .unwrap_or_else(app_paths::default_storage_dir),
            secrets: file.secrets.unwrap_or_else(default_secrets),
            base_url: file.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            dev_server_url: file
                .dev_server_url
                .unwrap_or_else(|| DEFAULT_DEV_SERVER_URL.to_string()),
            frontend_dir: file
                .frontend_dir
                .unwrap_or_else(|| app_paths::default_frontend_dir(operating_mode)),
            probe: file.probe.unwrap_or_default(),
            background_policy: file
                .background_policy
                .unwrap_or_else(BackgroundPolicy::platform_default),
        }
    }

    /// 健康检查端点完整地址
    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url.trim_end_matches('/'))
    }

    /// 取出传给 ProcessSupervisor::spawn 的启动配置
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            storage_path: self.storage_path.clone(),
            secrets: self.secrets.clone(),
            operating_mode: self.operating_mode,
        }
    }
}

fn default_secrets() -> ServiceSecrets {
    ServiceSecrets {
        secret_key: "guanjia-secret-key-2024".to_string(),
        jwt_secret_key: "guanjia-jwt-secret-2024".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::from_parts(ShellConfigFile::default(), None);
        assert_eq!(config.operating_mode, OperatingMode::Production);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.health_url(), "http://127.0.0.1:5000/api/health");
        assert_eq!(config.probe.max_attempts, 60);
        assert_eq!(config.probe.interval_ms, 500);
        assert_eq!(config.probe.attempt_timeout_ms, 1000);
    }

    #[test]
    fn test_env_mode_wins_over_file() {
        let file = ShellConfigFile {
            operating_mode: Some(OperatingMode::Production),
            ..Default::default()
        };
        let config = ShellConfig::from_parts(file, Some(OperatingMode::Development));
        assert_eq!(config.operating_mode, OperatingMode::Development);
        // 路径缺省值跟随最终模式
        assert_eq!(
            config.backend_executable,
            app_paths::default_backend_executable(OperatingMode::Development)
        );
    }

    #[test]
    fn test_partial_file_overrides() {
        let file: ShellConfigFile = serde_json::from_str(
            r#"{
                "base_url": "http://127.0.0.1:9000/",
                "probe": { "interval_ms": 200, "max_attempts": 10, "attempt_timeout_ms": 500 }
            }"#,
        )
        .unwrap();

        let config = ShellConfig::from_parts(file, None);
        assert_eq!(config.health_url(), "http://127.0.0.1:9000/api/health");
        assert_eq!(config.probe.max_attempts, 10);
        // 未覆盖的字段保持缺省
        assert_eq!(config.dev_server_url, DEFAULT_DEV_SERVER_URL);
    }

    #[test]
    fn test_load_from_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let file = ShellConfigFile {
            operating_mode: Some(OperatingMode::Development),
            backend_executable: Some(PathBuf::from("/tmp/fake-backend")),
            ..Default::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();

        let parsed = ShellConfig::read_file(&path).unwrap();
        let config = ShellConfig::from_parts(parsed, None);
        assert_eq!(config.operating_mode, OperatingMode::Development);
        assert_eq!(config.backend_executable, PathBuf::from("/tmp/fake-backend"));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ShellConfig::read_file(&path).unwrap_err();
        assert!(matches!(err, ShellError::Config { .. }));
    }
}
