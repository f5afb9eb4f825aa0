//! DockFlow の設定管理
//!
//! イメージ名・バージョン・アーキテクチャ一覧などのデプロイ設定を
//! デフォルト値 → 設定ファイル (YAML) → 環境変数 の順に重ねて解決します。
//! 解決済みの [`DeployConfig`] は不変値として各コンポーネントに渡されます。

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "DOCKFLOW_CONFIG_PATH";

/// カレントディレクトリで探す設定ファイル名（優先順）
const CONFIG_CANDIDATES: [&str; 3] = ["dockflow.local.yaml", "dockflow.yaml", ".dockflow.yaml"];

/// イメージをプッシュするレジストリCLIの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryCli {
    /// `<engine> push <uri>`
    #[default]
    Docker,
    /// `gcloud docker push <uri>`
    Gcloud,
}

impl FromStr for RegistryCli {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(RegistryCli::Docker),
            "gcloud" => Ok(RegistryCli::Gcloud),
            other => Err(format!("unknown registry cli '{}' (expected docker|gcloud)", other)),
        }
    }
}

impl fmt::Display for RegistryCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryCli::Docker => write!(f, "docker"),
            RegistryCli::Gcloud => write!(f, "gcloud"),
        }
    }
}

/// デプロイ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// レジストリ/リポジトリ (例: `gcr.io/google_containers`)
    pub registry: String,
    /// アーキテクチャ接尾辞を付ける前のイメージ名
    pub image_name: String,
    /// canary チャンネルのタグ
    pub canary_version: String,
    /// リリースのタグ
    pub release_version: String,
    /// クロスビルド対象のアーキテクチャ（順序は出力ディレクトリとの対応に使う）
    pub architectures: Vec<String>,
    /// 単一アーキテクチャビルドで使うアーキテクチャ。未指定時はホストから推定
    pub default_arch: Option<String>,
    /// アーキテクチャ別ビルド成果物のルート (`<dist_dir>/<arch>`)
    pub dist_dir: PathBuf,
    /// Dockerfile テンプレート
    pub dockerfile_template: PathBuf,
    /// コンテナエンジンのコマンド (docker, podman など)
    pub engine: String,
    pub registry_cli: RegistryCli,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            registry: "gcr.io/google_containers".to_string(),
            image_name: "dashboard".to_string(),
            canary_version: "canary".to_string(),
            release_version: "v1.0.0".to_string(),
            architectures: ["amd64", "arm", "arm64", "ppc64le", "s390x"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_arch: None,
            dist_dir: PathBuf::from("dist"),
            dockerfile_template: PathBuf::from("Dockerfile.tera"),
            engine: "docker".to_string(),
            registry_cli: RegistryCli::Docker,
        }
    }
}

impl DeployConfig {
    /// 設定を解決する
    ///
    /// `explicit` が指定された場合はそのファイルを必須とし、
    /// 指定がなければ [`find_config_file`] で探索する（見つからなければデフォルト値）。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file()?,
        };

        let mut config = match &path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading deploy config");
                Self::from_file(path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `DOCKFLOW_*` 環境変数で値を上書きする
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_override("DOCKFLOW_REGISTRY") {
            self.registry = v;
        }
        if let Some(v) = env_override("DOCKFLOW_IMAGE_NAME") {
            self.image_name = v;
        }
        if let Some(v) = env_override("DOCKFLOW_CANARY_VERSION") {
            self.canary_version = v;
        }
        if let Some(v) = env_override("DOCKFLOW_RELEASE_VERSION") {
            self.release_version = v;
        }
        if let Some(v) = env_override("DOCKFLOW_ARCHITECTURES") {
            let archs: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if archs.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    key: "DOCKFLOW_ARCHITECTURES".to_string(),
                    value: v,
                    message: "at least one architecture is required".to_string(),
                });
            }
            self.architectures = archs;
        }
        if let Some(v) = env_override("DOCKFLOW_DEFAULT_ARCH") {
            self.default_arch = Some(v);
        }
        if let Some(v) = env_override("DOCKFLOW_DIST_DIR") {
            self.dist_dir = PathBuf::from(v);
        }
        if let Some(v) = env_override("DOCKFLOW_DOCKERFILE_TEMPLATE") {
            self.dockerfile_template = PathBuf::from(v);
        }
        if let Some(v) = env_override("DOCKFLOW_ENGINE") {
            self.engine = v;
        }
        if let Some(v) = env_override("DOCKFLOW_REGISTRY_CLI") {
            self.registry_cli =
                v.parse()
                    .map_err(|message| ConfigError::InvalidOverride {
                        key: "DOCKFLOW_REGISTRY_CLI".to_string(),
                        value: v.clone(),
                        message,
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("registry", &self.registry),
            ("image_name", &self.image_name),
            ("canary_version", &self.canary_version),
            ("release_version", &self.release_version),
            ("engine", &self.engine),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }

        if self.architectures.is_empty() {
            return Err(ConfigError::Invalid(
                "architectures must contain at least one entry".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for arch in &self.architectures {
            if !seen.insert(arch.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "architecture '{}' is listed twice",
                    arch
                )));
            }
        }

        Ok(())
    }

    /// タグを含まないアーキテクチャ別のイメージ参照 (`{registry}/{image_name}-{arch}`)
    pub fn image_base(&self, arch: &str) -> String {
        format!(
            "{}/{}-{}",
            self.registry.trim_end_matches('/'),
            self.image_name,
            arch
        )
    }

    pub fn arch_output_dir(&self, arch: &str) -> PathBuf {
        self.dist_dir.join(arch)
    }

    /// リリースイメージ名の一覧（`architectures` の順）
    pub fn release_image_names(&self) -> Vec<String> {
        self.architectures
            .iter()
            .map(|arch| format!("{}:{}", self.image_base(arch), self.release_version))
            .collect()
    }

    /// 単一アーキテクチャビルドの対象
    pub fn host_arch(&self) -> String {
        self.default_arch
            .clone()
            .unwrap_or_else(|| container_arch(std::env::consts::ARCH).to_string())
    }
}

/// Rust のターゲットアーキテクチャ名をコンテナのプラットフォーム名に変換
pub fn container_arch(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64le",
        "x86" => "386",
        other => other,
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DOCKFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: dockflow.local.yaml, dockflow.yaml, .dockflow.yaml
/// 3. ~/.config/dockflow/dockflow.yaml (グローバル設定)
///
/// どこにもなければ `Ok(None)`（デフォルト設定で動作する）
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_config_file_in(&current_dir) {
        return Ok(Some(path));
    }

    Ok(global_config_path().filter(|path| path.exists()))
}

/// 指定ディレクトリ内で設定ファイルを探す
pub fn find_config_file_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// グローバル設定ファイルのパス
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dockflow").join("dockflow.yaml"))
}
