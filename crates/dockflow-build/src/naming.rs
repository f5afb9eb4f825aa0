//! イメージ名の決定
//!
//! canary / PR ビルドのイメージ参照を設定とチャンネルから導出します。
//! リリースビルドは [`DeployConfig::release_image_names`] を直接使います。

use crate::args::ChannelArgs;
use crate::error::{BuildError, Result};
use dockflow_config::DeployConfig;

/// リリースチャンネル（1回の実行につき1つ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseChannel {
    Canary,
    Release,
    PullRequest(String),
}

impl ReleaseChannel {
    /// 引数からチャンネルを選ぶ
    ///
    /// # Priority
    /// 1. `--pr <number>`（`--canary` と同時指定でも優先）
    /// 2. `--canary`
    /// 3. デフォルト: canary
    pub fn select(args: &ChannelArgs) -> Self {
        if let Some(pr) = args.pr_number() {
            return ReleaseChannel::PullRequest(pr.to_string());
        }
        ReleaseChannel::Canary
    }

    /// チャンネルに対応するタグ
    pub fn tag<'a>(&'a self, config: &'a DeployConfig) -> &'a str {
        match self {
            ReleaseChannel::Canary => &config.canary_version,
            ReleaseChannel::Release => &config.release_version,
            ReleaseChannel::PullRequest(pr) => pr,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ReleaseChannel::Canary => "canary".to_string(),
            ReleaseChannel::Release => "release".to_string(),
            ReleaseChannel::PullRequest(pr) => format!("pr-{}", pr),
        }
    }
}

/// `{registry}/{image_name}-{arch}:{tag}` 形式のイメージ参照
pub fn image_name(config: &DeployConfig, arch: &str, channel: &ReleaseChannel) -> String {
    format!("{}:{}", config.image_base(arch), channel.tag(config))
}

/// アーキテクチャ一覧に対するイメージ参照（入力と同じ順）
pub fn channel_image_names(
    config: &DeployConfig,
    archs: &[String],
    channel: &ReleaseChannel,
) -> Vec<String> {
    archs
        .iter()
        .map(|arch| image_name(config, arch, channel))
        .collect()
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `ghcr.io/org/app:v1.0` -> `("ghcr.io/org/app", "v1.0")`
/// - `ghcr.io/org/app` -> `("ghcr.io/org/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
pub fn split_image_tag(image: &str) -> (String, String) {
    // タグは最後の / より後ろの : 以降（それ以前の : はレジストリのポート）
    match (image.rfind(':'), image.rfind('/')) {
        (Some(colon), slash) if slash.is_none_or(|slash| colon > slash) => {
            (image[..colon].to_string(), image[colon + 1..].to_string())
        }
        _ => (image.to_string(), "latest".to_string()),
    }
}

/// タグのバリデーション
///
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    for c in tag.chars() {
        if !c.is_ascii_alphanumeric() && c != '.' && c != '-' && c != '_' {
            return Err(BuildError::InvalidTag {
                tag: format!("Invalid character '{}' in tag: {}", c, tag),
            });
        }
    }

    Ok(())
}

/// イメージ参照を検証
///
/// `:` はタグの区切りと、先頭要素（レジストリの `host:port`）以外には使えない。
pub fn validate_reference(reference: &str) -> Result<()> {
    let (name, tag) = split_image_tag(reference);
    let has_registry = name.contains('/');
    let misplaced_colon = name
        .split('/')
        .enumerate()
        .any(|(i, part)| part.contains(':') && (i > 0 || !has_registry));
    if misplaced_colon || name.is_empty() {
        return Err(BuildError::InvalidReference {
            reference: reference.to_string(),
        });
    }
    validate_tag(&tag)
}
