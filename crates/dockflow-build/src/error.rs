use thiserror::Error;

/// 外部プロセスの失敗
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}")]
    Failure { command: String, code: i32 },
}

impl ProcessError {
    /// 外部コマンドの終了コード（起動に失敗した場合は None）
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failure { code, .. } => Some(*code),
            ProcessError::Spawn { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(
        "Image names and context directories differ in length ({names} names, {dirs} directories)"
    )]
    TargetMismatch { names: usize, dirs: usize },

    #[error("Invalid image tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Invalid image reference: {reference}")]
    InvalidReference { reference: String },
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::Process(ProcessError::Spawn { command, .. }) => {
                format!(
                    "コマンドを起動できませんでした: {}\n\
                     \n\
                     解決方法:\n\
                     1. コンテナエンジン (docker / podman) がインストールされているか確認してください\n\
                     2. 設定の engine または DOCKFLOW_ENGINE を確認してください",
                    command
                )
            }
            BuildError::Process(ProcessError::Failure { command, code }) => {
                format!(
                    "外部コマンドが失敗しました (exit code: {}): {}\n\
                     \n\
                     上に表示されたコマンドの出力を確認してください。",
                    code, command
                )
            }
            BuildError::TargetMismatch { names, dirs } => {
                format!(
                    "イメージ名 ({} 個) と出力ディレクトリ ({} 個) の数が一致しません。\n\
                     \n\
                     architectures の設定を確認してください。",
                    names, dirs
                )
            }
            BuildError::InvalidReference { reference } => {
                format!(
                    "イメージ参照が不正です: {}\n\
                     \n\
                     registry / image_name の設定を確認してください。",
                    reference
                )
            }
            _ => format!("{}", self),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::Process(e) => e.exit_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
