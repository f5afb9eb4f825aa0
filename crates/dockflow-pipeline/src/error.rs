use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{0}' is declared twice")]
    DuplicateStage(String),

    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    #[error("Circular dependency between stages: {0}")]
    Cycle(String),

    #[error("Stage '{stage}' failed: {cause}")]
    StageFailed {
        stage: String,
        cause: String,
        exit_code: Option<i32>,
    },

    #[error("Stage '{stage}' was not run because '{dependency}' failed")]
    DependencyFailure { stage: String, dependency: String },

    #[error(transparent)]
    Build(#[from] dockflow_build::BuildError),
}

impl PipelineError {
    /// 失敗した外部コマンドの終了コード
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::StageFailed { exit_code, .. } => *exit_code,
            PipelineError::Build(e) => e.exit_code(),
            _ => None,
        }
    }
}

/// Dockerfile のレンダリングエラー
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Dockerfile template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextMissing(PathBuf),

    #[error("Template render error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
