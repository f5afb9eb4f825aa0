//! DockFlow のパイプライン
//!
//! 名前付きステージを依存関係の順に実行し、イメージのビルドからプッシュまでを組み立てます。

pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod plan;
pub mod render;

pub use error::{PipelineError, RenderError, Result};
pub use graph::{Stage, StageAction, StageFuture, StageGraph};
pub use orchestrator::{Pipeline, PipelineReport, StageFailure, StageObserver, StageState};
pub use plan::{ImagePlan, PipelineContext, build_pipeline};
pub use render::{DOCKERFILE_NAME, DockerfileRenderer, clean_rendered};
