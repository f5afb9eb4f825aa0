use crate::error::Result;
use crate::naming::validate_reference;
use crate::process::{IoPolicy, ProcessInvocation, ProcessRunner};
use crate::target::BuildTarget;
use futures_util::future::join_all;
use std::sync::Arc;

/// コンテナエンジンの `build` サブコマンドでイメージをビルドする
pub struct ImageBuilder {
    runner: Arc<dyn ProcessRunner>,
    engine: String,
    io: IoPolicy,
}

impl ImageBuilder {
    pub fn new(runner: Arc<dyn ProcessRunner>, engine: impl Into<String>) -> Self {
        Self {
            runner,
            engine: engine.into(),
            io: IoPolicy::Inherit,
        }
    }

    pub fn with_io(mut self, io: IoPolicy) -> Self {
        self.io = io;
        self
    }

    /// `<engine> build --rm=true --tag <image> <context>`
    pub fn build_invocation(&self, target: &BuildTarget) -> ProcessInvocation {
        ProcessInvocation::new(&self.engine)
            .args(["build", "--rm=true", "--tag"])
            .arg(&target.image_name)
            .arg(target.context_dir.to_string_lossy())
            .io(self.io)
    }

    /// イメージを1つビルド
    pub async fn build(&self, target: &BuildTarget) -> Result<()> {
        tracing::info!(
            context = %target.context_dir.display(),
            "Building image: {}",
            target.image_name
        );
        self.runner.run(self.build_invocation(target)).await?;
        tracing::info!("Successfully built: {}", target.image_name);
        Ok(())
    }

    /// 全ターゲットを同時にビルドする
    ///
    /// すべてのビルドが成功した場合のみ成功。失敗した場合はターゲット順で最初のエラーを返す。
    /// 失敗しても他のビルドは中断せず最後まで走らせる（ビルド済みイメージは残る）。
    pub async fn build_all(&self, targets: &[BuildTarget]) -> Result<()> {
        for target in targets {
            validate_reference(&target.image_name)?;
        }

        tracing::debug!(count = targets.len(), "Starting concurrent image builds");
        let results = join_all(targets.iter().map(|target| self.build(target))).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(failed, total = targets.len(), "Image builds failed");
        }

        results.into_iter().collect()
    }
}
