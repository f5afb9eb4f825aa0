//! イメージプッシュ処理
//!
//! ビルドしたイメージをレジストリCLI経由でプッシュします。
//! 認証は各CLI側の設定に任せます。

use crate::error::Result;
use crate::naming::validate_reference;
use crate::process::{IoPolicy, ProcessInvocation, ProcessRunner};
use dockflow_config::RegistryCli;
use futures_util::future::join_all;
use std::sync::Arc;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    runner: Arc<dyn ProcessRunner>,
    engine: String,
    registry_cli: RegistryCli,
    io: IoPolicy,
}

impl ImagePusher {
    pub fn new(runner: Arc<dyn ProcessRunner>, engine: impl Into<String>) -> Self {
        Self {
            runner,
            engine: engine.into(),
            registry_cli: RegistryCli::Docker,
            io: IoPolicy::Inherit,
        }
    }

    pub fn with_registry_cli(mut self, registry_cli: RegistryCli) -> Self {
        self.registry_cli = registry_cli;
        self
    }

    pub fn with_io(mut self, io: IoPolicy) -> Self {
        self.io = io;
        self
    }

    /// レジストリCLIごとのプッシュコマンド
    ///
    /// - docker: `<engine> push <uri>`
    /// - gcloud: `gcloud docker push <uri>`
    pub fn push_invocation(&self, image: &str) -> ProcessInvocation {
        let invocation = match self.registry_cli {
            RegistryCli::Docker => ProcessInvocation::new(&self.engine).arg("push"),
            RegistryCli::Gcloud => ProcessInvocation::new("gcloud").args(["docker", "push"]),
        };
        invocation.arg(image).io(self.io)
    }

    /// イメージをレジストリにプッシュ
    ///
    /// # Returns
    /// プッシュ成功時はイメージ参照を返す
    pub async fn push(&self, image: &str) -> Result<String> {
        validate_reference(image)?;

        tracing::info!(cli = %self.registry_cli, "Pushing image: {}", image);
        self.runner.run(self.push_invocation(image)).await?;
        tracing::info!("Pushed: {}", image);

        Ok(image.to_string())
    }

    /// イメージごとに1回ずつ、同時にプッシュする
    ///
    /// 失敗しても他のプッシュは取り消さない（プッシュ済みのイメージはレジストリに残る）。
    pub async fn push_all(&self, images: &[String]) -> Result<Vec<String>> {
        let results = join_all(images.iter().map(|image| self.push(image))).await;
        results.into_iter().collect()
    }
}
