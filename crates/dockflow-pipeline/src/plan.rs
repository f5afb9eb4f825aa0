//! ビルド/プッシュのステージ構成
//!
//! - 単一アーキテクチャ: `clean → render-dockerfile → build-image → push`
//! - クロスビルド: `clean → render-dockerfile:<arch>`（アーキテクチャごと）`→ build-image → push`
//!
//! `push` はプッシュを要求された場合のみ宣言される。

use crate::error::Result;
use crate::graph::Stage;
use crate::orchestrator::Pipeline;
use crate::render::{DockerfileRenderer, clean_rendered};
use anyhow::Context;
use dockflow_build::{
    BuildTarget, ImageBuilder, ImagePusher, IoPolicy, ProcessRunner, ReleaseChannel,
    channel_image_names, zip_targets,
};
use dockflow_config::DeployConfig;
use std::path::PathBuf;
use std::sync::Arc;

pub const CLEAN: &str = "clean";
pub const RENDER: &str = "render-dockerfile";
pub const BUILD: &str = "build-image";
pub const PUSH: &str = "push";

/// 1回の実行で扱うイメージの一覧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    pub channel: ReleaseChannel,
    pub cross: bool,
    pub push: bool,
    /// ターゲットと同じ順のアーキテクチャ
    pub architectures: Vec<String>,
    pub targets: Vec<BuildTarget>,
}

impl ImagePlan {
    /// 設定とチャンネルからイメージ名とビルドコンテキストを決める
    ///
    /// リリースは常に全アーキテクチャを対象とし、設定のリリースイメージ名を使う。
    pub fn resolve(
        config: &DeployConfig,
        channel: ReleaseChannel,
        cross: bool,
        push: bool,
    ) -> Result<Self> {
        let cross = cross || channel == ReleaseChannel::Release;
        let architectures = if cross {
            config.architectures.clone()
        } else {
            vec![config.host_arch()]
        };

        let image_names = match channel {
            ReleaseChannel::Release => config.release_image_names(),
            _ => channel_image_names(config, &architectures, &channel),
        };
        let context_dirs: Vec<PathBuf> = architectures
            .iter()
            .map(|arch| config.arch_output_dir(arch))
            .collect();

        let targets = zip_targets(image_names, context_dirs)?;
        Ok(Self {
            channel,
            cross,
            push,
            architectures,
            targets,
        })
    }

    pub fn image_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.image_name.clone()).collect()
    }

    pub fn context_dirs(&self) -> Vec<PathBuf> {
        self.targets.iter().map(|t| t.context_dir.clone()).collect()
    }

    /// アーキテクチャに対応するレンダリングステージ名
    pub fn render_stage(&self, arch: &str) -> String {
        if self.cross {
            format!("{}:{}", RENDER, arch)
        } else {
            RENDER.to_string()
        }
    }
}

/// ステージが共有する実行環境
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<DeployConfig>,
    pub runner: Arc<dyn ProcessRunner>,
    pub io: IoPolicy,
}

impl PipelineContext {
    pub fn new(config: DeployConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            io: IoPolicy::Inherit,
        }
    }

    pub fn with_io(mut self, io: IoPolicy) -> Self {
        self.io = io;
        self
    }

    fn builder(&self) -> ImageBuilder {
        ImageBuilder::new(self.runner.clone(), self.config.engine.clone()).with_io(self.io)
    }

    fn pusher(&self) -> ImagePusher {
        ImagePusher::new(self.runner.clone(), self.config.engine.clone())
            .with_registry_cli(self.config.registry_cli)
            .with_io(self.io)
    }
}

/// プランからステージグラフを組み立てる
pub fn build_pipeline(plan: &ImagePlan, ctx: &PipelineContext) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(format!(
        "{}-{}",
        if plan.push { "push" } else { "build" },
        plan.channel.label()
    ));

    let dirs = plan.context_dirs();
    pipeline.add_stage(Stage::new(CLEAN, move || async move {
        let removed = clean_rendered(&dirs)
            .await
            .context("failed to remove rendered Dockerfiles")?;
        tracing::debug!(removed, "Cleaned build contexts");
        anyhow::Ok(())
    }))?;

    let renderer = DockerfileRenderer::new(ctx.config.dockerfile_template.clone());
    let mut render_stages = Vec::with_capacity(plan.targets.len());
    for (arch, target) in plan.architectures.iter().zip(&plan.targets) {
        let name = plan.render_stage(arch);
        let renderer = renderer.clone();
        let arch = arch.clone();
        let target = target.clone();
        pipeline.add_stage(
            Stage::new(name.clone(), move || async move {
                renderer
                    .render_into(&target.context_dir, &arch, &target.image_name)
                    .await
                    .with_context(|| format!("failed to render Dockerfile for {}", arch))?;
                anyhow::Ok(())
            })
            .depends_on(CLEAN),
        )?;
        render_stages.push(name);
    }

    let builder = ctx.builder();
    let targets = plan.targets.clone();
    pipeline.add_stage(
        Stage::new(BUILD, move || async move {
            builder.build_all(&targets).await?;
            anyhow::Ok(())
        })
        .depends_on_all(render_stages),
    )?;

    if plan.push {
        let pusher = ctx.pusher();
        let images = plan.image_names();
        pipeline.add_stage(
            Stage::new(PUSH, move || async move {
                pusher.push_all(&images).await?;
                anyhow::Ok(())
            })
            .depends_on(BUILD),
        )?;
    }

    Ok(pipeline)
}
