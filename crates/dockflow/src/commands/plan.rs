use colored::Colorize;
use dockflow_build::{DryRunRunner, ReleaseChannel};
use dockflow_config::DeployConfig;
use dockflow_pipeline::{ImagePlan, PipelineContext, build_pipeline};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct PlanView<'a> {
    pipeline: &'a str,
    channel: String,
    images: Vec<ImageView<'a>>,
    stages: Vec<StageView<'a>>,
}

#[derive(Serialize)]
struct ImageView<'a> {
    arch: &'a str,
    image: &'a str,
    context: String,
}

#[derive(Serialize)]
struct StageView<'a> {
    name: &'a str,
    depends_on: &'a [String],
}

/// ステージ構成を実行せずに表示
pub fn handle(
    config: DeployConfig,
    channel: ReleaseChannel,
    cross: bool,
    push: bool,
    json: bool,
) -> anyhow::Result<()> {
    let plan = ImagePlan::resolve(&config, channel, cross, push)?;
    let ctx = PipelineContext::new(config, Arc::new(DryRunRunner::new()));
    let pipeline = build_pipeline(&plan, &ctx)?;

    let view = PlanView {
        pipeline: pipeline.name(),
        channel: plan.channel.label(),
        images: plan
            .architectures
            .iter()
            .zip(&plan.targets)
            .map(|(arch, target)| ImageView {
                arch,
                image: &target.image_name,
                context: target.context_dir.display().to_string(),
            })
            .collect(),
        stages: pipeline
            .describe()?
            .into_iter()
            .map(|stage| StageView {
                name: stage.name(),
                depends_on: stage.dependencies(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{} {}", "パイプライン:".bold(), view.pipeline.cyan());
    println!();
    println!("{}", "イメージ:".bold());
    for image in &view.images {
        println!(
            "  {} {} ← {}",
            format!("[{}]", image.arch).dimmed(),
            image.image.cyan(),
            image.context
        );
    }
    println!();
    println!("{}", "ステージ (実行順):".bold());
    for stage in &view.stages {
        if stage.depends_on.is_empty() {
            println!("  {} {}", "•".blue(), stage.name);
        } else {
            println!(
                "  {} {} ← {}",
                "•".blue(),
                stage.name,
                stage.depends_on.join(", ")
            );
        }
    }

    Ok(())
}
