use super::RunOptions;
use colored::Colorize;
use dockflow_build::{CommandRunner, DryRunRunner, IoPolicy, ProcessRunner, ReleaseChannel};
use dockflow_config::DeployConfig;
use dockflow_pipeline::{
    ImagePlan, PipelineContext, PipelineReport, StageFailure, StageState, build_pipeline,
};
use std::sync::Arc;

/// build / push / release コマンドを処理
pub async fn handle(
    config: DeployConfig,
    channel: ReleaseChannel,
    cross: bool,
    push: bool,
    options: RunOptions,
) -> anyhow::Result<()> {
    let plan = ImagePlan::resolve(&config, channel, cross, push)?;

    let action = if push { "ビルドしてプッシュ" } else { "ビルド" };
    println!(
        "{} {} 個のイメージを{}します (チャンネル: {})",
        "→".blue(),
        plan.targets.len(),
        action,
        plan.channel.label().cyan()
    );
    for target in &plan.targets {
        println!(
            "  • {} ← {}",
            target.image_name.cyan(),
            target.context_dir.display()
        );
    }
    println!();

    let dry_run = Arc::new(DryRunRunner::new());
    let runner: Arc<dyn ProcessRunner> = if options.dry_run {
        dry_run.clone()
    } else {
        Arc::new(CommandRunner)
    };
    let io = if options.quiet {
        IoPolicy::Null
    } else {
        IoPolicy::Inherit
    };

    let ctx = PipelineContext::new(config, runner).with_io(io);
    let report = build_pipeline(&plan, &ctx)?
        .with_observer(print_transition)
        .run()
        .await?;

    if options.dry_run {
        println!();
        println!("{}", "実行予定のコマンド (--dry-run):".bold());
        for invocation in dry_run.invocations() {
            println!("  $ {}", invocation);
        }
    }

    println!();
    print_summary(&report);
    let name = report.pipeline().to_string();
    report.into_result()?;

    println!("{} {}", "✓ 完了しました:".green().bold(), name);
    Ok(())
}

fn print_transition(stage: &str, state: &StageState) {
    match state {
        StageState::Running => println!("{} {}", "→".blue(), stage),
        StageState::Succeeded => println!("{} {}", "✓".green(), stage),
        StageState::Failed(StageFailure::Action { message, .. }) => {
            println!("{} {}: {}", "✗".red(), stage, message)
        }
        StageState::Failed(StageFailure::Dependency { dependency }) => println!(
            "{} {} (依存ステージ {} が失敗したためスキップ)",
            "-".yellow(),
            stage,
            dependency
        ),
        StageState::Pending | StageState::Waiting => {}
    }
}

fn print_summary(report: &PipelineReport) {
    if report.succeeded() {
        return;
    }

    println!("{}", "失敗したステージ:".red().bold());
    for (stage, failure) in report.failures() {
        match failure {
            StageFailure::Action {
                exit_code, hint, ..
            } => {
                match exit_code {
                    Some(code) => println!("  {} {} (exit code: {})", "✗".red(), stage, code),
                    None => println!("  {} {}", "✗".red(), stage),
                }
                if let Some(hint) = hint {
                    for line in hint.lines() {
                        println!("      {}", line.dimmed());
                    }
                }
            }
            StageFailure::Dependency { dependency } => {
                println!("  {} {} ← {}", "-".yellow(), stage, dependency)
            }
        }
    }
    println!();
}
