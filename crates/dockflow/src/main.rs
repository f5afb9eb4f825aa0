mod commands;
mod logging;

use clap::{Args, CommandFactory, Parser, Subcommand};
use commands::RunOptions;
use dockflow_build::{ChannelArgs, ReleaseChannel};
use dockflow_config::DeployConfig;
use logging::LogFormat;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dock")]
#[command(about = "マルチアーキテクチャのコンテナイメージをビルドして公開する", long_about = None)]
struct Cli {
    /// 設定ファイル（省略時は dockflow.yaml などを探索）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ログの出力形式
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// 外部コマンドを実行せずに表示する
    #[arg(long, global = true)]
    dry_run: bool,

    /// 外部コマンドの出力を表示しない
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ChannelOpts {
    /// canary タグでビルド（デフォルト）
    #[arg(long)]
    canary: bool,

    /// PR 番号をタグにする。番号がなければ canary
    #[arg(long, value_name = "N", num_args = 0..=1)]
    pr: Option<Option<String>>,

    /// 設定された全アーキテクチャをビルド
    #[arg(long)]
    cross: bool,
}

impl ChannelOpts {
    fn channel(&self) -> ReleaseChannel {
        ReleaseChannel::select(&ChannelArgs::new(self.pr.clone(), self.canary))
    }
}

/// Collect every long/short flag the CLI knows, across all subcommands.
fn known_flags(cmd: &clap::Command, flags: &mut Vec<String>) {
    for arg in cmd.get_arguments() {
        if let Some(long) = arg.get_long() {
            flags.push(format!("--{}", long));
        }
        if let Some(short) = arg.get_short() {
            flags.push(format!("-{}", short));
        }
    }
    for sub in cmd.get_subcommands() {
        known_flags(sub, flags);
    }
}

/// Rewrite `--pr <token>` to `--pr=<token>` when the token looks like a flag
/// but is not one of ours, so it reaches `--pr` as a value instead of failing
/// the parse. Known flags such as `--cross` are left alone.
fn attach_pr_values(args: Vec<OsString>) -> Vec<OsString> {
    let mut flags = vec!["--help".to_string(), "-h".to_string()];
    known_flags(&Cli::command(), &mut flags);

    let mut out = Vec::with_capacity(args.len());
    let mut args = args.into_iter().peekable();
    while let Some(arg) = args.next() {
        if arg == "--" {
            out.push(arg);
            out.extend(args);
            break;
        }
        if arg != "--pr" {
            out.push(arg);
            continue;
        }
        let stray = args.peek().and_then(|next| next.to_str()).is_some_and(|next| {
            let name = next.split('=').next().unwrap_or(next);
            next.starts_with('-') && next != "--" && !flags.iter().any(|flag| flag == name)
        });
        match args.next() {
            Some(value) if stray => {
                let mut joined = OsString::from("--pr=");
                joined.push(value);
                out.push(joined);
            }
            Some(value) => {
                out.push(arg);
                out.push(value);
            }
            None => out.push(arg),
        }
    }
    out
}

#[derive(Subcommand)]
enum Commands {
    /// イメージをビルド
    Build(ChannelOpts),
    /// イメージをビルドしてレジストリにプッシュ
    Push(ChannelOpts),
    /// リリースイメージを全アーキテクチャでビルド
    Release {
        /// ビルド後にプッシュする
        #[arg(long)]
        push: bool,
    },
    /// ステージ構成を表示（実行しない）
    Plan {
        #[command(flatten)]
        channel: ChannelOpts,
        /// push ステージを含める
        #[arg(long)]
        push: bool,
        /// リリースイメージで計画する
        #[arg(long, conflicts_with_all = ["pr", "canary"])]
        release: bool,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(attach_pr_values(std::env::args_os().collect()));
    logging::init(cli.log_format);

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("dockflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = DeployConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Resolved deploy config");

    let options = RunOptions {
        dry_run: cli.dry_run,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Build(opts) => {
            commands::pipeline::handle(config, opts.channel(), opts.cross, false, options).await?;
        }
        Commands::Push(opts) => {
            commands::pipeline::handle(config, opts.channel(), opts.cross, true, options).await?;
        }
        Commands::Release { push } => {
            commands::pipeline::handle(config, ReleaseChannel::Release, true, push, options)
                .await?;
        }
        Commands::Plan {
            channel,
            push,
            release,
            json,
        } => {
            let selected = if release {
                ReleaseChannel::Release
            } else {
                channel.channel()
            };
            commands::plan::handle(config, selected, channel.cross, push, json)?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_unknown_dash_token_attaches_to_pr() {
        assert_eq!(
            attach_pr_values(argv(&["dock", "plan", "--pr", "-x", "--cross"])),
            argv(&["dock", "plan", "--pr=-x", "--cross"])
        );
        assert_eq!(
            attach_pr_values(argv(&["dock", "build", "--pr", "-12"])),
            argv(&["dock", "build", "--pr=-12"])
        );
    }

    #[test]
    fn test_known_flags_after_pr_are_kept() {
        for args in [
            &["dock", "plan", "--pr", "--cross"][..],
            &["dock", "plan", "--pr", "--push"],
            &["dock", "build", "--pr", "-q"],
            &["dock", "build", "--pr", "--config=x.yaml"],
            &["dock", "build", "--pr", "42"],
            &["dock", "build", "--pr"],
        ] {
            assert_eq!(attach_pr_values(argv(args)), argv(args));
        }
    }

    #[test]
    fn test_pr_with_stray_dash_value_parses_as_canary() {
        let cli = Cli::try_parse_from(attach_pr_values(argv(&["dock", "plan", "--pr", "-x"])))
            .unwrap();
        match cli.command {
            Commands::Plan { channel, .. } => {
                assert_eq!(channel.channel(), ReleaseChannel::Canary);
            }
            _ => panic!("expected plan"),
        }
    }
}
