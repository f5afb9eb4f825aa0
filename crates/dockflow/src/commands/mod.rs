pub mod pipeline;
pub mod plan;

/// パイプライン実行時の共通オプション
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// 外部コマンドを実行せずに表示だけする
    pub dry_run: bool,
    /// 外部コマンドの出力を捨てる
    pub quiet: bool,
}
