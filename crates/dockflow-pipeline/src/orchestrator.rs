//! 依存関係に従ったステージ実行
//!
//! 依存がすべて成功したステージは、他のステージの完了を待たずにすぐ開始します。
//! ステージが1つ終わるたびに、新たに実行可能になったステージを開始します。
//! 依存先が失敗したステージは実行せずに失敗扱いにし、無関係なブランチは最後まで実行します。

use crate::error::{PipelineError, Result};
use crate::graph::{Stage, StageAction, StageGraph};
use dockflow_build::{BuildError, ProcessError};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// ステージの状態
///
/// `Pending → Waiting → Running → {Succeeded | Failed}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Waiting,
    Running,
    Succeeded,
    Failed(StageFailure),
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Succeeded | StageState::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageState::Failed(_))
    }
}

/// ステージが失敗した理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// ステージの処理自体が失敗した
    Action {
        message: String,
        exit_code: Option<i32>,
        /// 利用者向けの対処方法（分かる場合のみ）
        hint: Option<String>,
    },
    /// 依存先が失敗したため実行されなかった
    Dependency { dependency: String },
}

/// 状態遷移の通知先
pub type StageObserver = Arc<dyn Fn(&str, &StageState) + Send + Sync>;

/// 名前付きのステージグラフと、その実行
pub struct Pipeline {
    name: String,
    graph: StageGraph,
    observer: Option<StageObserver>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: StageGraph::new(),
            observer: None,
        }
    }

    pub fn add_stage(&mut self, stage: Stage) -> Result<()> {
        self.graph.add(stage)
    }

    /// ステージの状態遷移ごとに呼ばれるコールバックを設定
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str, &StageState) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// 実行順（トポロジカル順）に並べたステージ
    ///
    /// グラフの検証も兼ねるため、未知の依存や循環があればエラー。
    pub fn describe(&self) -> Result<Vec<&Stage>> {
        let order = self.graph.topological_order()?;
        Ok(order.into_iter().map(|i| &self.graph.stages()[i]).collect())
    }

    /// パイプラインを実行
    ///
    /// グラフが不正な場合はステージを1つも実行せずにエラーを返す。
    /// ステージの失敗はエラーではなく [`PipelineReport`] に記録される。
    #[tracing::instrument(skip(self), fields(pipeline = %self.name, stages = self.graph.len()))]
    pub async fn run(self) -> Result<PipelineReport> {
        let order = self.graph.topological_order()?;
        let deps = self.graph.dependency_indices()?;

        let observer = self.observer;
        let mut names = Vec::with_capacity(self.graph.len());
        let mut actions: Vec<Option<StageAction>> = Vec::with_capacity(self.graph.len());
        for stage in self.graph.into_stages() {
            let (name, _, action) = stage.into_parts();
            names.push(name);
            actions.push(Some(action));
        }

        let mut states = vec![StageState::Pending; names.len()];
        let started = Instant::now();
        let mut running = FuturesUnordered::new();

        loop {
            // 依存先の失敗を伝播（トポロジカル順なので1パスで十分）
            for &i in &order {
                if states[i].is_terminal() {
                    continue;
                }
                if let Some(&failed) = deps[i].iter().find(|&&d| states[d].is_failed()) {
                    let state = StageState::Failed(StageFailure::Dependency {
                        dependency: names[failed].clone(),
                    });
                    tracing::warn!(
                        stage = %names[i],
                        dependency = %names[failed],
                        "Skipping stage because a dependency failed"
                    );
                    transition(&observer, &names[i], &mut states[i], state);
                }
            }

            // 実行可能になったステージを開始し、残りは依存待ちにする
            for &i in &order {
                if !matches!(states[i], StageState::Pending | StageState::Waiting) {
                    continue;
                }
                if !deps[i].iter().all(|&d| states[d] == StageState::Succeeded) {
                    if states[i] == StageState::Pending {
                        transition(&observer, &names[i], &mut states[i], StageState::Waiting);
                    }
                    continue;
                }
                if let Some(action) = actions[i].take() {
                    tracing::debug!(stage = %names[i], in_flight = running.len() + 1, "Starting stage");
                    transition(&observer, &names[i], &mut states[i], StageState::Running);
                    running.push(async move {
                        let stage_started = Instant::now();
                        let result = action().await;
                        (i, result, stage_started.elapsed())
                    });
                }
            }

            let Some((i, result, elapsed)) = running.next().await else {
                break;
            };
            let state = match result {
                Ok(()) => {
                    tracing::info!(
                        stage = %names[i],
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Stage succeeded"
                    );
                    StageState::Succeeded
                }
                Err(e) => {
                    let exit_code = exit_code_of(&e);
                    tracing::error!(stage = %names[i], ?exit_code, "Stage failed: {:#}", e);
                    StageState::Failed(StageFailure::Action {
                        message: format!("{:#}", e),
                        exit_code,
                        hint: user_message_of(&e),
                    })
                }
            };
            transition(&observer, &names[i], &mut states[i], state);
        }

        let report = PipelineReport {
            pipeline: self.name,
            stages: names.into_iter().zip(states).collect(),
        };
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            succeeded = report.succeeded(),
            "Pipeline finished"
        );
        Ok(report)
    }
}

fn transition(observer: &Option<StageObserver>, name: &str, slot: &mut StageState, state: StageState) {
    tracing::trace!(stage = name, from = ?slot, to = ?state, "Stage transition");
    if let Some(observer) = observer {
        observer(name, &state);
    }
    *slot = state;
}

/// エラーチェーンから外部コマンドの終了コードを探す
fn exit_code_of(error: &anyhow::Error) -> Option<i32> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            e.exit_code()
        } else if let Some(e) = cause.downcast_ref::<ProcessError>() {
            e.exit_code()
        } else if let Some(e) = cause.downcast_ref::<PipelineError>() {
            e.exit_code()
        } else {
            None
        }
    })
}

/// エラーチェーンから利用者向けのメッセージを探す
fn user_message_of(error: &anyhow::Error) -> Option<String> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            Some(e.user_message())
        } else if let Some(PipelineError::Build(e)) = cause.downcast_ref::<PipelineError>() {
            Some(e.user_message())
        } else {
            None
        }
    })
}

/// 実行結果。全ステージの最終状態を宣言順に保持する
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pipeline: String,
    stages: Vec<(String, StageState)>,
}

impl PipelineReport {
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn stages(&self) -> &[(String, StageState)] {
        &self.stages
    }

    pub fn state(&self, stage: &str) -> Option<&StageState> {
        self.stages
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, state)| state)
    }

    pub fn succeeded(&self) -> bool {
        self.stages
            .iter()
            .all(|(_, state)| *state == StageState::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StageFailure)> {
        self.stages.iter().filter_map(|(name, state)| match state {
            StageState::Failed(failure) => Some((name.as_str(), failure)),
            _ => None,
        })
    }

    /// 最初に失敗したステージをエラーに変換する
    ///
    /// 処理自体が失敗したステージを優先し、なければ依存失敗のステージを返す。
    pub fn into_result(self) -> Result<()> {
        let mut dependency_failure = None;
        for (stage, state) in self.stages {
            match state {
                StageState::Failed(StageFailure::Action {
                    message, exit_code, ..
                }) => {
                    return Err(PipelineError::StageFailed {
                        stage,
                        cause: message,
                        exit_code,
                    });
                }
                StageState::Failed(StageFailure::Dependency { dependency }) => {
                    dependency_failure.get_or_insert(PipelineError::DependencyFailure {
                        stage,
                        dependency,
                    });
                }
                _ => {}
            }
        }

        match dependency_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
