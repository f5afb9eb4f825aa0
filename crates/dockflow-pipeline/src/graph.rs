//! ステージとその依存グラフ

use crate::error::{PipelineError, Result};
use futures_util::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::future::Future;

pub type StageFuture = BoxFuture<'static, anyhow::Result<()>>;

/// ステージの処理。1回の実行で高々1度だけ呼ばれる
pub type StageAction = Box<dyn FnOnce() -> StageFuture + Send>;

/// 名前付きステージ
pub struct Stage {
    name: String,
    dependencies: Vec<String>,
    action: StageAction,
}

impl Stage {
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            action: Box::new(move || Box::pin(action()) as StageFuture),
        }
    }

    pub fn depends_on(mut self, stage: impl Into<String>) -> Self {
        let stage = stage.into();
        if !self.dependencies.contains(&stage) {
            self.dependencies.push(stage);
        }
        self
    }

    pub fn depends_on_all<I, S>(self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        stages
            .into_iter()
            .fold(self, |stage, dep| stage.depends_on(dep))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn into_parts(self) -> (String, Vec<String>, StageAction) {
        (self.name, self.dependencies, self.action)
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// 宣言順を保ったステージ集合
#[derive(Debug, Default)]
pub struct StageGraph {
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stage: Stage) -> Result<()> {
        if self.index.contains_key(stage.name()) {
            return Err(PipelineError::DuplicateStage(stage.name().to_string()));
        }
        self.index.insert(stage.name().to_string(), self.stages.len());
        self.stages.push(stage);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// 依存先インデックス（宣言順のインデックスで表現）
    pub(crate) fn dependency_indices(&self) -> Result<Vec<Vec<usize>>> {
        self.stages
            .iter()
            .map(|stage| {
                stage
                    .dependencies
                    .iter()
                    .map(|dep| {
                        self.index.get(dep).copied().ok_or_else(|| {
                            PipelineError::UnknownDependency {
                                stage: stage.name.clone(),
                                dependency: dep.clone(),
                            }
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// 未知の依存と循環依存を検出し、トポロジカル順を返す
    ///
    /// 同じ深さのステージは宣言順に並ぶ。
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let deps = self.dependency_indices()?;
        let mut in_degree: Vec<usize> = deps.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); self.stages.len()];
        for (stage, stage_deps) in deps.iter().enumerate() {
            for &dep in stage_deps {
                dependents[dep].push(stage);
            }
        }

        let mut queue: VecDeque<usize> = (0..self.stages.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.stages.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != self.stages.len() {
            let cyclic: Vec<&str> = (0..self.stages.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.stages[i].name.as_str())
                .collect();
            return Err(PipelineError::Cycle(cyclic.join(", ")));
        }

        Ok(order)
    }

    pub(crate) fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Stage {
        Stage::new(name, || async { anyhow::Ok(()) })
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut graph = StageGraph::new();
        graph.add(noop("clean")).unwrap();
        let result = graph.add(noop("clean"));
        assert!(matches!(result, Err(PipelineError::DuplicateStage(name)) if name == "clean"));
    }

    #[test]
    fn test_depends_on_dedups() {
        let stage = noop("build").depends_on("render").depends_on_all(["render", "clean"]);
        assert_eq!(stage.dependencies(), ["render", "clean"]);
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let mut graph = StageGraph::new();
        graph.add(noop("push").depends_on("build")).unwrap();
        graph.add(noop("build").depends_on("render")).unwrap();
        graph.add(noop("render").depends_on("clean")).unwrap();
        graph.add(noop("clean")).unwrap();

        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|i| graph.stages()[i].name())
            .collect();
        assert_eq!(order, vec!["clean", "render", "build", "push"]);
    }

    #[test]
    fn test_unknown_dependency() {
        let mut graph = StageGraph::new();
        graph.add(noop("build").depends_on("render")).unwrap();

        match graph.topological_order() {
            Err(PipelineError::UnknownDependency { stage, dependency }) => {
                assert_eq!(stage, "build");
                assert_eq!(dependency, "render");
            }
            other => panic!("Expected UnknownDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = StageGraph::new();
        graph.add(noop("clean")).unwrap();
        graph.add(noop("a").depends_on("b").depends_on("clean")).unwrap();
        graph.add(noop("b").depends_on("a")).unwrap();

        match graph.topological_order() {
            Err(PipelineError::Cycle(names)) => {
                assert!(names.contains('a'));
                assert!(names.contains('b'));
                assert!(!names.contains("clean"));
            }
            other => panic!("Expected Cycle, got {:?}", other),
        }
    }
}
