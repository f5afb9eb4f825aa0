use crate::error::ProcessError;
use crate::process::{ProcessInvocation, ProcessRunner};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// 指定したイメージ参照を含むコマンドだけ失敗させるランナー
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    failures: HashMap<String, i32>,
    pub(crate) seen: Mutex<Vec<ProcessInvocation>>,
}

impl ScriptedRunner {
    pub(crate) fn failing(arg: &str, code: i32) -> Self {
        let mut failures = HashMap::new();
        failures.insert(arg.to_string(), code);
        Self {
            failures,
            ..Default::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: ProcessInvocation) -> Result<(), ProcessError> {
        self.seen.lock().unwrap().push(invocation.clone());
        tokio::task::yield_now().await;

        let failure = invocation
            .args
            .iter()
            .find_map(|arg| self.failures.get(arg).copied());
        match failure {
            Some(code) => Err(ProcessError::Failure {
                command: invocation.to_string(),
                code,
            }),
            None => Ok(()),
        }
    }
}
