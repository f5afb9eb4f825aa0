use crate::error::{BuildError, Result};
use std::path::PathBuf;

/// 1回のイメージビルド: イメージ名とビルドコンテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub image_name: String,
    pub context_dir: PathBuf,
}

impl BuildTarget {
    pub fn new(image_name: impl Into<String>, context_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_name: image_name.into(),
            context_dir: context_dir.into(),
        }
    }
}

/// イメージ名と出力ディレクトリを位置で対応づける
///
/// N 番目のアーキテクチャの名前は N 番目のディレクトリと組になる。
pub fn zip_targets(image_names: Vec<String>, context_dirs: Vec<PathBuf>) -> Result<Vec<BuildTarget>> {
    if image_names.len() != context_dirs.len() {
        return Err(BuildError::TargetMismatch {
            names: image_names.len(),
            dirs: context_dirs.len(),
        });
    }

    Ok(image_names
        .into_iter()
        .zip(context_dirs)
        .map(|(image_name, context_dir)| BuildTarget {
            image_name,
            context_dir,
        })
        .collect())
}
