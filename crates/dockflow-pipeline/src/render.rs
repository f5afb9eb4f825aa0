//! Dockerfile のレンダリング
//!
//! Teraテンプレートから各ビルドコンテキストに `Dockerfile` を書き出します。
//! テンプレートで使える変数は `arch` と `image_name` です。

use crate::error::RenderError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tokio::fs;

/// ビルドコンテキストに書き出すファイル名
pub const DOCKERFILE_NAME: &str = "Dockerfile";

pub type Result<T> = std::result::Result<T, RenderError>;

/// テンプレートから Dockerfile を生成する
#[derive(Debug, Clone)]
pub struct DockerfileRenderer {
    template_path: PathBuf,
}

impl DockerfileRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    /// テンプレート文字列を展開
    pub fn render_str(template: &str, arch: &str, image_name: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("arch", arch);
        context.insert("image_name", image_name);
        Ok(Tera::one_off(template, &context, false)?)
    }

    /// `<context_dir>/Dockerfile` を書き出し、そのパスを返す
    pub async fn render_into(
        &self,
        context_dir: &Path,
        arch: &str,
        image_name: &str,
    ) -> Result<PathBuf> {
        if !fs::try_exists(context_dir).await.unwrap_or(false) {
            return Err(RenderError::ContextMissing(context_dir.to_path_buf()));
        }

        let template = match fs::read_to_string(&self.template_path).await {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound(self.template_path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let rendered = Self::render_str(&template, arch, image_name)?;
        let path = context_dir.join(DOCKERFILE_NAME);
        fs::write(&path, rendered).await?;

        tracing::debug!(arch, path = %path.display(), "Rendered Dockerfile");
        Ok(path)
    }
}

/// 以前にレンダリングした Dockerfile を削除
///
/// ビルド成果物そのものには触れない。存在しないディレクトリやファイルは無視する。
/// 削除したファイル数を返す。
pub async fn clean_rendered(context_dirs: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for dir in context_dirs {
        let path = dir.join(DOCKERFILE_NAME);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed rendered Dockerfile");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "FROM scratch\nLABEL arch=\"{{ arch }}\" image=\"{{ image_name }}\"\n";

    fn setup() -> (TempDir, DockerfileRenderer) {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("Dockerfile.tera");
        std::fs::write(&template, TEMPLATE).unwrap();
        (temp, DockerfileRenderer::new(template))
    }

    #[tokio::test]
    async fn test_render_into_writes_dockerfile() {
        let (temp, renderer) = setup();
        let context = temp.path().join("amd64");
        std::fs::create_dir(&context).unwrap();

        let path = renderer
            .render_into(&context, "amd64", "repo/app-amd64:canary")
            .await
            .unwrap();

        assert_eq!(path, context.join("Dockerfile"));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("arch=\"amd64\""));
        assert!(content.contains("image=\"repo/app-amd64:canary\""));
    }

    #[tokio::test]
    async fn test_missing_context_dir() {
        let (temp, renderer) = setup();
        let missing = temp.path().join("arm");

        let result = renderer.render_into(&missing, "arm", "repo/app-arm:canary").await;

        assert!(matches!(result, Err(RenderError::ContextMissing(path)) if path == missing));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let temp = TempDir::new().unwrap();
        let renderer = DockerfileRenderer::new(temp.path().join("nope.tera"));

        let result = renderer.render_into(temp.path(), "amd64", "repo/app:1").await;

        assert!(matches!(result, Err(RenderError::TemplateNotFound(_))));
    }

    #[test]
    fn test_undefined_variable_is_template_error() {
        let result = DockerfileRenderer::render_str("FROM {{ base }}", "amd64", "repo/app:1");
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[tokio::test]
    async fn test_clean_rendered_only_removes_dockerfiles() {
        let temp = TempDir::new().unwrap();
        let amd64 = temp.path().join("amd64");
        let arm = temp.path().join("arm");
        std::fs::create_dir(&amd64).unwrap();
        std::fs::create_dir(&arm).unwrap();
        std::fs::write(amd64.join("Dockerfile"), "FROM scratch").unwrap();
        std::fs::write(amd64.join("app.js"), "console.log(1)").unwrap();

        let removed = clean_rendered(&[amd64.clone(), arm, temp.path().join("missing")])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!amd64.join("Dockerfile").exists());
        assert!(amd64.join("app.js").exists());
    }
}
