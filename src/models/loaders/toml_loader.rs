use crate::models::job::BatchJob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 图纸文件扩展名
const DRAWING_EXTENSION: &str = "dwg";

/// 从 TOML 文件加载批处理任务
pub async fn load_job(job_file_path: &Path) -> Result<BatchJob> {
    let content = fs::read_to_string(job_file_path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", job_file_path.display()))?;

    let job: BatchJob = toml::from_str(&content)
        .with_context(|| format!("无法解析任务文件: {}", job_file_path.display()))?;

    Ok(job)
}

/// 扫描文件夹中的所有图纸文件（按文件名排序）
pub async fn scan_drawing_folder(folder_path: &Path) -> Result<Vec<PathBuf>> {
    if !folder_path.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path.display());
    }

    let mut drawings = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_drawing = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DRAWING_EXTENSION));
        if is_drawing {
            drawings.push(path);
        }
    }

    drawings.sort();
    tracing::info!(
        "在 {} 中找到 {} 个图纸文件",
        folder_path.display(),
        drawings.len()
    );

    Ok(drawings)
}

/// 汇总任务中的全部图纸：先显式列出的，再追加目录扫描到的
///
/// 重复路径由 `BatchQueue::append` 去除。
pub async fn collect_drawings(job: &BatchJob) -> Result<Vec<PathBuf>> {
    let mut drawings = job.drawings.clone();

    if let Some(folder) = &job.drawing_folder {
        drawings.extend(scan_drawing_folder(folder).await?);
    }

    Ok(drawings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_job_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
script = "C:/lisp/count.lsp"
command = "(c:count-blocks)"
close_after = true
drawings = ["A-101.dwg", "A-102.dwg"]
"#,
        )
        .unwrap();

        let job = load_job(&path).await.unwrap();

        assert_eq!(job.script, Some(PathBuf::from("C:/lisp/count.lsp")));
        assert_eq!(job.command, "(c:count-blocks)");
        assert!(job.close_after);
        assert_eq!(job.drawings.len(), 2);
        assert!(job.drawing_folder.is_none());
    }

    #[tokio::test]
    async fn invalid_manifest_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, "drawings = 3").unwrap();

        let err = load_job(&path).await.unwrap_err();
        assert!(err.to_string().contains("job.toml"));
    }

    #[tokio::test]
    async fn scans_only_drawing_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.dwg", "a.DWG", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let job = BatchJob {
            drawings: vec![PathBuf::from("first.dwg")],
            drawing_folder: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let drawings = collect_drawings(&job).await.unwrap();

        assert_eq!(
            drawings,
            vec![
                PathBuf::from("first.dwg"),
                dir.path().join("a.DWG"),
                dir.path().join("b.dwg"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_drawing_folder(&dir.path().join("missing")).await.is_err());
    }
}
