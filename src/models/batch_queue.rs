//! 待处理图纸队列
//!
//! 路径与结果按下标一一对应，任何时刻 `paths.len() == results.len()`。

use crate::models::drawing_result::DrawingResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct BatchQueue {
    paths: Vec<PathBuf>,
    results: Vec<DrawingResult>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新的一组图纸替换当前队列
    pub fn select<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.clear();
        for path in paths {
            self.push(path.into());
        }
    }

    /// 追加图纸，已在队列中的路径跳过
    ///
    /// # 返回
    /// 实际追加的数量
    pub fn append<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut added = 0;
        for path in paths {
            let path = path.into();
            if !self.contains(&path) {
                self.push(path);
                added += 1;
            }
        }
        added
    }

    /// 移除指定下标的图纸
    pub fn remove(&mut self, index: usize) -> Option<DrawingResult> {
        if index >= self.paths.len() {
            return None;
        }
        self.paths.remove(index);
        Some(self.results.remove(index))
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.results.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn results(&self) -> &[DrawingResult] {
        &self.results
    }

    pub fn result_mut(&mut self, index: usize) -> Option<&mut DrawingResult> {
        self.results.get_mut(index)
    }

    pub fn into_results(self) -> Vec<DrawingResult> {
        self.results
    }

    fn push(&mut self, path: PathBuf) {
        self.results.push(DrawingResult::pending(&path));
        self.paths.push(path);
    }
}
