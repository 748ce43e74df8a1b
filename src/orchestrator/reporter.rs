//! 控制台界面层
//!
//! 消费批处理事件，维护每张图纸的显示行，并把进度输出到日志。

use crate::orchestrator::events::{percentage, BatchEvent, RunOutcome};
use crate::utils::logging;
use crate::workflow::OutcomeClass;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

/// 一张图纸在列表中的显示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowView {
    pub drawing_name: String,
    pub status: String,
    pub detail: String,
    pub color: Option<&'static str>,
}

/// 列表与进度条的状态
#[derive(Debug, Clone, Default)]
pub struct ProgressView {
    pub rows: Vec<RowView>,
    pub percent: u32,
    pub title: String,
    pub finished: Option<(usize, usize, PathBuf, RunOutcome)>,
}

impl ProgressView {
    pub fn new<I, S>(drawing_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: drawing_names
                .into_iter()
                .map(|name| RowView {
                    drawing_name: name.into(),
                    ..Default::default()
                })
                .collect(),
            percent: 0,
            title: "Ready".to_string(),
            finished: None,
        }
    }

    /// 应用一条事件
    pub fn apply(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Progress {
                position,
                total,
                drawing_name,
            } => {
                self.percent = percentage(*position, *total);
                self.title = format!("Processing: {} ({}/{})", drawing_name, position, total);
                info!("📊 {}% {}", self.percent, self.title);
            }
            BatchEvent::ItemUpdated {
                index,
                status,
                detail,
                class,
            } => {
                let Some(row) = self.rows.get_mut(*index) else {
                    warn!("收到不存在的行更新: {}", index);
                    return;
                };
                row.status = status.clone();
                row.detail = detail.clone();
                row.color = Some(class.color());

                match class {
                    OutcomeClass::Success => info!(
                        "[图纸 {}] ✓ {} | {} | {}",
                        index + 1,
                        row.drawing_name,
                        status,
                        logging::truncate_text(detail, 80)
                    ),
                    OutcomeClass::Error => error!(
                        "[图纸 {}] ❌ {} | {} | {}",
                        index + 1,
                        row.drawing_name,
                        status,
                        detail
                    ),
                }
            }
            BatchEvent::Finished {
                processed,
                total,
                log_path,
                outcome,
            } => {
                self.title = "Complete".to_string();
                self.finished = Some((*processed, *total, log_path.clone(), outcome.clone()));
            }
        }
    }
}

/// 持续消费事件直到通道关闭
pub async fn run_reporter(mut events: UnboundedReceiver<BatchEvent>, mut view: ProgressView) -> ProgressView {
    while let Some(event) = events.recv().await {
        view.apply(&event);
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn item_update_sets_row_and_color() {
        let mut view = ProgressView::new(["a.dwg", "b.dwg"]);

        view.apply(&BatchEvent::Progress {
            position: 2,
            total: 2,
            drawing_name: "b.dwg".into(),
        });
        view.apply(&BatchEvent::ItemUpdated {
            index: 1,
            status: "ERROR".into(),
            detail: "Failed to open document".into(),
            class: OutcomeClass::Error,
        });

        assert_eq!(view.percent, 100);
        assert_eq!(view.title, "Processing: b.dwg (2/2)");
        assert_eq!(view.rows[0], RowView { drawing_name: "a.dwg".into(), ..Default::default() });
        assert_eq!(view.rows[1].status, "ERROR");
        assert_eq!(view.rows[1].color, Some("LightCoral"));
    }

    #[test]
    fn out_of_range_update_is_ignored() {
        let mut view = ProgressView::new(["a.dwg"]);
        view.apply(&BatchEvent::ItemUpdated {
            index: 4,
            status: "OK".into(),
            detail: String::new(),
            class: OutcomeClass::Success,
        });
        assert_eq!(view.rows.len(), 1);
        assert!(view.rows[0].status.is_empty());
    }

    #[tokio::test]
    async fn reporter_runs_until_channel_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_reporter(rx, ProgressView::new(["a.dwg"])));

        tx.send(BatchEvent::ItemUpdated {
            index: 0,
            status: "OK".into(),
            detail: "3 blocks".into(),
            class: OutcomeClass::Success,
        })
        .unwrap();
        tx.send(BatchEvent::Finished {
            processed: 1,
            total: 1,
            log_path: PathBuf::from("Logs/run.txt"),
            outcome: RunOutcome::Completed,
        })
        .unwrap();
        drop(tx);

        let view = handle.await.unwrap();
        assert_eq!(view.rows[0].color, Some("LightGreen"));
        assert_eq!(view.title, "Complete");
        assert_eq!(
            view.finished,
            Some((1, 1, PathBuf::from("Logs/run.txt"), RunOutcome::Completed))
        );
    }
}
