use crate::backtest::model::status_is_active;
use crate::session::dto::Job;
use crate::session::{ApiError, ApiSession};
use crate::AppEvent;
use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// 任务状态来源。生产实现是 ApiSession，测试里换成脚本化假实现。
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError>;
}

#[async_trait]
impl JobStatusSource for ApiSession {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError> {
        self.get_job(job_id).await
    }
}

/// 固定间隔轮询任务直到终态。下一次拉取严格在上一次返回之后才调度，
/// 同一任务不会出现并发轮询；不做退避，也没有轮询次数上限。
/// completed 发一条成功通知，failed 发一条带后端消息的错误通知，
/// 其余终态只记日志。轮询期间的网络错误结束本次跟踪（后端任务不受影响）。
pub async fn poll_job<S: JobStatusSource + ?Sized>(
    source: &S,
    job_id: &str,
    interval: Duration,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Option<Job> {
    let mut polls = 0u32;
    loop {
        let job = match source.fetch_job(job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!("✗ 轮询失败 [{}]: {}", job_id, e);
                let _ = evt_tx.send(AppEvent::Error(format!("任务状态获取失败: {}", e)));
                return None;
            }
        };
        polls += 1;
        let _ = evt_tx.send(AppEvent::JobProgress(job.clone()));

        if status_is_active(&job.status) {
            sleep(interval).await;
            continue;
        }

        match job.status.as_str() {
            "completed" => {
                info!("✓ 任务完成 [{}] (共轮询 {} 次)", job_id, polls);
                let _ = evt_tx.send(AppEvent::Message(format!("✓ 任务完成: {}", job_id)));
            }
            "failed" => {
                let msg = job
                    .message
                    .clone()
                    .unwrap_or_else(|| "未知错误".to_string());
                warn!("✗ 任务失败 [{}]: {}", job_id, msg);
                let _ = evt_tx.send(AppEvent::Error(format!("任务失败: {}", msg)));
            }
            other => {
                info!("○ 任务进入终态 [{}]: {}", job_id, other);
                let _ = evt_tx.send(AppEvent::Log(format!("○ 任务 {} 状态: {}", job_id, other)));
            }
        }
        let _ = evt_tx.send(AppEvent::JobFinished(job.clone()));
        return Some(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        statuses: Mutex<Vec<&'static str>>,
        fetches: AtomicUsize,
        message: Option<String>,
    }

    impl ScriptedSource {
        fn new(statuses: Vec<&'static str>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                fetches: AtomicUsize::new(0),
                message: None,
            }
        }

        fn with_message(statuses: Vec<&'static str>, message: &str) -> Self {
            Self {
                message: Some(message.to_string()),
                ..Self::new(statuses)
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobStatusSource for ScriptedSource {
        async fn fetch_job(&self, job_id: &str) -> Result<Job, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0]
            };
            Ok(Job {
                job_id: job_id.to_string(),
                job_type: "backtest".to_string(),
                status: status.to_string(),
                progress: Some(50.0),
                message: self.message.clone(),
                created_at: None,
                updated_at: None,
                result: None,
            })
        }
    }

    fn channel() -> (
        mpsc::UnboundedSender<AppEvent>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = rx.try_recv() {
            events.push(evt);
        }
        events
    }

    #[tokio::test]
    async fn active_status_schedules_exactly_one_more_fetch() {
        let source = ScriptedSource::new(vec!["running", "completed"]);
        let (tx, _rx) = channel();
        poll_job(&source, "abc", Duration::from_millis(1), &tx).await;
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn terminal_status_stops_without_further_fetches() {
        for status in ["completed", "failed", "cancelled"] {
            let source = ScriptedSource::new(vec![status]);
            let (tx, _rx) = channel();
            poll_job(&source, "abc", Duration::from_millis(1), &tx).await;
            assert_eq!(source.fetch_count(), 1, "status {}", status);
        }
    }

    #[tokio::test]
    async fn completed_run_emits_exactly_one_success_notice() {
        let source = ScriptedSource::new(vec!["pending", "running", "completed"]);
        let (tx, mut rx) = channel();
        let job = poll_job(&source, "abc", Duration::from_millis(1), &tx).await;

        assert_eq!(source.fetch_count(), 3);
        assert_eq!(job.unwrap().status, "completed");

        let events = drain(&mut rx);
        let successes = events
            .iter()
            .filter(|e| matches!(e, AppEvent::Message(_)))
            .count();
        assert_eq!(successes, 1);
        assert!(matches!(events.last(), Some(AppEvent::JobFinished(_))));
    }

    #[tokio::test]
    async fn failed_run_surfaces_backend_message() {
        let source = ScriptedSource::with_message(vec!["failed"], "数据文件缺少 close 列");
        let (tx, mut rx) = channel();
        poll_job(&source, "abc", Duration::from_millis(1), &tx).await;

        let events = drain(&mut rx);
        let error = events.iter().find_map(|e| match e {
            AppEvent::Error(msg) => Some(msg.clone()),
            _ => None,
        });
        assert!(error.unwrap().contains("数据文件缺少 close 列"));
        let successes = events
            .iter()
            .filter(|e| matches!(e, AppEvent::Message(_)))
            .count();
        assert_eq!(successes, 0);
    }

    #[tokio::test]
    async fn unknown_terminal_status_logs_and_finishes() {
        let source = ScriptedSource::new(vec!["cancelled"]);
        let (tx, mut rx) = channel();
        poll_job(&source, "abc", Duration::from_millis(1), &tx).await;

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, AppEvent::Log(msg) if msg.contains("cancelled"))));
        assert!(events
            .iter()
            .any(|e| matches!(e, AppEvent::JobFinished(_))));
    }

    #[tokio::test]
    async fn progress_event_per_poll() {
        let source = ScriptedSource::new(vec!["pending", "running", "running", "completed"]);
        let (tx, mut rx) = channel();
        poll_job(&source, "abc", Duration::from_millis(1), &tx).await;

        let events = drain(&mut rx);
        let progress = events
            .iter()
            .filter(|e| matches!(e, AppEvent::JobProgress(_)))
            .count();
        assert_eq!(progress, 4);
    }
}
