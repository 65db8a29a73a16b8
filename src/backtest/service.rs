use crate::backtest::model::{BacktestForm, BatchForm, JobKind};
use crate::backtest::poller;
use crate::session::ApiSession;
use crate::AppEvent;
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 回测提交入口，同时持有轮询任务的句柄。
/// 同一时刻最多一个轮询任务：新提交先中止旧任务，不留孤儿定时器。
pub struct BacktestService {
    session: Arc<ApiSession>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
    poll_task: Option<JoinHandle<()>>,
    active_job: Option<String>,
}

impl BacktestService {
    pub fn new(session: Arc<ApiSession>, evt_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            session,
            evt_tx,
            poll_task: None,
            active_job: None,
        }
    }

    pub async fn submit_backtest(&mut self, form: &BacktestForm) {
        if let Err(msg) = form.validate() {
            let _ = self.evt_tx.send(AppEvent::Error(msg));
            return;
        }
        match self.session.submit_backtest(&form.request_body()).await {
            Ok(accepted) => self.start_polling(accepted.job_id, JobKind::Backtest),
            Err(e) => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Error(format!("回测提交失败: {}", e)));
            }
        }
    }

    pub async fn submit_batch(&mut self, form: &BatchForm) {
        if let Err(msg) = form.validate() {
            let _ = self.evt_tx.send(AppEvent::Error(msg));
            return;
        }
        let combos = form.combination_count();
        match self.session.submit_batch(&form.request_body()).await {
            Ok(accepted) => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Log(format!("▶ 批量回测共 {} 个参数组合", combos)));
                self.start_polling(accepted.job_id, JobKind::BatchTest);
            }
            Err(e) => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Error(format!("批量回测提交失败: {}", e)));
            }
        }
    }

    fn start_polling(&mut self, job_id: String, kind: JobKind) {
        self.abort_poll_task();
        let _ = self.evt_tx.send(AppEvent::JobAccepted {
            job_id: job_id.clone(),
            kind,
        });
        let _ = self.evt_tx.send(AppEvent::Message(format!(
            "▶ {}已提交: {}",
            kind.label(),
            job_id
        )));

        let session = self.session.clone();
        let evt_tx = self.evt_tx.clone();
        let interval = kind.poll_interval();
        self.active_job = Some(job_id.clone());
        self.poll_task = Some(tokio::spawn(async move {
            poller::poll_job(session.as_ref(), &job_id, interval, &evt_tx).await;
        }));
    }

    /// 停止跟踪当前任务。只中止本地轮询，后端任务继续运行。
    pub fn stop(&mut self) {
        match self.active_job.take() {
            Some(job_id) => {
                info!("○ 停止跟踪任务: {}", job_id);
                let _ = self.evt_tx.send(AppEvent::Log(format!(
                    "○ 已停止跟踪任务 {} (后端继续运行)",
                    job_id
                )));
            }
            None => {
                let _ = self
                    .evt_tx
                    .send(AppEvent::Log("⚠ 当前没有正在跟踪的任务".to_string()));
            }
        }
        self.abort_poll_task();
    }

    fn abort_poll_task(&mut self) {
        if let Some(handle) = self.poll_task.take() {
            handle.abort();
        }
    }
}
