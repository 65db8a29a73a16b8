use std::path::Path;
use tokio::sync::mpsc;

use crate::charts;
use crate::session::ApiSession;
use crate::ui::format::format_size;
use crate::AppEvent;

use super::{send_error, write_download};

/// 结果面板：任务列表 + 报告列表并发加载
pub async fn load(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    let (jobs, reports) = futures::join!(session.list_jobs(), session.list_reports());
    match (jobs, reports) {
        (Ok(jobs), Ok(reports)) => {
            let _ = evt_tx.send(AppEvent::Results { jobs, reports });
        }
        (j, r) => {
            if let Some(e) = j.err().or(r.err()) {
                send_error(evt_tx, "结果面板加载失败", e);
            }
        }
    }
}

pub async fn report_preview(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    strategy: &str,
    file: &str,
) {
    match session.report_preview(strategy, file).await {
        Ok(preview) => {
            let _ = evt_tx.send(AppEvent::ReportPreviewLoaded {
                file: file.to_string(),
                preview,
            });
        }
        Err(e) => send_error(evt_tx, "报告预览失败", e),
    }
}

pub async fn report_download(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    strategy: &str,
    file: &str,
    dir: &Path,
) {
    let bytes = match session.report_file(strategy, file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            send_error(evt_tx, "报告下载失败", e);
            return;
        }
    };
    let name = format!("{}_{}", strategy, file);
    match write_download(dir, &name, &bytes).await {
        Ok(path) => {
            let _ = evt_tx.send(AppEvent::Message(format!(
                "✓ 已下载: {} ({})",
                path,
                format_size(bytes.len() as u64)
            )));
        }
        Err(e) => send_error(evt_tx, "写入报告文件失败", e),
    }
}

/// 拉取会话数据并构建收益曲线
pub async fn session_chart(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    strategy: &str,
    session_id: &str,
) {
    match session.session_data(strategy, session_id).await {
        Ok(data) => {
            match charts::chart_for_session(strategy, &data, &mut rand::thread_rng()) {
                Some(view) => {
                    let _ = evt_tx.send(AppEvent::ChartReady(view));
                }
                None => {
                    let _ = evt_tx.send(AppEvent::Error(format!(
                        "会话数据缺少收益序列: {}",
                        strategy
                    )));
                }
            }
        }
        Err(e) => send_error(evt_tx, "会话数据获取失败", e),
    }
}
