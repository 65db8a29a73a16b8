pub mod dashboard;
pub mod data;
pub mod results;
pub mod strategies;

use crate::session::ApiSession;
use crate::AppEvent;
use futures::join;
use log::error;
use std::path::Path;
use tokio::sync::mpsc;

/// 面板加载失败的统一出口：写日志并发一条瞬时错误通知，
/// 面板保持原有内容，不重试也不做部分渲染。
pub(crate) fn send_error(
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    context: &str,
    err: impl std::fmt::Display,
) {
    error!("✗ {}: {}", context, err);
    let _ = evt_tx.send(AppEvent::Error(format!("{}: {}", context, err)));
}

/// 下载内容落盘，返回完整路径用于提示
pub(crate) async fn write_download(dir: &Path, name: &str, bytes: &[u8]) -> anyhow::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path.display().to_string())
}

/// 回测/批量回测面板共用的选择列表：策略 + 数据文件，两个请求并发
pub async fn load_backtest_lists(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    let (strategies, files) = join!(session.list_strategies(), session.list_data_files());
    match (strategies, files) {
        (Ok(strategies), Ok(files)) => {
            let _ = evt_tx.send(AppEvent::BacktestLists { strategies, files });
        }
        (s, f) => {
            if let Some(e) = s.err().or(f.err()) {
                send_error(evt_tx, "回测面板加载失败", e);
            }
        }
    }
}
