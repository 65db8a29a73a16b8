use crate::app_state::{AppEvent, Tab};
use crate::panels;
use crate::session::ApiSession;
use tokio::sync::mpsc;

/// 标签页与加载器一一对应；回测和批量回测共用同一份选择列表
pub async fn handle_load(tab: Tab, session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    match tab {
        Tab::Dashboard => panels::dashboard::load(session, evt_tx).await,
        Tab::Strategies => panels::strategies::load(session, evt_tx).await,
        Tab::Data => panels::data::load(session, evt_tx).await,
        Tab::Backtest | Tab::Batch => panels::load_backtest_lists(session, evt_tx).await,
        Tab::Results => panels::results::load(session, evt_tx).await,
    }
}
