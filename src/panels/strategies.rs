use crate::session::ApiSession;
use crate::AppEvent;
use tokio::sync::mpsc;

use super::send_error;

/// 保存前的本地校验。名字为空时直接拒绝，不发起任何网络请求。
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("策略名不能为空".to_string());
    }
    Ok(())
}

pub async fn load(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    match session.list_strategies().await {
        Ok(strategies) => {
            let _ = evt_tx.send(AppEvent::Strategies(strategies));
        }
        Err(e) => send_error(evt_tx, "策略列表加载失败", e),
    }
}

pub async fn load_detail(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, name: &str) {
    match session.get_strategy(name).await {
        Ok(detail) => {
            let _ = evt_tx.send(AppEvent::StrategyLoaded(detail));
        }
        Err(e) => send_error(evt_tx, "策略加载失败", e),
    }
}

pub async fn save(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    name: &str,
    description: &str,
    code: &str,
) {
    if let Err(msg) = validate_name(name) {
        let _ = evt_tx.send(AppEvent::Error(msg));
        return;
    }
    match session.save_strategy(name.trim(), description, code).await {
        Ok(()) => {
            let _ = evt_tx.send(AppEvent::Message(format!("✓ 策略已保存: {}", name.trim())));
            load(session, evt_tx).await;
        }
        Err(e) => send_error(evt_tx, "策略保存失败", e),
    }
}

pub async fn delete(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, name: &str) {
    match session.delete_strategy(name).await {
        Ok(()) => {
            let _ = evt_tx.send(AppEvent::Message(format!("✓ 策略已删除: {}", name)));
            load(session, evt_tx).await;
        }
        Err(e) => send_error(evt_tx, "策略删除失败", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected_before_any_request() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("\t\n").is_err());
    }

    #[test]
    fn non_empty_name_passes() {
        assert!(validate_name("momentum").is_ok());
        assert!(validate_name(" 双均线 ").is_ok());
    }
}
