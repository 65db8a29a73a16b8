use chrono::{Months, NaiveDate};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::mpsc;

use crate::session::dto::{DataFile, DataSourceConfig, DataSourceInfo};
use crate::session::ApiSession;
use crate::ui::format::format_size;
use crate::AppEvent;

use super::{send_error, write_download};

#[derive(Debug, Clone, Default)]
pub struct DataPanelData {
    pub files: Vec<DataFile>,
    pub sources: Vec<DataSourceInfo>,
    pub config: HashMap<String, DataSourceConfig>,
}

/// 数据面板：文件列表、数据源列表、数据源配置三个请求并发
pub async fn load(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    let (files, sources, config) = futures::join!(
        session.list_data_files(),
        session.list_data_sources(),
        session.get_config()
    );
    match (files, sources, config) {
        (Ok(files), Ok(sources), Ok(config)) => {
            let _ = evt_tx.send(AppEvent::DataPanel(DataPanelData {
                files,
                sources,
                config: config.data_sources,
            }));
        }
        (f, s, c) => {
            if let Some(e) = f.err().or(s.err()).or(c.err()) {
                send_error(evt_tx, "数据面板加载失败", e);
            }
        }
    }
}

pub async fn preview(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, name: &str) {
    match session.preview_file(name).await {
        Ok(preview) => {
            let _ = evt_tx.send(AppEvent::FilePreviewLoaded {
                name: name.to_string(),
                preview,
            });
        }
        Err(e) => send_error(evt_tx, "文件预览失败", e),
    }
}

pub async fn info(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, name: &str) {
    match session.file_info(name).await {
        Ok(info) => {
            let _ = evt_tx.send(AppEvent::FileInfoLoaded {
                name: name.to_string(),
                info,
            });
        }
        Err(e) => send_error(evt_tx, "文件信息获取失败", e),
    }
}

pub async fn delete(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, name: &str) {
    match session.delete_file(name).await {
        Ok(()) => {
            let _ = evt_tx.send(AppEvent::Message(format!("✓ 数据文件已删除: {}", name)));
            load(session, evt_tx).await;
        }
        Err(e) => send_error(evt_tx, "文件删除失败", e),
    }
}

pub async fn download(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    name: &str,
    dir: &Path,
) {
    let bytes = match session.download_file(name).await {
        Ok(bytes) => bytes,
        Err(e) => {
            send_error(evt_tx, "文件下载失败", e);
            return;
        }
    };
    match write_download(dir, name, &bytes).await {
        Ok(path) => {
            let _ = evt_tx.send(AppEvent::Message(format!(
                "✓ 已下载: {} ({})",
                path,
                format_size(bytes.len() as u64)
            )));
        }
        Err(e) => send_error(evt_tx, "写入下载文件失败", e),
    }
}

pub async fn upload(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>, path: &str) {
    let local = Path::new(path);
    let Some(filename) = local.file_name().and_then(|n| n.to_str()) else {
        let _ = evt_tx.send(AppEvent::Error(format!("无效的文件路径: {}", path)));
        return;
    };
    let bytes = match tokio::fs::read(local).await {
        Ok(bytes) => bytes,
        Err(e) => {
            send_error(evt_tx, "读取本地文件失败", e);
            return;
        }
    };
    match session.upload_file(filename, bytes).await {
        Ok(resp) => {
            let _ = evt_tx.send(AppEvent::Message(format!(
                "✓ 已上传: {} ({})",
                resp.filename,
                format_size(resp.file_size)
            )));
            load(session, evt_tx).await;
        }
        Err(e) => send_error(evt_tx, "上传失败", e),
    }
}

/// 本地改完 enabled 开关后整体推送一份配置
pub async fn push_config(
    session: &ApiSession,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
    config: &HashMap<String, DataSourceConfig>,
) {
    match session.push_data_sources(config).await {
        Ok(()) => {
            let _ = evt_tx.send(AppEvent::Message("✓ 数据源配置已推送".to_string()));
        }
        Err(e) => send_error(evt_tx, "数据源配置推送失败", e),
    }
}

/// 从文件名推断回测日期区间，尽力而为：
/// 找到两个 8 位日期则作为起止日期；只有一个则作为结束日期、
/// 起始日期取整一年前；一个都没有则不推断。
pub fn infer_date_range(filename: &str) -> Option<(String, String)> {
    let re = Regex::new(r"\d{8}").unwrap();
    let mut dates: Vec<NaiveDate> = Vec::new();
    for m in re.find_iter(filename) {
        if let Ok(d) = NaiveDate::parse_from_str(m.as_str(), "%Y%m%d") {
            dates.push(d);
            if dates.len() == 2 {
                break;
            }
        }
    }
    let fmt = |d: &NaiveDate| d.format("%Y-%m-%d").to_string();
    match dates.as_slice() {
        [start, end] => Some((fmt(start), fmt(end))),
        [end] => {
            let start = end.checked_sub_months(Months::new(12))?;
            Some((fmt(&start), fmt(end)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_dates_become_start_and_end() {
        let range = infer_date_range("spy_20200101_20211231.csv").unwrap();
        assert_eq!(range, ("2020-01-01".to_string(), "2021-12-31".to_string()));
    }

    #[test]
    fn single_date_backdates_start_one_year() {
        let range = infer_date_range("prices_20210315.csv").unwrap();
        assert_eq!(range, ("2020-03-15".to_string(), "2021-03-15".to_string()));
    }

    #[test]
    fn no_date_like_substring_means_no_inference() {
        assert!(infer_date_range("prices.csv").is_none());
        assert!(infer_date_range("top_2000.csv").is_none());
    }

    #[test]
    fn invalid_eight_digit_runs_are_skipped() {
        let range = infer_date_range("data_99999999_20200101.csv").unwrap();
        assert_eq!(range, ("2019-01-01".to_string(), "2020-01-01".to_string()));
    }

    #[test]
    fn leap_day_backdates_to_clamped_date() {
        let range = infer_date_range("intraday_20200229.csv").unwrap();
        assert_eq!(range, ("2019-02-28".to_string(), "2020-02-29".to_string()));
    }
}
