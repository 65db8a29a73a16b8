use crate::session::dto::{DataFile, Job, Report, StrategyMeta};
use crate::session::ApiSession;
use crate::AppEvent;
use futures::join;
use tokio::sync::mpsc;

use super::send_error;

#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub strategy_count: usize,
    pub file_count: usize,
    pub job_count: usize,
    pub report_count: usize,
    pub recent_jobs: Vec<Job>,
}

/// 四项计数各取对应响应数组的长度
pub fn summarize(
    strategies: &[StrategyMeta],
    files: &[DataFile],
    jobs: &[Job],
    reports: &[Report],
) -> DashboardData {
    DashboardData {
        strategy_count: strategies.len(),
        file_count: files.len(),
        job_count: jobs.len(),
        report_count: reports.len(),
        recent_jobs: jobs.iter().rev().take(5).cloned().collect(),
    }
}

/// 概览面板：四个请求并发，全部成功才渲染
pub async fn load(session: &ApiSession, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    let (strategies, files, jobs, reports) = join!(
        session.list_strategies(),
        session.list_data_files(),
        session.list_jobs(),
        session.list_reports()
    );
    match (strategies, files, jobs, reports) {
        (Ok(strategies), Ok(files), Ok(jobs), Ok(reports)) => {
            let _ = evt_tx.send(AppEvent::Dashboard(summarize(
                &strategies,
                &files,
                &jobs,
                &reports,
            )));
        }
        (s, f, j, r) => {
            if let Some(e) = s.err().or(f.err()).or(j.err()).or(r.err()) {
                send_error(evt_tx, "概览加载失败", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> StrategyMeta {
        StrategyMeta {
            name: name.to_string(),
            description: String::new(),
            size: 0,
            modified: None,
        }
    }

    fn file(name: &str) -> DataFile {
        DataFile {
            name: name.to_string(),
            columns: Vec::new(),
            size: 0,
            modified: None,
            uploaded: false,
        }
    }

    fn job(id: &str) -> Job {
        Job {
            job_id: id.to_string(),
            job_type: "backtest".to_string(),
            status: "running".to_string(),
            progress: None,
            message: None,
            created_at: None,
            updated_at: None,
            result: None,
        }
    }

    #[test]
    fn counts_equal_response_array_lengths() {
        let strategies = vec![meta("a"), meta("b")];
        let files = vec![file("x.csv")];
        let jobs = vec![job("1"), job("2"), job("3")];
        let reports: Vec<Report> = Vec::new();

        let data = summarize(&strategies, &files, &jobs, &reports);
        assert_eq!(data.strategy_count, 2);
        assert_eq!(data.file_count, 1);
        assert_eq!(data.job_count, 3);
        assert_eq!(data.report_count, 0);
    }

    #[test]
    fn recent_jobs_keeps_newest_five() {
        let jobs: Vec<Job> = (0..8).map(|i| job(&i.to_string())).collect();
        let data = summarize(&[], &[], &jobs, &[]);
        assert_eq!(data.recent_jobs.len(), 5);
        assert_eq!(data.recent_jobs[0].job_id, "7");
    }
}
