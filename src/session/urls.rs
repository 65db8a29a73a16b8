/// 回测平台 API 默认地址（可被 BTD_API_URL 覆盖）
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// 策略相关 URL
pub fn url_strategies(base: &str) -> String {
    format!("{}/strategies", base)
}
pub fn url_strategies_name(base: &str, name: &str) -> String {
    format!("{}/strategies/{}", base, name)
}

/// 数据相关 URL
pub fn url_data_sources(base: &str) -> String {
    format!("{}/data/sources", base)
}
pub fn url_data_files(base: &str) -> String {
    format!("{}/data/files", base)
}
pub fn url_data_files_name(base: &str, name: &str) -> String {
    format!("{}/data/files/{}", base, name)
}
pub fn url_data_files_preview(base: &str, name: &str) -> String {
    format!("{}/data/files/{}/preview", base, name)
}
pub fn url_data_files_info(base: &str, name: &str) -> String {
    format!("{}/data/files/{}/info", base, name)
}
pub fn url_data_files_download(base: &str, name: &str) -> String {
    format!("{}/data/files/{}/download", base, name)
}
pub fn url_data_upload(base: &str) -> String {
    format!("{}/data/upload", base)
}

/// 配置相关 URL
pub fn url_config(base: &str) -> String {
    format!("{}/config", base)
}
pub fn url_config_data_sources(base: &str) -> String {
    format!("{}/config/data-sources", base)
}

/// 任务相关 URL
pub fn url_backtest(base: &str) -> String {
    format!("{}/backtest", base)
}
pub fn url_batch_test(base: &str) -> String {
    format!("{}/batch-test", base)
}
pub fn url_jobs(base: &str) -> String {
    format!("{}/jobs", base)
}
pub fn url_jobs_id(base: &str, job_id: &str) -> String {
    format!("{}/jobs/{}", base, job_id)
}

/// 报告相关 URL
pub fn url_reports(base: &str) -> String {
    format!("{}/reports", base)
}
pub fn url_reports_file(base: &str, strategy: &str, file: &str) -> String {
    format!("{}/reports/{}/{}", base, strategy, file)
}
pub fn url_reports_file_preview(base: &str, strategy: &str, file: &str) -> String {
    format!("{}/reports/{}/{}/preview", base, strategy, file)
}
pub fn url_reports_session_data(base: &str, strategy: &str, session: &str) -> String {
    format!("{}/reports/{}/data/{}", base, strategy, session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_builders() {
        let base = "http://localhost:8000/api";
        assert_eq!(url_strategies(base), "http://localhost:8000/api/strategies");
        assert_eq!(
            url_strategies_name(base, "momentum"),
            "http://localhost:8000/api/strategies/momentum"
        );
        assert_eq!(
            url_data_files_name(base, "a.csv"),
            "http://localhost:8000/api/data/files/a.csv"
        );
        assert_eq!(
            url_data_files_preview(base, "a.csv"),
            "http://localhost:8000/api/data/files/a.csv/preview"
        );
        assert_eq!(
            url_jobs_id(base, "abc"),
            "http://localhost:8000/api/jobs/abc"
        );
        assert_eq!(
            url_reports_session_data(base, "momentum", "s-20240301"),
            "http://localhost:8000/api/reports/momentum/data/s-20240301"
        );
        assert_eq!(
            url_config_data_sources(base),
            "http://localhost:8000/api/config/data-sources"
        );
    }
}
