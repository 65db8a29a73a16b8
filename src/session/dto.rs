use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 后端任务对象。status 由后端定义（pending/running/completed/failed），
/// 客户端仅当作不透明字符串处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    #[serde(rename = "type", default)]
    pub job_type: String,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// 结果载荷：汇总指标、报告文件路径或批量组合结果，结构由后端决定
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDetail {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategiesResponse {
    #[serde(default)]
    pub strategies: Vec<StrategyMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFile {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<String>,
    /// 上传文件与平台预置文件的来源区分
    #[serde(default)]
    pub uploaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFilesResponse {
    #[serde(default)]
    pub data_files: Vec<DataFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourcesResponse {
    #[serde(default)]
    pub data_sources: Vec<DataSourceInfo>,
}

/// 数据源配置：enabled 之外的供应商字段（token/path/date_format 等）
/// 原样保留，整体推送时不丢失未知键。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    #[serde(default)]
    pub data_sources: HashMap<String, DataSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePreview {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub preview_data: Vec<Value>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub securities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub securities: Option<Vec<String>>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub strategy: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// 会话标识，用于拉取 /reports/{strategy}/data/{session}
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub files: Vec<ReportFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsResponse {
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPreview {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub preview_data: Option<Vec<Value>>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub summary: Value,
    #[serde(default)]
    pub portfolio_history: Vec<Value>,
    #[serde(default)]
    pub backtest_config: Value,
    #[serde(default)]
    pub trade_summary: Value,
    #[serde(default)]
    pub final_positions: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDataResponse {
    pub data: SessionData,
}
