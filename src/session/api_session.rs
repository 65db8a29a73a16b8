use log::{error, info};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use super::dto::*;
use super::urls;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// 从错误响应体中提取人类可读的说明。后端统一返回 {"detail": "..."}，
/// 非 JSON 或缺少 detail 时退回原始文本。
pub fn extract_detail(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

/// 回测平台 REST 会话。持有单个连接池，整个应用共享一份。
#[derive(Clone)]
pub struct ApiSession {
    client: reqwest::Client,
    base_url: String,
}

impl ApiSession {
    pub fn new(base_url: String) -> Self {
        // 回测任务通过轮询跟踪，请求本身不设超时
        Self {
            client: reqwest::Client::builder()
                .user_agent("rustbtd/0.1")
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail = extract_detail(status.as_u16(), &body);
            error!("✗ 请求失败 ({}): {}", status.as_u16(), detail);
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail,
            });
        }
        serde_json::from_str::<T>(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check_ok(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        let detail = extract_detail(status.as_u16(), &body);
        error!("✗ 请求失败 ({}): {}", status.as_u16(), detail);
        Err(ApiError::Backend {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    pub async fn list_strategies(&self) -> Result<Vec<StrategyMeta>, ApiError> {
        let resp: StrategiesResponse = self.get_json(urls::url_strategies(&self.base_url)).await?;
        info!("✓ 获取策略列表: {} 个", resp.strategies.len());
        Ok(resp.strategies)
    }

    pub async fn get_strategy(&self, name: &str) -> Result<StrategyDetail, ApiError> {
        let detail: StrategyDetail = self
            .get_json(urls::url_strategies_name(&self.base_url, name))
            .await?;
        info!("✓ 获取策略代码: {} ({} 字节)", name, detail.code.len());
        Ok(detail)
    }

    pub async fn save_strategy(
        &self,
        name: &str,
        description: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "name": name,
            "description": description,
            "code": code,
        });
        let response = self
            .client
            .post(urls::url_strategies(&self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::check_ok(response).await?;
        info!("✓ 策略已保存: {}", name);
        Ok(())
    }

    pub async fn delete_strategy(&self, name: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(urls::url_strategies_name(&self.base_url, name))
            .send()
            .await?;
        Self::check_ok(response).await?;
        info!("✓ 策略已删除: {}", name);
        Ok(())
    }

    pub async fn list_data_sources(&self) -> Result<Vec<DataSourceInfo>, ApiError> {
        let resp: DataSourcesResponse = self
            .get_json(urls::url_data_sources(&self.base_url))
            .await?;
        Ok(resp.data_sources)
    }

    pub async fn list_data_files(&self) -> Result<Vec<DataFile>, ApiError> {
        let resp: DataFilesResponse = self.get_json(urls::url_data_files(&self.base_url)).await?;
        info!("✓ 获取数据文件列表: {} 个", resp.data_files.len());
        Ok(resp.data_files)
    }

    pub async fn preview_file(&self, name: &str) -> Result<FilePreview, ApiError> {
        self.get_json(urls::url_data_files_preview(&self.base_url, name))
            .await
    }

    pub async fn file_info(&self, name: &str) -> Result<FileInfo, ApiError> {
        self.get_json(urls::url_data_files_info(&self.base_url, name))
            .await
    }

    pub async fn download_file(&self, name: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(urls::url_data_files_download(&self.base_url, name))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: extract_detail(status.as_u16(), &body),
            });
        }
        let bytes = response.bytes().await?;
        info!("✓ 下载数据文件: {} ({} 字节)", name, bytes.len());
        Ok(bytes.to_vec())
    }

    pub async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(urls::url_data_upload(&self.base_url))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::decode(response).await?;
        info!(
            "✓ 上传完成: {} ({} 字节)",
            uploaded.filename, uploaded.file_size
        );
        Ok(uploaded)
    }

    pub async fn delete_file(&self, name: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(urls::url_data_files_name(&self.base_url, name))
            .send()
            .await?;
        Self::check_ok(response).await?;
        info!("✓ 数据文件已删除: {}", name);
        Ok(())
    }

    pub async fn get_config(&self) -> Result<ConfigResponse, ApiError> {
        self.get_json(urls::url_config(&self.base_url)).await
    }

    /// 配置整体推送：请求体就是 {数据源名: 配置} 映射本身
    pub async fn push_data_sources(
        &self,
        data_sources: &HashMap<String, DataSourceConfig>,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(urls::url_config_data_sources(&self.base_url))
            .json(data_sources)
            .send()
            .await?;
        Self::check_ok(response).await?;
        info!("✓ 数据源配置已更新");
        Ok(())
    }

    pub async fn submit_backtest(&self, body: &Value) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(urls::url_backtest(&self.base_url))
            .json(body)
            .send()
            .await?;
        let accepted: SubmitResponse = Self::decode(response).await?;
        info!("▶ 回测任务已提交: {}", accepted.job_id);
        Ok(accepted)
    }

    pub async fn submit_batch(&self, body: &Value) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(urls::url_batch_test(&self.base_url))
            .json(body)
            .send()
            .await?;
        let accepted: SubmitResponse = Self::decode(response).await?;
        info!("▶ 批量回测任务已提交: {}", accepted.job_id);
        Ok(accepted)
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let resp: JobsResponse = self.get_json(urls::url_jobs(&self.base_url)).await?;
        Ok(resp.jobs)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job, ApiError> {
        self.get_json(urls::url_jobs_id(&self.base_url, job_id))
            .await
    }

    pub async fn list_reports(&self) -> Result<Vec<Report>, ApiError> {
        let resp: ReportsResponse = self.get_json(urls::url_reports(&self.base_url)).await?;
        info!("✓ 获取报告列表: {} 个", resp.reports.len());
        Ok(resp.reports)
    }

    pub async fn report_file(&self, strategy: &str, file: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(urls::url_reports_file(&self.base_url, strategy, file))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: extract_detail(status.as_u16(), &body),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn report_preview(
        &self,
        strategy: &str,
        file: &str,
    ) -> Result<ReportPreview, ApiError> {
        self.get_json(urls::url_reports_file_preview(&self.base_url, strategy, file))
            .await
    }

    pub async fn session_data(
        &self,
        strategy: &str,
        session: &str,
    ) -> Result<SessionData, ApiError> {
        let resp: SessionDataResponse = self
            .get_json(urls::url_reports_session_data(
                &self.base_url,
                strategy,
                session,
            ))
            .await?;
        Ok(resp.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_from_json_body() {
        let body = r#"{"detail": "strategy not found"}"#;
        assert_eq!(extract_detail(404, body), "strategy not found");
    }

    #[test]
    fn detail_falls_back_to_raw_text() {
        assert_eq!(extract_detail(502, "Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn detail_falls_back_to_status_when_empty() {
        assert_eq!(extract_detail(500, "   "), "HTTP 500");
    }

    #[test]
    fn detail_serializes_non_string_payload() {
        let body = r#"{"detail": {"loc": ["body", "name"], "msg": "required"}}"#;
        let detail = extract_detail(422, body);
        assert!(detail.contains("required"));
    }

    #[test]
    fn json_without_detail_uses_raw_body() {
        let body = r#"{"error": "boom"}"#;
        assert_eq!(extract_detail(500, body), body);
    }
}
