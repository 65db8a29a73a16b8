use serde_json::{json, Value};
use tokio::time::Duration;

/// 任务类型。两种任务的轮询间隔不同：单次回测 2 秒，批量回测 3 秒。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Backtest,
    BatchTest,
}

impl JobKind {
    pub fn poll_interval(&self) -> Duration {
        match self {
            JobKind::Backtest => Duration::from_secs(2),
            JobKind::BatchTest => Duration::from_secs(3),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Backtest => "回测",
            JobKind::BatchTest => "批量回测",
        }
    }

    pub fn from_job_type(job_type: &str) -> JobKind {
        if job_type == "batch_test" {
            JobKind::BatchTest
        } else {
            JobKind::Backtest
        }
    }
}

/// pending/running 视为进行中，其余任何取值一律按终态处理
pub fn status_is_active(status: &str) -> bool {
    matches!(status, "pending" | "running")
}

/// 回测表单。strategy/data_file 必填，日期可由文件名推断预填。
#[derive(Debug, Clone)]
pub struct BacktestForm {
    pub strategy: Option<String>,
    pub data_file: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub initial_capital: f64,
}

impl Default for BacktestForm {
    fn default() -> Self {
        Self {
            strategy: None,
            data_file: None,
            start_date: None,
            end_date: None,
            initial_capital: 1_000_000.0,
        }
    }
}

impl BacktestForm {
    /// 提交前的本地校验，不通过则不会发起任何网络请求
    pub fn validate(&self) -> Result<(), String> {
        if self.strategy.as_deref().unwrap_or("").trim().is_empty() {
            return Err("未选择策略".to_string());
        }
        if self.data_file.as_deref().unwrap_or("").trim().is_empty() {
            return Err("未选择数据文件".to_string());
        }
        Ok(())
    }

    pub fn request_body(&self) -> Value {
        let mut body = json!({
            "strategy": self.strategy.as_deref().unwrap_or(""),
            "data_file": self.data_file.as_deref().unwrap_or(""),
            "initial_capital": self.initial_capital,
        });
        if let Some(start) = &self.start_date {
            body["start_date"] = json!(start);
        }
        if let Some(end) = &self.end_date {
            body["end_date"] = json!(end);
        }
        body
    }
}

/// 批量回测表单：基础表单 + 命名参数取值列表。
/// 后端对参数做笛卡尔积，每个组合跑一次独立回测。
#[derive(Debug, Clone, Default)]
pub struct BatchForm {
    pub base: BacktestForm,
    pub params: Vec<(String, Vec<String>)>,
}

impl BatchForm {
    /// 组合总数 = 各取值列表长度之积；没有参数时为 0
    pub fn combination_count(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.iter().map(|(_, values)| values.len()).product()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.base.validate()?;
        if self.params.is_empty() {
            return Err("批量参数为空，至少需要一个参数取值列表".to_string());
        }
        if self.params.iter().any(|(_, values)| values.is_empty()) {
            return Err("存在取值为空的参数".to_string());
        }
        Ok(())
    }

    /// 设置或替换一个参数的取值列表，保持原有顺序
    pub fn set_param(&mut self, name: &str, values: Vec<String>) {
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| n == name) {
            entry.1 = values;
        } else {
            self.params.push((name.to_string(), values));
        }
    }

    pub fn remove_param(&mut self, name: &str) -> bool {
        let before = self.params.len();
        self.params.retain(|(n, _)| n != name);
        self.params.len() != before
    }

    pub fn request_body(&self) -> Value {
        let mut body = self.base.request_body();
        let mut parameters = serde_json::Map::new();
        for (name, values) in &self.params {
            let typed: Vec<Value> = values.iter().map(|v| param_value(v)).collect();
            parameters.insert(name.clone(), Value::Array(typed));
        }
        body["parameters"] = Value::Object(parameters);
        body
    }
}

/// 参数值按数值优先解析，解析不了的保持字符串原样传给后端
pub fn param_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return json!(f);
    }
    json!(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_intervals_are_fixed_per_kind() {
        assert_eq!(JobKind::Backtest.poll_interval(), Duration::from_secs(2));
        assert_eq!(JobKind::BatchTest.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn only_pending_and_running_are_active() {
        assert!(status_is_active("pending"));
        assert!(status_is_active("running"));
        assert!(!status_is_active("completed"));
        assert!(!status_is_active("failed"));
        assert!(!status_is_active("cancelled"));
        assert!(!status_is_active(""));
    }

    #[test]
    fn backtest_form_requires_selections() {
        let mut form = BacktestForm::default();
        assert!(form.validate().is_err());

        form.strategy = Some("momentum".to_string());
        assert!(form.validate().is_err());

        form.data_file = Some("prices.csv".to_string());
        assert!(form.validate().is_ok());

        form.strategy = Some("   ".to_string());
        assert!(form.validate().is_err());
    }

    #[test]
    fn request_body_includes_dates_only_when_set() {
        let mut form = BacktestForm {
            strategy: Some("momentum".to_string()),
            data_file: Some("prices.csv".to_string()),
            ..Default::default()
        };
        let body = form.request_body();
        assert!(body.get("start_date").is_none());
        assert!(body.get("end_date").is_none());

        form.start_date = Some("2020-01-01".to_string());
        form.end_date = Some("2021-01-01".to_string());
        let body = form.request_body();
        assert_eq!(body["start_date"], "2020-01-01");
        assert_eq!(body["end_date"], "2021-01-01");
        assert_eq!(body["strategy"], "momentum");
    }

    #[test]
    fn combination_count_is_product_of_list_lengths() {
        let mut form = BatchForm::default();
        assert_eq!(form.combination_count(), 0);

        form.set_param("window", vec!["5".into(), "10".into(), "20".into()]);
        form.set_param("threshold", vec!["0.1".into(), "0.2".into()]);
        assert_eq!(form.combination_count(), 6);

        form.set_param("window", vec!["5".into()]);
        assert_eq!(form.combination_count(), 2);
    }

    #[test]
    fn batch_form_rejects_empty_params() {
        let mut form = BatchForm::default();
        form.base.strategy = Some("momentum".to_string());
        form.base.data_file = Some("prices.csv".to_string());
        assert!(form.validate().is_err());

        form.set_param("window", vec!["5".into()]);
        assert!(form.validate().is_ok());

        form.set_param("threshold", Vec::new());
        assert!(form.validate().is_err());
    }

    #[test]
    fn param_values_parse_numbers_first() {
        assert_eq!(param_value("10"), json!(10));
        assert_eq!(param_value("0.5"), json!(0.5));
        assert_eq!(param_value("ema"), json!("ema"));
    }

    #[test]
    fn batch_body_carries_typed_parameter_map() {
        let mut form = BatchForm::default();
        form.base.strategy = Some("momentum".to_string());
        form.base.data_file = Some("prices.csv".to_string());
        form.set_param("window", vec!["5".into(), "10".into()]);
        let body = form.request_body();
        assert_eq!(body["parameters"]["window"], json!([5, 10]));
    }
}
