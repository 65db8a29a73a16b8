use crate::session::dto::{Job, SessionData};
use rand::Rng;
use serde_json::Value;

/// 合成曲线的采样点数
const SYNTHETIC_POINTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Scatter,
}

/// 图表数据，纯数据结构，渲染由 ui::charts 负责。
#[derive(Debug, Clone)]
pub struct ChartView {
    pub title: String,
    pub kind: ChartKind,
    pub points: Vec<(f64, f64)>,
    /// 近似曲线标记：没有真实时间序列时由摘要指标合成
    pub synthetic: bool,
    pub x_title: String,
    pub y_title: String,
}

/// 由组合估值序列计算相对首日的百分比收益曲线
pub fn returns_curve(valuations: &[f64]) -> Vec<(f64, f64)> {
    let Some(&first) = valuations.first() else {
        return Vec::new();
    };
    if first == 0.0 {
        return Vec::new();
    }
    valuations
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, (v / first - 1.0) * 100.0))
        .collect()
}

/// 没有时间序列时的近似曲线：从 0 线性插值到累计收益，
/// 中间点叠加按波动率缩放的随机噪声，首尾两点保持精确。
/// 这是近似展示而不是真实日度表现，标题须带"近似"标记。
pub fn synthetic_curve(
    total_return_pct: f64,
    volatility_pct: f64,
    n: usize,
    rng: &mut impl Rng,
) -> Vec<(f64, f64)> {
    if n < 2 {
        return vec![(0.0, 0.0)];
    }
    let last = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let base = total_return_pct * i as f64 / last;
            let y = if i == 0 || i == n - 1 {
                base
            } else {
                base + (rng.gen::<f64>() - 0.5) * volatility_pct
            };
            (i as f64, y)
        })
        .collect()
}

/// 从松散的 JSON 对象里按候选键取数值
fn metric_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = value.get(key).and_then(Value::as_f64) {
            return Some(v);
        }
    }
    None
}

/// 估值条目兼容裸数值和持仓对象两种形态
fn valuation_of(entry: &Value) -> Option<f64> {
    if let Some(v) = entry.as_f64() {
        return Some(v);
    }
    metric_f64(entry, &["portfolio_value", "total_value", "value", "equity"])
}

fn history_points(history: &[Value]) -> Vec<(f64, f64)> {
    let valuations: Vec<f64> = history.iter().filter_map(valuation_of).collect();
    returns_curve(&valuations)
}

fn scatter_point(entry: &Value) -> Option<(f64, f64)> {
    // 每个组合的指标可能平铺，也可能挂在 metrics 下
    let metrics = entry.get("metrics").unwrap_or(entry);
    let ret = metric_f64(metrics, &["total_return", "return", "total_return_pct"])?;
    let dd = metric_f64(metrics, &["max_drawdown", "drawdown"])?;
    Some((dd, ret))
}

/// 批量结果散点图：每个参数组合一个点，x 轴回撤、y 轴收益
pub fn batch_scatter(results: &[Value]) -> Vec<(f64, f64)> {
    results.iter().filter_map(scatter_point).collect()
}

/// 由任务结果载荷构建图表。批量任务出散点图；单次回测优先用
/// portfolio_history 画真实收益曲线，缺失时才由摘要指标合成近似曲线。
pub fn chart_for_job(job: &Job, rng: &mut impl Rng) -> Option<ChartView> {
    let result = job.result.as_ref()?;

    if job.job_type == "batch_test" {
        let combos = result
            .get("results")
            .or_else(|| result.get("combinations"))
            .and_then(Value::as_array)?;
        let points = batch_scatter(combos);
        if points.is_empty() {
            return None;
        }
        return Some(ChartView {
            title: format!("批量回测: 收益 vs 回撤 ({} 组合)", points.len()),
            kind: ChartKind::Scatter,
            points,
            synthetic: false,
            x_title: "最大回撤 %".to_string(),
            y_title: "收益 %".to_string(),
        });
    }

    if let Some(history) = result.get("portfolio_history").and_then(Value::as_array) {
        let points = history_points(history);
        if !points.is_empty() {
            return Some(ChartView {
                title: format!("收益曲线: {}", job.job_id),
                kind: ChartKind::Line,
                points,
                synthetic: false,
                x_title: "交易日".to_string(),
                y_title: "收益 %".to_string(),
            });
        }
    }

    let summary = result.get("summary").unwrap_or(result);
    let total = metric_f64(summary, &["total_return", "total_return_pct", "return"])?;
    let vol = metric_f64(summary, &["volatility", "annual_volatility"]).unwrap_or(0.0);
    Some(ChartView {
        title: format!("收益曲线 (近似): {}", job.job_id),
        kind: ChartKind::Line,
        points: synthetic_curve(total, vol, SYNTHETIC_POINTS, rng),
        synthetic: true,
        x_title: "交易日".to_string(),
        y_title: "收益 %".to_string(),
    })
}

/// 由报告会话数据构建图表，取值逻辑与任务结果一致
pub fn chart_for_session(
    strategy: &str,
    data: &SessionData,
    rng: &mut impl Rng,
) -> Option<ChartView> {
    let points = history_points(&data.portfolio_history);
    if !points.is_empty() {
        return Some(ChartView {
            title: format!("收益曲线: {}", strategy),
            kind: ChartKind::Line,
            points,
            synthetic: false,
            x_title: "交易日".to_string(),
            y_title: "收益 %".to_string(),
        });
    }

    let total = metric_f64(&data.summary, &["total_return", "total_return_pct", "return"])?;
    let vol = metric_f64(&data.summary, &["volatility", "annual_volatility"]).unwrap_or(0.0);
    Some(ChartView {
        title: format!("收益曲线 (近似): {}", strategy),
        kind: ChartKind::Line,
        points: synthetic_curve(total, vol, SYNTHETIC_POINTS, rng),
        synthetic: true,
        x_title: "交易日".to_string(),
        y_title: "收益 %".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn job_with_result(job_type: &str, result: Value) -> Job {
        Job {
            job_id: "abc".to_string(),
            job_type: job_type.to_string(),
            status: "completed".to_string(),
            progress: Some(100.0),
            message: None,
            created_at: None,
            updated_at: None,
            result: Some(result),
        }
    }

    #[test]
    fn returns_curve_is_relative_to_first_value() {
        let points = returns_curve(&[100.0, 110.0, 120.0]);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], (0.0, 0.0));
        assert!((points[1].1 - 10.0).abs() < 1e-9);
        assert!((points[2].1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn returns_curve_guards_degenerate_input() {
        assert!(returns_curve(&[]).is_empty());
        assert!(returns_curve(&[0.0, 5.0]).is_empty());
    }

    #[test]
    fn synthetic_curve_hits_exact_endpoints() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = synthetic_curve(24.0, 3.0, 50, &mut rng);
        assert_eq!(points.len(), 50);
        assert_eq!(points[0].1, 0.0);
        assert_eq!(points[49].1, 24.0);
    }

    #[test]
    fn synthetic_noise_is_bounded_by_volatility() {
        let mut rng = StdRng::seed_from_u64(11);
        let total = 20.0;
        let vol = 4.0;
        let n = 80;
        let points = synthetic_curve(total, vol, n, &mut rng);
        for (i, &(_, y)) in points.iter().enumerate() {
            let base = total * i as f64 / (n - 1) as f64;
            assert!((y - base).abs() <= vol / 2.0 + 1e-9, "point {} drifts", i);
        }
    }

    #[test]
    fn synthetic_curve_is_deterministic_under_seed() {
        let a = synthetic_curve(10.0, 2.0, 30, &mut StdRng::seed_from_u64(42));
        let b = synthetic_curve(10.0, 2.0, 30, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn job_with_history_renders_real_curve() {
        let job = job_with_result(
            "backtest",
            json!({ "portfolio_history": [100.0, 105.0, 103.0] }),
        );
        let chart = chart_for_job(&job, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert!(!chart.synthetic);
        assert_eq!(chart.points.len(), 3);
        assert!(!chart.title.contains("近似"));
    }

    #[test]
    fn job_without_history_falls_back_to_labeled_synthetic() {
        let job = job_with_result(
            "backtest",
            json!({ "summary": { "total_return": 12.5, "volatility": 2.0 } }),
        );
        let chart = chart_for_job(&job, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(chart.synthetic);
        assert!(chart.title.contains("近似"));
        assert!((chart.points.last().unwrap().1 - 12.5).abs() < 1e-9);
    }

    #[test]
    fn history_entries_may_be_objects() {
        let job = job_with_result(
            "backtest",
            json!({ "portfolio_history": [
                { "portfolio_value": 100.0 },
                { "portfolio_value": 110.0 }
            ] }),
        );
        let chart = chart_for_job(&job, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(!chart.synthetic);
        assert!((chart.points[1].1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn batch_job_renders_return_vs_drawdown_scatter() {
        let job = job_with_result(
            "batch_test",
            json!({ "results": [
                { "total_return": 10.0, "max_drawdown": 5.0 },
                { "metrics": { "total_return": -2.0, "max_drawdown": 8.5 } },
                { "irrelevant": true }
            ] }),
        );
        let chart = chart_for_job(&job, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(chart.kind, ChartKind::Scatter);
        assert_eq!(chart.points, vec![(5.0, 10.0), (8.5, -2.0)]);
    }

    #[test]
    fn job_without_result_yields_no_chart() {
        let mut job = job_with_result("backtest", json!({}));
        job.result = None;
        assert!(chart_for_job(&job, &mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn session_history_renders_curve() {
        let data = SessionData {
            summary: json!({}),
            portfolio_history: vec![json!(200.0), json!(220.0)],
            backtest_config: json!({}),
            trade_summary: json!({}),
            final_positions: json!({}),
        };
        let chart = chart_for_session("momentum", &data, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert!((chart.points[1].1 - 10.0).abs() < 1e-9);
        assert!(chart.title.contains("momentum"));
    }
}
