use crate::charts::{ChartKind, ChartView};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// 轴刻度：首尾加中点共三个，首尾加粗
fn axis_labels(min: f64, max: f64, integer: bool) -> Vec<Span<'static>> {
    let fmt = |v: f64| {
        if integer {
            format!("{:.0}", v)
        } else {
            format!("{:.2}", v)
        }
    };
    let mid = (min + max) / 2.0;
    vec![
        Span::styled(fmt(min), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(fmt(mid)),
        Span::styled(fmt(max), Style::default().add_modifier(Modifier::BOLD)),
    ]
}

/// 数据范围加 5% 边距。空序列退化为 [0,1]，常数序列按绝对值撑开
fn padded_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if (max - min).abs() < f64::EPSILON {
        let pad = (max.abs() * 0.05).max(1.0);
        return [min - pad, max + pad];
    }
    let pad = (max - min) * 0.05;
    [min - pad, max + pad]
}

pub fn render_chart(f: &mut Frame, area: Rect, view: &ChartView) {
    let x_bounds = padded_bounds(view.points.iter().map(|p| p.0));
    let y_bounds = padded_bounds(view.points.iter().map(|p| p.1));

    // 近似曲线用黄色与真实曲线区分开
    let (graph_type, color) = match view.kind {
        ChartKind::Line => (
            GraphType::Line,
            if view.synthetic {
                Color::Yellow
            } else {
                Color::Cyan
            },
        ),
        ChartKind::Scatter => (GraphType::Scatter, Color::Magenta),
    };

    let dataset = Dataset::default()
        .name(view.y_title.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(graph_type)
        .style(Style::default().fg(color))
        .data(&view.points);

    // 折线图的 x 轴是交易日序号，散点图是回撤百分比
    let x_integer = view.kind == ChartKind::Line;
    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(view.title.clone())
                .style(Style::default().fg(Color::White)),
        )
        .x_axis(
            Axis::default()
                .title(view.x_title.clone())
                .style(Style::default().fg(Color::Gray))
                .labels(axis_labels(x_bounds[0], x_bounds[1], x_integer))
                .bounds(x_bounds),
        )
        .y_axis(
            Axis::default()
                .title(view.y_title.clone())
                .style(Style::default().fg(Color::Gray))
                .labels(axis_labels(y_bounds[0], y_bounds[1], false))
                .bounds(y_bounds),
        );
    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_bounds_widens_range() {
        let bounds = padded_bounds([0.0, 10.0].into_iter());
        assert!(bounds[0] < 0.0);
        assert!(bounds[1] > 10.0);
    }

    #[test]
    fn padded_bounds_handles_empty_and_constant() {
        assert_eq!(padded_bounds(std::iter::empty()), [0.0, 1.0]);

        let constant = padded_bounds([5.0, 5.0, 5.0].into_iter());
        assert!(constant[0] < 5.0 && constant[1] > 5.0);
    }

    #[test]
    fn axis_labels_format_follows_axis_kind() {
        let int_labels = axis_labels(0.0, 50.0, true);
        assert_eq!(int_labels[0].content.as_ref(), "0");
        assert_eq!(int_labels[2].content.as_ref(), "50");

        let pct_labels = axis_labels(-1.5, 2.5, false);
        assert_eq!(pct_labels[1].content.as_ref(), "0.50");
    }
}
