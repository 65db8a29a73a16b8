use crate::app_state::{App, FocusArea, InputMode, ResultsFocus};
use crate::backtest::{BacktestForm, JobKind};
use crate::session::dto::{FileInfo, FilePreview, ReportPreview};
use crate::ui::charts;
use crate::ui::format::{format_datetime, format_size, truncate_text};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

/// 主视图边框样式：获得焦点时青色
fn view_style(app: &App) -> Style {
    if app.focus_area == FocusArea::MainView {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

/// 任务状态对应的符号与颜色，状态串来自后端原样匹配
fn job_symbol(status: &str) -> (&'static str, Color) {
    match status {
        "completed" => ("✓", Color::Green),
        "failed" => ("✗", Color::Red),
        "running" => ("▶", Color::Cyan),
        "pending" => ("○", Color::Yellow),
        _ => ("?", Color::Gray),
    }
}

fn selected_item_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn char_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

// ---------- 概览 ----------

pub fn render_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let lines = if let Some(d) = &app.dashboard {
        vec![
            Line::from(vec![Span::styled(
                "--- 平台概览 ---",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled(
                format!("  策略数量: {:>4}", d.strategy_count),
                Style::default().fg(Color::Cyan),
            )]),
            Line::from(vec![Span::raw(format!("  数据文件: {:>4}", d.file_count))]),
            Line::from(vec![Span::styled(
                format!("  任务总数: {:>4}", d.job_count),
                Style::default().fg(Color::Yellow),
            )]),
            Line::from(vec![Span::styled(
                format!("  报告数量: {:>4}", d.report_count),
                Style::default().fg(Color::Green),
            )]),
        ]
    } else if app.dashboard_loading {
        vec![Line::from("正在加载概览...")]
    } else {
        vec![Line::from("暂无数据，按 r 刷新")]
    };

    let title = if app.focus_area == FocusArea::MainView {
        "概览 (r 刷新, ← 菜单)"
    } else {
        "概览"
    };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(view_style(app)),
    );
    f.render_widget(paragraph, chunks[0]);

    // 最近任务（最新的 5 条）
    let job_items: Vec<ListItem> = app
        .dashboard
        .as_ref()
        .map(|d| {
            d.recent_jobs
                .iter()
                .map(|job| {
                    let (symbol, color) = job_symbol(&job.status);
                    let kind = JobKind::from_job_type(&job.job_type).label();
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                        Span::styled(format!("{:<10}", job.status), Style::default().fg(color)),
                        Span::raw(format!("{:<10}", kind)),
                        Span::raw(format!("{:<16}", truncate_text(&job.job_id, 14))),
                        Span::styled(
                            format_datetime(job.created_at.as_deref()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]))
                })
                .collect()
        })
        .unwrap_or_default();

    let jobs = List::new(job_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("最近任务")
            .style(view_style(app)),
    );
    f.render_widget(jobs, chunks[1]);
}

// ---------- 策略 ----------

pub fn render_strategies(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Min(0)])
        .split(area);

    if app.strategies.is_empty() {
        app.strategy_list_state.select(None);
    } else {
        app.strategy_list_state
            .select(Some(app.strategy_index.min(app.strategies.len() - 1)));
    }

    let items: Vec<ListItem> = if app.strategies.is_empty() && app.strategies_loading {
        vec![ListItem::new("正在加载策略列表...")]
    } else {
        app.strategies
            .iter()
            .map(|s| {
                ListItem::new(Line::from(vec![
                    Span::styled(s.name.clone(), Style::default().fg(Color::White)),
                    Span::styled(
                        format!("  {}", format_size(s.size)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let title = if app.focus_area == FocusArea::MainView {
        "策略列表 (n新建 e编辑 s保存 x删除)"
    } else {
        "策略列表"
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(view_style(app)),
        )
        .highlight_style(selected_item_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, chunks[0], &mut app.strategy_list_state);

    let right_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(chunks[1]);

    let meta = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("名称: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(app.strategy_name.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("描述: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.strategy_description.clone()),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("策略信息 (/name /desc 修改)")
            .style(view_style(app)),
    );
    f.render_widget(meta, right_chunks[0]);

    render_editor(f, right_chunks[1], app);
}

fn render_editor(f: &mut Frame, area: Rect, app: &mut App) {
    let editing = app.input_mode == InputMode::Editor;
    let visible = area.height.saturating_sub(2).max(1);

    // 光标移出可视区时跟随滚动
    let row = app.editor.cursor_row as u16;
    if row < app.editor.scroll {
        app.editor.scroll = row;
    } else if row >= app.editor.scroll + visible {
        app.editor.scroll = row - visible + 1;
    }

    let cursor_row = app.editor.cursor_row;
    let cursor_col = app.editor.cursor_col;
    let lines: Vec<Line> = app
        .editor
        .lines()
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let mut spans = vec![Span::styled(
                format!("{:>3} ", i + 1),
                Style::default().fg(Color::DarkGray),
            )];
            if editing && i == cursor_row {
                let cur = char_byte_idx(line, cursor_col);
                let (left, right) = line.split_at(cur);
                spans.push(Span::raw(left));
                spans.push(Span::styled(
                    "_",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(right));
            } else {
                spans.push(Span::raw(line.as_str()));
            }
            Line::from(spans)
        })
        .collect();

    let (title, style) = if editing {
        ("策略代码 (Esc 退出编辑)", Style::default().fg(Color::Green))
    } else {
        ("策略代码 (e 编辑)", view_style(app))
    };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(style),
        )
        .scroll((app.editor.scroll, 0));
    f.render_widget(paragraph, area);
}

// ---------- 数据 ----------

pub fn render_data(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Min(0)])
        .split(area);

    if app.data.files.is_empty() {
        app.file_list_state.select(None);
    } else {
        app.file_list_state
            .select(Some(app.file_index.min(app.data.files.len() - 1)));
    }

    let items: Vec<ListItem> = if app.data.files.is_empty() && app.data_loading {
        vec![ListItem::new("正在加载数据文件...")]
    } else {
        app.data
            .files
            .iter()
            .map(|file| {
                // 上传文件与平台预置文件用符号区分
                let marker = if file.uploaded { "⬆ " } else { "· " };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Cyan)),
                    Span::styled(file.name.clone(), Style::default().fg(Color::White)),
                    Span::styled(
                        format!("  {} / {} 列", format_size(file.size), file.columns.len()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let title = if app.focus_area == FocusArea::MainView {
        "数据文件 (p预览 i信息 d下载 x删除)"
    } else {
        "数据文件"
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(view_style(app)),
        )
        .highlight_style(selected_item_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, chunks[0], &mut app.file_list_state);

    let right_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(8)])
        .split(chunks[1]);

    let detail_lines = if let Some((name, preview)) = &app.file_preview {
        preview_lines(name, preview)
    } else if let Some((name, info)) = &app.file_info {
        info_lines(name, info)
    } else {
        vec![
            Line::from("选择文件后按 p 预览、i 查看信息"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "上传: /upload <本地路径>",
                Style::default().fg(Color::DarkGray),
            )]),
        ]
    };
    let detail_title = if app.file_preview.is_some() || app.file_info.is_some() {
        "文件详情 (x 关闭)"
    } else {
        "文件详情"
    };
    let detail = Paragraph::new(detail_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(detail_title)
            .style(view_style(app)),
    );
    f.render_widget(detail, right_chunks[0]);

    // 数据源开关来自配置接口，列表接口只给名字和状态
    let source_items: Vec<ListItem> = app
        .data
        .sources
        .iter()
        .map(|source| {
            let enabled = app
                .data
                .config
                .get(&source.name)
                .map(|c| c.enabled)
                .unwrap_or(false);
            let (symbol, color) = if enabled {
                ("✓ ", Color::Green)
            } else {
                ("○ ", Color::Gray)
            };
            let desc = source.description.as_deref().unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::styled(symbol, Style::default().fg(color)),
                Span::styled(format!("{:<14}", source.name), Style::default().fg(color)),
                Span::styled(
                    truncate_text(desc, 36),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let sources = List::new(source_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("数据源 (/toggle <名> 切换, /config push 推送)")
            .style(view_style(app)),
    );
    f.render_widget(sources, right_chunks[1]);
}

fn preview_lines<'a>(name: &'a str, preview: &'a FilePreview) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("--- 预览: {} ---", name),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(format!("列: {}", preview.columns.join(", "))),
        Line::from(format!("总行数: {}", preview.total_rows)),
    ];
    if let Some(range) = &preview.date_range {
        lines.push(Line::from(format!("日期范围: {} ~ {}", range.start, range.end)));
    }
    if let Some(securities) = &preview.securities {
        lines.push(Line::from(format!("标的数量: {}", securities.len())));
    }
    lines.push(Line::from(""));
    for row in preview.preview_data.iter().take(8) {
        lines.push(Line::from(Span::styled(
            truncate_text(&row.to_string(), 100),
            Style::default().fg(Color::Gray),
        )));
    }
    lines
}

fn info_lines<'a>(name: &'a str, info: &'a FileInfo) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("--- 信息: {} ---", name),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(format!("总行数: {}", info.total_rows)),
    ];
    if let Some(range) = &info.date_range {
        lines.push(Line::from(format!("日期范围: {} ~ {}", range.start, range.end)));
    }
    if let Some(securities) = &info.securities {
        lines.push(Line::from(format!("标的数量: {}", securities.len())));
        let shown: Vec<&str> = securities.iter().take(12).map(String::as_str).collect();
        lines.push(Line::from(format!("标的: {}", shown.join(", "))));
    }
    lines
}

// ---------- 回测 / 批量回测 ----------

const FORM_LABELS: [&str; 5] = ["策略", "数据文件", "开始日期", "结束日期", "初始资金"];

fn form_lines(form: &BacktestForm, selected: usize, focus: bool) -> Vec<Line<'static>> {
    let values = [
        form.strategy.clone().unwrap_or_else(|| "<未选择>".to_string()),
        form.data_file
            .clone()
            .unwrap_or_else(|| "<未选择>".to_string()),
        form.start_date
            .clone()
            .unwrap_or_else(|| "(自动推断)".to_string()),
        form.end_date
            .clone()
            .unwrap_or_else(|| "(自动推断)".to_string()),
        format!("{:.0}", form.initial_capital),
    ];

    let mut lines = vec![Line::from("")];
    for (i, (label, value)) in FORM_LABELS.iter().zip(values.into_iter()).enumerate() {
        let is_selected = i == selected;
        let label_style = if is_selected && focus {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else if is_selected {
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let value_style = if is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        let marker = if is_selected { "▶ " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(marker.to_string()),
            Span::styled(format!("{:<6}", label), label_style),
            Span::raw("  "),
            Span::styled(value, value_style),
        ]));
    }
    lines
}

fn render_job_status(f: &mut Frame, area: Rect, app: &App) {
    let Some(job_id) = &app.active_job_id else {
        let paragraph = Paragraph::new("尚未提交任务 (Enter 提交)").block(
            Block::default()
                .borders(Borders::ALL)
                .title("任务状态")
                .style(Style::default().fg(Color::White)),
        );
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let status = app
        .active_job
        .as_ref()
        .map(|j| j.status.as_str())
        .unwrap_or("已提交");
    // 后端的 progress 可能是 0-1 也可能是 0-100
    let raw = app.active_job.as_ref().and_then(|j| j.progress).unwrap_or(0.0);
    let norm = if raw > 1.0 { raw / 100.0 } else { raw };
    let mut ratio = norm.clamp(0.0, 1.0);
    if status == "completed" {
        ratio = 1.0;
    }
    let kind = app
        .active_job_kind
        .map(|k| k.label())
        .unwrap_or("任务");

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{}: {}", kind, job_id))
                .style(Style::default().fg(Color::White)),
        )
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{} {:.0}%", status, ratio * 100.0));
    f.render_widget(gauge, chunks[0]);

    let (symbol, color) = job_symbol(status);
    let message = app
        .active_job
        .as_ref()
        .and_then(|j| j.message.clone())
        .unwrap_or_else(|| "等待后端状态...".to_string());
    let message_line = Line::from(vec![
        Span::styled(format!("{} ", symbol), Style::default().fg(color)),
        Span::raw(message),
        Span::styled(
            "  (/job stop 停止跟踪)",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(message_line), chunks[1]);
}

pub fn render_backtest(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(5)])
        .split(area);

    let focus = app.focus_area == FocusArea::MainView;
    let mut lines = form_lines(&app.bt_form, app.bt_field, focus);
    lines.push(Line::from(""));
    if app.bt_loading {
        lines.push(Line::from(Span::styled(
            "  正在加载策略与数据文件列表...",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!(
                "  可选策略 {} 个, 数据文件 {} 个",
                app.bt_strategies.len(),
                app.bt_files.len()
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let title = if focus {
        "回测参数 (↑↓字段 h/l调整 Enter提交)"
    } else {
        "回测参数"
    };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(view_style(app)),
    );
    f.render_widget(paragraph, chunks[0]);

    render_job_status(f, chunks[1], app);
}

pub fn render_batch(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(4),
            Constraint::Length(5),
        ])
        .split(area);

    let focus = app.focus_area == FocusArea::MainView;
    let lines = form_lines(&app.batch_form.base, app.batch_field, focus);
    let title = if focus {
        "批量回测参数 (↑↓字段 h/l调整 Enter提交)"
    } else {
        "批量回测参数"
    };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(view_style(app)),
    );
    f.render_widget(paragraph, chunks[0]);

    let param_items: Vec<ListItem> = if app.batch_form.params.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "  (无参数, 用 /batch param <名称> <值,值,...> 添加)",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.batch_form
            .params
            .iter()
            .map(|(name, values)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("  {:<14}", name),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("[{}]", values.join(", "))),
                    Span::styled(
                        format!("  {} 个值", values.len()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };
    let params = List::new(param_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(
                "参数网格 (组合数: {})",
                app.batch_form.combination_count()
            ))
            .style(view_style(app)),
    );
    f.render_widget(params, chunks[1]);

    render_job_status(f, chunks[2], app);
}

// ---------- 结果 ----------

pub fn render_results(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Min(0)])
        .split(area);

    let left_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Min(0)])
        .split(chunks[0]);

    if app.jobs.is_empty() {
        app.job_list_state.select(None);
    } else {
        app.job_list_state
            .select(Some(app.job_index.min(app.jobs.len() - 1)));
    }

    let job_items: Vec<ListItem> = if app.jobs.is_empty() && app.results_loading {
        vec![ListItem::new("正在加载任务列表...")]
    } else {
        app.jobs
            .iter()
            .map(|job| {
                let (symbol, color) = job_symbol(&job.status);
                let kind = JobKind::from_job_type(&job.job_type).label();
                let progress = match job.progress {
                    Some(p) if job.status == "running" => {
                        let pct = if p > 1.0 { p } else { p * 100.0 };
                        format!(" {:.0}%", pct)
                    }
                    _ => String::new(),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                    Span::styled(format!("{:<10}", job.status), Style::default().fg(color)),
                    Span::raw(format!("{:<10}", kind)),
                    Span::raw(truncate_text(&job.job_id, 14)),
                    Span::styled(progress, Style::default().fg(Color::Cyan)),
                ]))
            })
            .collect()
    };

    let jobs_focused = app.results_focus == ResultsFocus::Jobs;
    let jobs_title = if jobs_focused {
        "任务列表 [焦点] (Enter 图表, Tab 切换)"
    } else {
        "任务列表 (Tab 切换焦点)"
    };
    let jobs_list = List::new(job_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(jobs_title)
                .style(if jobs_focused {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::White)
                }),
        )
        .highlight_style(selected_item_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(jobs_list, left_chunks[0], &mut app.job_list_state);

    if app.reports.is_empty() {
        app.report_list_state.select(None);
    } else {
        app.report_list_state
            .select(Some(app.report_index.min(app.reports.len() - 1)));
    }

    let report_items: Vec<ListItem> = app
        .reports
        .iter()
        .map(|report| {
            // 有会话数据的报告才能画真实收益曲线
            let (marker, marker_color) = if report.session.is_some() {
                ("● ", Color::Green)
            } else {
                ("○ ", Color::Gray)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(marker_color)),
                Span::styled(
                    format!("{:<18}", truncate_text(&report.strategy, 16)),
                    Style::default().fg(Color::White),
                ),
                Span::raw(format!("{} 个文件  ", report.files.len())),
                Span::styled(
                    format_datetime(report.created_at.as_deref()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let reports_focused = app.results_focus == ResultsFocus::Reports;
    let reports_title = if reports_focused {
        "报告列表 [焦点] (Enter 会话图表, p 预览, d 下载)"
    } else {
        "报告列表 (Tab 切换焦点)"
    };
    let reports_list = List::new(report_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(reports_title)
                .style(if reports_focused {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::White)
                }),
        )
        .highlight_style(selected_item_style())
        .highlight_symbol(">> ");
    f.render_stateful_widget(reports_list, left_chunks[1], &mut app.report_list_state);

    // 右侧：图表优先，其次报告预览，都没有则提示
    if let Some(chart) = &app.chart {
        charts::render_chart(f, chunks[1], chart);
    } else if let Some((name, preview)) = &app.report_preview {
        let paragraph = Paragraph::new(report_preview_lines(name, preview)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("报告预览 (x 关闭)")
                .style(Style::default().fg(Color::White)),
        );
        f.render_widget(paragraph, chunks[1]);
    } else {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from("  在左侧选择任务或报告，回车查看收益图表"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "  完成的任务给真实收益曲线, 没有序列时给近似曲线",
                Style::default().fg(Color::DarkGray),
            )]),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("图表")
                .style(Style::default().fg(Color::White)),
        );
        f.render_widget(paragraph, chunks[1]);
    }
}

fn report_preview_lines<'a>(name: &'a str, preview: &'a ReportPreview) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("--- 预览: {} ---", name),
        Style::default().fg(Color::Yellow),
    ))];
    let mut meta = format!("类型: {}", preview.kind);
    if let Some(size) = preview.size {
        meta.push_str(&format!("  大小: {}", format_size(size)));
    }
    lines.push(Line::from(meta));
    lines.push(Line::from(""));

    if let Some(content) = &preview.content {
        for text in content.lines().take(30) {
            lines.push(Line::from(text));
        }
    }
    if let Some(rows) = &preview.preview_data {
        if let Some(columns) = &preview.columns {
            lines.push(Line::from(Span::styled(
                columns.join(" | "),
                Style::default().fg(Color::Cyan),
            )));
        }
        for row in rows.iter().take(10) {
            lines.push(Line::from(Span::styled(
                truncate_text(&row.to_string(), 100),
                Style::default().fg(Color::Gray),
            )));
        }
    }
    lines
}
