use crate::app_state::{App, FocusArea, InputMode, NoticeLevel, Tab};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

pub mod charts;
pub mod format;
pub mod views;

/// 终端宽度低于该值时折叠左侧菜单，标题栏改为显示当前面板名
const MENU_COLLAPSE_WIDTH: u16 = 60;

pub fn draw(f: &mut Frame, app: &mut App) {
    // 创建布局
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    let collapsed = f.size().width < MENU_COLLAPSE_WIDTH;

    // 顶部标题栏
    render_top_bar(f, chunks[0], app, collapsed);

    // 中间内容区域（左侧菜单 + 主视图；窄终端下只保留主视图）
    if collapsed {
        render_main_view(f, chunks[1], app);
    } else {
        let middle_chunks = Layout::default()
            .direction(ratatui::layout::Direction::Horizontal)
            .constraints([Constraint::Length(18), Constraint::Min(0)])
            .split(chunks[1]);

        render_left_menu(f, middle_chunks[0], app);
        render_main_view(f, middle_chunks[1], app);
    }

    // 底部命令/日志区域
    render_bottom_bar(f, chunks[2], app);

    // 浮层：通知在主视图右上角，确认对话框居中
    render_notices(f, chunks[1], app);
    if app.confirm.is_some() {
        render_confirm(f, app);
    }
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App, collapsed: bool) {
    let title = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));

    let mut spans = vec![
        Span::styled(
            " 回测平台控制台 ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - Terminal TUI"),
    ];
    if collapsed {
        // 菜单折叠时当前面板名上移到标题栏
        spans.push(Span::raw("  ["));
        spans.push(Span::styled(
            app.active_tab.title(),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw("]"));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(title)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let is_selected = i == app.menu_index;
            let is_active = *tab == app.active_tab;

            let style = if is_selected {
                // 选中的菜单项
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                // 当前激活的面板
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{} {}", prefix, i + 1, tab.title())).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu =
        List::new(menu_items).block(Block::default().borders(Borders::ALL).title(title).style(
            if app.focus_area == FocusArea::Menu {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            },
        ));

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    match app.active_tab {
        Tab::Dashboard => views::render_dashboard(f, area, app),
        Tab::Strategies => views::render_strategies(f, area, app),
        Tab::Data => views::render_data(f, area, app),
        Tab::Backtest => views::render_backtest(f, area, app),
        Tab::Batch => views::render_batch(f, area, app),
        Tab::Results => views::render_results(f, area, app),
    }
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    // 命令输入区域
    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.cmd_byte_idx(app.command_cursor);
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // 如果有建议，添加浅灰色幽灵文本
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else if app.input_mode == InputMode::Editor {
        vec![
            Line::from(vec![
                Span::styled("编辑: ", Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    "第 {}/{} 行, 第 {} 列",
                    app.editor.cursor_row + 1,
                    app.editor.line_count(),
                    app.editor.cursor_col + 1
                )),
            ]),
            Line::from("Esc退出编辑 Tab缩进 方向键移动 (退出后按 s 保存)"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式)"),
            ]),
            Line::from("/命令 1-6切换面板 r刷新 ←→焦点 ↑↓导航 Enter确认 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(match app.input_mode {
                InputMode::Command => "命令输入模式",
                InputMode::Editor => "编辑模式",
                InputMode::Normal => "命令输入",
            })
            .style(match app.input_mode {
                InputMode::Command => Style::default().fg(Color::Green),
                InputMode::Editor => Style::default().fg(Color::Cyan),
                InputMode::Normal => Style::default().fg(Color::White),
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 日志区域 - 显示最近的日志消息（最多显示最后20条）
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev() // 反转，显示最新的在顶部
        .take(20)
        .map(|msg| {
            // 根据消息类型设置不同的样式
            let style = if msg.starts_with("✓") {
                Style::default().fg(Color::Green)
            } else if msg.starts_with("✗") {
                Style::default().fg(Color::Red)
            } else if msg.starts_with("⚠") {
                Style::default().fg(Color::Yellow)
            } else if msg.starts_with("▶") {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}

/// 通知浮层：主视图右上角，逐条上色，5 秒后由主循环清理
fn render_notices(f: &mut Frame, area: Rect, app: &App) {
    if app.notices.is_empty() || area.width < 30 || area.height < 4 {
        return;
    }

    let lines: Vec<Line> = app
        .notices
        .iter()
        .rev()
        .take(4)
        .map(|n| {
            let style = match n.level {
                NoticeLevel::Success => Style::default().fg(Color::Green),
                NoticeLevel::Error => Style::default().fg(Color::Red),
                NoticeLevel::Info => Style::default().fg(Color::Cyan),
            };
            Line::from(Span::styled(n.text.clone(), style))
        })
        .collect();

    let width = area.width.saturating_sub(4).min(46);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect::new(area.x + area.width - width - 1, area.y, width, height);

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("通知")
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

/// 确认对话框：删除等不可逆操作先弹窗，y 确认 n/Esc 取消
fn render_confirm(f: &mut Frame, app: &App) {
    // 终端太窄时放不下最小弹窗，直接不画
    let area = f.size();
    if area.width < 30 || area.height < 5 {
        return;
    }
    let Some(confirm) = &app.confirm else {
        return;
    };

    let popup_width = area.width.saturating_sub(16).min(54).max(28);
    let popup_height = 5;
    let left = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let top = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup = Rect::new(left, top, popup_width, popup_height);

    let lines = vec![
        Line::from(Span::styled(
            confirm.prompt.clone(),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("y 确认 · n/Esc 取消"),
    ];
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("确认操作")
            .style(Style::default().fg(Color::Red)),
    );
    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}
