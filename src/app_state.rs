use crate::backtest::{BacktestForm, BatchForm, JobKind};
use crate::charts::{self, ChartView};
use crate::commands::AppCommand;
use crate::editor::CodeEditor;
use crate::panels::dashboard::DashboardData;
use crate::panels::data::{infer_date_range, DataPanelData};
use crate::session::dto::{
    DataFile, FileInfo, FilePreview, Job, Report, ReportPreview, StrategyDetail, StrategyMeta,
};
use chrono::{Months, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// 通知的存活时间，到期自动消失
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// 六个互斥的内容面板。枚举封闭，UI 路径上不存在"未知标签页"；
/// 字符串形式的标签名只出现在命令解析里，不认识的名字直接报用法错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Strategies,
    Data,
    Backtest,
    Batch,
    Results,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Strategies,
        Tab::Data,
        Tab::Backtest,
        Tab::Batch,
        Tab::Results,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "概览",
            Tab::Strategies => "策略",
            Tab::Data => "数据",
            Tab::Backtest => "回测",
            Tab::Batch => "批量回测",
            Tab::Results => "结果",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn from_name(name: &str) -> Option<Tab> {
        match name.to_ascii_lowercase().as_str() {
            "overview" | "dashboard" | "概览" => Some(Tab::Dashboard),
            "strategies" | "strategy" | "策略" => Some(Tab::Strategies),
            "data" | "数据" => Some(Tab::Data),
            "backtest" | "回测" => Some(Tab::Backtest),
            "batch" | "批量" | "批量回测" => Some(Tab::Batch),
            "results" | "结果" => Some(Tab::Results),
            _ => None,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
    Editor,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ResultsFocus {
    Jobs,
    Reports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// 瞬时通知，TTL 过后由主循环清理
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub created: Instant,
}

/// 待确认的破坏性操作。确认后才把命令发给后台
#[derive(Debug, Clone)]
pub struct PendingConfirm {
    pub prompt: String,
    pub command: AppCommand,
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Dashboard(DashboardData),
    Strategies(Vec<StrategyMeta>),
    StrategyLoaded(StrategyDetail),
    DataPanel(DataPanelData),
    FilePreviewLoaded { name: String, preview: FilePreview },
    FileInfoLoaded { name: String, info: FileInfo },
    BacktestLists { strategies: Vec<StrategyMeta>, files: Vec<DataFile> },
    JobAccepted { job_id: String, kind: JobKind },
    JobProgress(Job),
    JobFinished(Job),
    Results { jobs: Vec<Job>, reports: Vec<Report> },
    ReportPreviewLoaded { file: String, preview: ReportPreview },
    ChartReady(ChartView),
}

pub struct App {
    pub active_tab: Tab,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_index: usize,

    pub notices: Vec<Notice>,
    pub log_messages: Vec<String>,
    pub confirm: Option<PendingConfirm>,

    // 概览
    pub dashboard: Option<DashboardData>,
    pub dashboard_loading: bool,

    // 策略
    pub strategies: Vec<StrategyMeta>,
    pub strategies_loading: bool,
    pub strategy_index: usize,
    pub strategy_list_state: ListState,
    pub strategy_name: String,
    pub strategy_description: String,
    pub editor: CodeEditor,

    // 数据
    pub data: DataPanelData,
    pub data_loading: bool,
    pub file_index: usize,
    pub file_list_state: ListState,
    pub file_preview: Option<(String, FilePreview)>,
    pub file_info: Option<(String, FileInfo)>,

    // 回测 / 批量回测共用的选择列表
    pub bt_strategies: Vec<StrategyMeta>,
    pub bt_files: Vec<DataFile>,
    pub bt_loading: bool,
    pub bt_form: BacktestForm,
    pub bt_field: usize,
    pub bt_strategy_idx: usize,
    pub bt_file_idx: usize,
    pub batch_form: BatchForm,
    pub batch_field: usize,
    pub batch_strategy_idx: usize,
    pub batch_file_idx: usize,

    // 进行中的任务
    pub active_job_id: Option<String>,
    pub active_job_kind: Option<JobKind>,
    pub active_job: Option<Job>,

    // 结果
    pub jobs: Vec<Job>,
    pub reports: Vec<Report>,
    pub results_loading: bool,
    pub results_focus: ResultsFocus,
    pub job_index: usize,
    pub job_list_state: ListState,
    pub report_index: usize,
    pub report_list_state: ListState,
    pub report_preview: Option<(String, ReportPreview)>,
    pub chart: Option<ChartView>,

    // 命令行
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,

    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

fn selected(index: usize) -> ListState {
    let mut s = ListState::default();
    s.select(Some(index));
    s
}

impl App {
    pub fn new(
        session_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(session_info);

        App {
            active_tab: Tab::Dashboard,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_index: 0,
            notices: Vec::new(),
            log_messages,
            confirm: None,
            dashboard: None,
            dashboard_loading: false,
            strategies: Vec::new(),
            strategies_loading: false,
            strategy_index: 0,
            strategy_list_state: selected(0),
            strategy_name: String::new(),
            strategy_description: String::new(),
            editor: CodeEditor::new(),
            data: DataPanelData::default(),
            data_loading: false,
            file_index: 0,
            file_list_state: selected(0),
            file_preview: None,
            file_info: None,
            bt_strategies: Vec::new(),
            bt_files: Vec::new(),
            bt_loading: false,
            bt_form: BacktestForm::default(),
            bt_field: 0,
            bt_strategy_idx: 0,
            bt_file_idx: 0,
            batch_form: BatchForm::default(),
            batch_field: 0,
            batch_strategy_idx: 0,
            batch_file_idx: 0,
            active_job_id: None,
            active_job_kind: None,
            active_job: None,
            jobs: Vec::new(),
            reports: Vec::new(),
            results_loading: false,
            results_focus: ResultsFocus::Jobs,
            job_index: 0,
            job_list_state: selected(0),
            report_index: 0,
            report_list_state: selected(0),
            report_preview: None,
            chart: None,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn push_notice(&mut self, level: NoticeLevel, text: String) {
        self.notices.push(Notice {
            level,
            text,
            created: Instant::now(),
        });
    }

    /// 主循环每帧调用，清掉过期通知
    pub fn purge_notices(&mut self) {
        self.notices.retain(|n| n.created.elapsed() < NOTICE_TTL);
    }

    /// 切换标签页：记录活动页、同步菜单高亮、恰好派发一次对应加载命令
    pub fn switch_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
        self.menu_index = tab.index();
        match tab {
            Tab::Dashboard => self.dashboard_loading = true,
            Tab::Strategies => self.strategies_loading = true,
            Tab::Data => self.data_loading = true,
            Tab::Backtest | Tab::Batch => self.bt_loading = true,
            Tab::Results => self.results_loading = true,
        }
        let _ = self.cmd_tx.send(AppCommand::Load(tab));
    }

    pub fn apply_event(&mut self, evt: AppEvent) {
        match evt {
            AppEvent::Log(msg) => self.add_log(msg),
            AppEvent::Message(msg) => {
                self.add_log(msg.clone());
                self.push_notice(NoticeLevel::Success, msg);
            }
            AppEvent::Error(msg) => {
                self.add_log(format!("✗ {}", msg));
                self.push_notice(NoticeLevel::Error, msg);
            }
            AppEvent::Dashboard(data) => {
                self.dashboard = Some(data);
                self.dashboard_loading = false;
            }
            AppEvent::Strategies(list) => {
                self.strategies = list;
                self.strategies_loading = false;
                if self.strategy_index >= self.strategies.len() {
                    self.strategy_index = self.strategies.len().saturating_sub(1);
                }
                self.strategy_list_state.select(Some(self.strategy_index));
            }
            AppEvent::StrategyLoaded(detail) => {
                // 整体替换编辑区，未保存的修改直接丢弃
                self.strategy_name = detail.name;
                self.strategy_description = detail.description;
                self.editor.load(&detail.code);
                self.add_log(format!("✓ 已载入策略: {}", self.strategy_name));
            }
            AppEvent::DataPanel(data) => {
                self.data = data;
                self.data_loading = false;
                if self.file_index >= self.data.files.len() {
                    self.file_index = self.data.files.len().saturating_sub(1);
                }
                self.file_list_state.select(Some(self.file_index));
            }
            AppEvent::FilePreviewLoaded { name, preview } => {
                self.file_info = None;
                self.file_preview = Some((name, preview));
            }
            AppEvent::FileInfoLoaded { name, info } => {
                self.file_preview = None;
                self.file_info = Some((name, info));
            }
            AppEvent::BacktestLists { strategies, files } => {
                self.bt_strategies = strategies;
                self.bt_files = files;
                self.bt_loading = false;
                self.bt_strategy_idx = self.bt_strategy_idx.min(self.bt_strategies.len().saturating_sub(1));
                self.bt_file_idx = self.bt_file_idx.min(self.bt_files.len().saturating_sub(1));
                self.batch_strategy_idx = self.batch_strategy_idx.min(self.bt_strategies.len().saturating_sub(1));
                self.batch_file_idx = self.batch_file_idx.min(self.bt_files.len().saturating_sub(1));
                self.seed_forms_from_lists();
            }
            AppEvent::JobAccepted { job_id, kind } => {
                self.active_job_id = Some(job_id);
                self.active_job_kind = Some(kind);
                self.active_job = None;
            }
            AppEvent::JobProgress(job) => {
                self.active_job = Some(job);
            }
            AppEvent::JobFinished(job) => {
                self.active_job = Some(job);
            }
            AppEvent::Results { jobs, reports } => {
                self.jobs = jobs;
                self.reports = reports;
                self.results_loading = false;
                if self.job_index >= self.jobs.len() {
                    self.job_index = self.jobs.len().saturating_sub(1);
                }
                if self.report_index >= self.reports.len() {
                    self.report_index = self.reports.len().saturating_sub(1);
                }
                self.job_list_state.select(Some(self.job_index));
                self.report_list_state.select(Some(self.report_index));
            }
            AppEvent::ReportPreviewLoaded { file, preview } => {
                self.chart = None;
                self.report_preview = Some((file, preview));
            }
            AppEvent::ChartReady(view) => {
                self.report_preview = None;
                self.chart = Some(view);
            }
        }
    }

    /// 列表数据到位后给表单补默认选择；日期缺失时尝试按文件名推断
    fn seed_forms_from_lists(&mut self) {
        if self.bt_form.strategy.is_none() {
            if let Some(s) = self.bt_strategies.first() {
                self.bt_form.strategy = Some(s.name.clone());
            }
        }
        if self.bt_form.data_file.is_none() {
            if let Some(f) = self.bt_files.first() {
                self.bt_form.data_file = Some(f.name.clone());
                self.prefill_dates_for_backtest();
            }
        }
        if self.batch_form.base.strategy.is_none() {
            if let Some(s) = self.bt_strategies.first() {
                self.batch_form.base.strategy = Some(s.name.clone());
            }
        }
        if self.batch_form.base.data_file.is_none() {
            if let Some(f) = self.bt_files.first() {
                self.batch_form.base.data_file = Some(f.name.clone());
                self.prefill_dates_for_batch();
            }
        }
    }

    fn prefill_dates_for_backtest(&mut self) {
        if self.bt_form.start_date.is_some() || self.bt_form.end_date.is_some() {
            return;
        }
        if let Some(name) = &self.bt_form.data_file {
            if let Some((start, end)) = infer_date_range(name) {
                self.bt_form.start_date = Some(start);
                self.bt_form.end_date = Some(end);
            }
        }
    }

    fn prefill_dates_for_batch(&mut self) {
        if self.batch_form.base.start_date.is_some() || self.batch_form.base.end_date.is_some() {
            return;
        }
        if let Some(name) = &self.batch_form.base.data_file {
            if let Some((start, end)) = infer_date_range(name) {
                self.batch_form.base.start_date = Some(start);
                self.batch_form.base.end_date = Some(end);
            }
        }
    }

    pub fn selected_strategy(&self) -> Option<&StrategyMeta> {
        self.strategies.get(self.strategy_index)
    }

    pub fn selected_file(&self) -> Option<&DataFile> {
        self.data.files.get(self.file_index)
    }

    pub fn selected_job(&self) -> Option<&Job> {
        self.jobs.get(self.job_index)
    }

    pub fn selected_report(&self) -> Option<&Report> {
        self.reports.get(self.report_index)
    }

    /// 命令补全提示
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = vec![
            "tab", "strategy", "preview", "info", "download", "upload", "delete", "report",
            "chart", "job", "config", "batch", "bt", "toggle", "name", "desc", "reload", "help",
            "quit",
        ];
        let input = self.command_input.trim_start();
        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() == 1 && !input.ends_with(' ') {
            for cmd in commands {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }

        let subs: &[&str] = match parts[0] {
            "tab" => &["overview", "strategies", "data", "backtest", "batch", "results"],
            "strategy" => &["load", "new", "save"],
            "delete" => &["strategy", "file"],
            "report" => &["preview", "download"],
            "job" => &["stop"],
            "config" => &["push"],
            "batch" => &["run", "param", "clear", "capital", "start", "end"],
            "bt" => &["run", "capital", "start", "end"],
            _ => return None,
        };
        let cur = if parts.len() >= 2 { parts[1] } else { "" };
        for s in subs {
            if s.starts_with(cur) && *s != cur {
                return Some(s[cur.len()..].to_string());
            }
        }
        None
    }

    pub fn cmd_byte_idx(&self, char_idx: usize) -> usize {
        self.command_input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.command_input.len())
    }

    fn command_char_len(&self) -> usize {
        self.command_input.chars().count()
    }

    fn close_command_mode(&mut self) {
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    /// 解析并执行一条命令行。依赖本地状态的命令就地处理，
    /// 其余解析成 AppCommand 交给后台。返回 true 表示退出应用。
    fn execute_command_line(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["reload"] => {
                self.switch_tab(self.active_tab);
                return false;
            }
            ["strategy", "new"] => {
                self.new_strategy(None);
                return false;
            }
            ["strategy", "new", name] => {
                self.new_strategy(Some(name));
                return false;
            }
            ["strategy", "save"] => {
                self.request_strategy_save();
                return false;
            }
            ["name", rest @ ..] if !rest.is_empty() => {
                self.strategy_name = rest.join(" ");
                self.push_notice(
                    NoticeLevel::Info,
                    format!("策略名: {}", self.strategy_name),
                );
                return false;
            }
            ["desc", rest @ ..] if !rest.is_empty() => {
                self.strategy_description = rest.join(" ");
                self.push_notice(NoticeLevel::Info, "描述已更新".to_string());
                return false;
            }
            ["toggle", name] => {
                self.toggle_source(name);
                return false;
            }
            ["config", "push"] => {
                let _ = self.cmd_tx.send(AppCommand::ConfigPush {
                    config: self.data.config.clone(),
                });
                return false;
            }
            ["bt", "run"] => {
                let _ = self.cmd_tx.send(AppCommand::RunBacktest(self.bt_form.clone()));
                return false;
            }
            ["bt", "capital", v] => {
                match v.parse::<f64>() {
                    Ok(c) if c > 0.0 => {
                        self.bt_form.initial_capital = c;
                        self.push_notice(NoticeLevel::Info, format!("初始资金: {}", c));
                    }
                    _ => self.push_notice(NoticeLevel::Error, format!("无效的金额: {}", v)),
                }
                return false;
            }
            ["bt", "start", d] => {
                self.set_form_date(true, true, d);
                return false;
            }
            ["bt", "end", d] => {
                self.set_form_date(true, false, d);
                return false;
            }
            ["batch", "run"] => {
                let _ = self.cmd_tx.send(AppCommand::RunBatch(self.batch_form.clone()));
                return false;
            }
            ["batch", "param", name, values] => {
                let list: Vec<String> = values
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if list.is_empty() {
                    self.push_notice(NoticeLevel::Error, "参数取值列表为空".to_string());
                } else {
                    self.batch_form.set_param(name, list);
                    self.push_notice(
                        NoticeLevel::Info,
                        format!("参数 {} 已设置, 共 {} 个组合", name, self.batch_form.combination_count()),
                    );
                }
                return false;
            }
            ["batch", "clear", name] => {
                if self.batch_form.remove_param(name) {
                    self.push_notice(NoticeLevel::Info, format!("参数已移除: {}", name));
                } else {
                    self.push_notice(NoticeLevel::Error, format!("没有这个参数: {}", name));
                }
                return false;
            }
            ["batch", "capital", v] => {
                match v.parse::<f64>() {
                    Ok(c) if c > 0.0 => {
                        self.batch_form.base.initial_capital = c;
                        self.push_notice(NoticeLevel::Info, format!("初始资金: {}", c));
                    }
                    _ => self.push_notice(NoticeLevel::Error, format!("无效的金额: {}", v)),
                }
                return false;
            }
            ["batch", "start", d] => {
                self.set_form_date(false, true, d);
                return false;
            }
            ["batch", "end", d] => {
                self.set_form_date(false, false, d);
                return false;
            }
            _ => {}
        }

        match AppCommand::from_str(line) {
            Ok(AppCommand::Quit) => return true,
            Ok(AppCommand::Unknown(msg)) if msg.is_empty() => {}
            Ok(AppCommand::StrategyDelete { name }) => {
                self.confirm = Some(PendingConfirm {
                    prompt: format!("确认删除策略 {} ? (y/n)", name),
                    command: AppCommand::StrategyDelete { name },
                });
            }
            Ok(AppCommand::FileDelete { name }) => {
                self.confirm = Some(PendingConfirm {
                    prompt: format!("确认删除数据文件 {} ? (y/n)", name),
                    command: AppCommand::FileDelete { name },
                });
            }
            Ok(AppCommand::Load(tab)) => self.switch_tab(tab),
            Ok(cmd) => {
                let _ = self.cmd_tx.send(cmd);
            }
            Err(()) => {}
        }
        false
    }

    fn set_form_date(&mut self, backtest: bool, start: bool, raw: &str) {
        if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
            self.push_notice(NoticeLevel::Error, format!("日期格式应为 YYYY-MM-DD: {}", raw));
            return;
        }
        let form = if backtest {
            &mut self.bt_form
        } else {
            &mut self.batch_form.base
        };
        if start {
            form.start_date = Some(raw.to_string());
        } else {
            form.end_date = Some(raw.to_string());
        }
        self.push_notice(NoticeLevel::Info, format!("日期已更新: {}", raw));
    }

    fn new_strategy(&mut self, name: Option<&str>) {
        self.strategy_name = name.unwrap_or("").to_string();
        self.strategy_description.clear();
        self.editor.reset_template();
        self.active_tab = Tab::Strategies;
        self.menu_index = Tab::Strategies.index();
        self.push_notice(NoticeLevel::Info, "已创建新策略模板".to_string());
    }

    fn request_strategy_save(&mut self) {
        let _ = self.cmd_tx.send(AppCommand::StrategySave {
            name: self.strategy_name.clone(),
            description: self.strategy_description.clone(),
            code: self.editor.text(),
        });
    }

    fn toggle_source(&mut self, name: &str) {
        match self.data.config.get_mut(name) {
            Some(cfg) => {
                cfg.enabled = !cfg.enabled;
                let state = if cfg.enabled { "启用" } else { "停用" };
                self.push_notice(NoticeLevel::Info, format!("数据源 {} 已{} (config push 生效)", name, state));
            }
            None => {
                self.push_notice(NoticeLevel::Error, format!("没有这个数据源: {}", name));
            }
        }
    }

    fn confirm_delete_selected_strategy(&mut self) {
        if let Some(meta) = self.selected_strategy() {
            let name = meta.name.clone();
            self.confirm = Some(PendingConfirm {
                prompt: format!("确认删除策略 {} ? (y/n)", name),
                command: AppCommand::StrategyDelete { name },
            });
        }
    }

    fn confirm_delete_selected_file(&mut self) {
        if let Some(file) = self.selected_file() {
            let name = file.name.clone();
            self.confirm = Some(PendingConfirm {
                prompt: format!("确认删除数据文件 {} ? (y/n)", name),
                command: AppCommand::FileDelete { name },
            });
        }
    }

    fn chart_selected_job(&mut self) {
        let Some(job) = self.selected_job().cloned() else {
            return;
        };
        match charts::chart_for_job(&job, &mut rand::thread_rng()) {
            Some(view) => {
                self.report_preview = None;
                self.chart = Some(view);
            }
            None => {
                self.push_notice(
                    NoticeLevel::Error,
                    format!("任务 {} 没有可视化结果", job.job_id),
                );
            }
        }
    }

    fn open_selected_report(&mut self) {
        let Some(report) = self.selected_report() else {
            return;
        };
        let strategy = report.strategy.clone();
        match &report.session {
            Some(session) => {
                let _ = self.cmd_tx.send(AppCommand::SessionChart {
                    strategy,
                    session: session.clone(),
                });
            }
            None => {
                self.push_notice(
                    NoticeLevel::Error,
                    format!("报告 {} 没有会话数据", strategy),
                );
            }
        }
    }

    fn preview_selected_report(&mut self) {
        let Some(report) = self.selected_report() else {
            return;
        };
        match report.files.first() {
            Some(file) => {
                let _ = self.cmd_tx.send(AppCommand::ReportPreview {
                    strategy: report.strategy.clone(),
                    file: file.name.clone(),
                });
            }
            None => {
                self.push_notice(NoticeLevel::Error, "该报告没有输出文件".to_string());
            }
        }
    }

    fn download_selected_report(&mut self) {
        let Some(report) = self.selected_report() else {
            return;
        };
        match report.files.first() {
            Some(file) => {
                let _ = self.cmd_tx.send(AppCommand::ReportDownload {
                    strategy: report.strategy.clone(),
                    file: file.name.clone(),
                });
            }
            None => {
                self.push_notice(NoticeLevel::Error, "该报告没有输出文件".to_string());
            }
        }
    }

    /// 回测表单的 h/l 调整：选择器循环、日期按月平移、资金步进
    fn adjust_bt_field(&mut self, delta: i32) {
        match self.bt_field {
            0 => {
                if !self.bt_strategies.is_empty() {
                    self.bt_strategy_idx = cycle(self.bt_strategy_idx, self.bt_strategies.len(), delta);
                    self.bt_form.strategy = Some(self.bt_strategies[self.bt_strategy_idx].name.clone());
                }
            }
            1 => {
                if !self.bt_files.is_empty() {
                    self.bt_file_idx = cycle(self.bt_file_idx, self.bt_files.len(), delta);
                    self.bt_form.data_file = Some(self.bt_files[self.bt_file_idx].name.clone());
                    self.bt_form.start_date = None;
                    self.bt_form.end_date = None;
                    self.prefill_dates_for_backtest();
                }
            }
            2 => {
                if let Some(d) = self.bt_form.start_date.as_deref().and_then(|d| shift_month(d, delta)) {
                    self.bt_form.start_date = Some(d);
                }
            }
            3 => {
                if let Some(d) = self.bt_form.end_date.as_deref().and_then(|d| shift_month(d, delta)) {
                    self.bt_form.end_date = Some(d);
                }
            }
            4 => {
                let step = 100_000.0 * delta as f64;
                self.bt_form.initial_capital = (self.bt_form.initial_capital + step).max(10_000.0);
            }
            _ => {}
        }
    }

    fn adjust_batch_field(&mut self, delta: i32) {
        match self.batch_field {
            0 => {
                if !self.bt_strategies.is_empty() {
                    self.batch_strategy_idx = cycle(self.batch_strategy_idx, self.bt_strategies.len(), delta);
                    self.batch_form.base.strategy =
                        Some(self.bt_strategies[self.batch_strategy_idx].name.clone());
                }
            }
            1 => {
                if !self.bt_files.is_empty() {
                    self.batch_file_idx = cycle(self.batch_file_idx, self.bt_files.len(), delta);
                    self.batch_form.base.data_file =
                        Some(self.bt_files[self.batch_file_idx].name.clone());
                    self.batch_form.base.start_date = None;
                    self.batch_form.base.end_date = None;
                    self.prefill_dates_for_batch();
                }
            }
            2 => {
                if let Some(d) = self
                    .batch_form
                    .base
                    .start_date
                    .as_deref()
                    .and_then(|d| shift_month(d, delta))
                {
                    self.batch_form.base.start_date = Some(d);
                }
            }
            3 => {
                if let Some(d) = self
                    .batch_form
                    .base
                    .end_date
                    .as_deref()
                    .and_then(|d| shift_month(d, delta))
                {
                    self.batch_form.base.end_date = Some(d);
                }
            }
            4 => {
                let step = 100_000.0 * delta as f64;
                self.batch_form.base.initial_capital =
                    (self.batch_form.base.initial_capital + step).max(10_000.0);
            }
            _ => {}
        }
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        // 确认弹窗优先截获按键
        if let Some(pending) = self.confirm.take() {
            match key {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let _ = self.cmd_tx.send(pending.command);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.add_log("○ 已取消".to_string());
                }
                _ => {
                    // 其他按键保持弹窗
                    self.confirm = Some(pending);
                }
            }
            return false;
        }

        if self.input_mode == InputMode::Command {
            return self.handle_command_key(key);
        }
        if self.input_mode == InputMode::Editor {
            self.handle_editor_key(key);
            return false;
        }

        // 正常模式
        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                self.switch_tab(Tab::ALL[idx]);
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Char('r') => {
                self.switch_tab(self.active_tab);
                false
            }
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.handle_up();
                false
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.handle_down();
                false
            }
            KeyCode::Char('h') => {
                self.handle_adjust(-1);
                false
            }
            KeyCode::Char('l') => {
                self.handle_adjust(1);
                false
            }
            KeyCode::Enter => {
                self.handle_enter();
                false
            }
            KeyCode::Tab => {
                if self.active_tab == Tab::Results {
                    self.results_focus = match self.results_focus {
                        ResultsFocus::Jobs => ResultsFocus::Reports,
                        ResultsFocus::Reports => ResultsFocus::Jobs,
                    };
                }
                false
            }
            KeyCode::Char('e') => {
                if self.active_tab == Tab::Strategies && self.focus_area == FocusArea::MainView {
                    self.input_mode = InputMode::Editor;
                }
                false
            }
            KeyCode::Char('n') => {
                if self.active_tab == Tab::Strategies && self.focus_area == FocusArea::MainView {
                    self.new_strategy(None);
                }
                false
            }
            KeyCode::Char('s') => {
                if self.active_tab == Tab::Strategies && self.focus_area == FocusArea::MainView {
                    self.request_strategy_save();
                }
                false
            }
            KeyCode::Char('p') => {
                match self.active_tab {
                    Tab::Data => {
                        if let Some(file) = self.selected_file() {
                            let name = file.name.clone();
                            let _ = self.cmd_tx.send(AppCommand::FilePreview { name });
                        }
                    }
                    Tab::Results => self.preview_selected_report(),
                    _ => {}
                }
                false
            }
            KeyCode::Char('i') => {
                if self.active_tab == Tab::Data {
                    if let Some(file) = self.selected_file() {
                        let name = file.name.clone();
                        let _ = self.cmd_tx.send(AppCommand::FileInfo { name });
                    }
                }
                false
            }
            KeyCode::Char('d') => {
                match self.active_tab {
                    Tab::Data => {
                        if let Some(file) = self.selected_file() {
                            let name = file.name.clone();
                            let _ = self.cmd_tx.send(AppCommand::FileDownload { name });
                        }
                    }
                    Tab::Results => self.download_selected_report(),
                    _ => {}
                }
                false
            }
            KeyCode::Char('x') => {
                match self.active_tab {
                    Tab::Strategies => self.confirm_delete_selected_strategy(),
                    Tab::Data => {
                        if self.file_preview.is_some() || self.file_info.is_some() {
                            self.file_preview = None;
                            self.file_info = None;
                        } else {
                            self.confirm_delete_selected_file();
                        }
                    }
                    Tab::Results => {
                        self.chart = None;
                        self.report_preview = None;
                    }
                    _ => {}
                }
                false
            }
            _ => false,
        }
    }

    fn handle_up(&mut self) {
        if self.focus_area == FocusArea::Menu {
            if self.menu_index > 0 {
                self.menu_index -= 1;
            }
            return;
        }
        match self.active_tab {
            Tab::Strategies => {
                if self.strategy_index > 0 {
                    self.strategy_index -= 1;
                }
                self.strategy_list_state.select(Some(self.strategy_index));
            }
            Tab::Data => {
                if self.file_index > 0 {
                    self.file_index -= 1;
                }
                self.file_list_state.select(Some(self.file_index));
            }
            Tab::Backtest => {
                self.bt_field = self.bt_field.saturating_sub(1);
            }
            Tab::Batch => {
                self.batch_field = self.batch_field.saturating_sub(1);
            }
            Tab::Results => match self.results_focus {
                ResultsFocus::Jobs => {
                    if self.job_index > 0 {
                        self.job_index -= 1;
                    }
                    self.job_list_state.select(Some(self.job_index));
                }
                ResultsFocus::Reports => {
                    if self.report_index > 0 {
                        self.report_index -= 1;
                    }
                    self.report_list_state.select(Some(self.report_index));
                }
            },
            Tab::Dashboard => {}
        }
    }

    fn handle_down(&mut self) {
        if self.focus_area == FocusArea::Menu {
            if self.menu_index + 1 < Tab::ALL.len() {
                self.menu_index += 1;
            }
            return;
        }
        match self.active_tab {
            Tab::Strategies => {
                if self.strategy_index + 1 < self.strategies.len() {
                    self.strategy_index += 1;
                }
                self.strategy_list_state.select(Some(self.strategy_index));
            }
            Tab::Data => {
                if self.file_index + 1 < self.data.files.len() {
                    self.file_index += 1;
                }
                self.file_list_state.select(Some(self.file_index));
            }
            Tab::Backtest => {
                if self.bt_field < 4 {
                    self.bt_field += 1;
                }
            }
            Tab::Batch => {
                if self.batch_field < 4 {
                    self.batch_field += 1;
                }
            }
            Tab::Results => match self.results_focus {
                ResultsFocus::Jobs => {
                    if self.job_index + 1 < self.jobs.len() {
                        self.job_index += 1;
                    }
                    self.job_list_state.select(Some(self.job_index));
                }
                ResultsFocus::Reports => {
                    if self.report_index + 1 < self.reports.len() {
                        self.report_index += 1;
                    }
                    self.report_list_state.select(Some(self.report_index));
                }
            },
            Tab::Dashboard => {}
        }
    }

    fn handle_adjust(&mut self, delta: i32) {
        if self.focus_area != FocusArea::MainView {
            return;
        }
        match self.active_tab {
            Tab::Backtest => self.adjust_bt_field(delta),
            Tab::Batch => self.adjust_batch_field(delta),
            _ => {}
        }
    }

    fn handle_enter(&mut self) {
        if self.focus_area == FocusArea::Menu {
            let tab = Tab::ALL[self.menu_index];
            self.switch_tab(tab);
            self.focus_area = FocusArea::MainView;
            return;
        }
        match self.active_tab {
            Tab::Strategies => {
                if let Some(meta) = self.selected_strategy() {
                    let name = meta.name.clone();
                    let _ = self.cmd_tx.send(AppCommand::StrategyLoad { name });
                }
            }
            Tab::Backtest => {
                let _ = self.cmd_tx.send(AppCommand::RunBacktest(self.bt_form.clone()));
            }
            Tab::Batch => {
                let _ = self.cmd_tx.send(AppCommand::RunBatch(self.batch_form.clone()));
            }
            Tab::Results => match self.results_focus {
                ResultsFocus::Jobs => self.chart_selected_job(),
                ResultsFocus::Reports => self.open_selected_report(),
            },
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => {
                let cmd_owned = self.command_input.trim().to_string();
                self.close_command_mode();
                if cmd_owned.is_empty() {
                    return false;
                }
                self.command_history.push(cmd_owned.clone());
                self.command_history_index = None;
                self.execute_command_line(&cmd_owned)
            }
            KeyCode::Esc => {
                self.close_command_mode();
                false
            }
            KeyCode::Tab => {
                if let Some(hint) = self.get_completion_hint() {
                    let insert = format!("{} ", hint);
                    let idx = self.cmd_byte_idx(self.command_cursor);
                    self.command_input.insert_str(idx, &insert);
                    self.command_cursor += insert.chars().count();
                }
                false
            }
            KeyCode::Up => {
                if self.command_history.is_empty() {
                    return false;
                }
                let next = match self.command_history_index {
                    None => self.command_history.len().saturating_sub(1),
                    Some(i) => i.saturating_sub(1),
                };
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_char_len();
                }
                false
            }
            KeyCode::Down => {
                let Some(i) = self.command_history_index else {
                    return false;
                };
                let n = i + 1;
                if n >= self.command_history.len() {
                    self.command_history_index = None;
                    self.command_input.clear();
                    self.command_cursor = 0;
                    return false;
                }
                self.command_history_index = Some(n);
                if let Some(cmd) = self.command_history.get(n) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_char_len();
                }
                false
            }
            KeyCode::Backspace => {
                if self.command_cursor > 0 {
                    let idx = self.cmd_byte_idx(self.command_cursor - 1);
                    self.command_input.remove(idx);
                    self.command_cursor -= 1;
                }
                false
            }
            KeyCode::Delete => {
                if self.command_cursor < self.command_char_len() {
                    let idx = self.cmd_byte_idx(self.command_cursor);
                    self.command_input.remove(idx);
                }
                false
            }
            KeyCode::Left => {
                self.command_cursor = self.command_cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                if self.command_cursor < self.command_char_len() {
                    self.command_cursor += 1;
                }
                false
            }
            KeyCode::Home => {
                self.command_cursor = 0;
                false
            }
            KeyCode::End => {
                self.command_cursor = self.command_char_len();
                false
            }
            KeyCode::Char(c) => {
                let idx = self.cmd_byte_idx(self.command_cursor);
                self.command_input.insert(idx, c);
                self.command_cursor += 1;
                false
            }
            _ => false,
        }
    }

    fn handle_editor_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => self.editor.insert_newline(),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Left => self.editor.move_left(),
            KeyCode::Right => self.editor.move_right(),
            KeyCode::Up => self.editor.move_up(),
            KeyCode::Down => self.editor.move_down(),
            KeyCode::Home => self.editor.move_home(),
            KeyCode::End => self.editor.move_end(),
            KeyCode::Tab => {
                for _ in 0..4 {
                    self.editor.insert_char(' ');
                }
            }
            KeyCode::Char(c) => self.editor.insert_char(c),
            _ => {}
        }
    }
}

fn cycle(index: usize, len: usize, delta: i32) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i32;
    let next = (index as i32 + delta).rem_euclid(len);
    next as usize
}

/// 把 YYYY-MM-DD 平移 delta 个月，解析失败时返回 None
fn shift_month(date: &str, delta: i32) -> Option<String> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let shifted = if delta >= 0 {
        d.checked_add_months(Months::new(delta as u32))?
    } else {
        d.checked_sub_months(Months::new((-delta) as u32))?
    };
    Some(shifted.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_evt_tx, evt_rx) = mpsc::unbounded_channel();
        (App::new(Vec::new(), cmd_tx, evt_rx), cmd_rx)
    }

    fn meta(name: &str) -> StrategyMeta {
        StrategyMeta {
            name: name.to_string(),
            description: String::new(),
            size: 0,
            modified: None,
        }
    }

    fn data_file(name: &str) -> DataFile {
        DataFile {
            name: name.to_string(),
            columns: Vec::new(),
            size: 0,
            modified: None,
            uploaded: false,
        }
    }

    #[test]
    fn switch_tab_dispatches_exactly_one_loader() {
        let (mut app, mut cmd_rx) = test_app();
        app.switch_tab(Tab::Results);

        assert_eq!(app.active_tab, Tab::Results);
        assert_eq!(app.menu_index, Tab::Results.index());
        assert!(app.results_loading);
        assert!(matches!(cmd_rx.try_recv(), Ok(AppCommand::Load(Tab::Results))));
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn tab_names_resolve_and_unknown_is_none() {
        assert_eq!(Tab::from_name("overview"), Some(Tab::Dashboard));
        assert_eq!(Tab::from_name("概览"), Some(Tab::Dashboard));
        assert_eq!(Tab::from_name("BATCH"), Some(Tab::Batch));
        assert_eq!(Tab::from_name("nowhere"), None);
    }

    #[test]
    fn digit_key_switches_tab_directly() {
        let (mut app, mut cmd_rx) = test_app();
        app.handle_key_event(KeyCode::Char('3'));
        assert_eq!(app.active_tab, Tab::Data);
        assert!(matches!(cmd_rx.try_recv(), Ok(AppCommand::Load(Tab::Data))));
    }

    #[test]
    fn loading_flag_cleared_only_by_successful_panel_event() {
        let (mut app, _cmd_rx) = test_app();
        app.switch_tab(Tab::Dashboard);
        assert!(app.dashboard_loading);

        // 错误事件不清加载标记，面板保持原状
        app.apply_event(AppEvent::Error("概览加载失败: boom".to_string()));
        assert!(app.dashboard_loading);
        assert!(app.dashboard.is_none());

        app.apply_event(AppEvent::Dashboard(DashboardData::default()));
        assert!(!app.dashboard_loading);
        assert!(app.dashboard.is_some());
    }

    #[test]
    fn strategy_load_replaces_editor_without_prompt() {
        let (mut app, _cmd_rx) = test_app();
        app.editor.load("original edits");
        app.strategy_name = "old".to_string();

        app.apply_event(AppEvent::StrategyLoaded(StrategyDetail {
            name: "momentum".to_string(),
            description: "动量".to_string(),
            code: "def generate_signals(data):\n    pass".to_string(),
        }));

        assert_eq!(app.strategy_name, "momentum");
        assert!(app.editor.text().starts_with("def generate_signals"));
        assert!(app.confirm.is_none());
    }

    #[test]
    fn notices_expire_after_ttl() {
        let (mut app, _cmd_rx) = test_app();
        app.push_notice(NoticeLevel::Success, "done".to_string());
        app.purge_notices();
        assert_eq!(app.notices.len(), 1);

        app.notices[0].created = Instant::now() - (NOTICE_TTL + Duration::from_millis(50));
        app.purge_notices();
        assert!(app.notices.is_empty());
    }

    #[test]
    fn delete_key_requires_confirmation() {
        let (mut app, mut cmd_rx) = test_app();
        app.apply_event(AppEvent::Strategies(vec![meta("momentum")]));
        app.active_tab = Tab::Strategies;
        app.focus_area = FocusArea::MainView;

        app.handle_key_event(KeyCode::Char('x'));
        assert!(app.confirm.is_some());
        assert!(cmd_rx.try_recv().is_err());

        app.handle_key_event(KeyCode::Char('y'));
        assert!(app.confirm.is_none());
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(AppCommand::StrategyDelete { .. })
        ));
    }

    #[test]
    fn confirm_can_be_cancelled() {
        let (mut app, mut cmd_rx) = test_app();
        app.apply_event(AppEvent::Strategies(vec![meta("momentum")]));
        app.active_tab = Tab::Strategies;
        app.focus_area = FocusArea::MainView;

        app.handle_key_event(KeyCode::Char('x'));
        app.handle_key_event(KeyCode::Char('n'));
        assert!(app.confirm.is_none());
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn command_mode_roundtrip_sends_parsed_command() {
        let (mut app, mut cmd_rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        assert_eq!(app.input_mode, InputMode::Command);
        for c in "tab results".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(matches!(cmd_rx.try_recv(), Ok(AppCommand::Load(Tab::Results))));
        assert_eq!(app.command_history.len(), 1);
    }

    #[test]
    fn quit_command_exits_locally() {
        let (mut app, mut cmd_rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        for c in "quit".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        assert!(app.handle_key_event(KeyCode::Enter));
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn picker_prefills_dates_from_filename() {
        let (mut app, _cmd_rx) = test_app();
        app.apply_event(AppEvent::BacktestLists {
            strategies: vec![meta("momentum")],
            files: vec![data_file("spy_20200101_20211231.csv")],
        });

        assert_eq!(app.bt_form.strategy.as_deref(), Some("momentum"));
        assert_eq!(app.bt_form.data_file.as_deref(), Some("spy_20200101_20211231.csv"));
        assert_eq!(app.bt_form.start_date.as_deref(), Some("2020-01-01"));
        assert_eq!(app.bt_form.end_date.as_deref(), Some("2021-12-31"));
    }

    #[test]
    fn cycling_file_picker_reinfers_dates() {
        let (mut app, _cmd_rx) = test_app();
        app.apply_event(AppEvent::BacktestLists {
            strategies: vec![meta("momentum")],
            files: vec![data_file("plain.csv"), data_file("d_20210315.csv")],
        });
        app.active_tab = Tab::Backtest;
        app.focus_area = FocusArea::MainView;
        app.bt_field = 1;

        app.handle_key_event(KeyCode::Char('l'));
        assert_eq!(app.bt_form.data_file.as_deref(), Some("d_20210315.csv"));
        assert_eq!(app.bt_form.start_date.as_deref(), Some("2020-03-15"));
        assert_eq!(app.bt_form.end_date.as_deref(), Some("2021-03-15"));
    }

    #[test]
    fn batch_param_command_updates_combination_count() {
        let (mut app, _cmd_rx) = test_app();
        app.execute_command_line("batch param window 5,10,20");
        app.execute_command_line("batch param threshold 0.1,0.2");
        assert_eq!(app.batch_form.combination_count(), 6);

        app.execute_command_line("batch clear threshold");
        assert_eq!(app.batch_form.combination_count(), 3);
    }

    #[test]
    fn toggle_flips_only_known_sources() {
        let (mut app, _cmd_rx) = test_app();
        let mut config = std::collections::HashMap::new();
        config.insert(
            "tushare".to_string(),
            crate::session::dto::DataSourceConfig {
                enabled: false,
                extra: serde_json::Map::new(),
            },
        );
        app.apply_event(AppEvent::DataPanel(DataPanelData {
            files: Vec::new(),
            sources: Vec::new(),
            config,
        }));

        app.execute_command_line("toggle tushare");
        assert!(app.data.config["tushare"].enabled);

        app.execute_command_line("toggle nonexistent");
        assert!(app
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Error && n.text.contains("nonexistent")));
    }

    #[test]
    fn month_shift_parses_and_clamps() {
        assert_eq!(shift_month("2021-03-31", -1), Some("2021-02-28".to_string()));
        assert_eq!(shift_month("2021-01-15", 12), Some("2022-01-15".to_string()));
        assert_eq!(shift_month("not-a-date", 1), None);
    }

    #[test]
    fn command_input_is_utf8_safe() {
        let (mut app, _cmd_rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        for c in "delete strategy 双均线".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Backspace);
        assert!(app.command_input.ends_with("双均"));
    }
}
