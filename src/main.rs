mod app_service;
mod app_state;
mod backtest;
mod charts;
mod commands;
mod editor;
mod panels;
mod session;
mod ui;

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_state::{App, AppEvent};
use crate::backtest::BacktestService;
use crate::commands::AppCommand;
use crate::session::{urls, ApiSession};
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 核心：重定向输出到文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("rustbtd", log::LevelFilter::Info)
        .init();

    // 加载环境变量
    let mut session_info = Vec::new();

    // 获取当前工作目录
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    session_info.push(format!("当前工作目录: {}", current_dir.display()));

    // 检查 .env 文件是否存在
    let env_path = current_dir.join(".env");
    let env_exists = env_path.exists();
    if env_exists {
        session_info.push(format!("✓ 找到 .env 文件: {}", env_path.display()));
    } else {
        session_info.push(format!("⚠ 未找到 .env 文件: {}", env_path.display()));
    }

    // 尝试加载 .env 文件（直接手动解析，避免递归栈问题）
    let env_loaded = if env_exists {
        if let Ok(content) = std::fs::read_to_string(&env_path) {
            let mut loaded = false;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(equal_pos) = line.find('=') {
                    let key = line[..equal_pos].trim();
                    let value = line[equal_pos + 1..].trim();
                    let value = value.trim_matches(|c| c == '"' || c == '\'');
                    std::env::set_var(key, value);
                    loaded = true;
                }
            }
            loaded
        } else {
            session_info.push("⚠ 无法读取 .env 文件".to_string());
            false
        }
    } else {
        false
    };

    if !env_loaded {
        session_info.push("⚠ 使用系统环境变量与默认配置".to_string());
    }

    // 后端地址与下载目录
    let base_url =
        std::env::var("BTD_API_URL").unwrap_or_else(|_| urls::DEFAULT_API_URL.to_string());
    session_info.push(format!("✓ 后端 API 地址: {}", base_url));

    let download_dir =
        PathBuf::from(std::env::var("BTD_DOWNLOAD_DIR").unwrap_or_else(|_| "downloads".to_string()));
    session_info.push(format!("✓ 下载目录: {}", download_dir.display()));

    let api_session = Arc::new(ApiSession::new(base_url));

    // 创建核心 Channel (使用 AppCommand)
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 启动单后台任务模型 (Actor)
    let session_bg = Arc::clone(&api_session);
    let evt_tx_bg = evt_tx.clone();

    tokio::spawn(async move {
        // 回测提交与轮询由 service 统一管理，actor 独占可变状态
        let mut backtest_service = BacktestService::new(session_bg.clone(), evt_tx_bg.clone());

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                // 面板加载与文件操作都派生独立任务，避免慢请求堵住后续命令
                AppCommand::Load(tab) => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        app_service::handle_load(tab, &sess, &tx).await;
                    });
                }
                AppCommand::StrategyLoad { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::strategies::load_detail(&sess, &tx, &name).await;
                    });
                }
                AppCommand::StrategySave {
                    name,
                    description,
                    code,
                } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::strategies::save(&sess, &tx, &name, &description, &code).await;
                    });
                }
                AppCommand::StrategyDelete { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::strategies::delete(&sess, &tx, &name).await;
                    });
                }
                AppCommand::FilePreview { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::data::preview(&sess, &tx, &name).await;
                    });
                }
                AppCommand::FileInfo { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::data::info(&sess, &tx, &name).await;
                    });
                }
                AppCommand::FileDelete { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::data::delete(&sess, &tx, &name).await;
                    });
                }
                AppCommand::FileDownload { name } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    let dir = download_dir.clone();
                    tokio::spawn(async move {
                        panels::data::download(&sess, &tx, &name, &dir).await;
                    });
                }
                AppCommand::Upload { path } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::data::upload(&sess, &tx, &path).await;
                    });
                }
                AppCommand::ConfigPush { config } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::data::push_config(&sess, &tx, &config).await;
                    });
                }
                // 提交在 actor 内完成：start_polling 要改 service 自身状态
                AppCommand::RunBacktest(form) => {
                    backtest_service.submit_backtest(&form).await;
                }
                AppCommand::RunBatch(form) => {
                    backtest_service.submit_batch(&form).await;
                }
                AppCommand::JobStop => {
                    backtest_service.stop();
                }
                AppCommand::ReportPreview { strategy, file } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::results::report_preview(&sess, &tx, &strategy, &file).await;
                    });
                }
                AppCommand::ReportDownload { strategy, file } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    let dir = download_dir.clone();
                    tokio::spawn(async move {
                        panels::results::report_download(&sess, &tx, &strategy, &file, &dir).await;
                    });
                }
                AppCommand::SessionChart { strategy, session } => {
                    let sess = session_bg.clone();
                    let tx = evt_tx_bg.clone();
                    tokio::spawn(async move {
                        panels::results::session_chart(&sess, &tx, &strategy, &session).await;
                    });
                }
                AppCommand::Help => {
                    let _ = evt_tx_bg.send(AppEvent::Message("可用命令: tab <面板> | reload | strategy new/load/save [名称] | name <文本> | desc <文本> | preview/info/download/upload <文件> | delete strategy/file <名称> | toggle <数据源> | config push | bt run/capital/start/end | batch run/param/clear | report preview/download <策略> <文件> | chart <策略> <会话> | job stop | quit".to_string()));
                }
                AppCommand::Quit => {
                    let _ = evt_tx_bg.send(AppEvent::Message("收到退出命令".to_string()));
                }
                // 解析器给出的消息已自带说明，原样上报
                AppCommand::Unknown(msg) => {
                    let _ = evt_tx_bg.send(AppEvent::Error(msg));
                }
            }
        }
    });

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 创建 App 状态
    let mut app = App::new(session_info, cmd_tx, evt_rx);

    // 进入时先加载概览
    app.switch_tab(app_state::Tab::Dashboard);

    // 主循环
    let rx = app.evt_rx.take().unwrap();
    let res = run_app_loop(&mut terminal, &mut app, rx).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        app.purge_notices();
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.handle_key_event(key.code) {
                        return Ok(());
                    }
                }
            }
        }
    }
}
