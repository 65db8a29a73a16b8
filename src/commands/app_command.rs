use std::collections::HashMap;
use std::str::FromStr;

use crate::app_state::Tab;
use crate::backtest::{BacktestForm, BatchForm};
use crate::session::dto::DataSourceConfig;

#[derive(Debug, Clone)]
pub enum AppCommand {
    Load(Tab),
    StrategyLoad {
        name: String,
    },
    StrategySave {
        name: String,
        description: String,
        code: String,
    },
    StrategyDelete {
        name: String,
    },
    FilePreview {
        name: String,
    },
    FileInfo {
        name: String,
    },
    FileDelete {
        name: String,
    },
    FileDownload {
        name: String,
    },
    Upload {
        path: String,
    },
    ConfigPush {
        config: HashMap<String, DataSourceConfig>,
    },
    RunBacktest(BacktestForm),
    RunBatch(BatchForm),
    JobStop,
    ReportPreview {
        strategy: String,
        file: String,
    },
    ReportDownload {
        strategy: String,
        file: String,
    },
    SessionChart {
        strategy: String,
        session: String,
    },
    Help,
    Quit,
    Unknown(String),
}

const TAB_USAGE: &str = "用法: tab <overview|strategies|data|backtest|batch|results>";

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "tab" | "go" => match parts.get(1).and_then(|name| Tab::from_name(name)) {
                Some(tab) => Ok(AppCommand::Load(tab)),
                None => Ok(AppCommand::Unknown(TAB_USAGE.to_string())),
            },
            "strategy" => match parts.get(1) {
                Some(&"load") => {
                    if let Some(name) = parts.get(2) {
                        Ok(AppCommand::StrategyLoad {
                            name: name.to_string(),
                        })
                    } else {
                        Ok(AppCommand::Unknown("用法: strategy load <name>".to_string()))
                    }
                }
                _ => Ok(AppCommand::Unknown(
                    "用法: strategy load <name> | strategy new [name] | strategy save".to_string(),
                )),
            },
            "preview" => {
                if let Some(name) = parts.get(1) {
                    Ok(AppCommand::FilePreview {
                        name: name.to_string(),
                    })
                } else {
                    Ok(AppCommand::Unknown("用法: preview <file>".to_string()))
                }
            }
            "info" => {
                if let Some(name) = parts.get(1) {
                    Ok(AppCommand::FileInfo {
                        name: name.to_string(),
                    })
                } else {
                    Ok(AppCommand::Unknown("用法: info <file>".to_string()))
                }
            }
            "download" => {
                if let Some(name) = parts.get(1) {
                    Ok(AppCommand::FileDownload {
                        name: name.to_string(),
                    })
                } else {
                    Ok(AppCommand::Unknown("用法: download <file>".to_string()))
                }
            }
            "upload" => {
                let path = parts[1..].join(" ");
                if path.is_empty() {
                    Ok(AppCommand::Unknown("用法: upload <本地路径>".to_string()))
                } else {
                    Ok(AppCommand::Upload { path })
                }
            }
            "delete" => match (parts.get(1), parts.get(2)) {
                (Some(&"strategy"), Some(name)) => Ok(AppCommand::StrategyDelete {
                    name: name.to_string(),
                }),
                (Some(&"file"), Some(name)) => Ok(AppCommand::FileDelete {
                    name: name.to_string(),
                }),
                _ => Ok(AppCommand::Unknown(
                    "用法: delete strategy <name> | delete file <name>".to_string(),
                )),
            },
            "report" => match (parts.get(1), parts.get(2), parts.get(3)) {
                (Some(&"preview"), Some(strategy), Some(file)) => Ok(AppCommand::ReportPreview {
                    strategy: strategy.to_string(),
                    file: file.to_string(),
                }),
                (Some(&"download"), Some(strategy), Some(file)) => {
                    Ok(AppCommand::ReportDownload {
                        strategy: strategy.to_string(),
                        file: file.to_string(),
                    })
                }
                _ => Ok(AppCommand::Unknown(
                    "用法: report preview <strategy> <file> | report download <strategy> <file>"
                        .to_string(),
                )),
            },
            "chart" => match (parts.get(1), parts.get(2)) {
                (Some(strategy), Some(session)) => Ok(AppCommand::SessionChart {
                    strategy: strategy.to_string(),
                    session: session.to_string(),
                }),
                _ => Ok(AppCommand::Unknown(
                    "用法: chart <strategy> <session>".to_string(),
                )),
            },
            "job" => {
                if parts.get(1) == Some(&"stop") {
                    Ok(AppCommand::JobStop)
                } else {
                    Ok(AppCommand::Unknown("用法: job stop".to_string()))
                }
            }
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> AppCommand {
        s.parse().unwrap()
    }

    #[test]
    fn tab_names_map_to_closed_enum() {
        assert!(matches!(parse("tab overview"), AppCommand::Load(Tab::Dashboard)));
        assert!(matches!(parse("tab strategies"), AppCommand::Load(Tab::Strategies)));
        assert!(matches!(parse("go results"), AppCommand::Load(Tab::Results)));
    }

    #[test]
    fn unknown_tab_name_is_rejected_with_usage() {
        match parse("tab nowhere") {
            AppCommand::Unknown(msg) => assert!(msg.contains("用法")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn delete_requires_kind_and_name() {
        assert!(matches!(
            parse("delete strategy momentum"),
            AppCommand::StrategyDelete { .. }
        ));
        assert!(matches!(
            parse("delete file prices.csv"),
            AppCommand::FileDelete { .. }
        ));
        assert!(matches!(parse("delete momentum"), AppCommand::Unknown(_)));
    }

    #[test]
    fn upload_keeps_spaces_in_path() {
        match parse("upload /data/my prices.csv") {
            AppCommand::Upload { path } => assert_eq!(path, "/data/my prices.csv"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn report_commands_need_strategy_and_file() {
        assert!(matches!(
            parse("report preview momentum summary.html"),
            AppCommand::ReportPreview { .. }
        ));
        assert!(matches!(parse("report preview momentum"), AppCommand::Unknown(_)));
    }

    #[test]
    fn quit_aliases() {
        assert!(matches!(parse("quit"), AppCommand::Quit));
        assert!(matches!(parse("q"), AppCommand::Quit));
        assert!(matches!(parse("exit"), AppCommand::Quit));
    }

    #[test]
    fn unrecognized_command_reports_itself() {
        match parse("frobnicate") {
            AppCommand::Unknown(msg) => assert!(msg.contains("frobnicate")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
