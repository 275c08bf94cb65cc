// ==========================================
// 合作社收款台账 - 命令行入口
// ==========================================
// Usage:
//   iamc-collect import-report <file> [--append]
//   iamc-collect import-json <file>
//   iamc-collect collect <society> <agent> <pin> <accountNo> <amount> [remarks] [--lot <lotKey>]
//   iamc-collect export <society> <agent> <pin> [xlsx|txt] [--clear]
//   iamc-collect lots <society> <agent>
//   iamc-collect files [<society> <agent>]
//
// DB 路径: IAMC_DB_PATH 环境变量,否则用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use iamc_collect::api::AgentSession;
use iamc_collect::app::{get_default_db_path, AppState};
use iamc_collect::domain::money::format_paise;
use iamc_collect::domain::types::ExportFormat;
use std::path::Path;

const USAGE: &str = "\
usage:
  iamc-collect import-report <file> [--append]
  iamc-collect import-json <file>
  iamc-collect collect <society> <agent> <pin> <accountNo> <amount> [remarks] [--lot <lotKey>]
  iamc-collect export <society> <agent> <pin> [xlsx|txt] [--clear]
  iamc-collect lots <society> <agent>
  iamc-collect files [<society> <agent>]";

/// 拆分位置参数与开关（--flag / --key value）
struct Args {
    positional: Vec<String>,
    flags: Vec<String>,
    lot: Option<String>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Self {
        let mut positional = Vec::new();
        let mut flags = Vec::new();
        let mut lot = None;
        let mut raw = raw.peekable();
        while let Some(arg) = raw.next() {
            if arg == "--lot" {
                lot = raw.next();
            } else if let Some(flag) = arg.strip_prefix("--") {
                flags.push(flag.to_string());
            } else {
                positional.push(arg);
            }
        }
        Self {
            positional,
            flags,
            lot,
        }
    }

    fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    fn required(&self, index: usize, name: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{}>\n{}", name, USAGE))
    }
}

/// 不校验 PIN,直接按代码定位代理人（只读命令）
fn lookup_session(state: &AppState, society_code: &str, agent_code: &str) -> Result<AgentSession> {
    let society = state
        .society_repo
        .find_by_code(society_code)?
        .ok_or_else(|| anyhow!("society {} not found", society_code))?;
    let agent = state
        .agent_repo
        .find_by_code(&society.id, agent_code)?
        .ok_or_else(|| anyhow!("agent {} not found in {}", agent_code, society.code))?;
    Ok(AgentSession::new(society, agent, Utc::now()))
}

#[tokio::main]
async fn main() -> Result<()> {
    iamc_collect::logging::init();

    let mut raw = std::env::args().skip(1);
    let command = match raw.next() {
        Some(command) => command,
        None => {
            println!("{}", USAGE);
            return Ok(());
        }
    };
    let args = Args::parse(raw);

    let db_path = get_default_db_path();
    tracing::info!(version = iamc_collect::VERSION, db_path = %db_path, "{}", iamc_collect::APP_NAME);
    let state = AppState::new(db_path).await.map_err(anyhow::Error::msg)?;

    match command.as_str() {
        "import-report" => {
            let file = args.required(0, "file")?;
            let replace = if args.has_flag("append") {
                Some(false)
            } else {
                None
            };
            let summary = state
                .import_api
                .import_report_file(Path::new(file), replace)
                .await
                .with_context(|| format!("import {}", file))?;
            println!(
                "society={} ({}) agent={} ({}) accounts={} created={} lots_replaced={}",
                summary.society_code,
                summary.society_name,
                summary.agent_code,
                summary.agent_name,
                summary.accounts_upserted,
                summary.accounts_created,
                summary.lots_replaced.join(",")
            );
        }

        "import-json" => {
            let file = args.required(0, "file")?;
            let summary = state
                .import_api
                .import_master_json_file(Path::new(file))
                .await
                .with_context(|| format!("import {}", file))?;
            println!(
                "society={} agents={} accounts={} skipped={}",
                summary.society_code,
                summary.agents_upserted,
                summary.accounts_upserted,
                summary.accounts_skipped
            );
        }

        "collect" => {
            let society = args.required(0, "society")?;
            let agent = args.required(1, "agent")?;
            let pin = args.required(2, "pin")?;
            let account_no = args.required(3, "accountNo")?;
            let amount: f64 = args
                .required(4, "amount")?
                .trim()
                .parse()
                .with_context(|| "amount must be a number")?;
            let remarks = args.positional.get(5).map(String::as_str);

            let session = state
                .session_api
                .login(Some(society), agent, pin)
                .await?;
            let account = state.collection_api.find_account_by_no(
                &session,
                account_no,
                args.lot.as_deref(),
            )?;
            let entry = state
                .collection_api
                .collect(&session, &account.id, amount, remarks)?;
            let totals = state.collection_api.today_summary(&session)?;
            println!(
                "collected {} on {} for {} ({}); today: {} entries, {}",
                format_paise(entry.collected_paise),
                entry.collection_date,
                account.account_no,
                account.lot_label(),
                totals.count,
                format_paise(totals.total_paise)
            );
        }

        "export" => {
            let society = args.required(0, "society")?;
            let agent = args.required(1, "agent")?;
            let pin = args.required(2, "pin")?;
            let format = args.positional.get(3).map(|f| ExportFormat::from_str(f));
            let clear = if args.has_flag("clear") {
                Some(true)
            } else {
                None
            };

            let session = state
                .session_api
                .login(Some(society), agent, pin)
                .await?;
            match state
                .export_api
                .export_pending(&session, format, clear)
                .await?
            {
                None => println!("nothing to export"),
                Some(summary) => {
                    for file in &summary.outcome.files {
                        println!(
                            "{}\t{} collections\t{}\t{}",
                            file.file_name,
                            file.collections_count,
                            format_paise(file.total_paise),
                            file.file_uri
                        );
                    }
                    if let Some(cleared) = summary.cleared {
                        println!(
                            "cleared {} accounts, {} collections",
                            cleared.accounts_deleted, cleared.collections_deleted
                        );
                    }
                }
            }
        }

        "lots" => {
            let session = lookup_session(
                &state,
                args.required(0, "society")?,
                args.required(1, "agent")?,
            )?;
            for lot in state.collection_api.list_lots(&session)? {
                println!("{}\t{}\t{}", lot.lot_key, lot.account_count, lot.label);
            }
        }

        "files" => {
            let session = match (args.positional.first(), args.positional.get(1)) {
                (Some(society), Some(agent)) => Some(lookup_session(&state, society, agent)?),
                _ => None,
            };
            for file in state.export_api.list_export_files(session.as_ref()).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    file.exported_at().to_rfc3339(),
                    file.agent_code,
                    file.lot_code,
                    file.file_name
                );
            }
        }

        other => bail!("unknown command: {}\n{}", other, USAGE),
    }

    Ok(())
}
