// ==========================================
// 牲畜减员核算系统 - 命令行入口
// ==========================================
// 用法:
//   livestock-depletion methods
//   livestock-depletion types
//   livestock-depletion batches <livestock_id> [as_of]
//   livestock-depletion config <livestock_id>
//   livestock-depletion cost <livestock_id> <from> <to>
//
// 数据库路径: LIVESTOCK_DEPLETION_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use livestock_depletion::app::{get_default_db_path, AppState};
use livestock_depletion::db::DATE_FORMAT;
use livestock_depletion::logging;
use serde::Serialize;

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    let db_path = get_default_db_path();
    tracing::info!(version = livestock_depletion::VERSION, db_path = %db_path, "{}", livestock_depletion::APP_NAME);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command {
        "methods" => print_json(&state.depletion_api.get_supported_methods()),
        "types" => print_json(&state.depletion_api.get_supported_types()),
        "batches" => {
            let livestock_id = arg(&args, 1, "livestock_id")?;
            let as_of = args.get(2).map(|s| parse_date(s)).transpose()?;
            let batches = state
                .depletion_api
                .get_available_batches_for_manual_selection(livestock_id, as_of)?;
            print_json(&batches)
        }
        "config" => {
            let livestock_id = arg(&args, 1, "livestock_id")?;
            print_json(&state.depletion_api.resolve_method_config(livestock_id)?)
        }
        "cost" => {
            let livestock_id = arg(&args, 1, "livestock_id")?;
            let from = parse_date(arg(&args, 2, "from")?)?;
            let to = parse_date(arg(&args, 3, "to")?)?;
            let records = state.cost_api.calculate_range(livestock_id, from, to)?;
            print_json(&records)
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other)
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数 <{}>", name))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .with_context(|| format!("日期格式应为 YYYY-MM-DD: {}", value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    println!("{} v{}", livestock_depletion::APP_NAME, livestock_depletion::VERSION);
    println!();
    println!("用法:");
    println!("  livestock-depletion methods");
    println!("  livestock-depletion types");
    println!("  livestock-depletion batches <livestock_id> [as_of]");
    println!("  livestock-depletion config <livestock_id>");
    println!("  livestock-depletion cost <livestock_id> <from> <to>");
}
