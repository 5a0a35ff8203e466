use anyhow::{bail, Context, Result};

use crate::sync::MAX_DAYS;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub project: Option<String>,
    pub days: Option<u32>,
    pub help: bool,
}

/// Parse `inbox-sync` arguments (program name already stripped).
///
/// Supported forms:
///   inbox-sync
///   inbox-sync --project PVT_xxx
///   inbox-sync --days 7
///   inbox-sync -p PVT_xxx -d 7
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            flag @ ("-p" | "--project") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for {flag}");
                };
                parsed.project = Some(value.clone());
            }
            flag @ ("-d" | "--days") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for {flag}");
                };
                let days = value
                    .parse::<u32>()
                    .with_context(|| format!("Invalid value for {flag}: {value:?}"))?;
                if days > MAX_DAYS {
                    bail!("Invalid value for {flag}: {days} is more than {MAX_DAYS} days");
                }
                parsed.days = Some(days);
            }
            other => bail!("Unknown argument: {other}\n\nRun `inbox-sync --help` for usage."),
        }
        i += 1;
    }

    Ok(parsed)
}

pub fn print_help() {
    println!("inbox-sync — add recently active GitHub issues and PRs to a project's Inbox\n");
    println!("USAGE:");
    println!("  inbox-sync [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -p, --project <id>  Project (v2) node id to sync into");
    println!("  -d, --days <n>      Only consider items updated in the last n days (default 30)");
    println!("  -h, --help          Show this help");
    println!();
    println!("CONFIG:");
    println!("  ~/.inbox-sync/config.toml  [github] token, api_url; [sync] project_id, days,");
    println!("                             status_field, inbox_option");
    println!("  GITHUB_TOKEN               Used when no token is configured");
    println!("  RUST_LOG                   Log filter (default: info)");
}
