//! `gridaudit run` and `gridaudit check-config`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::debug;

use gridaudit_engine::{AuditConfig, DocumentKind};
use gridaudit_io::{run_audit, AuditReport, AuditRequest, BlocklistPolicy};

use crate::CliError;

/// Document family selection on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Agencies when the OpenDocument table namespace is declared, else orders
    #[default]
    Auto,
    Agencies,
    Orders,
}

impl KindArg {
    fn resolve(self) -> Option<DocumentKind> {
        match self {
            KindArg::Auto => None,
            KindArg::Agencies => Some(DocumentKind::Agencies),
            KindArg::Orders => Some(DocumentKind::Orders),
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source document: spreadsheet content.xml, .ods archive, or order XML
    pub source: PathBuf,

    /// Newline-delimited list of disposable email domains
    #[arg(long)]
    pub blocklist: Option<PathBuf>,

    /// Base name of the output files (<name>.xml, <name>_anomalies.xml)
    #[arg(long)]
    pub name: String,

    /// Directory the two reports are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Document family
    #[arg(long, value_enum, default_value_t = KindArg::Auto)]
    pub kind: KindArg,

    /// Audit config (TOML). Defaults to <config dir>/gridaudit/audit.toml when present
    #[arg(long, env = "GRIDAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fail instead of continuing when the blocklist cannot be read
    #[arg(long)]
    pub strict_blocklist: bool,

    /// Output the run report as JSON to stdout instead of a human summary
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    validate_name(&args.name)?;
    let config = load_config(args.config.as_deref())?;

    let request = AuditRequest {
        source: args.source,
        blocklist: args.blocklist,
        blocklist_policy: if args.strict_blocklist {
            BlocklistPolicy::Fail
        } else {
            BlocklistPolicy::Degrade
        },
        out_dir: args.out_dir,
        name: args.name,
        kind: args.kind.resolve(),
    };

    let report = run_audit(&request, &config).map_err(CliError::from)?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        eprint!("{}", render_summary(&report));
    }
    Ok(())
}

pub fn cmd_check_config(path: PathBuf, json: bool) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;
    if json {
        let out = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        eprintln!("config OK: {}", path.display());
        eprintln!(
            "  sheet:  table '{}', at least {} fields per row",
            config.sheet.table, config.sheet.min_fields
        );
        eprintln!(
            "  orders: <{}> records grouped by '{}', id '{}'",
            config.orders.record_tag, config.orders.group_field, config.orders.id_field
        );
        eprintln!(
            "  rules:  values over {} chars, digit runs of {}+",
            config.rules.max_value_len, config.rules.min_digit_run
        );
    }
    Ok(())
}

/// Output base names must not escape `--out-dir`.
fn validate_name(name: &str) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::usage("--name must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CliError::usage(format!("--name must be a plain file name, got '{name}'"))
            .with_hint("use --out-dir to choose the directory"));
    }
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gridaudit").join("audit.toml"))
}

/// Explicit path, then the per-user default, then built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<AuditConfig, CliError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.is_file() => p,
            _ => {
                debug!("no config file, using defaults");
                return Ok(AuditConfig::default());
            }
        },
    };
    debug!(path = %path.display(), "loading config");

    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::config(format!("cannot read {}: {e}", path.display())))?;
    AuditConfig::from_toml(&text).map_err(|e| {
        CliError::from(e).with_hint(format!("fix {} or run without --config", path.display()))
    })
}

/// Human-readable run summary.
pub fn render_summary(report: &AuditReport) -> String {
    let s = &report.summary;
    let mut lines = vec![format!(
        "audited {}: {} records, {} entities, {} findings",
        s.kind, s.records, s.entities, s.findings
    )];
    for (rule, count) in &s.rule_counts {
        lines.push(format!("  {rule:<24} {count}"));
    }

    if report.meta.blocklist_degraded {
        lines.push("blocklist: unavailable, disposable-domain checks skipped".to_string());
    } else {
        lines.push(format!("blocklist: {} domains", report.meta.blocklist_entries));
    }

    if !report.analysis.is_empty() {
        lines.push("consistency analysis:".to_string());
        let mut current: Option<&str> = None;
        for breakdown in &report.analysis {
            if current != Some(breakdown.entity.as_str()) {
                lines.push(format!("  {}", breakdown.entity));
                current = Some(breakdown.entity.as_str());
            }
            let counts: Vec<String> = breakdown
                .counts
                .iter()
                .map(|c| format!("{} x{}", c.value, c.count))
                .collect();
            lines.push(format!("    {}: {}", breakdown.field, counts.join(", ")));
        }
    }

    lines.push(format!("source: {} ({})", report.meta.source.display(), report.meta.source_sha256));
    lines.push(format!("wrote {}", report.outputs.normalized.display()));
    lines.push(format!("wrote {}", report.outputs.anomalies.display()));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_arg_resolution() {
        assert_eq!(KindArg::Auto.resolve(), None);
        assert_eq!(KindArg::Agencies.resolve(), Some(DocumentKind::Agencies));
        assert_eq!(KindArg::Orders.resolve(), Some(DocumentKind::Orders));
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("agencies").is_ok());
        assert!(validate_name("run-2024_10").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn explicit_config_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[rules]\nmin_digit_run = 4\n").unwrap();
        assert_eq!(load_config(Some(&good)).unwrap().rules.min_digit_run, 4);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[sheet]\nmin_fields = 3\n").unwrap();
        let err = load_config(Some(&bad)).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
        assert!(err.hint.is_some());

        let missing = dir.path().join("missing.toml");
        assert_eq!(load_config(Some(&missing)).unwrap_err().code, crate::exit_codes::EXIT_CONFIG);
    }
}
