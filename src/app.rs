//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers, validates the
//! root, and dispatches to run, summary, or undo.

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use archive_rename::cli::{Args, Command, RunArgs, SummaryArgs, UndoArgs};
use archive_rename::config::{
    Config, ConfigSource, create_template_config, load_config, resolve_config_path,
    validate_log_dir, validate_root,
};
use archive_rename::engine::{self, RunReport};
use archive_rename::fs_ops::{RealFs, SimulatedFs, io_error_with_help};
use archive_rename::journal::{
    LogSummary, TransactionLog, UndoOptions, UndoPlan, apply_undo, find_latest_log, undo_log_path,
};
use archive_rename::output as out;
use archive_rename::{RenamerError, shutdown};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Config-file commands run before logging init.
    match &args.command {
        Command::PrintConfig => return print_config(&args),
        Command::InitConfig => return init_config(&args),
        _ => {}
    }

    let source = resolve_config_path(args.config.as_deref())?;
    let mut cfg = load_config(&source)?;
    args.apply_overrides(&mut cfg);
    cfg.validate().context("invalid configuration")?;

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(cfg.log_level, cfg.trace_file.as_deref(), args.json_logs)
        .map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {e}"));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        let installed = ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping at the next safe point...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        });
        if let Err(e) = installed {
            warn!(error = %e, "could not install the interrupt handler; Ctrl-C will abort immediately");
        }
    }

    debug!(config = %source.path().display(), ?cfg, "starting archive_rename");

    let result = match &args.command {
        Command::Run(run_args) => run_command(&cfg, run_args),
        Command::Summary(s) => summary_command(&cfg, s),
        Command::Undo(u) => undo_command(u),
        Command::PrintConfig | Command::InitConfig => Ok(()),
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn describe_source(source: &ConfigSource) -> &'static str {
    match source {
        ConfigSource::Flag(_) => "--config (explicit)",
        ConfigSource::Env(_) => "ARCHIVE_RENAME_CONFIG (explicit)",
        ConfigSource::Default(_) => "default location",
    }
}

fn print_config(args: &Args) -> Result<()> {
    let source = resolve_config_path(args.config.as_deref())?;
    let path = source.path();
    out::print_info(&format!(
        "Config file ({}):\n  {}\n",
        describe_source(&source),
        path.display()
    ));
    if path.exists() {
        out::print_info("A config file exists at that location.");
    } else if source.is_explicit() {
        out::print_warn("No file exists there; runs will fail until it is created.");
    } else {
        out::print_info("No config file exists there yet; built-in defaults apply. Run `archive_rename init-config` to write a template.");
    }
    Ok(())
}

fn init_config(args: &Args) -> Result<()> {
    let source = resolve_config_path(args.config.as_deref())?;
    let path = source.path();
    if path.exists() {
        bail!("config file already exists: {}", path.display());
    }
    create_template_config(path)?;
    out::print_success(&format!(
        "A template archive_rename config was written to: {}",
        path.display()
    ));
    out::print_info("Edit the file to change `max_depth`, `allowed_extensions`, `log_dir` and the other settings.");
    Ok(())
}

fn print_run_report(report: &RunReport, log: &TransactionLog) {
    let prefix = if report.dry_run { "Dry-run: would rename" } else { "Renamed" };
    out::print_success(&format!(
        "{prefix} {} directories and {} files ({} already named, deepest file at depth {})",
        report.dirs_renamed, report.files_renamed, report.files_skipped, report.observed_depth
    ));
    for e in &report.errors {
        out::print_warn(e);
    }
    if log.write_failures() > 0 {
        out::print_warn(&format!(
            "{} log lines could not be written; the log is incomplete",
            log.write_failures()
        ));
    }
    if let Some(p) = log.path() {
        out::print_info(&format!("Transaction log: {}", p.display()));
    }
}

fn log_run_error(err: &RenamerError) {
    let code = err.code();
    let kind = err.kind();
    match err {
        RenamerError::InvalidRoot { path, reason } => {
            error!(code, kind, path = %path.display(), %reason, "Run refused")
        }
        RenamerError::DepthExceeded { observed, limit, deepest } => {
            error!(code, kind, observed = *observed, limit = *limit, deepest = %deepest.display(), "Run refused")
        }
        RenamerError::DirectoryRename { from, to, source } => {
            error!(code, kind, from = %from.display(), to = %to.display(), error = %source, "Directory phase failed")
        }
        RenamerError::CollisionExhausted { target, attempts } => {
            error!(code, kind, target = %target.display(), attempts = *attempts, "Directory phase failed")
        }
        RenamerError::PermissionDenied { path, context } => {
            error!(code, kind, path = %path.display(), %context, "Run failed")
        }
        RenamerError::Interrupted => error!(code, kind, "Run aborted by user"),
        _ => error!(code, kind, error = %err, "Run failed"),
    }
}

fn run_command(cfg: &Config, args: &RunArgs) -> Result<()> {
    let root = validate_root(&args.root, cfg.dry_run).inspect_err(log_run_error)?;
    let log_dir = match &cfg.log_dir {
        Some(dir) => validate_log_dir(dir, &root)?,
        None => root.clone(),
    };
    let mut log = TransactionLog::create_in(&log_dir, cfg.dry_run)
        .map_err(io_error_with_help("create transaction log in", &log_dir))?;
    if let Some(p) = log.path() {
        info!(log = %p.display(), "transaction log opened");
    }

    let opts = cfg.run_options(root);
    match engine::run(&opts, &mut log) {
        Ok(report) => {
            print_run_report(&report, &log);
            Ok(())
        }
        Err(e) => {
            log_run_error(&e);
            if let Some(p) = log.path() {
                out::print_info(&format!("Transaction log: {}", p.display()));
            }
            Err(e.into())
        }
    }
}

fn latest_log_dir(cfg: &Config, args: &SummaryArgs) -> Result<PathBuf> {
    if let Some(d) = args.dir.as_ref().or(cfg.log_dir.as_ref()) {
        return Ok(d.clone());
    }
    std::env::current_dir().context("current directory")
}

fn summary_command(cfg: &Config, args: &SummaryArgs) -> Result<()> {
    let path = match &args.log {
        Some(p) => p.clone(),
        None => {
            let dir = latest_log_dir(cfg, args)?;
            find_latest_log(&dir)?
                .ok_or_else(|| anyhow!("no archive_rename logs found in {}", dir.display()))?
        }
    };
    let summary = LogSummary::from_path(&path)?;
    if args.json {
        out::print_user(&summary.to_json()?);
    } else {
        out::print_user(&summary.render());
    }
    Ok(())
}

fn dry_run_snapshot(plan: &UndoPlan, log_path: &Path) -> Result<SimulatedFs> {
    let root = plan.root.as_deref().ok_or_else(|| {
        anyhow!(
            "{} has no START line naming the root; cannot simulate the undo",
            log_path.display()
        )
    })?;
    SimulatedFs::snapshot(root).map_err(io_error_with_help("snapshot", root))
}

fn undo_command(args: &UndoArgs) -> Result<()> {
    let plan = UndoPlan::from_path(&args.log)?;
    if plan.is_empty() {
        out::print_info("Nothing to undo: the log records no committed renames.");
        return Ok(());
    }
    let opts = UndoOptions {
        dry_run: args.dry_run,
        force: args.force,
        limit: args.limit,
    };
    let undo_path = undo_log_path(&args.log);
    let mut log = TransactionLog::open(&undo_path, args.dry_run)
        .map_err(io_error_with_help("create undo log", &undo_path))?;

    let report = if args.dry_run {
        let mut sim = dry_run_snapshot(&plan, &args.log)?;
        apply_undo(&mut sim, &plan, &opts, &mut log)
    } else {
        apply_undo(&mut RealFs, &plan, &opts, &mut log)
    };

    let prefix = if args.dry_run { "Dry-run: would restore" } else { "Restored" };
    out::print_success(&format!(
        "{prefix} {} of {} entries ({} failed, {} not attempted)",
        report.applied,
        plan.len(),
        report.failed,
        report.not_attempted
    ));
    for b in &report.backups {
        out::print_info(&format!("Moved occupying entry aside: {}", b.display()));
    }
    out::print_info(&format!("Undo log: {}", undo_path.display()));

    if report.interrupted {
        return Err(RenamerError::Interrupted.into());
    }
    if report.failed > 0 {
        bail!("{} undo steps failed; see {}", report.failed, undo_path.display());
    }
    Ok(())
}
