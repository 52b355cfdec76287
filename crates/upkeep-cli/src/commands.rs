use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use upkeep_upgrade::{
    FileRelease, ProjectInstallInfo, RegistrationProgress, UpgradeConfig, UpgradeReport,
    UpgradeService,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = UpgradeConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(registry) = cli.registry {
        config.registry_path = registry;
    }
    let registry_path = config.registry_path.clone();
    let svc = UpgradeService::open(config)
        .with_context(|| format!("failed to open registry {}", registry_path.display()))?;
    let format = cli.format;

    match cli.command {
        Command::RegisterProject(args) => cmd_register_project(&svc, args, format),
        Command::RegisterBundle(args) => cmd_register_bundle(&svc, args, format),
        Command::Identify(args) => cmd_identify(&svc, args, format),
        Command::Analyze(args) => cmd_analyze(&svc, args, format),
        Command::Upgrade(args) => cmd_upgrade(&svc, args, format),
        Command::Lookup(args) => cmd_lookup(&svc, args, format),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn progress_printer(format: OutputFormat) -> impl FnMut(RegistrationProgress) {
    move |p| {
        if format == OutputFormat::Text {
            match p.percent() {
                Some(percent) => println!(
                    "  {} {} files ({percent}%)",
                    "committed".dimmed(),
                    p.committed
                ),
                None => println!("  {} {} files", "committed".dimmed(), p.committed),
            }
        }
    }
}

fn cmd_register_project(
    svc: &UpgradeService,
    args: RegisterProjectArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let out = svc
        .register_project(
            &args.tree,
            &args.name,
            args.release,
            args.backup.as_deref(),
            progress_printer(format),
        )
        .with_context(|| format!("failed to register project from {}", args.tree.display()))?;
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Text => {
            println!(
                "{} Registered {} {} ({} files, id {})",
                "✓".green().bold(),
                out.project.name.bold(),
                out.project.version.to_string().yellow(),
                out.files,
                out.id
            );
            Ok(())
        }
    }
}

fn cmd_register_bundle(
    svc: &UpgradeService,
    args: RegisterBundleArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let out = svc
        .register_bundle(&args.dir, args.release, progress_printer(format))
        .with_context(|| format!("failed to register bundle from {}", args.dir.display()))?;
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Text => {
            println!(
                "{} Registered bundle {} {} from {} ({} files, id {})",
                "✓".green().bold(),
                out.bundle.name.bold(),
                out.bundle.version.to_string().yellow(),
                out.bundle.file_name,
                out.files,
                out.id
            );
            Ok(())
        }
    }
}

fn cmd_identify(
    svc: &UpgradeService,
    args: IdentifyArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let info = svc
        .identify(&args.tree)
        .with_context(|| format!("failed to identify {}", args.tree.display()))?;
    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Text => {
            print_install_info(&info);
            Ok(())
        }
    }
}

fn print_install_info(info: &ProjectInstallInfo) {
    println!(
        "Project: {} {}",
        info.project.name.bold(),
        info.project.version.to_string().yellow()
    );
    if info.bundles_applied.is_empty() {
        println!("No bundles applied.");
    } else {
        println!("Bundles applied:");
        for b in &info.bundles_applied {
            println!("  {} {} {}", "✓".green(), b.name, b.version.to_string().dimmed());
        }
    }
    if !info.possible_bundles_applied.is_empty() {
        println!("{}", "Possibly applied (files not found):".yellow());
        for b in &info.possible_bundles_applied {
            println!("  {} {} {}", "?".yellow(), b.name, b.version.to_string().dimmed());
        }
    }
}

fn cmd_analyze(
    svc: &UpgradeService,
    args: AnalyzeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let report = svc
        .analyze(&args.source, &args.base)
        .with_context(|| format!("failed to analyze {}", args.source.display()))?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_report(&report);
            Ok(())
        }
    }
}

fn cmd_upgrade(
    svc: &UpgradeService,
    args: UpgradeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let report = svc
        .upgrade(&args.source, &args.base, &args.target)
        .with_context(|| format!("failed to upgrade into {}", args.target.display()))?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_report(&report);
            println!(
                "\n{} Copied {} and merged {} file(s) into {}",
                "✓".green().bold(),
                report.added.len(),
                report.auto_mergeable.len(),
                args.target.display().to_string().bold()
            );
            Ok(())
        }
    }
}

fn print_report(report: &UpgradeReport) {
    if report.is_clean() {
        println!("No customizations found.");
    }
    let sections = [
        ("Added", &report.added, "+"),
        ("Auto-merge", &report.auto_mergeable, "~"),
        ("Manual merge", &report.manual_merge, "!"),
    ];
    for (title, paths, mark) in sections {
        if paths.is_empty() {
            continue;
        }
        println!("{} ({}):", title.bold(), paths.len());
        for path in paths {
            let mark = match mark {
                "+" => mark.green(),
                "~" => mark.cyan(),
                _ => mark.red(),
            };
            println!("  {mark} {path}");
        }
    }
    if report.has_warnings() {
        println!("{}", "Warnings:".yellow().bold());
        for w in &report.warnings {
            println!("  {} {}", w.path.yellow(), w.message);
        }
    }
}

fn cmd_lookup(svc: &UpgradeService, args: LookupArgs, format: OutputFormat) -> anyhow::Result<()> {
    let rows = svc.lookup(&args.key, args.by_filename)?;
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No registered releases of {}.", args.key.bold());
            }
            for row in &rows {
                println!("{}", describe(row));
            }
            Ok(())
        }
    }
}

fn describe(row: &FileRelease) -> String {
    let owner = match (&row.project, &row.bundle) {
        (Some(p), _) => format!("project {} {}", p.name, p.version),
        (None, Some(b)) => format!("bundle {} {}", b.name, b.version),
        (None, None) => "unattached".to_string(),
    };
    format!(
        "{}  {}  {}  {}",
        row.fingerprint.short_hex().dimmed(),
        row.version.to_string().yellow(),
        row.path,
        owner
    )
}
