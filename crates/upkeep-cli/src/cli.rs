use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use upkeep_upgrade::ReleaseVersion;

#[derive(Parser)]
#[command(
    name = "upkeep",
    about = "Upkeep: carry project customizations across releases",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Release registry database (overrides the configuration file)
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record a stock project release
    RegisterProject(RegisterProjectArgs),
    /// Record an extracted bundle
    RegisterBundle(RegisterBundleArgs),
    /// Work out which release and bundles a tree was built from
    Identify(IdentifyArgs),
    /// Classify a tree's customizations against its base release
    Analyze(AnalyzeArgs),
    /// Carry a tree's customizations into a new release tree
    Upgrade(UpgradeArgs),
    /// Show registered releases of a file
    Lookup(LookupArgs),
}

#[derive(Args)]
pub struct RegisterProjectArgs {
    pub tree: PathBuf,
    #[arg(long = "version", value_name = "X.X.X.X")]
    pub release: ReleaseVersion,
    #[arg(long)]
    pub name: String,
    /// Backup package the tree was restored from
    #[arg(long)]
    pub backup: Option<String>,
}

#[derive(Args)]
pub struct RegisterBundleArgs {
    pub dir: PathBuf,
    #[arg(long = "version", value_name = "X.X.X.X")]
    pub release: ReleaseVersion,
}

#[derive(Args)]
pub struct IdentifyArgs {
    pub tree: PathBuf,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    pub source: PathBuf,
    #[arg(long)]
    pub base: PathBuf,
}

#[derive(Args)]
pub struct UpgradeArgs {
    pub source: PathBuf,
    #[arg(long)]
    pub base: PathBuf,
    #[arg(long)]
    pub target: PathBuf,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Tree-relative path, or a bare filename with --by-filename
    pub key: String,
    #[arg(long)]
    pub by_filename: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_register_project() {
        let cli = Cli::try_parse_from([
            "upkeep",
            "register-project",
            "/stock/7.5.2",
            "--version",
            "7.5.2.0",
            "--name",
            "Shop",
            "--backup",
            "shop.zip",
        ])
        .unwrap();
        if let Command::RegisterProject(args) = cli.command {
            assert_eq!(args.tree, PathBuf::from("/stock/7.5.2"));
            assert_eq!(args.release, ReleaseVersion::new(7, 5, 2, 0));
            assert_eq!(args.name, "Shop");
            assert_eq!(args.backup.as_deref(), Some("shop.zip"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn bad_version_is_rejected() {
        let args = ["upkeep", "register-bundle", "b", "--version", "seven"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn parse_register_bundle() {
        let cli = Cli::try_parse_from([
            "upkeep",
            "register-bundle",
            "bundles/sales",
            "--version",
            "7.5",
        ])
        .unwrap();
        if let Command::RegisterBundle(args) = cli.command {
            assert_eq!(args.release, ReleaseVersion::new(7, 5, 0, 0));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_upgrade_with_globals() {
        let cli = Cli::try_parse_from([
            "upkeep", "upgrade", "src", "--base", "old", "--target", "new",
            "--registry", "r.db", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.registry, Some(PathBuf::from("r.db")));
        if let Command::Upgrade(args) = cli.command {
            assert_eq!(args.target, PathBuf::from("new"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn analyze_requires_base() {
        assert!(Cli::try_parse_from(["upkeep", "analyze", "src"]).is_err());
    }

    #[test]
    fn parse_lookup_by_filename() {
        let cli = Cli::try_parse_from(["upkeep", "lookup", "Shop.dll", "--by-filename"]).unwrap();
        if let Command::Lookup(args) = cli.command {
            assert!(args.by_filename);
            assert_eq!(args.key, "Shop.dll");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_identify_with_config() {
        let cli =
            Cli::try_parse_from(["upkeep", "--config", "upkeep.toml", "identify", "."]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("upkeep.toml")));
        assert!(matches!(cli.command, Command::Identify(_)));
    }
}
