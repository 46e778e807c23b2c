use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use deplink_package::PackageType;
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod progress;

/// Deplink dependency manager for C and C++ projects.
///
/// Resolves the dependencies declared in deplink.json against local and
/// remote repositories and installs them into the deplinks/ directory.
///
/// EXAMPLES:
///     deplink init                     Create deplink.json in an empty directory
///     deplink install                  Install dependencies from deplink.json
///     deplink install basic/zlib@^1.2  Add a dependency and install it
///     deplink list                     Show resolved dependencies
///     deplink order                    Print the build order of installed packages
///
/// ENVIRONMENT VARIABLES:
///     DEPLINK_HOME                   Configuration directory (default: ~/.deplink)
///     DEPLINK_CACHE_DIR              Archive cache directory
///     DEPLINK_NO_DEFAULT_REPOSITORY  Set to '1' to skip the public repository
///     DEPLINK_NO_PROGRESS            Set to '1' to hide download progress
///     NO_COLOR                       Set to disable colored output
///     RUST_LOG                       Log filter (e.g. 'deplink_package=debug')
#[derive(Parser)]
#[command(name = "deplink")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a basic deplink.json file
    ///
    /// The package name defaults to the names of the parent and the
    /// working directory. The directory must be empty.
    ///
    /// EXAMPLES:
    ///     deplink init                    Name taken from the directory
    ///     deplink init acme/app           Explicit name
    ///     deplink init acme/lib --type library
    Init {
        /// Package name (org/package)
        name: Option<String>,
        /// Package type
        #[arg(long = "type", value_enum, default_value_t = TypeArg::Project)]
        package_type: TypeArg,
        /// Use the given directory as working directory
        #[arg(long = "working-dir", short = 'd', default_value = ".")]
        working_dir: PathBuf,
    },

    /// Install project dependencies
    ///
    /// Resolves the dependencies tree, then removes, updates and installs
    /// packages under deplinks/. Given packages are added to deplink.json
    /// first; the file is restored if installation fails.
    ///
    /// EXAMPLES:
    ///     deplink install                        Install everything
    ///     deplink install basic/zlib             Add the newest basic/zlib
    ///     deplink install basic/zlib@^1.2:static Add with range and linking
    ///     deplink install basic/check --dev      Add as dev-dependency
    ///     deplink install --no-dev               Skip dev-dependencies
    #[command(visible_alias = "i")]
    Install {
        /// Packages to add, as org/package[@range[:static|dynamic]]
        packages: Vec<String>,
        /// Add the given packages as dev-dependencies
        #[arg(long)]
        dev: bool,
        /// Skip dev-dependencies
        #[arg(long)]
        no_dev: bool,
        /// Hide download progress bars
        #[arg(long)]
        no_progress: bool,
        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Use the given directory as working directory
        #[arg(long = "working-dir", short = 'd', default_value = ".")]
        working_dir: PathBuf,
    },

    /// List resolved dependencies and their installation status
    ///
    /// EXAMPLES:
    ///     deplink list             All dependencies
    ///     deplink list --no-dev    Without dev-dependencies
    #[command(visible_alias = "ls")]
    List {
        /// Skip dev-dependencies
        #[arg(long)]
        no_dev: bool,
        /// Use the given directory as working directory
        #[arg(long = "working-dir", short = 'd', default_value = ".")]
        working_dir: PathBuf,
    },

    /// Print installed packages in build order
    ///
    /// Dependencies are printed before the packages using them.
    ///
    /// EXAMPLES:
    ///     deplink order            One package per line
    ///     deplink order --groups   Packages buildable in parallel per line
    Order {
        /// Group packages that can be built in parallel
        #[arg(long)]
        groups: bool,
        /// Use the given directory as working directory
        #[arg(long = "working-dir", short = 'd', default_value = ".")]
        working_dir: PathBuf,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     deplink completions bash > ~/.local/share/bash-completion/completions/deplink
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TypeArg {
    Project,
    Library,
}

impl From<TypeArg> for PackageType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Project => PackageType::Project,
            TypeArg::Library => PackageType::Library,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if cli_config.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Init {
            name,
            package_type,
            working_dir,
        } => {
            let args = commands::init::InitArgs {
                name,
                package_type: package_type.into(),
                path: working_dir,
            };
            commands::init::run(args)?;
        }
        Commands::Install {
            packages,
            dev,
            no_dev,
            no_progress,
            dry_run,
            working_dir,
        } => {
            let show_progress = !no_progress
                && !cli_config.no_progress
                && commands::load_config()?.show_progress();
            let args = commands::install::InstallArgs {
                packages,
                dev,
                no_dev,
                show_progress,
                project_dir: working_dir,
                dry_run,
            };
            commands::install::run(args)?;
        }
        Commands::List {
            no_dev,
            working_dir,
        } => {
            let args = commands::list::ListArgs {
                project_dir: working_dir,
                no_dev,
            };
            commands::list::run(args)?;
        }
        Commands::Order {
            groups,
            working_dir,
        } => {
            let args = commands::order::OrderArgs {
                project_dir: working_dir,
                groups,
            };
            commands::order::run(args)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
