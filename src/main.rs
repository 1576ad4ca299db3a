use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use dotx::cli::{Cli, Commands};
use dotx::commands::sync::SyncOptions;
use dotx::output::{self, Verbosity};
use dotx::{DotxContext, commands};
use std::fs::File;
use std::io;
use std::process;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e:#}", "Error:".red().bold());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;
    output::set_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose));

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let ctx = build_context(&cli)?;

    match cli.command {
        Commands::Install { packages } => commands::install::execute(&ctx, &packages)?,
        Commands::Uninstall { packages } => commands::uninstall::execute(&ctx, &packages)?,
        Commands::List { as_commands } => commands::list::execute(&ctx, as_commands)?,
        Commands::Verify { package } => commands::verify::execute(&ctx, package.as_deref())?,
        Commands::Show { package } => commands::show::execute(&ctx, &package)?,
        Commands::Sync {
            max_depth,
            scan_paths,
            simple,
            package_roots,
            clean,
        } => {
            let options = SyncOptions {
                max_depth,
                scan_paths,
                simple,
                package_roots,
                clean,
            };
            commands::sync::execute(&ctx, &options)?;
        }
        Commands::Path { name, package_root } => {
            commands::path::execute(&ctx, &name, package_root.as_deref())?;
        }
        Commands::Which { file } => commands::path::which(&ctx, &file)?,
        Commands::Completion { .. } => {}
    }

    Ok(())
}

fn build_context(cli: &Cli) -> Result<DotxContext> {
    let mut ctx = DotxContext::new()?;
    if let Some(target) = &cli.target {
        ctx.set_target(target)?;
    }
    ctx.extra_ignores.clone_from(&cli.ignore);
    ctx.dry_run = cli.dry_run;
    ctx.verbose = cli.verbose;
    ctx.non_interactive = cli.yes;
    Ok(ctx)
}

/// Logs go to stderr (or `--log FILE`) at `warn`, raised by `--verbose` and
/// `--debug`. `RUST_LOG` overrides both.
fn init_logging(cli: &Cli) -> Result<()> {
    let default_directive = if cli.debug {
        "warn,dotx=debug"
    } else if cli.verbose {
        "warn,dotx=info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false);

    if let Some(path) = &cli.log {
        let file = File::create(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
