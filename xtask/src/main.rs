//! xtask for dotx - build automation and tooling
//!
//! Generates man pages and shell completions from the CLI definitions.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for dotx")]
enum Task {
    /// Generate man pages from clap definitions
    GenerateManPages {
        /// Output directory for man pages (default: ./man)
        #[arg(short, long, default_value = "man")]
        output: PathBuf,
    },

    /// Generate completion scripts for every supported shell
    GenerateCompletions {
        /// Output directory for completion scripts (default: ./completions)
        #[arg(short, long, default_value = "completions")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    match Task::parse() {
        Task::GenerateManPages { output } => generate_man_pages(&output),
        Task::GenerateCompletions { output } => generate_completions(&output),
    }
}

fn create_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))
}

fn render_man_page(cmd: clap::Command, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create man page: {}", path.display()))?;
    clap_mangen::Man::new(cmd).render(&mut BufWriter::new(file))?;
    println!("✓ Generated: {}", path.display());
    Ok(())
}

fn generate_man_pages(output_dir: &Path) -> Result<()> {
    println!("Generating man pages...");
    create_output_dir(output_dir)?;

    let cmd = dotx::cli::Cli::command();
    render_man_page(cmd.clone(), &output_dir.join("dotx.1"))?;

    // One page per subcommand, named the way man(1) looks up `dotx-install`
    for subcmd in cmd.get_subcommands() {
        let name = format!("dotx-{}", subcmd.get_name());
        let page = subcmd.clone().name(name.clone());
        render_man_page(page, &output_dir.join(format!("{name}.1")))?;
    }

    println!(
        "\nMan pages successfully generated in: {}",
        output_dir.display()
    );
    println!("\nTo view the man pages:");
    println!("  man {}/dotx.1", output_dir.display());
    Ok(())
}

fn generate_completions(output_dir: &Path) -> Result<()> {
    println!("Generating shell completions...");
    create_output_dir(output_dir)?;

    let mut cmd = dotx::cli::Cli::command();
    for shell in Shell::value_variants() {
        let path = clap_complete::generate_to(*shell, &mut cmd, "dotx", output_dir)
            .with_context(|| format!("Failed to generate {shell} completions"))?;
        println!("✓ Generated: {}", path.display());
    }
    Ok(())
}
