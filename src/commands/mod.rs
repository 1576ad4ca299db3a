pub mod install;
pub mod list;
pub mod path;
pub mod show;
pub mod sync;
pub mod uninstall;
pub mod verify;

use crate::DotxContext;
use crate::ledger::{InstallationDb, Ledger, NoOpLedger, PackageId};
use crate::output::{self, Progress};
use crate::plan::execute::{ExecuteOptions, ExecutionSummary, execute_plan};
use crate::plan::{Action, Plan, extract_plan};
use crate::planner::PlanRules;
use crate::utils::expand_tilde;
use anyhow::{Context, Result, bail};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

/// A package directory with the plan computed for it.
#[derive(Debug)]
pub struct PackagePlan {
    /// Resolved package directory.
    pub source: PathBuf,
    pub package: PackageId,
    pub plan: Plan,
}

impl PackagePlan {
    /// Nodes carrying one of `actions`.
    #[must_use]
    pub fn count(&self, actions: &[Action]) -> usize {
        extract_plan(&self.plan, actions).len()
    }
}

/// Resolves a package argument to its real directory.
///
/// # Errors
///
/// Returns an error if the path does not exist or is not a directory
pub fn resolve_package(path: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path)?;
    let resolved = std::fs::canonicalize(&expanded)
        .with_context(|| format!("Package not found: {}", path.display()))?;
    if !resolved.is_dir() {
        bail!("Package is not a directory: {}", path.display());
    }
    Ok(resolved)
}

/// Plans every package with `planner`, using each package's own rules.
///
/// # Errors
///
/// Returns an error if a package cannot be resolved or planned
pub fn plan_packages<F>(ctx: &DotxContext, packages: &[PathBuf], planner: F) -> Result<Vec<PackagePlan>>
where
    F: Fn(&Path, &Path, &PlanRules<'_>) -> crate::error::Result<Plan>,
{
    let mut plans = Vec::with_capacity(packages.len());
    for package in packages {
        let source = resolve_package(package)?;
        let ignore = ctx.ignore_rules(&source);
        let always_create = ctx.always_create_rules(&source);
        let rules = PlanRules::new(&ignore, &always_create).with_rename_prefix(ctx.rename_prefix());

        let plan = planner(&source, &ctx.target, &rules)
            .with_context(|| format!("Failed to plan {}", source.display()))?;
        plans.push(PackagePlan {
            package: PackageId::from_source(&source),
            source,
            plan,
        });
    }
    Ok(plans)
}

/// The ledger install and uninstall write to.
pub enum LedgerSession {
    Recording(InstallationDb),
    Disabled(NoOpLedger),
}

impl LedgerSession {
    /// Opens the ledger, or a no-op one for dry runs and when the ledger is
    /// switched off in the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be opened
    pub fn open(ctx: &DotxContext) -> Result<Self> {
        if ctx.dry_run || !ctx.config.ledger.enabled {
            return Ok(Self::Disabled(NoOpLedger));
        }
        Ok(Self::Recording(open_ledger(ctx)?))
    }

    pub fn as_ledger(&mut self) -> &mut dyn Ledger {
        match self {
            Self::Recording(db) => db,
            Self::Disabled(noop) => noop,
        }
    }

    /// Saves the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written
    pub fn commit(self) -> Result<()> {
        if let Self::Recording(db) = self {
            db.commit().context("Failed to save installation ledger")?;
        }
        Ok(())
    }
}

/// Opens the ledger for queries.
///
/// # Errors
///
/// Returns an error if the ledger cannot be locked or read
pub fn open_ledger(ctx: &DotxContext) -> Result<InstallationDb> {
    InstallationDb::open(&ctx.ledger_path).with_context(|| {
        format!(
            "Failed to open installation ledger: {}",
            ctx.ledger_path.display()
        )
    })
}

/// Executes the plans in order, with a progress bar or, in verbose mode, a
/// listing of the `actions` nodes per package. Dry runs print the shell
/// equivalent of each operation on stdout instead.
///
/// The ledger is saved even when a plan fails part way, so it matches what
/// was actually done.
///
/// # Errors
///
/// Returns the first execution error
pub fn execute_plans(
    ctx: &DotxContext,
    plans: &[PackagePlan],
    verb: &str,
    actions: &[Action],
) -> Result<ExecutionSummary> {
    let options = ExecuteOptions {
        dry_run: ctx.dry_run,
    };
    let mut ledger = LedgerSession::open(ctx)?;

    let total = plans.iter().map(|plan| plan.count(actions)).sum();
    let mut progress = if ctx.dry_run {
        Progress::hidden(verb, total)
    } else {
        output::start_progress(verb, total)
    };

    let mut summary = ExecutionSummary::default();
    let mut outcome = Ok(());
    for package_plan in plans {
        output::verbose(&format!("{verb} {}...", package_plan.package.package_name));
        for node in extract_plan(&package_plan.plan, actions) {
            output::verbose(&format!("  {}", node.relative_destination_path.display()));
        }

        match execute_plan(
            &package_plan.source,
            &ctx.target,
            &package_plan.plan,
            &package_plan.package,
            ledger.as_ledger(),
            &options,
        ) {
            Ok(done) => {
                summary.merge(done);
                progress.update(summary.operations.len());
            }
            Err(e) => {
                outcome = Err(anyhow::Error::new(e).context(format!(
                    "{verb} {} failed",
                    package_plan.package.package_name
                )));
                break;
            }
        }
    }

    ledger.commit()?;
    outcome?;
    progress.finish();

    if ctx.dry_run {
        for operation in &summary.operations {
            println!("{}", operation.to_shell());
        }
    }
    Ok(summary)
}

/// Asks a yes/no question on stderr. Non-interactive contexts answer yes.
///
/// # Errors
///
/// Returns an error if no terminal is attached to ask on
pub fn confirm(ctx: &DotxContext, message: &str) -> Result<bool> {
    if ctx.non_interactive {
        return Ok(true);
    }

    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!("Cannot prompt for confirmation in non-interactive mode. Use --yes to proceed.");
    }

    eprint!("{message} [y/N] ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Resolves the package named on the command line the way the ledger
/// records it: resolved parent directory plus directory name.
///
/// # Errors
///
/// Returns an error if the path cannot be made absolute
pub fn package_identity(path: &Path) -> Result<PackageId> {
    let expanded = expand_tilde(path)?;
    let resolved = match std::fs::canonicalize(&expanded) {
        Ok(resolved) => resolved,
        Err(_) => crate::utils::lenient_canonicalize(&crate::utils::make_absolute(&expanded)?),
    };
    Ok(PackageId::from_source(&resolved))
}
