use super::store_path;
use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use taxq_core::config::{PROJECT_DIR, load_project_config};
use taxq_core::db::migrations::current_schema_version;
use taxq_core::db::open_store;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the config template even if `.taxq/` already exists.
    /// The store itself is kept.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[account]\n\
    # default = \"acme\"\n\
    \n\
    [queue]\n\
    # default_return_year = 2024\n\
    \n\
    [identifier]\n\
    max_len = 4\n\
    \n\
    [store]\n\
    busy_timeout_ms = 5000\n\
    retry_attempts = 3\n\
    retry_backoff_ms = 50\n";

const GITIGNORE: &str = "taxq.db\ntaxq.db-wal\ntaxq.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    project_dir: String,
    store: String,
    schema_version: u32,
}

/// Execute `tq init`. Creates the project skeleton:
///
/// ```text
/// .taxq/
///   config.toml   (default project config template)
///   .gitignore    (the store and its WAL files)
///   taxq.db       (SQLite store with the seeded status catalog)
/// ```
///
/// # Errors
///
/// Returns an error if `.taxq/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let taxq_dir = project_root.join(PROJECT_DIR);

    if taxq_dir.exists() && !args.force {
        anyhow::bail!(".taxq/ already exists. Use `tq init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&taxq_dir)
        .with_context(|| format!("Failed to create {}", taxq_dir.display()))?;

    let config_path = taxq_dir.join("config.toml");
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = taxq_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let config = load_project_config(project_root)?;
    let path = store_path(project_root);
    let conn = open_store(&path, &config.store)?;
    let schema_version = current_schema_version(&conn)?;
    tracing::info!(store = %path.display(), schema_version, "initialized project");

    let report = InitReport {
        project_dir: taxq_dir.display().to_string(),
        store: path.display().to_string(),
        schema_version,
    };
    render(output, &report, |_, w| {
        writeln!(w, "✓ Initialized .taxq/ project structure.")?;
        writeln!(w)?;
        writeln!(w, "  Store:  .taxq/taxq.db")?;
        writeln!(w, "  Config: .taxq/config.toml")?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  Create your firm's account:")?;
        writeln!(w, "    tq account add acme --name \"Acme Tax\"")?;
        writeln!(w, "  Select it for later commands:")?;
        writeln!(w, "    export TAXQ_ACCOUNT=acme")?;
        writeln!(w, "  Add a return to the queue:")?;
        writeln!(w, "    tq add --identifier AB12 --year 2024")
    })
}
