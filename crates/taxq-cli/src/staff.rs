//! Staff identity recorded as `last_updated_by` on edited work items.
//!
//! The resolution chain: `--user` flag > `TAXQ_USER` env > `staff` in the
//! user config > `USER` env (TTY only). An unresolved identity is allowed;
//! the audit field is then left empty.

use std::env;

trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_staff_with(
    cli_flag: Option<&str>,
    config_staff: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(user) = cli_flag.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    if let Some(val) = env.get("TAXQ_USER") {
        return Some(val.trim().to_string());
    }

    if let Some(user) = config_staff.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    // Scripts run under service accounts; only trust USER interactively.
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve the acting staff member, if any.
pub fn resolve_staff(cli_flag: Option<&str>, config_staff: Option<&str>) -> Option<String> {
    resolve_staff_with(cli_flag, config_staff, &RealEnv)
}
