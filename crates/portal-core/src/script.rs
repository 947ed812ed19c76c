//! Batch script directive editing.
//!
//! Scripts are treated as `\n`-separated lines; a trailing newline is preserved. Directives are
//! inserted right after the first `#!` line, or at the top when there is no shebang.

use crate::PortalError;

const JOB_NAME_PREFIX: &str = "#SBATCH --job-name=";
const CHDIR_PREFIX: &str = "#SBATCH --chdir";

/// Convert DOS line endings (browsers submit textareas with `\r\n`).
pub fn normalize_line_endings(script: &str) -> String {
    script.replace("\r\n", "\n")
}

fn insert_after_shebang(lines: Vec<&str>, directive: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    let mut inserted = false;
    for line in lines {
        out.push(line);
        if !inserted && line.starts_with("#!") {
            out.push(directive);
            inserted = true;
        }
    }
    if !inserted {
        out.insert(0, directive);
    }
    out.join("\n")
}

/// Option of an `#SBATCH` line without its value: `--job-name` for `--job-name=x` and
/// `--job-name x`, `-J` for `-J x` and `-Jx`.
fn sbatch_option(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("#SBATCH")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let token = rest.split_whitespace().next()?;
    if token.starts_with("--") {
        token.split('=').next()
    } else if token.starts_with('-') {
        token.get(..2)
    } else {
        None
    }
}

/// Replace any job-name directives with a single `#SBATCH --job-name=<name>` after the shebang.
pub fn set_job_name(script: &str, name: &str) -> String {
    let directive = format!("{}{}", JOB_NAME_PREFIX, name);
    let lines = script
        .split('\n')
        .filter(|l| !matches!(sbatch_option(l), Some("--job-name" | "-J")))
        .collect();
    insert_after_shebang(lines, &directive)
}

/// Add `#SBATCH --chdir=<dir>` unless the script already sets a working directory.
pub fn ensure_chdir(script: &str, dir: &str) -> String {
    if script
        .split('\n')
        .any(|l| matches!(sbatch_option(l), Some("--chdir" | "-D")))
    {
        return script.to_string();
    }
    let directive = format!("{}={}", CHDIR_PREFIX, dir);
    insert_after_shebang(script.split('\n').collect(), &directive)
}

/// Reject values that would spill into further script lines.
pub fn single_line(field: &'static str, value: &str) -> Result<(), PortalError> {
    if value.contains(['\n', '\r']) {
        Err(PortalError::InvalidField(field))
    } else {
        Ok(())
    }
}

/// Fields of the template generator form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptTemplate {
    pub job_name: String,
    /// `HH:MM:SS`
    pub time: String,
    pub nodes: String,
    /// Tasks per node.
    pub ntasks: String,
    pub mem: String,
    pub array: String,
    pub commands: String,
}

impl ScriptTemplate {
    /// Whether there is anything to run.
    pub fn has_commands(&self) -> bool {
        !self.commands.trim().is_empty()
    }

    /// Render the script the template page previews: bash shebang, the non-empty directives,
    /// the working directory, a blank line, then the commands.
    pub fn render(&self, chdir: &str) -> Result<String, PortalError> {
        let directives = [
            ("job name", "--job-name", &self.job_name),
            ("time", "--time", &self.time),
            ("nodes", "--nodes", &self.nodes),
            ("tasks per node", "--ntasks-per-node", &self.ntasks),
            ("memory", "--mem", &self.mem),
            ("array", "--array", &self.array),
        ];
        let mut script = String::from("#!/bin/bash\n");
        for (field, flag, value) in directives {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            single_line(field, value)?;
            script.push_str(&format!("#SBATCH {}={}\n", flag, value));
        }
        script.push_str(&format!("{}={}\n\n", CHDIR_PREFIX, chdir));
        script.push_str(&self.commands);
        Ok(normalize_line_endings(&script))
    }
}
