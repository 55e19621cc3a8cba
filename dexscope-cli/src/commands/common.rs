use std::{fmt::Write as _, path::Path};

use anyhow::{bail, Context};
use dexscope::{
    identifiers::{IdentifierStore, Identifiers},
    method::{BodyConfig, MethodBody},
};

/// Load a code item and, if given, its debug info item.
pub fn load_body(
    path: &Path,
    debug: Option<&Path>,
    config: BodyConfig,
) -> anyhow::Result<MethodBody> {
    let code = std::fs::read(path)
        .with_context(|| format!("failed to read code item: {}", path.display()))?;
    let debug = debug
        .map(|debug| {
            std::fs::read(debug)
                .with_context(|| format!("failed to read debug info: {}", debug.display()))
        })
        .transpose()?;

    MethodBody::from(&code, debug.as_deref(), config)
        .with_context(|| format!("failed to decode method body: {}", path.display()))
}

/// Load an identifier file. Each line is `type <descriptor>` or `string <value>`; keys are
/// assigned in order of appearance per pool. Empty lines and `#` comments are skipped.
pub fn load_ids(path: Option<&Path>) -> anyhow::Result<Identifiers> {
    let mut ids = Identifiers::new();
    let Some(path) = path else {
        return Ok(ids);
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read identifier file: {}", path.display()))?;
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(' ') {
            Some(("type", name)) => {
                ids.intern_type(name);
            }
            Some(("string", value)) => {
                ids.intern_string(value);
            }
            _ => bail!(
                "{}:{}: expected 'type <name>' or 'string <value>'",
                path.display(),
                index + 1
            ),
        }
    }
    Ok(ids)
}

/// Write both pools in the format read by [`load_ids`].
pub fn save_ids(path: &Path, ids: &Identifiers) -> anyhow::Result<()> {
    let mut text = String::new();
    for name in ids.types() {
        writeln!(text, "type {name}")?;
    }
    for value in ids.strings() {
        writeln!(text, "string {value}")?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write identifier file: {}", path.display()))
}
