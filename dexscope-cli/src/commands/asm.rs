use std::path::Path;

use anyhow::Context;
use dexscope::method::MethodBody;
use log::info;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_ids, save_ids},
    output::print_output,
};

pub struct AsmOptions<'a> {
    pub output: &'a Path,
    pub debug_out: Option<&'a Path>,
    pub ids: Option<&'a Path>,
    pub ids_out: Option<&'a Path>,
    pub global: &'a GlobalOptions,
}

#[derive(Debug, Serialize)]
pub struct AsmResult {
    pub instructions: usize,
    pub tries: usize,
    pub code_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_bytes: Option<usize>,
}

pub fn run(path: &Path, opts: &AsmOptions) -> anyhow::Result<()> {
    let mut ids = load_ids(opts.ids)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read: {}", path.display()))?;

    let mut body = MethodBody::parse(&text, &mut ids, opts.global.config())
        .with_context(|| format!("failed to assemble: {}", path.display()))?;
    let code = body.encode().context("failed to encode code item")?;
    let debug = body
        .encode_debug_info()
        .context("failed to encode debug info")?;

    std::fs::write(opts.output, &code)
        .with_context(|| format!("failed to write: {}", opts.output.display()))?;

    match (&debug, opts.debug_out) {
        (Some(debug), Some(debug_out)) => std::fs::write(debug_out, debug)
            .with_context(|| format!("failed to write: {}", debug_out.display()))?,
        (Some(_), None) => info!("Text has debug information; pass --debug-out to keep it"),
        (None, _) => {}
    }

    if let Some(ids_out) = opts.ids_out {
        save_ids(ids_out, &ids)?;
    }

    let result = AsmResult {
        instructions: body.code().len(),
        tries: body.tries().len(),
        code_bytes: code.len(),
        debug_bytes: debug.as_ref().map(Vec::len),
    };
    print_output(&result, opts.global, |result| {
        println!(
            "Assembled {} instructions and {} tries into {} bytes",
            result.instructions, result.tries, result.code_bytes
        );
        if let Some(bytes) = result.debug_bytes {
            println!("Debug info: {bytes} bytes");
        }
    })
}
