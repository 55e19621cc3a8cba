use std::{
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use log::info;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_body, load_ids},
    output::print_output,
};

#[derive(Debug, Serialize)]
pub struct Listing {
    pub path: String,
    pub text: String,
}

pub fn run(
    path: &Path,
    debug: Option<&Path>,
    ids: Option<&Path>,
    output: Option<&Path>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let ids = load_ids(ids)?;
    let mut body = load_body(path, debug, opts.config())?;
    let text = body
        .render(&ids)
        .with_context(|| format!("failed to render: {}", path.display()))?;

    if let Some(output) = output {
        std::fs::write(output, &text)
            .with_context(|| format!("failed to write: {}", output.display()))?;
        info!("Wrote {} lines to {}", text.lines().count(), output.display());
        return Ok(());
    }

    let listing = Listing {
        path: path.display().to_string(),
        text,
    };
    print_output(&listing, opts, |listing| {
        let stdout = io::stdout();
        let mut w = BufWriter::new(stdout.lock());
        // A closed pipe (e.g. `| head`) is not worth reporting.
        let _ = w.write_all(listing.text.as_bytes()).and_then(|()| w.flush());
    })
}
