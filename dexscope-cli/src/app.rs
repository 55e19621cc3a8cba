use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dexscope::method::BodyConfig;

/// dexscope - inspect, disassemble and assemble register VM method bodies
#[derive(Debug, Parser)]
#[command(name = "dexscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Checks applied while decoding and assembling.
    #[arg(long, global = true, value_enum, default_value_t = Checks::Default)]
    pub checks: Checks,
}

impl GlobalOptions {
    pub fn config(&self) -> BodyConfig {
        match self.checks {
            Checks::Default => BodyConfig::default(),
            Checks::Strict => BodyConfig::strict(),
            Checks::Lenient => BodyConfig::lenient(),
            Checks::Minimal => BodyConfig::minimal(),
        }
    }
}

/// Presets of [`BodyConfig`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Checks {
    /// Every check, debug rows repaired after edits.
    Default,
    /// Every check, debug rows must keep their kind.
    Strict,
    /// Unassigned opcodes accepted, try ranges unchecked.
    Lenient,
    /// Try ranges unchecked.
    Minimal,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display header counts, the try table and debug program statistics.
    Info {
        /// Path to the raw code item.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Path to the raw debug info item.
        #[arg(long, value_name = "FILE")]
        debug: Option<PathBuf>,
    },

    /// Render a code item as assembly text.
    Disasm {
        /// Path to the raw code item.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Path to the raw debug info item.
        #[arg(long, value_name = "FILE")]
        debug: Option<PathBuf>,

        /// Identifier file resolving type and string keys.
        #[arg(long, value_name = "FILE")]
        ids: Option<PathBuf>,

        /// Write the text here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Assemble text into a code item and, if present, a debug info item.
    Asm {
        /// Path to the assembly text.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Where to write the code item.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Where to write the debug info item.
        #[arg(long, value_name = "FILE")]
        debug_out: Option<PathBuf>,

        /// Identifier file to resolve names against.
        #[arg(long, value_name = "FILE")]
        ids: Option<PathBuf>,

        /// Write the identifier pools, including newly interned names, here.
        #[arg(long, value_name = "FILE")]
        ids_out: Option<PathBuf>,
    },
}
