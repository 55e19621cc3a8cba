use std::{collections::BTreeMap, path::Path};

use dexscope::{debug::DebugProgram, method::MethodBody};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_body,
    output::{print_debug_summary, print_fields, print_output, print_try_table},
};

#[derive(Debug, Serialize)]
pub struct BodyInfo {
    pub registers: u16,
    pub ins: u16,
    pub outs: u16,
    pub debug_info_off: String,
    pub instruction_count: usize,
    pub payload_count: usize,
    pub code_bytes: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tries: Vec<TryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Serialize)]
pub struct TryInfo {
    pub start: String,
    pub end: String,
    pub handlers: Vec<HandlerInfo>,
}

#[derive(Debug, Serialize)]
pub struct HandlerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_key: Option<u32>,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub line_start: u32,
    pub parameter_count: usize,
    pub row_count: usize,
    pub advance_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_line: Option<u32>,
    pub kinds: BTreeMap<String, usize>,
}

fn debug_info(program: &DebugProgram) -> DebugInfo {
    let mut kinds = BTreeMap::new();
    for row in program.rows() {
        *kinds.entry(row.kind().to_string()).or_insert(0) += 1;
    }

    DebugInfo {
        line_start: program.line_start,
        parameter_count: program.parameter_names.len(),
        row_count: program.len(),
        advance_rows: program.advance_count(),
        first_line: program.rows().iter().map(|row| row.line()).min(),
        last_line: program.rows().iter().map(|row| row.line()).max(),
        kinds,
    }
}

fn body_info(body: &MethodBody) -> BodyInfo {
    let code = body.code();
    let tries = body
        .tries()
        .iter()
        .map(|item| TryInfo {
            start: format!("0x{:04x}", item.start_address()),
            end: format!("0x{:04x}", item.end_address()),
            handlers: item
                .handlers()
                .iter()
                .map(|handler| HandlerInfo {
                    type_key: handler.type_ref,
                    address: format!("0x{:04x}", handler.catch_address()),
                })
                .collect(),
        })
        .collect();

    BodyInfo {
        registers: body.registers,
        ins: body.ins,
        outs: body.outs,
        debug_info_off: format!("0x{:08x}", body.debug_info_off),
        instruction_count: code.len(),
        payload_count: code.iter().filter(|i| i.is_payload()).count(),
        code_bytes: code.end_address(),
        tries,
        debug: body.debug().map(debug_info),
    }
}

pub fn run(path: &Path, debug: Option<&Path>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let body = load_body(path, debug, opts.config())?;
    let info = body_info(&body);

    print_output(&info, opts, |info| {
        print_fields(
            "",
            &[
                ("Registers", info.registers.to_string()),
                ("Ins", info.ins.to_string()),
                ("Outs", info.outs.to_string()),
                ("Debug info off", info.debug_info_off.clone()),
                ("Instructions", info.instruction_count.to_string()),
                ("Payloads", info.payload_count.to_string()),
                ("Code bytes", info.code_bytes.to_string()),
            ],
        );

        if !info.tries.is_empty() {
            println!("\nTries:");
            print_try_table(&info.tries);
        }

        if let Some(debug) = &info.debug {
            println!("\nDebug program:");
            print_debug_summary(debug);
        }
    })
}
