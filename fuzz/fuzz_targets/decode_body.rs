#![no_main]

use libfuzzer_sys::fuzz_target;
use dexscope::method::{BodyConfig, MethodBody};

// The first byte splits the input into a code item and a debug info item.
fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (code, debug) = rest.split_at(rest.len() - split);
    let debug = (!debug.is_empty()).then_some(debug);

    if let Ok(mut body) = MethodBody::from(code, debug, BodyConfig::lenient()) {
        let _ = body.encode();
        let _ = body.encode_debug_info();
    }
});
