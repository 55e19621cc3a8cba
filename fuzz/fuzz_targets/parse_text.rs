#![no_main]

use libfuzzer_sys::fuzz_target;
use dexscope::{
    identifiers::Identifiers,
    method::{BodyConfig, MethodBody},
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut ids = Identifiers::new();
    if let Ok(mut body) = MethodBody::parse(text, &mut ids, BodyConfig::default()) {
        let _ = body.render(&ids);
        let _ = body.encode();
    }
});
