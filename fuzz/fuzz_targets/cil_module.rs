#![no_main]

use libfuzzer_sys::fuzz_target;
use publicizer::{backend::CilModule, patcher::{publicize, PatchRules}};

fuzz_target!(|data: &[u8]| {
    if let Ok(mut module) = CilModule::from_bytes("fuzz", data.to_vec()) {
        publicize(&mut module, &PatchRules::default());
        let _ = module.into_bytes();
    }
});
