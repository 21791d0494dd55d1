//! Fuzz target for configuration file parsing.
//!
//! Feeds the same input through every supported format; parsing must
//! return an error on bad input, never panic.

#![no_main]

use std::path::Path;

use envstack_config::loader::parse_str;
use envstack_config::ConfigFormat;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
        let _ = parse_str(content, format, Path::new("fuzz"));
    }
});
