#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_format_converter::html_sanitizer::sanitize_html;

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let clean = sanitize_html(&html).to_ascii_lowercase();
    assert!(!clean.contains("<script"));
    assert!(!clean.contains("<iframe"));
});
