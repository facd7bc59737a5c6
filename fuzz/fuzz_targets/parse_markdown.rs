#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_format_converter::inline::parse_inline;
use markdown_format_converter::parser::parse_document;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let nodes = parse_document(&text);
    assert_eq!(nodes, parse_document(&text));
    let _ = parse_inline(&text);
});
