#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_format_converter::converter::{ConversionOptions, FormatConverter, OutputFormat};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let converter = FormatConverter::new();
    let options = ConversionOptions {
        original_filename: Some("fuzz.md".to_string()),
        prettify: data.first().is_some_and(|b| b & 1 == 1),
        include_metadata: data.first().is_some_and(|b| b & 2 == 2),
        ..Default::default()
    };

    for format in OutputFormat::ALL {
        let result = converter.convert(&text, format, &options);
        assert!(result.success || result.content.is_empty());
        if format == OutputFormat::Html {
            assert!(!result.content.to_ascii_lowercase().contains("<script"));
        }
    }
});
