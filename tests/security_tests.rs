//! Security tests
//!
//! Exercises the malicious-source gate, the html5ever allow-list pass on
//! rendered documents, URL and filename sanitization, and the input guards.

use markdown_format_converter::converter::{ConversionOptions, OutputFormat, convert};
use markdown_format_converter::document::ParsedDocument;
use markdown_format_converter::error::ValidationError;
use markdown_format_converter::security::{
    ValidationOptions, check_content, check_file, detect_malicious_content, sanitize_filename,
    sanitize_url, validate_content, validate_file,
};
use proptest::prelude::*;

fn html_of(source: &str) -> String {
    ParsedDocument::parse(source).rendered_html
}

#[test]
fn test_script_block_removed_from_rendered_html() {
    let html = html_of("# Hi\n\n<script>alert(1)</script>\n\nSome *text*");
    assert!(!html.to_lowercase().contains("<script"));
    assert!(!html.contains("alert"));
    assert!(html.contains("<h1>Hi</h1>"));
    assert!(html.contains("<em>text</em>"));
}

#[test]
fn test_forbidden_elements_in_raw_html() {
    let html = html_of(
        "<iframe src=\"https://evil.example\"></iframe>\n\n\
         <form action=\"/steal\"><input name=\"pw\"><button>Go</button></form>\n\n\
         <object data=\"x.swf\"></object><embed src=\"y.swf\">\n\n\
         <style>body{display:none}</style>\n\nvisible",
    );
    for tag in ["<iframe", "<form", "<input", "<button", "<object", "<embed", "<style"] {
        assert!(!html.contains(tag), "{} survived in {}", tag, html);
    }
    assert!(html.contains("<p>visible</p>"));
}

#[test]
fn test_event_handlers_and_styles_stripped() {
    let html = html_of("<p onmouseover=\"x()\" style=\"color:red\" class=\"c\">hover</p>");
    assert_eq!(html, "<p>hover</p>");
}

#[test]
fn test_unknown_wrappers_unwrapped() {
    let html = html_of("<div><span>kept</span> <b>bold-ish</b></div>");
    assert_eq!(html, "kept bold-ish");
}

#[test]
fn test_link_urls_sanitized() {
    let html = html_of("[a](javascript:alert(1)) [b](https://ok.example) [c](mailto:me@example.com)");
    assert!(html.contains("<a href=\"#\" target=\"_blank\" rel=\"noopener noreferrer\">a</a>"));
    assert!(html.contains("href=\"https://ok.example\""));
    assert!(html.contains("href=\"mailto:me@example.com\""));
    assert!(!html.to_lowercase().contains("javascript"));
}

#[test]
fn test_raw_anchor_forced_to_new_tab() {
    let html = html_of("<a href=\"https://x.example\" target=\"_self\">x</a>");
    assert_eq!(
        html,
        "<a href=\"https://x.example\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"
    );
}

#[test]
fn test_image_sources_sanitized() {
    let html = html_of("![x](data:image/png;base64,AAAA)");
    assert!(html.contains("src=\"#\""));
}

#[test]
fn test_comments_not_emitted() {
    let html = html_of("<!-- hidden -->\n\ntext");
    assert!(!html.contains("hidden"));
    assert!(html.contains("<p>text</p>"));
}

#[test]
fn test_malicious_source_detection() {
    assert!(detect_malicious_content("click <a onclick=\"evil()\">here</a>"));
    assert!(detect_malicious_content("<SCRIPT>x</SCRIPT>"));
    assert!(detect_malicious_content("[x](JavaScript:alert(1))"));
    assert!(detect_malicious_content("data:text/html;base64,AAAA"));
    assert!(detect_malicious_content("vbscript:msgbox"));
    assert!(detect_malicious_content("eval(payload)"));
    assert!(detect_malicious_content("document.write('x')"));

    assert!(!detect_malicious_content("# Plain\n\nNothing to see"));
    assert!(!detect_malicious_content("one = 1 and done"));
}

#[test]
fn test_convert_refuses_malicious_source_for_every_format() {
    for format in OutputFormat::ALL {
        let result = convert(
            "click <a onclick=\"evil()\">here</a>",
            format,
            &ConversionOptions::default(),
        );
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.is_some());
    }
}

#[test]
fn test_sanitize_filename_traversal() {
    let name = sanitize_filename("../../etc/passwd.md");
    assert!(!name.contains('/'));
    assert!(!name.starts_with('.'));
}

#[test]
fn test_sanitize_url_policy() {
    assert_eq!(sanitize_url("https://example.com/a?b=c"), "https://example.com/a?b=c");
    assert_eq!(sanitize_url("  HTTP://EXAMPLE.COM "), "  HTTP://EXAMPLE.COM ");
    assert_eq!(sanitize_url("javascript:alert(1)"), "#");
    assert_eq!(sanitize_url("java\tscript:alert(1)"), "#");
    assert_eq!(sanitize_url("/relative/path"), "#");
    assert_eq!(sanitize_url(""), "#");
    assert_eq!(sanitize_url("http://"), "#");
    assert_eq!(sanitize_url("https://exa mple.com"), "#");
}

#[test]
fn test_file_guards() {
    let options = ValidationOptions::default();
    assert!(validate_file(100, "notes.md", &options).is_valid);
    assert!(validate_file(100, "NOTES.MARKDOWN", &options).is_valid);

    let too_big = validate_file(11 * 1024 * 1024, "notes.md", &options);
    assert!(!too_big.is_valid);
    assert!(too_big.error.unwrap().contains("exceeds maximum allowed size"));

    assert!(matches!(
        check_file(10, "image.png", &options),
        Err(ValidationError::InvalidType { .. })
    ));
}

#[test]
fn test_content_guard_counts_characters() {
    assert!(validate_content("ééé", 3).is_valid);
    assert!(matches!(
        check_content("éééé", 3),
        Err(ValidationError::ContentTooLarge { length: 4, max: 3 })
    ));
}

proptest! {
    #[test]
    fn prop_rendered_html_never_contains_script(body in "\\PC{0,200}") {
        let html = html_of(&format!("<script>{}</script>\n\n{}", body, body)).to_lowercase();
        prop_assert!(!html.contains("<script"));
    }

    #[test]
    fn prop_rendered_links_are_hardened(label in "[a-z]{1,10}", url in "[a-z:/.]{0,30}") {
        let html = html_of(&format!("[{}]({})", label, url));
        for (index, _) in html.match_indices("<a ") {
            let tag_end = html[index..].find('>').unwrap() + index;
            let tag = &html[index..tag_end];
            prop_assert!(tag.contains("target=\"_blank\""));
            prop_assert!(tag.contains("rel=\"noopener noreferrer\""));
        }
    }

    #[test]
    fn prop_sanitized_filenames_are_safe(name in "\\PC{0,300}") {
        let clean = sanitize_filename(&name);
        prop_assert!(!clean.contains('/'));
        prop_assert!(!clean.contains('\\'));
        prop_assert!(!clean.starts_with('.'));
        prop_assert!(clean.len() <= 255);
    }
}
