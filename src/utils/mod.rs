//! Common utilities and helper functions
//!
//! This module provides shared text helpers used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Extract `http(s)://` links from text, in order of appearance
///
/// A link runs until the next whitespace character and is returned verbatim,
/// trailing punctuation included.
pub fn extract_links(text: &str) -> Vec<String> {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();

    let re = LINK_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("Invalid regex pattern"));

    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Put a multi-line comment body on a single line
pub fn flatten_lines(text: &str) -> String {
    text.replace('\n', " ")
}

/// Decode the HTML entities Reddit applies to titles and bodies
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Capitalize the first letter of every word and lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }

    out
}

/// Format a price or reading; integral values keep one decimal place
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links() {
        let links = extract_links("see https://a.com/x and http://b.org/y?z=1, thanks");
        assert_eq!(links, vec!["https://a.com/x", "http://b.org/y?z=1,"]);
    }

    #[test]
    fn test_extract_links_none() {
        assert!(extract_links("no links, just ftp://nope and www.example.com").is_empty());
    }

    #[test]
    fn test_flatten_lines() {
        assert_eq!(flatten_lines("one\ntwo\n\nthree"), "one two  three");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Q&amp;A &lt;3 &gt;"), "Q&A <3 >");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("light rain"), "Light Rain");
        assert_eq!(title_case("OVERCAST clouds"), "Overcast Clouds");
        assert_eq!(title_case("thunderstorm with heavy-rain"), "Thunderstorm With Heavy-Rain");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100.0");
        assert_eq!(format_number(123.45), "123.45");
        assert_eq!(format_number(-3.5), "-3.5");
    }
}
