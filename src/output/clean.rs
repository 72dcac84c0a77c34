//! Text cleanup applied to the merged buffers

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));

static NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)Cookie Policy.*?(?:Accept|OK|Close)",
        r"(?is)This site uses cookies.*?(?:Accept|OK|Close)",
        r"(?is)Subscribe to our newsletter.*?Sign Up",
        r"(?is)By continuing.*?you agree",
        r"(?is)We use cookies.*?(?:Learn more|OK)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("noise pattern should compile"))
    .collect()
});

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern should compile"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+").expect("email pattern should compile"));
static REPEATED_BANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{2,}").expect("punctuation pattern should compile"));
static REPEATED_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("ellipsis pattern should compile"));

const PAGE_HEADER: &str = "=== PAGE: ";

/// Removes boilerplate, URLs and email addresses and collapses whitespace
pub fn clean_text(text: &str) -> String {
    let mut out = WHITESPACE.replace_all(text, " ").into_owned();
    for pattern in NOISE.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out = URL.replace_all(&out, "").into_owned();
    out = EMAIL.replace_all(&out, "").into_owned();
    out = REPEATED_BANG.replace_all(&out, "!").into_owned();
    out = REPEATED_DOT.replace_all(&out, ".").into_owned();
    WHITESPACE.replace_all(out.trim(), " ").into_owned()
}

/// Cleans the page-delimited main text buffer
///
/// `=== PAGE: <url> ===` header lines are kept verbatim; every other line is
/// cleaned and dropped if nothing survives.
pub fn clean_page_buffer(buffer: &str) -> String {
    buffer
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.starts_with(PAGE_HEADER) {
                Some(line.to_string())
            } else {
                Some(clean_text(line)).filter(|l| !l.is_empty())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
