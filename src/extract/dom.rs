//! DOM query helpers shared by the signal groups

use crate::extract::ExtractError;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Tags whose text never renders
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Compiles a CSS selector, reporting the offending selector on failure
pub fn sel(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{}: {:?}", css, e)))
}

/// Selects the elements matching each selector, selector by selector
///
/// Elements come back grouped by the first selector that matched them; an
/// element matching several selectors is returned only once.
pub fn select_each<'a>(doc: &'a Html, selectors: &[&str]) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    let mut out: Vec<ElementRef<'a>> = Vec::new();
    for css in selectors {
        let selector = sel(css)?;
        for el in doc.select(&selector) {
            if !out.iter().any(|seen| seen.id() == el.id()) {
                out.push(el);
            }
        }
    }
    Ok(out)
}

/// First descendant of `el` matching `css`
pub fn first_in<'a>(el: &ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>, ExtractError> {
    let selector = sel(css)?;
    Ok(el.select(&selector).next())
}

/// First descendant text for `css`, empty when nothing matches
pub fn text_in(el: &ElementRef<'_>, css: &str) -> Result<String, ExtractError> {
    Ok(first_in(el, css)?.map(|e| inner_text(&e)).unwrap_or_default())
}

/// Rendered text of an element with whitespace collapsed
pub fn inner_text(el: &ElementRef<'_>) -> String {
    text_excluding(el, &|_| false)
}

/// Rendered text of an element, skipping subtrees rejected by `skip`
pub fn text_excluding(el: &ElementRef<'_>, skip: &dyn Fn(&ElementRef<'_>) -> bool) -> String {
    let mut buf = String::new();
    collect_text(el, skip, &mut buf);
    collapse_whitespace(&buf)
}

fn collect_text(el: &ElementRef<'_>, skip: &dyn Fn(&ElementRef<'_>) -> bool, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if HIDDEN_TAGS.contains(&child_el.value().name()) || skip(&child_el) {
                        continue;
                    }
                    buf.push(' ');
                    collect_text(&child_el, skip, buf);
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Text of the `<body>`, or of the whole document if there is none
pub fn body_text(doc: &Html) -> Result<String, ExtractError> {
    let body = sel("body")?;
    Ok(match doc.select(&body).next() {
        Some(el) => inner_text(&el),
        None => inner_text(&doc.root_element()),
    })
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters without splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// The element's `class` attribute, or empty
pub fn class_attr<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("class").unwrap_or("")
}

pub fn attr<'a>(el: &ElementRef<'a>, name: &str) -> &'a str {
    el.value().attr(name).unwrap_or("")
}

/// True if any ancestor of `el` matches `selector`
pub fn has_ancestor(el: &ElementRef<'_>, selector: &Selector) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| selector.matches(&a))
}

/// The next sibling that is an element
pub fn next_element_sibling<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Reads a CSS pixel length (`120`, `120px`, `120.5px`) from a string
pub fn parse_px(value: &str) -> Option<f64> {
    let v = value.trim().trim_end_matches("px").trim();
    v.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

/// Looks up one declaration in an inline `style` attribute
pub fn style_value<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Resolves an href or src against the page URL
///
/// Returns None for empty values, pure fragments, non-navigational schemes
/// (`javascript:`, `mailto:`, `tel:`, `data:`) and anything that does not
/// resolve to http(s).
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    Some(url)
}

/// The document's `<base href>`, resolved against `document_url`
///
/// Only the first `<base>` counts, and only when it resolves to http(s).
pub fn base_href(doc: &Html, document_url: &Url) -> Result<Option<Url>, ExtractError> {
    let base = sel("base[href]")?;
    Ok(doc
        .select(&base)
        .next()
        .and_then(|el| document_url.join(attr(&el, "href").trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https"))
}

/// Appends `item` unless an equal item is already present
pub fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_text_skips_hidden() {
        let doc = Html::parse_document(
            "<html><body><p>Hello <b>brand</b></p><script>var x = 1;</script><style>p{}</style></body></html>",
        );
        assert_eq!(body_text(&doc).unwrap(), "Hello brand");
    }

    #[test]
    fn test_base_href() {
        let page = Url::parse("https://brand.com/shop/").unwrap();

        let doc = Html::parse_document(r#"<head><base href="/assets/v2/"></head>"#);
        assert_eq!(
            base_href(&doc, &page).unwrap().unwrap().as_str(),
            "https://brand.com/assets/v2/"
        );

        let doc = Html::parse_document(r#"<head><base href="javascript:void(0)"></head>"#);
        assert!(base_href(&doc, &page).unwrap().is_none());

        let doc = Html::parse_document("<head><title>No base</title></head>");
        assert!(base_href(&doc, &page).unwrap().is_none());
    }

    #[test]
    fn test_inner_text_separates_blocks() {
        let doc = Html::parse_document("<body><div>One</div><div>Two</div></body>");
        assert_eq!(body_text(&doc).unwrap(), "One Two");
    }

    #[test]
    fn test_text_excluding() {
        let doc = Html::parse_document("<body><main>Keep</main><footer>Drop</footer></body>");
        let body = doc.select(&sel("body").unwrap()).next().unwrap();
        let text = text_excluding(&body, &|e| e.value().name() == "footer");
        assert_eq!(text, "Keep");
    }

    #[test]
    fn test_select_each_returns_element_once() {
        let doc = Html::parse_document(r#"<body><div class="review">A</div><div class="reviews">B</div></body>"#);
        let found = select_each(&doc, &[".review", "[class*=\"review\"]"]).unwrap();
        let texts: Vec<String> = found.iter().map(inner_text).collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(sel("[[["), Err(ExtractError::Selector(_))));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("120"), Some(120.0));
        assert_eq!(parse_px(" 40px "), Some(40.0));
        assert_eq!(parse_px("auto"), None);
        assert_eq!(parse_px("50%"), None);
    }

    #[test]
    fn test_style_value() {
        let style = "color: #fff; Background-Color: #123456 ;width:10px";
        assert_eq!(style_value(style, "background-color"), Some("#123456"));
        assert_eq!(style_value(style, "width"), Some("10px"));
        assert_eq!(style_value(style, "height"), None);
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/dir/page").unwrap();
        let url = resolve_link("/about", &base).unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_skips_special_schemes() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_link("javascript:void(0)", &base).is_none());
        assert!(resolve_link("mailto:hi@example.com", &base).is_none());
        assert!(resolve_link("tel:+15551234567", &base).is_none());
        assert!(resolve_link("data:image/png;base64,AAAA", &base).is_none());
        assert!(resolve_link("#reviews", &base).is_none());
        assert!(resolve_link("ftp://example.com/file", &base).is_none());
        assert!(resolve_link("", &base).is_none());
    }

    #[test]
    fn test_has_ancestor_and_sibling() {
        let doc = Html::parse_document(
            "<body><header><div><img id='logo' src='a.png'></div></header><h2>Culture</h2><p>We ship.</p></body>",
        );
        let img = doc.select(&sel("#logo").unwrap()).next().unwrap();
        assert!(has_ancestor(&img, &sel("header, .header, nav").unwrap()));

        let h2 = doc.select(&sel("h2").unwrap()).next().unwrap();
        let next = next_element_sibling(&h2).unwrap();
        assert_eq!(inner_text(&next), "We ship.");
    }
}
