//! Visual assets: logo candidates, colour usage, content images and links

use crate::extract::dom::{
    attr, class_attr, has_ancestor, inner_text, parse_px, push_unique, resolve_link, sel,
    select_each, style_value, truncate_chars,
};
use crate::extract::types::{ColorUsage, ImageRef, Link, Logo};
use crate::extract::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

/// Bonus added to the prominence of logos placed in the header or navigation
pub const HEADER_BONUS: f64 = 10_000.0;

const MAX_CTA_COLORS: usize = 3;
const MAX_BACKGROUND_COLORS: usize = 3;
const MAX_TEXT_COLORS: usize = 3;
const MAX_STYLESHEET_COLORS: usize = 10;
const MAX_IMAGES: usize = 50;
const MAX_LINK_TEXT_CHARS: usize = 100;

static CSS_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})\b").expect("hex colour pattern should compile")
});

/// Images and inline SVGs that look like the brand's logo, most prominent first
///
/// Prominence is the pixel area plus [`HEADER_BONUS`] when the element sits
/// inside a header or navigation bar. The area is the rendered size the
/// browser recorded on the element, else the declared size.
pub fn logos(doc: &Html, base_url: &Url) -> Result<Vec<Logo>, ExtractError> {
    let placement = sel("header, .header, nav")?;
    let mut logos: Vec<Logo> = Vec::new();

    let mut candidates = Vec::new();
    for el in select_each(doc, &["img", "svg"])? {
        if mentions_logo(&el) {
            candidates.push(el);
        }
    }
    for el in select_each(doc, &[".logo img", "header img", ".header img"])? {
        if !candidates.iter().any(|c| c.id() == el.id()) {
            candidates.push(el);
        }
    }

    for el in candidates {
        let url = if el.value().name() == "svg" {
            let key = match class_attr(&el) {
                "" => attr(&el, "id"),
                classes => classes,
            };
            format!("svg_{}", key)
        } else {
            let src = match attr(&el, "src") {
                "" => attr(&el, "data-src"),
                src => src,
            };
            match resolve_link(src, base_url) {
                Some(u) => u.to_string(),
                None => continue,
            }
        };

        if logos.iter().any(|l| l.url == url) {
            continue;
        }

        let (width, height) = rendered_size(&el).unwrap_or_else(|| declared_size(&el));
        let mut prominence = width * height;
        if has_ancestor(&el, &placement) {
            prominence += HEADER_BONUS;
        }

        logos.push(Logo {
            url,
            alt: attr(&el, "alt").to_string(),
            classes: class_attr(&el).to_string(),
            prominence,
            width,
            height,
        });
    }

    logos.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));
    Ok(logos)
}

fn mentions_logo(el: &ElementRef<'_>) -> bool {
    ["src", "alt", "class", "id"]
        .iter()
        .any(|a| attr(el, a).to_lowercase().contains("logo"))
}

/// Bounding box measured in the browser, when the element was laid out
fn rendered_size(el: &ElementRef<'_>) -> Option<(f64, f64)> {
    let width = parse_px(attr(el, "data-rendered-width"))?;
    let height = parse_px(attr(el, "data-rendered-height"))?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Width and height from attributes, falling back to inline style
fn declared_size(el: &ElementRef<'_>) -> (f64, f64) {
    let style = attr(el, "style");
    let dimension = |name: &str| {
        parse_px(attr(el, name))
            .or_else(|| style_value(style, name).and_then(parse_px))
            .unwrap_or(0.0)
    };
    (dimension("width"), dimension("height"))
}

/// Colours grouped by where the page uses them
///
/// CTA and background colours come from inline `background`/`background-color`
/// declarations, text colours from inline `color`, and the remainder from hex
/// literals in `<style>` blocks.
pub fn colors(doc: &Html) -> Result<ColorUsage, ExtractError> {
    let mut usage = ColorUsage::default();

    for el in select_each(doc, &["button", ".btn", ".cta", "a.button"])? {
        if let Some(color) = background_of(&el) {
            push_unique(&mut usage.cta, color);
        }
    }

    for el in select_each(doc, &["body", "main", "section", "div"])? {
        if let Some(color) = background_of(&el) {
            push_unique(&mut usage.background, color);
        }
    }

    let styled = sel("[style]")?;
    for el in doc.select(&styled) {
        if let Some(color) = style_value(attr(&el, "style"), "color") {
            push_unique(&mut usage.text, color.to_string());
        }
    }

    let style_blocks = sel("style")?;
    for block in doc.select(&style_blocks) {
        let css = block.text().collect::<String>();
        for caps in CSS_HEX.captures_iter(&css) {
            push_unique(&mut usage.other, format!("#{}", caps[1].to_uppercase()));
        }
    }

    usage.cta.truncate(MAX_CTA_COLORS);
    usage.background.truncate(MAX_BACKGROUND_COLORS);
    usage.text.truncate(MAX_TEXT_COLORS);
    usage.other.truncate(MAX_STYLESHEET_COLORS);
    Ok(usage)
}

fn background_of(el: &ElementRef<'_>) -> Option<String> {
    let style = attr(el, "style");
    style_value(style, "background-color")
        .or_else(|| style_value(style, "background"))
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("transparent"))
        .map(str::to_string)
}

/// Content images from the main areas of the page, excluding logos and icons
pub fn images(doc: &Html, base_url: &Url) -> Result<Vec<ImageRef>, ExtractError> {
    let mut images: Vec<ImageRef> = Vec::new();

    for el in select_each(
        doc,
        &["main img", "section img", "article img", ".hero img", ".banner img"],
    )? {
        let src = match attr(&el, "src") {
            "" => attr(&el, "data-src"),
            src => src,
        };
        let Some(url) = resolve_link(src, base_url) else {
            continue;
        };

        let classes = class_attr(&el).to_lowercase();
        if classes.contains("logo") || classes.contains("icon") {
            continue;
        }

        let url = url.to_string();
        if images.iter().any(|i| i.url == url) {
            continue;
        }
        images.push(ImageRef {
            url,
            alt: attr(&el, "alt").to_string(),
            classes,
        });
    }

    images.truncate(MAX_IMAGES);
    Ok(images)
}

/// Outbound links with their anchor text, deduplicated by resolved URL
pub fn links(doc: &Html, base_url: &Url) -> Result<Vec<Link>, ExtractError> {
    let anchors = sel("a[href]")?;
    let mut links: Vec<Link> = Vec::new();

    for a in doc.select(&anchors) {
        let Some(mut url) = resolve_link(attr(&a, "href"), base_url) else {
            continue;
        };
        url.set_fragment(None);
        let url = url.to_string();
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        links.push(Link {
            url,
            text: truncate_chars(&inner_text(&a), MAX_LINK_TEXT_CHARS),
        });
    }

    Ok(links)
}
