//! Page-level metadata and interaction signals: structured data, videos,
//! calls-to-action, forms, visual effects and social platform references

use crate::extract::dom::{
    attr, class_attr, inner_text, push_unique, resolve_link, sel, select_each, style_value,
};
use crate::extract::people::form_fields;
use crate::extract::types::{
    Carousel, Cta, CtaKind, Ctas, FormType, GeneralForm, NativeVideo, SocialEmbed, StickyElement,
    StructuredData, VideoEmbed, Videos, VisualElements,
};
use crate::extract::ExtractError;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

const MAX_PRIMARY_CTAS: usize = 15;
const MAX_SECONDARY_CTAS: usize = 15;
const MAX_CTA_TEXTS: usize = 30;
const CTA_TEXT_WINDOW: usize = 50;
const MAX_CTA_LABEL_CHARS: usize = 50;
const MAX_FORMS: usize = 10;
const MAX_CAROUSELS: usize = 5;
const MAX_STICKY: usize = 5;

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:embed/|v=)([a-zA-Z0-9_-]+)").expect("youtube pattern should compile")
});

static VIMEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/video/(\d+)").expect("vimeo pattern should compile"));

const SCHEMA_TYPES: &[&str] = &["Product", "Organization", "LocalBusiness", "Person", "Article"];
const META_NAMES: &[&str] = &["description", "keywords", "author", "viewport", "theme-color", "robots"];

const PRIMARY_CTA_PATTERNS: &[&str] = &[
    "buy now",
    "get started",
    "sign up",
    "start free",
    "try",
    "subscribe",
    "purchase",
    "order now",
    "shop now",
];
const SECONDARY_CTA_PATTERNS: &[&str] = &[
    "learn more",
    "contact",
    "see more",
    "view",
    "explore",
    "discover",
    "read more",
];

/// Social platforms and the URL/class fragments that identify them
const SOCIAL_PLATFORMS: &[(&str, &[&str])] = &[
    ("instagram", &["instagram.com", "instagram-feed", "insta-"]),
    ("tiktok", &["tiktok.com", "tiktok-"]),
    ("youtube", &["youtube.com", "youtu.be", "youtube-"]),
    ("facebook", &["facebook.com", "fb.com", "facebook-"]),
    ("twitter", &["twitter.com", "x.com", "tweet-"]),
    ("pinterest", &["pinterest.com", "pinterest-"]),
];

/// JSON-LD, OpenGraph, Twitter card and standard meta tags
///
/// JSON-LD blocks that fail to parse are skipped without affecting the rest
/// of the group. Within a page the first occurrence of a key wins.
pub fn structured_data(doc: &Html) -> Result<StructuredData, ExtractError> {
    let mut data = StructuredData::default();

    let ld = sel(r#"script[type="application/ld+json"]"#)?;
    for script in doc.select(&ld) {
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                if let Some(schema_type) = primary_schema_type(&value) {
                    if SCHEMA_TYPES.contains(&schema_type.as_str()) {
                        data.schema_org.entry(schema_type).or_insert_with(|| value.clone());
                    }
                }
                data.json_ld.push(value);
            }
            Err(e) => tracing::debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }

    let og = sel(r#"meta[property^="og:"]"#)?;
    for meta in doc.select(&og) {
        let key = attr(&meta, "property").trim_start_matches("og:");
        let content = attr(&meta, "content");
        if !content.is_empty() {
            data.open_graph
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }

    let twitter = sel(r#"meta[name^="twitter:"]"#)?;
    for meta in doc.select(&twitter) {
        let key = attr(&meta, "name").trim_start_matches("twitter:");
        let content = attr(&meta, "content");
        if !content.is_empty() {
            data.twitter
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }

    for name in META_NAMES {
        let selector = sel(&format!(r#"meta[name="{}"]"#, name))?;
        if let Some(meta) = doc.select(&selector).next() {
            data.meta_tags
                .insert(name.to_string(), attr(&meta, "content").to_string());
        }
    }

    let canonical = sel(r#"link[rel="canonical"]"#)?;
    if let Some(link) = doc.select(&canonical).next() {
        data.meta_tags
            .insert("canonical".to_string(), attr(&link, "href").to_string());
    }

    Ok(data)
}

/// The first `@type` of a JSON-LD object
fn primary_schema_type(value: &Value) -> Option<String> {
    match value.get("@type")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first()?.as_str().map(str::to_string),
        _ => None,
    }
}

/// YouTube and Vimeo embeds plus native `<video>` elements
pub fn videos(doc: &Html, base_url: &Url) -> Result<Videos, ExtractError> {
    let mut videos = Videos::default();

    let youtube = sel(r#"iframe[src*="youtube.com"], iframe[src*="youtu.be"]"#)?;
    for frame in doc.select(&youtube) {
        let src = attr(&frame, "src");
        if let Some(caps) = YOUTUBE_ID.captures(src) {
            videos.youtube.push(VideoEmbed {
                url: src.to_string(),
                id: caps[1].to_string(),
            });
            videos.count += 1;
        }
    }

    let vimeo = sel(r#"iframe[src*="vimeo.com"]"#)?;
    for frame in doc.select(&vimeo) {
        let src = attr(&frame, "src");
        if let Some(caps) = VIMEO_ID.captures(src) {
            videos.vimeo.push(VideoEmbed {
                url: src.to_string(),
                id: caps[1].to_string(),
            });
            videos.count += 1;
        }
    }

    let video = sel("video")?;
    let source = sel("source[src]")?;
    for el in doc.select(&video) {
        let own = attr(&el, "src");
        let src = if own.is_empty() {
            el.select(&source).next().map(|s| attr(&s, "src")).unwrap_or("")
        } else {
            own
        };
        if src.is_empty() {
            continue;
        }

        let absolute = resolve_link(src, base_url).map_or_else(|| src.to_string(), |u| u.to_string());
        let poster = el
            .value()
            .attr("poster")
            .and_then(|p| resolve_link(p, base_url))
            .map(|u| u.to_string());

        videos.native.push(NativeVideo { src: absolute, poster });
        videos.count += 1;
    }

    Ok(videos)
}

/// Buttons and links classified as primary or secondary calls-to-action
///
/// Text patterns decide first; a button styled as primary with unrecognized
/// text is recorded as an inferred primary CTA.
pub fn ctas(doc: &Html) -> Result<Ctas, ExtractError> {
    let mut ctas = Ctas::default();
    let mut all_text = Vec::new();

    for el in select_each(doc, &["button", "a", "[role=\"button\"]"])? {
        let text = inner_text(&el);
        if text.is_empty() || text.chars().count() > MAX_CTA_LABEL_CHARS {
            continue;
        }

        let lower = text.to_lowercase();
        let classes = class_attr(&el);
        let class_lower = classes.to_lowercase();
        let is_primary_style = class_lower.contains("primary") || class_lower.contains("cta");
        let is_button = el.value().name() == "button"
            || class_lower.contains("button")
            || class_lower.contains("btn");

        let kind = if PRIMARY_CTA_PATTERNS.iter().any(|p| lower.contains(p)) {
            Some(CtaKind::Primary)
        } else if SECONDARY_CTA_PATTERNS.iter().any(|p| lower.contains(p)) {
            Some(CtaKind::Secondary)
        } else if is_button && is_primary_style {
            Some(CtaKind::InferredPrimary)
        } else {
            None
        };

        if let Some(kind) = kind {
            let cta = Cta {
                text: text.clone(),
                classes: classes.to_string(),
                kind,
                is_button: is_button || kind == CtaKind::InferredPrimary,
            };
            match kind {
                CtaKind::Secondary => ctas.secondary.push(cta),
                CtaKind::Primary | CtaKind::InferredPrimary => ctas.primary.push(cta),
            }
            ctas.count += 1;
        }

        if ctas.count <= CTA_TEXT_WINDOW {
            push_unique(&mut all_text, text);
        }
    }

    ctas.primary.truncate(MAX_PRIMARY_CTAS);
    ctas.secondary.truncate(MAX_SECONDARY_CTAS);
    all_text.truncate(MAX_CTA_TEXTS);
    ctas.all_text = all_text;
    Ok(ctas)
}

/// Every form with at least one field, with its purpose guessed from its text
pub fn general_forms(doc: &Html, base_url: &Url) -> Result<Vec<GeneralForm>, ExtractError> {
    let forms_sel = sel("form")?;
    let submit = sel(r#"button[type="submit"], input[type="submit"]"#)?;
    let mut forms = Vec::new();

    for (index, form) in doc.select(&forms_sel).enumerate() {
        let fields = form_fields(&form)?;
        if fields.is_empty() {
            continue;
        }

        let mut field_types = std::collections::BTreeMap::new();
        for field in &fields {
            *field_types.entry(field.field_type.clone()).or_insert(0) += 1;
        }

        let action = match form.value().attr("action") {
            Some(a) => resolve_link(a, base_url).map_or_else(|| a.to_string(), |u| u.to_string()),
            None => base_url.to_string(),
        };
        let method = match attr(&form, "method").trim().to_lowercase() {
            m if m.is_empty() => "get".to_string(),
            m => m,
        };

        forms.push(GeneralForm {
            index,
            action,
            method,
            has_submit: form.select(&submit).next().is_some(),
            form_type: classify_form(&inner_text(&form)),
            field_types,
            fields,
        });
    }

    forms.truncate(MAX_FORMS);
    Ok(forms)
}

/// Guesses a form's purpose from its visible text
pub fn classify_form(text: &str) -> FormType {
    let text = text.to_lowercase();
    if text.contains("newsletter") || text.contains("subscribe") {
        FormType::Newsletter
    } else if text.contains("contact") || text.contains("message") {
        FormType::Contact
    } else if text.contains("search") {
        FormType::Search
    } else if text.contains("login") || text.contains("sign in") {
        FormType::Login
    } else if text.contains("register") || text.contains("sign up") {
        FormType::Registration
    } else {
        FormType::Other
    }
}

/// Motion and layout effects visible in static markup
///
/// Animations are detected from inline styles and `<style>` blocks; sticky
/// elements from inline positioning or sticky/fixed utility classes on
/// headers, navigation and CTAs.
pub fn visual_elements(doc: &Html) -> Result<VisualElements, ExtractError> {
    let mut visuals = VisualElements::default();

    let styled = sel("[style]")?;
    let style_blocks = sel("style")?;
    visuals.has_animations = doc
        .select(&styled)
        .any(|el| attr(&el, "style").to_lowercase().contains("animation"))
        || doc.select(&style_blocks).any(|el| {
            let css = el.text().collect::<String>().to_lowercase();
            css.contains("@keyframes") || css.contains("animation")
        });

    let parallax = sel(".parallax, [data-parallax], [class*=\"parallax\"]")?;
    visuals.has_parallax = doc.select(&parallax).next().is_some();

    let slides = sel("[class*=\"slide\"], [class*=\"item\"]")?;
    for carousel in select_each(
        doc,
        &[
            ".carousel",
            ".slider",
            ".swiper",
            "[class*=\"carousel\"]",
            "[class*=\"slider\"]",
            "[class*=\"swiper\"]",
            "[data-slide]",
        ],
    )? {
        let slide_count = carousel.select(&slides).count();
        if slide_count > 1 {
            visuals.carousels.push(Carousel {
                classes: class_attr(&carousel).to_string(),
                slide_count,
            });
        }
    }

    let any = sel("*")?;
    for el in doc.select(&any) {
        let classes = class_attr(&el);
        let class_lower = classes.to_lowercase();
        let positioned = style_value(attr(&el, "style"), "position")
            .map(|p| {
                let p = p.to_lowercase();
                p.starts_with("sticky") || p.starts_with("fixed")
            })
            .unwrap_or(false)
            || class_lower.contains("sticky")
            || class_lower.contains("fixed");
        let relevant = class_lower.contains("header")
            || class_lower.contains("nav")
            || class_lower.contains("cta");
        if positioned && relevant {
            visuals.sticky_elements.push(StickyElement {
                element_type: el.value().name().to_string(),
                classes: classes.to_string(),
            });
        }
    }

    let interactive = sel("button, a, input, select, [onclick], [role=\"button\"]")?;
    visuals.interactive_count = doc.select(&interactive).count();

    visuals.carousels.truncate(MAX_CAROUSELS);
    visuals.sticky_elements.truncate(MAX_STICKY);
    Ok(visuals)
}

/// Counts references to each social platform in iframes and links
///
/// Every platform is reported, including those with a zero count.
pub fn social_embeds(doc: &Html) -> Result<Vec<SocialEmbed>, ExtractError> {
    let mut embeds: Vec<SocialEmbed> = SOCIAL_PLATFORMS
        .iter()
        .map(|(platform, _)| SocialEmbed {
            platform: platform.to_string(),
            count: 0,
        })
        .collect();

    let targets = sel("iframe, a")?;
    for el in doc.select(&targets) {
        let src = el
            .value()
            .attr("src")
            .or_else(|| el.value().attr("href"))
            .unwrap_or("");
        let classes = class_attr(&el);

        for (embed, (_, patterns)) in embeds.iter_mut().zip(SOCIAL_PLATFORMS) {
            for pattern in patterns.iter() {
                if src.contains(pattern) || classes.contains(pattern) {
                    embed.count += 1;
                }
            }
        }
    }

    Ok(embeds)
}
