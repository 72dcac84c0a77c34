//! Copy-oriented signal groups: main text, navigation, hero, FAQs, pricing
//! and other prose the brand uses to sell

use crate::extract::dom::{
    attr, body_text, class_attr, collapse_whitespace, first_in, inner_text, push_unique, sel,
    select_each, text_excluding, text_in, truncate_chars,
};
use crate::extract::types::{Banner, Faq, HeroSection, PriceEntry};
use crate::extract::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

pub const MAX_TEXT_CHARS: usize = 100_000;
pub const MAX_NAV_CHARS: usize = 10_000;
pub const MAX_REVIEWS_CHARS: usize = 20_000;
pub const MAX_LEGAL_CHARS: usize = 50_000;
const MAX_FAQS: usize = 20;
const MAX_BULLETS: usize = 20;
const MAX_PRICES: usize = 20;
const MAX_DISCLAIMERS: usize = 10;
const MAX_BANNERS: usize = 10;
const BANNER_TEXT_CHARS: usize = 200;

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$£€₹]\s*([\d,]+(?:\.\d{2})?)").expect("price pattern should compile")
});

/// Splits prose into sentences on terminal punctuation
pub(crate) static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern should compile"));

const DISCLAIMER_PATTERNS: &[&str] = &[
    "results may vary",
    "not intended to diagnose",
    "consult your doctor",
    "these statements have not been evaluated",
    "not a substitute",
    "individual results may vary",
    "no guarantee",
];

/// Main readable content, excluding footers, cookie notices and embeds
///
/// Content regions (`main`, `article`, `.content`, `section`) are preferred;
/// the whole body is used when the page has none.
pub fn main_text(doc: &Html) -> Result<String, ExtractError> {
    let excluded = |e: &ElementRef<'_>| {
        matches!(e.value().name(), "footer" | "iframe")
            || class_attr(e).to_lowercase().contains("cookie")
    };

    let regions = select_each(doc, &["main", "article", ".content", ".main-content", "section"])?;
    let mut text = String::new();
    for region in regions {
        let region_text = text_excluding(&region, &excluded);
        if !region_text.is_empty() {
            text.push_str(&region_text);
            text.push(' ');
        }
    }

    if text.trim().is_empty() {
        let body = sel("body")?;
        if let Some(body) = doc.select(&body).next() {
            text = text_excluding(&body, &excluded);
        }
    }

    Ok(truncate_chars(&collapse_whitespace(&text), MAX_TEXT_CHARS))
}

/// Navigation labels, including aria-labels and link texts
pub fn nav_text(doc: &Html) -> Result<String, ExtractError> {
    let labelled = sel("[aria-label]")?;
    let anchors = sel("a")?;
    let mut text = String::new();

    for el in select_each(
        doc,
        &["nav", ".nav", ".navigation", ".menu", "header", "[role=\"navigation\"]"],
    )? {
        text.push_str(&inner_text(&el));
        text.push(' ');
        for aria in el.select(&labelled) {
            text.push_str(attr(&aria, "aria-label"));
            text.push(' ');
        }
        for a in el.select(&anchors) {
            text.push_str(&inner_text(&a));
            text.push(' ');
        }
    }

    Ok(truncate_chars(&collapse_whitespace(&text), MAX_NAV_CHARS))
}

/// Footer, legal and compliance copy
pub fn legal_footer(doc: &Html) -> Result<String, ExtractError> {
    let text = concat_text(
        doc,
        &[
            "footer",
            ".footer",
            "[role=\"contentinfo\"]",
            ".disclaimer",
            "[class*=\"disclaimer\"]",
            "[class*=\"legal\"]",
            ".terms",
            ".privacy",
            "[class*=\"compliance\"]",
        ],
    )?;
    Ok(truncate_chars(&text, MAX_LEGAL_CHARS))
}

/// Customer review and testimonial copy
pub fn reviews_text(doc: &Html) -> Result<String, ExtractError> {
    let text = concat_text(
        doc,
        &[
            ".review",
            ".testimonial",
            ".feedback",
            "[class*=\"review\"]",
            "[class*=\"testimonial\"]",
            "[data-testid*=\"review\"]",
        ],
    )?;
    Ok(truncate_chars(&text, MAX_REVIEWS_CHARS))
}

fn concat_text(doc: &Html, selectors: &[&str]) -> Result<String, ExtractError> {
    let mut text = String::new();
    for el in select_each(doc, selectors)? {
        text.push_str(&inner_text(&el));
        text.push(' ');
    }
    Ok(collapse_whitespace(&text))
}

/// Headline block at the top of a landing page
///
/// Hero candidates are tried in order; the first one with a headline wins.
/// Returns None when no candidate yields any text.
pub fn hero_section(doc: &Html) -> Result<Option<HeroSection>, ExtractError> {
    let candidates = [
        ".hero",
        ".banner",
        ".jumbotron",
        "[class*=\"hero\"]",
        "section:first-of-type",
        ".above-fold",
        "[class*=\"banner\"]",
    ];

    let mut hero = HeroSection::default();
    for css in candidates {
        let selector = sel(css)?;
        let Some(el) = doc.select(&selector).next() else {
            continue;
        };

        let h1 = text_in(&el, "h1")?;
        hero.headline = if h1.is_empty() { text_in(&el, "h2")? } else { h1 };

        let subtitle = text_in(&el, "[class*=\"subtitle\"], [class*=\"subhead\"]")?;
        let paragraph = text_in(&el, "p")?;
        hero.subheadline = [subtitle, paragraph, text_in(&el, "h3")?]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        hero.cta_text = text_in(&el, "a, button")?;

        if !hero.headline.is_empty() {
            break;
        }
    }

    Ok(if hero.is_empty() { None } else { Some(hero) })
}

/// Question/answer pairs from FAQ and accordion blocks
///
/// A block without a recognizable question keeps its text as an answer with
/// an empty question.
pub fn faqs(doc: &Html) -> Result<Vec<Faq>, ExtractError> {
    let mut faqs = Vec::new();

    for el in select_each(
        doc,
        &[
            ".faq",
            "[class*=\"faq\"]",
            ".accordion",
            "[class*=\"accordion\"]",
            "[itemtype*=\"Question\"]",
            "[class*=\"question\"]",
        ],
    )? {
        let question = first_in(&el, "[class*=\"question\"], h3, h4, summary, dt")?;
        let answer = first_in(&el, "[class*=\"answer\"], p, dd")?;

        match (question, answer) {
            (Some(q), Some(a)) => faqs.push(Faq {
                question: inner_text(&q),
                answer: inner_text(&a),
            }),
            _ => {
                let text = inner_text(&el);
                if !text.is_empty() {
                    faqs.push(Faq {
                        question: String::new(),
                        answer: text,
                    });
                }
            }
        }
    }

    faqs.truncate(MAX_FAQS);
    Ok(faqs)
}

/// Benefit and feature bullet points on product pages
pub fn product_bullets(doc: &Html) -> Result<Vec<String>, ExtractError> {
    let candidates = select_each(
        doc,
        &[
            ".product-description ul li",
            ".benefits li",
            ".features li",
            "[class*=\"benefit\"] li",
            "[class*=\"feature\"] li",
            ".bullet-point",
            "[class*=\"bullet\"]",
        ],
    )?;

    let mut bullets = Vec::new();
    for text in candidates.iter().map(inner_text) {
        if text.chars().count() > 5 {
            push_unique(&mut bullets, text);
        }
    }

    bullets.truncate(MAX_BULLETS);
    Ok(bullets)
}

/// Prices shown in pricing-classed elements, deduplicated by text
pub fn pricing(doc: &Html) -> Result<Vec<PriceEntry>, ExtractError> {
    let mut seen: Vec<String> = Vec::new();
    let mut prices = Vec::new();

    for el in select_each(
        doc,
        &[
            ".price",
            "[class*=\"price\"]",
            "[data-price]",
            ".cost",
            "[class*=\"cost\"]",
            "[class*=\"pricing\"]",
        ],
    )? {
        let text = inner_text(&el);
        if seen.contains(&text) {
            continue;
        }
        if let Some(entry) = parse_price(&text) {
            seen.push(text);
            prices.push(entry);
        }
    }

    prices.truncate(MAX_PRICES);
    Ok(prices)
}

/// Parses the first currency amount in `text`
pub fn parse_price(text: &str) -> Option<PriceEntry> {
    let caps = PRICE_PATTERN.captures(text)?;
    let whole = caps.get(0)?.as_str();
    let currency = whole.chars().next()?.to_string();
    let amount = caps.get(1)?.as_str().replace(',', "").parse::<f64>().ok()?;

    Some(PriceEntry {
        text: text.to_string(),
        currency,
        amount,
    })
}

/// Sentences containing health or results disclaimers
pub fn disclaimers(doc: &Html) -> Result<Vec<String>, ExtractError> {
    let body = body_text(doc)?;
    let lower = body.to_lowercase();
    let mut found = Vec::new();

    for pattern in DISCLAIMER_PATTERNS {
        if !lower.contains(pattern) {
            continue;
        }
        for sentence in SENTENCE_BREAK.split(&body) {
            if sentence.to_lowercase().contains(pattern) {
                push_unique(&mut found, sentence.trim().to_string());
            }
        }
    }

    found.truncate(MAX_DISCLAIMERS);
    Ok(found)
}

/// Promotional banners, carousels and sliders with their text density
pub fn banners(doc: &Html) -> Result<Vec<Banner>, ExtractError> {
    let mut banners = Vec::new();

    for el in select_each(
        doc,
        &[
            ".banner",
            "[class*=\"banner\"]",
            ".carousel",
            "[class*=\"carousel\"]",
            ".slider",
            "[class*=\"slider\"]",
            ".promo",
            "[class*=\"promo\"]",
        ],
    )? {
        let text = inner_text(&el);
        let char_count = text.chars().count();
        if char_count > 3 {
            banners.push(Banner {
                word_count: text.split_whitespace().count(),
                char_count,
                text: truncate_chars(&text, BANNER_TEXT_CHARS),
            });
        }
    }

    banners.truncate(MAX_BANNERS);
    Ok(banners)
}
