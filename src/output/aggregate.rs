//! Merges every collected page into one [`CrawlResult`]
//!
//! Runs once, after all workers have stopped. Everything here is a pure
//! function of its inputs: lists keep first-seen order, ties keep page order,
//! and no hashing order leaks into the output, so aggregating the same data
//! twice yields identical results.

use crate::extract::{
    CareersData, ContactData, ContactInfo, Ctas, ImageRef, Logo, PageRecord, PressMedia,
    SocialEmbed, StructuredData, VideoEmbed, Videos, VisualElements,
};
use crate::output::clean::{clean_page_buffer, clean_text};
use crate::output::result::{
    ColorRole, ColorUsageKind, CrawlResult, LogoSet, LogoType, PageSummary, PaletteColor,
    RankedLogo, ResultMetrics, ResultSource,
};
use crate::state::{CollectedData, CrawlMetrics};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::sync::LazyLock;

const MAX_HERO_SECTIONS: usize = 10;
const MAX_FAQS: usize = 30;
const MAX_PRODUCT_BULLETS: usize = 50;
const MAX_PRICING: usize = 30;
const MAX_DISCLAIMERS: usize = 20;
const MAX_BANNERS: usize = 15;
const MAX_TEAM_MEMBERS: usize = 20;
const MAX_CASE_STUDIES: usize = 15;
const MAX_EVENTS: usize = 15;
const MAX_GENERAL_FORMS: usize = 15;
const MAX_COLORS: usize = 10;
const MAX_IMAGES: usize = 100;
const MAX_ADS: usize = 20;
const MAX_LOGOS: usize = 20;

const MAX_CONTACT_FORMS: usize = 5;
const MAX_CONTACT_ITEMS: usize = 5;
const MAX_PRESS_ITEMS: usize = 20;
const MAX_AWARDS: usize = 10;
const MAX_JOBS: usize = 25;
const MAX_CULTURE_SECTIONS: usize = 10;
const MAX_JSON_LD: usize = 10;
const MAX_VIDEOS_PER_PROVIDER: usize = 10;
const MAX_CTAS: usize = 20;
const MAX_CTA_TEXTS: usize = 40;
const MAX_CAROUSELS: usize = 10;
const MAX_STICKY_ELEMENTS: usize = 10;

const DARK_LOGO_MARKERS: &[&str] = &["dark", "white", "inverse"];
const AD_MARKERS: &[&str] = &["banner", "promo", "campaign", "offer"];

static RGB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([\d.]+)\s*)?\)$")
        .expect("rgb pattern should compile")
});

/// Builds the final result from the collected data and metrics
///
/// # Arguments
///
/// * `data` - Every page record merged during the crawl
/// * `metrics` - Counters for the finished crawl
///
/// # Returns
///
/// A [`CrawlResult`] with the brand-level fields derived from all pages;
/// `success` is true when at least one page was extracted.
pub fn aggregate(data: &CollectedData, metrics: &CrawlMetrics) -> CrawlResult {
    let pages = &data.pages;
    let (images, ads) = images_and_ads(pages);

    let result = CrawlResult {
        success: metrics.pages_crawled > 0,
        source: ResultSource::Crawler,
        error: None,

        text: clean_page_buffer(&data.text),
        nav_text: clean_text(&data.nav_text),
        reviews_text: clean_text(&data.reviews_text),
        about_us_content: clean_text(&data.about_text),
        legal_footer_content: clean_text(&data.legal_text),

        hero_sections: dedupe_by(
            pages
                .iter()
                .filter_map(|p| p.hero_section.clone())
                .filter(|h| !h.is_empty()),
            MAX_HERO_SECTIONS,
            |h| Some((h.headline.clone(), h.subheadline.clone())),
        ),
        faqs: dedupe_by(
            pages.iter().flat_map(|p| p.faqs.iter().cloned()),
            MAX_FAQS,
            |f| non_empty(&f.question),
        ),
        product_bullets: dedupe_strings(
            pages.iter().flat_map(|p| p.product_bullets.iter()),
            MAX_PRODUCT_BULLETS,
        ),
        pricing_data: dedupe_by(
            pages.iter().flat_map(|p| p.pricing.iter().cloned()),
            MAX_PRICING,
            |p| Some(p.text.clone()),
        ),
        disclaimers: dedupe_strings(pages.iter().flat_map(|p| p.disclaimers.iter()), MAX_DISCLAIMERS),
        banners_carousels: dedupe_by(
            pages.iter().flat_map(|p| p.banners.iter().cloned()),
            MAX_BANNERS,
            |b| Some(b.text.clone()),
        ),
        social_embeds: social_embeds(pages),
        contact_data: contact_data(pages),
        team_members: dedupe_by(
            pages.iter().flat_map(|p| p.team_members.iter().cloned()),
            MAX_TEAM_MEMBERS,
            |m| non_empty(&m.name),
        ),
        press_media: press_media(pages),
        case_studies: dedupe_by(
            pages.iter().flat_map(|p| p.case_studies.iter().cloned()),
            MAX_CASE_STUDIES,
            |c| non_empty(&c.title),
        ),
        careers_data: careers_data(pages),
        events_data: dedupe_by(
            pages.iter().flat_map(|p| p.events_data.iter().cloned()),
            MAX_EVENTS,
            |e| non_empty(&e.title),
        ),
        structured_data: structured_data(pages),
        videos: videos(pages),
        ctas: ctas(pages),
        general_forms: dedupe_by(
            pages.iter().flat_map(|p| p.general_forms.iter().cloned()),
            MAX_GENERAL_FORMS,
            |f| {
                let names: Vec<String> = f.fields.iter().map(|field| field.name.clone()).collect();
                Some((f.action.clone(), f.method.clone(), f.form_type, names))
            },
        ),
        visual_elements: visual_elements(pages),

        char_count: data.text.chars().count(),
        pages_crawled: metrics.pages_crawled,

        logos: logos(pages),
        colors: palette(pages),
        images,
        ads,
        pages: pages.iter().map(page_summary).collect(),
        metrics: ResultMetrics::from(metrics),
    };

    tracing::debug!(
        pages = result.pages.len(),
        logos = result.logos.all.len(),
        colors = result.colors.len(),
        images = result.images.len(),
        "Aggregated crawl result"
    );

    result
}

/// Keeps the first item per key, up to `cap` items
///
/// Items whose key is `None` never collide with anything.
fn dedupe_by<T, K, I, F>(items: I, cap: usize, key: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= cap {
            break;
        }
        if let Some(k) = key(&item) {
            if !seen.insert(k) {
                continue;
            }
        }
        out.push(item);
    }
    out
}

fn dedupe_strings<'a, I>(items: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    dedupe_by(
        items.into_iter().filter(|s| !s.trim().is_empty()).cloned(),
        cap,
        |s| Some(s.clone()),
    )
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

fn page_summary(page: &PageRecord) -> PageSummary {
    PageSummary {
        url: page.url.clone(),
        title: page.title.clone(),
        page_type: page.page_type,
        depth: page.depth,
        char_count: page.text.chars().count(),
        validation_score: page.validation.score,
    }
}

/// Ranks logos by prominence, one entry per URL
///
/// A URL is dark if any of its instances anywhere on the site is marked
/// dark, white or inverse, even if its best-ranked instance is not.
fn logos(pages: &[PageRecord]) -> LogoSet {
    let mut all: Vec<&Logo> = pages.iter().flat_map(|p| p.logos.iter()).collect();

    let dark_urls: HashSet<&str> = pages
        .iter()
        .flat_map(|p| p.logos.iter())
        .filter(|l| contains_any(&format!("{} {}", l.classes, l.alt), DARK_LOGO_MARKERS))
        .map(|l| l.url.as_str())
        .collect();

    // stable: equal prominence keeps page order
    all.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));

    let ranked = dedupe_by(all, MAX_LOGOS, |l| Some(l.url.clone()));
    let ranked: Vec<RankedLogo> = ranked
        .into_iter()
        .map(|l| RankedLogo {
            url: l.url.clone(),
            alt: l.alt.clone(),
            classes: l.classes.clone(),
            prominence: l.prominence,
            logo_type: if dark_urls.contains(l.url.as_str()) {
                LogoType::Dark
            } else {
                LogoType::Light
            },
        })
        .collect();

    let first_of = |kind: LogoType| {
        ranked
            .iter()
            .find(|l| l.logo_type == kind)
            .map(|l| l.url.clone())
    };

    LogoSet {
        light: first_of(LogoType::Light),
        dark: first_of(LogoType::Dark),
        all: ranked,
    }
}

/// Builds the brand palette: CTA colours first, then backgrounds, then
/// stylesheet colours
fn palette(pages: &[PageRecord]) -> Vec<PaletteColor> {
    let candidates = pages
        .iter()
        .flat_map(|p| p.colors.cta.iter().map(|c| (c, ColorUsageKind::Cta)))
        .chain(
            pages
                .iter()
                .flat_map(|p| p.colors.background.iter().map(|c| (c, ColorUsageKind::Background))),
        )
        .chain(
            pages
                .iter()
                .flat_map(|p| p.colors.other.iter().map(|c| (c, ColorUsageKind::Stylesheet))),
        )
        .filter_map(|(raw, usage)| normalize_color(raw).map(|hex| (hex, usage)));

    dedupe_by(candidates, MAX_COLORS, |(hex, _)| Some(hex.clone()))
        .into_iter()
        .enumerate()
        .map(|(rank, (hex, usage))| PaletteColor {
            hex,
            role: ColorRole::for_rank(rank),
            usage,
        })
        .collect()
}

/// Converts a CSS colour to upper-case `#RRGGBB`
///
/// Accepts `#RGB`, `#RRGGBB` and `rgb()`/`rgba()`. Fully transparent and
/// unparseable values yield `None`.
pub fn normalize_color(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Some(hex) = raw.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let full = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_string(),
            _ => return None,
        };
        return Some(format!("#{}", full.to_uppercase()));
    }

    let caps = RGB.captures(raw)?;
    if let Some(alpha) = caps.get(4) {
        if alpha.as_str().parse::<f64>().ok()? == 0.0 {
            return None;
        }
    }
    let channel = |i: usize| -> Option<u8> {
        let value: u32 = caps.get(i)?.as_str().parse().ok()?;
        Some(value.min(255) as u8)
    };
    Some(format!(
        "#{:02X}{:02X}{:02X}",
        channel(1)?,
        channel(2)?,
        channel(3)?
    ))
}

/// Deduplicated images, and the subset that look like ad creatives
fn images_and_ads(pages: &[PageRecord]) -> (Vec<ImageRef>, Vec<ImageRef>) {
    let unique = dedupe_by(
        pages.iter().flat_map(|p| p.images.iter().cloned()),
        usize::MAX,
        |i| Some(i.url.clone()),
    );
    let ads = unique
        .iter()
        .filter(|i| contains_any(&i.classes, AD_MARKERS))
        .take(MAX_ADS)
        .cloned()
        .collect();
    let images = unique.into_iter().take(MAX_IMAGES).collect();
    (images, ads)
}

/// Sums per-platform counts; zero totals are omitted
fn social_embeds(pages: &[PageRecord]) -> Vec<SocialEmbed> {
    let mut merged: Vec<SocialEmbed> = Vec::new();
    for embed in pages.iter().flat_map(|p| p.social_embeds.iter()) {
        match merged.iter_mut().find(|m| m.platform == embed.platform) {
            Some(existing) => existing.count += embed.count,
            None => merged.push(embed.clone()),
        }
    }
    merged.retain(|e| e.count > 0);
    merged
}

fn contact_data(pages: &[PageRecord]) -> ContactData {
    let contacts = || pages.iter().map(|p| &p.contact_data);
    ContactData {
        forms: dedupe_by(
            contacts().flat_map(|c| c.forms.iter().cloned()),
            MAX_CONTACT_FORMS,
            |f| Some(f.fields.clone()),
        ),
        contact_info: ContactInfo {
            emails: dedupe_strings(
                contacts().flat_map(|c| c.contact_info.emails.iter()),
                MAX_CONTACT_ITEMS,
            ),
            phones: dedupe_strings(
                contacts().flat_map(|c| c.contact_info.phones.iter()),
                MAX_CONTACT_ITEMS,
            ),
            addresses: dedupe_strings(
                contacts().flat_map(|c| c.contact_info.addresses.iter()),
                MAX_CONTACT_ITEMS,
            ),
        },
    }
}

fn press_media(pages: &[PageRecord]) -> PressMedia {
    PressMedia {
        press_items: dedupe_by(
            pages.iter().flat_map(|p| p.press_media.press_items.iter().cloned()),
            MAX_PRESS_ITEMS,
            |i| non_empty(&i.headline),
        ),
        awards: dedupe_strings(
            pages.iter().flat_map(|p| p.press_media.awards.iter()),
            MAX_AWARDS,
        ),
    }
}

fn careers_data(pages: &[PageRecord]) -> CareersData {
    CareersData {
        job_listings: dedupe_by(
            pages.iter().flat_map(|p| p.careers_data.job_listings.iter().cloned()),
            MAX_JOBS,
            |j| Some((j.title.clone(), j.location.clone())),
        ),
        culture_sections: dedupe_strings(
            pages.iter().flat_map(|p| p.careers_data.culture_sections.iter()),
            MAX_CULTURE_SECTIONS,
        ),
    }
}

/// JSON-LD blocks are concatenated; every map keeps the first page's value
/// for each key
fn structured_data(pages: &[PageRecord]) -> StructuredData {
    let mut merged = StructuredData {
        json_ld: dedupe_by(
            pages.iter().flat_map(|p| p.structured_data.json_ld.iter().cloned()),
            MAX_JSON_LD,
            |v| Some(v.to_string()),
        ),
        ..Default::default()
    };

    for data in pages.iter().map(|p| &p.structured_data) {
        first_wins(&mut merged.open_graph, &data.open_graph);
        first_wins(&mut merged.twitter, &data.twitter);
        first_wins(&mut merged.meta_tags, &data.meta_tags);
        first_wins(&mut merged.schema_org, &data.schema_org);
    }
    merged
}

fn first_wins<V: Clone>(into: &mut BTreeMap<String, V>, from: &BTreeMap<String, V>) {
    for (key, value) in from {
        into.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn videos(pages: &[PageRecord]) -> Videos {
    let embed_key = |v: &VideoEmbed| {
        Some(if v.id.is_empty() {
            v.url.clone()
        } else {
            v.id.clone()
        })
    };

    let youtube = dedupe_by(
        pages.iter().flat_map(|p| p.videos.youtube.iter().cloned()),
        MAX_VIDEOS_PER_PROVIDER,
        embed_key,
    );
    let vimeo = dedupe_by(
        pages.iter().flat_map(|p| p.videos.vimeo.iter().cloned()),
        MAX_VIDEOS_PER_PROVIDER,
        embed_key,
    );
    let native = dedupe_by(
        pages.iter().flat_map(|p| p.videos.native.iter().cloned()),
        MAX_VIDEOS_PER_PROVIDER,
        |v| Some(v.src.clone()),
    );

    Videos {
        count: youtube.len() + vimeo.len() + native.len(),
        youtube,
        vimeo,
        native,
    }
}

fn ctas(pages: &[PageRecord]) -> Ctas {
    Ctas {
        primary: dedupe_by(
            pages.iter().flat_map(|p| p.ctas.primary.iter().cloned()),
            MAX_CTAS,
            |c| Some(c.text.clone()),
        ),
        secondary: dedupe_by(
            pages.iter().flat_map(|p| p.ctas.secondary.iter().cloned()),
            MAX_CTAS,
            |c| Some(c.text.clone()),
        ),
        all_text: dedupe_strings(pages.iter().flat_map(|p| p.ctas.all_text.iter()), MAX_CTA_TEXTS),
        count: pages.iter().map(|p| p.ctas.count).sum(),
    }
}

fn visual_elements(pages: &[PageRecord]) -> VisualElements {
    let visuals = || pages.iter().map(|p| &p.visual_elements);
    VisualElements {
        has_animations: visuals().any(|v| v.has_animations),
        has_parallax: visuals().any(|v| v.has_parallax),
        carousels: dedupe_by(
            visuals().flat_map(|v| v.carousels.iter().cloned()),
            MAX_CAROUSELS,
            |c| Some(c.clone()),
        ),
        sticky_elements: dedupe_by(
            visuals().flat_map(|v| v.sticky_elements.iter().cloned()),
            MAX_STICKY_ELEMENTS,
            |s| Some(s.clone()),
        ),
        interactive_count: visuals().map(|v| v.interactive_count).sum(),
    }
}
