//! Per-page signal extraction
//!
//! [`PageExtractor`] turns one loaded HTML document into a [`PageRecord`].
//! Every signal group runs in isolation: a group that fails or panics is
//! logged and left at its default value, so a single odd page element never
//! costs the rest of the record.

mod assets;
mod classify;
mod content;
pub(crate) mod dom;
mod metadata;
mod people;
mod types;

pub use classify::PageType;
pub use content::parse_price;
pub use metadata::classify_form;
pub use types::*;

use scraper::Html;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use url::Url;

/// Failure inside a single signal group
///
/// Never escapes [`PageExtractor::extract`]; the group degrades instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction panicked: {0}")]
    Panicked(String),
}

/// Injected failure used to exercise group isolation
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
enum Fault {
    Error,
    Panic,
}

/// Extracts [`PageRecord`]s for pages of one crawl
#[derive(Debug, Clone)]
pub struct PageExtractor {
    root: Url,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl PageExtractor {
    /// Creates an extractor for a crawl rooted at `root`
    ///
    /// The root is used to recognize the home page during classification.
    pub fn new(root: Url) -> Self {
        Self {
            root,
            #[cfg(test)]
            fault: None,
        }
    }

    /// Extracts every signal group from `html`, fetched from `url` at `depth`
    pub fn extract(&self, html: &str, url: &Url, depth: u32) -> PageRecord {
        self.extract_document(html, url, url, depth)
    }

    /// Like [`extract`](Self::extract) for a page whose document ended up at
    /// `document_url`, usually after a redirect
    ///
    /// The record keeps `url`; relative links, images and form actions
    /// resolve against `document_url` or the page's `<base href>`, the way a
    /// browser resolves them.
    pub fn extract_document(&self, html: &str, url: &Url, document_url: &Url, depth: u32) -> PageRecord {
        let doc = Html::parse_document(html);
        let base = self
            .guarded("base", url, || dom::base_href(&doc, document_url))
            .unwrap_or_else(|| document_url.clone());
        let base = &base;

        let title = self.guarded("title", url, || page_title(&doc));
        let page_type = PageType::classify(url, &title, &self.root);

        let mut record = PageRecord {
            url: url.to_string(),
            depth,
            title,
            page_type,
            text: self.guarded("text", url, || content::main_text(&doc)),
            nav_text: self.guarded("nav_text", url, || content::nav_text(&doc)),
            reviews_text: self.guarded("reviews_text", url, || content::reviews_text(&doc)),
            legal_footer: self.guarded("legal_footer", url, || content::legal_footer(&doc)),
            pricing: self.guarded("pricing", url, || content::pricing(&doc)),
            disclaimers: self.guarded("disclaimers", url, || content::disclaimers(&doc)),
            banners: self.guarded("banners", url, || content::banners(&doc)),
            social_embeds: self.guarded("social_embeds", url, || metadata::social_embeds(&doc)),
            structured_data: self.guarded("structured_data", url, || {
                metadata::structured_data(&doc)
            }),
            videos: self.guarded("videos", url, || metadata::videos(&doc, base)),
            ctas: self.guarded("ctas", url, || metadata::ctas(&doc)),
            general_forms: self.guarded("general_forms", url, || {
                metadata::general_forms(&doc, base)
            }),
            visual_elements: self.guarded("visual_elements", url, || {
                metadata::visual_elements(&doc)
            }),
            logos: self.guarded("logos", url, || assets::logos(&doc, base)),
            colors: self.guarded("colors", url, || assets::colors(&doc)),
            images: self.guarded("images", url, || assets::images(&doc, base)),
            links: self.guarded("links", url, || assets::links(&doc, base)),
            ..Default::default()
        };

        if page_type.wants_hero() {
            record.hero_section = self.guarded("hero_section", url, || content::hero_section(&doc));
        }
        if page_type.wants_faqs() {
            record.faqs = self.guarded("faqs", url, || content::faqs(&doc));
        }
        if page_type.wants_product_bullets() {
            record.product_bullets =
                self.guarded("product_bullets", url, || content::product_bullets(&doc));
        }
        if page_type.wants_contact() {
            record.contact_data = self.guarded("contact_data", url, || people::contact_data(&doc));
        }
        if page_type.wants_team() {
            record.team_members = self.guarded("team_members", url, || people::team_members(&doc));
        }
        if page_type.wants_press() {
            record.press_media = self.guarded("press_media", url, || people::press_media(&doc));
        }
        if page_type.wants_case_studies() {
            record.case_studies = self.guarded("case_studies", url, || people::case_studies(&doc));
        }
        if page_type.wants_careers() {
            record.careers_data = self.guarded("careers_data", url, || people::careers_data(&doc));
        }
        if page_type.wants_events() {
            record.events_data = self.guarded("events_data", url, || people::events(&doc));
        }

        record.validation = Validation::of(&record);
        tracing::debug!(
            url = %url,
            page_type = %page_type,
            chars = record.text.len(),
            links = record.links.len(),
            score = record.validation.score,
            "Extracted page"
        );
        record
    }

    /// Runs one signal group, substituting the default on error or panic
    fn guarded<T, F>(&self, group: &'static str, url: &Url, f: F) -> T
    where
        T: Default,
        F: FnOnce() -> Result<T, ExtractError>,
    {
        #[cfg(test)]
        let f = {
            let fault = self.fault;
            move || match fault {
                Some(Fault::Error) => Err(ExtractError::Selector(format!("injected in {}", group))),
                Some(Fault::Panic) => panic!("injected panic in {}", group),
                None => f(),
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractError::Panicked(message))
        });

        match outcome {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(url = %url, group, error = %e, "Signal group failed, using default");
                T::default()
            }
        }
    }
}

/// The document `<title>`, whitespace-collapsed
fn page_title(doc: &Html) -> Result<String, ExtractError> {
    let title = dom::sel("title")?;
    Ok(doc
        .select(&title)
        .next()
        .map(|t| dom::collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default())
}
