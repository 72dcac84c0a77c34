//! Typed signal groups produced by the page extractor
//!
//! Every group has an empty `Default`, which is also what a group degrades to
//! when its extraction fails.

use crate::extract::PageType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One successfully extracted page
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub title: String,
    pub page_type: PageType,
    pub text: String,
    pub nav_text: String,
    pub reviews_text: String,
    pub hero_section: Option<HeroSection>,
    pub legal_footer: String,
    pub faqs: Vec<Faq>,
    pub product_bullets: Vec<String>,
    pub pricing: Vec<PriceEntry>,
    pub disclaimers: Vec<String>,
    pub banners: Vec<Banner>,
    pub social_embeds: Vec<SocialEmbed>,
    pub contact_data: ContactData,
    pub team_members: Vec<TeamMember>,
    pub press_media: PressMedia,
    pub case_studies: Vec<CaseStudy>,
    pub careers_data: CareersData,
    pub events_data: Vec<Event>,
    pub structured_data: StructuredData,
    pub videos: Videos,
    pub ctas: Ctas,
    pub general_forms: Vec<GeneralForm>,
    pub visual_elements: VisualElements,
    pub logos: Vec<Logo>,
    pub colors: ColorUsage,
    pub images: Vec<ImageRef>,
    pub links: Vec<Link>,
    pub validation: Validation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroSection {
    pub headline: String,
    pub subheadline: String,
    pub cta_text: String,
}

impl HeroSection {
    pub fn is_empty(&self) -> bool {
        self.headline.is_empty() && self.subheadline.is_empty() && self.cta_text.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// A price found in an element whose class marks it as pricing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub text: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub text: String,
    pub word_count: usize,
    pub char_count: usize,
}

/// Number of references to one social platform on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialEmbed {
    pub platform: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub fields: Vec<FormField>,
    pub field_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub forms: Vec<ContactForm>,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub title: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressItem {
    pub headline: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressMedia {
    pub press_items: Vec<PressItem>,
    pub awards: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareersData {
    pub job_listings: Vec<JobListing>,
    pub culture_sections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub date: String,
    pub location: String,
}

/// Machine-readable page metadata
///
/// Maps are ordered so merged output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    pub json_ld: Vec<serde_json::Value>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter: BTreeMap<String, String>,
    pub meta_tags: BTreeMap<String, String>,
    pub schema_org: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEmbed {
    pub url: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVideo {
    pub src: String,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Videos {
    pub youtube: Vec<VideoEmbed>,
    pub vimeo: Vec<VideoEmbed>,
    pub native: Vec<NativeVideo>,
    pub count: usize,
}

/// How a call-to-action was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaKind {
    Primary,
    Secondary,
    /// No text pattern matched but the element is styled as a primary button
    InferredPrimary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cta {
    pub text: String,
    pub classes: String,
    #[serde(rename = "type")]
    pub kind: CtaKind,
    pub is_button: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ctas {
    pub primary: Vec<Cta>,
    pub secondary: Vec<Cta>,
    pub all_text: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Newsletter,
    Contact,
    Search,
    Login,
    Registration,
    #[default]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralForm {
    pub index: usize,
    pub action: String,
    pub method: String,
    pub fields: Vec<FormField>,
    pub field_types: BTreeMap<String, usize>,
    pub has_submit: bool,
    pub form_type: FormType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Carousel {
    pub classes: String,
    pub slide_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StickyElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub classes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualElements {
    pub has_animations: bool,
    pub has_parallax: bool,
    pub carousels: Vec<Carousel>,
    pub sticky_elements: Vec<StickyElement>,
    pub interactive_count: usize,
}

/// A logo candidate ranked by prominence
///
/// `prominence` is the rendered area plus a fixed bonus when the logo sits
/// inside a header or navigation block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    pub alt: String,
    pub classes: String,
    pub prominence: f64,
    pub width: f64,
    pub height: f64,
}

/// Colors grouped by where the page uses them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorUsage {
    pub cta: Vec<String>,
    pub background: Vec<String>,
    pub text: Vec<String>,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
    pub classes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// Coarse quality checks on an extracted page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub has_text: bool,
    pub has_title: bool,
    pub has_nav: bool,
    pub has_page_type: bool,
    pub has_links: bool,
    pub score: f64,
    pub is_valid: bool,
}

impl Validation {
    /// Minimum fraction of passing checks for a page to count as valid
    pub const VALID_THRESHOLD: f64 = 0.6;

    pub fn of(record: &PageRecord) -> Self {
        let checks = [
            record.text.chars().count() > 100,
            !record.title.is_empty(),
            record.nav_text.chars().count() > 10,
            !record.page_type.as_str().is_empty(),
            !record.links.is_empty(),
        ];
        let passed = checks.iter().filter(|c| **c).count();
        let score = passed as f64 / checks.len() as f64;

        Self {
            has_text: checks[0],
            has_title: checks[1],
            has_nav: checks[2],
            has_page_type: checks[3],
            has_links: checks[4],
            score,
            is_valid: score >= Self::VALID_THRESHOLD,
        }
    }
}
