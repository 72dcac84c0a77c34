//! The final crawl result handed to brand analysis

use crate::extract::{
    Banner, CareersData, CaseStudy, ContactData, Ctas, Event, Faq, GeneralForm, HeroSection,
    ImageRef, PageType, PressMedia, PriceEntry, SocialEmbed, StructuredData, TeamMember, Videos,
    VisualElements,
};
use crate::state::CrawlMetrics;
use serde::Serialize;

/// Which path produced a result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    #[default]
    Crawler,
    Fallback,
}

/// Deduplicated, capped projection of everything a crawl collected
///
/// Every field is always present so consumers can branch on `success` alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlResult {
    /// True if at least one page was crawled
    pub success: bool,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub text: String,
    pub nav_text: String,
    pub reviews_text: String,
    pub about_us_content: String,
    pub hero_sections: Vec<HeroSection>,
    pub legal_footer_content: String,
    pub faqs: Vec<Faq>,
    pub product_bullets: Vec<String>,
    pub pricing_data: Vec<PriceEntry>,
    pub disclaimers: Vec<String>,
    pub banners_carousels: Vec<Banner>,
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

    /// Length of the raw crawled text before cleaning
    pub char_count: usize,
    pub pages_crawled: usize,

    pub logos: LogoSet,
    pub colors: Vec<PaletteColor>,
    pub images: Vec<ImageRef>,
    pub ads: Vec<ImageRef>,
    pub pages: Vec<PageSummary>,
    pub metrics: ResultMetrics,
}

impl CrawlResult {
    /// An empty, unsuccessful result carrying `error`
    pub fn failed(source: ResultSource, error: impl Into<String>) -> Self {
        Self {
            success: false,
            source,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Logo rendering variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoType {
    /// For use on light backgrounds
    Light,
    /// Light-coloured artwork for dark backgrounds
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLogo {
    pub url: String,
    pub alt: String,
    pub classes: String,
    pub prominence: f64,
    #[serde(rename = "type")]
    pub logo_type: LogoType,
}

/// Ranked logos plus the best candidate of each type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogoSet {
    pub light: Option<String>,
    pub dark: Option<String>,
    pub all: Vec<RankedLogo>,
}

/// Position of a colour in the brand palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRole {
    Primary,
    Secondary,
    Accent,
    Functional,
    Supporting,
}

impl ColorRole {
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Primary,
            1 => Self::Secondary,
            2 => Self::Accent,
            3 => Self::Functional,
            _ => Self::Supporting,
        }
    }
}

/// Where a palette colour was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorUsageKind {
    Cta,
    Background,
    Stylesheet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteColor {
    /// Upper-case `#RRGGBB`
    pub hex: String,
    pub role: ColorRole,
    pub usage: ColorUsageKind,
}

/// One fetched page, for auditing what the crawl visited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub page_type: PageType,
    pub depth: u32,
    pub char_count: usize,
    pub validation_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultMetrics {
    #[serde(flatten)]
    pub crawl: CrawlMetrics,
    pub avg_page_load_time: f64,
}

impl From<&CrawlMetrics> for ResultMetrics {
    fn from(metrics: &CrawlMetrics) -> Self {
        Self {
            crawl: metrics.clone(),
            avg_page_load_time: metrics.avg_page_load_time(),
        }
    }
}
