//! Page type classification from URL and title keywords
//!
//! The page type decides which signal groups are worth extracting and how
//! valuable links discovered on the page are.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Coarse category of a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    Legal,
    About,
    Contact,
    Team,
    Press,
    CaseStudy,
    Careers,
    Events,
    Faq,
    Pricing,
    Blog,
    Product,
    Collection,
    Reviews,
    Home,
    #[default]
    General,
}

/// Ordered keyword rules; the first rule with a matching keyword wins
///
/// Order is significant: a privacy page linked from "about" is still legal,
/// and a product FAQ is an FAQ page.
const RULES: &[(&[&str], PageType)] = &[
    (&["privacy", "terms", "legal", "cookie"], PageType::Legal),
    (&["about", "our-story", "mission"], PageType::About),
    (&["contact", "get-in-touch", "reach-us"], PageType::Contact),
    (&["team", "leadership", "our-team", "people"], PageType::Team),
    (&["press", "media", "newsroom", "in-the-news"], PageType::Press),
    (&["case-stud", "success-stor", "customer-stor"], PageType::CaseStudy),
    (&["career", "job", "join-us", "hiring"], PageType::Careers),
    (&["event", "webinar", "conference", "workshop"], PageType::Events),
    (&["faq", "help", "support"], PageType::Faq),
    (&["pricing", "plans", "price"], PageType::Pricing),
    (&["blog", "article", "post", "news"], PageType::Blog),
    (&["product", "item", "shop"], PageType::Product),
    (&["collection", "category", "catalog"], PageType::Collection),
    (&["review", "testimonial", "feedback"], PageType::Reviews),
];

impl PageType {
    /// Classifies a page from its URL path and title
    ///
    /// Matching is a case-insensitive substring test. Only the path is
    /// inspected so a brand's domain name cannot make every page match.
    /// Pages matching no rule are `Home` when they are the crawl root or
    /// their path mentions "home"/"index", otherwise `General`.
    pub fn classify(url: &Url, title: &str, root: &Url) -> Self {
        let path = url.path().to_lowercase();
        let title = title.to_lowercase();

        for (keywords, page_type) in RULES {
            if keywords
                .iter()
                .any(|kw| path.contains(kw) || title.contains(kw))
            {
                return *page_type;
            }
        }

        if is_same_page(url, root) || path.contains("home") || path.contains("index") {
            return Self::Home;
        }

        Self::General
    }

    /// Crawl value of a page of this type (0-100)
    pub fn value_score(&self) -> u32 {
        match self {
            Self::Home => 100,
            Self::About => 95,
            Self::Reviews => 90,
            Self::Product => 85,
            Self::Pricing => 80,
            Self::Faq => 75,
            Self::Team | Self::Press => 70,
            Self::CaseStudy => 65,
            Self::Contact => 60,
            Self::Careers => 55,
            Self::Events => 50,
            Self::Blog => 45,
            Self::Collection => 40,
            Self::General => 30,
            Self::Legal => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::About => "about",
            Self::Contact => "contact",
            Self::Team => "team",
            Self::Press => "press",
            Self::CaseStudy => "case-study",
            Self::Careers => "careers",
            Self::Events => "events",
            Self::Faq => "faq",
            Self::Pricing => "pricing",
            Self::Blog => "blog",
            Self::Product => "product",
            Self::Collection => "collection",
            Self::Reviews => "reviews",
            Self::Home => "home",
            Self::General => "general",
        }
    }

    // Signal groups that are only worth extracting on some page types.
    // Groups not listed here run on every page.

    pub fn wants_hero(&self) -> bool {
        matches!(self, Self::Home | Self::General)
    }

    pub fn wants_faqs(&self) -> bool {
        matches!(self, Self::Faq | Self::Product | Self::Home)
    }

    pub fn wants_product_bullets(&self) -> bool {
        matches!(self, Self::Product)
    }

    pub fn wants_contact(&self) -> bool {
        matches!(self, Self::Contact | Self::General)
    }

    pub fn wants_team(&self) -> bool {
        matches!(self, Self::Team | Self::About | Self::General)
    }

    pub fn wants_press(&self) -> bool {
        matches!(self, Self::Press | Self::Blog | Self::General)
    }

    pub fn wants_case_studies(&self) -> bool {
        matches!(self, Self::CaseStudy | Self::Blog | Self::General)
    }

    pub fn wants_careers(&self) -> bool {
        matches!(self, Self::Careers | Self::General)
    }

    pub fn wants_events(&self) -> bool {
        matches!(self, Self::Events | Self::General)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_same_page(url: &Url, root: &Url) -> bool {
    url.host_str() == root.host_str()
        && url.port_or_known_default() == root.port_or_known_default()
        && url.path().trim_end_matches('/') == root.path().trim_end_matches('/')
}
