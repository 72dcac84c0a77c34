//! Company-facing signal groups: contact details, team, press, case studies,
//! careers and events

use crate::extract::content::SENTENCE_BREAK;
use crate::extract::dom::{
    attr, body_text, first_in, inner_text, next_element_sibling, push_unique, sel, select_each,
    text_in, truncate_chars,
};
use crate::extract::types::{
    CareersData, CaseStudy, ContactData, ContactForm, Event, FormField, JobListing, PressItem,
    PressMedia, TeamMember,
};
use crate::extract::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

const MAX_EMAILS: usize = 5;
const MAX_PHONES: usize = 5;
const MAX_TEAM: usize = 20;
const BIO_CHARS: usize = 200;
const MAX_PRESS_ITEMS: usize = 15;
const MAX_AWARDS: usize = 10;
const MAX_CASE_STUDIES: usize = 10;
const MAX_CASE_METRICS: usize = 5;
const MAX_JOBS: usize = 20;
const MAX_CULTURE: usize = 5;
const CULTURE_CHARS: usize = 300;
const MAX_EVENTS: usize = 15;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
        .expect("email pattern should compile")
});

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.])?\(?\d{3}\)?[-.]?\d{3}[-.]?\d{4}")
        .expect("phone pattern should compile")
});

static METRIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+%|\d+x|\$[\d,]+|\d+k|\d+m)").expect("metric pattern should compile")
});

const AWARD_KEYWORDS: &[&str] = &["award", "winner", "recognized", "honor", "best", "top"];
const CULTURE_KEYWORDS: &[&str] = &["culture", "values", "mission", "vision", "perks", "benefits"];

/// Contact forms plus email addresses and phone numbers in the page text
pub fn contact_data(doc: &Html) -> Result<ContactData, ExtractError> {
    let forms_sel = sel("form")?;
    let mut data = ContactData::default();

    for form in doc.select(&forms_sel) {
        let fields: Vec<FormField> = form_fields(&form)?
            .into_iter()
            .filter(|f| !f.name.is_empty())
            .collect();
        if !fields.is_empty() {
            data.forms.push(ContactForm {
                field_count: fields.len(),
                fields,
            });
        }
    }

    let text = body_text(doc)?;
    for m in EMAIL_PATTERN.find_iter(&text) {
        push_unique(&mut data.contact_info.emails, m.as_str().to_string());
    }
    for m in PHONE_PATTERN.find_iter(&text) {
        push_unique(&mut data.contact_info.phones, m.as_str().to_string());
    }
    data.contact_info.emails.truncate(MAX_EMAILS);
    data.contact_info.phones.truncate(MAX_PHONES);

    Ok(data)
}

/// Describes the input controls of a form
///
/// The field type follows browser conventions: an `<input>` without a type is
/// `text`, a `<select>` is `select-one` or `select-multiple`.
pub fn form_fields(form: &ElementRef<'_>) -> Result<Vec<FormField>, ExtractError> {
    let controls = sel("input, textarea, select")?;
    let labels = sel("label")?;
    let mut fields = Vec::new();

    for field in form.select(&controls) {
        let field_type = match field.value().name() {
            "input" => {
                let t = attr(&field, "type").trim().to_lowercase();
                if t.is_empty() {
                    "text".to_string()
                } else {
                    t
                }
            }
            "select" if field.value().attr("multiple").is_some() => "select-multiple".to_string(),
            "select" => "select-one".to_string(),
            other => other.to_string(),
        };

        let name = ["name", "id", "placeholder"]
            .iter()
            .map(|a| attr(&field, a))
            .find(|v| !v.is_empty())
            .unwrap_or("")
            .to_string();

        let id = attr(&field, "id");
        let label = form
            .select(&labels)
            .find(|l| !id.is_empty() && attr(l, "for") == id)
            .or_else(|| field.ancestors().filter_map(ElementRef::wrap).find(|a| a.value().name() == "label"))
            .map(|l| inner_text(&l))
            .unwrap_or_default();

        fields.push(FormField {
            field_type,
            name,
            required: field.value().attr("required").is_some(),
            label,
        });
    }

    Ok(fields)
}

/// People cards: name, role and a short bio
pub fn team_members(doc: &Html) -> Result<Vec<TeamMember>, ExtractError> {
    let mut members = Vec::new();

    for card in select_each(
        doc,
        &[
            ".team-member",
            "[class*=\"team\"]",
            ".staff",
            "[class*=\"person\"]",
            "[class*=\"leader\"]",
            "[class*=\"employee\"]",
        ],
    )? {
        let name = first_in(&card, "h1, h2, h3, h4, .name, [class*=\"name\"]")?;
        let title = first_in(
            &card,
            ".title, [class*=\"title\"], [class*=\"role\"], [class*=\"position\"]",
        )?;
        if name.is_none() && title.is_none() {
            continue;
        }

        members.push(TeamMember {
            name: name.map(|e| inner_text(&e)).unwrap_or_default(),
            title: title.map(|e| inner_text(&e)).unwrap_or_default(),
            bio: truncate_chars(&text_in(&card, "p, .bio, [class*=\"bio\"]")?, BIO_CHARS),
        });
    }

    members.truncate(MAX_TEAM);
    Ok(members)
}

/// Press coverage items and award mentions
pub fn press_media(doc: &Html) -> Result<PressMedia, ExtractError> {
    let mut press = PressMedia::default();

    for item in select_each(
        doc,
        &[
            ".press",
            "[class*=\"press\"]",
            ".media",
            "[class*=\"media\"]",
            ".award",
            "[class*=\"award\"]",
            ".news-item",
            "[class*=\"news\"]",
        ],
    )? {
        let Some(headline) = first_in(&item, "h1, h2, h3, h4, a")? else {
            continue;
        };
        press.press_items.push(PressItem {
            headline: inner_text(&headline),
            date: text_in(&item, ".date, [class*=\"date\"], time")?,
            source: text_in(&item, ".source, [class*=\"source\"]")?,
        });
    }

    let text = body_text(doc)?;
    for sentence in SENTENCE_BREAK.split(&text) {
        let lower = sentence.to_lowercase();
        if AWARD_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            push_unique(&mut press.awards, sentence.trim().to_string());
        }
    }

    press.press_items.truncate(MAX_PRESS_ITEMS);
    press.awards.truncate(MAX_AWARDS);
    Ok(press)
}

/// Success stories and the quantified results they cite
pub fn case_studies(doc: &Html) -> Result<Vec<CaseStudy>, ExtractError> {
    let mut studies = Vec::new();

    for story in select_each(
        doc,
        &[
            ".case-study",
            "[class*=\"case\"]",
            ".success-story",
            "[class*=\"success\"]",
            ".customer-story",
            "[class*=\"story\"]",
        ],
    )? {
        let title = text_in(&story, "h1, h2, h3")?;
        let text = inner_text(&story);
        let metrics: Vec<String> = METRIC_PATTERN
            .find_iter(&text)
            .take(MAX_CASE_METRICS)
            .map(|m| m.as_str().to_string())
            .collect();

        if !title.is_empty() || !metrics.is_empty() {
            studies.push(CaseStudy { title, metrics });
        }
    }

    studies.truncate(MAX_CASE_STUDIES);
    Ok(studies)
}

/// Open positions and culture statements
pub fn careers_data(doc: &Html) -> Result<CareersData, ExtractError> {
    let mut careers = CareersData::default();

    for job in select_each(
        doc,
        &[
            ".job",
            "[class*=\"job\"]",
            ".position",
            "[class*=\"position\"]",
            ".opening",
            "[class*=\"opening\"]",
            ".career",
            "[class*=\"career\"]",
        ],
    )? {
        let title = text_in(&job, "h1, h2, h3, h4, .title, [class*=\"title\"]")?;
        if title.is_empty() {
            continue;
        }
        careers.job_listings.push(JobListing {
            title,
            location: text_in(&job, ".location, [class*=\"location\"]")?,
            job_type: text_in(&job, ".type, [class*=\"type\"]")?,
        });
    }

    let headings = sel("h1, h2, h3, h4")?;
    for heading in doc.select(&headings) {
        let heading_text = inner_text(&heading).to_lowercase();
        if !CULTURE_KEYWORDS.iter().any(|kw| heading_text.contains(kw)) {
            continue;
        }
        if let Some(next) = next_element_sibling(&heading) {
            careers
                .culture_sections
                .push(truncate_chars(&inner_text(&next), CULTURE_CHARS));
        }
    }

    careers.job_listings.truncate(MAX_JOBS);
    careers.culture_sections.truncate(MAX_CULTURE);
    Ok(careers)
}

/// Events, webinars and conferences with date and venue
pub fn events(doc: &Html) -> Result<Vec<Event>, ExtractError> {
    let mut events = Vec::new();

    for event in select_each(
        doc,
        &[
            ".event",
            "[class*=\"event\"]",
            ".webinar",
            "[class*=\"webinar\"]",
            ".conference",
            "[class*=\"conference\"]",
        ],
    )? {
        let title = text_in(&event, "h1, h2, h3, h4, .title, [class*=\"title\"]")?;
        if title.is_empty() {
            continue;
        }
        events.push(Event {
            title,
            date: text_in(&event, ".date, [class*=\"date\"], time")?,
            location: text_in(
                &event,
                ".location, [class*=\"location\"], [class*=\"venue\"]",
            )?,
        });
    }

    events.truncate(MAX_EVENTS);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_data() {
        let doc = Html::parse_document(
            r#"<body>
                <form action="/contact">
                    <label for="email">Email</label>
                    <input id="email" name="email" type="email" required>
                    <textarea name="message"></textarea>
                    <input type="submit">
                </form>
                <p>Write to hello@brand.com or support@brand.com, call 555-123-4567.</p>
                <p>Again: hello@brand.com</p>
            </body>"#,
        );
        let data = contact_data(&doc).unwrap();

        assert_eq!(data.forms.len(), 1);
        assert_eq!(data.forms[0].field_count, 2);
        assert_eq!(data.forms[0].fields[0].field_type, "email");
        assert!(data.forms[0].fields[0].required);
        assert_eq!(data.forms[0].fields[0].label, "Email");
        assert_eq!(data.forms[0].fields[1].field_type, "textarea");

        assert_eq!(
            data.contact_info.emails,
            vec!["hello@brand.com".to_string(), "support@brand.com".to_string()]
        );
        assert_eq!(data.contact_info.phones, vec!["555-123-4567".to_string()]);
    }

    #[test]
    fn test_form_field_defaults() {
        let doc = Html::parse_document(
            r#"<body><form><input placeholder="Search"><select name="size" multiple></select></form></body>"#,
        );
        let form = doc.select(&sel("form").unwrap()).next().unwrap();
        let fields = form_fields(&form).unwrap();
        assert_eq!(fields[0].field_type, "text");
        assert_eq!(fields[0].name, "Search");
        assert_eq!(fields[1].field_type, "select-multiple");
    }

    #[test]
    fn test_team_members() {
        let doc = Html::parse_document(
            r#"<body>
                <div class="team-member"><h3>Ada Lovelace</h3><span class="role">Founder</span><p>Started the brand in 2015.</p></div>
                <div class="team-member"><p>No name or role here</p></div>
            </body>"#,
        );
        let team = team_members(&doc).unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].name, "Ada Lovelace");
        assert_eq!(team[0].title, "Founder");
        assert_eq!(team[0].bio, "Started the brand in 2015.");
    }

    #[test]
    fn test_press_media() {
        let doc = Html::parse_document(
            r#"<body>
                <p>Winner of the 2023 Clean Beauty Award. We ship worldwide.</p>
                <div class="press-item"><h3>Featured in Vogue</h3><time>May 2024</time><span class="source">Vogue</span></div>
            </body>"#,
        );
        let press = press_media(&doc).unwrap();
        assert_eq!(press.press_items[0].headline, "Featured in Vogue");
        assert_eq!(press.press_items[0].date, "May 2024");
        assert_eq!(press.press_items[0].source, "Vogue");
        assert_eq!(press.awards, vec!["Winner of the 2023 Clean Beauty Award".to_string()]);
    }

    #[test]
    fn test_case_study_metrics() {
        let doc = Html::parse_document(
            r#"<body><div class="case-study"><h2>Acme grew fast</h2><p>Revenue up 45% and 3x more leads, saving $12,000.</p></div></body>"#,
        );
        let studies = case_studies(&doc).unwrap();
        assert_eq!(studies.len(), 1);
        assert_eq!(studies[0].title, "Acme grew fast");
        assert_eq!(studies[0].metrics, vec!["45%", "3x", "$12,000"]);
    }

    #[test]
    fn test_careers_data() {
        let doc = Html::parse_document(
            r#"<body>
                <div class="job-card"><h3>Chemist</h3><span class="location">Austin</span><span class="type">Full-time</span></div>
                <h2>Our Culture</h2><p>We value curiosity.</p>
            </body>"#,
        );
        let careers = careers_data(&doc).unwrap();
        assert_eq!(careers.job_listings.len(), 1);
        assert_eq!(careers.job_listings[0].title, "Chemist");
        assert_eq!(careers.job_listings[0].location, "Austin");
        assert_eq!(careers.job_listings[0].job_type, "Full-time");
        assert_eq!(careers.culture_sections, vec!["We value curiosity.".to_string()]);
    }

    #[test]
    fn test_events() {
        let doc = Html::parse_document(
            r#"<body><div class="event"><h3>Spring Launch</h3><span class="date">April 3</span><span class="venue">NYC</span></div></body>"#,
        );
        let events = events(&doc).unwrap();
        assert_eq!(
            events,
            vec![Event {
                title: "Spring Launch".to_string(),
                date: "April 3".to_string(),
                location: "NYC".to_string(),
            }]
        );
    }
}
