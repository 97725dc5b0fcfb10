use chrono::{DateTime, Timelike};
use chrono_tz::Tz;

use crate::config::DigestConfig;
use crate::scrape::Headline;

/// Fixed digest categories, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    EnergyOil,
    Construction,
    Tenders,
    Technology,
    HeavyEquipment,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::EnergyOil,
        Category::Construction,
        Category::Tenders,
        Category::Technology,
        Category::HeavyEquipment,
        Category::Other,
    ];

    /// Bucket a headline by keyword match on the lowercased title.
    /// First match wins; equipment is checked before technology so that
    /// machinery news lands in its own section.
    pub fn classify(title: &str) -> Category {
        const ENERGY: &[&str] = &["oil", "gas", "energy", "ongc"];
        const CONSTRUCTION: &[&str] = &["construction", "infrastructure", "bridge", "metro"];
        const TENDERS: &[&str] = &["tender", "bid", "contract"];
        const EQUIPMENT: &[&str] = &[
            "crane",
            "loader",
            "excavator",
            "backhoe",
            "bulldozer",
            "heavy equipment",
            "jcb",
            "construction machine",
        ];
        const TECH: &[&str] = &["technology", "digital", "ai"];

        let title = title.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| title.contains(k));

        if matches(ENERGY) {
            Category::EnergyOil
        } else if matches(CONSTRUCTION) {
            Category::Construction
        } else if matches(TENDERS) {
            Category::Tenders
        } else if matches(EQUIPMENT) {
            Category::HeavyEquipment
        } else if matches(TECH) {
            Category::Technology
        } else {
            Category::Other
        }
    }

    fn position(self) -> usize {
        match self {
            Category::EnergyOil => 0,
            Category::Construction => 1,
            Category::Tenders => 2,
            Category::Technology => 3,
            Category::HeavyEquipment => 4,
            Category::Other => 5,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::EnergyOil => "Energy & Oil",
            Category::Construction => "Construction & Infrastructure",
            Category::Tenders => "Tenders & Contracts",
            Category::Technology => "Technology & Innovation",
            Category::HeavyEquipment => "Heavy Equipment",
            Category::Other => "Other News",
        };
        write!(f, "{}", name)
    }
}

/// Headlines grouped per category, keeping Category::ALL order.
pub fn categorize(headlines: &[Headline]) -> Vec<(Category, Vec<Headline>)> {
    let mut buckets: Vec<(Category, Vec<Headline>)> = Category::ALL
        .iter()
        .map(|category| (*category, Vec::new()))
        .collect();
    for headline in headlines {
        let idx = Category::classify(&headline.title).position();
        buckets[idx].1.push(headline.clone());
    }
    buckets
}

/// "Good Morning ..." before local noon, "Good Evening ..." after.
pub fn greeting(now: DateTime<Tz>, recipient: &str) -> String {
    if now.hour() < 12 {
        format!("Good Morning {}", recipient)
    } else {
        format!("Good Evening {}", recipient)
    }
}

fn headline_roster(categorized: &[(Category, Vec<Headline>)]) -> (String, usize) {
    let mut text = String::new();
    let mut total = 0;
    for (category, items) in categorized {
        if items.is_empty() {
            continue;
        }
        text.push_str(&format!("\n{}:\n", category));
        for headline in items {
            text.push_str(&format!("- {} ({})\n", headline.title, headline.source));
            total += 1;
        }
    }
    if text.trim().is_empty() {
        text = "No infrastructure news available.".to_string();
    }
    (text, total)
}

/// The summarization prompt sent to Gemini.
pub fn build_prompt(
    categorized: &[(Category, Vec<Headline>)],
    now: DateTime<Tz>,
    config: &DigestConfig,
) -> String {
    let (headlines_text, total) = headline_roster(categorized);
    format!(
        "{greeting}! \u{1F4C8}\n{date}\n\n\
         Here are today's top Infrastructure Headlines ({total} total):\n\
         {headlines_text}\n\n\
         Now write a Telegram-friendly summary using the following rules:\n\
         - Use only <b> and <i> HTML tags.\n\
         - For each category (like Energy & Oil, Heavy Equipment, etc.), summarize in 2-3 impactful sentences.\n\
         - Include specific company names, numbers, and regions.\n\
         - Mention the source name (e.g., ET Infra), but do not hyperlink it.\n\
         - Make a separate section for <b>Heavy Equipment</b> updates (like cranes, excavators, machinery).\n\
         - End with: {signature}",
        greeting = greeting(now, &config.recipient),
        date = now.format("%d %B %Y"),
        signature = config.signature,
    )
}

/// Locally rendered digest used whenever Gemini fails.
pub fn fallback_digest(
    categorized: &[(Category, Vec<Headline>)],
    now: DateTime<Tz>,
    config: &DigestConfig,
) -> String {
    let mut digest = format!(
        "<b>{}! \u{1F4C8}</b>\n{}\n\n<b>Daily Infrastructure Industry Digest</b>\n\n",
        greeting(now, &config.recipient),
        now.format("%d %B %Y"),
    );

    let mut any = false;
    for (category, items) in categorized {
        if items.is_empty() {
            continue;
        }
        any = true;
        let mut sources: Vec<&str> = Vec::new();
        for headline in items {
            if !sources.contains(&headline.source.as_str()) {
                sources.push(&headline.source);
            }
        }
        sources.truncate(2);
        digest.push_str(&format!(
            "<b>{}:</b>\n{} key updates from {}.\n\n",
            category,
            items.len(),
            sources.join(", "),
        ));
    }

    if !any {
        digest.push_str("No infrastructure news today.\n\n");
    }

    digest.push_str(&config.signature);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn headline(title: &str, source: &str) -> Headline {
        Headline {
            title: title.to_string(),
            source: source.to_string(),
            url: "https://example.com".to_string(),
        }
    }

    fn at_hour(hour: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Kolkata
            .with_ymd_and_hms(2026, 8, 29, hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn classify_keyword_buckets() {
        assert_eq!(Category::classify("ONGC expands drilling"), Category::EnergyOil);
        assert_eq!(Category::classify("New metro corridor opens"), Category::Construction);
        assert_eq!(Category::classify("Tender floated for highway"), Category::Tenders);
        assert_eq!(Category::classify("Crane fleet expansion"), Category::HeavyEquipment);
        assert_eq!(Category::classify("Digital twin platform launched"), Category::Technology);
        assert_eq!(Category::classify("Quarterly results announced"), Category::Other);
    }

    #[test]
    fn classify_first_match_wins() {
        // energy beats construction
        assert_eq!(
            Category::classify("Oil pipeline construction begins"),
            Category::EnergyOil
        );
        // equipment is checked before technology
        assert_eq!(
            Category::classify("AI-assisted excavator unveiled"),
            Category::HeavyEquipment
        );
    }

    #[test]
    fn categorize_keeps_presentation_order() {
        let headlines = vec![
            headline("Quarterly results announced", "ET Infra"),
            headline("Gas find off the coast", "ONGC"),
        ];
        let categorized = categorize(&headlines);
        assert_eq!(categorized.len(), 6);
        assert_eq!(categorized[0].0, Category::EnergyOil);
        assert_eq!(categorized[0].1.len(), 1);
        assert_eq!(categorized[5].0, Category::Other);
        assert_eq!(categorized[5].1.len(), 1);
    }

    #[test]
    fn greeting_flips_at_noon() {
        assert_eq!(greeting(at_hour(8), "Mr. X"), "Good Morning Mr. X");
        assert_eq!(greeting(at_hour(12), "Mr. X"), "Good Evening Mr. X");
        assert_eq!(greeting(at_hour(19), "Mr. X"), "Good Evening Mr. X");
    }

    #[test]
    fn prompt_lists_headlines_and_total() {
        let categorized = categorize(&[
            headline("Gas find off the coast", "ONGC"),
            headline("Crane fleet expansion", "BEML"),
        ]);
        let prompt = build_prompt(&categorized, at_hour(8), &DigestConfig::default());
        assert!(prompt.starts_with("Good Morning Mr. Keshav Agarwal"));
        assert!(prompt.contains("(2 total)"));
        assert!(prompt.contains("- Gas find off the coast (ONGC)"));
        assert!(prompt.contains("Energy & Oil:"));
        assert!(prompt.ends_with("\u{1F680} Stay ahead with CD Jindal AI Assistant"));
    }

    #[test]
    fn prompt_handles_empty_day() {
        let prompt = build_prompt(&categorize(&[]), at_hour(8), &DigestConfig::default());
        assert!(prompt.contains("(0 total)"));
        assert!(prompt.contains("No infrastructure news available."));
    }

    #[test]
    fn fallback_counts_and_sources() {
        let categorized = categorize(&[
            headline("Gas find off the coast", "ONGC"),
            headline("Oil prices climb", "ET Infra"),
            headline("Energy summit scheduled", "ET Infra"),
        ]);
        let digest = fallback_digest(&categorized, at_hour(19), &DigestConfig::default());
        assert!(digest.starts_with("<b>Good Evening Mr. Keshav Agarwal"));
        assert!(digest.contains("<b>Energy & Oil:</b>\n3 key updates from ONGC, ET Infra."));
        assert!(digest.ends_with("\u{1F680} Stay ahead with CD Jindal AI Assistant"));
    }

    #[test]
    fn fallback_empty_day() {
        let digest = fallback_digest(&categorize(&[]), at_hour(8), &DigestConfig::default());
        assert!(digest.contains("No infrastructure news today."));
    }
}
