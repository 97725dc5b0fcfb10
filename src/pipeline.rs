use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use teloxide::types::ChatId;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{Config, Secrets};
use crate::digest;
use crate::llm::GeminiClient;
use crate::platform::telegram;
use crate::scrape::Scraper;

/// Outcome of one digest run, kept for /status.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub headline_count: usize,
    pub used_fallback: bool,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} - {} headlines, {}",
            self.started_at.format("%Y-%m-%d %H:%M UTC"),
            self.headline_count,
            if self.used_fallback {
                "fallback digest"
            } else {
                "Gemini digest"
            }
        )
    }
}

/// The digest pipeline: scrape, categorize, summarize, deliver.
/// One instance is shared by the scheduler jobs and the command listener.
pub struct DigestPipeline {
    pub config: Config,
    gemini: GeminiClient,
    scraper: Scraper,
    pub bot: Bot,
    chat_id: ChatId,
    last_run: Mutex<Option<RunReport>>,
}

impl DigestPipeline {
    pub fn new(config: Config, secrets: Secrets) -> Result<Self> {
        let gemini = GeminiClient::new(config.gemini.clone(), secrets.gemini_api_key)?;
        let scraper = Scraper::new(&config.scrape)?;
        let bot = Bot::new(&secrets.telegram_bot_token);
        let chat_id = secrets
            .telegram_chat_id
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .context("TELEGRAM_CHAT_ID must be a numeric chat id")?;
        Ok(Self {
            config,
            gemini,
            scraper,
            bot,
            chat_id,
            last_run: Mutex::new(None),
        })
    }

    /// Run the full pipeline once. Stages execute in fixed order; a Gemini
    /// failure falls back to the local digest, so the only hard failure
    /// mode is delivery.
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!("Running digest...");

        let headlines = self.scraper.fetch_all(&self.config.sources()).await;
        info!("Scraped {} headlines", headlines.len());

        let categorized = digest::categorize(&headlines);
        let now_local = started_at.with_timezone(&self.config.digest.timezone);

        let prompt = digest::build_prompt(&categorized, now_local, &self.config.digest);
        let (text, used_fallback) = match self.gemini.generate(&prompt).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Gemini failed, using fallback digest: {:#}", e);
                (
                    digest::fallback_digest(&categorized, now_local, &self.config.digest),
                    true,
                )
            }
        };

        telegram::send_digest(&self.bot, self.chat_id, &text)
            .await
            .context("Failed to deliver digest to Telegram")?;

        let report = RunReport {
            started_at,
            headline_count: headlines.len(),
            used_fallback,
        };
        info!("Digest sent: {}", report.summary());
        *self.last_run.lock().await = Some(report.clone());
        Ok(report)
    }

    /// Status text shown by the /status command.
    pub async fn status(&self) -> String {
        let last_run = self.last_run.lock().await;
        let last = match last_run.as_ref() {
            Some(report) => report.summary(),
            None => "never".to_string(),
        };
        format!(
            "Schedules (UTC):\n  morning: {}\n  evening: {}\n\nLast run: {}",
            self.config.schedule.morning_cron, self.config.schedule.evening_cron, last
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_report_summary_is_plain_ascii() {
        let report = RunReport {
            started_at: Utc.with_ymd_and_hms(2026, 8, 29, 2, 30, 0).unwrap(),
            headline_count: 12,
            used_fallback: false,
        };
        let summary = report.summary();
        assert_eq!(summary, "2026-08-29 02:30 UTC - 12 headlines, Gemini digest");
        assert!(summary.is_ascii());
    }

    #[test]
    fn run_report_summary_marks_fallback() {
        let report = RunReport {
            started_at: Utc.with_ymd_and_hms(2026, 8, 29, 13, 30, 0).unwrap(),
            headline_count: 0,
            used_fallback: true,
        };
        assert!(report.summary().ends_with("0 headlines, fallback digest"));
    }
}
