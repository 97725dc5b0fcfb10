use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, LinkPreviewOptions, ParseMode};
use tracing::{error, info, warn};

use crate::pipeline::DigestPipeline;

/// Strip list/line-break markup the model tends to emit despite the prompt,
/// leaving only tags Telegram's HTML mode accepts.
pub fn sanitize_html(text: &str) -> String {
    text.replace("<ul>", "")
        .replace("</ul>", "")
        .replace("<li>", "\u{2022} ")
        .replace("</li>", "\n")
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("&nbsp;", " ")
}

/// Split long messages for Telegram's 4096 char limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        // max_len smaller than the next char: take the whole char anyway
        // so the loop always advances
        if end == start {
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Deliver a digest to the destination chat. Sends as HTML with link
/// previews disabled; if Telegram rejects the markup, resends plain.
pub async fn send_digest(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    let sanitized = sanitize_html(text);
    for chunk in split_message(&sanitized, 4000) {
        let html_result = bot
            .send_message(chat_id, &chunk)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .await;

        if let Err(e) = html_result {
            warn!("HTML send rejected, retrying as plain text: {}", e);
            bot.send_message(chat_id, &chunk)
                .link_preview_options(no_preview())
                .await?;
        }
    }
    Ok(())
}

/// Run the Telegram command listener. This is the manual trigger surface:
/// allowed operators can fire a digest run with /digest.
pub async fn run(pipeline: Arc<DigestPipeline>, allowed_user_ids: Vec<u64>) -> Result<()> {
    let bot = pipeline.bot.clone();

    info!("Starting Telegram command listener...");

    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if allowed_user_ids.contains(&user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pipeline])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    pipeline: Arc<DigestPipeline>,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    info!("Command from chat {}: {}", msg.chat.id, text);

    if text == "/start" {
        bot.send_message(
            msg.chat.id,
            "Infrastructure digest bot.\n\n\
             Commands:\n\
             /digest - Run the digest now\n\
             /status - Show schedules and last run\n\
             /sources - List configured news sources",
        )
        .await?;
        return Ok(());
    }

    if text == "/digest" {
        bot.send_message(msg.chat.id, "Running digest...").await?;
        match pipeline.run().await {
            Ok(report) => {
                bot.send_message(msg.chat.id, format!("Done: {}", report.summary()))
                    .await?;
            }
            Err(e) => {
                error!("Manual digest run failed: {:#}", e);
                bot.send_message(msg.chat.id, format!("Digest failed: {}", e))
                    .await?;
            }
        }
        return Ok(());
    }

    if text == "/status" {
        bot.send_message(msg.chat.id, pipeline.status().await).await?;
        return Ok(());
    }

    if text == "/sources" {
        let mut list = String::from("Configured sources:\n\n");
        for source in pipeline.config.sources() {
            list.push_str(&format!("  - {}: {}\n", source.name, source.url));
        }
        bot.send_message(msg.chat.id, list).await?;
        return Ok(());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_list_markup() {
        let input = "<b>Top</b><ul><li>one</li><li>two</li></ul><br>done&nbsp;here";
        assert_eq!(
            sanitize_html(input),
            "<b>Top</b>\u{2022} one\n\u{2022} two\n\ndone here"
        );
    }

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(split_message("hello", 4000), vec!["hello"]);
    }

    #[test]
    fn long_message_splits_at_newlines() {
        let text = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_message(&text, 40);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with('\n'));
        assert_eq!(chunks[1], "b".repeat(30));
    }

    #[test]
    fn split_never_breaks_utf8() {
        let text = "\u{1F4C8}".repeat(50);
        let chunks = split_message(&text, 10);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= 10);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_advances_when_max_len_is_below_char_width() {
        // 4-byte chars with a 1-byte budget: each chunk carries one whole char
        let text = "\u{1F4C8}\u{1F680}";
        let chunks = split_message(text, 1);
        assert_eq!(chunks, vec!["\u{1F4C8}", "\u{1F680}"]);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
    }
}
