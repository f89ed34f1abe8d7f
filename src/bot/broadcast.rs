//! Owner broadcast payloads: button directives, media relay, dispatch.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use tracing::warn;
use url::Url;

/// An inline button requested via a `[button:Label|url]` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub label: String,
    pub url: String,
}

/// Media attached to the message being relayed, by stored file id.
#[derive(Debug, Clone)]
pub enum MediaKind {
    Photo(FileId),
    Video(FileId),
    Animation(FileId),
    Document(FileId),
    Audio(FileId),
    Voice(FileId),
    Sticker(FileId),
}

/// A message ready to be re-sent to the group.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub body: String,
    pub buttons: Vec<ButtonSpec>,
    pub media: Option<MediaKind>,
}

#[derive(Debug)]
pub enum BroadcastError {
    /// Nothing sendable: no media, and no body left once the button
    /// directives are stripped out.
    UnsupportedContent,
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedContent => {
                write!(f, "message has no body or media to send")
            }
        }
    }
}

impl std::error::Error for BroadcastError {}

// Leading spaces before a directive are consumed with it, so an inline
// tag leaves a single separator behind instead of a double space.
static BUTTON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\[button:([^\]|]*)\|([^\]]*)\]").unwrap());

/// Split button directives out of the text. Returns the cleaned body and
/// the buttons in the order they appeared.
pub fn extract_buttons(text: &str) -> (String, Vec<ButtonSpec>) {
    let mut buttons = Vec::new();
    for caps in BUTTON_RE.captures_iter(text) {
        buttons.push(ButtonSpec {
            label: caps[1].trim().to_string(),
            url: caps[2].trim().to_string(),
        });
    }
    let body = BUTTON_RE.replace_all(text, "").trim().to_string();
    (body, buttons)
}

impl BroadcastMessage {
    /// Assemble a broadcast from the source text and attached media.
    pub fn build(
        source_text: Option<&str>,
        media: Option<MediaKind>,
    ) -> Result<Self, BroadcastError> {
        let (body, buttons) = match source_text {
            Some(text) => extract_buttons(text),
            None => (String::new(), Vec::new()),
        };

        // Buttons alone are not sendable; they need a body or media to
        // hang off.
        if body.is_empty() && media.is_none() {
            return Err(BroadcastError::UnsupportedContent);
        }

        Ok(Self { body, buttons, media })
    }

    /// Assemble a broadcast from the message the owner replied to.
    pub fn from_message(msg: &Message) -> Result<Self, BroadcastError> {
        let source_text = msg.text().or_else(|| msg.caption());
        Self::build(source_text, media_of(msg))
    }
}

fn media_of(msg: &Message) -> Option<MediaKind> {
    if let Some(sizes) = msg.photo() {
        if let Some(largest) = sizes.last() {
            return Some(MediaKind::Photo(largest.file.id.clone()));
        }
    }
    if let Some(video) = msg.video() {
        return Some(MediaKind::Video(video.file.id.clone()));
    }
    // GIFs carry both animation and document; animation must win.
    if let Some(animation) = msg.animation() {
        return Some(MediaKind::Animation(animation.file.id.clone()));
    }
    if let Some(document) = msg.document() {
        return Some(MediaKind::Document(document.file.id.clone()));
    }
    if let Some(audio) = msg.audio() {
        return Some(MediaKind::Audio(audio.file.id.clone()));
    }
    if let Some(voice) = msg.voice() {
        return Some(MediaKind::Voice(voice.file.id.clone()));
    }
    if let Some(sticker) = msg.sticker() {
        return Some(MediaKind::Sticker(sticker.file.id.clone()));
    }
    None
}

/// Build the inline keyboard, one row holding every button. Buttons whose
/// url does not parse are dropped with a warning rather than failing the
/// whole broadcast.
pub fn button_keyboard(buttons: &[ButtonSpec]) -> Option<InlineKeyboardMarkup> {
    let row: Vec<InlineKeyboardButton> = buttons
        .iter()
        .filter_map(|spec| match Url::parse(&spec.url) {
            Ok(url) => Some(InlineKeyboardButton::url(spec.label.clone(), url)),
            Err(e) => {
                warn!("Dropping button '{}' with invalid url '{}': {}", spec.label, spec.url, e);
                None
            }
        })
        .collect();

    if row.is_empty() { None } else { Some(InlineKeyboardMarkup::new(vec![row])) }
}

/// Send the broadcast to its destination. One attempt; retrying is the
/// caller's concern.
pub async fn dispatch(
    bot: &Bot,
    destination: ChatId,
    message: &BroadcastMessage,
) -> Result<Message, RequestError> {
    let keyboard = button_keyboard(&message.buttons);
    let body = message.body.clone();

    match &message.media {
        None => {
            let mut request = bot.send_message(destination, body).parse_mode(ParseMode::Html);
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Photo(file_id)) => {
            let mut request = bot.send_photo(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Video(file_id)) => {
            let mut request = bot.send_video(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Animation(file_id)) => {
            let mut request = bot.send_animation(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Document(file_id)) => {
            let mut request = bot.send_document(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Audio(file_id)) => {
            let mut request = bot.send_audio(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        Some(MediaKind::Voice(file_id)) => {
            let mut request = bot.send_voice(destination, InputFile::file_id(file_id.clone()));
            if !body.is_empty() {
                request = request.caption(body).parse_mode(ParseMode::Html);
            }
            if let Some(markup) = keyboard {
                request = request.reply_markup(markup);
            }
            request.await
        }
        // Stickers take neither caption nor keyboard; body and buttons
        // are dropped on purpose.
        Some(MediaKind::Sticker(file_id)) => {
            bot.send_sticker(destination, InputFile::file_id(file_id.clone())).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_inline_button_leaves_single_space() {
        let (body, buttons) = extract_buttons("Hello [button:Go|https://go.dev] World");
        assert_eq!(body, "Hello World");
        assert_eq!(
            buttons,
            vec![ButtonSpec { label: "Go".to_string(), url: "https://go.dev".to_string() }]
        );
    }

    #[test]
    fn test_extract_preserves_button_order() {
        let (body, buttons) =
            extract_buttons("A [button:One|https://a.example] [button:Two|https://b.example] B");
        assert_eq!(body, "A B");
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].label, "One");
        assert_eq!(buttons[1].label, "Two");
    }

    #[test]
    fn test_extract_trims_label_and_url() {
        let (_, buttons) = extract_buttons("[button: Go | https://go.dev ]");
        assert_eq!(buttons[0].label, "Go");
        assert_eq!(buttons[0].url, "https://go.dev");
    }

    #[test]
    fn test_extract_without_directives_keeps_text() {
        let (body, buttons) = extract_buttons("Just an announcement");
        assert_eq!(body, "Just an announcement");
        assert!(buttons.is_empty());
    }

    #[test]
    fn test_extract_directive_on_own_line() {
        let (body, buttons) = extract_buttons("Line1\n[button:Go|https://go.dev]\nLine2");
        assert_eq!(body, "Line1\n\nLine2");
        assert_eq!(buttons.len(), 1);
    }

    #[test]
    fn test_build_rejects_empty_message() {
        assert!(matches!(
            BroadcastMessage::build(None, None),
            Err(BroadcastError::UnsupportedContent)
        ));
        assert!(matches!(
            BroadcastMessage::build(Some(""), None),
            Err(BroadcastError::UnsupportedContent)
        ));
    }

    #[test]
    fn test_build_rejects_buttons_without_body_or_media() {
        assert!(matches!(
            BroadcastMessage::build(Some("[button:Go|https://go.dev]"), None),
            Err(BroadcastError::UnsupportedContent)
        ));
    }

    #[test]
    fn test_build_accepts_buttons_on_bare_media() {
        let message = BroadcastMessage::build(
            Some("[button:Go|https://go.dev]"),
            Some(MediaKind::Photo(FileId("p2".to_string()))),
        )
        .unwrap();
        assert_eq!(message.body, "");
        assert_eq!(message.buttons.len(), 1);
    }

    #[test]
    fn test_build_accepts_bare_media() {
        let message =
            BroadcastMessage::build(None, Some(MediaKind::Sticker(FileId("s1".to_string()))))
                .unwrap();
        assert_eq!(message.body, "");
        assert!(matches!(message.media, Some(MediaKind::Sticker(_))));
    }

    #[test]
    fn test_build_photo_with_caption_button() {
        let message = BroadcastMessage::build(
            Some("Check this [button:Open|https://example.com/page]"),
            Some(MediaKind::Photo(FileId("p1".to_string()))),
        )
        .unwrap();
        assert_eq!(message.body, "Check this");
        assert_eq!(message.buttons.len(), 1);
        assert_eq!(message.buttons[0].url, "https://example.com/page");
        assert!(matches!(message.media, Some(MediaKind::Photo(_))));
    }

    #[test]
    fn test_keyboard_is_one_row() {
        let buttons = vec![
            ButtonSpec { label: "A".to_string(), url: "https://a.example".to_string() },
            ButtonSpec { label: "B".to_string(), url: "https://b.example".to_string() },
            ButtonSpec { label: "C".to_string(), url: "https://c.example".to_string() },
        ];
        let keyboard = button_keyboard(&buttons).unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 3);
    }

    #[test]
    fn test_keyboard_drops_invalid_urls() {
        let buttons = vec![
            ButtonSpec { label: "Good".to_string(), url: "https://a.example".to_string() },
            ButtonSpec { label: "Bad".to_string(), url: "not a url".to_string() },
        ];
        let keyboard = button_keyboard(&buttons).unwrap();
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn test_keyboard_absent_without_valid_buttons() {
        assert!(button_keyboard(&[]).is_none());

        let all_bad = vec![ButtonSpec { label: "Bad".to_string(), url: "::".to_string() }];
        assert!(button_keyboard(&all_bad).is_none());
    }
}
