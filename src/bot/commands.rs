//! Command surface of the bot and the handlers behind it.

use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatKind, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::bot::BotState;
use crate::bot::broadcast::{self, BroadcastMessage};
use crate::bot::cleanup;
use crate::bot::cooldown::{CommandFamily, CooldownDecision};
use crate::bot::schedule::{self, UpsertOutcome};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Addjadwal(String),
    Jadwal,
    Rules,
    Setgroup,
    Broadcast,
    Format,
}

const OWNER_ONLY: &str = "Sorry, only bot owners can use this command.";

pub const RULES_TEXT: &str = "<b> Animexin group rules :</b>\n<blockquote>\nPlease do not promote or share other websites here. \nIf you wish to provide a spoiler, please use a spoiler tag.\n</blockquote>\n#botrules";

pub const FORMAT_GUIDE: &str = r#"<b>Panduan Format Teks HTML Telegram:</b>

1. Format Dasar:
• &lt;b&gt;teks&lt;/b&gt; = <b>Teks tebal</b>
• &lt;strong&gt;teks&lt;/strong&gt; = <strong>Teks tebal</strong>
• &lt;i&gt;teks&lt;/i&gt; = <i>Teks miring</i>
• &lt;em&gt;teks&lt;/em&gt; = <em>Teks miring</em>
• &lt;u&gt;teks&lt;/u&gt; = <u>Garis bawah</u>
• &lt;s&gt;teks&lt;/s&gt; = <s>Teks dicoret</s>
• &lt;del&gt;teks&lt;/del&gt; = <del>Teks dicoret</del>
• &lt;tg-spoiler&gt;teks&lt;/tg-spoiler&gt; = Spoiler
• &lt;blockquote&gt;teks&lt;/blockquote&gt; = <blockquote>Teks kutipan</blockquote>
• &lt;code&gt;teks&lt;/code&gt; = <code>Kode inline</code>
• &lt;pre&gt;teks&lt;/pre&gt; = Teks pre-formatted

2. Format Khusus:
• &lt;pre&gt;&lt;code class="language-python"&gt;kode&lt;/code&gt;&lt;/pre&gt; = Kode dengan syntax highlighting
• &lt;a href="URL"&gt;teks&lt;/a&gt; = <a href="https://example.com">Link dengan teks</a>

3. Kombinasi Format:
• <b><i>Teks tebal dan miring</i></b>
• <b><u>Teks tebal dan garis bawah</u></b>
• <i><u>Teks miring dan garis bawah</u></i>
• <b><i><u>Kombinasi semua</u></i></b>
• <blockquote><b>Kutipan tebal</b></blockquote>
• <blockquote><i>Kutipan miring</i></blockquote>

4. Contoh Penggunaan Blockquote:
<blockquote>Ini adalah teks kutipan biasa</blockquote>
<blockquote><b>Ini kutipan dengan teks tebal</b></blockquote>
<blockquote><i>Ini kutipan dengan teks miring</i></blockquote>
<blockquote><b><i>Ini kutipan dengan teks tebal dan miring</i></b></blockquote>

5. Tombol Inline:
Untuk menambahkan tombol, gunakan format:
<code>
Pesan dengan tombol
[button:Teks Tombol|https://link.com]
[button:Tombol 2|https://link2.com]
</code>

Tips Penggunaan:
1. Format HTML lebih mudah dari Markdown
2. Pastikan setiap tag dibuka dan ditutup dengan benar
3. Untuk mention user gunakan @username biasa
4. Untuk hashtag gunakan #hashtag biasa
5. Blockquote bisa dikombinasikan dengan format lain

Cara Pakai:
1. Ketik/salin pesan dengan format di atas
2. Reply pesan tersebut dengan /broadcast
3. Atau gunakan menu format bawaan Telegram

<i>Note: Format akan otomatis diproses saat broadcast</i>"#;

fn anti_spam_reply(remaining_minutes: i64, cooldown_minutes: i64, hashtag: &str) -> String {
    format!(
        "<b>Anti Spam!</b>\nThe Schedule command can be accessed in {remaining_minutes} minutes. The schedule has been sent {cooldown_minutes} minutes ago, press the hashtag \n{hashtag}"
    )
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Addjadwal(day) => handle_addjadwal(bot, msg, state, day).await,
        Command::Jadwal => handle_jadwal(bot, msg, state).await,
        Command::Rules => handle_rules(bot, msg, state).await,
        Command::Setgroup => handle_setgroup(bot, msg, state).await,
        Command::Broadcast => handle_broadcast(bot, msg, state).await,
        Command::Format => handle_format(bot, msg, state).await,
    }
}

/// Catch-all so ordinary chatter never produces an unhandled-update warning.
pub async fn ignore_message() -> ResponseResult<()> {
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if matches!(msg.chat.kind, ChatKind::Private(_)) {
        bot.send_message(msg.chat.id, "Bot telah diaktifkan untuk penggunaan pribadi.")
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    state.destination.set(msg.chat.id);
    info!("Activated in chat {} and registered it for announcements", msg.chat.id.0);

    cleanup::delete_with_retry(&bot, msg.chat.id, msg.id).await;
    bot.send_message(msg.chat.id, "Bot has been activated. Ready to take orders!")
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn handle_addjadwal(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    day_input: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.config.is_owner(user.id) {
        info!("Non-owner {} tried /addjadwal", user.id);
        bot.send_message(msg.chat.id, OWNER_ONLY).await?;
        return Ok(());
    }

    let Some(day) = schedule::normalize_day(&day_input) else {
        bot.send_message(
            msg.chat.id,
            "Invalid format. Please enter a valid day. (senin, selasa, rabu, kamis, jumat, sabtu, minggu)",
        )
        .await?;
        return Ok(());
    };

    let Some(entry) = msg.reply_to_message().and_then(|m| m.text()) else {
        bot.send_message(msg.chat.id, "Mohon balas pesan yang berisi jadwal untuk menambahkannya.")
            .await?;
        return Ok(());
    };

    match state.schedules.upsert(day, entry) {
        Ok(UpsertOutcome::Updated) => {
            bot.send_message(msg.chat.id, format!("Schedule for the day {day} successfully updated!"))
                .await?;
        }
        Ok(UpsertOutcome::Inserted) => {
            bot.send_message(msg.chat.id, format!("Schedule for the day {day} successfully added!"))
                .await?;
        }
        Err(e) => {
            error!("Failed to store schedule for {}: {}", day, e);
            bot.send_message(
                msg.chat.id,
                "Terjadi kesalahan saat memproses jadwal. Silakan coba lagi nanti.",
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_jadwal(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    cleanup::schedule_delete(bot.clone(), msg.chat.id, msg.id, cleanup::COMMAND_DELETE_DELAY);

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let now = Utc::now();
    let decision = state.cooldowns.try_acquire(
        user.id,
        CommandFamily::Query,
        now,
        state.config.command_cooldown_minutes,
    );

    if let CooldownDecision::Denied { remaining_minutes } = decision {
        info!("Anti-spam denial for {} on /jadwal ({}m left)", user.id, remaining_minutes);
        bot.send_message(
            msg.chat.id,
            anti_spam_reply(remaining_minutes, state.config.command_cooldown_minutes, "#botschedule"),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let day = schedule::today_name(now, state.config.timezone);
    match state.schedules.get(day) {
        Ok(entries) if !entries.is_empty() => {
            bot.send_message(msg.chat.id, schedule::format_schedule_message(&entries))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Ok(_) => {
            bot.send_message(msg.chat.id, "Jadwal tidak tersedia untuk hari ini.").await?;
        }
        Err(e) => {
            error!("Failed to load schedule for {}: {}", day, e);
            bot.send_message(msg.chat.id, "Failed to get schedule. Please try again later.")
                .await?;
        }
    }
    Ok(())
}

async fn handle_rules(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    cleanup::schedule_delete(bot.clone(), msg.chat.id, msg.id, cleanup::COMMAND_DELETE_DELAY);

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let decision = state.cooldowns.try_acquire(
        user.id,
        CommandFamily::Info,
        Utc::now(),
        state.config.command_cooldown_minutes,
    );

    if let CooldownDecision::Denied { remaining_minutes } = decision {
        info!("Anti-spam denial for {} on /rules ({}m left)", user.id, remaining_minutes);
        bot.send_message(
            msg.chat.id,
            anti_spam_reply(remaining_minutes, state.config.command_cooldown_minutes, "#botrules"),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let sent = bot.send_message(msg.chat.id, RULES_TEXT).parse_mode(ParseMode::Html).await?;
    cleanup::schedule_delete(bot, msg.chat.id, sent.id, cleanup::RULES_REPLY_DELETE_DELAY);
    Ok(())
}

async fn handle_setgroup(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let reply_text = if !state.config.is_owner(user.id) {
        info!("Non-owner {} tried /setgroup", user.id);
        OWNER_ONLY.to_string()
    } else if matches!(msg.chat.kind, ChatKind::Private(_)) {
        info!("Ignoring /setgroup from {} in a private chat", user.id);
        "Perintah ini hanya dapat digunakan dalam grup.".to_string()
    } else {
        state.destination.set(msg.chat.id);
        info!("Chat {} registered as broadcast destination", msg.chat.id.0);
        format!("Group successfully set as broadcast destination! ID : {}", msg.chat.id.0)
    };

    let sent = bot.send_message(msg.chat.id, reply_text).await?;
    cleanup::schedule_delete(bot.clone(), msg.chat.id, msg.id, cleanup::CONFIRMATION_DELETE_DELAY);
    cleanup::schedule_delete(bot, msg.chat.id, sent.id, cleanup::CONFIRMATION_DELETE_DELAY);
    Ok(())
}

async fn handle_broadcast(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.config.is_owner(user.id) {
        info!("Non-owner {} tried /broadcast", user.id);
        bot.send_message(msg.chat.id, OWNER_ONLY).await?;
        return Ok(());
    }

    let Some(destination) = state.destination.get() else {
        info!("Broadcast by {} refused: no destination set", user.id);
        bot.send_message(
            msg.chat.id,
            "The broadcast destination group is not set. Use the /setgroup command inside the destination group..",
        )
        .await?;
        return Ok(());
    };

    let Some(source) = msg.reply_to_message() else {
        bot.send_message(msg.chat.id, "Mohon balas pesan yang ingin di-broadcast.").await?;
        return Ok(());
    };

    let message = match BroadcastMessage::from_message(source) {
        Ok(message) => message,
        Err(e) => {
            warn!("Refusing broadcast of message {}: {}", source.id.0, e);
            bot.send_message(msg.chat.id, "Jenis pesan ini belum didukung untuk broadcast.")
                .await?;
            return Ok(());
        }
    };

    match broadcast::dispatch(&bot, destination, &message).await {
        Ok(_) => {
            info!("Broadcast relayed to chat {}", destination.0);
            bot.send_message(msg.chat.id, "Pesan broadcast berhasil dikirim!").await?;
            cleanup::schedule_delete(bot, msg.chat.id, msg.id, cleanup::COMMAND_DELETE_DELAY);
        }
        Err(e) => {
            error!("Broadcast to chat {} failed: {}", destination.0, e);
            bot.send_message(msg.chat.id, "Gagal mengirim pesan broadcast. Silakan coba lagi nanti.")
                .await?;
        }
    }
    Ok(())
}

async fn handle_format(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.config.is_owner(user.id) {
        info!("Non-owner {} tried /format", user.id);
        bot.send_message(msg.chat.id, OWNER_ONLY).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, FORMAT_GUIDE).parse_mode(ParseMode::Html).await?;
    Ok(())
}
