use crate::bridge::{BotIdentity, ChannelType, IgnoreReason, MessageEvent};

/// Work out whether a message addresses the bot and, if so, the query to send.
///
/// Direct channels always trigger. Elsewhere the text must mention the bot
/// as `@username` or `<@userid>`.
pub fn resolve_trigger(event: &MessageEvent, bot: &BotIdentity) -> Result<String, IgnoreReason> {
    let is_direct = event.channel_type == ChannelType::Direct;
    if !is_direct && !mentions_bot(&event.text, bot) {
        return Err(IgnoreReason::NotMentioned);
    }

    let query = strip_mentions(&event.text, bot);
    if query.is_empty() {
        return Err(IgnoreReason::EmptyQuery);
    }
    Ok(query)
}

/// Check for either mention form
pub fn mentions_bot(text: &str, bot: &BotIdentity) -> bool {
    text.contains(&bot.username_mention()) || text.contains(&bot.user_mention())
}

/// Remove every mention of the bot and trim the rest
pub fn strip_mentions(text: &str, bot: &BotIdentity) -> String {
    text.replace(&bot.username_mention(), "")
        .replace(&bot.user_mention(), "")
        .trim()
        .to_string()
}
