//! Resolution of raw message markup into readable archived text.

use crate::model::UserRef;

/// Replaces user mention markup with the mentioned user's display name and
/// neutralizes mass pings, so the archived content reads like the rendered
/// message rather than raw tokens.
pub fn resolve_markup(content: &str, mentions: &[UserRef]) -> String {
    let mut resolved = content.to_string();

    for user in mentions {
        let plain = format!("<@{}>", user.id);
        let nick = format!("<@!{}>", user.id);
        let display = format!("@{}", user.name);

        resolved = resolved.replace(&plain, &display).replace(&nick, &display);
    }

    resolved
        .replace("@everyone", "@\u{200b}everyone")
        .replace("@here", "@\u{200b}here")
}
