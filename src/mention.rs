use poise::serenity_prelude as serenity;

/// Rewrite raw `<@id>` / `<@!id>` mention tokens into `@name` so stored and
/// embedded text stays human-readable when it comes back out of retrieval.
pub fn normalize_mentions(content: &str, mentions: &[(u64, String)]) -> String {
    let mut normalized = content.to_string();
    for (id, name) in mentions {
        let plain = format!("<@{}>", id);
        let nick = format!("<@!{}>", id);
        let replacement = format!("@{}", name);
        normalized = normalized.replace(&plain, &replacement);
        normalized = normalized.replace(&nick, &replacement);
    }
    normalized
}

/// Normalize the content of an inbound Discord message.
pub fn normalize_message(message: &serenity::Message) -> String {
    let mentions: Vec<(u64, String)> = message
        .mentions
        .iter()
        .map(|user| (user.id.get(), user.name.clone()))
        .collect();
    normalize_mentions(&message.content, &mentions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_plain_mentions() {
        let out = normalize_mentions("hey <@123> look at this", &[(123, "alice".to_string())]);
        assert_eq!(out, "hey @alice look at this");
    }

    #[test]
    fn replaces_nickname_mentions() {
        let out = normalize_mentions("<@!99> ping", &[(99, "bob".to_string())]);
        assert_eq!(out, "@bob ping");
    }

    #[test]
    fn handles_multiple_and_repeated_mentions() {
        let mentions = vec![(1, "a".to_string()), (2, "b".to_string())];
        let out = normalize_mentions("<@1> <@2> <@1>", &mentions);
        assert_eq!(out, "@a @b @a");
    }

    #[test]
    fn leaves_unknown_tokens_alone() {
        let out = normalize_mentions("hi <@777>", &[(123, "alice".to_string())]);
        assert_eq!(out, "hi <@777>");
    }
}
