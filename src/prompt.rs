//! Prompt assembly. One fixed template; fields are substituted verbatim. The
//! behavioral contract (weight recency, cite authors, decline gracefully when
//! the context is insufficient) lives in the instructions handed to the LLM.

/// Build the final prompt text.
///
/// `context` holds the retrieved message lines, most recent first.
/// `replies` holds the short-term channel window, chronological order.
pub fn build_prompt(
    context: &[String],
    replies: &[String],
    asking_user: &str,
    bot_name: &str,
    query: &str,
) -> String {
    format!(
        "You are a helpful AI assistant called LlamaBot who has been listening to everything \
everyone has been saying in this discord server. Your username is @{bot_name}. Users use /l or \
/llama command when they're talking to you. Don't use those in your response.\n\
Following is a series of discord chat messages that might be useful for you to answer user's \
query. Each chat message is in this format: [when the message was posted] - @user_who_posted \
on #[channel_where_message_was_posted]: `message_content`\n\
The messages are sorted by recency, so the most recent one is first in the list.\n\
The most recent messages should take precedence over older ones.\n\
Messages related to user's query:\
---------------------\n\
{context}\n\
---------------------\n\
\nFor additional context, here are the last few chat messages of what others were talking \
about before @{asking_user} asked something:\
\n-------------------\
\n{replies}\
\n-------------------\
\nNow @{asking_user} is asking a question that you'll answer correctly, using the most recent \
and relevant information from the chat messages above. Carefully analyze all the messages \
related to user's query, and the last ongoing conversation. After analyzing the messages, \
think one step at a time to come up with the best answer for @{asking_user}. You help users \
in various ways with their queries e.g. finding useful information that were discussed \
previously, summarizing conversations etc. While answering, try to cite the users who posted \
the messages that you're using to answer @{asking_user}'s query. Try your absolute best to \
help @{asking_user} with their query. If you can't correctly answer the query from the \
previous chat messages, then briefly convey that to the user, while including any info from \
previous messages related to their query. Try to be as helpful as you can.\
\nThe question asked by \"@{asking_user}\": `{query}`\
\nYour helpful response: ",
        bot_name = bot_name,
        context = context.join("\n"),
        replies = replies.join("\n"),
        asking_user = asking_user,
        query = query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_fields() {
        let context = vec!["[ctx-line-1]".to_string(), "[ctx-line-2]".to_string()];
        let replies = vec!["[reply-line]".to_string()];
        let prompt = build_prompt(&context, &replies, "alice", "LlamaBot", "what happened?");

        assert!(prompt.contains("@LlamaBot"));
        assert!(prompt.contains("[ctx-line-1]\n[ctx-line-2]"));
        assert!(prompt.contains("[reply-line]"));
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("`what happened?`"));
    }

    #[test]
    fn context_lines_keep_their_order() {
        // Sentinels must not collide with the template's own wording
        let context = vec!["ctx-newest".to_string(), "ctx-older".to_string()];
        let prompt = build_prompt(&context, &[], "bob", "LlamaBot", "q");
        let newest_pos = prompt.find("ctx-newest").unwrap();
        let older_pos = prompt.find("ctx-older").unwrap();
        assert!(newest_pos < older_pos);
    }

    #[test]
    fn empty_sections_still_produce_a_prompt() {
        let prompt = build_prompt(&[], &[], "carol", "LlamaBot", "anything?");
        assert!(prompt.contains("`anything?`"));
        assert!(prompt.contains("Your helpful response:"));
    }
}
