//! Prompt text and chat-message assembly shared by the model adapters.

use serde::{Deserialize, Serialize};

use super::ProviderRequest;

/// A message in the chat-completion wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

const EXTRACTION_RULES: &str = r#"You turn a short, messy spoken or typed note into clean task cards.

Reply with JSON only, no markdown:
{"tasks": [{"content": "", "emoji": "", "actionType": "", "contactName": "", "actionTarget": "", "isActionable": true, "priority": "", "dueDateString": ""}]}

Fields:
- content: at most 8 words, starts with a verb, filler removed.
- emoji: one fitting emoji.
- actionType: one of CALL, TEXT, EMAIL, OPEN_LINK, NAVIGATE, SEARCH, CALENDAR, or "".
- contactName: person or business mentioned, otherwise "".
- actionTarget: only an explicitly spoken phone number, email address or URL, otherwise "".
- isActionable: false for venting or small talk that is not a task.
- priority: "high" for urgency cues (urgent, ASAP, deadline, can't forget), "low" for maybe/someday/when I get a chance, otherwise "medium".
- dueDateString: YYYY-MM-DD when a date can be worked out, else the spoken relative phrase ("tomorrow", "this weekend"), else "".

Rules: ignore filler words, split compound requests into separate tasks, keep the user's order, at most 10 tasks."#;

const CHAT_PERSONA: &str = "You are Nudgy, a small, warm penguin who helps people with ADHD \
get things done. Talk like a friend texting: casual, kind, one to three short sentences, \
at least one emoji. If the user sounds overwhelmed, be gentle and suggest one tiny next step.";

/// System prompt for extraction, anchored to the request's date
pub fn extraction_system_prompt(request: &ProviderRequest) -> String {
    format!(
        "{}\n\nToday's date: {}",
        EXTRACTION_RULES,
        request.today.format("%Y-%m-%d, %A")
    )
}

/// Messages for an extraction call
pub fn extraction_messages(request: &ProviderRequest) -> Vec<WireMessage> {
    let mut messages = vec![WireMessage::new("system", extraction_system_prompt(request))];
    if !request.history.is_empty() {
        let context: Vec<String> = request
            .history
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect();
        messages.push(WireMessage::new(
            "system",
            format!("Recent conversation for context:\n{}", context.join("\n")),
        ));
    }
    messages.push(WireMessage::new(
        "user",
        format!("Extract tasks from this note:\n\"{}\"", request.text),
    ));
    messages
}

/// Messages for a chat call: persona, history, then the new utterance
pub fn chat_messages(request: &ProviderRequest) -> Vec<WireMessage> {
    let mut messages = vec![WireMessage::new("system", CHAT_PERSONA)];
    messages.extend(
        request
            .history
            .iter()
            .map(|m| WireMessage::new(m.role.as_str(), m.content.clone())),
    );
    messages.push(WireMessage::new("user", request.text.clone()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatMessage;
    use chrono::NaiveDate;

    fn request() -> ProviderRequest {
        let mut request = ProviderRequest::new("call mom and buy milk");
        request.today = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        request
    }

    #[test]
    fn test_extraction_prompt_includes_date() {
        let prompt = extraction_system_prompt(&request());
        assert!(prompt.contains("2026-02-08, Sunday"));
        assert!(prompt.contains("\"tasks\""));
    }

    #[test]
    fn test_chat_messages_order() {
        let request = request().with_history(vec![
            ChatMessage::user("hey"),
            ChatMessage::assistant("hi! 🐧"),
        ]);
        let messages = chat_messages(&request);

        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages.last().unwrap().content, "call mom and buy milk");
    }

    #[test]
    fn test_extraction_messages_without_history() {
        let messages = extraction_messages(&request());
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("call mom and buy milk"));
    }
}
