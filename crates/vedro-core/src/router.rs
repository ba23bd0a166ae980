//! Greeting vs. topic decision for the chat tutor.

/// Reply sent when the user only greets.
pub const GREETING_REPLY: &str = "Hi! What would you like to learn about today?";

/// Words that, on their own, make a message a greeting.
const GREETING_WORDS: &[&str] = &[
    "hi", "hii", "hiya", "hello", "hey", "heya", "yo", "hola", "namaste", "greetings", "howdy",
    "sup", "thanks", "thank", "you", "thx", "ty", "good", "morning", "afternoon", "evening",
    "day", "there", "vedro", "ai", "bot", "ok", "okay",
];

/// Greeting words that must appear at least once; the rest are filler.
const ANCHOR_WORDS: &[&str] = &[
    "hi", "hii", "hiya", "hello", "hey", "heya", "yo", "hola", "namaste", "greetings", "howdy",
    "sup", "thanks", "thank", "thx", "ty", "morning", "afternoon", "evening",
];

pub fn greeting_reply() -> &'static str {
    GREETING_REPLY
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    /// A learning topic, trimmed.
    Topic(String),
}

/// Decide whether `message` is small talk or something to teach.
///
/// A message is a greeting when it is blank, or when every word (after
/// lowercasing and stripping punctuation) is a greeting word and at least one
/// of them is a real salutation.
pub fn classify(message: &str) -> Intent {
    let words: Vec<String> = message
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return Intent::Greeting;
    }

    let all_greeting = words.iter().all(|w| GREETING_WORDS.contains(&w.as_str()));
    let anchored = words.iter().any(|w| ANCHOR_WORDS.contains(&w.as_str()));

    if all_greeting && anchored {
        Intent::Greeting
    } else {
        Intent::Topic(message.trim().to_string())
    }
}
