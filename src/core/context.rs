//! Conversation state for a single session.
//!
//! The context owns the ordered turn log that every other component appends
//! to, the monotonic sequence counter behind it, and the active-image slot
//! used to ground follow-up language-model calls after an image analysis.

use serde::{Deserialize, Serialize};

/// Number of recent turns rendered into a language-model prompt.
pub const HISTORY_WINDOW: usize = 10;

// =============================================================================
// Turns
// =============================================================================

/// Role of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Reconciled speech from the user.
    UserSpeech,
    /// Assistant reply text.
    AssistantText,
    /// Synthesized assistant audio. Carries no text.
    AssistantAudioRef,
    /// An error surfaced into the conversation.
    SystemError,
    /// A completed image analysis description.
    ImageAnalysis,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnRole::UserSpeech => "user_speech",
            TurnRole::AssistantText => "assistant_text",
            TurnRole::AssistantAudioRef => "assistant_audio_ref",
            TurnRole::SystemError => "system_error",
            TurnRole::ImageAnalysis => "image_analysis",
        };
        write!(f, "{s}")
    }
}

/// One immutable entry in the conversation history.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    /// Who produced the turn.
    pub role: TurnRole,
    /// Text content. `None` for audio-only turns.
    pub text: Option<String>,
    /// Monotonic per-session sequence number. Never reused, even when a
    /// correction evicts the turn that held it.
    pub created_at: u64,
}

impl ConversationTurn {
    /// Whether this turn contributes a line to a language-model prompt.
    fn prompt_line(&self) -> Option<(&'static str, &str)> {
        let text = self.text.as_deref()?;
        match self.role {
            TurnRole::UserSpeech => Some(("User", text)),
            TurnRole::AssistantText | TurnRole::ImageAnalysis => Some(("Assistant", text)),
            TurnRole::AssistantAudioRef | TurnRole::SystemError => None,
        }
    }
}

// =============================================================================
// Context
// =============================================================================

/// Append-only conversation log for one session.
///
/// Sequence numbers are assigned on append and strictly increase for the
/// lifetime of the session. The only mutation besides append is
/// [`ConversationContext::replace_last`], which evicts the most recent turn
/// of a role and appends a replacement under a fresh sequence number.
#[derive(Debug, Default)]
pub struct ConversationContext {
    turns: Vec<ConversationTurn>,
    next_seq: u64,
    active_image: Option<String>,
}

impl ConversationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, assigning the next sequence number. Returns the
    /// assigned number.
    pub fn append(&mut self, role: TurnRole, text: Option<String>) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.turns.push(ConversationTurn {
            role,
            text,
            created_at: seq,
        });
        seq
    }

    /// Replace the single most recent turn of `role` when `predicate`
    /// accepts it: the old turn is removed and the replacement appended
    /// under a fresh sequence number. A silent no-op when no turn of that
    /// role exists or the predicate rejects it; returns whether a
    /// replacement happened.
    pub fn replace_last<F>(&mut self, role: TurnRole, predicate: F, text: Option<String>) -> bool
    where
        F: FnOnce(&ConversationTurn) -> bool,
    {
        let Some(idx) = self.turns.iter().rposition(|t| t.role == role) else {
            return false;
        };
        if !predicate(&self.turns[idx]) {
            return false;
        }
        self.turns.remove(idx);
        self.append(role, text);
        true
    }

    /// Ordered view of every turn.
    pub fn snapshot(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of turns currently in the log.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log holds no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Payload of the most recently completed image analysis, if any.
    pub fn active_image(&self) -> Option<&str> {
        self.active_image.as_deref()
    }

    /// Record the payload of a completed image analysis.
    pub fn set_active_image(&mut self, payload: String) {
        self.active_image = Some(payload);
    }

    /// Render the recent conversation as a `User:` / `Assistant:` script.
    /// Audio-only and error turns are skipped; at most `max_turns` lines.
    pub fn render_history(&self, max_turns: usize) -> String {
        let lines: Vec<String> = self
            .turns
            .iter()
            .filter_map(ConversationTurn::prompt_line)
            .map(|(speaker, text)| format!("{speaker}: {text}\n"))
            .collect();
        let start = lines.len().saturating_sub(max_turns);
        lines[start..].concat()
    }

    /// Frame the newest user utterance against the conversation so far.
    /// With no usable history the prompt passes through unchanged.
    pub fn prompt_with_context(&self, prompt: &str) -> String {
        let history = self.render_history(HISTORY_WINDOW);
        if history.is_empty() {
            return prompt.to_string();
        }
        format!(
            "\nPrevious conversation:\n{history}\n\nUser's new question: {prompt}\n\n\
             Please respond to the question in the context of our conversation.\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_sequence_numbers() {
        let mut ctx = ConversationContext::new();
        assert_eq!(ctx.append(TurnRole::UserSpeech, Some("one".into())), 1);
        assert_eq!(ctx.append(TurnRole::AssistantText, Some("two".into())), 2);
        assert_eq!(ctx.append(TurnRole::UserSpeech, Some("three".into())), 3);
        let seqs: Vec<u64> = ctx.snapshot().iter().map(|t| t.created_at).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_last_keeps_numbering_monotonic() {
        let mut ctx = ConversationContext::new();
        ctx.append(TurnRole::UserSpeech, Some("Hel".into()));
        let replaced = ctx.replace_last(
            TurnRole::UserSpeech,
            |t| t.text.as_deref() == Some("Hel"),
            Some("Hello".into()),
        );
        assert!(replaced);
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.snapshot()[0].text.as_deref(), Some("Hello"));
        assert_eq!(ctx.snapshot()[0].created_at, 2);
        assert_eq!(ctx.append(TurnRole::AssistantText, Some("hi".into())), 3);
    }

    #[test]
    fn test_replace_last_only_inspects_most_recent_of_role() {
        let mut ctx = ConversationContext::new();
        ctx.append(TurnRole::UserSpeech, Some("older".into()));
        ctx.append(TurnRole::AssistantText, Some("reply".into()));
        ctx.append(TurnRole::UserSpeech, Some("newer".into()));
        let replaced = ctx.replace_last(
            TurnRole::UserSpeech,
            |t| t.text.as_deref() == Some("older"),
            Some("changed".into()),
        );
        assert!(!replaced);
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.snapshot()[0].text.as_deref(), Some("older"));
        assert_eq!(ctx.snapshot()[2].text.as_deref(), Some("newer"));
    }

    #[test]
    fn test_replace_last_is_noop_on_empty_context() {
        let mut ctx = ConversationContext::new();
        assert!(!ctx.replace_last(TurnRole::UserSpeech, |_| true, Some("x".into())));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_render_history_maps_roles_and_skips_non_text() {
        let mut ctx = ConversationContext::new();
        ctx.append(TurnRole::UserSpeech, Some("What style is this?".into()));
        ctx.append(TurnRole::AssistantText, Some("Impressionist.".into()));
        ctx.append(TurnRole::AssistantAudioRef, None);
        ctx.append(TurnRole::SystemError, Some("transient failure".into()));
        ctx.append(TurnRole::ImageAnalysis, Some("A seascape at dawn.".into()));
        let history = ctx.render_history(HISTORY_WINDOW);
        assert_eq!(
            history,
            "User: What style is this?\nAssistant: Impressionist.\nAssistant: A seascape at dawn.\n"
        );
    }

    #[test]
    fn test_render_history_windows_to_most_recent() {
        let mut ctx = ConversationContext::new();
        for i in 0..12 {
            ctx.append(TurnRole::UserSpeech, Some(format!("line {i}")));
        }
        let history = ctx.render_history(HISTORY_WINDOW);
        assert_eq!(history.lines().count(), HISTORY_WINDOW);
        assert!(history.starts_with("User: line 2\n"));
        assert!(history.ends_with("User: line 11\n"));
    }

    #[test]
    fn test_prompt_with_context_passthrough_when_empty() {
        let ctx = ConversationContext::new();
        assert_eq!(ctx.prompt_with_context("hello"), "hello");
    }

    #[test]
    fn test_prompt_with_context_wraps_history() {
        let mut ctx = ConversationContext::new();
        ctx.append(TurnRole::UserSpeech, Some("Tell me about Monet".into()));
        ctx.append(TurnRole::AssistantText, Some("A founder of Impressionism.".into()));
        let prompt = ctx.prompt_with_context("When did he paint Water Lilies?");
        assert!(prompt.starts_with("\nPrevious conversation:\n"));
        assert!(prompt.contains("User: Tell me about Monet\n"));
        assert!(prompt.contains("User's new question: When did he paint Water Lilies?"));
        assert!(prompt.ends_with("context of our conversation.\n"));
    }

    #[test]
    fn test_turn_role_wire_names() {
        let json = serde_json::to_string(&TurnRole::AssistantAudioRef).unwrap();
        assert_eq!(json, "\"assistant_audio_ref\"");
        let role: TurnRole = serde_json::from_str("\"image_analysis\"").unwrap();
        assert_eq!(role, TurnRole::ImageAnalysis);
    }

    #[test]
    fn test_active_image_slot() {
        let mut ctx = ConversationContext::new();
        assert!(ctx.active_image().is_none());
        ctx.set_active_image("data:image/png;base64,AAAA".into());
        assert_eq!(ctx.active_image(), Some("data:image/png;base64,AAAA"));
    }
}
