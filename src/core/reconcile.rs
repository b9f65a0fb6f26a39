//! Transcript reconciliation.
//!
//! The transcription collaborator emits a rolling, overlapping sequence of
//! fragments as the speaker talks: interim guesses that get revised, then a
//! final version. Displaying every fragment verbatim produces duplicated or
//! truncated-looking text. The reconciler classifies each fragment against
//! the last accepted text so the session can discard it, append it as a new
//! turn, or correct the previous utterance in place.

/// Minimum length of the accepted text before containment is trusted as a
/// correction anchor. Trivial fragments like "a" or "I" are substrings of
/// almost any revision and must not anchor corrections.
pub const MIN_CORRECTION_ANCHOR: usize = 3;

/// Decision for one observed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Exact duplicate of the last accepted text. Nothing to show.
    Duplicate,
    /// Strict subset of text already shown. Nothing to show.
    Subset,
    /// The fragment extends the last accepted text: the most recent
    /// user speech turn carrying `replaced` is evicted and the fragment
    /// appended in its place.
    Correct { replaced: String },
    /// No containment relation to the last accepted text: appended as a
    /// new turn.
    Append,
}

impl Reconciliation {
    /// Whether the fragment became the accepted text.
    pub fn accepted(&self) -> bool {
        matches!(self, Reconciliation::Correct { .. } | Reconciliation::Append)
    }
}

/// Rolling reconciliation state for one recording.
///
/// Holds the single anchor string the containment rules compare against.
/// Reset whenever a new recording starts so stale anchors from a previous
/// utterance cannot suppress or rewrite fresh speech.
#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    last_accepted: String,
}

impl TranscriptReconciler {
    /// Create a reconciler with an empty anchor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the anchor for a new recording.
    pub fn reset(&mut self) {
        self.last_accepted.clear();
    }

    /// The text most recently accepted into the turn log.
    pub fn last_accepted(&self) -> &str {
        &self.last_accepted
    }

    /// Classify `fragment` against the anchor, updating the anchor when the
    /// fragment is accepted.
    pub fn observe(&mut self, fragment: &str) -> Reconciliation {
        if fragment == self.last_accepted {
            return Reconciliation::Duplicate;
        }
        if self.last_accepted.contains(fragment) {
            return Reconciliation::Subset;
        }
        if fragment.contains(self.last_accepted.as_str())
            && self.last_accepted.len() >= MIN_CORRECTION_ANCHOR
        {
            let replaced = std::mem::replace(&mut self.last_accepted, fragment.to_string());
            return Reconciliation::Correct { replaced };
        }
        self.last_accepted = fragment.to_string();
        Reconciliation::Append
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_duplicate_is_discarded() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("Hello there"), Reconciliation::Append);
        assert_eq!(r.observe("Hello there"), Reconciliation::Duplicate);
        assert_eq!(r.last_accepted(), "Hello there");
    }

    #[test]
    fn test_subset_is_discarded() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("Hello there"), Reconciliation::Append);
        assert_eq!(r.observe("Hello"), Reconciliation::Subset);
        assert_eq!(r.last_accepted(), "Hello there");
    }

    #[test]
    fn test_extension_chain_corrects_in_place() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("Hel"), Reconciliation::Append);
        assert_eq!(
            r.observe("Hello"),
            Reconciliation::Correct {
                replaced: "Hel".to_string()
            }
        );
        assert_eq!(
            r.observe("Hello there"),
            Reconciliation::Correct {
                replaced: "Hello".to_string()
            }
        );
        assert_eq!(r.last_accepted(), "Hello there");
    }

    #[test]
    fn test_unrelated_fragments_both_append() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("The cat"), Reconciliation::Append);
        assert_eq!(r.observe("dog"), Reconciliation::Append);
        assert_eq!(r.last_accepted(), "dog");
    }

    #[test]
    fn test_short_anchor_never_corrects() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("I"), Reconciliation::Append);
        // "I think" contains "I" but a one-character anchor is not trusted.
        assert_eq!(r.observe("I think"), Reconciliation::Append);

        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("He"), Reconciliation::Append);
        assert_eq!(r.observe("Hello"), Reconciliation::Append);
    }

    #[test]
    fn test_anchor_at_threshold_corrects() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("Hel"), Reconciliation::Append);
        assert!(matches!(r.observe("Hello"), Reconciliation::Correct { .. }));
    }

    #[test]
    fn test_empty_fragment_never_appends() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe(""), Reconciliation::Duplicate);
        assert_eq!(r.observe("words"), Reconciliation::Append);
        assert_eq!(r.observe(""), Reconciliation::Subset);
        assert_eq!(r.last_accepted(), "words");
    }

    #[test]
    fn test_reset_clears_the_anchor() {
        let mut r = TranscriptReconciler::new();
        assert_eq!(r.observe("Hello there"), Reconciliation::Append);
        r.reset();
        assert_eq!(r.last_accepted(), "");
        // Without the reset this would be a subset discard.
        assert_eq!(r.observe("Hello"), Reconciliation::Append);
    }

    /// Replays a fragment sequence into a plain turn list and checks that
    /// no two consecutive retained turns are prefix-related with a prefix
    /// longer than three characters.
    fn assert_no_long_prefix_pairs(fragments: &[&str]) {
        let mut r = TranscriptReconciler::new();
        let mut turns: Vec<String> = Vec::new();
        for f in fragments {
            match r.observe(f) {
                Reconciliation::Duplicate | Reconciliation::Subset => {}
                Reconciliation::Correct { replaced } => {
                    if let Some(idx) = turns.iter().rposition(|t| *t == replaced) {
                        turns.remove(idx);
                    }
                    turns.push(f.to_string());
                }
                Reconciliation::Append => turns.push(f.to_string()),
            }
        }
        for pair in turns.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let prefix_len = if b.starts_with(a.as_str()) {
                a.len()
            } else if a.starts_with(b.as_str()) {
                b.len()
            } else {
                continue;
            };
            assert!(
                prefix_len <= 3,
                "consecutive turns {a:?} and {b:?} share a prefix of {prefix_len}"
            );
        }
    }

    #[test]
    fn test_no_long_prefix_survives_reconciliation() {
        assert_no_long_prefix_pairs(&["Hel", "Hello", "Hello there"]);
        assert_no_long_prefix_pairs(&["The cat", "The cat sat", "dog", "dogged", "dogged pursuit"]);
        assert_no_long_prefix_pairs(&["a", "ab", "abc", "abcd", "abcde"]);
        assert_no_long_prefix_pairs(&[
            "what is",
            "what is the",
            "what is the style",
            "and",
            "and the period",
        ]);
    }
}
