use crate::types::RoundOutcome;
use regex::Regex;

/// Explicit acceptance token the persona emits on a win.
pub const WIN_MARKER: &str = "[ACCEPTED]";

/// Turns a persona's raw free-text reply into a structured verdict and
/// a display-safe text with control tokens removed.
///
/// Parsing is deliberately isolated here: the transaction logic only
/// ever sees a `RoundOutcome`, so the tagging scheme can change without
/// touching any money movement.
pub struct ReplyInterpreter {
    sentiment_re: Regex,
    implicit_win_threshold: u8,
}

impl ReplyInterpreter {
    pub fn new(implicit_win_threshold: u8) -> Self {
        Self {
            sentiment_re: Regex::new(r"\[SENTIMENT:\s*(\d+)\]")
                .expect("invalid sentiment regex"),
            implicit_win_threshold,
        }
    }

    /// Never fails: empty or garbled input is a loss with sentiment 0.
    /// Malformed tags must not silently award money.
    pub fn interpret(&self, raw: &str) -> RoundOutcome {
        let mut is_win = raw.contains(WIN_MARKER);
        let text = raw.replace(WIN_MARKER, "");

        let mut sentiment: u8 = 0;
        if let Some(caps) = self.sentiment_re.captures(&text) {
            // Overlong digit runs overflow u8 and fall back to 0
            sentiment = caps[1].parse::<u8>().unwrap_or(0).min(100);
        }
        let display_text = self.sentiment_re.replace_all(&text, "").trim().to_string();

        // Safety net: total approval without the explicit marker
        if !is_win && sentiment >= self.implicit_win_threshold {
            is_win = true;
        }

        RoundOutcome {
            display_text,
            sentiment,
            is_win,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> ReplyInterpreter {
        ReplyInterpreter::new(95)
    }

    #[test]
    fn strips_sentiment_tag() {
        let outcome = interpreter().interpret("Not impressed. [SENTIMENT: 12]");
        assert_eq!(outcome.display_text, "Not impressed.");
        assert_eq!(outcome.sentiment, 12);
        assert!(!outcome.is_win);
    }

    #[test]
    fn explicit_marker_wins_over_low_sentiment() {
        let outcome = interpreter().interpret("Fine, you win. [ACCEPTED] [SENTIMENT: 40]");
        assert!(outcome.is_win);
        assert_eq!(outcome.sentiment, 40);
        assert_eq!(outcome.display_text, "Fine, you win.");
    }

    #[test]
    fn implicit_win_at_threshold() {
        let outcome = interpreter().interpret("Incredible. [SENTIMENT: 95]");
        assert!(outcome.is_win);
    }

    #[test]
    fn no_implicit_win_below_threshold() {
        let outcome = interpreter().interpret("Almost. [SENTIMENT: 94]");
        assert!(!outcome.is_win);
        assert_eq!(outcome.sentiment, 94);
    }

    #[test]
    fn empty_reply_is_a_loss() {
        let outcome = interpreter().interpret("");
        assert!(!outcome.is_win);
        assert_eq!(outcome.sentiment, 0);
        assert_eq!(outcome.display_text, "");
    }

    #[test]
    fn malformed_tag_defaults_to_zero() {
        let outcome = interpreter().interpret("Hmm. [SENTIMENT: high]");
        assert!(!outcome.is_win);
        assert_eq!(outcome.sentiment, 0);
        // An unparseable tag is left in place rather than guessed at
        assert_eq!(outcome.display_text, "Hmm. [SENTIMENT: high]");
    }

    #[test]
    fn sentiment_clamps_to_100() {
        let outcome = interpreter().interpret("[SENTIMENT: 120]");
        assert_eq!(outcome.sentiment, 100);
        assert!(outcome.is_win);
    }

    #[test]
    fn strips_every_tag_occurrence() {
        let outcome = interpreter().interpret("[SENTIMENT: 10] Pass. [SENTIMENT: 10]");
        assert_eq!(outcome.display_text, "Pass.");
        assert_eq!(outcome.sentiment, 10);
    }

    #[test]
    fn whitespace_inside_tag_is_tolerated() {
        let outcome = interpreter().interpret("Maybe. [SENTIMENT:   73]");
        assert_eq!(outcome.sentiment, 73);
        assert_eq!(outcome.display_text, "Maybe.");
    }
}
