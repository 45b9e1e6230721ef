//! Turning the secretary's free-text plan into a decision.
//!
//! The planning model answers in prose. [`PlanParser`] reads that prose once and produces a
//! [`Plan`]; everything downstream branches on the enum, never on the raw text.
//!
//! ```rust
//! use aichat::plan::{Feedback, Plan, PlanParser};
//!
//! let parser = PlanParser::new();
//! let feedback = Feedback::parse("too shallow, rating: 3/5");
//! let plan = parser.parse(
//!     "This NEEDS DISCUSSION with the group.",
//!     "discuss caching strategies",
//!     Some(&feedback),
//! );
//! assert_eq!(
//!     plan,
//!     Plan::Delegate { topic: "caching strategies".into(), rounds: 3 }
//! );
//! ```

/// Default phrase in the plan text that routes an instruction to the discussion group.
pub const DEFAULT_DELEGATION_MARKER: &str = "needs discussion";
/// Default command prefix stripped from an instruction to get the topic.
pub const DEFAULT_TOPIC_PREFIX: &str = "discuss ";
/// Scale the low-rating threshold is expressed on.
const RATING_REFERENCE_SCALE: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The secretary answers the instruction itself.
    DirectAnswer,
    /// The discussion group debates `topic` for up to `rounds` rounds.
    Delegate { topic: String, rounds: usize },
}

/// User feedback on an earlier answer, with an optional numeric rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub text: String,
    /// `N` from `rating: N` or `rating: N/M`.
    pub rating: Option<u32>,
    /// `M` from `rating: N/M`.
    pub scale: Option<u32>,
}

impl Feedback {
    /// Read the first `rating: N[/M]` (or `score: N[/M]`) in `text`, case-insensitively.
    /// `=` works in place of `:`. Text without one is kept with no rating.
    pub fn parse(text: &str) -> Self {
        let lowered = text.to_ascii_lowercase();
        let mut found = None;
        'labels: for label in ["rating", "score"] {
            let mut from = 0;
            while let Some(pos) = lowered[from..].find(label) {
                let after = from + pos + label.len();
                if let Some(parsed) = parse_rating(&lowered[after..]) {
                    found = Some(parsed);
                    break 'labels;
                }
                from = after;
            }
        }
        let (rating, scale) = match found {
            Some((rating, scale)) => (Some(rating), scale),
            None => (None, None),
        };
        Self {
            text: text.to_string(),
            rating,
            scale,
        }
    }
}

/// Parses `\s*[:=]\s*N(\s*/\s*M)?` at the start of `rest`.
fn parse_rating(rest: &str) -> Option<(u32, Option<u32>)> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))?;
    let (rating, rest) = leading_number(rest.trim_start())?;
    let rest = rest.trim_start();
    let scale = rest
        .strip_prefix('/')
        .and_then(|after| leading_number(after.trim_start()))
        .map(|(scale, _)| scale);
    Some((rating, scale))
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok().map(|n| (n, &s[end..]))
}

#[derive(Debug, Clone)]
pub struct PlanParser {
    marker: String,
    topic_prefix: String,
    default_rounds: usize,
    escalated_rounds: usize,
    low_rating_threshold: u32,
}

impl Default for PlanParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanParser {
    /// `"needs discussion"` marker, `"discuss "` prefix, 2 rounds, 3 after a rating of 3 or
    /// lower.
    pub fn new() -> Self {
        Self {
            marker: DEFAULT_DELEGATION_MARKER.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            default_rounds: 2,
            escalated_rounds: 3,
            low_rating_threshold: 3,
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into().to_lowercase();
        self
    }

    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn with_rounds(mut self, default_rounds: usize, escalated_rounds: usize) -> Self {
        self.default_rounds = default_rounds;
        self.escalated_rounds = escalated_rounds;
        self
    }

    pub fn with_low_rating_threshold(mut self, threshold: u32) -> Self {
        self.low_rating_threshold = threshold;
        self
    }

    /// The lowercased delegation marker, for embedding in the planning prompt.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn parse(&self, plan_text: &str, instruction: &str, feedback: Option<&Feedback>) -> Plan {
        if !plan_text.to_lowercase().contains(&self.marker) {
            return Plan::DirectAnswer;
        }
        Plan::Delegate {
            topic: self.extract_topic(instruction),
            rounds: self.rounds_for(feedback),
        }
    }

    /// The instruction minus the topic prefix, or the whole instruction when there is no
    /// prefix or nothing follows it.
    pub fn extract_topic(&self, instruction: &str) -> String {
        let trimmed = instruction.trim();
        let prefix_len = self.topic_prefix.len();
        let has_prefix = trimmed
            .get(..prefix_len)
            .map(|head| head.eq_ignore_ascii_case(&self.topic_prefix))
            .unwrap_or(false);
        if has_prefix {
            let topic = trimmed[prefix_len..].trim();
            if !topic.is_empty() {
                return topic.to_string();
            }
        }
        trimmed.to_string()
    }

    pub fn rounds_for(&self, feedback: Option<&Feedback>) -> usize {
        if self.is_low_rating(feedback) {
            self.escalated_rounds
        } else {
            self.default_rounds
        }
    }

    /// The threshold is on a five-point scale. A rating given as `N/M` is rescaled to it first,
    /// so `3/3` is a top mark and `4/10` a low one.
    pub fn is_low_rating(&self, feedback: Option<&Feedback>) -> bool {
        let Some(feedback) = feedback else {
            return false;
        };
        let Some(rating) = feedback.rating else {
            return false;
        };
        match feedback.scale {
            Some(scale) if scale > 0 => {
                u64::from(rating) * RATING_REFERENCE_SCALE
                    <= u64::from(self.low_rating_threshold) * u64::from(scale)
            }
            _ => rating <= self.low_rating_threshold,
        }
    }
}
