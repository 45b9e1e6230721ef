//! The ordered record of one secretary run.
//!
//! A [`Transcript`] is a list of typed [`TranscriptSegment`]s. It only grows while a run is in
//! progress and is handed out by value (or cloned into the knowledge base) once the run ends.
//! [`Transcript::render`] produces the Markdown report text.
//!
//! Segments are serialized with `serde` so cached entries keep their structure:
//!
//! ```text
//! {"kind":"agent_entry","round":1,"agent_name":"OpenAI-o3-mini","text":"...","failed":false}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptSegment {
    /// Opening block of a secretary run: the instruction and the raw plan text.
    SecretaryHeader { instruction: String, plan: String },
    /// Opening block of a discussion.
    DiscussionHeader { topic: String },
    /// One agent's response (or soft-failure text) in one round.
    AgentEntry {
        round: usize,
        agent_name: String,
        text: String,
        failed: bool,
    },
    /// The round whose convergence score ended the discussion.
    EarlyStop { round: usize, score: f32 },
    /// The secretary's summary of a discussion.
    Synthesis { text: String },
    /// The secretary answered without a discussion.
    DirectAnswer { text: String },
}

impl TranscriptSegment {
    pub fn render(&self) -> String {
        match self {
            TranscriptSegment::SecretaryHeader { instruction, plan } => format!(
                "# AI Secretary Work Log\n\n**Instruction**: {}\n\n## Secretary Plan\n{}\n\n",
                instruction, plan
            ),
            TranscriptSegment::DiscussionHeader { topic } => format!(
                "## Discussion Group Transcript\n\n**Topic**: {}\n\n",
                topic
            ),
            TranscriptSegment::AgentEntry {
                round,
                agent_name,
                text,
                ..
            } => format!("### Round {} - {}\n{}\n\n", round, agent_name, text),
            TranscriptSegment::EarlyStop { score, .. } => format!(
                "### Early Stop\nThe discussion group reached agreement (similarity: {:.2}); ending the discussion early.\n\n",
                score
            ),
            TranscriptSegment::Synthesis { text } => {
                format!("## Final Proposal - Secretary\n{}\n\n", text)
            }
            TranscriptSegment::DirectAnswer { text } => {
                format!("## Direct Answer - Secretary\n{}\n\n", text)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: TranscriptSegment) {
        self.segments.push(segment);
    }

    /// Append every segment of `other`, keeping its order.
    pub fn append(&mut self, other: Transcript) {
        self.segments.extend(other.segments);
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Each segment rendered on its own, in order.
    pub fn rendered_segments(&self) -> Vec<String> {
        self.segments.iter().map(TranscriptSegment::render).collect()
    }

    /// The whole transcript as one Markdown document.
    pub fn render(&self) -> String {
        self.segments.iter().map(TranscriptSegment::render).collect()
    }

    /// Agent entries only, as `(round, agent_name, text)`.
    pub fn agent_entries(&self) -> Vec<(usize, &str, &str)> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                TranscriptSegment::AgentEntry {
                    round,
                    agent_name,
                    text,
                    ..
                } => Some((*round, agent_name.as_str(), text.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Highest round number with at least one agent entry.
    pub fn rounds(&self) -> usize {
        self.agent_entries()
            .iter()
            .map(|(round, _, _)| *round)
            .max()
            .unwrap_or(0)
    }

    pub fn stopped_early(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, TranscriptSegment::EarlyStop { .. }))
    }
}
