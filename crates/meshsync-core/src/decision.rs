//! Operator decisions requested during a migration run.
//!
//! The pipeline never reads a console. It asks a [`DecisionProvider`] and
//! interprets the free-text answer itself, so the same rules apply whether
//! the answers come from a terminal, a script or a test. A provider that can
//! no longer answer (closed stdin) returns `None`, which aborts the run.

use std::collections::VecDeque;

/// What the operator is being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    /// A node lies inside more than one zone.
    ChooseZone {
        node_id: i64,
        node_name: String,
        /// Candidate `(zone id, zone name)` pairs.
        candidates: Vec<(i64, String)>,
        default_zone: Option<i64>,
    },
    /// Keep the results of a finished run, or roll it back.
    ConfirmRun { summary: String },
}

impl Question {
    /// Short name of what is being decided, for error messages.
    pub fn subject(&self) -> String {
        match self {
            Question::ChooseZone { node_id, .. } => format!("zone of node #{}", node_id),
            Question::ConfirmRun { .. } => "run confirmation".to_string(),
        }
    }

    /// Human-readable prompt text.
    pub fn prompt(&self) -> String {
        match self {
            Question::ChooseZone {
                node_id,
                node_name,
                candidates,
                default_zone,
            } => {
                let mut text = format!(
                    "Node \"{}\" (#{}) lies inside {} zones:\n",
                    node_name,
                    node_id,
                    candidates.len()
                );
                for (id, name) in candidates {
                    text.push_str(&format!("  {}: {}\n", id, name));
                }
                match default_zone {
                    Some(id) => text.push_str(&format!(
                        "Type a zone id, \"default\" (zone {}) or \"discard\" [default]: ",
                        id
                    )),
                    None => text.push_str(
                        "Type a zone id, \"default\" (no default zone, node is discarded) or \"discard\" [default]: ",
                    ),
                }
                text
            }
            Question::ConfirmRun { summary } => {
                format!("{}\nKeep the migrated data? [Y/n]: ", summary)
            }
        }
    }
}

/// Source of operator answers.
pub trait DecisionProvider {
    /// Answer a question. Blank means "take the documented default".
    ///
    /// `None` means no answer can be obtained any more, e.g. end of input.
    fn ask(&mut self, question: &Question) -> Option<String>;
}

/// Answers from a fixed script, in order.
///
/// Once the script is exhausted every question gets a blank answer, or no
/// answer at all after [`ScriptedDecisions::then_closed`]. Asked questions
/// are recorded so tests can assert that no prompt was issued.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    answers: VecDeque<String>,
    asked: Vec<Question>,
    closed_when_exhausted: bool,
}

impl ScriptedDecisions {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
            closed_when_exhausted: false,
        }
    }

    /// Behave like closed input once the script runs out.
    pub fn then_closed(mut self) -> Self {
        self.closed_when_exhausted = true;
        self
    }

    /// Questions asked so far.
    pub fn asked(&self) -> &[Question] {
        &self.asked
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn ask(&mut self, question: &Question) -> Option<String> {
        self.asked.push(question.clone());
        match self.answers.pop_front() {
            Some(answer) => Some(answer),
            None if self.closed_when_exhausted => None,
            None => Some(String::new()),
        }
    }
}
