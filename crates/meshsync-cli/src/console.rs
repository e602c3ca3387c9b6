//! Operator decisions read from the terminal.

use meshsync_core::{DecisionProvider, Question};
use std::io::{self, BufRead, StdinLock, Write};
use tracing::warn;

/// Asks on stdout and reads one line per question.
///
/// With `assume_yes` the confirmation gate is answered without prompting.
/// Zone questions are always asked. End of input or a read error is no
/// answer at all, which makes the pipeline roll the run back.
pub struct ConsoleDecisions<R = StdinLock<'static>> {
    input: R,
    assume_yes: bool,
}

impl ConsoleDecisions {
    pub fn new(assume_yes: bool) -> Self {
        Self::with_input(io::stdin().lock(), assume_yes)
    }
}

impl<R: BufRead> ConsoleDecisions<R> {
    pub fn with_input(input: R, assume_yes: bool) -> Self {
        Self { input, assume_yes }
    }
}

impl<R: BufRead> DecisionProvider for ConsoleDecisions<R> {
    fn ask(&mut self, question: &Question) -> Option<String> {
        if self.assume_yes && matches!(question, Question::ConfirmRun { .. }) {
            println!("{}", question.prompt().trim_end());
            println!("y (--yes)");
            return Some("y".to_string());
        }

        print!("{}", question.prompt());
        let _ = io::stdout().flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                println!();
                warn!("Input closed while asking for the {}", question.subject());
                None
            }
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                warn!("Could not read the answer: {}", e);
                None
            }
        }
    }
}
