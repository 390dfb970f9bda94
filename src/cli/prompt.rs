use crate::cli::output::ConsoleWriter;
use crate::core::communication::ModeProbe;
use crate::core::session::{Operator, RecoveryChoice, SessionEvent};
use crate::domain::error::{ProvisionError, ProvisionResult};
use async_trait::async_trait;
use std::io::{self, Write};

/// Print `prompt` and read one line from stdin on the blocking pool, so
/// Ctrl-C stays observable meanwhile. `None` on end of input.
pub async fn read_answer(prompt: &str) -> ProvisionResult<Option<String>> {
    let prompt = prompt.to_string();

    tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
    .await
    .map_err(|e| ProvisionError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    .map_err(ProvisionError::from)
}

/// Ask a yes/no question; only `y` counts as yes
pub async fn confirm(prompt: &str) -> ProvisionResult<bool> {
    Ok(matches!(read_answer(prompt).await?, Some(answer) if answer.eq_ignore_ascii_case("y")))
}

/// Where operator answers come from
#[async_trait]
pub trait AnswerSource: Send {
    /// Show `prompt` and wait for an answer; `None` once input is exhausted
    async fn answer(&mut self, prompt: &str) -> ProvisionResult<Option<String>>;
}

/// Answers typed on the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalAnswers;

#[async_trait]
impl AnswerSource for TerminalAnswers {
    async fn answer(&mut self, prompt: &str) -> ProvisionResult<Option<String>> {
        read_answer(prompt).await
    }
}

/// Operator answering on the terminal
pub struct ConsoleOperator<A: AnswerSource = TerminalAnswers> {
    writer: ConsoleWriter,
    answers: A,
}

impl ConsoleOperator {
    pub fn new(writer: ConsoleWriter) -> Self {
        Self::with_answers(writer, TerminalAnswers)
    }
}

impl<A: AnswerSource> ConsoleOperator<A> {
    pub fn with_answers(writer: ConsoleWriter, answers: A) -> Self {
        Self { writer, answers }
    }
}

#[async_trait]
impl<A: AnswerSource> Operator for ConsoleOperator<A> {
    async fn choose_recovery(&mut self, _probe: &ModeProbe) -> ProvisionResult<RecoveryChoice> {
        loop {
            // The full menu is repeated with every prompt
            let prompt = self.writer.recovery_prompt();
            let Some(answer) = self.answers.answer(&prompt).await? else {
                // stdin closed, nobody left to answer
                return Ok(RecoveryChoice::Abort);
            };

            match RecoveryChoice::parse(&answer) {
                Some(choice) => return Ok(choice),
                None => self.writer.write_message("Invalid choice"),
            }
        }
    }

    fn notify(&mut self, event: &SessionEvent) {
        self.writer.write_event(event);
    }
}
