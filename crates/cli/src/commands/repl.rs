//! Interactive question loop for the terminal.

use docqa_core::AppResult;
use docqa_knowledge::QuestionAnswerer;
use std::io::{self, BufRead, Write};

const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const WHITE: &str = "\x1b[37m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "q", "f"];

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Terminal question loop.
///
/// Every answered question is appended to an in-memory transcript that lives
/// as long as the loop.
pub struct Repl<'a> {
    answerer: &'a dyn QuestionAnswerer,
    color: bool,
    transcript: Vec<ConversationTurn>,
}

impl<'a> Repl<'a> {
    pub fn new(answerer: &'a dyn QuestionAnswerer, color: bool) -> Self {
        Self {
            answerer,
            color,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    /// Read questions from `input` until an exit keyword or end of input.
    ///
    /// Errors from answering are printed and the loop continues; only I/O
    /// errors on `input`/`output` end it early.
    pub async fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> AppResult<()> {
        let rule = "-".repeat(80);
        writeln!(output, "{}", self.paint(YELLOW, &rule))?;
        writeln!(
            output,
            "{}",
            self.paint(
                YELLOW,
                "Document Question Answer Demo. You are now ready to start interacting with your documents"
            )
        )?;
        writeln!(output, "{}", self.paint(YELLOW, &rule))?;

        let mut line = String::new();
        loop {
            write!(output, "{}", self.paint(GREEN, "Prompt: "))?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                writeln!(output, "Exiting")?;
                break;
            }

            let question = line.trim_end_matches(['\r', '\n']);
            if EXIT_KEYWORDS.contains(&question) {
                writeln!(output, "Exiting")?;
                break;
            }
            if question.is_empty() {
                continue;
            }

            match self.answerer.answer(question, "").await {
                Ok(result) => {
                    writeln!(
                        output,
                        "{}{}",
                        self.paint(WHITE, "Answer: "),
                        self.paint(WHITE, &result.answer)
                    )?;
                    self.transcript.push(ConversationTurn {
                        question: question.to_string(),
                        answer: result.answer,
                    });
                }
                Err(e) => {
                    tracing::error!("Question failed: {}", e);
                    writeln!(output, "{}", self.paint(RED, &format!("Error: {}", e)))?;
                }
            }
        }

        Ok(())
    }
}

/// Run the loop on the process's stdin and stdout.
pub async fn run_stdio(answerer: &dyn QuestionAnswerer, color: bool) -> AppResult<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut repl = Repl::new(answerer, color);
    repl.run(stdin.lock(), stdout.lock()).await?;

    tracing::debug!(
        "Session ended after {} answered question(s)",
        repl.transcript().len()
    );
    Ok(())
}
