//! Line-oriented terminal prompt for interactive fix mode.
//!
//! Controls: a number picks a choice, `s` skips the current issue, `q` or
//! end-of-input (ctrl-d) aborts the run. Committed fixes survive an abort.

use notefix_fix::{Prompt, PromptOutcome};
use std::io::{BufRead, IsTerminal, Write};

pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Interactive mode requires an attached terminal; refuse up front
    /// rather than hanging on a closed stdin.
    pub fn new() -> anyhow::Result<Self> {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("interactive mode requires a terminal; run without --interactive");
        }
        Ok(Self)
    }

    fn read_line(&self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Prompt for TerminalPrompt {
    fn select(&mut self, message: &str, choices: &[String]) -> anyhow::Result<PromptOutcome<usize>> {
        println!("\n{message}");
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {choice}", i + 1);
        }

        loop {
            print!("choice [1-{}], s=skip, q=quit: ", choices.len());
            std::io::stdout().flush()?;

            let Some(line) = self.read_line()? else {
                return Ok(PromptOutcome::Aborted);
            };
            match line.as_str() {
                "q" => return Ok(PromptOutcome::Aborted),
                "s" | "" => return Ok(PromptOutcome::Skipped),
                other => {
                    if let Ok(n) = other.parse::<usize>()
                        && (1..=choices.len()).contains(&n)
                    {
                        return Ok(PromptOutcome::Answer(n - 1));
                    }
                    println!("unrecognized input `{other}`");
                }
            }
        }
    }

    fn input(
        &mut self,
        message: &str,
        default: Option<&str>,
    ) -> anyhow::Result<PromptOutcome<String>> {
        println!("\n{message}");
        match default {
            Some(d) => print!("value [{d}] (enter=accept, s=skip, q=quit): "),
            None => print!("value (s=skip, q=quit): "),
        }
        std::io::stdout().flush()?;

        let Some(line) = self.read_line()? else {
            return Ok(PromptOutcome::Aborted);
        };
        match line.as_str() {
            "q" => Ok(PromptOutcome::Aborted),
            "s" => Ok(PromptOutcome::Skipped),
            "" => match default {
                Some(d) => Ok(PromptOutcome::Answer(d.to_string())),
                None => Ok(PromptOutcome::Skipped),
            },
            other => Ok(PromptOutcome::Answer(other.to_string())),
        }
    }
}
