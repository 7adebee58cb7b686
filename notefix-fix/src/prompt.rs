//! The interactive-prompt seam. The pipeline only sees this trait, so the
//! core carries no dependency on any terminal-rendering machinery and
//! tests can script decisions.

/// What the user did with one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome<T> {
    Answer(T),
    /// Explicit skip of this issue.
    Skipped,
    /// Abort the whole pipeline; committed fixes are retained.
    Aborted,
}

pub trait Prompt {
    /// Pick one of `choices` by index.
    fn select(&mut self, message: &str, choices: &[String]) -> anyhow::Result<PromptOutcome<usize>>;

    /// Free-form input with an optional prefilled default.
    fn input(&mut self, message: &str, default: Option<&str>)
    -> anyhow::Result<PromptOutcome<String>>;
}

/// Scripted prompt for tests and non-terminal embedders: answers are
/// consumed in order; running out means abort.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    script: std::collections::VecDeque<PromptOutcome<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = PromptOutcome<String>>) -> Self {
        Self {
            script: answers.into_iter().collect(),
        }
    }

    pub fn answering(answers: impl IntoIterator<Item = &'static str>) -> Self {
        Self::new(answers.into_iter().map(|a| PromptOutcome::Answer(a.to_string())))
    }
}

impl Prompt for ScriptedPrompt {
    fn select(&mut self, _message: &str, choices: &[String]) -> anyhow::Result<PromptOutcome<usize>> {
        match self.script.pop_front() {
            Some(PromptOutcome::Answer(text)) => {
                let idx = choices
                    .iter()
                    .position(|c| c == &text)
                    .ok_or_else(|| anyhow::anyhow!("scripted answer `{text}` not among choices"))?;
                Ok(PromptOutcome::Answer(idx))
            }
            Some(PromptOutcome::Skipped) => Ok(PromptOutcome::Skipped),
            Some(PromptOutcome::Aborted) | None => Ok(PromptOutcome::Aborted),
        }
    }

    fn input(
        &mut self,
        _message: &str,
        default: Option<&str>,
    ) -> anyhow::Result<PromptOutcome<String>> {
        match self.script.pop_front() {
            Some(PromptOutcome::Answer(text)) if text.is_empty() => Ok(match default {
                Some(d) => PromptOutcome::Answer(d.to_string()),
                None => PromptOutcome::Answer(String::new()),
            }),
            Some(outcome) => Ok(outcome),
            None => Ok(PromptOutcome::Aborted),
        }
    }
}
