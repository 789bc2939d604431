use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Source of interactive answers. Injected so commands can run without a terminal.
pub trait Prompt: Send + Sync {
    fn request(&self, text: &str) -> Result<String>;
}

/// Reads answers from stdin after printing the question to stdout.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn request(&self, text: &str) -> Result<String> {
        let mut out = std::io::stdout();
        write!(out, "{text}").context("writing prompt")?;
        out.flush().context("flushing prompt")?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).context("reading answer")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers "yes" to everything. Used by `--yes`.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn request(&self, _text: &str) -> Result<String> { Ok("y".to_string()) }
}

/// Ask a yes/no question; any answer containing a `y` counts as yes.
pub fn confirm(prompt: &dyn Prompt, text: &str) -> Result<bool> {
    Ok(prompt.request(text)?.to_lowercase().contains('y'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrompt;

    #[test]
    fn confirm_accepts_any_answer_with_y() {
        let p = ScriptedPrompt::new(&["Y", "yes please", "n", ""]);
        assert!(confirm(&p, "?").unwrap());
        assert!(confirm(&p, "?").unwrap());
        assert!(!confirm(&p, "?").unwrap());
        assert!(!confirm(&p, "?").unwrap());
        assert_eq!(p.asked().len(), 4);
    }

    #[test]
    fn assume_yes_confirms() {
        assert!(confirm(&AssumeYes, "Proceed?").unwrap());
    }
}
