use std::io::{BufRead, Write};
use tracing::warn;

/// Supplies a sub-category label for a transaction no rule or keyword matched.
///
/// Implementations may block (an interactive prompt does). Callers without an
/// interactive channel should use [`NoResolver`].
pub trait CategoryResolver {
    fn resolve(&mut self, description: &str) -> String;
}

/// Never answers; every unmatched transaction is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl CategoryResolver for NoResolver {
    fn resolve(&mut self, _description: &str) -> String {
        String::new()
    }
}

impl<F> CategoryResolver for F
where
    F: FnMut(&str) -> String,
{
    fn resolve(&mut self, description: &str) -> String {
        self(description)
    }
}

/// Asks on a line-oriented console: writes a prompt, reads one line back.
pub struct ConsoleResolver<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsoleResolver<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> CategoryResolver for ConsoleResolver<R, W> {
    fn resolve(&mut self, description: &str) -> String {
        let prompt = format!("No category found for: \"{description}\". Please enter a category: ");
        if let Err(e) = self
            .output
            .write_all(prompt.as_bytes())
            .and_then(|_| self.output.flush())
        {
            warn!("Could not write category prompt: {e}");
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => answer.trim().to_string(),
            Err(e) => {
                warn!("Could not read category answer: {e}");
                String::new()
            }
        }
    }
}
