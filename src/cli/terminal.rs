use std::future::Future;
use std::io::{self, IsTerminal};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Source of user input lines.
pub trait Terminal {
    /// Shows `prompt` and waits for one line; `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> impl Future<Output = io::Result<Option<String>>>;

    /// Like [`Terminal::read_line`], offering `current` as the value to edit.
    ///
    /// Terminals that cannot pre-fill input fall back to a plain read.
    fn read_line_with_current(
        &mut self,
        prompt: &str,
        _current: &str,
    ) -> impl Future<Output = io::Result<Option<String>>> {
        self.read_line(prompt)
    }
}

/// Line terminal over any async reader and writer.
///
/// When `interactive`, edits show the current value and an empty line keeps it.
pub struct LineTerminal<R, W> {
    lines: Lines<BufReader<R>>,
    out: W,
    interactive: bool,
}

/// Terminal on the process stdin and stdout.
pub type StdioTerminal = LineTerminal<Stdin, Stdout>;

impl<R, W> LineTerminal<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Reads lines from `input` and writes prompts to `out`.
    pub fn new(input: R, out: W, interactive: bool) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
            out,
            interactive,
        }
    }

    /// Everything written so far, prompts included.
    pub fn output(&self) -> &W {
        &self.out
    }

    async fn prompt_and_read(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await?;
        self.lines.next_line().await
    }
}

impl StdioTerminal {
    /// Wraps the process stdin and stdout; interactive only when both are TTYs.
    pub fn stdio() -> Self {
        let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
        Self::new(tokio::io::stdin(), tokio::io::stdout(), interactive)
    }
}

impl<R, W> Terminal for LineTerminal<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompt_and_read(prompt).await
    }

    async fn read_line_with_current(&mut self, prompt: &str, current: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.prompt_and_read(prompt).await;
        }
        let line = self.prompt_and_read(&format!("{prompt}[{current}] ")).await?;
        Ok(line.map(|l| keep_current_if_empty(l, current)))
    }
}

fn keep_current_if_empty(line: String, current: &str) -> String {
    if line.is_empty() { current.to_string() } else { line }
}
