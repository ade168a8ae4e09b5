use std::fmt;
use std::io::{self, Write};

use log::{debug, info};
use rand::Rng;

use crate::{
    core::store::StoreError,
    runtime::handle::{QuizStoreHandle, RuntimeError},
    session::{self, GameResult, Interaction, PlaySession, Verdict},
    types::{QuizKey, Score},
};

use super::{
    command::{Command, HELP},
    out::{Color, Console},
    terminal::Terminal,
};

/// Package authors, colon separated.
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Failures of a single command.
#[derive(Debug)]
pub enum CommandError {
    /// The command needs an id and none was given.
    MissingParameter,
    /// The id does not name a quiz (out of range or not a number).
    NotFound(String),
    /// Store runtime failure other than a missing quiz.
    Runtime(RuntimeError),
    /// Terminal input or output failed.
    Io(io::Error),
}

impl CommandError {
    /// True when the prompt loop can report the error and carry on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CommandError::MissingParameter | CommandError::NotFound(_) => true,
            CommandError::Runtime(RuntimeError::ChannelClosed) => false,
            CommandError::Runtime(_) => true,
            CommandError::Io(_) => false,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::MissingParameter => f.write_str("Missing parameter id"),
            CommandError::NotFound(id) => write!(f, "No quiz with id '{id}'"),
            CommandError::Runtime(err) => write!(f, "{err}"),
            CommandError::Io(err) => write!(f, "terminal error: {err}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Runtime(err) => Some(err),
            CommandError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RuntimeError> for CommandError {
    fn from(value: RuntimeError) -> Self {
        match value {
            RuntimeError::Store(StoreError::NotFound(key)) => CommandError::NotFound(key.to_string()),
            other => CommandError::Runtime(other),
        }
    }
}

impl From<io::Error> for CommandError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Resolves the textual id argument of a command.
///
/// Anything that is not a non-negative integer is reported as not found.
pub fn parse_key(arg: Option<&str>) -> Result<QuizKey, CommandError> {
    let raw = arg.ok_or(CommandError::MissingParameter)?;
    raw.parse().map_err(|_| CommandError::NotFound(raw.to_string()))
}

/// Whether the prompt loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Show the prompt again.
    Continue,
    /// End the program.
    Quit,
}

/// Prompt loop and command dispatcher.
pub struct Repl<T, W, R> {
    store: QuizStoreHandle,
    terminal: T,
    console: Console<W>,
    rng: R,
}

impl<T, W, R> Repl<T, W, R>
where
    T: Terminal,
    W: Write,
    R: Rng,
{
    /// Builds a dispatcher over a running store.
    pub fn new(store: QuizStoreHandle, terminal: T, console: Console<W>, rng: R) -> Self {
        Self {
            store,
            terminal,
            console,
            rng,
        }
    }

    /// Borrows the console.
    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    /// Borrows the terminal.
    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Reads and runs commands until `quit` or end of input.
    ///
    /// Recoverable command errors are printed and the prompt shown again.
    pub async fn run(&mut self) -> Result<(), CommandError> {
        loop {
            let prompt = self.console.colorize("quiz > ", Color::Blue);
            let Some(line) = self.terminal.read_line(&prompt).await? else {
                debug!("end of input");
                return Ok(());
            };

            match self.execute(Command::parse(&line)).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(err) if err.is_recoverable() => self.console.errorlog(&err)?,
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs one command.
    pub async fn execute(&mut self, command: Command) -> Result<Flow, CommandError> {
        match command {
            Command::Empty => Ok(Flow::Continue),
            Command::Help => self.help(),
            Command::List => self.list().await,
            Command::Show(id) => self.show(parse_key(id.as_deref())?).await,
            Command::Add => self.add().await,
            Command::Delete(id) => self.delete(parse_key(id.as_deref())?).await,
            Command::Edit(id) => self.edit(parse_key(id.as_deref())?).await,
            Command::Test(id) => self.test(parse_key(id.as_deref())?).await,
            Command::Play => self.play().await,
            Command::Credits => self.credits(),
            Command::Quit => Ok(Flow::Quit),
            Command::Unknown(word) => {
                self.console.errorlog(format!("Unknown command: '{word}'"))?;
                let help = self.console.colorize("help", Color::Green);
                self.console.log(format!("Use {help} for help."))?;
                Ok(Flow::Continue)
            }
        }
    }

    fn help(&mut self) -> Result<Flow, CommandError> {
        self.console.log("Commands:")?;
        for line in HELP {
            self.console.log(format!("  {line}"))?;
        }
        Ok(Flow::Continue)
    }

    async fn list(&mut self) -> Result<Flow, CommandError> {
        for (key, quiz) in self.store.all().await?.iter().enumerate() {
            let id = self.console.colorize(key, Color::Magenta);
            self.console.log(format!("[{id}]: {}", quiz.question))?;
        }
        Ok(Flow::Continue)
    }

    async fn show(&mut self, key: QuizKey) -> Result<Flow, CommandError> {
        let quiz = self.store.get(key).await?;
        let id = self.console.colorize(key, Color::Magenta);
        let arrow = self.console.colorize("=>", Color::Magenta);
        self.console.log(format!("[{id}]: {} {arrow} {}", quiz.question, quiz.answer))?;
        Ok(Flow::Continue)
    }

    async fn add(&mut self) -> Result<Flow, CommandError> {
        let Some(question) = self.read(" Enter a question: ", None).await? else {
            return Ok(Flow::Quit);
        };
        let Some(answer) = self.read(" Enter the answer: ", None).await? else {
            return Ok(Flow::Quit);
        };
        let key = self.store.add(question.clone(), answer.clone()).await?;
        info!("added quiz {key}");
        let label = self.console.colorize("Added", Color::Magenta);
        let arrow = self.console.colorize("=>", Color::Magenta);
        self.console.log(format!("{label}: {question} {arrow} {answer}"))?;
        self.journaled().await
    }

    async fn delete(&mut self, key: QuizKey) -> Result<Flow, CommandError> {
        self.store.delete(key).await?;
        info!("deleted quiz {key}");
        self.journaled().await
    }

    async fn edit(&mut self, key: QuizKey) -> Result<Flow, CommandError> {
        let quiz = self.store.get(key).await?;
        let Some(question) = self.read(" Enter a question: ", Some(quiz.question.as_str())).await? else {
            return Ok(Flow::Quit);
        };
        let Some(answer) = self.read(" Enter the answer: ", Some(quiz.answer.as_str())).await? else {
            return Ok(Flow::Quit);
        };
        self.store.update(key, question.clone(), answer.clone()).await?;
        info!("updated quiz {key}");
        let id = self.console.colorize(key, Color::Magenta);
        let arrow = self.console.colorize("=>", Color::Magenta);
        self.console.log(format!("Quiz {id} changed to: {question} {arrow} {answer}"))?;
        self.journaled().await
    }

    async fn test(&mut self, key: QuizKey) -> Result<Flow, CommandError> {
        let quiz = self.store.get(key).await?;
        let mut io = Prompter::new(&mut self.terminal, &mut self.console);
        let verdict = session::test_quiz(&quiz, &mut io).await;
        io.finish()?;

        match verdict {
            None => Ok(Flow::Quit),
            Some(Verdict::Correct) => {
                self.console.log("Your answer is correct.")?;
                self.console.biglog("Correct", Color::Green)?;
                Ok(Flow::Continue)
            }
            Some(Verdict::Incorrect) => {
                self.console.log("Your answer is incorrect.")?;
                self.console.biglog("Incorrect", Color::Red)?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn play(&mut self) -> Result<Flow, CommandError> {
        let mut game = PlaySession::new(self.store.all().await?);
        debug!("play session started over {} quizzes", game.total());

        let mut io = Prompter::new(&mut self.terminal, &mut self.console);
        let outcome = session::play(&mut game, &mut self.rng, &mut io).await;
        io.finish()?;

        let Some(outcome) = outcome else {
            return Ok(Flow::Quit);
        };
        match outcome.result {
            GameResult::Won => self.console.log(format!(
                "All quizzes answered. End of game. Correct answers: {}",
                outcome.score
            ))?,
            GameResult::Lost => self.console.log(format!("End of game. Correct answers: {}", outcome.score))?,
        }
        self.console.biglog(outcome.score, Color::Magenta)?;
        Ok(Flow::Continue)
    }

    fn credits(&mut self) -> Result<Flow, CommandError> {
        self.console.log("Authors:")?;
        for author in AUTHORS.split(':').filter(|a| !a.is_empty()) {
            self.console.log_color(author, Color::Green)?;
        }
        Ok(Flow::Continue)
    }

    /// Waits for the change to reach the journal so a failing disk shows up at the prompt.
    async fn journaled(&mut self) -> Result<Flow, CommandError> {
        self.store.flush().await?;
        Ok(Flow::Continue)
    }

    async fn read(&mut self, prompt: &str, current: Option<&str>) -> io::Result<Option<String>> {
        let prompt = self.console.colorize(prompt, Color::Red);
        match current {
            Some(current) => self.terminal.read_line_with_current(&prompt, current).await,
            None => self.terminal.read_line(&prompt).await,
        }
    }
}

/// Asks quiz questions on the terminal and reports per-answer feedback.
struct Prompter<'a, T, W> {
    terminal: &'a mut T,
    console: &'a mut Console<W>,
    failure: Option<io::Error>,
}

impl<'a, T, W> Prompter<'a, T, W> {
    fn new(terminal: &'a mut T, console: &'a mut Console<W>) -> Self {
        Self {
            terminal,
            console,
            failure: None,
        }
    }

    fn finish(self) -> io::Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<T: Terminal, W: Write> Interaction for Prompter<'_, T, W> {
    async fn ask(&mut self, question: &str) -> Option<String> {
        let prompt = self.console.colorize(format!("{question}? "), Color::Magenta);
        match self.terminal.read_line(&prompt).await {
            Ok(line) => line,
            Err(err) => {
                self.failure = Some(err);
                None
            }
        }
    }

    fn answered(&mut self, verdict: Verdict, score: Score) {
        let line = match verdict {
            Verdict::Correct => format!("CORRECT - {score} correct so far"),
            Verdict::Incorrect => "INCORRECT".to_string(),
        };
        if let Err(err) = self.console.log(line) {
            self.failure.get_or_insert(err);
        }
    }
}
