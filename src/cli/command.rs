/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `h` / `help`
    Help,
    /// `list`
    List,
    /// `show <id>`
    Show(Option<String>),
    /// `add`
    Add,
    /// `delete <id>`
    Delete(Option<String>),
    /// `edit <id>`
    Edit(Option<String>),
    /// `test <id>`
    Test(Option<String>),
    /// `p` / `play`
    Play,
    /// `credits`
    Credits,
    /// `q` / `quit`
    Quit,
    /// Blank line.
    Empty,
    /// Anything else, as typed.
    Unknown(String),
}

impl Command {
    /// Parses one line: first word is the command, second the id argument.
    ///
    /// Command words are case-insensitive; extra words are ignored.
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Command::Empty;
        };
        let arg = words.next().map(str::to_string);

        match word.to_lowercase().as_str() {
            "h" | "help" => Command::Help,
            "list" => Command::List,
            "show" => Command::Show(arg),
            "add" => Command::Add,
            "delete" => Command::Delete(arg),
            "edit" => Command::Edit(arg),
            "test" => Command::Test(arg),
            "p" | "play" => Command::Play,
            "credits" => Command::Credits,
            "q" | "quit" => Command::Quit,
            _ => Command::Unknown(word.to_string()),
        }
    }
}

/// Help lines, one per command.
pub const HELP: &[&str] = &[
    "h|help - Show this help.",
    "list - List the existing quizzes.",
    "show <id> - Show the question and answer of the given quiz.",
    "add - Add a new quiz interactively.",
    "delete <id> - Delete the given quiz.",
    "edit <id> - Edit the given quiz.",
    "test <id> - Test the given quiz.",
    "p|play - Play: answer every quiz, in random order.",
    "credits - Credits.",
    "q|quit - Quit the program.",
];
