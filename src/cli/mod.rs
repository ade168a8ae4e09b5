//! Interactive command-line front end.

/// Command word parsing.
pub mod command;
/// Styled console output.
pub mod out;
/// Command dispatcher and prompt loop.
pub mod repl;
/// Line input.
pub mod terminal;
