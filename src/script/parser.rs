//! Splits expanded script lines into program name and argument string.

/// One command of the script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: String,
}

/// Classification of one script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank line or comment; produces no task
    Skip,
    Command(CommandLine),
}

impl ParsedLine {
    pub fn program(&self) -> Option<&str> {
        match self {
            Self::Skip => None,
            Self::Command(command) => Some(&command.program),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// True when any entry of `list` is a front substring of `name`
///
/// The direction matters: with `["grep"]`, `grepfoo` matches but `gre` does not.
pub fn matches_prefix_list<S: AsRef<str>>(name: &str, list: &[S]) -> bool {
    list.iter().any(|entry| name.starts_with(entry.as_ref()))
}

/// Split a line on its first space into program and arguments
pub fn parse_line<S: AsRef<str>>(line: &str, comment_markers: &[S]) -> ParsedLine {
    let line = line.trim();
    let (program, args) = match line.split_once(' ') {
        Some((program, args)) => (program, args.trim_start()),
        None => (line, ""),
    };

    if program.is_empty() || matches_prefix_list(program, comment_markers) {
        return ParsedLine::Skip;
    }

    ParsedLine::Command(CommandLine {
        program: program.to_string(),
        args: args.to_string(),
    })
}
