//! The positional `cmd` value: `<script-file> [arg1] [arg2] ...`

use std::path::{Path, PathBuf};

use crate::config::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub file: PathBuf,
    /// Arguments after the script file; `$0` is the first of them
    pub args: Vec<String>,
}

impl ScriptInvocation {
    pub fn new(file: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            file: file.into(),
            args,
        }
    }

    /// Parse whitespace separated tokens, possibly given as several words
    /// or as one quoted string
    pub fn parse<I, S>(tokens: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = Vec::new();
        for token in tokens {
            words.extend(token.as_ref().split_whitespace().map(str::to_string));
        }

        let mut words = words.into_iter();
        let file = words
            .next()
            .ok_or_else(|| ConfigurationError::missing_required_field("cmd", "command line"))?;

        Ok(Self::new(file, words.collect()))
    }

    /// Locate the command file; relative names are taken from the current directory
    pub fn resolve_file(&self) -> Option<PathBuf> {
        let candidate: &Path = &self.file;
        candidate.is_file().then(|| candidate.to_path_buf())
    }
}
