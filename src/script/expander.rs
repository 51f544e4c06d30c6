//! Placeholder expansion for script lines.
//!
//! `$<digits>` refers to a positional argument of the script invocation,
//! `$<name>` to an environment variable. Names are case-folded to upper case
//! before lookup. Unknown placeholders stay in the line untouched, and
//! substituted values are never rescanned.

use std::collections::HashMap;

/// Placeholder key (`"$0"`, `"$HOME"`, ...) to literal value, fixed for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    entries: HashMap<String, String>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the script arguments (without the script file
    /// itself) and an environment snapshot
    pub fn from_invocation<A, E, K, V>(args: A, environment: E) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        E: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (key, value) in environment {
            table.insert_variable(key.as_ref(), value);
        }
        for (index, arg) in args.into_iter().enumerate() {
            table.insert_positional(index, arg);
        }
        table
    }

    pub fn insert_positional(&mut self, index: usize, value: impl Into<String>) {
        self.entries.insert(format!("${index}"), value.into());
    }

    pub fn insert_variable(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(format!("${}", name.to_uppercase()), value.into());
    }

    /// Look up a complete key including the leading `$`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReplacementTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '@'
}

/// Length in bytes of the placeholder name starting right after a `$`
fn placeholder_len(rest: &str) -> usize {
    match rest.chars().next() {
        Some(c) if c.is_ascii_digit() => rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len()),
        Some(c) if is_name_char(c) => rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len()),
        _ => 0,
    }
}

/// Expand every known placeholder in `line` in a single left-to-right pass
pub fn expand(line: &str, table: &ReplacementTable) -> String {
    if !line.contains('$') {
        return line.to_string();
    }

    let mut expanded = String::with_capacity(line.len());
    let mut cursor = 0;

    while let Some(offset) = line[cursor..].find('$') {
        let dollar = cursor + offset;
        expanded.push_str(&line[cursor..dollar]);

        let name_start = dollar + 1;
        let name_len = placeholder_len(&line[name_start..]);
        let token = &line[dollar..name_start + name_len];

        if name_len > 0 {
            let key = format!("${}", line[name_start..name_start + name_len].to_uppercase());
            match table.get(&key) {
                Some(value) => expanded.push_str(value),
                None => expanded.push_str(token),
            }
        } else {
            expanded.push('$');
        }

        cursor = name_start + name_len;
    }

    expanded.push_str(&line[cursor..]);
    expanded
}
