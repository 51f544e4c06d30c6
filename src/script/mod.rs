//! Script handling: placeholder expansion, line parsing and the split of the
//! positional `cmd` value into the command file and its arguments.

pub mod expander;
pub mod invocation;
pub mod parser;

pub use expander::{expand, ReplacementTable};
pub use invocation::ScriptInvocation;
pub use parser::{matches_prefix_list, parse_line, CommandLine, ParsedLine};
