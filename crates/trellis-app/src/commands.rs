//! Interactive command parsing

use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use trellis_core::SortDirection;

pub const HELP: &str = "\
Type text to filter charts by label. Commands:
  :sort <default|sum|max|min|mean|count|deviation|trend> [asc|desc]
  :scale on|off
  :click <label>
  :scroll <rows>
  :help
  :quit";

/// One line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text, debounced into the search query
    Query(String),
    Sort {
        name: String,
        direction: Option<SortDirection>,
    },
    Scale(bool),
    Click(String),
    Scroll(isize),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Query(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "sort" => {
                let mut parts = arg.split_whitespace();
                let name = parts
                    .next()
                    .ok_or_else(|| anyhow!("Usage: :sort <name> [asc|desc]"))?;
                let direction = parts.next().map(SortDirection::from_str).transpose()?;
                Ok(Command::Sort {
                    name: name.to_string(),
                    direction,
                })
            }
            "scale" => match arg {
                "on" => Ok(Command::Scale(true)),
                "off" => Ok(Command::Scale(false)),
                _ => bail!("Usage: :scale on|off"),
            },
            "click" if !arg.is_empty() => Ok(Command::Click(arg.to_string())),
            "click" => bail!("Usage: :click <label>"),
            "scroll" => {
                let rows = arg
                    .parse()
                    .with_context(|| format!("Invalid scroll amount '{}'", arg))?;
                Ok(Command::Scroll(rows))
            }
            "help" | "h" => Ok(Command::Help),
            "quit" | "q" => Ok(Command::Quit),
            other => bail!("Unknown command ':{}', try :help", other),
        }
    }
}
