//! Interactive line commands.
//!
//! Plain text replaces the search term. Slash commands:
//! `/f facet value`, `/c facet`, `/s sort`, `/p page`, `/r`, `/h`, `/q`.

use lookout_core::types::SortKey;
use lookout_engine::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Action(Action),
    Help,
    Quit,
}

pub const HELP: &str = "\
  <text>            search for <text> (empty line clears the term)
  /f facet value    toggle a facet value
  /c facet          clear a facet
  /s key            sort by a configured strategy
  /p n              go to page n (1-based)
  /r                reset everything
  /h                this help
  /q                quit";

pub fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Action(Action::SetTerm(line.to_string())));
    };
    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    let rest = rest.trim();
    match name {
        "f" => {
            let (facet, value) = rest.split_once(char::is_whitespace).ok_or("usage: /f facet value")?;
            Ok(Input::Action(Action::ToggleFilter { facet: facet.to_string(), value: value.trim().to_string() }))
        }
        "c" if !rest.is_empty() => Ok(Input::Action(Action::ClearFacet(rest.to_string()))),
        "c" => Err("usage: /c facet".to_string()),
        "s" if !rest.is_empty() => Ok(Input::Action(Action::SetSort(SortKey::new(rest)))),
        "s" => Err("usage: /s key".to_string()),
        "p" => match rest.parse::<u32>() {
            Ok(page) if page > 0 => Ok(Input::Action(Action::SetPage(page - 1))),
            _ => Err("usage: /p n  (n >= 1)".to_string()),
        },
        "r" => Ok(Input::Action(Action::Reset)),
        "h" | "?" => Ok(Input::Help),
        "q" => Ok(Input::Quit),
        other => Err(format!("unknown command /{other}, try /h")),
    }
}

/// The facet named by a filter command when it is not one of `facets`.
pub fn unknown_facet<'a>(input: &'a Input, facets: &[String]) -> Option<&'a str> {
    let facet = match input {
        Input::Action(Action::ToggleFilter { facet, .. }) | Input::Action(Action::ClearFacet(facet)) => facet,
        _ => return None,
    };
    (!facets.iter().any(|f| f == facet)).then_some(facet.as_str())
}
