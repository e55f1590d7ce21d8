/// Available commands and autocomplete logic
#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "overview",
    aliases: &["o", "stats", "dashboard"],
    description: "Fleet overview and statistics",
  },
  Command {
    name: "fountains",
    aliases: &["f", "fountain"],
    description: "Browse fountains",
  },
  Command {
    name: "alerts",
    aliases: &["a", "alert"],
    description: "View active alerts",
  },
  Command {
    name: "schedules",
    aliases: &["s", "sched", "maintenance"],
    description: "Maintenance schedules",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit aquamon",
  },
];

/// Match priority for a command against an input; lower is better, None means
/// no match.
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    return Some(0);
  }
  if cmd.aliases.contains(&input) {
    return Some(1);
  }
  if cmd.name.starts_with(input) {
    return Some(2);
  }
  if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    return Some(3);
  }
  if cmd.name.contains(input) {
    return Some(4);
  }
  if cmd.aliases.iter().any(|a| a.contains(input)) {
    return Some(5);
  }
  None
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("fountains");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "fountains");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("a");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "alerts");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("fou");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "fountains");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("view");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "overview");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
