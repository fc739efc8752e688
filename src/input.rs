#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Analyze,
    SelectMarket(String),
    ListMarkets,
    Reconnect,
    Status,
    ShowLog(usize),
    Help,
    Quit,
}

pub const DEFAULT_LOG_LINES: usize = 20;

pub const HELP_TEXT: &str = "\
commands:
  analyze | a           compute indicators and a recommendation
  market <SYMBOL> | m   switch the subscribed instrument
  markets               list selectable instruments
  reconnect | r         drop the connection and reconnect now
  status | s            show connection state
  log [n]               show the last n session events
  help | h | ?          this text
  quit | q | exit       stop";

/// Parse one shell line. Returns `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<ShellCommand> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_ascii_lowercase();
    let arg = parts.next();

    match head.as_str() {
        "analyze" | "a" => Some(ShellCommand::Analyze),
        "market" | "m" => arg.map(|s| ShellCommand::SelectMarket(s.to_ascii_uppercase())),
        "markets" => Some(ShellCommand::ListMarkets),
        "reconnect" | "r" => Some(ShellCommand::Reconnect),
        "status" | "s" => Some(ShellCommand::Status),
        "log" | "l" => {
            let n = match arg {
                Some(n) => n.parse::<usize>().ok()?,
                None => DEFAULT_LOG_LINES,
            };
            Some(ShellCommand::ShowLog(n))
        }
        "help" | "h" | "?" => Some(ShellCommand::Help),
        "quit" | "q" | "exit" => Some(ShellCommand::Quit),
        _ => None,
    }
}
