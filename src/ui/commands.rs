//! Shell command parsing.
//!
//! Listings are 1-based; commands refer to sessions, saved items and groups
//! by the number shown next to them.

use std::path::PathBuf;

/// A group reference: a listed group or the uncategorized bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef {
    Uncategorized,
    Index(usize),
}

/// Actions the shell can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Sessions
    /// Open a blank session
    NewSession,
    /// Navigate the active session
    Navigate(String),
    /// Navigate to the first URL found in pasted text
    Paste(String),
    ListSessions,
    Switch(usize),
    /// Close a session (active one if no number)
    Close(Option<usize>),
    Reload,
    /// Report the active session's frame as loaded
    FrameLoaded,
    Home,
    GoToTabs,
    /// Print the active session's view markup
    Show,

    // Saved items
    ListSaved(Option<String>),
    AddSaved { url: String, name: String },
    SaveActive { name: String, group: Option<GroupRef> },
    RenameSaved { index: usize, name: String },
    SetSavedUrl { index: usize, url: String },
    DeleteSaved(usize),
    OpenSaved(usize),
    MoveSaved { index: usize, group: GroupRef },
    /// Drop saved item `dragged` onto `target`
    DragSaved { dragged: usize, target: usize },

    // Groups
    ListGroups,
    AddGroup(String),
    RenameGroup { index: usize, name: String },
    DeleteGroup(usize),
    DragGroup { dragged: usize, target: usize },
    OpenGroup(GroupRef),

    // Misc
    ToggleTheme,
    CopyUrl,
    OpenExternal,
    Export(PathBuf),
    Help,
    Quit,
}

pub const HELP: &str = "\
Sessions:
  new                      open a blank session
  go <url>                 navigate the active session
  paste <text>             navigate to the first URL in <text>
  tabs                     list open sessions
  switch <n>               focus session n
  close [n]                close session n (default: active)
  reload                   resolve the active session again
  loaded                   report the active frame as loaded
  home | back              show home / return to sessions
  show                     print the active session's view
Saved items:
  list [query]             list saved items, optionally filtered
  add <url> [name]         save a URL
  save [name] [@group]     save the active session (@none = uncategorized)
  rename <n> <name>        rename saved item n
  seturl <n> <url>         change saved item n's URL
  delete <n>               delete saved item n
  visit <n>                open saved item n
  move <n> <group|none>    file saved item n under a group
  drag <n> <m>             drop saved item n onto item m
Groups:
  groups                   list groups
  group add <name>
  group rename <n> <name>
  group delete <n>         delete group n (items become uncategorized)
  group drag <n> <m>       drop group n onto group m
  group open <n|none>      open every item in a group
Other:
  theme | copy | external | export <file.html> | help | quit";

fn index(arg: Option<&str>, what: &str) -> Result<usize, String> {
    let raw = arg.ok_or_else(|| format!("missing {} number", what))?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a valid {} number", raw, what)),
    }
}

fn group_ref(arg: Option<&str>) -> Result<GroupRef, String> {
    match arg {
        Some(raw) if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("uncategorized") => {
            Ok(GroupRef::Uncategorized)
        }
        other => index(other, "group").map(GroupRef::Index),
    }
}

fn required(rest: &str, what: &str) -> Result<String, String> {
    let rest = rest.trim();
    if rest.is_empty() {
        Err(format!("missing {}", what))
    } else {
        Ok(rest.to_string())
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(pos) => (&input[..pos], input[pos..].trim_start()),
        None => (input, ""),
    }
}

/// Parse one input line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let (word, rest) = split_word(line.trim());
    if word.is_empty() {
        return Ok(None);
    }

    let command = match word.to_ascii_lowercase().as_str() {
        "new" => Command::NewSession,
        "go" | "open" => Command::Navigate(required(rest, "URL")?),
        "paste" => Command::Paste(required(rest, "text")?),
        "tabs" => Command::ListSessions,
        "switch" => Command::Switch(index(Some(rest).filter(|r| !r.is_empty()), "session")?),
        "close" => {
            if rest.is_empty() {
                Command::Close(None)
            } else {
                Command::Close(Some(index(Some(rest), "session")?))
            }
        }
        "reload" => Command::Reload,
        "loaded" => Command::FrameLoaded,
        "home" => Command::Home,
        "back" => Command::GoToTabs,
        "show" => Command::Show,

        "list" => Command::ListSaved(Some(rest.to_string()).filter(|q| !q.is_empty())),
        "add" => {
            let (url, name) = split_word(rest);
            Command::AddSaved {
                url: required(url, "URL")?,
                name: name.to_string(),
            }
        }
        "save" => {
            let (name, group) = match rest.rfind('@') {
                Some(pos) => (&rest[..pos], Some(group_ref(Some(rest[pos + 1..].trim()))?)),
                None => (rest, None),
            };
            Command::SaveActive {
                name: name.trim().to_string(),
                group,
            }
        }
        "rename" => {
            let (n, name) = split_word(rest);
            Command::RenameSaved {
                index: index(Some(n), "item")?,
                name: required(name, "name")?,
            }
        }
        "seturl" => {
            let (n, url) = split_word(rest);
            Command::SetSavedUrl {
                index: index(Some(n), "item")?,
                url: required(url, "URL")?,
            }
        }
        "delete" => Command::DeleteSaved(index(Some(rest), "item")?),
        "visit" => Command::OpenSaved(index(Some(rest), "item")?),
        "move" => {
            let (n, group) = split_word(rest);
            Command::MoveSaved {
                index: index(Some(n), "item")?,
                group: group_ref(Some(group))?,
            }
        }
        "drag" => {
            let (a, b) = split_word(rest);
            Command::DragSaved {
                dragged: index(Some(a), "item")?,
                target: index(Some(b), "item")?,
            }
        }

        "groups" => Command::ListGroups,
        "group" => parse_group(rest)?,

        "theme" => Command::ToggleTheme,
        "copy" => Command::CopyUrl,
        "external" => Command::OpenExternal,
        "export" => Command::Export(PathBuf::from(required(rest, "file path")?)),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

fn parse_group(rest: &str) -> Result<Command, String> {
    let (sub, rest) = split_word(rest);
    match sub.to_ascii_lowercase().as_str() {
        "add" => Ok(Command::AddGroup(required(rest, "group name")?)),
        "rename" => {
            let (n, name) = split_word(rest);
            Ok(Command::RenameGroup {
                index: index(Some(n), "group")?,
                name: required(name, "group name")?,
            })
        }
        "delete" => Ok(Command::DeleteGroup(index(Some(rest), "group")?)),
        "drag" => {
            let (a, b) = split_word(rest);
            Ok(Command::DragGroup {
                dragged: index(Some(a), "group")?,
                target: index(Some(b), "group")?,
            })
        }
        "open" => Ok(Command::OpenGroup(group_ref(Some(rest))?)),
        "" => Err("missing group subcommand".to_string()),
        other => Err(format!("unknown group subcommand '{}'", other)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
