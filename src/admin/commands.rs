#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeCommand {
    OpenUi,
    List,
    Add(String),
    /// UI "Add Home" button without a name
    AddDefault,
    Remove(String),
    Teleport(String),
    CloseUi,
    ShowPage(usize),
    Usage,
}

/// Parse a chat line. Returns `None` for anything that is not `/home` or `/h`.
pub fn parse_chat_command(message: &str) -> Result<Option<HomeCommand>, String> {
    let trimmed = message.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Ok(None);
    };
    let args = split_args(body)?;
    let Some((command, rest)) = args.split_first() else {
        return Ok(None);
    };
    let command = command.to_ascii_lowercase();
    if command != "home" && command != "h" {
        return Ok(None);
    }

    let parsed = match rest {
        [] => HomeCommand::OpenUi,
        [verb] if verb == "list" => HomeCommand::List,
        [verb, name] if verb == "add" => HomeCommand::Add(name.clone()),
        [verb, name] if verb == "remove" => HomeCommand::Remove(name.clone()),
        [verb, ..] if verb == "list" || verb == "add" || verb == "remove" => HomeCommand::Usage,
        [name] => HomeCommand::Teleport(name.clone()),
        _ => HomeCommand::Usage,
    };
    Ok(Some(parsed))
}

/// Parse a UI console action (`teleport home <verb> ...`).
pub fn parse_ui_command(line: &str) -> Result<Option<HomeCommand>, String> {
    let args = split_args(line.trim())?;
    match args.as_slice() {
        [scope, group, ..] if scope == "teleport" && group == "home" => {}
        _ => return Ok(None),
    }
    let rest = &args[2..];
    let verb = rest
        .first()
        .ok_or_else(|| "home action missing verb".to_string())?;
    let value = rest.get(1);
    let parsed = match verb.as_str() {
        "close" => HomeCommand::CloseUi,
        "add" => match value {
            Some(name) => HomeCommand::Add(name.clone()),
            None => HomeCommand::AddDefault,
        },
        "remove" => HomeCommand::Remove(required_name(value, "remove")?),
        "teleport" => HomeCommand::Teleport(required_name(value, "teleport")?),
        "index" => HomeCommand::ShowPage(parse_index(value)?),
        other => return Err(format!("unknown home action '{other}'")),
    };
    Ok(Some(parsed))
}

fn required_name(value: Option<&String>, verb: &str) -> Result<String, String> {
    value
        .cloned()
        .ok_or_else(|| format!("home action '{verb}' missing name"))
}

fn parse_index(value: Option<&String>) -> Result<usize, String> {
    let Some(value) = value else {
        return Ok(0);
    };
    value
        .parse::<usize>()
        .map_err(|_| format!("home action expected page index, got '{value}'"))
}

/// Whitespace split that keeps double-quoted runs together; `\"` escapes a quote.
fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape in command".to_string()),
            },
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err("unterminated quote in command".to_string());
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}
