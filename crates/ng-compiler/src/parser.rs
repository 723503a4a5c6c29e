use ng_core::rules::CarveOut;
use ng_core::url::normalize_host;

/// Error type for rule list parsing. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },
    #[error("line {line}: '{directive}' needs an argument")]
    MissingArgument { line: usize, directive: String },
    #[error("line {line}: unexpected argument '{argument}'")]
    TrailingArgument { line: usize, argument: String },
    #[error("line {line}: invalid value '{value}': {reason}")]
    InvalidValue {
        line: usize,
        value: String,
        reason: &'static str,
    },
}

/// One table entry named by a rule line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Scheme(String),
    Domain(String),
    CarveOut(CarveOut),
    InternalLabel(String),
    InternalSubstring(String),
    FailUrl(String),
    FailTitle(String),
}

/// Whether a line adds an entry or (`@@` prefix) removes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryAction {
    #[default]
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEntry {
    pub action: EntryAction,
    pub rule: RuleKind,
    pub list_id: u16,
    pub line: usize,
}

pub fn parse_rule_list(text: &str) -> Result<Vec<CompiledEntry>, ParseError> {
    let mut entries = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = raw_line.trim();
        if line.is_empty() || is_comment_line(line) {
            continue;
        }

        let mut action = EntryAction::Add;
        if let Some(rest) = line.strip_prefix("@@") {
            action = EntryAction::Remove;
            line = rest.trim_start();
        }

        let (directive, rest) = split_word(line);
        let rule = parse_directive(directive, rest, line_no)?;

        entries.push(CompiledEntry {
            action,
            rule,
            list_id: 0,
            line: line_no,
        });
    }

    Ok(entries)
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('#')
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    }
}

fn parse_directive(directive: &str, rest: &str, line: usize) -> Result<RuleKind, ParseError> {
    let directive_lower = directive.to_ascii_lowercase();
    match directive_lower.as_str() {
        "scheme" => {
            let value = single_argument(directive, rest, line)?;
            Ok(RuleKind::Scheme(normalize_scheme(value, line)?))
        }
        "domain" => {
            let value = single_argument(directive, rest, line)?;
            Ok(RuleKind::Domain(normalize_domain(value, line)?))
        }
        "carve" => parse_carve(rest, line),
        "internal" => {
            let (mode, rest) = split_word(rest);
            let value = single_argument(directive, rest, line)?;
            match mode.to_ascii_lowercase().as_str() {
                "label" => Ok(RuleKind::InternalLabel(normalize_label(value, line)?)),
                "contains" => Ok(RuleKind::InternalSubstring(value.to_ascii_lowercase())),
                "" => Err(missing(directive, line)),
                _ => Err(invalid(mode, line, "expected 'label' or 'contains'")),
            }
        }
        "fail-url" => {
            let value = single_argument(directive, rest, line)?;
            Ok(RuleKind::FailUrl(value.to_ascii_lowercase()))
        }
        // Titles may contain spaces; the whole remainder is the signal
        "fail-title" => {
            if rest.is_empty() {
                return Err(missing(directive, line));
            }
            Ok(RuleKind::FailTitle(rest.to_ascii_lowercase()))
        }
        _ => Err(ParseError::UnknownDirective {
            line,
            directive: directive.to_string(),
        }),
    }
}

fn parse_carve(rest: &str, line: usize) -> Result<RuleKind, ParseError> {
    let (mode, rest) = split_word(rest);
    let (hosts, rest) = split_word(rest);
    let (path, rest) = split_word(rest);

    if hosts.is_empty() {
        return Err(missing("carve", line));
    }
    if !rest.is_empty() {
        return Err(ParseError::TrailingArgument {
            line,
            argument: rest.to_string(),
        });
    }

    let path_prefix = if path.is_empty() {
        None
    } else if path.starts_with('/') {
        Some(path)
    } else {
        return Err(invalid(path, line, "path prefix must start with '/'"));
    };

    match mode.to_ascii_lowercase().as_str() {
        "contains" => Ok(RuleKind::CarveOut(CarveOut::contains(hosts, path_prefix))),
        "exact" => {
            let mut names = Vec::new();
            for host in hosts.split(',').filter(|h| !h.is_empty()) {
                names.push(normalize_domain(host, line)?);
            }
            if names.is_empty() {
                return Err(missing("carve", line));
            }
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            Ok(RuleKind::CarveOut(CarveOut::exact(&names, path_prefix)))
        }
        _ => Err(invalid(mode, line, "expected 'contains' or 'exact'")),
    }
}

fn single_argument<'a>(directive: &str, rest: &'a str, line: usize) -> Result<&'a str, ParseError> {
    let (value, trailing) = split_word(rest);
    if value.is_empty() {
        return Err(missing(directive, line));
    }
    if !trailing.is_empty() {
        return Err(ParseError::TrailingArgument {
            line,
            argument: trailing.to_string(),
        });
    }
    Ok(value)
}

fn normalize_scheme(value: &str, line: usize) -> Result<String, ParseError> {
    let lower = value.to_ascii_lowercase();
    let Some(colon) = lower.find(':') else {
        return Err(invalid(value, line, "scheme prefix must contain ':'"));
    };
    let name = &lower[..colon];
    let valid_name = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
    if !valid_name {
        return Err(invalid(value, line, "bad scheme name"));
    }
    Ok(lower)
}

fn normalize_domain(value: &str, line: usize) -> Result<String, ParseError> {
    let domain = normalize_host(value);
    if domain.is_empty() {
        return Err(invalid(value, line, "empty host"));
    }
    let valid = domain
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'));
    if !valid || domain.starts_with('.') || domain.contains("..") {
        return Err(invalid(value, line, "not a host name"));
    }
    Ok(domain)
}

fn normalize_label(value: &str, line: usize) -> Result<String, ParseError> {
    let label = normalize_domain(value, line)?;
    if label.contains('.') {
        return Err(invalid(value, line, "label must not contain '.'"));
    }
    Ok(label)
}

fn missing(directive: &str, line: usize) -> ParseError {
    ParseError::MissingArgument {
        line,
        directive: directive.to_string(),
    }
}

fn invalid(value: &str, line: usize, reason: &'static str) -> ParseError {
    ParseError::InvalidValue {
        line,
        value: value.to_string(),
        reason,
    }
}
