//! Reader for the Graphviz DOT dialect emitted by `nix-store --query --graph`.
//!
//! Only the structure matters here: node statements and edge chains become
//! nodes and links, attribute lists and graph-level settings are skipped.

use std::collections::HashSet;

use super::model::{Edge, GraphPayload, Node};
use crate::error::{GraphError, Result};

#[derive(Debug, PartialEq)]
enum Token {
    /// Identifier; quoted ones are never keywords.
    Id { value: String, quoted: bool },
    Arrow,
    Attrs,
    Equals,
    Open,
    Close,
    Separator,
}

fn invalid(line: usize, message: impl Into<String>) -> GraphError {
    GraphError::InvalidDot {
        line,
        message: message.into(),
    }
}

fn is_bare_id_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '/' | '+')
}

fn tokenize(raw: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();
    let mut line = 1usize;
    let mut at_line_start = true;

    while let Some(ch) = chars.next() {
        match ch {
            '\n' => {
                line += 1;
                at_line_start = true;
                continue;
            }
            ch if ch.is_whitespace() => continue,
            '#' if at_line_start => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start_line = line;
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == '\n' {
                        line += 1;
                    } else if inner == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(invalid(start_line, "unterminated block comment"));
                }
            }
            '"' => {
                let start_line = line;
                let mut value = String::new();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('"') => value.push('"'),
                            Some('\n') => line += 1,
                            Some(other) => {
                                value.push('\\');
                                value.push(other);
                            }
                            None => break,
                        },
                        '\n' => {
                            line += 1;
                            value.push('\n');
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(invalid(start_line, "unterminated quoted identifier"));
                }
                tokens.push((
                    Token::Id {
                        value,
                        quoted: true,
                    },
                    start_line,
                ));
            }
            '[' => {
                let start_line = line;
                let mut in_quotes = false;
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '\n' => line += 1,
                        '\\' if in_quotes => {
                            if chars.next() == Some('\n') {
                                line += 1;
                            }
                        }
                        '"' => in_quotes = !in_quotes,
                        ']' if !in_quotes => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err(invalid(start_line, "unterminated attribute list"));
                }
                tokens.push((Token::Attrs, start_line));
            }
            '-' if matches!(chars.peek(), Some('>' | '-')) => {
                chars.next();
                tokens.push((Token::Arrow, line));
            }
            '=' => tokens.push((Token::Equals, line)),
            '{' => tokens.push((Token::Open, line)),
            '}' => tokens.push((Token::Close, line)),
            ';' | ',' => tokens.push((Token::Separator, line)),
            ch if is_bare_id_char(ch) || ch == '-' => {
                let mut value = String::from(ch);
                while let Some(&next) = chars.peek() {
                    if is_bare_id_char(next) {
                        value.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((
                    Token::Id {
                        value,
                        quoted: false,
                    },
                    line,
                ));
            }
            other => return Err(invalid(line, format!("unexpected character {other:?}"))),
        }
        at_line_start = false;
    }

    Ok(tokens)
}

fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Id {
            value,
            quoted: false,
        } => {
            let lowered = value.to_ascii_lowercase();
            matches!(
                lowered.as_str(),
                "strict" | "digraph" | "graph" | "subgraph" | "node" | "edge"
            )
            .then_some(lowered)
        }
        _ => None,
    }
}

/// Builds a payload from DOT text, keeping edges in statement order.
pub fn parse_dot(raw: &str) -> Result<GraphPayload> {
    let tokens = tokenize(raw)?;
    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut cursor = 0usize;

    let mut add_node = |id: &str, nodes: &mut Vec<Node>| {
        if seen.insert(id.to_string()) {
            nodes.push(Node::new(id));
        }
    };

    while cursor < tokens.len() {
        let (token, line) = &tokens[cursor];
        let Token::Id { value: id, .. } = token else {
            if *token == Token::Arrow {
                return Err(invalid(*line, "edge operator without a source node"));
            }
            cursor += 1;
            continue;
        };

        if matches!(tokens.get(cursor + 1), Some((Token::Equals, _))) {
            // `key = value` graph attribute.
            cursor += 3;
            continue;
        }

        if let Some(word) = keyword(token) {
            let names_graph = matches!(word.as_str(), "digraph" | "graph" | "subgraph");
            cursor += 1;
            if names_graph && matches!(tokens.get(cursor), Some((Token::Id { .. }, _))) {
                cursor += 1;
            }
            continue;
        }

        let mut chain = vec![id.as_str()];
        cursor += 1;
        while let Some((Token::Arrow, arrow_line)) = tokens.get(cursor) {
            match tokens.get(cursor + 1) {
                Some((Token::Id { value: next, .. }, _)) => {
                    chain.push(next.as_str());
                    cursor += 2;
                }
                _ => return Err(invalid(*arrow_line, "edge operator without a target node")),
            }
        }

        for id in &chain {
            add_node(id, &mut nodes);
        }
        for pair in chain.windows(2) {
            links.push(Edge::new(pair[0], pair[1]));
        }
    }

    Ok(GraphPayload::new(nodes, links))
}
