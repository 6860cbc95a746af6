//! Template tokenizer and block parser.
//!
//! Tags are delimited by `${` and `}`:
//!
//! - `${key}` or `${key|filter|filter}` substitutes a row field
//! - `${#if key}` ... `${#else}` ... `${/if}` renders on truthiness
//! - `${#unless key}` ... `${/unless}` renders on falsiness
//! - `${#each key}` or `${#each key as name}` ... `${/each}` repeats per item
//! - `$${` emits a literal `${`
//!
//! A block tag that is the only thing on its line consumes the whole line,
//! newline included, so directives leave no blank lines in the output.

use flare_templates_core::{capitalize, to_camel_case, to_pascal_case, to_snake_case};

use super::RenderError;

/// Name bound to the current item by `${#each key}` without `as`.
pub const DEFAULT_BINDING: &str = "it";

/// Case transformation applied to a substituted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Pascal,
    Camel,
    Snake,
    Upper,
    Lower,
    Capitalize,
}

impl Filter {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "pascal" => Filter::Pascal,
            "camel" => Filter::Camel,
            "snake" => Filter::Snake,
            "upper" => Filter::Upper,
            "lower" => Filter::Lower,
            "capitalize" => Filter::Capitalize,
            _ => return None,
        })
    }

    pub fn apply(self, value: &str) -> String {
        match self {
            Filter::Pascal => to_pascal_case(value),
            Filter::Camel => to_camel_case(value),
            Filter::Snake => to_snake_case(value),
            Filter::Upper => value.to_uppercase(),
            Filter::Lower => value.to_lowercase(),
            Filter::Capitalize => capitalize(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    If,
    Unless,
    Each,
}

impl BlockKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(BlockKind::If),
            "unless" => Some(BlockKind::Unless),
            "each" => Some(BlockKind::Each),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
            BlockKind::Each => "each",
        }
    }
}

/// A node of the parsed template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Text(String),
    Value {
        key: String,
        filters: Vec<Filter>,
        line: usize,
    },
    Condition {
        key: String,
        negate: bool,
        then: Vec<Node>,
        otherwise: Vec<Node>,
        line: usize,
    },
    Each {
        key: String,
        binding: String,
        body: Vec<Node>,
        line: usize,
    },
}

#[derive(Debug)]
enum Tag {
    Value {
        key: String,
        filters: Vec<Filter>,
    },
    Open {
        kind: BlockKind,
        key: String,
        binding: Option<String>,
    },
    Else,
    Close(BlockKind),
}

impl Tag {
    fn is_block(&self) -> bool {
        !matches!(self, Tag::Value { .. })
    }
}

#[derive(Debug)]
enum Token {
    Text(String),
    Tag { tag: Tag, line: usize },
}

/// Parse template source into a node tree.
pub(crate) fn parse(src: &str) -> Result<Vec<Node>, RenderError> {
    let tokens = Lexer::new(src).tokenize()?;

    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in tokens {
        let (tag, line) = match token {
            Token::Text(text) => {
                current(&mut stack, &mut root).push(Node::Text(text));
                continue;
            }
            Token::Tag { tag, line } => (tag, line),
        };

        match tag {
            Tag::Value { key, filters } => {
                current(&mut stack, &mut root).push(Node::Value { key, filters, line });
            }
            Tag::Open { kind, key, binding } => stack.push(Frame {
                kind,
                key,
                binding,
                line,
                body: Vec::new(),
                otherwise: None,
            }),
            Tag::Else => {
                let frame = stack
                    .last_mut()
                    .ok_or_else(|| RenderError::syntax(line, "'${#else}' outside of a block"))?;
                if frame.kind == BlockKind::Each {
                    return Err(RenderError::syntax(
                        line,
                        "'${#else}' is not allowed in an each block",
                    ));
                }
                if frame.otherwise.is_some() {
                    return Err(RenderError::syntax(
                        line,
                        format!("duplicate '${{#else}}' in block opened on line {}", frame.line),
                    ));
                }
                frame.otherwise = Some(Vec::new());
            }
            Tag::Close(kind) => {
                let frame = stack.pop().ok_or_else(|| {
                    RenderError::syntax(line, format!("unexpected '${{/{}}}'", kind.name()))
                })?;
                if frame.kind != kind {
                    return Err(RenderError::syntax(
                        line,
                        format!(
                            "'${{/{}}}' closes '${{#{}}}' opened on line {}",
                            kind.name(),
                            frame.kind.name(),
                            frame.line
                        ),
                    ));
                }
                current(&mut stack, &mut root).push(frame.into_node());
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(RenderError::syntax(
            frame.line,
            format!("unclosed '${{#{} {}}}'", frame.kind.name(), frame.key),
        ));
    }

    Ok(root)
}

/// An open block waiting for its closing tag.
struct Frame {
    kind: BlockKind,
    key: String,
    binding: Option<String>,
    line: usize,
    body: Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

impl Frame {
    fn nodes(&mut self) -> &mut Vec<Node> {
        match &mut self.otherwise {
            Some(otherwise) => otherwise,
            None => &mut self.body,
        }
    }

    fn into_node(self) -> Node {
        match self.kind {
            BlockKind::Each => Node::Each {
                key: self.key,
                binding: self
                    .binding
                    .unwrap_or_else(|| DEFAULT_BINDING.to_string()),
                body: self.body,
                line: self.line,
            },
            kind => Node::Condition {
                key: self.key,
                negate: kind == BlockKind::Unless,
                then: self.body,
                otherwise: self.otherwise.unwrap_or_default(),
                line: self.line,
            },
        }
    }
}

fn current<'s>(stack: &'s mut [Frame], root: &'s mut Vec<Node>) -> &'s mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => frame.nodes(),
        None => root,
    }
}

/// Splits source into text runs and tags, tracking line numbers.
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    text: String,
    /// Whether anything but blanks precedes `pos` on the current line
    line_has_content: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            text: String::new(),
            line_has_content: false,
            tokens: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, RenderError> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("$${") {
                self.text.push_str("${");
                self.line_has_content = true;
                self.pos += 3;
            } else if rest.starts_with("${") {
                self.tag()?;
            } else if let Some(ch) = rest.chars().next() {
                self.push_char(ch);
            }
        }
        self.flush_text();
        Ok(self.tokens)
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.line_has_content = false;
        } else if !is_blank(ch) {
            self.line_has_content = true;
        }
    }

    fn tag(&mut self) -> Result<(), RenderError> {
        let line = self.line;
        let body_start = self.pos + 2;
        let rest = &self.src[body_start..];

        let end = rest
            .find(['}', '\n'])
            .filter(|&i| rest.as_bytes()[i] == b'}')
            .ok_or_else(|| RenderError::syntax(line, "unterminated '${' tag"))?;
        let body = &rest[..end];
        if body.contains("${") {
            return Err(RenderError::syntax(line, "'${' is not allowed inside a tag"));
        }

        let tag = parse_tag(body.trim(), line)?;
        let after = body_start + end + 1;

        if tag.is_block() && !self.line_has_content {
            let tail = match self.src[after..].find('\n') {
                Some(i) => &self.src[after..after + i + 1],
                None => &self.src[after..],
            };
            if tail.chars().all(|c| is_blank(c) || c == '\r' || c == '\n') {
                let indent_start = self.text.trim_end_matches(is_blank).len();
                self.text.truncate(indent_start);
                self.flush_text();
                self.tokens.push(Token::Tag { tag, line });
                self.pos = after + tail.len();
                if tail.ends_with('\n') {
                    self.line += 1;
                }
                return Ok(());
            }
        }

        self.flush_text();
        self.tokens.push(Token::Tag { tag, line });
        self.pos = after;
        self.line_has_content = true;
        Ok(())
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token::Text(std::mem::take(&mut self.text)));
        }
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn parse_tag(body: &str, line: usize) -> Result<Tag, RenderError> {
    if let Some(directive) = body.strip_prefix('#') {
        let mut words = directive.split_whitespace();
        let name = words.next().unwrap_or("");

        if name == "else" {
            if words.next().is_some() {
                return Err(RenderError::syntax(line, "'${#else}' takes no arguments"));
            }
            return Ok(Tag::Else);
        }

        let kind = BlockKind::from_name(name)
            .ok_or_else(|| RenderError::syntax(line, format!("unknown directive '#{}'", name)))?;
        let key = words
            .next()
            .ok_or_else(|| RenderError::syntax(line, format!("'#{}' requires a key", name)))?;
        validate_key(key, line)?;

        let binding = match words.next() {
            None => None,
            Some("as") if kind == BlockKind::Each => {
                let binding = words.next().ok_or_else(|| {
                    RenderError::syntax(line, "'#each ... as' requires a binding name")
                })?;
                validate_key(binding, line)?;
                Some(binding.to_string())
            }
            Some(extra) => {
                return Err(RenderError::syntax(
                    line,
                    format!("unexpected '{}' in '#{}'", extra, name),
                ));
            }
        };
        if let Some(extra) = words.next() {
            return Err(RenderError::syntax(
                line,
                format!("unexpected '{}' in '#{}'", extra, name),
            ));
        }

        return Ok(Tag::Open {
            kind,
            key: key.to_string(),
            binding,
        });
    }

    if let Some(name) = body.strip_prefix('/') {
        let name = name.trim();
        return BlockKind::from_name(name)
            .map(Tag::Close)
            .ok_or_else(|| RenderError::syntax(line, format!("unknown closing tag '/{}'", name)));
    }

    let mut parts = body.split('|');
    let key = parts.next().unwrap_or("").trim();
    validate_key(key, line)?;
    let filters = parts
        .map(|name| {
            let name = name.trim();
            Filter::from_name(name)
                .ok_or_else(|| RenderError::syntax(line, format!("unknown filter '{}'", name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tag::Value {
        key: key.to_string(),
        filters,
    })
}

fn validate_key(key: &str, line: usize) -> Result<(), RenderError> {
    if key.is_empty() {
        return Err(RenderError::syntax(line, "empty placeholder"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(RenderError::syntax(
            line,
            format!("invalid placeholder name '{}'", key),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn value(key: &str, line: usize) -> Node {
        Node::Value {
            key: key.to_string(),
            filters: Vec::new(),
            line,
        }
    }

    #[test]
    fn test_parse_text_and_placeholders() {
        let nodes = parse("class ${boxed}Holder {\n  ${type} value;\n}\n").unwrap();
        assert_eq!(
            nodes,
            vec![
                text("class "),
                value("boxed", 1),
                text("Holder {\n  "),
                value("type", 2),
                text(" value;\n}\n"),
            ]
        );
    }

    #[test]
    fn test_parse_filters() {
        let nodes = parse("${id | pascal|upper}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Value {
                key: "id".to_string(),
                filters: vec![Filter::Pascal, Filter::Upper],
                line: 1,
            }]
        );
    }

    #[test]
    fn test_escape_is_literal() {
        let nodes = parse("cost: $${price}").unwrap();
        assert_eq!(nodes, vec![text("cost: ${price}")]);
    }

    #[test]
    fn test_standalone_block_tags_consume_their_lines() {
        let nodes = parse("a\n  ${#if x}\nb\n  ${/if}\nc\n").unwrap();
        assert_eq!(
            nodes,
            vec![
                text("a\n"),
                Node::Condition {
                    key: "x".to_string(),
                    negate: false,
                    then: vec![text("b\n")],
                    otherwise: Vec::new(),
                    line: 2,
                },
                text("c\n"),
            ]
        );
    }

    #[test]
    fn test_inline_block_tags_keep_surrounding_text() {
        let nodes = parse("x ${#if a}y${/if} z").unwrap();
        assert_eq!(
            nodes,
            vec![
                text("x "),
                Node::Condition {
                    key: "a".to_string(),
                    negate: false,
                    then: vec![text("y")],
                    otherwise: Vec::new(),
                    line: 1,
                },
                text(" z"),
            ]
        );
    }

    #[test]
    fn test_each_with_binding_and_else_branch() {
        let nodes = parse("${#each names as n}${n}${/each}${#unless k}A${#else}B${/unless}").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Each {
                    key: "names".to_string(),
                    binding: "n".to_string(),
                    body: vec![value("n", 1)],
                    line: 1,
                },
                Node::Condition {
                    key: "k".to_string(),
                    negate: true,
                    then: vec![text("A")],
                    otherwise: vec![text("B")],
                    line: 1,
                },
            ]
        );
    }

    #[test]
    fn test_each_default_binding() {
        let nodes = parse("${#each xs}${it}${/each}").unwrap();
        match &nodes[0] {
            Node::Each { binding, .. } => assert_eq!(binding, DEFAULT_BINDING),
            other => panic!("expected each node, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_carry_lines() {
        let cases = [
            ("line\n${unterminated\n", 2),
            ("${}", 1),
            ("a\nb\n${#if x}\nno end\n", 3),
            ("${/if}", 1),
            ("${#if a}\n${/each}", 2),
            ("${#each a}${#else}${/each}", 1),
            ("${#if a}${#else}${#else}${/if}", 1),
            ("${key|shout}", 1),
            ("${#loop a}", 1),
            ("${a b}", 1),
            ("${a${b}}", 1),
        ];

        for (src, line) in cases {
            match parse(src) {
                Err(RenderError::Syntax { line: got, .. }) => {
                    assert_eq!(got, line, "wrong line for {:?}", src)
                }
                other => panic!("expected syntax error for {:?}, got {:?}", src, other),
            }
        }
    }

    #[test]
    fn test_lines_counted_after_standalone_tags() {
        let nodes = parse("${#if a}\n${/if}\n${x}").unwrap();
        assert_eq!(nodes.last(), Some(&value("x", 3)));
    }
}
