use crate::shell::ast::{CommandTree, Operator, OutputTarget, Redirections, SimpleCommand, Word, WordPart, WriteMode};
use anyhow::{Result, bail};
use regex::Regex;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;

static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectOp {
    Input,             // <
    Output(WriteMode), // > >>
    Error(WriteMode),  // 2> 2>>
    Both(WriteMode),   // &> &>>
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(Word),
    Semi,
    Newline,
    Amp,
    AndIf,
    OrIf,
    Pipe,
    Redirect(RedirectOp),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(_) => write!(f, "word"),
            Token::Semi => write!(f, "';'"),
            Token::Newline => write!(f, "newline"),
            Token::Amp => write!(f, "'&'"),
            Token::AndIf => write!(f, "'&&'"),
            Token::OrIf => write!(f, "'||'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Redirect(RedirectOp::Input) => write!(f, "'<'"),
            Token::Redirect(RedirectOp::Output(WriteMode::Truncate)) => write!(f, "'>'"),
            Token::Redirect(RedirectOp::Output(WriteMode::Append)) => write!(f, "'>>'"),
            Token::Redirect(RedirectOp::Error(WriteMode::Truncate)) => write!(f, "'2>'"),
            Token::Redirect(RedirectOp::Error(WriteMode::Append)) => write!(f, "'2>>'"),
            Token::Redirect(RedirectOp::Both(WriteMode::Truncate)) => write!(f, "'&>'"),
            Token::Redirect(RedirectOp::Both(WriteMode::Append)) => write!(f, "'&>>'"),
        }
    }
}

// Accumulates one word. Adjacent literal text is merged into a single fragment.
#[derive(Default)]
struct WordBuilder {
    parts: Vec<WordPart>,
    buf: String,
    // Used to track if we actually parsed something into the current token
    // so we can distinguish between empty string (from "") vs nothing (whitespace)
    started: bool,
    // Any quoted or escaped character in `buf` disqualifies it as an assignment name.
    buf_quoted: bool,
    assignment_split: bool,
}

impl WordBuilder {
    fn push(&mut self, c: char, quoted: bool) {
        self.buf.push(c);
        self.buf_quoted |= quoted;
        self.started = true;
    }

    fn flush_literal(&mut self) {
        if !self.buf.is_empty() {
            self.parts.push(WordPart::Literal(std::mem::take(&mut self.buf)));
        }
        self.buf_quoted = false;
    }

    fn push_variable(&mut self, name: String) {
        self.flush_literal();
        self.parts.push(WordPart::Variable(name));
        self.started = true;
    }

    // NAME=... splits into [NAME, "=", ...] so the executor can recognize it.
    fn push_equals(&mut self) {
        if !self.assignment_split && self.parts.is_empty() && !self.buf_quoted && NAME.is_match(&self.buf) {
            self.flush_literal();
            self.parts.push(WordPart::Literal("=".to_string()));
            self.assignment_split = true;
            self.started = true;
        } else {
            self.push('=', false);
        }
    }

    // A bare unquoted "2" right before '>' is a file descriptor, not a word.
    fn is_stderr_prefix(&self) -> bool {
        self.parts.is_empty() && !self.buf_quoted && self.buf == "2"
    }

    fn finish(&mut self) -> Option<Word> {
        if !self.started {
            return None;
        }
        self.flush_literal();
        let word = Word(std::mem::take(&mut self.parts));
        *self = WordBuilder::default();
        Some(word)
    }
}

fn read_variable_name(chars: &mut Peekable<Chars<'_>>) -> Result<Option<String>> {
    let mut name = String::new();
    if let Some(&'{') = chars.peek() {
        chars.next(); // consume {
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => name.push(c),
                None => bail!("unterminated '${{'"),
            }
        }
        if name.is_empty() {
            bail!("bad substitution: '${{}}'");
        }
        return Ok(Some(name));
    }
    if let Some(&'?') = chars.peek() {
        chars.next();
        return Ok(Some("?".to_string()));
    }
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    Ok(if name.is_empty() { None } else { Some(name) })
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = WordBuilder::default();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            } else {
                word.push(c, true);
            }
            continue;
        }

        if c == '\\' {
            match chars.next() {
                Some(next) if !in_double_quote || matches!(next, '"' | '\\' | '$') => word.push(next, true),
                Some(next) => {
                    word.push('\\', true);
                    word.push(next, true);
                }
                // Trailing backslash is kept as-is.
                None => word.push('\\', true),
            }
            continue;
        }

        if c == '"' {
            in_double_quote = !in_double_quote;
            word.started = true; // Quote characters imply a token exists (even if empty)
            word.buf_quoted = true;
            continue;
        }

        if c == '$' {
            match read_variable_name(&mut chars)? {
                Some(name) => word.push_variable(name),
                None => word.push('$', in_double_quote),
            }
            continue;
        }

        if in_double_quote {
            word.push(c, true);
            continue;
        }

        match c {
            '\'' => {
                in_single_quote = true;
                word.started = true;
                word.buf_quoted = true;
            }
            '#' if !word.started => {
                // Comment runs to the end of the line.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        tokens.push(Token::Newline);
                        break;
                    }
                }
            }
            '\n' => {
                tokens.extend(word.finish().map(Token::Word));
                tokens.push(Token::Newline);
            }
            c if c.is_whitespace() => tokens.extend(word.finish().map(Token::Word)),
            '=' => word.push_equals(),
            ';' => {
                tokens.extend(word.finish().map(Token::Word));
                tokens.push(Token::Semi);
            }
            '|' => {
                tokens.extend(word.finish().map(Token::Word));
                if chars.next_if_eq(&'|').is_some() {
                    tokens.push(Token::OrIf);
                } else {
                    tokens.push(Token::Pipe);
                }
            }
            '&' => {
                tokens.extend(word.finish().map(Token::Word));
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::AndIf);
                } else if chars.next_if_eq(&'>').is_some() {
                    tokens.push(Token::Redirect(RedirectOp::Both(write_mode(&mut chars))));
                } else {
                    tokens.push(Token::Amp);
                }
            }
            '<' => {
                tokens.extend(word.finish().map(Token::Word));
                tokens.push(Token::Redirect(RedirectOp::Input));
            }
            '>' => {
                if word.is_stderr_prefix() {
                    word = WordBuilder::default();
                    tokens.push(Token::Redirect(RedirectOp::Error(write_mode(&mut chars))));
                } else {
                    tokens.extend(word.finish().map(Token::Word));
                    tokens.push(Token::Redirect(RedirectOp::Output(write_mode(&mut chars))));
                }
            }
            c => word.push(c, false),
        }
    }

    if in_single_quote || in_double_quote {
        bail!("unterminated quote");
    }
    tokens.extend(word.finish().map(Token::Word));
    Ok(tokens)
}

fn write_mode(chars: &mut Peekable<Chars<'_>>) -> WriteMode {
    if chars.next_if_eq(&'>').is_some() {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> anyhow::Error {
        match self.peek() {
            Some(token) => anyhow::anyhow!("syntax error near unexpected token {}", token),
            None => anyhow::anyhow!("syntax error: unexpected end of input"),
        }
    }

    fn eat_separator(&mut self) -> bool {
        self.eat(&Token::Semi) || self.eat(&Token::Newline)
    }

    // A line may continue after '&&', '||' or '|', but an explicit ';' may not follow them.
    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    // sequence := parallel ( (';' | newline) parallel? )*
    fn parse_sequence(&mut self) -> Result<Option<CommandTree>> {
        let mut tree: Option<CommandTree> = None;
        loop {
            while self.eat_separator() {}
            if self.peek().is_none() {
                return Ok(tree);
            }
            let next = self.parse_parallel()?;
            tree = Some(match tree {
                None => next,
                Some(prev) => CommandTree::node(Operator::Sequence, prev, next),
            });
            if self.peek().is_some() && !self.eat_separator() {
                return Err(self.unexpected());
            }
        }
    }

    // parallel := conditional ( '&' conditional )*
    fn parse_parallel(&mut self) -> Result<CommandTree> {
        let mut tree = self.parse_conditional()?;
        while self.eat(&Token::Amp) {
            if matches!(self.peek(), None | Some(Token::Semi) | Some(Token::Newline)) {
                bail!("background jobs are not supported: '&' needs a command on its right");
            }
            let right = self.parse_conditional()?;
            tree = CommandTree::node(Operator::Parallel, tree, right);
        }
        Ok(tree)
    }

    // conditional := pipeline ( ('&&' | '||') pipeline )*
    fn parse_conditional(&mut self) -> Result<CommandTree> {
        let mut tree = self.parse_pipeline()?;
        loop {
            let op = if self.eat(&Token::AndIf) {
                Operator::And
            } else if self.eat(&Token::OrIf) {
                Operator::Or
            } else {
                return Ok(tree);
            };
            self.skip_newlines();
            let right = self.parse_pipeline()?;
            tree = CommandTree::node(op, tree, right);
        }
    }

    // pipeline := simple ( '|' simple )*
    fn parse_pipeline(&mut self) -> Result<CommandTree> {
        let mut tree = self.parse_simple()?;
        while self.eat(&Token::Pipe) {
            self.skip_newlines();
            let right = self.parse_simple()?;
            tree = CommandTree::node(Operator::Pipe, tree, right);
        }
        Ok(tree)
    }

    fn parse_simple(&mut self) -> Result<CommandTree> {
        let mut words = Vec::new();
        let mut redirects = Redirections::default();

        loop {
            match self.peek().cloned() {
                Some(Token::Word(word)) => {
                    self.pos += 1;
                    words.push(word);
                }
                Some(Token::Redirect(op)) => {
                    self.pos += 1;
                    let Some(Token::Word(path)) = self.peek().cloned() else {
                        bail!("expected a file name after {}", Token::Redirect(op));
                    };
                    self.pos += 1;
                    match op {
                        RedirectOp::Input => redirects.input = Some(path),
                        RedirectOp::Output(mode) => redirects.output = Some(OutputTarget { path, mode }),
                        RedirectOp::Error(mode) => redirects.error = Some(OutputTarget { path, mode }),
                        RedirectOp::Both(mode) => {
                            redirects.output = Some(OutputTarget { path: path.clone(), mode });
                            redirects.error = Some(OutputTarget { path, mode });
                        }
                    }
                }
                _ => break,
            }
        }

        if words.is_empty() {
            if redirects.is_empty() {
                return Err(self.unexpected());
            }
            bail!("missing command before redirection");
        }
        let verb = words.remove(0);
        Ok(CommandTree::Leaf(SimpleCommand {
            verb,
            params: words,
            redirects,
        }))
    }
}

/// Parses one input line (or several, separated by newlines) into a command tree.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(input: &str) -> Result<Option<CommandTree>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_sequence()
}
