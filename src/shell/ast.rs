// A fragment of a word: literal text, or a variable substituted at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    Literal(String),
    Variable(String),
}

// Word is a chain of fragments, e.g. "out_$N.txt" is [Literal("out_"), Variable("N"), Literal(".txt")]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Word(pub Vec<WordPart>);

impl Word {
    #[cfg(test)]
    pub fn literal(s: &str) -> Self {
        Word(vec![WordPart::Literal(s.to_string())])
    }

    #[cfg(test)]
    pub fn variable(name: &str) -> Self {
        Word(vec![WordPart::Variable(name.to_string())])
    }

    /// Splits `NAME=value...` into the name and the value fragments.
    ///
    /// Only the shape the parser produces for an unquoted assignment matches:
    /// a literal name followed by a separate literal `=` fragment.
    pub fn as_assignment(&self) -> Option<(&str, &[WordPart])> {
        match self.0.as_slice() {
            [WordPart::Literal(name), WordPart::Literal(eq), value @ ..] if eq == "=" => {
                Some((name.as_str(), value))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Truncate, // >
    Append, // >>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: Word,
    pub mode: WriteMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Redirections {
    pub input: Option<Word>,
    pub output: Option<OutputTarget>,
    pub error: Option<OutputTarget>,
}

impl Redirections {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.error.is_none()
    }
}

// Simple command: "grep -n $PATTERN < in.txt > out.txt"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub verb: Word,
    pub params: Vec<Word>,
    pub redirects: Redirections,
}

impl SimpleCommand {
    #[cfg(test)]
    pub fn new(verb: Word, params: Vec<Word>) -> Self {
        Self {
            verb,
            params,
            redirects: Redirections::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Sequence, // ;
    And,      // &&
    Or,       // ||
    Pipe,     // |
    Parallel, // &
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTree {
    Leaf(SimpleCommand),
    Node {
        op: Operator,
        left: Box<CommandTree>,
        right: Box<CommandTree>,
    },
}

impl CommandTree {
    pub fn node(op: Operator, left: CommandTree, right: CommandTree) -> Self {
        CommandTree::Node {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
