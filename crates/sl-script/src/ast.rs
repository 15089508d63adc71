/// Source span as a byte range.
pub type Span = std::ops::Range<usize>;

/// An AST node with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The wrapped AST node.
    pub node: T,
    /// The byte range of this node in the source text.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Wrap a node with its span.
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed `.tale` file: one item per meaningful line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptFile {
    /// Items in source order.
    pub items: Vec<Spanned<Item>>,
}

/// A literal on the right-hand side of `VAR` and `~`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Double-quoted string.
    Str(String),
}

/// One line of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `INCLUDE path/to/file.tale`
    Include(String),
    /// `VAR name = literal`
    Var {
        /// Variable name.
        name: String,
        /// Initial value.
        value: Literal,
    },
    /// `== name ==`
    Knot(String),
    /// A paragraph of narrative text.
    Text(String),
    /// `-> target`
    Divert(String),
    /// `~ name = literal`
    Assign {
        /// Variable name.
        name: String,
        /// New value.
        value: Literal,
    },
    /// `* {cond} text -> target` or `+ ...` for sticky choices.
    Choice(ChoiceLine),
    /// `// TODO: note`
    Todo(String),
}

/// A parsed choice line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceLine {
    /// `+` choices stay available after being taken.
    pub sticky: bool,
    /// Optional `{name}` guard.
    pub condition: Option<String>,
    /// Text shown to the player.
    pub text: String,
    /// Divert target after the arrow.
    pub target: String,
}
