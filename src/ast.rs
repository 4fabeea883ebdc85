//! Abstract Syntax Tree node types
//!
//! Passive data produced by the parser. Every node carries the [`Span`] of the
//! source text it was built from; spans are computed once by the parser and only
//! copied forward afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/* ===================== Span ===================== */

/// Source location of a node: byte range plus 0-indexed line/column of both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
    /// End line (0-indexed)
    pub end_line: usize,
    /// End column (0-indexed)
    pub end_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span that covers both self and other
    pub fn merge(&self, other: &Span) -> Span {
        let (start, start_line, start_col) = if self.start <= other.start {
            (self.start, self.start_line, self.start_col)
        } else {
            (other.start, other.start_line, other.start_col)
        };
        let (end, end_line, end_col) = if self.end >= other.end {
            (self.end, self.end_line, self.end_col)
        } else {
            (other.end, other.end_line, other.end_col)
        };
        Span::new(start, end, start_line, start_col, end_line, end_col)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Anything that knows where it came from in the source text
pub trait Located {
    fn span(&self) -> Span;
}

macro_rules! located {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Located for $ty {
                fn span(&self) -> Span {
                    self.span
                }
            }
        )*
    };
}

/* ===================== Names ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Dotted name such as `reply.status.code`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierPath {
    pub segments: Vec<Identifier>,
    pub span: Span,
}

impl IdentifierPath {
    /// First segment; the grammar guarantees at least one
    pub fn head(&self) -> &Identifier {
        &self.segments[0]
    }

    /// Segments after the first
    pub fn tail(&self) -> &[Identifier] {
        &self.segments[1..]
    }
}

impl fmt::Display for IdentifierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}

/* ===================== Literals ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Ms,
    Sec,
    Min,
    Day,
    Week,
    Month,
}

impl DurationUnit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" => Some(DurationUnit::Ms),
            "sec" => Some(DurationUnit::Sec),
            "min" | "mn" => Some(DurationUnit::Min),
            "day" => Some(DurationUnit::Day),
            "week" => Some(DurationUnit::Week),
            "month" => Some(DurationUnit::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Ms => "ms",
            DurationUnit::Sec => "sec",
            DurationUnit::Min => "min",
            DurationUnit::Day => "day",
            DurationUnit::Week => "week",
            DurationUnit::Month => "month",
        }
    }

    /// Length of one unit in milliseconds. A month counts as 30 days.
    pub fn millis(&self) -> u64 {
        match self {
            DurationUnit::Ms => 1,
            DurationUnit::Sec => 1_000,
            DurationUnit::Min => 60_000,
            DurationUnit::Day => 86_400_000,
            DurationUnit::Week => 7 * 86_400_000,
            DurationUnit::Month => 30 * 86_400_000,
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum LiteralValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Duration { count: u64, unit: DurationUnit },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

/* ===================== Operators ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Mult,
    Div,
    Plus,
    Minus,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    In,
    Is,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Mult => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEq => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEq => ">=",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::In => "in",
            BinaryOperator::Is => "is",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub op: UnaryOperator,
    pub operand: Box<Expr>,
    pub span: Span,
}

/// One `(operator, right operand)` step of a binary chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: BinaryOperator,
    pub operand: Expr,
    pub span: Span,
}

/// A left operand followed by operations folded left to right.
///
/// Each precedence level produces its own chain; levels without any operator
/// collapse to their operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryChain {
    pub first: Box<Expr>,
    pub operations: Vec<Operation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArgument {
    pub name: Option<Identifier>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub path: IdentifierPath,
    pub arguments: Vec<FunctionArgument>,
    /// Span of the parenthesised argument list
    pub arguments_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: Identifier,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryLiteral {
    pub entries: Vec<DictionaryEntry>,
    pub span: Span,
}

/// `await <expression> for <duration>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwaitExpression {
    pub expression: Box<Expr>,
    pub duration: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryExpression {
    pub expression: Box<Expr>,
    pub span: Span,
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Literal(Literal),
    Path(IdentifierPath),
    Call(FunctionCall),
    Array(ArrayLiteral),
    Dictionary(DictionaryLiteral),
    Unary(UnaryExpression),
    Binary(BinaryChain),
    Await(AwaitExpression),
    Try(TryExpression),
}

impl Located for Expr {
    fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Path(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Dictionary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Await(e) => e.span,
            Expr::Try(e) => e.span,
        }
    }
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub path: IdentifierPath,
    pub span: Span,
}

/// `name : type (= value)?`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: Identifier,
    pub type_name: Identifier,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: IdentifierPath,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    pub duration: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raise {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    pub expression: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBlock {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub if_block: ConditionalBlock,
    pub elif_blocks: Vec<ConditionalBlock>,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatStatement {
    pub body: Block,
    pub span: Span,
}

/// `name : type` inside a workflow signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    pub type_name: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: Identifier,
    pub signature: Option<Signature>,
    pub body: Block,
    pub span: Span,
}

impl WorkflowDefinition {
    pub fn parameters(&self) -> &[Parameter] {
        self.signature
            .as_ref()
            .map(|s| s.parameters.as_slice())
            .unwrap_or(&[])
    }

    pub fn return_type(&self) -> Option<&Identifier> {
        self.signature.as_ref().and_then(|s| s.return_type.as_ref())
    }
}

/// Statement AST node
///
/// Recursive variants are boxed; workflow definitions are shared because the
/// runtime keeps a handle on them once they are bound in a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Import(Import),
    Declaration(VariableDeclaration),
    Assignment(Assignment),
    Delay(Delay),
    Return(Return),
    Raise(Raise),
    Break(Break),
    Expression(ExpressionStatement),
    If(Box<IfStatement>),
    Repeat(Box<RepeatStatement>),
    Workflow(Arc<WorkflowDefinition>),
}

impl Located for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Import(s) => s.span,
            Stmt::Declaration(s) => s.span,
            Stmt::Assignment(s) => s.span,
            Stmt::Delay(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Raise(s) => s.span,
            Stmt::Break(s) => s.span,
            Stmt::Expression(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Repeat(s) => s.span,
            Stmt::Workflow(s) => s.span,
        }
    }
}

/// Root node: the ordered top-level statements of one source file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

located!(
    Identifier,
    IdentifierPath,
    Literal,
    UnaryExpression,
    Operation,
    BinaryChain,
    FunctionArgument,
    FunctionCall,
    ArrayLiteral,
    DictionaryEntry,
    DictionaryLiteral,
    AwaitExpression,
    TryExpression,
    Block,
    Import,
    VariableDeclaration,
    Assignment,
    Delay,
    Return,
    Raise,
    Break,
    ExpressionStatement,
    ConditionalBlock,
    IfStatement,
    RepeatStatement,
    Parameter,
    Signature,
    WorkflowDefinition,
    Program,
);

impl<T: Located + ?Sized> Located for Box<T> {
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl<T: Located + ?Sized> Located for Arc<T> {
    fn span(&self) -> Span {
        (**self).span()
    }
}
