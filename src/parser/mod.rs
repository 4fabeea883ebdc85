//! PEST-based parser for the Flow language
//!
//! Turns source text into the located AST of [`crate::ast`]. Most callers want
//! [`crate::program::Program::parse`], which never fails and carries the
//! diagnostic as data; the functions here return a [`ParseError`] instead.

use pest::Parser;
use pest_derive::Parser;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::{
    ArrayLiteral, Assignment, AwaitExpression, BinaryChain, BinaryOperator, Block, Break,
    ConditionalBlock, Delay, DictionaryEntry, DictionaryLiteral, DurationUnit, Expr,
    ExpressionStatement, FunctionArgument, FunctionCall, Identifier, IdentifierPath,
    IfStatement, Import, Literal, LiteralValue, Located, Operation, Parameter, Program, Raise,
    RepeatStatement, Return, Signature, Span, Stmt, TryExpression, UnaryExpression,
    UnaryOperator, VariableDeclaration, WorkflowDefinition,
};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/flow.pest"]
pub(crate) struct FlowParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String, Option<Span>),
    #[error("{0}")]
    Build(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax(_, span) | ParseError::Build(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax(msg, _) | ParseError::Build(msg, _) => msg,
        }
    }

    /// Byte offset of the furthest position the parser reached
    pub fn offset(&self) -> usize {
        self.span().map(|s| s.start).unwrap_or(0)
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span((start, end)) => (start, end),
        };
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Span {
                start,
                end,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            },
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Span {
                    start,
                    end,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                }
            }
        };
        ParseError::Syntax(err.to_string(), Some(span))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Source text with the byte offset of every line start
pub(crate) struct SourceText<'s> {
    text: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> SourceText<'s> {
    pub(crate) fn new(text: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// 0-indexed (line, column) of a byte offset, columns counted in chars
    pub(crate) fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = self
            .text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        (line, col)
    }
}

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<'_>, source: &SourceText<'_>) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = source.line_col(start);
    let (end_line, end_col) = source.line_col(end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/* ===================== Public API ===================== */

/// Parse a complete Flow source file
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut pairs = FlowParser::parse(Rule::program, source)?;
    let program = next_child(&mut pairs, "program", Span::default())?;
    build_program(program, &SourceText::new(source))
}

/// Parse a single expression (testing and tooling API)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut pairs = FlowParser::parse(Rule::expression_only, source)?;
    let source = &SourceText::new(source);
    let root = next_child(&mut pairs, "expression", Span::default())?;
    let span = pair_to_span(&root, source);
    let expression = next_child(&mut children(root), "expression", span)?;
    build_expression(expression, source)
}

/* ===================== Pair Helpers ===================== */

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_import
            | Rule::kw_delay
            | Rule::kw_return
            | Rule::kw_raise
            | Rule::kw_break
            | Rule::kw_try
            | Rule::kw_repeat
            | Rule::kw_if
            | Rule::kw_elif
            | Rule::kw_else
            | Rule::kw_await
            | Rule::kw_for
            | Rule::kw_workflow
    )
}

/// Inner pairs without keyword tokens and end-of-input markers
fn children(pair: Pair<'_>) -> impl Iterator<Item = Pair<'_>> {
    pair.into_inner()
        .filter(|p| !is_keyword(p.as_rule()) && p.as_rule() != Rule::EOI)
}

fn next_child<'i>(
    inner: &mut impl Iterator<Item = Pair<'i>>,
    what: &str,
    span: Span,
) -> ParseResult<Pair<'i>> {
    inner
        .next()
        .ok_or_else(|| ParseError::Build(format!("Missing {}", what), Some(span)))
}

/* ===================== Statement Builder ===================== */

fn build_program(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Program> {
    let span = pair_to_span(&pair, source);
    let statements = children(pair)
        .map(|stmt_pair| build_statement(stmt_pair, source))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(Program { statements, span })
}

fn build_block(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Block> {
    let span = pair_to_span(&pair, source);
    let statements = children(pair)
        .map(|stmt_pair| build_statement(stmt_pair, source))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(Block { statements, span })
}

fn build_statement(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    match pair.as_rule() {
        Rule::statement => {
            // statement = { <kind> ~ ";"* }; terminators are silent
            let inner = next_child(&mut children(pair), "statement", span)?;
            build_statement(inner, source)
        }
        Rule::import_statement => {
            let path = next_child(&mut children(pair), "import path", span)?;
            Ok(Stmt::Import(Import {
                path: build_identifier_path(path, source),
                span,
            }))
        }
        Rule::delay_statement => {
            let expr = next_child(&mut children(pair), "delay duration", span)?;
            Ok(Stmt::Delay(Delay {
                duration: build_expression(expr, source)?,
                span,
            }))
        }
        Rule::return_statement => {
            let expr = next_child(&mut children(pair), "return value", span)?;
            Ok(Stmt::Return(Return {
                value: build_expression(expr, source)?,
                span,
            }))
        }
        Rule::raise_statement => {
            let expr = next_child(&mut children(pair), "raised value", span)?;
            Ok(Stmt::Raise(Raise {
                value: build_expression(expr, source)?,
                span,
            }))
        }
        Rule::break_statement => Ok(Stmt::Break(Break { span })),
        Rule::variable_declaration => build_variable_declaration(pair, source),
        Rule::assignment => {
            let mut inner = children(pair);
            let target = next_child(&mut inner, "assignment target", span)?;
            let value = next_child(&mut inner, "assigned value", span)?;
            Ok(Stmt::Assignment(Assignment {
                target: build_identifier_path(target, source),
                value: build_expression(value, source)?,
                span,
            }))
        }
        Rule::expression_statement => {
            let expr = next_child(&mut children(pair), "expression", span)?;
            Ok(Stmt::Expression(ExpressionStatement {
                expression: build_expression(expr, source)?,
                span,
            }))
        }
        Rule::if_statement => build_if_statement(pair, source),
        Rule::repeat_statement => {
            let block = next_child(&mut children(pair), "repeat body", span)?;
            Ok(Stmt::Repeat(Box::new(RepeatStatement {
                body: build_block(block, source)?,
                span,
            })))
        }
        Rule::workflow_definition => build_workflow_definition(pair, source),
        _ => Err(ParseError::Build(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_variable_declaration(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let name = build_identifier(next_child(&mut inner, "variable name", span)?, source);
    let type_name = build_identifier(next_child(&mut inner, "variable type", span)?, source);
    let value = inner
        .next()
        .map(|expr| build_expression(expr, source))
        .transpose()?;

    Ok(Stmt::Declaration(VariableDeclaration {
        name,
        type_name,
        value,
        span,
    }))
}

fn build_if_statement(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let if_block = build_conditional(next_child(&mut inner, "if condition", span)?, source)?;
    let mut elif_blocks = Vec::new();
    let mut else_block = None;

    for branch in inner {
        match branch.as_rule() {
            Rule::conditional => elif_blocks.push(build_conditional(branch, source)?),
            Rule::block => else_block = Some(build_block(branch, source)?),
            rule => {
                return Err(ParseError::Build(
                    format!("Unexpected if branch: {:?}", rule),
                    Some(pair_to_span(&branch, source)),
                ))
            }
        }
    }

    Ok(Stmt::If(Box::new(IfStatement {
        if_block,
        elif_blocks,
        else_block,
        span,
    })))
}

fn build_conditional(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<ConditionalBlock> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);
    let condition = build_expression(next_child(&mut inner, "condition", span)?, source)?;
    let body = build_block(next_child(&mut inner, "conditional body", span)?, source)?;
    Ok(ConditionalBlock {
        condition,
        body,
        span,
    })
}

fn build_workflow_definition(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let name = build_identifier(next_child(&mut inner, "workflow name", span)?, source);
    let mut signature = None;
    let mut body = None;

    for part in inner {
        match part.as_rule() {
            Rule::signature => signature = Some(build_signature(part, source)?),
            Rule::block => body = Some(build_block(part, source)?),
            rule => {
                return Err(ParseError::Build(
                    format!("Unexpected workflow part: {:?}", rule),
                    Some(pair_to_span(&part, source)),
                ))
            }
        }
    }

    let body = body.ok_or_else(|| {
        ParseError::Build("Missing workflow body".to_string(), Some(span))
    })?;

    Ok(Stmt::Workflow(Arc::new(WorkflowDefinition {
        name,
        signature,
        body,
        span,
    })))
}

fn build_signature(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Signature> {
    let span = pair_to_span(&pair, source);
    let mut parameters = Vec::new();
    let mut return_type = None;

    for part in children(pair) {
        let part_span = pair_to_span(&part, source);
        match part.as_rule() {
            Rule::parameter => {
                let mut inner = children(part);
                let name = build_identifier(next_child(&mut inner, "parameter name", part_span)?, source);
                let type_name =
                    build_identifier(next_child(&mut inner, "parameter type", part_span)?, source);
                parameters.push(Parameter {
                    name,
                    type_name,
                    span: part_span,
                });
            }
            Rule::return_type => {
                let id = next_child(&mut children(part), "return type", part_span)?;
                return_type = Some(build_identifier(id, source));
            }
            rule => {
                return Err(ParseError::Build(
                    format!("Unexpected signature part: {:?}", rule),
                    Some(part_span),
                ))
            }
        }
    }

    Ok(Signature {
        parameters,
        return_type,
        span,
    })
}

/* ===================== Expression Builder ===================== */

fn build_identifier(pair: Pair<'_>, source: &SourceText<'_>) -> Identifier {
    Identifier {
        name: pair.as_str().to_string(),
        span: pair_to_span(&pair, source),
    }
}

fn build_identifier_path(pair: Pair<'_>, source: &SourceText<'_>) -> IdentifierPath {
    let span = pair_to_span(&pair, source);
    let segments = children(pair)
        .map(|id| build_identifier(id, source))
        .collect();
    IdentifierPath { segments, span }
}

fn build_expression(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    match pair.as_rule() {
        Rule::expression | Rule::primary => {
            // expression = { logical }, primary = { <alternative> | "(" ~ expression ~ ")" }
            let inner = next_child(&mut children(pair), "expression", span)?;
            build_expression(inner, source)
        }
        Rule::logical
        | Rule::equality
        | Rule::relational
        | Rule::additive
        | Rule::multiplicative => build_binary_chain(pair, source),
        Rule::unary => build_unary(pair, source),
        Rule::literal => build_literal(pair, source).map(Expr::Literal),
        Rule::identifier_path => Ok(Expr::Path(build_identifier_path(pair, source))),
        Rule::function_call => build_function_call(pair, source),
        Rule::array => {
            let elements = children(pair)
                .map(|element| build_expression(element, source))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::Array(ArrayLiteral { elements, span }))
        }
        Rule::dictionary => {
            let mut entries = Vec::new();
            for entry in children(pair) {
                let entry_span = pair_to_span(&entry, source);
                let mut inner = children(entry);
                let key = build_identifier(next_child(&mut inner, "dictionary key", entry_span)?, source);
                let value = build_expression(
                    next_child(&mut inner, "dictionary value", entry_span)?,
                    source,
                )?;
                entries.push(DictionaryEntry {
                    key,
                    value,
                    span: entry_span,
                });
            }
            Ok(Expr::Dictionary(DictionaryLiteral { entries, span }))
        }
        Rule::await_expression => {
            let mut inner = children(pair);
            let expression = build_expression(next_child(&mut inner, "awaited expression", span)?, source)?;
            let duration = build_expression(next_child(&mut inner, "await duration", span)?, source)?;
            Ok(Expr::Await(AwaitExpression {
                expression: Box::new(expression),
                duration: Box::new(duration),
                span,
            }))
        }
        Rule::try_expression => {
            let expression = build_expression(next_child(&mut children(pair), "tried expression", span)?, source)?;
            Ok(Expr::Try(TryExpression {
                expression: Box::new(expression),
                span,
            }))
        }
        _ => Err(ParseError::Build(
            format!("Unexpected expression rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn binary_operator(rule: Rule) -> Option<BinaryOperator> {
    let op = match rule {
        Rule::op_mult => BinaryOperator::Mult,
        Rule::op_div => BinaryOperator::Div,
        Rule::op_plus => BinaryOperator::Plus,
        Rule::op_minus => BinaryOperator::Minus,
        Rule::op_less => BinaryOperator::Less,
        Rule::op_less_eq => BinaryOperator::LessEq,
        Rule::op_greater => BinaryOperator::Greater,
        Rule::op_greater_eq => BinaryOperator::GreaterEq,
        Rule::op_eq => BinaryOperator::Eq,
        Rule::op_not_eq => BinaryOperator::NotEq,
        Rule::op_in => BinaryOperator::In,
        Rule::op_is => BinaryOperator::Is,
        Rule::op_and => BinaryOperator::And,
        Rule::op_or => BinaryOperator::Or,
        _ => return None,
    };
    Some(op)
}

/// Build one precedence level: `operand (op operand)*`.
///
/// A level without operators collapses to its single operand.
fn build_binary_chain(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let first = build_expression(next_child(&mut inner, "left operand", span)?, source)?;
    let mut operations = Vec::new();

    while let Some(op_pair) = inner.next() {
        let op_span = pair_to_span(&op_pair, source);
        let op = binary_operator(op_pair.as_rule()).ok_or_else(|| {
            ParseError::Build(
                format!("Unknown binary operator: {:?}", op_pair.as_rule()),
                Some(op_span),
            )
        })?;
        let operand_pair = inner.next().ok_or_else(|| {
            ParseError::Build(
                "Missing right operand after operator".to_string(),
                Some(op_span),
            )
        })?;
        let operand = build_expression(operand_pair, source)?;
        operations.push(Operation {
            op,
            span: op_span.merge(&operand.span()),
            operand,
        });
    }

    if operations.is_empty() {
        return Ok(first);
    }

    Ok(Expr::Binary(BinaryChain {
        first: Box::new(first),
        operations,
        span,
    }))
}

fn build_unary(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);
    let head = next_child(&mut inner, "operand", span)?;

    let op = match head.as_rule() {
        Rule::op_plus => UnaryOperator::Plus,
        Rule::op_minus => UnaryOperator::Minus,
        Rule::op_not => UnaryOperator::Not,
        _ => return build_expression(head, source),
    };

    let operand = build_expression(next_child(&mut inner, "operand", span)?, source)?;
    Ok(Expr::Unary(UnaryExpression {
        op,
        operand: Box::new(operand),
        span,
    }))
}

fn build_literal(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Literal> {
    let span = pair_to_span(&pair, source);
    let inner = next_child(&mut children(pair), "literal", span)?;

    let value = match inner.as_rule() {
        Rule::string_triple | Rule::string_single => {
            // Quotes are outside the captured content
            let content = next_child(&mut children(inner), "string content", span)?;
            LiteralValue::String(content.as_str().to_string())
        }
        Rule::boolean => LiteralValue::Boolean(inner.as_str() == "true"),
        Rule::duration => {
            let mut parts = children(inner);
            let count_pair = next_child(&mut parts, "duration count", span)?;
            let unit_pair = next_child(&mut parts, "duration unit", span)?;
            let count = count_pair.as_str().parse::<u64>().map_err(|e| {
                ParseError::Build(
                    format!("Invalid duration count '{}': {}", count_pair.as_str(), e),
                    Some(span),
                )
            })?;
            let unit = DurationUnit::from_suffix(unit_pair.as_str()).ok_or_else(|| {
                ParseError::Build(
                    format!("Unknown duration unit '{}'", unit_pair.as_str()),
                    Some(span),
                )
            })?;
            LiteralValue::Duration { count, unit }
        }
        Rule::real => {
            let text = inner.as_str();
            let value = text.parse::<f64>().map_err(|e| {
                ParseError::Build(
                    format!("Failed to parse real '{}': {}", text, e),
                    Some(span),
                )
            })?;
            LiteralValue::Real(value)
        }
        Rule::integer => {
            let text = inner.as_str();
            let value = text.parse::<i64>().map_err(|e| {
                ParseError::Build(
                    format!("Failed to parse integer '{}': {}", text, e),
                    Some(span),
                )
            })?;
            LiteralValue::Integer(value)
        }
        rule => {
            return Err(ParseError::Build(
                format!("Unexpected literal rule: {:?}", rule),
                Some(span),
            ))
        }
    };

    Ok(Literal { value, span })
}

fn build_function_call(pair: Pair<'_>, source: &SourceText<'_>) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let path = build_identifier_path(next_child(&mut inner, "callee", span)?, source);
    let arguments_pair = next_child(&mut inner, "arguments", span)?;
    let arguments_span = pair_to_span(&arguments_pair, source);

    let mut arguments = Vec::new();
    for argument in children(arguments_pair) {
        let argument_span = pair_to_span(&argument, source);
        let mut parts = children(argument).peekable();
        let named = parts
            .peek()
            .map(|p| p.as_rule() == Rule::identifier)
            .unwrap_or(false);
        let name = if named {
            parts.next().map(|p| build_identifier(p, source))
        } else {
            None
        };
        let value = build_expression(next_child(&mut parts, "argument value", argument_span)?, source)?;
        arguments.push(FunctionArgument {
            name,
            value,
            span: argument_span,
        });
    }

    Ok(Expr::Call(FunctionCall {
        path,
        arguments,
        arguments_span,
        span,
    }))
}
