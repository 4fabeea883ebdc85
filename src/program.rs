//! Parsed programs and located views into them
//!
//! A [`Program`] owns the source text and the AST built from it. Everything
//! downstream refers to AST nodes through [`Statement`], a borrowed view that
//! keeps the owning program at hand so any node can be turned back into a
//! source snippet or a caret diagnostic.

use std::fmt;

use crate::ast::{self, Located, Span};
use crate::parser;

/* ===================== Program ===================== */

/// Source text plus its parse result. Immutable once built.
#[derive(Debug, Clone)]
pub struct Program {
    file_name: String,
    source: String,
    ast: ast::Program,
    valid: bool,
    error_message: String,
}

impl Program {
    /// Parse `source`. Never fails: on error the program is flagged invalid and
    /// [`Program::error_message`] holds a caret diagnostic.
    pub fn parse(source: impl Into<String>, file_name: impl Into<String>) -> Self {
        let source = source.into();
        let file_name = file_name.into();

        match parser::parse(&source) {
            Ok(ast) => Self {
                file_name,
                source,
                ast,
                valid: true,
                error_message: String::new(),
            },
            Err(err) => {
                let expectation = match &err {
                    parser::ParseError::Syntax(..) => {
                        "Expecting: valid statement here:".to_string()
                    }
                    parser::ParseError::Build(msg, _) => msg.clone(),
                };
                let error_message = format!(
                    "Parsing error !!\n{}\n{}",
                    expectation,
                    annotate(&source, &file_name, err.offset())
                );
                Self {
                    file_name,
                    source,
                    ast: ast::Program::default(),
                    valid: false,
                    error_message,
                }
            }
        }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &ast::Program {
        &self.ast
    }

    /// Located view on the root node
    pub fn root(&self) -> Statement<'_, ast::Program> {
        Statement::new(self, &self.ast)
    }

    /// Source text covered by `span`, empty when out of range
    pub fn code(&self, span: Span) -> &str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    /// Caret diagnostic pointing at the start of `span`
    pub fn annotate(&self, span: Span) -> String {
        annotate(&self.source, &self.file_name, span.start)
    }
}

/// Render the line containing `offset` with a caret under it:
///
/// ```text
/// In file main.flow, line 3:
/// x = y;
///     ^_
/// ```
pub fn annotate(source: &str, file_name: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let (line, _) = parser::SourceText::new(source).line_col(offset);

    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    let line_text = source[line_start..line_end].trim_end_matches('\r');

    // Keep tabs so the caret lines up with the echoed source line
    let padding: String = source[line_start..offset]
        .chars()
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();

    format!(
        "In file {}, line {}:\n{}\n{}^_",
        file_name,
        line + 1,
        line_text,
        padding
    )
}

/* ===================== Statement ===================== */

/// Borrowed view on one AST node of a [`Program`].
///
/// Cheap to copy. `then` derives the view of a child node so the program
/// reference travels with every node the interpreter visits.
pub struct Statement<'p, T: ?Sized> {
    program: &'p Program,
    node: &'p T,
}

impl<'p, T: ?Sized> Clone for Statement<'p, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'p, T: ?Sized> Copy for Statement<'p, T> {}

impl<'p, T: ?Sized> Statement<'p, T> {
    pub fn new(program: &'p Program, node: &'p T) -> Self {
        Self { program, node }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn ast(&self) -> &'p T {
        self.node
    }

    /// View on a node reachable from this one
    pub fn then<U: ?Sized>(&self, child: &'p U) -> Statement<'p, U> {
        Statement::new(self.program, child)
    }
}

impl<'p, T: Located + ?Sized> Statement<'p, T> {
    pub fn span(&self) -> Span {
        self.node.span()
    }

    /// Source text of the node
    pub fn code(&self) -> &'p str {
        self.program.code(self.node.span())
    }
}

impl<'p, T: fmt::Debug + ?Sized> fmt::Debug for Statement<'p, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("file", &self.program.file_name)
            .field("node", &self.node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;

    #[test]
    fn test_valid_program_has_no_message() {
        let program = Program::parse("x : integer = 1;", "main.flow");
        assert!(program.valid());
        assert!(program.error_message().is_empty());
        assert_eq!(program.ast().statements.len(), 1);
    }

    #[test]
    fn test_invalid_program_has_caret_diagnostic() {
        let program = Program::parse("x : integer = 1;\ny = ;\n", "main.flow");
        assert!(!program.valid());

        let message = program.error_message();
        assert!(message.starts_with("Parsing error !!"), "{}", message);
        assert!(message.contains("In file main.flow, line 2:"), "{}", message);
        assert!(message.contains("y = ;"), "{}", message);
        assert!(message.ends_with("^_"), "{}", message);
        assert!(program.ast().statements.is_empty());
    }

    #[test]
    fn test_annotate_places_caret_under_offset() {
        let source = "first\n\tsecond line";
        let offset = source.find("line").unwrap_or(0);
        let rendered = annotate(source, "f.flow", offset);
        assert_eq!(rendered, "In file f.flow, line 2:\n\tsecond line\n\t       ^_");
    }

    #[test]
    fn test_statement_view_code() {
        let program = Program::parse("x : integer = 40 + 2;", "main.flow");
        let root = program.root();
        let stmt = root.then(&root.ast().statements[0]);
        assert_eq!(stmt.code(), "x : integer = 40 + 2");

        match stmt.ast() {
            Stmt::Declaration(decl) => {
                let value = decl.value.as_ref().map(|v| stmt.then(v));
                assert_eq!(value.map(|v| v.code()), Some("40 + 2"));
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }
}
