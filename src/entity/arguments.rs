//! Evaluated call arguments

use crate::ast::Span;

use super::Entity;

#[derive(Debug, Clone)]
pub struct CallArgument {
    /// Position in the call, counting named arguments too
    pub index: usize,
    pub name: Option<String>,
    pub value: Entity,
    pub location: Span,
}

/// Arguments of one call, in source order
#[derive(Debug, Clone, Default)]
pub struct CallArguments {
    arguments: Vec<CallArgument>,
    /// Span of the parenthesised list at the call site
    pub location: Span,
}

impl CallArguments {
    pub fn new(location: Span) -> Self {
        Self {
            arguments: Vec::new(),
            location,
        }
    }

    pub fn push(&mut self, name: Option<String>, value: Entity, location: Span) {
        let index = self.arguments.len();
        self.arguments.push(CallArgument {
            index,
            name,
            value,
            location,
        });
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CallArgument> {
        self.arguments.iter()
    }

    pub fn get(&self, index: usize) -> Option<&CallArgument> {
        self.arguments.get(index)
    }

    /// Named argument lookup
    pub fn find(&self, name: &str) -> Option<&CallArgument> {
        self.arguments
            .iter()
            .find(|arg| arg.name.as_deref() == Some(name))
    }

    /// Argument by name, falling back to position
    pub fn named_or_positional(&self, name: &str, index: usize) -> Option<&CallArgument> {
        self.find(name).or_else(|| {
            self.arguments
                .get(index)
                .filter(|arg| arg.name.is_none())
        })
    }
}

impl<'a> IntoIterator for &'a CallArguments {
    type Item = &'a CallArgument;
    type IntoIter = std::slice::Iter<'a, CallArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.arguments.iter()
    }
}
