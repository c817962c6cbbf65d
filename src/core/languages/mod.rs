//! Language-specific parsers
//!
//! A language parser turns one source file into a syntax tree and walks it,
//! yielding definition and call nodes tagged with their position and the
//! chain of scopes that enclose them.

mod python;

pub use python::{PythonParser, SyntaxWalker};

use tree_sitter::Node;

use crate::error::Result;
use super::{FileExtraction, SourceFile};

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse one file and extract its entities and call sites
    fn extract(&mut self, source: &SourceFile) -> Result<FileExtraction>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Byte and line span of a node; lines are 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Position {
    pub fn of(node: Node<'_>) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Function,
    Class,
}

/// One enclosing scope, outermost first in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub name: String,
    pub kind: ScopeKind,
    /// Line of the defining keyword
    pub start_line: usize,
}

/// A syntax node plus where it sits
#[derive(Debug, Clone)]
pub struct TaggedNode<'tree> {
    pub node: Node<'tree>,
    pub position: Position,
    /// Enclosing scopes, outermost first, not including the node itself
    pub scopes: Vec<ScopeFrame>,
}

/// Nodes the walker reports
#[derive(Debug, Clone)]
pub enum SyntaxNode<'tree> {
    Definition(TaggedNode<'tree>),
    Call(TaggedNode<'tree>),
}
