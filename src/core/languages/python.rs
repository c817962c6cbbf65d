use std::path::PathBuf;
use tree_sitter::{Node, Parser, Tree, TreeCursor};

use crate::error::{CallheatError, Result};
use super::super::{EntityExtractor, FileExtraction, SourceFile};
use super::{LanguageParser, Position, ScopeFrame, ScopeKind, SyntaxNode, TaggedNode};

/// Python-specific parser using Tree-sitter
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let python_language = tree_sitter_python::language();
        parser.set_language(&python_language)
            .map_err(|e| CallheatError::Config(format!("Failed to set Python language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parse source text, rejecting anything tree-sitter had to recover from
    pub fn parse_tree(&mut self, path: &str, text: &str) -> Result<Tree> {
        let tree = self.parser.parse(text, None).ok_or_else(|| CallheatError::Parse {
            path: PathBuf::from(path),
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column, message) = first_error(root)
                .unwrap_or((1, 1, "invalid syntax".to_string()));
            return Err(CallheatError::Parse {
                path: PathBuf::from(path),
                line,
                column,
                message,
            });
        }

        Ok(tree)
    }
}

impl LanguageParser for PythonParser {
    fn extract(&mut self, source: &SourceFile) -> Result<FileExtraction> {
        let tree = self.parse_tree(&source.path, &source.text)?;
        let walker = SyntaxWalker::new(&tree, source.text.as_bytes());
        Ok(EntityExtractor::new(&source.path, source.text.as_bytes()).extract(walker))
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn language_name(&self) -> &str {
        "python"
    }
}

/// Locate the first ERROR or MISSING node, depth first.
///
/// Walks with a cursor, only stepping into subtrees that contain an error,
/// so arbitrarily deep nesting costs no stack.
fn first_error(root: Node<'_>) -> Option<(usize, usize, String)> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let point = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return Some((point.row + 1, point.column + 1, message));
        }

        if !node.has_error() || !cursor.goto_first_child() {
            return None;
        }
        while !cursor.node().has_error() {
            if !cursor.goto_next_sibling() {
                return None;
            }
        }
    }
}

struct OpenScope {
    node_id: usize,
    frame: ScopeFrame,
}

/// Lazy pre-order walk over a Python syntax tree.
///
/// Yields every `function_definition` and every `call`, each tagged with its
/// position and the scopes enclosing it. Class definitions only open a scope.
pub struct SyntaxWalker<'tree> {
    cursor: TreeCursor<'tree>,
    source: &'tree [u8],
    scopes: Vec<OpenScope>,
    finished: bool,
}

impl<'tree> SyntaxWalker<'tree> {
    pub fn new(tree: &'tree Tree, source: &'tree [u8]) -> Self {
        Self {
            cursor: tree.walk(),
            source,
            scopes: Vec::new(),
            finished: false,
        }
    }

    fn frames(&self) -> Vec<ScopeFrame> {
        self.scopes.iter().map(|s| s.frame.clone()).collect()
    }

    fn tag(&self, node: Node<'tree>) -> TaggedNode<'tree> {
        TaggedNode {
            node,
            position: Position::of(node),
            scopes: self.frames(),
        }
    }

    fn open_scope(&mut self, node: Node<'tree>, kind: ScopeKind) {
        let name = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(self.source).ok())
            .unwrap_or("_")
            .to_string();

        self.scopes.push(OpenScope {
            node_id: node.id(),
            frame: ScopeFrame {
                name,
                kind,
                start_line: node.start_position().row + 1,
            },
        });
    }

    fn classify(&mut self, node: Node<'tree>) -> Option<SyntaxNode<'tree>> {
        match node.kind() {
            "function_definition" => {
                let tagged = self.tag(node);
                self.open_scope(node, ScopeKind::Function);
                Some(SyntaxNode::Definition(tagged))
            }
            "class_definition" => {
                self.open_scope(node, ScopeKind::Class);
                None
            }
            "call" => Some(SyntaxNode::Call(self.tag(node))),
            _ => None,
        }
    }

    fn close_scope(&mut self, node_id: usize) {
        if self.scopes.last().map_or(false, |s| s.node_id == node_id) {
            self.scopes.pop();
        }
    }

    fn advance(&mut self) {
        if self.cursor.goto_first_child() {
            return;
        }
        loop {
            // The current node's subtree is complete
            let node_id = self.cursor.node().id();
            self.close_scope(node_id);

            if self.cursor.goto_next_sibling() {
                return;
            }
            if !self.cursor.goto_parent() {
                self.finished = true;
                return;
            }
        }
    }
}

impl<'tree> Iterator for SyntaxWalker<'tree> {
    type Item = SyntaxNode<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let node = self.cursor.node();
            let tagged = self.classify(node);
            self.advance();
            if tagged.is_some() {
                return tagged;
            }
        }
        None
    }
}
