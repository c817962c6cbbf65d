//! Entity extraction for Python syntax trees
//!
//! Turns the walker's definition and call nodes into [`FunctionEntity`]
//! records and unresolved [`CallSite`]s for one file.
//!
//! The complexity score is a heuristic proxy, not cyclomatic complexity:
//! a flat count of the statements directly in a body. Compound statements
//! count once, whatever their blocks hold. `pass`, a bare `...` and the
//! docstring do not count, so a placeholder body scores 0.

use serde::{Serialize, Deserialize};
use tree_sitter::Node;

use super::call_graph::{FunctionEntity, FunctionKind};
use super::languages::{ScopeFrame, ScopeKind, SyntaxNode, TaggedNode};

const DOC_EXCERPT_LIMIT: usize = 200;
const DOCSTRING_PREFIXES: &[&str] = &["", "r", "u", "R", "U"];

/// Level of a scope a call can be resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeLevel {
    Module,
    Class,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosingScope {
    pub qualified_path: String,
    pub level: ScopeLevel,
}

/// What a call site names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTarget {
    /// Simple name being called (`c` in `a.b.c()`)
    pub name: String,
    /// Text of the object the name is looked up on, if any (`a.b`)
    pub receiver: Option<String>,
}

impl CallTarget {
    /// `self.x()` / `cls.x()` style receivers
    pub fn is_self_receiver(&self) -> bool {
        matches!(self.receiver.as_deref(), Some("self") | Some("cls"))
    }
}

/// A call inside a function body, not yet resolved to a callee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub caller_id: String,
    /// `None` when the callee is not a name (subscripts, lambdas, ...)
    pub target: Option<CallTarget>,
    /// Innermost first, ending with the module
    pub scopes: Vec<EnclosingScope>,
    pub source_file: String,
    pub line: usize,
}

/// Isolated per-file result, merged after all files are processed
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub source_file: String,
    pub module: String,
    pub entities: Vec<FunctionEntity>,
    pub calls: Vec<CallSite>,
}

/// Dotted module name for a file path: `pkg/engine.py` → `pkg.engine`
pub fn module_name(path: &str) -> String {
    let trimmed = path.strip_suffix(".py").unwrap_or(path);
    trimmed
        .split(|c| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join(".")
}

fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

pub struct EntityExtractor<'a> {
    source_file: &'a str,
    source: &'a [u8],
    module: String,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(source_file: &'a str, source: &'a [u8]) -> Self {
        Self {
            source_file,
            source,
            module: module_name(source_file),
        }
    }

    /// Drain the walker into entities and call sites
    pub fn extract<'tree>(self, nodes: impl Iterator<Item = SyntaxNode<'tree>>) -> FileExtraction {
        let mut entities = Vec::new();
        let mut calls = Vec::new();

        for item in nodes {
            match item {
                SyntaxNode::Definition(tagged) => {
                    if let Some(entity) = self.entity(&tagged) {
                        entities.push(entity);
                    }
                }
                SyntaxNode::Call(tagged) => {
                    if let Some(site) = self.call_site(&tagged) {
                        calls.push(site);
                    }
                }
            }
        }

        FileExtraction {
            source_file: self.source_file.to_string(),
            module: self.module,
            entities,
            calls,
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn qualified_path(&self, scopes: &[ScopeFrame], name: &str) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(scopes.len() + 2);
        parts.push(&self.module);
        parts.extend(scopes.iter().map(|s| s.name.as_str()));
        parts.push(name);
        join_path(&parts)
    }

    fn entity(&self, tagged: &TaggedNode<'_>) -> Option<FunctionEntity> {
        let node = tagged.node;
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body");

        let kind = self.kind(node, &tagged.scopes);
        let doc_excerpt = body.and_then(|b| self.docstring(b)).unwrap_or_default();
        let complexity = body.map_or(0, |b| self.complexity(b));

        Some(FunctionEntity::new(
            name.clone(),
            self.qualified_path(&tagged.scopes, &name),
            kind,
            doc_excerpt,
            complexity,
            self.source_file.to_string(),
            (tagged.position.start_line, tagged.position.end_line),
        ))
    }

    fn kind(&self, node: Node<'_>, scopes: &[ScopeFrame]) -> FunctionKind {
        let is_async = node.child(0).map_or(false, |c| c.kind() == "async");
        let in_class = scopes.last().map_or(false, |s| s.kind == ScopeKind::Class);
        let decorators = self.decorators(node);
        let decorated = |wanted: &str| decorators.iter().any(|d| d == wanted);

        match (in_class, is_async) {
            (true, _) if decorated("staticmethod") => FunctionKind::StaticMethod,
            (true, _) if decorated("classmethod") => FunctionKind::ClassMethod,
            (true, true) => FunctionKind::AsyncMethod,
            (true, false) => FunctionKind::Method,
            (false, true) => FunctionKind::AsyncFunction,
            (false, false) => FunctionKind::Function,
        }
    }

    /// Decorator names, arguments dropped and only the last dotted segment kept
    fn decorators(&self, node: Node<'_>) -> Vec<String> {
        let Some(parent) = node.parent().filter(|p| p.kind() == "decorated_definition") else {
            return Vec::new();
        };

        let mut cursor = parent.walk();
        parent
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| decorator.named_child(0))
            .filter_map(|expr| self.decorator_name(expr))
            .collect()
    }

    fn decorator_name(&self, expr: Node<'_>) -> Option<String> {
        let expr = unwrap_calls(expr)?;
        match expr.kind() {
            "identifier" => Some(self.text(expr).to_string()),
            "attribute" => expr
                .child_by_field_name("attribute")
                .map(|a| self.text(a).to_string()),
            _ => None,
        }
    }

    /// First statement of a block, skipping comments
    fn first_statement<'t>(&self, body: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).find(|c| c.kind() != "comment");
        first
    }

    fn is_docstring(&self, statement: Node<'_>) -> bool {
        statement.kind() == "expression_statement"
            && statement.named_child_count() == 1
            && statement
                .named_child(0)
                .map_or(false, |c| matches!(c.kind(), "string" | "concatenated_string"))
    }

    fn docstring(&self, body: Node<'_>) -> Option<String> {
        let statement = self.first_statement(body).filter(|s| self.is_docstring(*s))?;
        let literal = statement.named_child(0)?;

        if literal.kind() != "concatenated_string" {
            return doc_excerpt(string_contents(self.text(literal))?);
        }

        // "a" "b" is one docstring; every piece must be a text literal
        let mut joined = String::new();
        let mut cursor = literal.walk();
        for piece in literal.named_children(&mut cursor).filter(|p| p.kind() == "string") {
            joined.push_str(string_contents(self.text(piece))?);
        }
        doc_excerpt(&joined)
    }

    fn complexity(&self, body: Node<'_>) -> u32 {
        let docstring = self.first_statement(body).filter(|s| self.is_docstring(*s));
        let mut cursor = body.walk();
        let total = body
            .named_children(&mut cursor)
            .filter(|statement| Some(*statement) != docstring)
            .filter(|statement| !self.is_placeholder(*statement))
            .count();
        total as u32
    }

    fn is_placeholder(&self, statement: Node<'_>) -> bool {
        match statement.kind() {
            "comment" | "pass_statement" => true,
            "expression_statement" => self.is_ellipsis(statement),
            _ => false,
        }
    }

    fn is_ellipsis(&self, statement: Node<'_>) -> bool {
        statement.named_child_count() == 1
            && statement.named_child(0).map_or(false, |c| c.kind() == "ellipsis")
    }

    fn call_site(&self, tagged: &TaggedNode<'_>) -> Option<CallSite> {
        // Only calls made from inside a function have a caller
        let innermost = tagged.scopes.last().filter(|s| s.kind == ScopeKind::Function)?;

        let caller_path = self.qualified_path(
            &tagged.scopes[..tagged.scopes.len() - 1],
            &innermost.name,
        );
        let caller_id = FunctionEntity::make_id(&caller_path, self.source_file, innermost.start_line);

        let target = tagged
            .node
            .child_by_field_name("function")
            .and_then(|callee| self.call_target(callee));

        Some(CallSite {
            caller_id,
            target,
            scopes: self.enclosing_scopes(&tagged.scopes),
            source_file: self.source_file.to_string(),
            line: tagged.position.start_line,
        })
    }

    fn enclosing_scopes(&self, frames: &[ScopeFrame]) -> Vec<EnclosingScope> {
        let mut scopes: Vec<EnclosingScope> = (0..frames.len())
            .rev()
            .map(|depth| {
                let frame = &frames[depth];
                EnclosingScope {
                    qualified_path: self.qualified_path(&frames[..depth], &frame.name),
                    level: match frame.kind {
                        ScopeKind::Function => ScopeLevel::Function,
                        ScopeKind::Class => ScopeLevel::Class,
                    },
                }
            })
            .collect();

        scopes.push(EnclosingScope {
            qualified_path: self.module.clone(),
            level: ScopeLevel::Module,
        });
        scopes
    }

    fn call_target(&self, callee: Node<'_>) -> Option<CallTarget> {
        // `factory()(...)` calls whatever the factory names
        let callee = unwrap_calls(callee)?;
        match callee.kind() {
            "identifier" => Some(CallTarget {
                name: self.text(callee).to_string(),
                receiver: None,
            }),
            "attribute" => {
                let name = self.text(callee.child_by_field_name("attribute")?).to_string();
                let receiver = callee
                    .child_by_field_name("object")
                    .map(|object| self.text(object).to_string());
                Some(CallTarget { name, receiver })
            }
            _ => None,
        }
    }
}

/// Strip `f(...)(...)` down to the innermost callee `f`
fn unwrap_calls(mut node: Node<'_>) -> Option<Node<'_>> {
    while node.kind() == "call" {
        node = node.child_by_field_name("function")?;
    }
    Some(node)
}

/// Text of a string literal without prefix or quotes; `None` for bytes and f-strings
fn string_contents(literal: &str) -> Option<&str> {
    let quote_start = literal.find(|c| c == '"' || c == '\'')?;
    let (prefix, quoted) = literal.split_at(quote_start);
    if !DOCSTRING_PREFIXES.contains(&prefix) {
        return None;
    }

    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| {
            (quoted.len() >= 2 * q.len() && quoted.starts_with(q) && quoted.ends_with(q))
                .then(|| &quoted[q.len()..quoted.len() - q.len()])
        })
        .unwrap_or(quoted);
    Some(inner)
}

/// First non-empty line of docstring text, trimmed and capped
fn doc_excerpt(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(DOC_EXCERPT_LIMIT).collect())
}
