//! Reference extraction from object definitions and dependency ordering

use indexmap::IndexMap;
use std::collections::HashSet;

/// Dependency graph over named objects, remembering insertion order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and the names it references
    pub fn add_object(&mut self, name: impl Into<String>, depends_on: Vec<String>) {
        let entry = self.edges.entry(name.into()).or_default();
        for dep in depends_on {
            if !entry.contains(&dep) {
                entry.push(dep);
            }
        }
    }

    /// Names an object references, including names outside the graph
    pub fn depends_on(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Objects in the graph that reference `name`
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|dep| dep.eq_ignore_ascii_case(name)))
            .map(|(object, _)| object.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Graph member a reference resolves to, matching names case-insensitively
    fn resolve(&self, reference: &str) -> Option<&str> {
        self.edges
            .keys()
            .find(|key| key.eq_ignore_ascii_case(reference))
            .map(String::as_str)
    }

    /// Objects ordered so each comes after the graph members it references.
    ///
    /// Among objects whose dependencies are satisfied, insertion order wins,
    /// so the result is deterministic. Members of a cycle are emitted in
    /// insertion order once nothing else can make progress.
    pub fn topological_order(&self) -> Vec<String> {
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order = Vec::with_capacity(self.edges.len());

        while order.len() < self.edges.len() {
            let ready = self.edges.iter().find(|(name, deps)| {
                !emitted.contains(name.as_str())
                    && deps.iter().all(|dep| match self.resolve(dep) {
                        Some(target) => target == name.as_str() || emitted.contains(target),
                        None => true,
                    })
            });

            let next = match ready {
                Some((name, _)) => name.as_str(),
                None => {
                    let Some(stuck) = self.edges.keys().find(|name| !emitted.contains(name.as_str()))
                    else {
                        break;
                    };
                    tracing::warn!(object = %stuck, "dependency cycle, emitting in listed order");
                    stuck.as_str()
                }
            };
            emitted.insert(next);
            order.push(next.to_string());
        }
        order
    }
}

/// Order `(name, definition)` pairs so referenced objects come first
pub fn order_by_dependencies(definitions: &[(String, String)]) -> Vec<String> {
    let mut graph = DependencyGraph::new();
    for (name, sql) in definitions {
        graph.add_object(name.clone(), extract_table_references(sql));
    }
    graph.topological_order()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare word, possibly a keyword
    Word(String),
    /// Delimited identifier with delimiters removed
    Quoted(String),
    Dot,
    Comma,
    Punct(char),
}

fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '\'' => {
                i += 1;
                while i < chars.len() {
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i += 1;
            }
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let mut ident = String::new();
                i += 1;
                while i < chars.len() {
                    if chars[i] == close {
                        if chars.get(i + 1) == Some(&close) {
                            ident.push(close);
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    ident.push(chars[i]);
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Quoted(ident));
            }
            c if c.is_alphanumeric() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => {
                tokens.push(Token::Punct(other));
                i += 1;
            }
        }
    }
    tokens
}

fn identifier(token: Option<&Token>) -> Option<&str> {
    match token {
        Some(Token::Word(word)) if !is_sql_keyword(word) => Some(word),
        Some(Token::Quoted(ident)) if !ident.is_empty() => Some(ident),
        _ => None,
    }
}

/// Read a possibly qualified name at `start`; returns its last segment and the next index
fn read_name(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let mut name = identifier(tokens.get(start))?.to_string();
    let mut next = start + 1;
    while tokens.get(next) == Some(&Token::Dot) {
        match identifier(tokens.get(next + 1)) {
            Some(segment) => {
                name = segment.to_string();
                next += 2;
            }
            None => break,
        }
    }
    // name(...) is a table function, not a relation
    if tokens.get(next) == Some(&Token::Punct('(')) {
        return None;
    }
    Some((name, next))
}

/// Skip `[AS] alias` after a relation name
fn skip_alias(tokens: &[Token], mut index: usize) -> usize {
    if matches!(tokens.get(index), Some(Token::Word(w)) if w.eq_ignore_ascii_case("AS")) {
        index += 1;
    }
    if identifier(tokens.get(index)).is_some() {
        index += 1;
    }
    index
}

/// Names of relations referenced after `FROM` and `JOIN`, in order of first appearance.
///
/// Only the last segment of qualified names is kept; comments and string
/// literals are ignored.
pub fn extract_table_references(sql: &str) -> Vec<String> {
    let tokens = tokenize(sql);
    let mut refs: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |name: String, refs: &mut Vec<String>| {
        if seen.insert(name.to_lowercase()) {
            refs.push(name);
        }
    };

    for (index, token) in tokens.iter().enumerate() {
        let Token::Word(word) = token else {
            continue;
        };
        let is_from = word.eq_ignore_ascii_case("FROM");
        if !is_from && !word.eq_ignore_ascii_case("JOIN") {
            continue;
        }
        let mut cursor = index + 1;
        while let Some((name, next)) = read_name(&tokens, cursor) {
            push(name, &mut refs);
            let after_alias = skip_alias(&tokens, next);
            if is_from && tokens.get(after_alias) == Some(&Token::Comma) {
                cursor = after_alias + 1;
            } else {
                break;
            }
        }
    }
    refs
}

fn is_sql_keyword(word: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "SELECT", "FROM", "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER", "FULL", "CROSS",
        "NATURAL", "LATERAL", "ON", "USING", "AND", "OR", "NOT", "IN", "IS", "NULL", "AS",
        "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT",
        "WITH", "VALUES", "ONLY", "WINDOW", "EXCEPT", "INTERSECT", "CASE", "WHEN", "THEN",
        "ELSE", "END",
    ];
    KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(word))
}
