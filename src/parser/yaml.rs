//! Values file loader: YAML text into a positioned node tree.
//!
//! The event parser drops comments, so head comments are recovered from the
//! source lines: a mapping key or sequence element owns the contiguous run of
//! `#` lines directly above the line it starts on.

use crate::error::ValuesError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

// -- Plain scalar resolution --------------------------------------------------

static RE_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:~|null|Null|NULL)?$").unwrap());

static RE_BOOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:true|True|TRUE|false|False|FALSE)$").unwrap());

static RE_INT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-+]?[0-9]+|0x[0-9a-fA-F]+|0o[0-7]+|0b[01]+)$").unwrap()
});

static RE_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?\.(?:inf|Inf|INF)",
        r"|\.(?:nan|NaN|NAN))$"
    ))
    .unwrap()
});

static RE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}",
        r"(?:(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?",
        r"(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?)?$"
    ))
    .unwrap()
});

/// Primitive kind of a scalar, as resolved from its tag or plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Timestamp,
}

impl ScalarKind {
    fn resolve_plain(value: &str) -> Self {
        if RE_NULL.is_match(value) {
            ScalarKind::Null
        } else if RE_BOOL.is_match(value) {
            ScalarKind::Bool
        } else if RE_INT.is_match(value) {
            ScalarKind::Int
        } else if RE_FLOAT.is_match(value) {
            ScalarKind::Float
        } else if RE_TIMESTAMP.is_match(value) {
            ScalarKind::Timestamp
        } else {
            ScalarKind::Str
        }
    }
}

// -- Node model ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar { kind: ScalarKind, value: String },
    /// Key/value pairs in declaration order.
    Mapping(Vec<(Node, Node)>),
    Sequence(Vec<Node>),
    Alias(Arc<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub head_comment: String,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

impl Node {
    /// Follow aliases to the node they name.
    pub fn resolve(&self) -> &Node {
        match &self.kind {
            NodeKind::Alias(target) => target.resolve(),
            _ => self,
        }
    }

    /// Literal text of a scalar; empty for containers.
    pub fn literal(&self) -> &str {
        match &self.resolve().kind {
            NodeKind::Scalar { value, .. } => value,
            _ => "",
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Alias(_) => "alias",
        }
    }
}

// -- Tree builder -------------------------------------------------------------

struct NodeStart {
    anchor: usize,
    head_comment: String,
    line: usize,
    column: usize,
}

enum Frame {
    Mapping {
        start: NodeStart,
        entries: Vec<(Node, Node)>,
        pending_key: Option<Node>,
    },
    Sequence {
        start: NodeStart,
        items: Vec<Node>,
    },
}

struct TreeBuilder<'a> {
    lines: &'a [&'a str],
    stack: Vec<Frame>,
    anchors: HashMap<usize, Arc<Node>>,
    /// Lines whose comment run has already been handed out.
    claimed: HashSet<usize>,
    /// Lines holding block scalar content, never read as comments.
    block_lines: HashSet<usize>,
    root: Option<Node>,
    error: Option<ValuesError>,
}

impl<'a> TreeBuilder<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        TreeBuilder {
            lines,
            stack: Vec::new(),
            anchors: HashMap::new(),
            claimed: HashSet::new(),
            block_lines: HashSet::new(),
            root: None,
            error: None,
        }
    }

    fn start_node(&mut self, anchor: usize, mark: Marker) -> NodeStart {
        let line = mark.line();
        let head_comment = if self.takes_head_comment() {
            self.claim_head_comment(line)
        } else {
            String::new()
        };
        NodeStart {
            anchor,
            head_comment,
            line,
            column: mark.col() + 1,
        }
    }

    /// Keys and sequence elements carry comments; values and the root do not.
    fn takes_head_comment(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame::Mapping {
                pending_key: None,
                ..
            }) | Some(Frame::Sequence { .. })
        )
    }

    fn claim_head_comment(&mut self, line: usize) -> String {
        if line == 0 || !self.claimed.insert(line) {
            return String::new();
        }

        let above = (line - 1).min(self.lines.len());
        let mut run: Vec<&str> = (0..above)
            .rev()
            .take_while(|i| !self.block_lines.contains(&(i + 1)))
            .map(|i| self.lines[i].trim())
            .take_while(|l| l.starts_with('#'))
            .collect();
        run.reverse();
        run.join("\n")
    }

    /// Record the content lines of a literal or folded scalar whose
    /// indicator sits on `line`. Content starts at the first non-blank line
    /// indented deeper than the indicator line and runs while lines are blank
    /// or at least that deep.
    fn mark_block_scalar(&mut self, line: usize) {
        let indent = |l: &str| l.len() - l.trim_start().len();
        let parent = line
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map_or(0, |l| indent(l));
        let following = self.lines.iter().enumerate().skip(line);

        let mut content_indent = None;
        let mut last_content = None;
        for (i, text) in following {
            if text.trim().is_empty() {
                continue;
            }
            let depth = indent(text);
            match content_indent {
                None if depth > parent => content_indent = Some(depth),
                Some(min) if depth >= min => {}
                _ => break,
            }
            last_content = Some(i + 1);
        }

        if let Some(end) = last_content {
            self.block_lines.extend(line + 1..=end);
        }
    }

    /// Duplicate keys make paths ambiguous, so they are rejected.
    fn check_duplicate_key(entries: &[(Node, Node)], key: &Node) -> Option<ValuesError> {
        let NodeKind::Scalar { value, .. } = &key.kind else {
            return None;
        };
        entries
            .iter()
            .any(|(k, _)| matches!(&k.kind, NodeKind::Scalar { value: v, .. } if v == value))
            .then(|| {
                ValuesError::Yaml(format!(
                    "line {}: mapping key {:?} already defined",
                    key.line, value
                ))
            })
    }

    fn complete(&mut self, start: NodeStart, mut kind: NodeKind) {
        // Children are complete, so pruning here also covers every alias.
        match &mut kind {
            NodeKind::Mapping(entries) => {
                entries.retain(|(key, value)| !is_ignored(key) && !is_ignored(value))
            }
            NodeKind::Sequence(items) => items.retain(|item| !is_ignored(item)),
            _ => {}
        }

        let node = Node {
            kind,
            head_comment: start.head_comment,
            line: start.line,
            column: start.column,
        };
        if start.anchor > 0 {
            self.anchors.insert(start.anchor, Arc::new(node.clone()));
        }

        match self.stack.last_mut() {
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => {
                    if let Some(err) = Self::check_duplicate_key(entries, &key) {
                        self.error = Some(err);
                    }
                    entries.push((key, node));
                }
                None => *pending_key = Some(node),
            },
            Some(Frame::Sequence { items, .. }) => items.push(node),
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Scalar(value, style, anchor, ..) => {
                let start = self.start_node(anchor, mark);
                if matches!(style, TScalarStyle::Literal | TScalarStyle::Folded) {
                    self.mark_block_scalar(mark.line());
                }
                let kind = if matches!(style, TScalarStyle::Plain) {
                    ScalarKind::resolve_plain(&value)
                } else {
                    ScalarKind::Str
                };
                self.complete(start, NodeKind::Scalar { kind, value });
            }
            Event::Alias(id) => {
                let start = self.start_node(0, mark);
                match self.anchors.get(&id) {
                    Some(target) => {
                        let target = Arc::clone(target);
                        self.complete(start, NodeKind::Alias(target));
                    }
                    None => self.error = Some(ValuesError::UnknownAlias(id)),
                }
            }
            Event::MappingStart(anchor, ..) => {
                let start = self.start_node(anchor, mark);
                self.stack.push(Frame::Mapping {
                    start,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }
            Event::SequenceStart(anchor, ..) => {
                let start = self.start_node(anchor, mark);
                self.stack.push(Frame::Sequence {
                    start,
                    items: Vec::new(),
                });
            }
            Event::MappingEnd => {
                if let Some(Frame::Mapping { start, entries, .. }) = self.stack.pop() {
                    self.complete(start, NodeKind::Mapping(entries));
                }
            }
            Event::SequenceEnd => {
                if let Some(Frame::Sequence { start, items }) = self.stack.pop() {
                    self.complete(start, NodeKind::Sequence(items));
                }
            }
            _ => {}
        }
    }
}

// -- Public API ---------------------------------------------------------------

/// Load the first document of a values file.
///
/// Returns `None` for a document without content. Entries whose head comment
/// contains `@ignore` are removed before returning.
pub fn load(source: &str) -> Result<Option<Node>, ValuesError> {
    let normalized = source.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut builder = TreeBuilder::new(&lines);
    let mut parser = Parser::new(normalized.chars());
    parser
        .load(&mut builder, false)
        .map_err(|e| ValuesError::Yaml(e.to_string()))?;

    if let Some(err) = builder.error {
        return Err(err);
    }

    Ok(builder.root)
}

fn is_ignored(node: &Node) -> bool {
    node.head_comment.contains("@ignore")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(node: &Node) -> &[(Node, Node)] {
        match &node.kind {
            NodeKind::Mapping(entries) => entries,
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    fn scalar_kind(node: &Node) -> ScalarKind {
        match &node.resolve().kind {
            NodeKind::Scalar { kind, .. } => *kind,
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn empty_document_has_no_root() {
        assert!(load("").unwrap().is_none());
        assert!(load("# only a comment\n").unwrap().is_none());
    }

    #[test]
    fn plain_scalars_are_resolved() {
        let root = load(
            "a: 1\nb: 1.5\nc: true\nd: ~\ne: \"1\"\nf: hello\ng: 2024-01-02\nh:\ni: 0x1F\nj: .inf\n",
        )
        .unwrap()
        .unwrap();
        let kinds: Vec<ScalarKind> = entries(&root).iter().map(|(_, v)| scalar_kind(v)).collect();
        assert_eq!(
            kinds,
            vec![
                ScalarKind::Int,
                ScalarKind::Float,
                ScalarKind::Bool,
                ScalarKind::Null,
                ScalarKind::Str,
                ScalarKind::Str,
                ScalarKind::Timestamp,
                ScalarKind::Null,
                ScalarKind::Int,
                ScalarKind::Float,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let root = load("a: 1\nb:\n  c: 2\n").unwrap().unwrap();
        let (b_key, b_value) = &entries(&root)[1];
        assert_eq!((b_key.line, b_key.column), (2, 1));
        let (c_key, _) = &entries(b_value)[0];
        assert_eq!((c_key.line, c_key.column), (3, 3));
    }

    #[test]
    fn head_comments_attach_to_keys() {
        let source = "\
# -- replicas
replicaCount: 1

# unrelated

# -- the image
# spans lines
image:
  # -- tag to pull
  tag: latest
";
        let root = load(source).unwrap().unwrap();
        let fields = entries(&root);
        assert_eq!(fields[0].0.head_comment, "# -- replicas");
        assert_eq!(fields[1].0.head_comment, "# -- the image\n# spans lines");
        assert_eq!(entries(&fields[1].1)[0].0.head_comment, "# -- tag to pull");
    }

    #[test]
    fn sequence_element_claims_its_comment_once() {
        let source = "\
list:
  # -- first item
  - name: a
  - name: b
";
        let root = load(source).unwrap().unwrap();
        let NodeKind::Sequence(items) = &entries(&root)[0].1.kind else {
            panic!("expected sequence");
        };
        assert_eq!(items[0].head_comment, "# -- first item");
        assert_eq!(entries(&items[0])[0].0.head_comment, "");
        assert_eq!(items[1].head_comment, "");
    }

    #[test]
    fn aliases_resolve_to_anchored_node() {
        let root = load("base: &base\n  x: 1\ncopy: *base\n").unwrap().unwrap();
        let (_, copy) = &entries(&root)[1];
        assert!(matches!(copy.kind, NodeKind::Alias(_)));
        assert_eq!(entries(copy.resolve()).len(), 1);
    }

    #[test]
    fn ignored_entries_are_removed() {
        let source = "\
keep: 1
# @ignore
drop:
  nested: true
list:
  - a
  # @ignore
  - b
";
        let root = load(source).unwrap().unwrap();
        let fields = entries(&root);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0.literal(), "keep");
        let NodeKind::Sequence(items) = &fields[1].1.kind else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn ignored_entries_vanish_from_aliases() {
        let source = "\
base: &b
  keep: 1
  # @ignore
  secret: 2
copy: *b
";
        let root = load(source).unwrap().unwrap();
        let fields = entries(&root);
        assert_eq!(entries(&fields[0].1).len(), 1);
        let copied = entries(fields[1].1.resolve());
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].0.literal(), "keep");
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = load("a: 1\na: 2\n").unwrap_err();
        assert!(matches!(&err, ValuesError::Yaml(msg) if msg.contains("already defined")));

        // Same key in sibling mappings is fine.
        assert!(load("a:\n  x: 1\nb:\n  x: 2\n").is_ok());
    }

    #[test]
    fn block_scalar_content_is_not_a_comment() {
        let source = "\
script: |
  echo hi
  # -- part of the script
next: 1
";
        let root = load(source).unwrap().unwrap();
        assert_eq!(entries(&root)[1].0.head_comment, "");

        let source = "\
outer:
  script: >
    echo hi

  # -- real comment
  next: 1
# -- top level
last: true
";
        let root = load(source).unwrap().unwrap();
        let fields = entries(&root);
        assert_eq!(entries(&fields[0].1)[1].0.head_comment, "# -- real comment");
        assert_eq!(fields[1].0.head_comment, "# -- top level");
    }

    #[test]
    fn crlf_is_normalized() {
        let root = load("# -- windows\r\nkey: value\r\n").unwrap().unwrap();
        assert_eq!(entries(&root)[0].0.head_comment, "# -- windows");
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(load("a: [1, 2"), Err(ValuesError::Yaml(_))));
    }
}
