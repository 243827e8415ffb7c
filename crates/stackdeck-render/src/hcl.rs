//! Minimal HCL document model and writer.
//!
//! Covers what the provisioning config needs: blocks with labels, attributes
//! with literal, reference, list and object values. Output follows
//! `terraform fmt` conventions (two-space indent, `=` aligned across
//! consecutive attributes).

use std::fmt::Write as _;

/// An HCL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(i64),
    Bool(bool),
    /// A traversal emitted verbatim, e.g. `aws_subnet.private[*].id`.
    Ref(String),
    List(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

impl Expr {
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    pub fn reference(s: impl Into<String>) -> Self {
        Expr::Ref(s.into())
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Str(s.to_string())
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Num(n)
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr::Num(i64::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Attr(String, Expr),
    Block(Block),
    /// A blank separator line.
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Vec<Item>,
}

impl Block {
    pub fn new(kind: &str, labels: &[&str]) -> Self {
        Self {
            kind: kind.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            body: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<Expr>) -> Self {
        self.body.push(Item::Attr(key.to_string(), value.into()));
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.body.push(Item::Block(block));
        self
    }

    pub fn blank(mut self) -> Self {
        self.body.push(Item::Blank);
        self
    }
}

/// A top-level document: blocks separated by blank lines, each optionally
/// preceded by a comment line.
#[derive(Debug, Default)]
pub struct Document {
    blocks: Vec<(Option<String>, Block)>,
}

impl Document {
    pub fn push(&mut self, block: Block) {
        self.blocks.push((None, block));
    }

    pub fn push_commented(&mut self, comment: &str, block: Block) {
        self.blocks.push((Some(comment.to_string()), block));
    }

    pub fn to_hcl(&self) -> String {
        let mut out = String::new();
        for (i, (comment, block)) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if let Some(comment) = comment {
                let _ = writeln!(out, "# {comment}");
            }
            write_block(&mut out, block, 0);
        }
        out
    }
}

/// Quote a string literal, escaping anything HCL would interpret.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn key(s: &str) -> String {
    if is_identifier(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

fn pad(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_block(out: &mut String, block: &Block, depth: usize) {
    pad(out, depth);
    out.push_str(&block.kind);
    for label in &block.labels {
        out.push(' ');
        out.push_str(&quote(label));
    }
    out.push_str(" {\n");
    write_body(out, &block.body, depth + 1);
    pad(out, depth);
    out.push_str("}\n");
}

fn write_body(out: &mut String, body: &[Item], depth: usize) {
    let mut i = 0;
    while i < body.len() {
        match &body[i] {
            Item::Attr(..) => {
                // Align `=` across a run of consecutive attributes.
                let run_end = body[i..]
                    .iter()
                    .position(|item| !matches!(item, Item::Attr(..)))
                    .map_or(body.len(), |n| i + n);
                let width = body[i..run_end]
                    .iter()
                    .filter_map(|item| match item {
                        Item::Attr(k, _) => Some(key(k).len()),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                for item in &body[i..run_end] {
                    if let Item::Attr(k, v) = item {
                        pad(out, depth);
                        let _ = write!(out, "{:width$} = ", key(k));
                        write_expr(out, v, depth);
                        out.push('\n');
                    }
                }
                i = run_end;
            }
            Item::Block(block) => {
                write_block(out, block, depth);
                i += 1;
            }
            Item::Blank => {
                out.push('\n');
                i += 1;
            }
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr, depth: usize) {
    match expr {
        Expr::Str(s) => out.push_str(&quote(s)),
        Expr::Num(n) => {
            let _ = write!(out, "{n}");
        }
        Expr::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Expr::Ref(r) => out.push_str(r),
        Expr::List(items) => {
            let simple = items
                .iter()
                .all(|e| matches!(e, Expr::Str(_) | Expr::Num(_) | Expr::Bool(_)));
            if simple {
                out.push('[');
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        out.push_str(", ");
                    }
                    write_expr(out, item, depth);
                }
                out.push(']');
            } else {
                out.push_str("[\n");
                for item in items {
                    pad(out, depth + 1);
                    write_expr(out, item, depth + 1);
                    out.push_str(",\n");
                }
                pad(out, depth);
                out.push(']');
            }
        }
        Expr::Object(fields) => {
            out.push_str("{\n");
            let width = fields.iter().map(|(k, _)| key(k).len()).max().unwrap_or(0);
            for (k, v) in fields {
                pad(out, depth + 1);
                let _ = write!(out, "{:width$} = ", key(k));
                write_expr(out, v, depth + 1);
                out.push('\n');
            }
            pad(out, depth);
            out.push('}');
        }
    }
}
