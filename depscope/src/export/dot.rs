//! Graphviz DOT description of the edge set

use std::io::{self, Write};

use crate::profiling::EdgeSet;

/// Write `edges` as a directed graph, one quoted relation per edge
///
/// Labels have `prefix` stripped for display. An empty set produces an
/// empty but valid graph: `digraph g {}`.
///
/// # Errors
/// Returns any error from the underlying writer
pub fn write_dot<W: Write>(edges: &EdgeSet, prefix: &str, out: &mut W) -> io::Result<()> {
    out.write_all(b"digraph g {")?;
    if !edges.is_empty() {
        out.write_all(b"\n")?;
    }
    for edge in edges {
        writeln!(
            out,
            "  \"{}\" -> \"{}\";",
            escape(edge.from.display_label(prefix)),
            escape(edge.to.display_label(prefix))
        )?;
    }
    out.write_all(b"}\n")
}

/// Escape a label for use inside a DOT double-quoted string
fn escape(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
