//! Canonical text serialization of a DD.
//!
//! # Format
//!
//! One header line `<nqubits> <format>` (format 1 for a state vector, 0 for
//! a matrix), then one record per distinct non-terminal node reachable from
//! the root, in post-order, then one root line.
//!
//! ```text
//! 2 1
//! 1 0 (0 1) () () ()
//! 2 1 (1 0.7071067811865476) () (1 0.7071067811865476) ()
//! (2 1)
//! ```
//!
//! A record is `<id> <level>` followed by four child groups. A group is
//! `()` for the canonical zero edge, `(0 <weight>)` for an edge to the
//! terminal, or `(<id> <weight>)` referencing an earlier record. Weights are
//! `<re>`, `<im>i`, or `<re>+<im>i` / `<re>-<im>i`, printed with Rust's
//! shortest round-trip `f64` formatting, so a serialize/deserialize cycle
//! reproduces the weights exactly. Post-order is a contract, not an
//! implementation detail: the deserializer rebuilds bottom-up in a single
//! pass and rejects any child id that has not been emitted yet. Trailing
//! `#` comments are ignored.
//!
//! Deserialization routes every node through
//! [`Qdd::make_node`][crate::qdd::Qdd::make_node] -- never allocating nodes
//! directly -- so all canonicalization invariants hold for the rebuilt
//! graph, and `deserialize(serialize(e))` is `equals` to `e`.

use std::io::{self, BufRead, Write};

use fxhash::FxHashMap;
use log::debug;

use crate::edge::{Edge, NodeId};
use crate::error::{Error, Result};
use crate::qdd::Qdd;

pub(crate) fn fmt_complex(re: f64, im: f64) -> String {
    if im == 0.0 {
        format!("{}", re)
    } else if re == 0.0 {
        format!("{}i", im)
    } else if im < 0.0 {
        format!("{}{}i", re, im)
    } else {
        format!("{}+{}i", re, im)
    }
}

/// Write the DD rooted at `e` to `sink`. `nqubits` is the width of the
/// register the diagram belongs to; it may exceed the root's own level when
/// the top qubits are structurally absent.
pub fn serialize<W: Write>(
    dd: &Qdd,
    e: Edge,
    nqubits: u16,
    sink: &mut W,
    vector: bool,
) -> io::Result<()> {
    assert!(nqubits >= dd.qubits(e), "Register narrower than the diagram");
    writeln!(sink, "{} {}", nqubits, vector as u8)?;

    let mut ids: FxHashMap<NodeId, usize> = FxHashMap::default();

    if !e.is_terminal() && !e.is_zero() {
        // Post-order DFS: every child id is emitted before its parent.
        let mut stack = vec![(e.node, 0usize)];
        while let Some((node, cursor)) = stack.pop() {
            if cursor < 4 {
                stack.push((node, cursor + 1));
                let c = dd.children(node)[cursor];
                if !c.is_zero() && !c.is_terminal() && !ids.contains_key(&c.node) {
                    stack.push((c.node, 0));
                }
            } else {
                let id = ids.len() + 1;
                ids.insert(node, id);
                write!(sink, "{} {}", id, dd.level(node))?;
                for c in dd.children(node) {
                    write_group(dd, &ids, c, sink)?;
                }
                writeln!(sink)?;
            }
        }
    }

    // Root line: the root edge's own weight, referencing the last record.
    if e.is_zero() {
        writeln!(sink, "()")?;
    } else {
        let id = if e.is_terminal() { 0 } else { ids[&e.node] };
        let (re, im) = dd.weight_value(e.w);
        writeln!(sink, "({} {})", id, fmt_complex(re, im))?;
    }
    debug!("serialized {} node records", ids.len());
    Ok(())
}

fn write_group<W: Write>(
    dd: &Qdd,
    ids: &FxHashMap<NodeId, usize>,
    c: Edge,
    sink: &mut W,
) -> io::Result<()> {
    if c.is_zero() {
        return write!(sink, " ()");
    }
    let id = if c.is_terminal() { 0 } else { ids[&c.node] };
    let (re, im) = dd.weight_value(c.w);
    write!(sink, " ({} {})", id, fmt_complex(re, im))
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedEncoding(msg.into())
}

fn parse_complex(s: &str) -> Result<(f64, f64)> {
    let parse = |t: &str| -> Result<f64> {
        t.parse()
            .map_err(|_| malformed(format!("bad number '{}'", t)))
    };

    let Some(body) = s.strip_suffix(['i', 'I']) else {
        return Ok((parse(s)?, 0.0));
    };
    if body.is_empty() {
        return Err(malformed(format!("bad weight '{}'", s)));
    }
    // Split off the imaginary part at the last sign that does not belong to
    // an exponent.
    let bytes = body.as_bytes();
    let split = (1..bytes.len()).rev().find(|&i| {
        (bytes[i] == b'+' || bytes[i] == b'-') && bytes[i - 1] != b'e' && bytes[i - 1] != b'E'
    });
    match split {
        Some(i) => Ok((parse(&body[..i])?, parse(&body[i..])?)),
        None => Ok((0.0, parse(body)?)),
    }
}

/// Split `(...) (...) ...` into the contents of each group.
fn split_groups(s: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('(') else {
            return Err(malformed(format!("expected '(' at '{}'", rest)));
        };
        let end = inner
            .find(')')
            .ok_or_else(|| malformed(format!("unterminated group '{}'", rest)))?;
        groups.push(&inner[..end]);
        rest = inner[end + 1..].trim_start();
    }
    Ok(groups)
}

fn resolve_group(dd: &Qdd, records: &FxHashMap<u64, Edge>, group: &str) -> Result<Edge> {
    let group = group.trim();
    if group.is_empty() {
        return Ok(Edge::ZERO);
    }

    let (id_str, weight_str) = group
        .split_once(' ')
        .ok_or_else(|| malformed(format!("bad group '{}'", group)))?;
    let id: u64 = id_str
        .parse()
        .map_err(|_| malformed(format!("bad child index '{}'", id_str)))?;
    let weight_str: String = weight_str.split_whitespace().collect();
    let (re, im) = parse_complex(&weight_str)?;
    let w = dd.weight(re, im);

    if w.is_zero() {
        return Ok(Edge::ZERO);
    }
    if id == 0 {
        return Ok(Edge::terminal(w));
    }
    let sub = records
        .get(&id)
        .ok_or_else(|| malformed(format!("child index {} not emitted yet", id)))?;
    // A canonical record reconstructs with weight one; fold any residue in.
    let w = dd.mul_weights(w, sub.w);
    if w.is_zero() {
        return Ok(Edge::ZERO);
    }
    Ok(Edge { node: sub.node, w })
}

/// Rebuild a DD from `source`. The returned root edge carries one
/// caller-owned reference.
pub fn deserialize<R: BufRead>(dd: &Qdd, source: R) -> Result<Edge> {
    let mut records: FxHashMap<u64, Edge> = FxHashMap::default();
    let mut header_seen = false;
    let mut root: Option<Edge> = None;

    for line in source.lines() {
        let line = line?;
        let line = match line.split_once('#') {
            Some((content, _)) => content,
            None => &line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if root.is_some() {
            return Err(malformed(format!("content after the root line: '{}'", line)));
        }

        if !header_seen {
            let mut parts = line.split_whitespace();
            let _nqubits: u16 = parts
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed("bad header"))?;
            let format: u8 = parts
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed("bad header"))?;
            if format > 1 || parts.next().is_some() {
                return Err(malformed("bad header"));
            }
            header_seen = true;
            continue;
        }

        if line.starts_with('(') {
            // Root line: exactly one group, and nothing may follow it.
            let groups = split_groups(line)?;
            if groups.len() != 1 {
                return Err(malformed("root line must hold exactly one group"));
            }
            root = Some(resolve_group(dd, &records, groups[0])?);
            continue;
        }

        // Node record.
        let paren = line
            .find('(')
            .ok_or_else(|| malformed(format!("record without children: '{}'", line)))?;
        let mut head = line[..paren].split_whitespace();
        let id: u64 = head
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| malformed(format!("bad record id in '{}'", line)))?;
        let level: i32 = head
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| malformed(format!("bad record level in '{}'", line)))?;
        if head.next().is_some() || level < 0 || id == 0 {
            return Err(malformed(format!("bad record '{}'", line)));
        }
        if records.contains_key(&id) {
            return Err(malformed(format!("duplicate record id {}", id)));
        }

        let groups = split_groups(&line[paren..])?;
        if groups.len() != 4 {
            return Err(malformed(format!(
                "expected 4 child groups, got {}",
                groups.len()
            )));
        }
        let mut children = [Edge::ZERO; 4];
        for (i, group) in groups.iter().enumerate() {
            children[i] = resolve_group(dd, &records, group)?;
        }

        records.insert(id, dd.make_node(level, children));
    }

    let root = root.ok_or_else(|| malformed("missing root line"))?;
    dd.inc_ref(root);
    debug!("deserialized {} node records", records.len());
    Ok(root)
}
