//! Frontier queries over a parsed [`Document`].
//!
//! Every function here is pure. Results are ordered by hole id so repeated
//! queries over the same document produce identical output.

use crate::hole::Hole;
use crate::parser::Document;
use crate::types::HoleStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Frontier
// ---------------------------------------------------------------------------

/// A dependency counts as satisfied when the referenced hole is resolved.
/// An id that is not in the document also counts as satisfied; use
/// [`dangling_dependencies`] to surface those references.
pub fn dependency_satisfied(doc: &Document, dep: &str) -> bool {
    doc.get(dep).map(Hole::is_resolved).unwrap_or(true)
}

/// Unresolved holes whose dependencies are all satisfied, sorted by id.
pub fn resolvable(doc: &Document) -> Vec<&Hole> {
    doc.holes()
        .filter(|h| !h.is_resolved())
        .filter(|h| h.dependencies.iter().all(|d| dependency_satisfied(doc, d)))
        .collect()
}

/// Unresolved holes with at least one unsatisfied dependency, sorted by id.
pub fn blocked(doc: &Document) -> Vec<&Hole> {
    doc.holes()
        .filter(|h| !h.is_resolved())
        .filter(|h| h.dependencies.iter().any(|d| !dependency_satisfied(doc, d)))
        .collect()
}

/// The dependency ids currently holding `hole` back, in declaration order.
pub fn blockers<'a>(doc: &Document, hole: &'a Hole) -> Vec<&'a str> {
    hole.dependencies
        .iter()
        .filter(|d| !dependency_satisfied(doc, d))
        .map(String::as_str)
        .collect()
}

/// The suggested next hole: the first resolvable hole by id.
pub fn suggest_next(doc: &Document) -> Option<&Hole> {
    resolvable(doc).into_iter().next()
}

/// Holes that list `id` among their dependencies, sorted by id.
pub fn dependents<'a>(doc: &'a Document, id: &str) -> Vec<&'a Hole> {
    doc.holes().filter(|h| h.depends_on(id)).collect()
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub resolved: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.resolved * 100) / self.total) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.resolved == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} resolved ({}%), {} in progress",
            self.resolved,
            self.total,
            self.percent(),
            self.in_progress
        )
    }
}

pub fn progress(doc: &Document) -> Progress {
    let mut p = Progress {
        total: doc.len(),
        ..Progress::default()
    };
    for hole in doc.holes() {
        match hole.status {
            HoleStatus::Resolved => p.resolved += 1,
            HoleStatus::InProgress => p.in_progress += 1,
            HoleStatus::Pending => p.pending += 1,
        }
    }
    p
}

// ---------------------------------------------------------------------------
// Closed-world validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingDependency {
    pub hole: String,
    pub missing: String,
}

impl fmt::Display for DanglingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} depends on {}, which is not defined in the document",
            self.hole, self.missing
        )
    }
}

/// Every dependency reference that names a hole absent from the document.
pub fn dangling_dependencies(doc: &Document) -> Vec<DanglingDependency> {
    let mut out = Vec::new();
    for hole in doc.holes() {
        for dep in &hole.dependencies {
            if !doc.contains(dep) {
                out.push(DanglingDependency {
                    hole: hole.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }
    out
}

/// A dependency cycle among unresolved holes. `members` starts at the
/// smallest id; the last member depends on the first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cycle {
    pub members: Vec<String>,
}

impl Cycle {
    fn normalized(mut members: Vec<String>) -> Self {
        if let Some(min_pos) = members
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            members.rotate_left(min_pos);
        }
        Cycle { members }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = self.members.join(" -> ");
        if let Some(first) = self.members.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        f.write_str(&path)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Detect dependency cycles among unresolved holes with a depth-first
/// white/gray/black traversal. Resolved holes and ids absent from the
/// document cannot be part of a blocking cycle and are not traversed.
pub fn find_cycles(doc: &Document) -> Vec<Cycle> {
    let nodes: Vec<&Hole> = doc.holes().filter(|h| !h.is_resolved()).collect();
    let mut color: HashMap<&str, Color> = nodes
        .iter()
        .map(|h| (h.id.as_str(), Color::White))
        .collect();
    let mut stack: Vec<&str> = Vec::new();
    let mut found: BTreeSet<Cycle> = BTreeSet::new();

    for hole in &nodes {
        if color.get(hole.id.as_str()) == Some(&Color::White) {
            visit(doc, hole.id.as_str(), &mut color, &mut stack, &mut found);
        }
    }

    found.into_iter().collect()
}

fn visit<'a>(
    doc: &'a Document,
    id: &'a str,
    color: &mut HashMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
    found: &mut BTreeSet<Cycle>,
) {
    color.insert(id, Color::Gray);
    stack.push(id);

    if let Some(hole) = doc.get(id) {
        for dep in &hole.dependencies {
            let dep = dep.as_str();
            match color.get(dep).copied() {
                // Resolved or undefined: not part of the unresolved subgraph.
                None => {}
                Some(Color::White) => visit(doc, dep, color, stack, found),
                Some(Color::Gray) => {
                    if let Some(pos) = stack.iter().position(|s| *s == dep) {
                        let members = stack[pos..].iter().map(|s| s.to_string()).collect();
                        found.insert(Cycle::normalized(members));
                    }
                }
                Some(Color::Black) => {}
            }
        }
    }

    stack.pop();
    color.insert(id, Color::Black);
}

// ---------------------------------------------------------------------------
// GraphDiagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDiagnostics {
    pub dangling: Vec<DanglingDependency>,
    pub cycles: Vec<Cycle>,
}

impl GraphDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.cycles.is_empty()
    }

    /// Whether `id` sits on a detected cycle, i.e. can never become resolvable.
    pub fn in_cycle(&self, id: &str) -> bool {
        self.cycles.iter().any(|c| c.contains(id))
    }
}

pub fn validate(doc: &Document) -> GraphDiagnostics {
    GraphDiagnostics {
        dangling: dangling_dependencies(doc),
        cycles: find_cycles(doc),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
