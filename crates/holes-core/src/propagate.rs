//! Advisory propagation of a resolved hole's constraints to its dependents.
//! Nothing here writes to the document.

use crate::graph;
use crate::parser::Document;
use crate::types::HoleStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintPattern {
    Type,
    Resource,
    TestData,
}

impl ConstraintPattern {
    pub fn all() -> &'static [ConstraintPattern] {
        &[
            ConstraintPattern::Type,
            ConstraintPattern::Resource,
            ConstraintPattern::TestData,
        ]
    }

    pub fn title(self) -> &'static str {
        match self {
            ConstraintPattern::Type => "Type constraints",
            ConstraintPattern::Resource => "Resource constraints",
            ConstraintPattern::TestData => "Test-data constraints",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            ConstraintPattern::Type => {
                "If the resolution fixed an interface, signature or error type, record it as a \
                 constraint on each dependent: they must consume that exact shape."
            }
            ConstraintPattern::Resource => {
                "If the resolution fixed ownership, lifetimes, pooling or concurrency limits, \
                 record the budget each dependent must stay within."
            }
            ConstraintPattern::TestData => {
                "If the resolution added fixtures or characterization cases, list them on each \
                 dependent so its resolution tests reuse the same data."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub id: String,
    pub question: String,
    pub status: HoleStatus,
    /// Dependencies other than the resolved hole that are still unresolved.
    pub still_blocked_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub pattern: ConstraintPattern,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationPlan {
    pub resolved: String,
    /// Whether the id names a hole in the document.
    pub known: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HoleStatus>,
    pub dependents: Vec<Dependent>,
    pub guidance: Vec<Guidance>,
}

impl PropagationPlan {
    pub fn is_leaf(&self) -> bool {
        self.dependents.is_empty()
    }
}

pub fn propagate(doc: &Document, id: &str) -> PropagationPlan {
    let hole = doc.get(id);
    let dependents: Vec<Dependent> = graph::dependents(doc, id)
        .into_iter()
        .map(|d| Dependent {
            id: d.id.clone(),
            question: d.question.clone(),
            status: d.status,
            still_blocked_by: graph::blockers(doc, d)
                .into_iter()
                .filter(|b| *b != id)
                .map(String::from)
                .collect(),
        })
        .collect();

    let guidance = if dependents.is_empty() {
        Vec::new()
    } else {
        ConstraintPattern::all()
            .iter()
            .map(|p| Guidance {
                pattern: *p,
                title: p.title().to_string(),
                text: p.guidance().to_string(),
            })
            .collect()
    };

    tracing::debug!(hole = id, dependents = dependents.len(), "propagation computed");
    PropagationPlan {
        resolved: id.to_string(),
        known: hole.is_some(),
        status: hole.map(|h| h.status),
        dependents,
        guidance,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
