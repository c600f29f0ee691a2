use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tools::SearchQuery;

/// One of the six metric slots a comparison needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "a_initial")]
    AInit,
    #[serde(rename = "a_final")]
    AFinal,
    #[serde(rename = "b_initial")]
    BInit,
    #[serde(rename = "b_final")]
    BFinal,
    #[serde(rename = "a_dividend")]
    ADiv,
    #[serde(rename = "b_dividend")]
    BDiv,
}

impl Role {
    /// Positional order the prompt asks the model to search in.
    pub const ALL: [Role; 6] = [
        Role::AInit,
        Role::AFinal,
        Role::BInit,
        Role::BFinal,
        Role::ADiv,
        Role::BDiv,
    ];

    pub fn from_index(idx: usize) -> Option<Role> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tag(self) -> &'static str {
        match self {
            Role::AInit => "a_initial",
            Role::AFinal => "a_final",
            Role::BInit => "b_initial",
            Role::BFinal => "b_final",
            Role::ADiv => "a_dividend",
            Role::BDiv => "b_dividend",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Role> {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|role| role.tag() == tag)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Observation {
    pub value: f64,
    pub call_index: usize,
    pub item_index: usize,
    pub query: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StockMetrics {
    slots: [Option<Observation>; 6],
}

/// All six observations, resolved. Only this type reaches the calculation chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompleteMetrics {
    pub a_initial: f64,
    pub a_final: f64,
    pub b_initial: f64,
    pub b_final: f64,
    pub a_dividend: f64,
    pub b_dividend: f64,
}

impl StockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: Role) -> Option<&Observation> {
        self.slots[role.index()].as_ref()
    }

    pub fn value(&self, role: Role) -> Option<f64> {
        self.get(role).map(|obs| obs.value)
    }

    pub fn set(&mut self, role: Role, observation: Observation) {
        self.slots[role.index()] = Some(observation);
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn missing(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.get(*role).is_none()).collect()
    }

    pub fn complete(&self) -> Result<CompleteMetrics, Vec<Role>> {
        match Role::ALL.map(|role| self.value(role)) {
            [Some(a_initial), Some(a_final), Some(b_initial), Some(b_final), Some(a_dividend), Some(b_dividend)] => {
                Ok(CompleteMetrics {
                    a_initial,
                    a_final,
                    b_initial,
                    b_final,
                    a_dividend,
                    b_dividend,
                })
            }
            _ => Err(self.missing()),
        }
    }
}

pub fn is_complete(metrics: &StockMetrics) -> bool {
    metrics.is_complete()
}

/// Binds extracted values to roles, by query position or by explicit tag.
#[derive(Debug, Default)]
pub struct SlotMapper {
    metrics: StockMetrics,
}

impl SlotMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional binding: item 0 → a_initial … item 5 → b_dividend.
    /// Items past the sixth and absent values are ignored.
    pub fn assign(&mut self, call_index: usize, item_index: usize, value: Option<f64>) -> Option<Role> {
        let role = Role::from_index(item_index)?;
        self.assign_role(role, call_index, item_index, value, None)
    }

    pub fn assign_role(
        &mut self,
        role: Role,
        call_index: usize,
        item_index: usize,
        value: Option<f64>,
        query: Option<&str>,
    ) -> Option<Role> {
        let value = value?;
        debug!(%role, value, call_index, item_index, "observation bound");
        self.metrics.set(
            role,
            Observation {
                value,
                call_index,
                item_index,
                query: query.map(str::to_string),
            },
        );
        Some(role)
    }

    /// Binds by the query's role tag when present, by position otherwise.
    pub fn record(
        &mut self,
        call_index: usize,
        item_index: usize,
        query: &SearchQuery,
        value: Option<f64>,
    ) -> Option<Role> {
        let role = query.role.or_else(|| Role::from_index(item_index))?;
        self.assign_role(role, call_index, item_index, value, Some(&query.text))
    }

    /// Role this query would fill, whether or not a value was extracted.
    pub fn target(item_index: usize, query: &SearchQuery) -> Option<Role> {
        query.role.or_else(|| Role::from_index(item_index))
    }

    pub fn metrics(&self) -> &StockMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> StockMetrics {
        self.metrics
    }
}
