//! Node count descriptor: a fixed count or a `min:max` range

use adapter_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of nodes for an elastic launch
///
/// `fixed`, `range`, parsing and deserialization reject zero counts and
/// `min > max`. Variants built directly are checked by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NodeCountRepr", into = "NodeCountRepr")]
pub enum NodeCount {
    /// Exactly this many nodes
    Fixed(u32),

    /// Between `min` and `max` nodes
    Range { min: u32, max: u32 },
}

impl NodeCount {
    /// Fixed node count, rejecting zero
    pub fn fixed(nodes: u32) -> Result<Self> {
        if nodes == 0 {
            return Err(Error::configuration("nnodes must be at least 1"));
        }
        Ok(NodeCount::Fixed(nodes))
    }

    /// Node range, rejecting zero bounds and `min > max`
    pub fn range(min: u32, max: u32) -> Result<Self> {
        if min == 0 {
            return Err(Error::configuration(format!(
                "nnodes range {}:{} must start at 1 or more",
                min, max
            )));
        }
        if min > max {
            return Err(Error::configuration(format!(
                "nnodes range {}:{} has min greater than max",
                min, max
            )));
        }
        Ok(NodeCount::Range { min, max })
    }

    /// Check a value that may have been built from the variants directly
    pub fn validate(&self) -> Result<()> {
        match *self {
            NodeCount::Fixed(n) => NodeCount::fixed(n).map(|_| ()),
            NodeCount::Range { min, max } => NodeCount::range(min, max).map(|_| ()),
        }
    }

    /// Lower bound of the node count
    pub fn min_nodes(&self) -> u32 {
        match *self {
            NodeCount::Fixed(n) => n,
            NodeCount::Range { min, .. } => min,
        }
    }

    /// Upper bound of the node count
    pub fn max_nodes(&self) -> u32 {
        match *self {
            NodeCount::Fixed(n) => n,
            NodeCount::Range { max, .. } => max,
        }
    }
}

impl Default for NodeCount {
    fn default() -> Self {
        NodeCount::Fixed(1)
    }
}

fn parse_bound(raw: &str, input: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return Err(Error::configuration(format!(
            "nnodes '{}' contains a negative count",
            input
        )));
    }
    raw.parse::<u32>().map_err(|_| {
        Error::configuration(format!("nnodes '{}' is not a node count or min:max range", input))
    })
}

impl FromStr for NodeCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [n] => NodeCount::fixed(parse_bound(n, s)?),
            [min, max] => NodeCount::range(parse_bound(min, s)?, parse_bound(max, s)?),
            _ => Err(Error::configuration(format!(
                "nnodes '{}' is not a node count or min:max range",
                s
            ))),
        }
    }
}

impl TryFrom<i64> for NodeCount {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        let nodes = u32::try_from(value).map_err(|_| {
            Error::configuration(format!("nnodes {} is out of range", value))
        })?;
        NodeCount::fixed(nodes)
    }
}

impl fmt::Display for NodeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeCount::Fixed(n) => write!(f, "{}", n),
            NodeCount::Range { min, max } => write!(f, "{}:{}", min, max),
        }
    }
}

/// Wire form: an integer or a string
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NodeCountRepr {
    Int(i64),
    Str(String),
}

impl TryFrom<NodeCountRepr> for NodeCount {
    type Error = Error;

    fn try_from(repr: NodeCountRepr) -> Result<Self> {
        match repr {
            NodeCountRepr::Int(n) => NodeCount::try_from(n),
            NodeCountRepr::Str(s) => s.parse(),
        }
    }
}

impl From<NodeCount> for NodeCountRepr {
    fn from(count: NodeCount) -> Self {
        match count {
            NodeCount::Fixed(n) => NodeCountRepr::Int(i64::from(n)),
            range => NodeCountRepr::Str(range.to_string()),
        }
    }
}
