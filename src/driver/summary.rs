//! Query summaries.
//!
//! The terminal SUCCESS of a result stream carries server-authored metadata:
//! update counters, the statement type, an optional plan or profile tree,
//! notifications, and timing. [`Summary::parse_success`] lifts that metadata
//! map into typed form.

use std::collections::HashMap;
use std::time::Duration;

use crate::bolt::packstream::Value;

/// Details of a completed query.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// The statement that produced this summary
    pub query: String,
    /// Update counters
    pub counters: Counters,
    /// What kind of statement ran
    pub statement_type: StatementType,
    /// Plan (EXPLAIN) or executed plan (PROFILE), when requested
    pub plan: Option<Plan>,
    /// Server notifications about the statement
    pub notifications: Vec<Notification>,
    /// Time until the result was available
    pub available_after: Option<Duration>,
    /// Time until the result was fully consumed
    pub consumed_after: Option<Duration>,
    /// Server version string
    pub server: Option<String>,
}

impl Summary {
    /// Populate from a terminal SUCCESS metadata map. Fields absent from the
    /// metadata are left at their current values.
    pub fn parse_success(&mut self, md: &HashMap<String, Value>) {
        if let Some(t) = md.get("type").and_then(|v| v.as_str()) {
            if let Some(t) = StatementType::from_str(t) {
                self.statement_type = t;
            }
        }

        if let Some(stats) = md.get("stats").and_then(|v| v.as_map()) {
            self.counters = Counters::parse(stats);
        }

        for key in ["plan", "profile"] {
            if let Some(plan) = md.get(key).and_then(|v| v.as_map()) {
                self.plan = Some(Plan::parse(plan));
                break;
            }
        }

        if let Some(nots) = md.get("notifications").and_then(|v| v.as_list()) {
            self.notifications = nots
                .iter()
                .filter_map(|v| v.as_map())
                .map(Notification::parse)
                .collect();
        }

        if let Some(ms) = md.get("result_available_after").and_then(|v| v.as_int()) {
            self.available_after = Some(Duration::from_millis(ms.max(0) as u64));
        }
        if let Some(ms) = md.get("result_consumed_after").and_then(|v| v.as_int()) {
            self.consumed_after = Some(Duration::from_millis(ms.max(0) as u64));
        }

        if let Some(server) = md.get("server").and_then(|v| v.as_str()) {
            self.server = Some(server.to_string());
        }
    }
}

/// Counts of the operations a query performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Nodes created
    pub nodes_created: i64,
    /// Nodes deleted
    pub nodes_deleted: i64,
    /// Relationships created
    pub relationships_created: i64,
    /// Relationships deleted
    pub relationships_deleted: i64,
    /// Properties set
    pub properties_set: i64,
    /// Labels added
    pub labels_added: i64,
    /// Labels removed
    pub labels_removed: i64,
    /// Indices added
    pub indices_added: i64,
    /// Indices removed
    pub indices_removed: i64,
    /// Constraints added
    pub constraints_added: i64,
    /// Constraints removed
    pub constraints_removed: i64,
}

impl Counters {
    /// Parse from a `stats` metadata map; missing counters read zero.
    pub fn parse(md: &HashMap<String, Value>) -> Self {
        let stat = |key: &str| md.get(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            nodes_created: stat("nodes-created"),
            nodes_deleted: stat("nodes-deleted"),
            relationships_created: stat("relationships-created"),
            relationships_deleted: stat("relationships-deleted"),
            properties_set: stat("properties-set"),
            labels_added: stat("labels-added"),
            labels_removed: stat("labels-removed"),
            indices_added: stat("indices-added"),
            indices_removed: stat("indices-removed"),
            constraints_added: stat("constraints-added"),
            constraints_removed: stat("constraints-removed"),
        }
    }

    /// The number of nodes and relationships created and deleted.
    pub fn rows_affected(&self) -> i64 {
        self.nodes_created
            + self.nodes_deleted
            + self.relationships_created
            + self.relationships_deleted
    }
}

/// The kind of statement a query was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatementType {
    /// Read only
    #[default]
    Read,
    /// Read and write
    ReadWrite,
    /// Write only
    Write,
    /// Schema write only
    SchemaWrite,
}

impl StatementType {
    /// Parse the wire form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "r" => Some(StatementType::Read),
            "rw" => Some(StatementType::ReadWrite),
            "w" => Some(StatementType::Write),
            "s" => Some(StatementType::SchemaWrite),
            _ => None,
        }
    }

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Read => "r",
            StatementType::ReadWrite => "rw",
            StatementType::Write => "w",
            StatementType::SchemaWrite => "s",
        }
    }
}

/// One level of the planner's tree.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// The operation this level performs
    pub operation: String,
    /// Planner arguments
    pub args: HashMap<String, Value>,
    /// Identifiers in scope at this level
    pub identifiers: Vec<String>,
    /// Execution counts, present for PROFILE
    pub profile: Option<Profile>,
    /// The next level of the tree
    pub children: Vec<Plan>,
}

impl Plan {
    /// Parse from a `plan`/`profile` metadata map.
    pub fn parse(md: &HashMap<String, Value>) -> Self {
        let operation = md
            .get("operatorType")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let args = md
            .get("args")
            .and_then(|v| v.as_map())
            .cloned()
            .unwrap_or_default();

        let identifiers = md
            .get("identifiers")
            .and_then(|v| v.as_list())
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let hits = md.get("dbHits").and_then(|v| v.as_int());
        let records = md.get("rows").and_then(|v| v.as_int());
        let profile = if hits.is_some() || records.is_some() {
            Some(Profile {
                hits: hits.unwrap_or(0),
                records: records.unwrap_or(0),
            })
        } else {
            None
        };

        let children = md
            .get("children")
            .and_then(|v| v.as_list())
            .map(|kids| {
                kids.iter()
                    .filter_map(|v| v.as_map())
                    .map(Plan::parse)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            operation,
            args,
            identifiers,
            profile,
            children,
        }
    }
}

/// Execution counts of one plan level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    /// How often the plan touched the underlying stores
    pub hits: i64,
    /// How many records the plan produced
    pub records: i64,
}

/// A notification raised during query execution.
#[derive(Debug, Clone, Default)]
pub struct Notification {
    /// Notification code
    pub code: String,
    /// Short summary
    pub title: String,
    /// Longer description
    pub description: String,
    /// Where in the query it points, if anywhere
    pub position: Option<Position>,
    /// Severity level; `"N/A"` when the server omits it
    pub severity: String,
}

impl Notification {
    /// Parse from a notification metadata map.
    pub fn parse(md: &HashMap<String, Value>) -> Self {
        let get = |key: &str| {
            md.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            code: get("code"),
            title: get("title"),
            description: get("description"),
            position: md.get("position").and_then(|v| v.as_map()).map(Position::parse),
            severity: md
                .get("severity")
                .and_then(|v| v.as_str())
                .unwrap_or("N/A")
                .to_string(),
        }
    }
}

/// A position in the query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Character offset, starting at 0
    pub offset: i64,
    /// Line number, starting at 1
    pub line: i64,
    /// Column number, starting at 1
    pub column: i64,
}

impl Position {
    fn parse(md: &HashMap<String, Value>) -> Self {
        let get = |key: &str| md.get(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            offset: get("offset"),
            line: get("line"),
            column: get("column"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_entry(k: &str, v: i64) -> (String, Value) {
        (k.to_string(), Value::Integer(v))
    }

    #[test]
    fn test_counters_parse() {
        let stats: HashMap<String, Value> = [
            int_entry("nodes-created", 2),
            int_entry("nodes-deleted", 1),
            int_entry("relationships-created", 3),
            int_entry("properties-set", 5),
            int_entry("indices-added", 1),
            int_entry("constraints-removed", 4),
        ]
        .into();
        let counters = Counters::parse(&stats);
        assert_eq!(counters.nodes_created, 2);
        assert_eq!(counters.nodes_deleted, 1);
        assert_eq!(counters.relationships_created, 3);
        assert_eq!(counters.relationships_deleted, 0);
        assert_eq!(counters.indices_added, 1);
        assert_eq!(counters.constraints_removed, 4);
        assert_eq!(counters.rows_affected(), 6);
    }

    #[test]
    fn test_statement_type() {
        assert_eq!(StatementType::from_str("r"), Some(StatementType::Read));
        assert_eq!(StatementType::from_str("rw"), Some(StatementType::ReadWrite));
        assert_eq!(StatementType::from_str("w"), Some(StatementType::Write));
        assert_eq!(StatementType::from_str("s"), Some(StatementType::SchemaWrite));
        assert_eq!(StatementType::from_str("x"), None);
        assert_eq!(StatementType::ReadWrite.as_str(), "rw");
    }

    #[test]
    fn test_parse_success_metadata() {
        let mut md = HashMap::new();
        md.insert("type".to_string(), Value::String("r".into()));
        md.insert("result_available_after".to_string(), Value::Integer(3));
        md.insert("result_consumed_after".to_string(), Value::Integer(7));
        md.insert("server".to_string(), Value::String("Neo4j/3.1.0".into()));

        let mut summary = Summary::default();
        summary.parse_success(&md);
        assert_eq!(summary.statement_type, StatementType::Read);
        assert_eq!(summary.available_after, Some(Duration::from_millis(3)));
        assert_eq!(summary.consumed_after, Some(Duration::from_millis(7)));
        assert_eq!(summary.server.as_deref(), Some("Neo4j/3.1.0"));
    }

    #[test]
    fn test_parse_plan_tree() {
        let child: HashMap<String, Value> = [(
            "operatorType".to_string(),
            Value::String("ProduceResults".into()),
        )]
        .into();
        let mut md = HashMap::new();
        md.insert(
            "operatorType".to_string(),
            Value::String("AllNodesScan".into()),
        );
        md.insert(
            "identifiers".to_string(),
            Value::List(vec![Value::String("n".into())]),
        );
        md.insert("dbHits".to_string(), Value::Integer(12));
        md.insert("rows".to_string(), Value::Integer(4));
        md.insert(
            "children".to_string(),
            Value::List(vec![Value::Map(child)]),
        );

        let plan = Plan::parse(&md);
        assert_eq!(plan.operation, "AllNodesScan");
        assert_eq!(plan.identifiers, vec!["n".to_string()]);
        assert_eq!(plan.profile, Some(Profile { hits: 12, records: 4 }));
        assert_eq!(plan.children.len(), 1);
        assert_eq!(plan.children[0].operation, "ProduceResults");
        assert!(plan.children[0].profile.is_none());
    }

    #[test]
    fn test_parse_notification() {
        let mut pos = HashMap::new();
        pos.insert("line".to_string(), Value::Integer(1));
        pos.insert("column".to_string(), Value::Integer(10));
        pos.insert("offset".to_string(), Value::Integer(9));

        let mut md = HashMap::new();
        md.insert(
            "code".to_string(),
            Value::String("Neo.ClientNotification.Statement.CartesianProduct".into()),
        );
        md.insert("title".to_string(), Value::String("Cartesian product".into()));
        md.insert("position".to_string(), Value::Map(pos));

        let n = Notification::parse(&md);
        assert!(n.code.ends_with("CartesianProduct"));
        assert_eq!(n.severity, "N/A");
        assert_eq!(
            n.position,
            Some(Position {
                offset: 9,
                line: 1,
                column: 10
            })
        );
    }

    #[test]
    fn test_parse_success_ignores_unknown_type() {
        let mut md = HashMap::new();
        md.insert("type".to_string(), Value::String("zz".into()));
        let mut summary = Summary::default();
        summary.parse_success(&md);
        assert_eq!(summary.statement_type, StatementType::Read);
    }
}
