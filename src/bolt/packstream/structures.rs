//! Typed graph entities carried inside PackStream structures.

use std::collections::HashMap;

use super::marker::*;
use super::types::{Structure, Value};
use super::PackStreamError;

/// A node in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Server-assigned node identity
    pub id: i64,
    /// Node labels
    pub labels: Vec<String>,
    /// Node properties
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// Create a new node.
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            labels,
            properties,
        }
    }

    /// Convert into a PackStream value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            NODE_TAG,
            vec![
                Value::Integer(self.id),
                Value::List(
                    self.labels
                        .iter()
                        .map(|s| Value::String(s.clone()))
                        .collect(),
                ),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Try to parse from a PackStream value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let s = expect_structure(value, NODE_TAG, "Node", 3)?;

        let id = s.fields[0]
            .as_int()
            .ok_or_else(|| PackStreamError::InvalidStructure("Node id must be integer".into()))?;

        let labels = s.fields[1]
            .as_list()
            .ok_or_else(|| PackStreamError::InvalidStructure("Node labels must be list".into()))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| PackStreamError::InvalidStructure("label must be string".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let properties = s.fields[2]
            .as_map()
            .ok_or_else(|| PackStreamError::InvalidStructure("Node properties must be map".into()))?
            .clone();

        Ok(Self {
            id,
            labels,
            properties,
        })
    }
}

/// A relationship between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Server-assigned relationship identity
    pub id: i64,
    /// Start node identity
    pub start_id: i64,
    /// End node identity
    pub end_id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Relationship properties
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        id: i64,
        start_id: i64,
        end_id: i64,
        rel_type: String,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            start_id,
            end_id,
            rel_type,
            properties,
        }
    }

    /// Convert into a PackStream value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            RELATIONSHIP_TAG,
            vec![
                Value::Integer(self.id),
                Value::Integer(self.start_id),
                Value::Integer(self.end_id),
                Value::String(self.rel_type.clone()),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Try to parse from a PackStream value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let s = expect_structure(value, RELATIONSHIP_TAG, "Relationship", 5)?;

        let id = int_field(&s.fields[0], "Relationship id")?;
        let start_id = int_field(&s.fields[1], "Relationship start id")?;
        let end_id = int_field(&s.fields[2], "Relationship end id")?;

        let rel_type = s.fields[3]
            .as_str()
            .ok_or_else(|| {
                PackStreamError::InvalidStructure("Relationship type must be string".into())
            })?
            .to_string();

        let properties = s.fields[4]
            .as_map()
            .ok_or_else(|| {
                PackStreamError::InvalidStructure("Relationship properties must be map".into())
            })?
            .clone();

        Ok(Self {
            id,
            start_id,
            end_id,
            rel_type,
            properties,
        })
    }
}

/// A relationship inside a [`Path`], with its endpoints elided.
///
/// The endpoints are recovered from the path's node sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    /// Server-assigned relationship identity
    pub id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Relationship properties
    pub properties: HashMap<String, Value>,
}

impl UnboundRelationship {
    /// Create a new unbound relationship.
    pub fn new(id: i64, rel_type: String, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            rel_type,
            properties,
        }
    }

    /// Convert into a PackStream value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            UNBOUND_RELATIONSHIP_TAG,
            vec![
                Value::Integer(self.id),
                Value::String(self.rel_type.clone()),
                Value::Map(self.properties.clone()),
            ],
        ))
    }

    /// Try to parse from a PackStream value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let s = expect_structure(value, UNBOUND_RELATIONSHIP_TAG, "UnboundRelationship", 3)?;

        let id = int_field(&s.fields[0], "UnboundRelationship id")?;
        let rel_type = s.fields[1]
            .as_str()
            .ok_or_else(|| {
                PackStreamError::InvalidStructure("UnboundRelationship type must be string".into())
            })?
            .to_string();
        let properties = s.fields[2]
            .as_map()
            .ok_or_else(|| {
                PackStreamError::InvalidStructure(
                    "UnboundRelationship properties must be map".into(),
                )
            })?
            .clone();

        Ok(Self {
            id,
            rel_type,
            properties,
        })
    }
}

/// An alternating walk of nodes and relationships.
///
/// `sequence` holds pairs `(rel_index, node_index)`: `|rel_index|` is a
/// 1-based index into `relationships` whose sign encodes direction, and
/// `node_index` is a 0-based index into `nodes`. `nodes[0]` is the start of
/// the path, so `sequence` always has even length.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// The distinct nodes along the path
    pub nodes: Vec<Node>,
    /// The distinct relationships along the path
    pub relationships: Vec<UnboundRelationship>,
    /// The walk over `nodes` and `relationships`
    pub sequence: Vec<i64>,
}

impl Path {
    /// Create a new path.
    pub fn new(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        sequence: Vec<i64>,
    ) -> Self {
        Self {
            nodes,
            relationships,
            sequence,
        }
    }

    /// The start node of the path, if any.
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Number of relationships traversed.
    pub fn len(&self) -> usize {
        self.sequence.len() / 2
    }

    /// Whether the path has zero relationships.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Convert into a PackStream value.
    pub fn to_value(&self) -> Value {
        Value::Structure(Structure::new(
            PATH_TAG,
            vec![
                Value::List(self.nodes.iter().map(Node::to_value).collect()),
                Value::List(
                    self.relationships
                        .iter()
                        .map(UnboundRelationship::to_value)
                        .collect(),
                ),
                Value::List(self.sequence.iter().map(|i| Value::Integer(*i)).collect()),
            ],
        ))
    }

    /// Try to parse from a PackStream value.
    pub fn from_value(value: &Value) -> Result<Self, PackStreamError> {
        let s = expect_structure(value, PATH_TAG, "Path", 3)?;

        let nodes = s.fields[0]
            .as_list()
            .ok_or_else(|| PackStreamError::InvalidStructure("Path nodes must be list".into()))?
            .iter()
            .map(Node::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let relationships = s.fields[1]
            .as_list()
            .ok_or_else(|| {
                PackStreamError::InvalidStructure("Path relationships must be list".into())
            })?
            .iter()
            .map(UnboundRelationship::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let sequence = s.fields[2]
            .as_list()
            .ok_or_else(|| PackStreamError::InvalidStructure("Path sequence must be list".into()))?
            .iter()
            .map(|v| int_field(v, "Path sequence entry"))
            .collect::<Result<Vec<_>, _>>()?;

        if sequence.len() % 2 != 0 {
            return Err(PackStreamError::InvalidStructure(
                "Path sequence must have even length".into(),
            ));
        }

        Ok(Self {
            nodes,
            relationships,
            sequence,
        })
    }
}

fn expect_structure<'v>(
    value: &'v Value,
    tag: u8,
    name: &str,
    arity: usize,
) -> Result<&'v Structure, PackStreamError> {
    let s = value.as_structure().ok_or_else(|| {
        PackStreamError::InvalidStructure(format!("expected {} structure", name))
    })?;
    if s.tag != tag {
        return Err(PackStreamError::InvalidStructure(format!(
            "expected {} tag 0x{:02X}, got 0x{:02X}",
            name, tag, s.tag
        )));
    }
    if s.fields.len() != arity {
        return Err(PackStreamError::InvalidStructure(format!(
            "{} requires {} fields, got {}",
            name,
            arity,
            s.fields.len()
        )));
    }
    Ok(s)
}

fn int_field(value: &Value, what: &str) -> Result<i64, PackStreamError> {
    value
        .as_int()
        .ok_or_else(|| PackStreamError::InvalidStructure(format!("{} must be integer", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(k: &str, v: &str) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert(k.to_string(), Value::String(v.to_string()));
        m
    }

    #[test]
    fn test_node_roundtrip() {
        let node = Node::new(7, vec!["FOO".to_string()], props("a", "1"));
        let parsed = Node::from_value(&node.to_value()).unwrap();
        assert_eq!(node, parsed);
    }

    #[test]
    fn test_node_wrong_tag() {
        let v = Value::Structure(Structure::new(RELATIONSHIP_TAG, vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
        ]));
        assert!(Node::from_value(&v).is_err());
    }

    #[test]
    fn test_relationship_roundtrip() {
        let rel = Relationship::new(1, 2, 3, "KNOWS".to_string(), props("since", "2016"));
        let parsed = Relationship::from_value(&rel.to_value()).unwrap();
        assert_eq!(rel, parsed);
    }

    #[test]
    fn test_unbound_relationship_roundtrip() {
        let rel = UnboundRelationship::new(9, "LIKES".to_string(), HashMap::new());
        let parsed = UnboundRelationship::from_value(&rel.to_value()).unwrap();
        assert_eq!(rel, parsed);
    }

    #[test]
    fn test_path_roundtrip() {
        let path = Path::new(
            vec![
                Node::new(1, vec!["A".to_string()], HashMap::new()),
                Node::new(2, vec!["B".to_string()], HashMap::new()),
            ],
            vec![UnboundRelationship::new(5, "TO".to_string(), HashMap::new())],
            vec![1, 1],
        );
        let parsed = Path::from_value(&path.to_value()).unwrap();
        assert_eq!(path, parsed);
        assert_eq!(parsed.start().unwrap().id, 1);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_path_odd_sequence_rejected() {
        let v = Value::Structure(Structure::new(
            PATH_TAG,
            vec![
                Value::List(vec![]),
                Value::List(vec![]),
                Value::List(vec![Value::Integer(1)]),
            ],
        ));
        assert!(Path::from_value(&v).is_err());
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let v = Value::Structure(Structure::new(NODE_TAG, vec![Value::Integer(1)]));
        assert!(Node::from_value(&v).is_err());
    }
}
