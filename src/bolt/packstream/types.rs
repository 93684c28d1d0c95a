//! PackStream value types.

use std::collections::HashMap;

/// A PackStream value.
///
/// This is the closed universe of values the Bolt v1 wire protocol
/// exchanges. Integers are always signed 64-bit at this level; the codec
/// narrows them on the wire and widens them back on decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<Value>),
    /// Map of string keys to values
    Map(HashMap<String, Value>),
    /// Tagged structure (graph entities and protocol messages)
    Structure(Structure),
}

/// A PackStream structure: a one-byte tag plus a fixed sequence of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Structure tag (identifies the type)
    pub tag: u8,
    /// Structure fields
    pub fields: Vec<Value>,
}

impl Structure {
    /// Create a new structure with the given tag and fields.
    pub fn new(tag: u8, fields: Vec<Value>) -> Self {
        Self { tag, fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the structure has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list reference.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Try to get as map reference.
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get as structure reference.
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Value::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Structure(_) => "Structure",
        }
    }
}

// Conversions from native types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<Structure> for Value {
    fn from(v: Structure) -> Self {
        Value::Structure(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null() {
        let v = Value::Null;
        assert!(v.is_null());
        assert_eq!(v.type_name(), "Null");
    }

    #[test]
    fn test_boolean() {
        let v = Value::Boolean(true);
        assert_eq!(v.as_bool(), Some(true));
        assert!(!v.is_null());
    }

    #[test]
    fn test_integer() {
        let v = Value::Integer(42);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_float(), None);
    }

    #[test]
    fn test_float() {
        let v = Value::Float(3.25);
        assert_eq!(v.as_float(), Some(3.25));
        assert_eq!(v.as_int(), None);
    }

    #[test]
    fn test_string() {
        let v = Value::String("hello".to_string());
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_list() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(v.as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_map() {
        let mut map = HashMap::new();
        map.insert("key".to_string(), Value::Integer(42));
        let v = Value::Map(map);
        assert_eq!(v.as_map().unwrap().get("key").unwrap().as_int(), Some(42));
    }

    #[test]
    fn test_structure() {
        let s = Structure::new(0x4E, vec![Value::Integer(1)]);
        assert_eq!(s.tag, 0x4E);
        assert_eq!(s.len(), 1);
        assert!(!s.is_empty());

        let v = Value::Structure(s);
        assert!(v.as_structure().is_some());
    }

    #[test]
    fn test_from_conversions() {
        let _: Value = true.into();
        let _: Value = 42i64.into();
        let _: Value = 42i32.into();
        let _: Value = 3.25f64.into();
        let _: Value = "hello".into();
        let _: Value = String::from("hello").into();
        let _: Value = Option::<i64>::None.into();
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
    }
}
