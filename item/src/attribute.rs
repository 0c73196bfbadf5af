use std::{collections::BTreeMap, fmt};

/// DynamoDB-style attribute value. Only the shapes the harness writes are modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(i64),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        AttributeValue::M(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::N(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        match self {
            AttributeValue::M(map) => map.get(name),
            _ => None,
        }
    }

    /// Rough wire size, used by the memory store to reject oversized items.
    pub fn size_hint(&self) -> usize {
        match self {
            AttributeValue::S(s) => s.len(),
            AttributeValue::N(_) => 8,
            AttributeValue::M(map) => map.iter().map(|(k, v)| k.len() + v.size_hint()).sum(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::S(s) => write!(f, "{{S: {:?}}}", s),
            AttributeValue::N(n) => write!(f, "{{N: \"{}\"}}", n),
            AttributeValue::M(map) => {
                write!(f, "{{M: {{")?;
                for (idx, (k, v)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}}}")
            }
        }
    }
}
