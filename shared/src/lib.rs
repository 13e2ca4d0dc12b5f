use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Body of `GET /planet/classes` and `POST /planet/predict`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
}

/// Per-class probabilities, kept in the model's class order.
///
/// Serializes as a flat JSON object (`{"label": 0.1234, ...}`) whose keys
/// appear in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassProbabilities {
    entries: Vec<(String, f64)>,
}

impl ClassProbabilities {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, probability: f64) {
        self.entries.push((label.into(), probability));
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), *p))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, probability) in &self.entries {
            map.serialize_entry(label, probability)?;
        }
        map.end()
    }
}

struct ClassProbabilitiesVisitor;

impl<'de> Visitor<'de> for ClassProbabilitiesVisitor {
    type Value = ClassProbabilities;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of class label to probability")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut out = ClassProbabilities::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, probability)) = access.next_entry::<String, f64>()? {
            out.push(label, probability);
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for ClassProbabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ClassProbabilitiesVisitor)
    }
}
