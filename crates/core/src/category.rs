//! The two-level category taxonomy: main category → sub-category → keywords.
//!
//! Insertion order is significant at both levels (it decides which sub-category wins when
//! several match, and it fixes the report's column order), so the taxonomy is stored as
//! ordered vectors and (de)serialized as maps in document order.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use thiserror::Error;

/// The main category whose sub-categories become report columns.
pub const EXPENSES: &str = "Expenses";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid categories JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid categories TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported categories file extension: '{0}' (expected .json or .toml)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainCategory {
    pub name: String,
    pub subs: Vec<SubCategory>,
}

impl MainCategory {
    pub fn sub(&self, name: &str) -> Option<&SubCategory> {
        self.subs.iter().find(|s| s.name == name)
    }

    pub fn sub_names(&self) -> impl Iterator<Item = &str> {
        self.subs.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories {
    mains: Vec<MainCategory>,
}

impl Categories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a main category. A later call with an existing name replaces its
    /// sub-categories in place, keeping the original position.
    pub fn with_main<N, S, K>(mut self, name: N, subs: impl IntoIterator<Item = (S, K)>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let name = name.into();
        let mut list: Vec<SubCategory> = Vec::new();
        for (sub, keywords) in subs {
            let sub = sub.into();
            let keywords = keywords.into_iter().map(Into::into).collect();
            match list.iter_mut().find(|s| s.name == sub) {
                Some(existing) => existing.keywords = keywords,
                None => list.push(SubCategory { name: sub, keywords }),
            }
        }
        match self.mains.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.subs = list,
            None => self.mains.push(MainCategory { name, subs: list }),
        }
        self
    }

    pub fn mains(&self) -> &[MainCategory] {
        &self.mains
    }

    pub fn main(&self, name: &str) -> Option<&MainCategory> {
        self.mains.iter().find(|m| m.name == name)
    }

    pub fn expenses(&self) -> Option<&MainCategory> {
        self.main(EXPENSES)
    }

    pub fn is_empty(&self) -> bool {
        self.mains.is_empty()
    }

    pub fn from_json(content: &str) -> Result<Self, CategoryError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, CategoryError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, CategoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a taxonomy document, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, CategoryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let content = std::fs::read_to_string(path)?;
        match ext.as_str() {
            "json" => Self::from_json(&content),
            "toml" => Self::from_toml(&content),
            other => Err(CategoryError::UnsupportedFormat(other.to_string())),
        }
    }

    /// The built-in taxonomy used when the caller supplies none.
    pub fn builtin() -> Self {
        let income: [(&str, &[&str]); 2] = [
            ("Kinect", &["dataannotation", "kinect"]),
            ("Other", &["e-transfer", "deposit", "income"]),
        ];
        let expenses: [(&str, &[&str]); 14] = [
            (
                "Living Expenses",
                &["rent", "hydro", "utility", "insurance", "bill", "property tax"],
            ),
            (
                "Groceries",
                &[
                    "walmart",
                    "superstore",
                    "loblaws",
                    "costco",
                    "iga",
                    "super c",
                    "the village store",
                    "freshmarket",
                    "athens fresh market",
                ],
            ),
            ("Pets", &["vet", "petco", "petland"]),
            (
                "Subscriptions",
                &[
                    "spotify",
                    "netflix",
                    "crave",
                    "subscription",
                    "prime",
                    "virgin plus",
                    "disney",
                    "github",
                ],
            ),
            ("Phone Bill", &["rogers", "bell", "fido", "koodo", "phone"]),
            ("Alcohol", &["liquor", "beer store", "lcbo", "fpos Saq"]),
            (
                "Non-Grocery Food",
                &[
                    "restaurant",
                    "ubereats",
                    "skipthe",
                    "fast food",
                    "mcdonalds",
                    "tim hortons",
                    "coffee",
                    "couchetard",
                    "convenien",
                    "A & W",
                    "Picton On vic social",
                    "Picton On metro",
                    "Kettleman'S",
                ],
            ),
            (
                "Misc Spending",
                &[
                    "service charge",
                    "fee",
                    "bank charge",
                    "big al's aquarium",
                    "value village",
                    "amzn",
                    "affirm canada",
                    "physio outaouais",
                    "amazon.ca",
                    "sail",
                    "kindle",
                    " L'As Des Jeux ",
                    "sessions cannabis",
                    "interest charges",
                    "justice quebec amendes",
                    "dollarama",
                    "cdkeys",
                ],
            ),
            (
                "Automotive",
                &[
                    "petro-canada",
                    "esso",
                    "shell",
                    "gas",
                    "car",
                    "tire",
                    "maintenance",
                    "pioneer",
                    "macewen",
                ],
            ),
            ("Gifts", &[]),
            (
                "Dates",
                &[
                    "cinema",
                    "famous players",
                    "dinner",
                    "flower",
                    "midtown brewing",
                    "currah's cafe",
                    "karlo estates",
                    "prince eddy",
                ],
            ),
            ("Loans", &["loan", "student", "repayment", "nslsc"]),
            (
                "Trips",
                &[
                    "airbnb",
                    "flight",
                    "air canada",
                    "hotel",
                    "expedia",
                    "mecp-ontpark-int-resorill",
                ],
            ),
            ("Sailboat Work", &["marine", "boat", "chandlery"]),
        ];

        Categories::new()
            .with_main("Income", income.iter().map(|(s, k)| (*s, k.iter().copied())))
            .with_main(EXPENSES, expenses.iter().map(|(s, k)| (*s, k.iter().copied())))
    }
}

// ── serde ─────────────────────────────────────────────────────────────────────

impl Serialize for Categories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.mains.len()))?;
        for main in &self.mains {
            map.serialize_entry(&main.name, &SubsRef(&main.subs))?;
        }
        map.end()
    }
}

struct SubsRef<'a>(&'a [SubCategory]);

impl Serialize for SubsRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for sub in self.0 {
            map.serialize_entry(&sub.name, &sub.keywords)?;
        }
        map.end()
    }
}

/// Collects a map into `(key, value)` pairs in document order, rejecting repeated keys.
struct OrderedPairs<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedPairs<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
            type Value = OrderedPairs<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    if pairs.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate category '{key}'")));
                    }
                    pairs.push((key, value));
                }
                Ok(OrderedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor(PhantomData))
    }
}

impl<'de> Deserialize<'de> for Categories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let OrderedPairs(mains) = OrderedPairs::<OrderedPairs<Vec<String>>>::deserialize(deserializer)?;
        let mains = mains
            .into_iter()
            .map(|(name, OrderedPairs(subs))| MainCategory {
                name,
                subs: subs
                    .into_iter()
                    .map(|(name, keywords)| SubCategory { name, keywords })
                    .collect(),
            })
            .collect();
        Ok(Categories { mains })
    }
}
