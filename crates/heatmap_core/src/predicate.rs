use serde::{Deserialize, Serialize};

use crate::ident::Ident;
use crate::{HeatmapError, HeatmapResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Row-selection condition composed as data.
///
/// Values are bound as statement parameters by the store; only column names
/// end up in SQL text, and those are [`Ident`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    All {
        predicates: Vec<Predicate>,
    },
    Any {
        predicates: Vec<Predicate>,
    },
    Not {
        predicate: Box<Predicate>,
    },
    Compare {
        column: Ident,
        cmp: CompareOp,
        value: FilterValue,
    },
    In {
        column: Ident,
        values: Vec<FilterValue>,
    },
    IsNull {
        column: Ident,
    },
    IsNotNull {
        column: Ident,
    },
}

impl Predicate {
    /// Matches every row.
    pub fn always() -> Self {
        Self::All {
            predicates: Vec::new(),
        }
    }

    pub fn compare(column: Ident, cmp: CompareOp, value: impl Into<FilterValue>) -> Self {
        Self::Compare {
            column,
            cmp,
            value: value.into(),
        }
    }

    pub fn eq(column: Ident, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::All { mut predicates } => {
                predicates.push(other);
                Self::All { predicates }
            }
            first => Self::All {
                predicates: vec![first, other],
            },
        }
    }

    pub fn negate(self) -> Self {
        Self::Not {
            predicate: Box::new(self),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Self::All { predicates } if predicates.is_empty())
    }

    pub fn validate(&self) -> HeatmapResult<()> {
        match self {
            Self::All { predicates } | Self::Any { predicates } => {
                predicates.iter().try_for_each(Predicate::validate)
            }
            Self::Not { predicate } => predicate.validate(),
            Self::Compare { cmp, value, column } => {
                if *cmp == CompareOp::Like && !matches!(value, FilterValue::Text(_)) {
                    return Err(HeatmapError::validation(format!(
                        "like on '{column}' requires a text pattern"
                    )));
                }
                if let FilterValue::Float(value) = value
                    && !value.is_finite()
                {
                    return Err(HeatmapError::validation(format!(
                        "comparison on '{column}' uses a non-finite value"
                    )));
                }
                Ok(())
            }
            Self::In { column, values } => {
                if values.is_empty() {
                    return Err(HeatmapError::validation(format!(
                        "in-list on '{column}' is empty"
                    )));
                }
                Ok(())
            }
            Self::IsNull { .. } | Self::IsNotNull { .. } => Ok(()),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

#[cfg(test)]
mod tests {
    use super::{CompareOp, FilterValue, Predicate};
    use crate::ident::Ident;
    use serde_json::json;

    fn col(name: &str) -> Ident {
        Ident::new(name).expect("ident")
    }

    #[test]
    fn deserializes_nested_clause_tree() {
        let payload = json!({
            "op": "all",
            "predicates": [
                { "op": "compare", "column": "category", "cmp": "eq", "value": "school" },
                { "op": "not", "predicate": { "op": "is_null", "column": "capacity" } },
                { "op": "in", "column": "layer_id", "values": [1, 2, 3] }
            ]
        });
        let predicate: Predicate = serde_json::from_value(payload).expect("predicate");
        let Predicate::All { predicates } = &predicate else {
            panic!("expected all, got {predicate:?}");
        };
        assert_eq!(predicates.len(), 3);
        assert_eq!(
            predicates[0],
            Predicate::compare(col("category"), CompareOp::Eq, "school")
        );
        assert!(matches!(
            &predicates[2],
            Predicate::In { values, .. } if values == &vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Int(3)]
        ));
        predicate.validate().expect("valid");
    }

    #[test]
    fn rejects_unsafe_column_names_at_deserialization() {
        let payload = json!({
            "op": "compare",
            "column": "x = 1 OR 1",
            "cmp": "eq",
            "value": 1
        });
        assert!(serde_json::from_value::<Predicate>(payload).is_err());
    }

    #[test]
    fn validate_rejects_empty_in_lists_and_numeric_like() {
        let empty_in = Predicate::In {
            column: col("id"),
            values: Vec::new(),
        };
        assert!(empty_in.validate().is_err());
        let numeric_like = Predicate::compare(col("name"), CompareOp::Like, 3_i64);
        assert!(numeric_like.validate().is_err());
    }

    #[test]
    fn and_flattens_into_all() {
        let combined = Predicate::always()
            .and(Predicate::eq(col("a"), 1_i64))
            .and(Predicate::eq(col("b"), true));
        match combined {
            Predicate::All { predicates } => assert_eq!(predicates.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Predicate::default().is_always());
    }
}
