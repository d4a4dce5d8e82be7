//! Query root

use serde::{Deserialize, Serialize};

use super::filter::{FilterBy, FilterConstraint};
use super::order::{OrderBy, OrderConstraint};
use super::require::{Require, RequireConstraint};

/// A complete query: collection selector plus filter, order and require parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub collection: String,
    #[serde(default)]
    pub filter_by: FilterBy,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub require: Require,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter_by: FilterBy::default(),
            order_by: OrderBy::default(),
            require: Require::default(),
        }
    }

    pub fn filter(mut self, constraints: Vec<FilterConstraint>) -> Self {
        self.filter_by = FilterBy::new(constraints);
        self
    }

    pub fn order(mut self, constraints: Vec<OrderConstraint>) -> Self {
        self.order_by = OrderBy::new(constraints);
        self
    }

    pub fn require(mut self, constraints: Vec<RequireConstraint>) -> Self {
        self.require = Require::new(constraints);
        self
    }

    /// Same query over a substituted filter
    pub fn with_filter_by(&self, filter_by: FilterBy) -> Self {
        Self {
            collection: self.collection.clone(),
            filter_by,
            order_by: self.order_by.clone(),
            require: self.require.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let query: Query = serde_json::from_str(r#"{"collection": "Product"}"#).unwrap();
        assert_eq!(query, Query::new("Product"));
    }

    #[test]
    fn test_builder() {
        let query = Query::new("Product")
            .filter(vec![FilterConstraint::attribute_equals("code", "x")])
            .order(vec![OrderConstraint::asc("code")])
            .require(vec![RequireConstraint::Page { number: 1, size: 5 }]);
        assert_eq!(query.filter_by.constraints.len(), 1);
        assert_eq!(query.order_by.constraints.len(), 1);
        assert!(query.require.slice().is_some());
    }
}
