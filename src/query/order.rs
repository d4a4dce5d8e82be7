//! Order constraints

use serde::{Deserialize, Serialize};

use crate::catalog::Scalar;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

/// A single order constraint; constraints apply as successive tie-breakers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderConstraint {
    AttributeNatural {
        name: String,
        #[serde(default)]
        direction: OrderDirection,
    },
    /// Position in the explicit value list
    AttributeSetExact { name: String, values: Vec<Scalar> },
    /// Position in the `attributeInSet` literal of the filter
    AttributeSetInFilter { name: String },
    PriceNatural {
        #[serde(default)]
        direction: OrderDirection,
    },
    EntityPrimaryKeyNatural {
        #[serde(default)]
        direction: OrderDirection,
    },
    EntityPrimaryKeyExact(Vec<u32>),
    /// Position in the `entityPrimaryKeyInSet` literal of the filter
    EntityPrimaryKeyInFilter,
    Random,
    RandomWithSeed(u64),
    /// Orders by properties of the entity's reference of this name
    ReferenceProperty {
        name: String,
        order: Vec<OrderConstraint>,
    },
}

impl OrderConstraint {
    pub fn attribute_natural(name: impl Into<String>, direction: OrderDirection) -> Self {
        OrderConstraint::AttributeNatural {
            name: name.into(),
            direction,
        }
    }

    pub fn asc(name: impl Into<String>) -> Self {
        Self::attribute_natural(name, OrderDirection::Asc)
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::attribute_natural(name, OrderDirection::Desc)
    }

    pub fn price_natural(direction: OrderDirection) -> Self {
        OrderConstraint::PriceNatural { direction }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderConstraint::AttributeNatural { .. } => "attributeNatural",
            OrderConstraint::AttributeSetExact { .. } => "attributeSetExact",
            OrderConstraint::AttributeSetInFilter { .. } => "attributeSetInFilter",
            OrderConstraint::PriceNatural { .. } => "priceNatural",
            OrderConstraint::EntityPrimaryKeyNatural { .. } => "entityPrimaryKeyNatural",
            OrderConstraint::EntityPrimaryKeyExact(_) => "entityPrimaryKeyExact",
            OrderConstraint::EntityPrimaryKeyInFilter => "entityPrimaryKeyInFilter",
            OrderConstraint::Random => "random",
            OrderConstraint::RandomWithSeed(_) => "randomWithSeed",
            OrderConstraint::ReferenceProperty { .. } => "referenceProperty",
        }
    }
}

/// The order part of a query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy {
    pub constraints: Vec<OrderConstraint>,
}

impl OrderBy {
    pub fn new(constraints: Vec<OrderConstraint>) -> Self {
        Self { constraints }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let json = r#"[
            {"attributeNatural": {"name": "priority", "direction": "desc"}},
            {"priceNatural": {}},
            "random",
            {"entityPrimaryKeyExact": [3, 1]}
        ]"#;
        let order: OrderBy = serde_json::from_str(json).unwrap();
        assert_eq!(order.constraints[0], OrderConstraint::desc("priority"));
        assert_eq!(
            order.constraints[1],
            OrderConstraint::price_natural(OrderDirection::Asc)
        );
        assert_eq!(order.constraints[2].name(), "random");
    }
}
