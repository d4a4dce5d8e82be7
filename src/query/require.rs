//! Require constraints
//!
//! Requirements shape the output: which parts of the entity bodies are
//! fetched, which page is returned and which extra results are computed.
//! They never change the candidate set, with one exception: `priceType`
//! selects the amount that `priceBetween` compares.

use serde::{Deserialize, Serialize};

use super::filter::FilterBy;
use super::order::OrderBy;
use crate::catalog::{Locale, PriceType};

/// Which price records an entity body carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceContentMode {
    /// Only the price for sale
    #[default]
    None,
    /// Prices in the filtered currency and price lists
    RespectingFilter,
    All,
}

/// Content of a reference in a fetched body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceContent {
    /// Reference names; empty means all references
    #[serde(default)]
    pub names: Vec<String>,
    /// Filters referenced entities
    #[serde(default)]
    pub filter_by: FilterBy,
    /// Orders references by referenced entity properties
    #[serde(default)]
    pub order_by: OrderBy,
    /// Reference attributes; `None` fetches none, empty fetches all
    #[serde(default)]
    pub attribute_content: Option<Vec<String>>,
    #[serde(default)]
    pub entity_fetch: Option<EntityFetch>,
    #[serde(default)]
    pub entity_group_fetch: Option<EntityFetch>,
}

impl ReferenceContent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, fetch: EntityFetch) -> Self {
        self.entity_fetch = Some(fetch);
        self
    }

    pub fn includes(&self, reference: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n == reference)
    }
}

/// One requested content scope of a fetched body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityContent {
    /// Attribute names; empty means all
    AttributeContent(Vec<String>),
    /// Associated data names; empty means all
    AssociatedDataContent(Vec<String>),
    PriceContent {
        #[serde(default)]
        mode: PriceContentMode,
        #[serde(default)]
        additional_price_lists: Vec<String>,
    },
    ReferenceContent(ReferenceContent),
    /// Parent chain of a hierarchical entity
    HierarchyContent {
        #[serde(default)]
        stop_at: Option<StopAt>,
        #[serde(default)]
        entity_fetch: Option<EntityFetch>,
    },
    /// Locales of localized values; empty means all
    DataInLocales(Vec<Locale>),
}

/// Requested entity body; without it only references are returned
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityFetch {
    pub content: Vec<EntityContent>,
}

impl EntityFetch {
    pub fn new(content: Vec<EntityContent>) -> Self {
        Self { content }
    }

    /// Body with every attribute
    pub fn attributes() -> Self {
        Self::new(vec![EntityContent::AttributeContent(Vec::new())])
    }

    pub fn attribute_names(&self) -> Option<&[String]> {
        self.content.iter().find_map(|c| match c {
            EntityContent::AttributeContent(names) => Some(names.as_slice()),
            _ => None,
        })
    }

    pub fn associated_data_names(&self) -> Option<&[String]> {
        self.content.iter().find_map(|c| match c {
            EntityContent::AssociatedDataContent(names) => Some(names.as_slice()),
            _ => None,
        })
    }

    pub fn price_content(&self) -> Option<(PriceContentMode, &[String])> {
        self.content.iter().find_map(|c| match c {
            EntityContent::PriceContent {
                mode,
                additional_price_lists,
            } => Some((*mode, additional_price_lists.as_slice())),
            _ => None,
        })
    }

    pub fn references(&self) -> impl Iterator<Item = &ReferenceContent> {
        self.content.iter().filter_map(|c| match c {
            EntityContent::ReferenceContent(r) => Some(r),
            _ => None,
        })
    }

    pub fn hierarchy_content(&self) -> Option<(Option<&StopAt>, Option<&EntityFetch>)> {
        self.content.iter().find_map(|c| match c {
            EntityContent::HierarchyContent {
                stop_at,
                entity_fetch,
            } => Some((stop_at.as_ref(), entity_fetch.as_ref())),
            _ => None,
        })
    }

    pub fn data_in_locales(&self) -> Option<&[Locale]> {
        self.content.iter().find_map(|c| match c {
            EntityContent::DataInLocales(locales) => Some(locales.as_slice()),
            _ => None,
        })
    }
}

/// Facet statistic depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetStatisticsDepth {
    #[default]
    Counts,
    Impact,
}

/// Facet summary settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummarySpec {
    #[serde(default)]
    pub depth: FacetStatisticsDepth,
    /// Filters facet entities (the referenced collection)
    #[serde(default)]
    pub filter_by: FilterBy,
    /// Filters group entities
    #[serde(default)]
    pub filter_group_by: FilterBy,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub order_group_by: OrderBy,
    #[serde(default)]
    pub entity_fetch: Option<EntityFetch>,
    #[serde(default)]
    pub group_entity_fetch: Option<EntityFetch>,
}

/// Facet summary of one reference, overriding the general settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummaryOfReference {
    pub name: String,
    #[serde(flatten)]
    pub summary: FacetSummarySpec,
}

/// Groups a facet relation applies to; `None` means every group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetGroupRelation {
    pub reference: String,
    #[serde(default)]
    pub groups: Option<Vec<u32>>,
}

impl FacetGroupRelation {
    pub fn applies_to(&self, reference: &str, group: Option<u32>) -> bool {
        self.reference == reference
            && match (&self.groups, group) {
                (None, _) => true,
                (Some(groups), Some(group)) => groups.contains(&group),
                (Some(_), None) => false,
            }
    }
}

/// Histogram bucket strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistogramBehavior {
    #[default]
    Standard,
    /// Fewer buckets until none is empty
    Optimized,
}

/// Where hierarchy traversal stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopAt {
    /// Edges from the traversal start
    Distance(u32),
    /// Absolute level, roots are on level 1
    Level(u32),
    /// First matching node, excluded
    Node(FilterBy),
}

/// Base candidate set for hierarchy statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatisticsBase {
    #[default]
    CompleteFilter,
    WithoutUserFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatisticsType {
    ChildrenCount,
    QueriedEntityCount,
}

/// Requested hierarchy statistics; no types means queried entity count
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub base: StatisticsBase,
    #[serde(default)]
    pub types: Vec<StatisticsType>,
}

impl Statistics {
    pub fn wants(&self, ty: StatisticsType) -> bool {
        if self.types.is_empty() {
            ty == StatisticsType::QueriedEntityCount
        } else {
            self.types.contains(&ty)
        }
    }
}

/// Settings shared by all hierarchy axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSpec {
    /// Key of the axis in the hierarchy result
    pub output_name: String,
    #[serde(default)]
    pub entity_fetch: Option<EntityFetch>,
    #[serde(default)]
    pub stop_at: Option<StopAt>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl AxisSpec {
    pub fn named(output_name: impl Into<String>) -> Self {
        Self {
            output_name: output_name.into(),
            entity_fetch: None,
            stop_at: None,
            statistics: None,
        }
    }

    pub fn stop_at(mut self, stop_at: StopAt) -> Self {
        self.stop_at = Some(stop_at);
        self
    }

    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_entity(mut self, fetch: EntityFetch) -> Self {
        self.entity_fetch = Some(fetch);
        self
    }
}

/// Axis anchored at nodes matching a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromNodeSpec {
    pub node: FilterBy,
    #[serde(flatten)]
    pub axis: AxisSpec,
}

/// One hierarchy axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HierarchyRequirement {
    FromRoot(AxisSpec),
    FromNode(FromNodeSpec),
    Children(AxisSpec),
    Parents(AxisSpec),
    Siblings(AxisSpec),
}

impl HierarchyRequirement {
    pub fn axis(&self) -> &AxisSpec {
        match self {
            HierarchyRequirement::FromRoot(axis)
            | HierarchyRequirement::Children(axis)
            | HierarchyRequirement::Parents(axis)
            | HierarchyRequirement::Siblings(axis) => axis,
            HierarchyRequirement::FromNode(spec) => &spec.axis,
        }
    }
}

/// Whether hierarchy nodes without queried entities stay in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyHierarchicalEntityBehaviour {
    #[default]
    LeaveEmpty,
    RemoveEmpty,
}

/// Hierarchy of the queried collection itself
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyOfSelf {
    #[serde(default)]
    pub order_by: OrderBy,
    pub requirements: Vec<HierarchyRequirement>,
}

/// Hierarchy of a collection targeted by a reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyOfReference {
    pub name: String,
    #[serde(default)]
    pub empty_behaviour: EmptyHierarchicalEntityBehaviour,
    #[serde(default)]
    pub order_by: OrderBy,
    pub requirements: Vec<HierarchyRequirement>,
}

/// A single require constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequireConstraint {
    /// 1-based page number
    Page { number: usize, size: usize },
    Strip { offset: usize, limit: usize },
    EntityFetch(EntityFetch),
    FacetSummary(FacetSummarySpec),
    FacetSummaryOfReference(FacetSummaryOfReference),
    FacetGroupsConjunction(FacetGroupRelation),
    FacetGroupsDisjunction(FacetGroupRelation),
    FacetGroupsNegation(FacetGroupRelation),
    PriceType(PriceType),
    PriceHistogram {
        bucket_count: usize,
        #[serde(default)]
        behavior: HistogramBehavior,
    },
    AttributeHistogram {
        bucket_count: usize,
        #[serde(default)]
        behavior: HistogramBehavior,
        names: Vec<String>,
    },
    HierarchyOfSelf(HierarchyOfSelf),
    HierarchyOfReference(HierarchyOfReference),
    QueryTelemetry,
}

impl RequireConstraint {
    pub fn name(&self) -> &'static str {
        match self {
            RequireConstraint::Page { .. } => "page",
            RequireConstraint::Strip { .. } => "strip",
            RequireConstraint::EntityFetch(_) => "entityFetch",
            RequireConstraint::FacetSummary(_) => "facetSummary",
            RequireConstraint::FacetSummaryOfReference(_) => "facetSummaryOfReference",
            RequireConstraint::FacetGroupsConjunction(_) => "facetGroupsConjunction",
            RequireConstraint::FacetGroupsDisjunction(_) => "facetGroupsDisjunction",
            RequireConstraint::FacetGroupsNegation(_) => "facetGroupsNegation",
            RequireConstraint::PriceType(_) => "priceType",
            RequireConstraint::PriceHistogram { .. } => "priceHistogram",
            RequireConstraint::AttributeHistogram { .. } => "attributeHistogram",
            RequireConstraint::HierarchyOfSelf(_) => "hierarchyOfSelf",
            RequireConstraint::HierarchyOfReference(_) => "hierarchyOfReference",
            RequireConstraint::QueryTelemetry => "queryTelemetry",
        }
    }
}

/// Requested slice of the ordered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Page { number: usize, size: usize },
    Strip { offset: usize, limit: usize },
}

/// How facets of different groups or within one group combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRelation {
    Conjunction,
    Disjunction,
    Negation,
}

/// The require part of a query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Require {
    pub constraints: Vec<RequireConstraint>,
}

impl Require {
    pub fn new(constraints: Vec<RequireConstraint>) -> Self {
        Self { constraints }
    }

    pub fn slice(&self) -> Option<Slice> {
        self.constraints.iter().find_map(|c| match c {
            RequireConstraint::Page { number, size } => Some(Slice::Page {
                number: *number,
                size: *size,
            }),
            RequireConstraint::Strip { offset, limit } => Some(Slice::Strip {
                offset: *offset,
                limit: *limit,
            }),
            _ => None,
        })
    }

    pub fn entity_fetch(&self) -> Option<&EntityFetch> {
        self.constraints.iter().find_map(|c| match c {
            RequireConstraint::EntityFetch(fetch) => Some(fetch),
            _ => None,
        })
    }

    pub fn price_type(&self) -> PriceType {
        self.constraints
            .iter()
            .find_map(|c| match c {
                RequireConstraint::PriceType(price_type) => Some(*price_type),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn facet_summary(&self) -> Option<&FacetSummarySpec> {
        self.constraints.iter().find_map(|c| match c {
            RequireConstraint::FacetSummary(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn facet_summaries_of_reference(&self) -> impl Iterator<Item = &FacetSummaryOfReference> {
        self.constraints.iter().filter_map(|c| match c {
            RequireConstraint::FacetSummaryOfReference(spec) => Some(spec),
            _ => None,
        })
    }

    /// Whether a relation is declared for a facet group. Facets within a
    /// group default to disjunction, groups default to conjunction.
    pub fn has_group_relation(
        &self,
        relation: GroupRelation,
        reference: &str,
        group: Option<u32>,
    ) -> bool {
        self.constraints.iter().any(|c| match (c, relation) {
            (RequireConstraint::FacetGroupsConjunction(r), GroupRelation::Conjunction)
            | (RequireConstraint::FacetGroupsDisjunction(r), GroupRelation::Disjunction)
            | (RequireConstraint::FacetGroupsNegation(r), GroupRelation::Negation) => {
                r.applies_to(reference, group)
            }
            _ => false,
        })
    }

    pub fn hierarchy_of_self(&self) -> Option<&HierarchyOfSelf> {
        self.constraints.iter().find_map(|c| match c {
            RequireConstraint::HierarchyOfSelf(h) => Some(h),
            _ => None,
        })
    }

    pub fn hierarchies_of_reference(&self) -> impl Iterator<Item = &HierarchyOfReference> {
        self.constraints.iter().filter_map(|c| match c {
            RequireConstraint::HierarchyOfReference(h) => Some(h),
            _ => None,
        })
    }

    pub fn telemetry(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, RequireConstraint::QueryTelemetry))
    }
}
