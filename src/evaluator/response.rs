//! Evaluation response: the record page plus extra results

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::facet::FacetSummary;
use super::fetch::EntityBody;
use super::hierarchy_stats::Hierarchy;
use super::histogram::Histogram;
use super::telemetry::QueryTelemetry;
use crate::query::Slice;

/// The requested slice of ordered records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordPage {
    #[serde(rename_all = "camelCase")]
    Page {
        page_number: usize,
        page_size: usize,
        last_page_number: usize,
        total_record_count: u64,
        data: Vec<EntityBody>,
    },
    #[serde(rename_all = "camelCase")]
    Strip {
        offset: usize,
        limit: usize,
        total_record_count: u64,
        data: Vec<EntityBody>,
    },
}

impl RecordPage {
    pub fn data(&self) -> &[EntityBody] {
        match self {
            RecordPage::Page { data, .. } | RecordPage::Strip { data, .. } => data,
        }
    }

    pub fn total_record_count(&self) -> u64 {
        match self {
            RecordPage::Page {
                total_record_count, ..
            }
            | RecordPage::Strip {
                total_record_count, ..
            } => *total_record_count,
        }
    }

    pub fn primary_keys(&self) -> Vec<u32> {
        self.data().iter().map(|e| e.primary_key).collect()
    }
}

/// Resolved slice of a result of `total` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub slice: Slice,
    /// First record index
    pub offset: usize,
    /// Number of records taken from `offset`
    pub length: usize,
}

impl Window {
    /// Resolves a slice; out of range pages and strips fall back to the start
    pub fn resolve(slice: Slice, total: usize) -> Self {
        match slice {
            Slice::Page { number, size } => {
                let last = last_page_number(total, size);
                let number = if number == 0 || number > last { 1 } else { number };
                let offset = (number - 1).saturating_mul(size).min(total);
                Self {
                    slice: Slice::Page { number, size },
                    offset,
                    length: size.min(total.saturating_sub(offset)),
                }
            }
            Slice::Strip { offset, limit } => {
                let offset = if offset >= total { 0 } else { offset };
                Self {
                    slice: Slice::Strip { offset, limit },
                    offset,
                    length: limit.min(total.saturating_sub(offset)),
                }
            }
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }

    pub fn into_page(self, total: u64, data: Vec<EntityBody>) -> RecordPage {
        match self.slice {
            Slice::Page { number, size } => RecordPage::Page {
                page_number: number,
                page_size: size,
                last_page_number: last_page_number(total as usize, size),
                total_record_count: total,
                data,
            },
            Slice::Strip { offset, limit } => RecordPage::Strip {
                offset,
                limit,
                total_record_count: total,
                data,
            },
        }
    }
}

/// At least one page even for an empty result
fn last_page_number(total: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    total.div_ceil(size).max(1)
}

/// Extra results, each present only when requested
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_summary: Option<FacetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Hierarchy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_histogram: Option<Histogram>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_histograms: BTreeMap<String, Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_telemetry: Option<QueryTelemetry>,
}

impl ExtraResults {
    pub fn is_empty(&self) -> bool {
        self.facet_summary.is_none()
            && self.hierarchy.is_none()
            && self.price_histogram.is_none()
            && self.attribute_histograms.is_empty()
            && self.query_telemetry.is_none()
    }
}

/// Result of one query evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub evaluation_id: Uuid,
    pub records: RecordPage,
    #[serde(skip_serializing_if = "ExtraResults::is_empty")]
    pub extra_results: ExtraResults,
}
