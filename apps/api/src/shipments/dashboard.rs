use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::shipment::{ShipmentKind, ShipmentRecord};
use crate::shipments::status::CanonicalStatus;
use crate::shipments::view::ShipmentView;

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentShipment {
    pub number: String,
    pub status: Option<String>,
    pub canonical_status: CanonicalStatus,
    pub progress: u8,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSummary {
    pub kind: ShipmentKind,
    pub total: usize,
    pub by_status: BTreeMap<CanonicalStatus, usize>,
    pub average_progress: u8,
    pub recent: Vec<RecentShipment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub imports: KindSummary,
    pub exports: KindSummary,
}

/// Aggregates one kind's shipments. Every canonical status is present in
/// `by_status`, with zero counts where nothing matches.
pub fn summarize<R: ShipmentRecord>(views: &[ShipmentView<R>]) -> KindSummary {
    let mut by_status: BTreeMap<CanonicalStatus, usize> =
        CanonicalStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for view in views {
        *by_status.entry(view.canonical_status).or_default() += 1;
    }

    let average_progress = if views.is_empty() {
        0
    } else {
        let sum: u32 = views.iter().map(|v| u32::from(v.progress)).sum();
        (sum as f64 / views.len() as f64).round() as u8
    };

    let mut ordered: Vec<&ShipmentView<R>> = views.iter().collect();
    ordered.sort_by_key(|v| std::cmp::Reverse(v.record.updated_at()));
    let recent = ordered
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|v| RecentShipment {
            number: v.record.number().to_string(),
            status: v.record.status().map(String::from),
            canonical_status: v.canonical_status,
            progress: v.progress,
            updated_at: v.record.updated_at(),
        })
        .collect();

    KindSummary {
        kind: R::KIND,
        total: views.len(),
        by_status,
        average_progress,
        recent,
    }
}
