//! Dashboard snapshot: summary statistics plus the projected parcels.

use crate::api::{ApiError, DashboardData, DashboardSource};

use super::parcel::ParcelView;
use super::verify::ReferenceSource;

/// Headline numbers derived from the dashboard feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_parcels: u64,
    pub in_transit: u64,
    pub delivered: u64,
    /// Percent change against the previous month
    pub monthly_change: i64,
    pub wrong_pincodes: u64,
    pub voice_addresses: u64,
}

impl DashboardStats {
    pub fn from_data(data: &DashboardData) -> Self {
        let total = data.total_addresses;
        Self {
            total_parcels: total,
            in_transit: (total as f64 * 0.2).floor() as u64,
            delivered: (total as f64 * 0.8).floor() as u64,
            monthly_change: monthly_change(total),
            wrong_pincodes: data.total_wrong_pincodes,
            voice_addresses: data.total_voice_addresses,
        }
    }
}

fn monthly_change(total: u64) -> i64 {
    if total == 0 {
        return 0;
    }
    let total = total as f64;
    let last_month = total / 1.12;
    ((total - last_month) / last_month * 100.0).round() as i64
}

/// One refresh worth of dashboard state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub parcels: Vec<ParcelView>,
}

/// Build a snapshot from a dashboard response. Pure.
pub fn reconcile(data: &DashboardData, reference: ReferenceSource) -> DashboardSnapshot {
    DashboardSnapshot {
        stats: DashboardStats::from_data(data),
        parcels: data
            .recent_addresses
            .iter()
            .enumerate()
            .map(|(i, address)| ParcelView::project(i, address, reference))
            .collect(),
    }
}

/// Fetch the dashboard from `source` and reconcile it.
pub async fn fetch_and_reconcile<S: DashboardSource>(
    source: &S,
    reference: ReferenceSource,
) -> Result<DashboardSnapshot, ApiError> {
    let data = source.fetch_dashboard().await?;
    log::debug!(
        "Dashboard: {} addresses, {} recent",
        data.total_addresses,
        data.recent_addresses.len()
    );
    Ok(reconcile(&data, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecentAddress;
    use crate::reconcile::DeliveryStatus;

    #[test]
    fn test_stats() {
        let data = DashboardData {
            total_addresses: 57,
            total_wrong_pincodes: 4,
            total_voice_addresses: 9,
            recent_addresses: Vec::new(),
        };
        let stats = DashboardStats::from_data(&data);
        assert_eq!(stats.total_parcels, 57);
        assert_eq!(stats.in_transit, 11);
        assert_eq!(stats.delivered, 45);
        assert_eq!(stats.monthly_change, 12);
        assert_eq!(stats.wrong_pincodes, 4);
        assert_eq!(stats.voice_addresses, 9);
    }

    #[test]
    fn test_empty_feed() {
        let snapshot = reconcile(&DashboardData::default(), ReferenceSource::GoogleMaps);
        assert_eq!(snapshot, DashboardSnapshot::default());
    }

    #[test]
    fn test_parcels_keep_feed_order() {
        let data = DashboardData {
            recent_addresses: vec![
                RecentAddress {
                    id: Some(7),
                    ..RecentAddress::default()
                },
                RecentAddress {
                    id: Some(3),
                    ..RecentAddress::default()
                },
            ],
            ..DashboardData::default()
        };
        let snapshot = reconcile(&data, ReferenceSource::GoogleMaps);
        let ids: Vec<u64> = snapshot.parcels.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 3]);
        assert_eq!(
            snapshot.parcels[1].delivery_status(),
            DeliveryStatus::OutForDelivery
        );
    }
}
