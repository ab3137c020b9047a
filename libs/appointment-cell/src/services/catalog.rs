// libs/appointment-cell/src/services/catalog.rs
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{SchedulingError, ServiceBlock, ServiceItem};

/// Sum a service selection into one contiguous block. The selection order
/// never matters; only the totals do. A zero or negative total is a hard
/// failure that blocks slot computation and submission alike.
pub fn aggregate_block(services: &[ServiceItem]) -> Result<ServiceBlock, SchedulingError> {
    if services.is_empty() {
        return Err(SchedulingError::InvalidDuration(
            "no services selected".to_string(),
        ));
    }

    let total_minutes: i64 = services.iter().map(|s| s.duration_minutes).sum();
    let total_price: f64 = services.iter().map(|s| s.price).sum();

    if total_minutes <= 0 {
        return Err(SchedulingError::InvalidDuration(format!(
            "aggregate duration must be positive, got {} minutes",
            total_minutes
        )));
    }

    Ok(ServiceBlock { total_minutes, total_price })
}

pub struct CatalogService {
    supabase: Arc<SupabaseClient>,
}

impl CatalogService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Fetch the selected services and verify every requested id resolved to
    /// an active service of this business.
    pub async fn fetch_selection(
        &self,
        business_id: Uuid,
        service_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<Vec<ServiceItem>, SchedulingError> {
        if service_ids.is_empty() {
            return Err(SchedulingError::InvalidDuration(
                "no services selected".to_string(),
            ));
        }

        debug!("Fetching {} selected services for business {}", service_ids.len(), business_id);

        let id_list = service_ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/services?business_id=eq.{}&id=in.({})&is_active=eq.true",
            business_id, id_list
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let services: Vec<ServiceItem> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ServiceItem>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse services: {}", e)))?;

        for requested in service_ids {
            if !services.iter().any(|s| s.id == *requested) {
                return Err(SchedulingError::ValidationError(format!(
                    "unknown or inactive service: {}",
                    requested
                )));
            }
        }

        Ok(services)
    }

    /// Fetch and aggregate in one step; the usual entry point for the
    /// booking pipeline.
    pub async fn resolve_block(
        &self,
        business_id: Uuid,
        service_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<ServiceBlock, SchedulingError> {
        let services = self.fetch_selection(business_id, service_ids, auth_token).await?;
        aggregate_block(&services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(duration_minutes: i64, price: f64) -> ServiceItem {
        ServiceItem {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "test".to_string(),
            duration_minutes,
            price,
            is_active: true,
        }
    }

    #[test]
    fn test_aggregate_sums_durations_and_prices() {
        let block = aggregate_block(&[service(30, 25.0), service(45, 40.0)]).unwrap();

        assert_eq!(block.total_minutes, 75);
        assert_eq!(block.total_price, 65.0);
    }

    #[test]
    fn test_single_service_block() {
        let block = aggregate_block(&[service(60, 80.0)]).unwrap();

        assert_eq!(block.total_minutes, 60);
        assert_eq!(block.total_price, 80.0);
    }

    #[test]
    fn test_empty_selection_is_invalid() {
        let err = aggregate_block(&[]).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDuration(_)));
    }

    #[test]
    fn test_zero_total_duration_is_invalid() {
        let err = aggregate_block(&[service(0, 10.0)]).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDuration(_)));
    }

    #[test]
    fn test_negative_duration_is_invalid() {
        let err = aggregate_block(&[service(30, 10.0), service(-45, 0.0)]).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDuration(_)));
    }
}
