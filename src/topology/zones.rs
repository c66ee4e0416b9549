//! Zone selection: the only suspension point of a planning run.
//!
//! A [`ZoneSource`] lists the zones currently in the `available` state;
//! [`select_zones`] keeps the first `max_count` of them in source order.

use async_trait::async_trait;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter;
use tracing::{debug, info};

use crate::error::{Result, ZoneError};

use super::model::Zone;

/// Default zone fan-out.
pub const DEFAULT_MAX_ZONES: usize = 3;

/// A source of currently available availability zones.
#[async_trait]
pub trait ZoneSource: Send + Sync {
    /// Lists available zones in the order the source reports them.
    async fn available_zones(&self) -> std::result::Result<Vec<Zone>, ZoneError>;

    /// Region the source answers for.
    fn region(&self) -> &str;
}

/// Selects at most `max_count` zones from the source, preserving order.
///
/// Fewer zones than `max_count` are returned as-is. A `max_count` of zero
/// leaves nothing to place a cluster in and is reported like an empty source.
///
/// # Errors
///
/// Returns `ZoneError::Unavailable` if the source fails and
/// `ZoneError::NoZones` if no zone is left to use.
pub async fn select_zones<S: ZoneSource + ?Sized>(source: &S, max_count: usize) -> Result<Vec<Zone>> {
    info!("Querying available zones in {}", source.region());

    let mut zones = source.available_zones().await?;
    zones.truncate(max_count);
    if zones.is_empty() {
        return Err(ZoneError::NoZones {
            region: source.region().to_string(),
        }
        .into());
    }

    debug!(
        "Selected zones: {}",
        zones.iter().map(Zone::as_str).collect::<Vec<_>>().join(", ")
    );

    Ok(zones)
}

/// Zones pinned in configuration.
#[derive(Debug, Clone)]
pub struct StaticZoneSource {
    /// Region label.
    region: String,
    /// Zones in preference order.
    zones: Vec<Zone>,
}

impl StaticZoneSource {
    /// Creates a source that always reports the given zones.
    #[must_use]
    pub fn new(region: impl Into<String>, zones: Vec<Zone>) -> Self {
        Self {
            region: region.into(),
            zones,
        }
    }
}

#[async_trait]
impl ZoneSource for StaticZoneSource {
    async fn available_zones(&self) -> std::result::Result<Vec<Zone>, ZoneError> {
        Ok(self.zones.clone())
    }

    fn region(&self) -> &str {
        &self.region
    }
}

/// Zones discovered through the EC2 `DescribeAvailabilityZones` API.
#[derive(Debug, Clone)]
pub struct Ec2ZoneSource {
    /// EC2 client.
    client: Client,
    /// Region the client is bound to.
    region: String,
}

impl Ec2ZoneSource {
    /// Creates a source from the ambient AWS configuration.
    pub async fn new(region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        let region = config
            .region()
            .map_or_else(|| String::from("default"), ToString::to_string);

        Self {
            client: Client::new(&config),
            region,
        }
    }
}

#[async_trait]
impl ZoneSource for Ec2ZoneSource {
    async fn available_zones(&self) -> std::result::Result<Vec<Zone>, ZoneError> {
        let output = self
            .client
            .describe_availability_zones()
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| unavailable(&self.region, &e))?;

        Ok(output
            .availability_zones()
            .iter()
            .filter_map(|az| az.zone_name())
            .map(Zone::from)
            .collect())
    }

    fn region(&self) -> &str {
        &self.region
    }
}

/// Keeps the whole cause chain; dispatch and timeout failures carry
/// their detail only in the source.
fn unavailable<E: std::error::Error + 'static>(region: &str, err: &E) -> ZoneError {
    ZoneError::unavailable(region, DisplayErrorContext(err).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;

    struct UnreachableSource;

    #[async_trait]
    impl ZoneSource for UnreachableSource {
        async fn available_zones(&self) -> std::result::Result<Vec<Zone>, ZoneError> {
            Err(ZoneError::unavailable("eu-west-1", "connection refused"))
        }

        fn region(&self) -> &str {
            "eu-west-1"
        }
    }

    fn source(names: &[&str]) -> StaticZoneSource {
        StaticZoneSource::new("us-east-1", names.iter().map(|n| Zone::new(*n)).collect())
    }

    #[tokio::test]
    async fn test_truncates_to_max_count() {
        let zones = select_zones(&source(&["a", "b", "c", "d", "e"]), DEFAULT_MAX_ZONES)
            .await
            .unwrap();
        assert_eq!(zones, vec![Zone::new("a"), Zone::new("b"), Zone::new("c")]);
    }

    #[tokio::test]
    async fn test_fewer_zones_are_not_padded() {
        let zones = select_zones(&source(&["b", "a"]), DEFAULT_MAX_ZONES).await.unwrap();
        assert_eq!(zones, vec![Zone::new("b"), Zone::new("a")]);
    }

    #[tokio::test]
    async fn test_empty_source_is_unavailable() {
        let err = select_zones(&source(&[]), DEFAULT_MAX_ZONES).await.unwrap_err();
        assert!(matches!(err, StackError::Zone(ZoneError::NoZones { .. })));
    }

    #[tokio::test]
    async fn test_zero_fan_out_is_unavailable() {
        let err = select_zones(&source(&["a", "b"]), 0).await.unwrap_err();
        assert!(matches!(err, StackError::Zone(ZoneError::NoZones { .. })));
    }

    #[test]
    fn test_unavailable_keeps_timeout_cause() {
        use aws_sdk_ec2::config::http::HttpResponse;
        use aws_sdk_ec2::error::SdkError;
        use aws_sdk_ec2::operation::describe_availability_zones::DescribeAvailabilityZonesError;

        let err: SdkError<DescribeAvailabilityZonesError, HttpResponse> =
            SdkError::timeout_error("connect timed out after 3.1s");

        let zone_err = unavailable("us-east-1", &err);
        assert!(zone_err.to_string().contains("connect timed out after 3.1s"));
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let err = select_zones(&UnreachableSource, DEFAULT_MAX_ZONES).await.unwrap_err();
        assert!(matches!(err, StackError::Zone(ZoneError::Unavailable { .. })));
        assert_eq!(err.stage(), "zone selection");
    }
}
