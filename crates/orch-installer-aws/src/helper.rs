//! Cloud helper contract and its AWS SDK implementation
//!
//! Steps only reach AWS through [`CloudHelper`], so they can be tested
//! against an in-memory double. Every call takes the region explicitly;
//! one installer run may touch the legacy bucket in another region.

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};

/// S3 delete requests accept at most this many keys.
const DELETE_BATCH_SIZE: usize = 1000;

/// Address of one S3 object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub region: String,
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Subnets of an existing VPC, split by how they reach the internet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpcSubnets {
    /// Default route through an internet gateway
    pub public: Vec<String>,
    /// Default route through a NAT gateway
    pub private: Vec<String>,
}

#[async_trait]
pub trait CloudHelper: Send + Sync {
    /// At least three zones of `region`, or an error.
    async fn get_available_zones(&self, region: &str) -> Result<Vec<String>>;

    async fn s3_copy_to_s3(&self, src: &S3Location, dst: &S3Location) -> Result<()>;

    async fn get_subnet_ids_from_vpc(&self, region: &str, vpc_id: &str) -> Result<VpcSubnets>;

    async fn disable_lb_deletion_protection(&self, region: &str, lb_arn: &str) -> Result<()>;

    async fn disable_rds_deletion_protection(&self, region: &str, db_identifier: &str)
    -> Result<()>;

    /// Delete every object version and delete marker. A missing bucket is
    /// already empty.
    async fn empty_s3_bucket(&self, region: &str, bucket: &str) -> Result<()>;
}

/// [`CloudHelper`] backed by the AWS SDK.
///
/// Credentials come from the default provider chain.
#[derive(Debug, Clone, Default)]
pub struct AwsCloudHelper {
    endpoint_url: Option<String>,
}

impl AwsCloudHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send every request to `url`, e.g. a LocalStack endpoint.
    pub fn with_endpoint(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(url.into()),
        }
    }

    async fn sdk_config(&self, region: &str) -> SdkConfig {
        let loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        let loader = match &self.endpoint_url {
            Some(url) => loader.endpoint_url(url),
            None => loader,
        };
        loader.load().await
    }

    async fn s3_client(&self, region: &str) -> aws_sdk_s3::Client {
        let sdk_config = self.sdk_config(region).await;
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.endpoint_url.is_some())
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }

    async fn ec2_client(&self, region: &str) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(&self.sdk_config(region).await)
    }

    /// Upload `body` to `location`.
    ///
    /// Returns [`AwsError::NoSuchBucket`] when the bucket does not exist.
    pub async fn put_object(&self, location: &S3Location, body: Vec<u8>) -> Result<()> {
        let client = self.s3_client(&location.region).await;
        client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                if is_no_such_bucket(&e) {
                    AwsError::NoSuchBucket(location.bucket.clone())
                } else {
                    AwsError::api("PutObject", DisplayErrorContext(&e))
                }
            })?;
        Ok(())
    }
}

fn is_no_such_bucket<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    match err {
        SdkError::ServiceError(e) => e.err().code() == Some("NoSuchBucket"),
        _ => false,
    }
}

#[async_trait]
impl CloudHelper for AwsCloudHelper {
    async fn get_available_zones(&self, region: &str) -> Result<Vec<String>> {
        use aws_sdk_ec2::types::Filter;

        let client = self.ec2_client(region).await;
        let output = client
            .describe_availability_zones()
            .filters(Filter::builder().name("region-name").values(region).build())
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeAvailabilityZones", DisplayErrorContext(&e)))?;

        let zones: Vec<String> = output
            .availability_zones()
            .iter()
            .filter_map(|zone| zone.zone_name().map(str::to_string))
            .collect();
        tracing::debug!("Availability zones in {region}: {zones:?}");

        if zones.len() < 3 {
            return Err(AwsError::NotEnoughZones {
                region: region.to_string(),
                found: zones.len(),
            });
        }
        Ok(zones)
    }

    async fn s3_copy_to_s3(&self, src: &S3Location, dst: &S3Location) -> Result<()> {
        tracing::info!(
            "Copying s3://{}/{} to s3://{}/{}",
            src.bucket,
            src.key,
            dst.bucket,
            dst.key
        );
        let client = self.s3_client(&dst.region).await;
        client
            .copy_object()
            .copy_source(format!("{}/{}", src.bucket, src.key))
            .bucket(&dst.bucket)
            .key(&dst.key)
            .send()
            .await
            .map_err(|e| AwsError::api("CopyObject", DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn get_subnet_ids_from_vpc(&self, region: &str, vpc_id: &str) -> Result<VpcSubnets> {
        use aws_sdk_ec2::types::Filter;

        let client = self.ec2_client(region).await;
        let subnets = client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeSubnets", DisplayErrorContext(&e)))?;

        let mut result = VpcSubnets::default();
        for subnet in subnets.subnets() {
            let Some(subnet_id) = subnet.subnet_id() else {
                continue;
            };
            let tables = client
                .describe_route_tables()
                .filters(
                    Filter::builder()
                        .name("association.subnet-id")
                        .values(subnet_id)
                        .build(),
                )
                .send()
                .await
                .map_err(|e| AwsError::api("DescribeRouteTables", DisplayErrorContext(&e)))?;

            let default_route = tables
                .route_tables()
                .iter()
                .flat_map(|table| table.routes())
                .find(|route| route.destination_cidr_block() == Some("0.0.0.0/0"));
            match default_route {
                Some(route) if route.nat_gateway_id().is_some() => {
                    result.private.push(subnet_id.to_string())
                }
                Some(route) if route.instance_id().is_none() => {
                    result.public.push(subnet_id.to_string())
                }
                _ => tracing::debug!("Subnet {subnet_id} has no internet route, skipping"),
            }
        }
        Ok(result)
    }

    async fn disable_lb_deletion_protection(&self, region: &str, lb_arn: &str) -> Result<()> {
        use aws_sdk_elasticloadbalancingv2::types::LoadBalancerAttribute;

        let client = aws_sdk_elasticloadbalancingv2::Client::new(&self.sdk_config(region).await);
        client
            .modify_load_balancer_attributes()
            .load_balancer_arn(lb_arn)
            .attributes(
                LoadBalancerAttribute::builder()
                    .key("deletion_protection.enabled")
                    .value("false")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AwsError::api("ModifyLoadBalancerAttributes", DisplayErrorContext(&e)))?;
        tracing::info!("Disabled deletion protection of load balancer {lb_arn}");
        Ok(())
    }

    async fn disable_rds_deletion_protection(
        &self,
        region: &str,
        db_identifier: &str,
    ) -> Result<()> {
        let client = aws_sdk_rds::Client::new(&self.sdk_config(region).await);
        client
            .modify_db_cluster()
            .db_cluster_identifier(db_identifier)
            .deletion_protection(false)
            .apply_immediately(true)
            .send()
            .await
            .map_err(|e| AwsError::api("ModifyDBCluster", DisplayErrorContext(&e)))?;
        tracing::info!("Disabled deletion protection of database cluster {db_identifier}");
        Ok(())
    }

    async fn empty_s3_bucket(&self, region: &str, bucket: &str) -> Result<()> {
        let client = self.s3_client(region).await;
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;
        let mut deleted = 0usize;

        loop {
            let page = match client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_id_marker.take())
                .send()
                .await
            {
                Ok(page) => page,
                Err(e) if is_no_such_bucket(&e) => {
                    tracing::info!("Bucket {bucket} does not exist, nothing to empty");
                    return Ok(());
                }
                Err(e) => return Err(AwsError::api("ListObjectVersions", DisplayErrorContext(&e))),
            };

            let mut objects = Vec::new();
            let versions = page
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()));
            let markers = page
                .delete_markers()
                .iter()
                .map(|m| (m.key(), m.version_id()));
            for (key, version_id) in versions.chain(markers) {
                let Some(key) = key else { continue };
                let object = ObjectIdentifier::builder()
                    .key(key)
                    .set_version_id(version_id.map(str::to_string))
                    .build()
                    .map_err(|e| AwsError::api("DeleteObjects", e))?;
                objects.push(object);
            }

            for batch in objects.chunks(DELETE_BATCH_SIZE) {
                let delete = Delete::builder()
                    .set_objects(Some(batch.to_vec()))
                    .quiet(true)
                    .build()
                    .map_err(|e| AwsError::api("DeleteObjects", e))?;
                client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|e| AwsError::api("DeleteObjects", DisplayErrorContext(&e)))?;
                deleted += batch.len();
            }

            if page.is_truncated() != Some(true) {
                break;
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_id_marker = page.next_version_id_marker().map(str::to_string);
        }

        tracing::info!("Emptied bucket {bucket} ({deleted} object versions)");
        Ok(())
    }
}
