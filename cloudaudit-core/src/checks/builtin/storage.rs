use async_trait::async_trait;
use cloudaudit_model::CheckFamily;

use crate::checks::{Check, CheckContext, CheckOutcome, FindingDraft};
use crate::error::CheckError;

const NO_BUCKETS: &str = "0 buckets";

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketEncryption;

#[async_trait]
impl Check for BucketEncryption {
    fn name(&self) -> &str {
        "Bucket Encryption"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let buckets = ctx.api.list_buckets(ctx.credential, ctx.project).await?;
        if buckets.is_empty() {
            return Ok(CheckOutcome::not_applicable(NO_BUCKETS));
        }

        let unencrypted: Vec<FindingDraft> = buckets
            .iter()
            .filter(|b| !b.has_customer_managed_key())
            .map(|b| {
                FindingDraft::new(
                    self.name(),
                    &b.name,
                    false,
                    format!(
                        "Bucket {} relies on Google-managed encryption keys",
                        b.name
                    ),
                )
                .recommend("configure a customer-managed encryption key")
                .family(CheckFamily::DataProtection)
            })
            .collect();

        if unencrypted.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                format!(
                    "All {} buckets use customer-managed encryption keys",
                    buckets.len()
                ),
            )]));
        }
        Ok(CheckOutcome::from_drafts(unencrypted))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketRetention;

#[async_trait]
impl Check for BucketRetention {
    fn name(&self) -> &str {
        "Bucket Retention"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let buckets = ctx.api.list_buckets(ctx.credential, ctx.project).await?;
        if buckets.is_empty() {
            return Ok(CheckOutcome::not_applicable(NO_BUCKETS));
        }

        let missing: Vec<FindingDraft> = buckets
            .iter()
            .filter(|b| !b.has_lifecycle_or_retention())
            .map(|b| {
                FindingDraft::new(
                    self.name(),
                    &b.name,
                    false,
                    format!(
                        "Bucket {} has no lifecycle rules or retention policy",
                        b.name
                    ),
                )
                .recommend("enable lifecycle")
                .check_type("storage_lifecycle")
            })
            .collect();

        if missing.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "Every bucket has lifecycle rules or a retention policy",
            )]));
        }
        Ok(CheckOutcome::from_drafts(missing))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketLocation;

#[async_trait]
impl Check for BucketLocation {
    fn name(&self) -> &str {
        "Bucket Location"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let buckets = ctx.api.list_buckets(ctx.credential, ctx.project).await?;
        if buckets.is_empty() {
            return Ok(CheckOutcome::not_applicable(NO_BUCKETS));
        }

        let multi_region: Vec<FindingDraft> = buckets
            .iter()
            .filter(|b| b.is_multi_region())
            .map(|b| {
                FindingDraft::new(
                    self.name(),
                    &b.name,
                    false,
                    format!("Bucket {} is stored multi-region ({})", b.name, b.location),
                )
                .recommend(
                    "use a regional location unless geo-redundancy is required",
                )
                .check_type("multi_region_storage")
            })
            .collect();

        if multi_region.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "All buckets use regional or dual-region locations",
            )]));
        }
        Ok(CheckOutcome::from_drafts(multi_region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::RawRecord;
    use crate::provider::{Bucket, BucketEncryption as Cmek, MockCloudApi};
    use chrono::{Duration, Utc};
    use cloudaudit_model::{CategoryId, Credential, ProjectRef, TokenSecret};

    fn credential() -> Credential {
        Credential {
            access_token: TokenSecret::new("token"),
            refresh_token: None,
            expiry: Utc::now() + Duration::hours(1),
            scopes: Vec::new(),
        }
    }

    fn api_with(buckets: Vec<Bucket>) -> MockCloudApi {
        let mut api = MockCloudApi::new();
        api.expect_list_buckets()
            .returning(move |_, _| Ok(buckets.clone()));
        api
    }

    #[tokio::test]
    async fn zero_buckets_is_not_applicable() {
        let api = api_with(Vec::new());
        let credential = credential();
        let project = ProjectRef::new("proj").expect("project");
        let ctx = CheckContext {
            api: &api,
            credential: &credential,
            project: &project,
            category: CategoryId::Storage,
        };

        for check in [
            &BucketEncryption as &dyn Check,
            &BucketRetention,
            &BucketLocation,
        ] {
            assert!(matches!(
                check.run(&ctx).await,
                Ok(CheckOutcome::NotApplicable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn missing_cmek_is_a_data_protection_failure() {
        let api = api_with(vec![Bucket {
            name: "exports".into(),
            location: "US".into(),
            ..Bucket::default()
        }]);
        let credential = credential();
        let project = ProjectRef::new("proj").expect("project");
        let ctx = CheckContext {
            api: &api,
            credential: &credential,
            project: &project,
            category: CategoryId::Storage,
        };

        let Ok(CheckOutcome::Failed(records)) = BucketEncryption.run(&ctx).await
        else {
            panic!("encryption should fail");
        };
        let [RawRecord::Typed(draft)] = records.as_slice() else {
            panic!("expected one typed record");
        };
        assert_eq!(draft.resource, "exports");
        assert_eq!(draft.family, Some(CheckFamily::DataProtection));
    }

    #[tokio::test]
    async fn retention_recommends_lifecycle() {
        let api = api_with(vec![Bucket {
            name: "logs".into(),
            location: "US-CENTRAL1".into(),
            encryption: Some(Cmek {
                default_kms_key_name: Some("projects/p/keys/k".into()),
            }),
            ..Bucket::default()
        }]);
        let credential = credential();
        let project = ProjectRef::new("proj").expect("project");
        let ctx = CheckContext {
            api: &api,
            credential: &credential,
            project: &project,
            category: CategoryId::Storage,
        };

        assert!(matches!(
            BucketEncryption.run(&ctx).await,
            Ok(CheckOutcome::Passed(_))
        ));

        let Ok(CheckOutcome::Failed(records)) = BucketRetention.run(&ctx).await
        else {
            panic!("retention should fail");
        };
        let [RawRecord::Typed(draft)] = records.as_slice() else {
            panic!("expected one typed record");
        };
        assert_eq!(draft.resource, "logs");
        assert_eq!(draft.recommendation.as_deref(), Some("enable lifecycle"));
    }
}
