use async_trait::async_trait;
use serde_json::json;

use crate::checks::{Check, CheckContext, CheckOutcome, FindingDraft};
use crate::error::CheckError;

const PRIMITIVE_ROLES: [&str; 2] = ["roles/owner", "roles/editor"];

#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveRoles;

#[async_trait]
impl Check for PrimitiveRoles {
    fn name(&self) -> &str {
        "Primitive Roles"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let policy = ctx.api.iam_policy(ctx.credential, ctx.project).await?;
        if policy.bindings.is_empty() {
            return Ok(CheckOutcome::not_applicable("no IAM bindings"));
        }

        let name = self.name();
        let drafts: Vec<FindingDraft> = policy
            .bindings
            .iter()
            .filter(|b| PRIMITIVE_ROLES.contains(&b.role.as_str()))
            .flat_map(|binding| {
                binding
                    .members
                    .iter()
                    .filter(|m| {
                        m.starts_with("user:")
                            || m.starts_with("serviceAccount:")
                    })
                    .map(move |member| {
                        FindingDraft::new(
                            name,
                            member,
                            false,
                            format!("{member} holds {}", binding.role),
                        )
                        .recommend(
                            "replace primitive roles with predefined roles",
                        )
                        .details(json!({ "role": binding.role }))
                    })
            })
            .collect();

        if drafts.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "No principals hold owner or editor",
            )]));
        }
        Ok(CheckOutcome::from_drafts(drafts))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserManagedKeys;

#[async_trait]
impl Check for UserManagedKeys {
    fn name(&self) -> &str {
        "Service Account Keys"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let accounts = ctx
            .api
            .list_service_accounts(ctx.credential, ctx.project)
            .await?;
        if accounts.is_empty() {
            return Ok(CheckOutcome::not_applicable("0 service accounts"));
        }

        let mut drafts = Vec::new();
        for account in accounts.iter().filter(|a| !a.disabled) {
            let keys = ctx
                .api
                .list_user_managed_keys(
                    ctx.credential,
                    ctx.project,
                    &account.email,
                )
                .await?;
            if !keys.is_empty() {
                drafts.push(
                    FindingDraft::new(
                        self.name(),
                        &account.email,
                        false,
                        format!(
                            "{} has {} user-managed key(s)",
                            account.email,
                            keys.len()
                        ),
                    )
                    .recommend("use workload identity instead of exported keys"),
                );
            }
        }

        if drafts.is_empty() {
            drafts.push(FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "No user-managed service account keys",
            ));
        }
        Ok(CheckOutcome::from_drafts(drafts))
    }
}
