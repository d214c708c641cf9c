use async_trait::async_trait;
use cloudaudit_model::CheckFamily;
use serde_json::json;

use crate::checks::{Check, CheckContext, CheckOutcome, FindingDraft};
use crate::error::CheckError;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFirewall;

#[async_trait]
impl Check for OpenFirewall {
    fn name(&self) -> &str {
        "Firewall Exposure"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let rules = ctx.api.list_firewalls(ctx.credential, ctx.project).await?;
        if rules.is_empty() {
            return Ok(CheckOutcome::not_applicable("0 firewall rules"));
        }

        let open: Vec<FindingDraft> = rules
            .iter()
            .filter(|rule| rule.is_open_to_world())
            .map(|rule| {
                let ports: Vec<String> = rule
                    .allowed
                    .iter()
                    .map(|a| {
                        if a.ports.is_empty() {
                            a.ip_protocol.clone()
                        } else {
                            format!("{}:{}", a.ip_protocol, a.ports.join(","))
                        }
                    })
                    .collect();
                FindingDraft::new(
                    self.name(),
                    &rule.name,
                    false,
                    format!("Firewall rule {} allows 0.0.0.0/0", rule.name),
                )
                .recommend("restrict source ranges to known networks")
                .family(CheckFamily::Security)
                .details(json!({ "allowed": ports }))
            })
            .collect();

        if open.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "No ingress rule is open to the internet",
            )]));
        }
        Ok(CheckOutcome::from_drafts(open))
    }
}
