use async_trait::async_trait;
use serde_json::{Value, json};

use crate::checks::{
    Check, CheckContext, CheckOutcome, FindingDraft, RawRecord,
};
use crate::error::CheckError;

/// Forwards active Security Command Center findings. The API's finding
/// shape is passed through as a loosely typed record for the aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveSecurityFindings;

fn field<'a>(finding: &'a Value, key: &str) -> Option<&'a str> {
    finding.get(key).and_then(Value::as_str)
}

fn to_record(finding: Value) -> RawRecord {
    let severity = field(&finding, "severity").unwrap_or("");
    let status = if matches!(severity, "CRITICAL" | "HIGH") {
        "FAILED"
    } else {
        "warning"
    };

    RawRecord::Legacy(json!({
        "type": field(&finding, "category"),
        "resource": field(&finding, "resourceName"),
        "message": field(&finding, "description"),
        "recommendation": field(&finding, "nextSteps"),
        "status": status,
        "finding": finding,
    }))
}

#[async_trait]
impl Check for ActiveSecurityFindings {
    fn name(&self) -> &str {
        "Security Command Center"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let findings = ctx
            .api
            .list_security_findings(ctx.credential, ctx.project)
            .await?;

        if findings.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "No active Security Command Center findings",
            )]));
        }
        Ok(CheckOutcome::Failed(
            findings.into_iter().map(to_record).collect(),
        ))
    }
}
