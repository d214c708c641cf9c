//! Built-in check-sets. Each check is a request/condition pair against
//! the management APIs.

mod compute;
mod iam;
mod networking;
mod security;
mod storage;

use std::sync::Arc;

use cloudaudit_model::CategoryId;

use super::{Check, CheckRegistry};

pub use compute::{DiskEncryption, InstanceLabels, InstanceUtilization};
pub use iam::{PrimitiveRoles, UserManagedKeys};
pub use networking::OpenFirewall;
pub use security::ActiveSecurityFindings;
pub use storage::{BucketEncryption, BucketLocation, BucketRetention};

pub(super) fn register_all(registry: &mut CheckRegistry) {
    let utilization: Arc<dyn Check> = Arc::new(InstanceUtilization::default());

    registry
        .register(
            CategoryId::Storage,
            vec![
                Arc::new(BucketEncryption),
                Arc::new(BucketRetention),
                Arc::new(BucketLocation),
            ],
        )
        .register(
            CategoryId::Compute,
            vec![
                Arc::new(InstanceLabels),
                Arc::new(DiskEncryption),
                Arc::clone(&utilization),
            ],
        )
        .register(CategoryId::ResourceUtilization, vec![utilization])
        .register(
            CategoryId::Iam,
            vec![Arc::new(PrimitiveRoles), Arc::new(UserManagedKeys)],
        )
        .register(
            CategoryId::Security,
            vec![Arc::new(ActiveSecurityFindings)],
        )
        .register(CategoryId::Networking, vec![Arc::new(OpenFirewall)]);
}
