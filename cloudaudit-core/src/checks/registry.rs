use std::{collections::HashMap, fmt, sync::Arc};

use cloudaudit_model::{CategoryDescriptor, CategoryId};

use super::{Check, builtin};

/// Ordered check-sets keyed by category, built once at startup.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    sets: HashMap<CategoryId, Vec<Arc<dyn Check>>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in check-sets.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Replace the check-set for `category`. Order is execution order.
    pub fn register(
        &mut self,
        category: CategoryId,
        checks: Vec<Arc<dyn Check>>,
    ) -> &mut Self {
        self.sets.insert(category, checks);
        self
    }

    pub fn get(&self, category: CategoryId) -> Option<&[Arc<dyn Check>]> {
        self.sets
            .get(&category)
            .map(Vec::as_slice)
            .filter(|checks| !checks.is_empty())
    }

    pub fn is_registered(&self, category: CategoryId) -> bool {
        self.get(category).is_some()
    }

    pub fn descriptors(&self) -> Vec<CategoryDescriptor> {
        CategoryId::ALL
            .into_iter()
            .map(|category| CategoryDescriptor {
                id: category,
                name: category.display_name().to_string(),
                registered: self.is_registered(category),
            })
            .collect()
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for category in CategoryId::ALL {
            if let Some(checks) = self.sets.get(&category) {
                let names: Vec<&str> =
                    checks.iter().map(|check| check.name()).collect();
                map.entry(&category.as_str(), &names);
            }
        }
        map.finish()
    }
}
