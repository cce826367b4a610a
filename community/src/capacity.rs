//! Capacity table and the fully-booked check.

use crate::config::CapacityConfig;
use crate::error::{CommunityError, Result};
use crate::types::ResourceType;
use std::collections::BTreeMap;

/// Maximum reservations per slot, per resource type
///
/// Built from configuration and passed to the services that need it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityTable {
    limits: BTreeMap<ResourceType, u32>,
}

impl CapacityTable {
    /// Table with exactly the given entries
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (ResourceType, u32)>) -> Self {
        Self {
            limits: entries.into_iter().collect(),
        }
    }

    /// Gym 20, Swimming 20, Badminton 2, Table Tennis 2
    #[must_use]
    pub fn standard() -> Self {
        Self::from(&CapacityConfig::default())
    }

    /// Capacity of one slot of `resource_type`
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::UnknownResourceType`] if the table has no entry.
    pub fn capacity(&self, resource_type: ResourceType) -> Result<u32> {
        self.limits
            .get(&resource_type)
            .copied()
            .ok_or_else(|| CommunityError::UnknownResourceType(resource_type.to_string()))
    }

    /// Whether `count` reservations exhaust a slot of `resource_type`
    ///
    /// # Errors
    ///
    /// Returns [`CommunityError::UnknownResourceType`] if the table has no entry.
    pub fn is_fully_booked(&self, count: u32, resource_type: ResourceType) -> Result<bool> {
        Ok(count >= self.capacity(resource_type)?)
    }
}

impl From<&CapacityConfig> for CapacityTable {
    fn from(config: &CapacityConfig) -> Self {
        Self::from_entries([
            (ResourceType::Gym, config.gym),
            (ResourceType::Swimming, config.swimming),
            (ResourceType::Badminton, config.badminton),
            (ResourceType::TableTennis, config.table_tennis),
        ])
    }
}

impl Default for CapacityTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_resource() -> impl Strategy<Value = ResourceType> {
        prop::sample::select(ResourceType::ALL.to_vec())
    }

    #[test]
    fn standard_capacities() {
        let table = CapacityTable::standard();
        assert_eq!(table.capacity(ResourceType::Gym), Ok(20));
        assert_eq!(table.capacity(ResourceType::Swimming), Ok(20));
        assert_eq!(table.capacity(ResourceType::Badminton), Ok(2));
        assert_eq!(table.capacity(ResourceType::TableTennis), Ok(2));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let table = CapacityTable::from_entries([(ResourceType::Gym, 5)]);
        assert_eq!(
            table.is_fully_booked(0, ResourceType::Badminton),
            Err(CommunityError::UnknownResourceType("Badminton".to_string()))
        );
        assert_eq!(table.capacity(ResourceType::Gym), Ok(5));
    }

    proptest! {
        #[test]
        fn fully_booked_iff_count_reaches_capacity(resource in any_resource(), count in 0u32..50) {
            let table = CapacityTable::standard();
            let capacity = table.capacity(resource).unwrap_or_default();
            prop_assert_eq!(table.is_fully_booked(count, resource), Ok(count >= capacity));
        }

        #[test]
        fn configured_capacity_is_honoured(capacity in 0u32..100, count in 0u32..100) {
            let table = CapacityTable::from_entries([(ResourceType::Swimming, capacity)]);
            prop_assert_eq!(
                table.is_fully_booked(count, ResourceType::Swimming),
                Ok(count >= capacity)
            );
        }
    }
}
