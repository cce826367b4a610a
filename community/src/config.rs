//! Configuration management for CommuniTree.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Per-slot capacities
    pub capacity: CapacityConfig,
    /// Opening hours that define the slot catalog
    pub slots: SlotConfig,
    /// Document store collection names
    pub collections: CollectionConfig,
    /// Device-local storage
    pub storage: StorageConfig,
    /// `PostgreSQL` document store (in-memory store when unset)
    pub postgres: PostgresConfig,
    /// Log filter (trace, debug, info, warn, error or an `EnvFilter` directive)
    pub log_level: String,
}

/// Maximum reservations per slot, per resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Gym capacity (default: 20)
    pub gym: u32,
    /// Swimming pool capacity (default: 20)
    pub swimming: u32,
    /// Badminton court capacity (default: 2)
    pub badminton: u32,
    /// Table tennis capacity (default: 2)
    pub table_tennis: u32,
}

/// Slot catalog hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// First bookable hour (default: 8)
    pub opening_hour: u8,
    /// Hour the last slot ends (default: 20)
    pub closing_hour: u8,
}

/// Document store collection names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Reservation records
    pub reservations: String,
    /// Resident complaints
    pub complaints: String,
    /// Interruption alerts
    pub alerts: String,
    /// Community events
    pub events: String,
}

/// Device-local storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the notification list is stored under
    pub notifications_key: String,
    /// Directory for file-backed storage
    pub local_storage_dir: PathBuf,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            gym: 20,
            swimming: 20,
            badminton: 2,
            table_tennis: 2,
        }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            opening_hour: 8,
            closing_hour: 20,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            reservations: "reservations".to_string(),
            complaints: "complaints".to_string(),
            alerts: "interruption_alerts".to_string(),
            events: "events".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            notifications_key: "notifications".to_string(),
            local_storage_dir: PathBuf::from(".communitree"),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: CapacityConfig::default(),
            slots: SlotConfig::default(),
            collections: CollectionConfig::default(),
            storage: StorageConfig::default(),
            postgres: PostgresConfig::default(),
            log_level: "info,communitree=debug".to_string(),
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn string(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: CapacityConfig {
                gym: parsed("CAPACITY_GYM", defaults.capacity.gym),
                swimming: parsed("CAPACITY_SWIMMING", defaults.capacity.swimming),
                badminton: parsed("CAPACITY_BADMINTON", defaults.capacity.badminton),
                table_tennis: parsed("CAPACITY_TABLE_TENNIS", defaults.capacity.table_tennis),
            },
            slots: SlotConfig {
                opening_hour: parsed("SLOT_OPENING_HOUR", defaults.slots.opening_hour),
                closing_hour: parsed("SLOT_CLOSING_HOUR", defaults.slots.closing_hour),
            },
            collections: CollectionConfig {
                reservations: string(
                    "RESERVATIONS_COLLECTION",
                    defaults.collections.reservations,
                ),
                complaints: string("COMPLAINTS_COLLECTION", defaults.collections.complaints),
                alerts: string("ALERTS_COLLECTION", defaults.collections.alerts),
                events: string("EVENTS_COLLECTION", defaults.collections.events),
            },
            storage: StorageConfig {
                notifications_key: string(
                    "NOTIFICATIONS_KEY",
                    defaults.storage.notifications_key,
                ),
                local_storage_dir: env::var("LOCAL_STORAGE_DIR")
                    .map_or(defaults.storage.local_storage_dir, PathBuf::from),
            },
            postgres: PostgresConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: parsed(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.postgres.max_connections,
                ),
            },
            log_level: string("RUST_LOG", defaults.log_level),
        }
    }
}
