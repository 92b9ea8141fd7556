//! Durability requirements for mutations
//!
//! A mutation carries either a synchronous durability level or a legacy
//! (replicate-to, persist-to) observation spec, never both.

use crate::error::{ClientError, Result};
use std::str::FromStr;
use stellar_proto as proto;

/// Synchronous durability level enforced by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DurabilityLevel {
    #[default]
    None,
    Majority,
    MajorityAndPersistToActive,
    PersistToMajority,
}

impl DurabilityLevel {
    /// Wire value, `None` when no requirement should be sent
    pub fn to_wire(self) -> Option<i32> {
        let level = match self {
            DurabilityLevel::None => return None,
            DurabilityLevel::Majority => proto::DurabilityLevel::Majority,
            DurabilityLevel::MajorityAndPersistToActive => {
                proto::DurabilityLevel::MajorityAndPersistToActive
            }
            DurabilityLevel::PersistToMajority => proto::DurabilityLevel::PersistToMajority,
        };
        Some(level as i32)
    }

    pub fn from_wire(value: i32) -> Result<Self> {
        match proto::DurabilityLevel::try_from(value) {
            Ok(proto::DurabilityLevel::Majority) => Ok(DurabilityLevel::Majority),
            Ok(proto::DurabilityLevel::MajorityAndPersistToActive) => {
                Ok(DurabilityLevel::MajorityAndPersistToActive)
            }
            Ok(proto::DurabilityLevel::PersistToMajority) => Ok(DurabilityLevel::PersistToMajority),
            Err(_) => Err(ClientError::InvalidArgument(format!(
                "unknown durability level {}",
                value
            ))),
        }
    }
}

impl FromStr for DurabilityLevel {
    type Err = ClientError;

    fn from_str(label: &str) -> Result<Self> {
        match label.to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(DurabilityLevel::None),
            "majority" => Ok(DurabilityLevel::Majority),
            "majority_and_persist_to_active" | "majorityandpersistactive" => {
                Ok(DurabilityLevel::MajorityAndPersistToActive)
            }
            "persist_to_majority" | "persisttomajority" => Ok(DurabilityLevel::PersistToMajority),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown durability level '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReplicateTo {
    #[default]
    None,
    One,
    Two,
    Three,
}

impl ReplicateTo {
    pub fn count(self) -> u32 {
        match self {
            ReplicateTo::None => 0,
            ReplicateTo::One => 1,
            ReplicateTo::Two => 2,
            ReplicateTo::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PersistTo {
    #[default]
    None,
    Active,
    One,
    Two,
    Three,
    Four,
}

impl PersistTo {
    /// Number of nodes (active included) that must persist the mutation
    pub fn count(self) -> u32 {
        match self {
            PersistTo::None => 0,
            PersistTo::Active | PersistTo::One => 1,
            PersistTo::Two => 2,
            PersistTo::Three => 3,
            PersistTo::Four => 4,
        }
    }
}

/// Durability requirement attached to a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Durability {
    /// Server-side synchronous durability
    Level(DurabilityLevel),
    /// Client-observed replication and persistence
    Legacy {
        replicate_to: ReplicateTo,
        persist_to: PersistTo,
    },
}

impl Durability {
    pub fn legacy(replicate_to: ReplicateTo, persist_to: PersistTo) -> Self {
        Durability::Legacy {
            replicate_to,
            persist_to,
        }
    }
}

impl From<DurabilityLevel> for Durability {
    fn from(level: DurabilityLevel) -> Self {
        Durability::Level(level)
    }
}

/// Build the mutually exclusive wire spec from its two candidate fields
pub(crate) fn durability_spec(
    level: Option<i32>,
    legacy: Option<proto::LegacyDurabilitySpec>,
) -> Result<Option<proto::DurabilitySpec>> {
    match (level, legacy) {
        (Some(_), Some(_)) => Err(ClientError::InvalidArgument(
            "durability level and legacy durability cannot both be set".to_string(),
        )),
        (Some(level), None) => Ok(Some(proto::DurabilitySpec::DurabilityLevel(level))),
        (None, Some(legacy)) => Ok(Some(proto::DurabilitySpec::LegacyDurabilitySpec(legacy))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels() {
        assert_eq!("majority".parse::<DurabilityLevel>().unwrap(), DurabilityLevel::Majority);
        assert_eq!(
            "PERSIST_TO_MAJORITY".parse::<DurabilityLevel>().unwrap(),
            DurabilityLevel::PersistToMajority
        );
        assert_eq!(
            "majority-and-persist-to-active".parse::<DurabilityLevel>().unwrap(),
            DurabilityLevel::MajorityAndPersistToActive
        );
        assert!("eventually".parse::<DurabilityLevel>().is_err());
    }

    #[test]
    fn test_none_level_is_not_sent() {
        assert_eq!(DurabilityLevel::None.to_wire(), None);
        assert_eq!(
            DurabilityLevel::Majority.to_wire(),
            Some(proto::DurabilityLevel::Majority as i32)
        );
    }

    #[test]
    fn test_wire_round_trip() {
        for level in [
            DurabilityLevel::Majority,
            DurabilityLevel::MajorityAndPersistToActive,
            DurabilityLevel::PersistToMajority,
        ] {
            let wire = level.to_wire().unwrap();
            assert_eq!(DurabilityLevel::from_wire(wire).unwrap(), level);
        }
        assert!(DurabilityLevel::from_wire(42).is_err());
    }

    #[test]
    fn test_spec_exclusivity() {
        let legacy = proto::LegacyDurabilitySpec {
            num_replicated: 1,
            num_persisted: 1,
        };
        assert!(durability_spec(Some(0), Some(legacy.clone())).is_err());
        assert!(matches!(
            durability_spec(None, Some(legacy)).unwrap(),
            Some(proto::DurabilitySpec::LegacyDurabilitySpec(_))
        ));
        assert!(durability_spec(None, None).unwrap().is_none());
    }
}
