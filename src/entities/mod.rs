//! The five onboarding wizards.
//!
//! Each submodule declares one [`EntitySchema`]: its steps and fields, validator presets,
//! list behavior, failure recovery, payload adapter and a sample record used by the
//! smoke modes. Nothing outside this module knows about individual entities.

pub mod driver;
pub mod incident;
pub mod mill;
pub mod miner;
pub mod user;

use crate::error::{StoreError, WizardError};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::EntitySchema;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Driver,
    Miner,
    Incident,
    Mill,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Driver,
        EntityKind::Miner,
        EntityKind::Incident,
        EntityKind::Mill,
        EntityKind::User,
    ];

    pub fn as_id(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Miner => "miner",
            EntityKind::Incident => "incident",
            EntityKind::Mill => "mill",
            EntityKind::User => "user",
        }
    }

    pub fn schema(&self) -> EntitySchema {
        match self {
            EntityKind::Driver => driver::schema(),
            EntityKind::Miner => miner::schema(),
            EntityKind::Incident => incident::schema(),
            EntityKind::Mill => mill::schema(),
            EntityKind::User => user::schema(),
        }
    }

    pub fn controller(&self) -> WizardController {
        WizardController::new(Arc::new(self.schema()))
    }

    /// Fill every data-entry field with plausible values (smoke modes and tests).
    pub fn fill_sample(&self, c: &mut WizardController) -> Result<(), StoreError> {
        match self {
            EntityKind::Driver => driver::fill_sample(c),
            EntityKind::Miner => miner::fill_sample(c),
            EntityKind::Incident => incident::fill_sample(c),
            EntityKind::Mill => mill::fill_sample(c),
            EntityKind::User => user::fill_sample(c),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_id() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown entity '{}' (expected one of: driver, miner, incident, mill, user)",
                    s.trim()
                )
            })
    }
}

/// Serialize a request DTO into the submit payload.
pub(crate) fn to_payload<T: Serialize>(dto: &T) -> Result<Value, WizardError> {
    serde_json::to_value(dto).map_err(|e| WizardError::Unexpected(format!("payload: {}", e)))
}

/// Placeholder document used by sample data.
pub(crate) fn sample_document(name: &str) -> String {
    crate::utils::encoding::to_data_url("application/pdf", format!("%PDF-1.4 {}", name).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::schema::StepKind;

    #[test]
    fn every_schema_is_structurally_sound() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            schema
                .check_structure()
                .unwrap_or_else(|e| panic!("{}: {}", kind, e));
            assert_eq!(schema.entity, kind);
            assert_eq!(schema.steps[schema.review_index()].kind, StepKind::Review);
        }
    }

    #[test]
    fn entity_names_parse_case_insensitively() {
        assert_eq!("Miner".parse::<EntityKind>(), Ok(EntityKind::Miner));
        assert_eq!(" mill ".parse::<EntityKind>(), Ok(EntityKind::Mill));
        assert!("truck".parse::<EntityKind>().unwrap_err().contains("truck"));
    }

    #[test]
    fn reference_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = EntityKind::ALL
            .iter()
            .map(|k| k.schema().reference_prefix)
            .collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes, vec!["DRV", "INC", "MIL", "MNR", "USR"]);
    }

    #[test]
    fn samples_validate_on_every_step() {
        for kind in EntityKind::ALL {
            let mut c = kind.controller();
            kind.fill_sample(&mut c).expect("sample");
            let errors = crate::wizard::validator::validate_all(c.schema(), c.state().fields());
            assert!(errors.is_empty(), "{} sample has errors: {:?}", kind, errors);
        }
    }

    #[test]
    fn sample_payloads_build() {
        for kind in EntityKind::ALL {
            let mut c = kind.controller();
            kind.fill_sample(&mut c).expect("sample");
            let payload = (c.schema().build_payload)(c.state().fields()).expect("payload");
            assert!(payload.is_object(), "{} payload is not an object", kind);
        }
    }
}
