use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One row of the phase metadata table.
///
/// Field names are accepted both in snake case and with the column names of the
/// `PhaseNumberMeta` reference table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawMetadataRecord {
    #[serde(alias = "PhaseId")]
    pub phase_id: i32,
    #[serde(default, alias = "PhaseType")]
    pub phase_type: Option<String>,
    #[serde(default, alias = "ProductLetter")]
    pub product_letter: Option<String>,
}

/// A phase, used as a map key.
///
/// Two phases are equal if their `phase_id` is equal. `phase_type` and `product_letter` are
/// carried along for inspection but take no part in equality or hashing.
///
/// Since the hash of a `Phase` is the hash of its `phase_id`, maps keyed by `Phase` can be
/// queried with a plain `i32`.
#[derive(Clone, Debug, Serialize)]
pub struct Phase {
    pub phase_id: i32,
    pub phase_type: Option<String>,
    pub product_letter: Option<String>,
}

impl PartialEq for Phase {
    fn eq(&self, other: &Self) -> bool {
        self.phase_id == other.phase_id
    }
}

impl Eq for Phase {}

impl Hash for Phase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.phase_id.hash(state)
    }
}

impl Borrow<i32> for Phase {
    fn borrow(&self) -> &i32 {
        &self.phase_id
    }
}

impl From<&RawMetadataRecord> for Phase {
    fn from(record: &RawMetadataRecord) -> Self {
        Phase {
            phase_id: record.phase_id,
            phase_type: record.phase_type.clone(),
            product_letter: record.product_letter.clone(),
        }
    }
}
