//! Consented patients and their pairing with raw clinical bundles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

/// A patient identifier together with the policy set consent was given for.
///
/// Produced by the external cohort selector; the policy set names the consent
/// policies under which this patient's data may be processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsentedPatient {
    pub id: String,
    pub policies: BTreeSet<String>,
}

impl ConsentedPatient {
    pub fn new(id: impl Into<String>, policies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            policies: policies.into_iter().map(Into::into).collect(),
        }
    }
}

/// A raw clinical bundle paired with the patient it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsentedPatientBundle {
    pub patient: ConsentedPatient,
    pub bundle: Bundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_policies() {
        let patient = ConsentedPatient::new("p-1", ["a", "b", "a"]);
        assert_eq!(patient.policies.len(), 2);
    }
}
