//! Clinical resource bundles and identifier substitution.
//!
//! A bundle is a collection of clinical resources transferred as one unit.
//! Resources are carried as opaque JSON; this system never interprets clinical
//! content beyond locating protected patient identifiers, so no FHIR object
//! model is pulled in.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::patient::ConsentedPatientBundle;

/// A collection of clinical resources transferred as one unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    resources: Vec<Value>,
}

impl Bundle {
    pub fn new(resources: Vec<Value>) -> Self {
        Self { resources }
    }

    /// Number of resources carried by this bundle.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.resources.iter()
    }

    pub fn into_resources(self) -> Vec<Value> {
        self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Enumerates the protected identifiers present in a consented patient bundle.
///
/// Protected identifiers are the patient's own identifier, the `id` of any
/// `Patient` resource in the bundle, and the target of any `Patient/<id>`
/// reference string. The result is ordered so issuance requests are
/// deterministic.
pub fn protected_ids(bundle: &ConsentedPatientBundle) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    ids.insert(bundle.patient.id.clone());
    for resource in bundle.bundle.resources() {
        collect_protected(resource, &mut ids);
    }
    ids
}

fn collect_protected(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if let Some(id) = s.strip_prefix("Patient/") {
                if !id.is_empty() {
                    ids.insert(id.to_owned());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_protected(item, ids);
            }
        }
        Value::Object(map) => {
            if map.get("resourceType").and_then(Value::as_str) == Some("Patient") {
                if let Some(id) = map.get("id").and_then(Value::as_str) {
                    ids.insert(id.to_owned());
                }
            }
            for item in map.values() {
                collect_protected(item, ids);
            }
        }
        _ => {}
    }
}

/// Replaces every occurrence of each registered identifier throughout a bundle.
///
/// Substitution is total and consistent: every string equal to a registered
/// identifier, and every `Patient/<id>` reference to one, is rewritten to the
/// registered replacement; the same original always yields the same
/// replacement. Strings not present in the registry are left untouched, which
/// is how stage-2 keeps unresolved transport ids in place.
pub fn replace_ids(bundle: &Bundle, registry: &HashMap<String, String>) -> Bundle {
    let resources = bundle
        .resources()
        .map(|resource| {
            let mut substituted = resource.clone();
            substitute_value(&mut substituted, registry);
            substituted
        })
        .collect();
    Bundle::new(resources)
}

fn substitute_value(value: &mut Value, registry: &HashMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(replacement) = substitute_str(s, registry) {
                *s = replacement;
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(item, registry);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_value(item, registry);
            }
        }
        _ => {}
    }
}

fn substitute_str(s: &str, registry: &HashMap<String, String>) -> Option<String> {
    if let Some(replacement) = registry.get(s) {
        return Some(replacement.clone());
    }
    if let Some(id) = s.strip_prefix("Patient/") {
        if let Some(replacement) = registry.get(id) {
            return Some(format!("Patient/{replacement}"));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::ConsentedPatient;
    use serde_json::json;

    fn observation_bundle() -> Bundle {
        Bundle::new(vec![
            json!({"resourceType": "Patient", "id": "p-123", "name": [{"family": "Doe"}]}),
            json!({"resourceType": "Observation", "id": "obs-1", "subject": {"reference": "Patient/p-123"}}),
            json!({"resourceType": "Condition", "id": "con-1", "subject": {"reference": "Patient/p-123"}}),
        ])
    }

    #[test]
    fn counts_resources() {
        assert_eq!(observation_bundle().resource_count(), 3);
        assert!(Bundle::default().is_empty());
    }

    #[test]
    fn enumerates_patient_id_and_references() {
        let bundle = ConsentedPatientBundle {
            patient: ConsentedPatient::new("p-123", ["policy-a"]),
            bundle: observation_bundle(),
        };

        let ids = protected_ids(&bundle);
        assert_eq!(ids, BTreeSet::from(["p-123".to_owned()]));
    }

    #[test]
    fn enumerates_foreign_patient_resources() {
        let bundle = ConsentedPatientBundle {
            patient: ConsentedPatient::new("p-123", ["policy-a"]),
            bundle: Bundle::new(vec![
                json!({"resourceType": "Patient", "id": "p-456"}),
                json!({"resourceType": "Encounter", "subject": {"reference": "Patient/p-789"}}),
            ]),
        };

        let ids = protected_ids(&bundle);
        assert!(ids.contains("p-123"));
        assert!(ids.contains("p-456"));
        assert!(ids.contains("p-789"));
    }

    #[test]
    fn substitution_is_total_and_consistent() {
        let registry = HashMap::from([("p-123".to_owned(), "tid-AbC".to_owned())]);
        let replaced = replace_ids(&observation_bundle(), &registry);

        let rendered = serde_json::to_string(&replaced).expect("serialize bundle");
        assert!(!rendered.contains("p-123"), "no original identifier may remain");
        // Both the Patient resource id and every reference use the same replacement.
        assert!(rendered.contains("\"id\":\"tid-AbC\""));
        assert_eq!(rendered.matches("Patient/tid-AbC").count(), 2);
    }

    #[test]
    fn unregistered_identifiers_are_left_in_place() {
        let registry = HashMap::from([("someone-else".to_owned(), "tid-XyZ".to_owned())]);
        let replaced = replace_ids(&observation_bundle(), &registry);
        assert_eq!(replaced, observation_bundle());
    }
}
