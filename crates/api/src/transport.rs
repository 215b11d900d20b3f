//! The wire artifact exchanged between the sending and receiving agents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

/// A bundle whose protected identifiers have been replaced by transport ids.
///
/// The transport-id set travels as an explicit structured field of the wire
/// body rather than being recoverable from the resource graph, so the
/// receiving agent never has to mine the bundle for them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransportBundle {
    pub bundle: Bundle,
    pub transport_ids: BTreeSet<String>,
}

impl TransportBundle {
    pub fn new(bundle: Bundle, transport_ids: BTreeSet<String>) -> Self {
        Self { bundle, transport_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_wire_body() {
        let bundle = TransportBundle::new(
            Bundle::new(vec![json!({"resourceType": "Observation", "id": "o-1"})]),
            BTreeSet::from(["aB3-x9_Qr".to_owned()]),
        );

        let wire = serde_json::to_string(&bundle).expect("serialize transport bundle");
        assert!(wire.contains("\"transportIds\""));
        let parsed: TransportBundle = serde_json::from_str(&wire).expect("parse transport bundle");
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn rejects_unknown_wire_fields() {
        let wire = r#"{"bundle": [], "transportIds": [], "extra": true}"#;
        assert!(serde_json::from_str::<TransportBundle>(wire).is_err());
    }
}
