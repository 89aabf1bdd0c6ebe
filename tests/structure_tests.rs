use serde_json::json;

use pio_lookup_tables::structure::resolve_profile;
use pio_lookup_tables::types::{ScalarOrList, StructureDefinition};

fn fixture_profile() -> StructureDefinition {
    serde_json::from_value(json!({
        "resourceType": "StructureDefinition",
        "id": "KBV-PR-MIO-ULB-Observation-Test",
        "url": "https://fhir.kbv.de/StructureDefinition/KBV_PR_MIO_ULB_Observation_Test",
        "version": "1.0.0",
        "name": "KBV_PR_MIO_ULB_Observation_Test",
        "status": "active",
        "type": "Observation",
        "differential": {
            "element": [
                {
                    "id": "Observation.text.status",
                    "path": "Observation.text.status",
                    "patternCode": "extensions"
                }
            ]
        },
        "snapshot": {
            "element": [
                {
                    "id": "Observation",
                    "path": "Observation"
                },
                {
                    "id": "Observation.id",
                    "path": "Observation.id",
                    "type": [{"code": "http://hl7.org/fhirpath/System.String"}]
                },
                {
                    "id": "Observation.meta",
                    "path": "Observation.meta",
                    "type": [{"code": "Meta"}]
                },
                {
                    "id": "Observation.status",
                    "path": "Observation.status",
                    "min": 1,
                    "max": "1",
                    "type": [{"code": "code"}],
                    "binding": {
                        "strength": "required",
                        "valueSet": "http://hl7.org/fhir/ValueSet/observation-status|4.0.1"
                    }
                },
                {
                    "id": "Observation.category",
                    "path": "Observation.category",
                    "max": "0",
                    "type": [{"code": "CodeableConcept"}]
                },
                {
                    "id": "Observation.category.coding",
                    "path": "Observation.category.coding",
                    "type": [{"code": "Coding"}]
                },
                {
                    "id": "Observation.subject",
                    "path": "Observation.subject",
                    "type": [{
                        "code": "Reference",
                        "profile": ["https://fhir.kbv.de/StructureDefinition/KBV_PR_MIO_ULB_Patient"]
                    }]
                },
                {
                    "id": "Observation.extension",
                    "path": "Observation.extension",
                    "type": [{"code": "Extension"}]
                },
                {
                    "id": "Observation.value[x]:valueCodeableConcept",
                    "path": "Observation.value[x]",
                    "type": [{"code": "CodeableConcept"}],
                    "binding": {
                        "strength": "required",
                        "valueSet": "http://example.org/vs/bound"
                    }
                },
                {
                    "id": "Observation.value[x]:valueCodeableConcept.coding",
                    "path": "Observation.value[x].coding",
                    "type": [{"code": "Coding"}],
                    "patternCoding": {
                        "system": "http://loinc.org",
                        "version": "2.74",
                        "code": "1234-5",
                        "display": "Example"
                    }
                },
                {
                    "id": "Observation.value[x]:valueCodeableConcept.coding.system",
                    "path": "Observation.value[x].coding.system",
                    "type": [{"code": "uri"}]
                }
            ]
        }
    }))
    .unwrap()
}

#[test]
fn profile_flattens_to_renamed_constraint_paths() {
    let entry = resolve_profile(&fixture_profile()).unwrap();

    assert!(
        entry
            .paths
            .keys()
            .all(|path| path.starts_with("KBV_PR_MIO_ULB_Observation_Test"))
    );

    let status = &entry.paths["KBV_PR_MIO_ULB_Observation_Test.status"];
    assert_eq!(status.type_tag, "CodePIO");
    assert_eq!(
        status.value_set,
        Some("http://hl7.org/fhir/ValueSet/observation-status|4.0.1".into())
    );
}

#[test]
fn zero_cardinality_subtrees_are_omitted() {
    let entry = resolve_profile(&fixture_profile()).unwrap();
    assert!(
        !entry
            .paths
            .keys()
            .any(|path| path.contains("category"))
    );
}

#[test]
fn exhaustive_pattern_coding_drops_the_binding() {
    let entry = resolve_profile(&fixture_profile()).unwrap();

    let value = &entry.paths["KBV_PR_MIO_ULB_Observation_Test.valueCodeableConcept"];
    assert_eq!(value.value_set, None);

    // The pattern leaves constrain the descendant path.
    let system = &entry.paths["KBV_PR_MIO_ULB_Observation_Test.valueCodeableConcept.coding.system"];
    assert_eq!(system.type_tag, "UriPIO");
    assert_eq!(
        system.fixed_value,
        Some(ScalarOrList::One("http://loinc.org".to_string()))
    );
}

#[test]
fn bare_extensions_and_structural_elements_are_excluded() {
    let entry = resolve_profile(&fixture_profile()).unwrap();
    assert!(!entry.paths.contains_key("KBV_PR_MIO_ULB_Observation_Test.extension"));
    assert!(!entry.paths.contains_key("KBV_PR_MIO_ULB_Observation_Test.id"));
    assert!(!entry.paths.contains_key("KBV_PR_MIO_ULB_Observation_Test.meta"));
}

#[test]
fn reference_paths_carry_their_profile() {
    let entry = resolve_profile(&fixture_profile()).unwrap();
    let subject = &entry.paths["KBV_PR_MIO_ULB_Observation_Test.subject"];
    assert_eq!(subject.type_tag, "ReferencePIO");
    assert_eq!(
        subject.profile_url,
        Some("https://fhir.kbv.de/StructureDefinition/KBV_PR_MIO_ULB_Patient".into())
    );
}

#[test]
fn entry_metadata_comes_from_the_definition_and_differential() {
    let entry = resolve_profile(&fixture_profile()).unwrap();
    assert_eq!(
        entry.resource.profile,
        "https://fhir.kbv.de/StructureDefinition/KBV_PR_MIO_ULB_Observation_Test|1.0.0"
    );
    assert_eq!(entry.resource.fhir_resource_type, "Observation");
    assert_eq!(entry.resource.status.as_deref(), Some("extensions"));
}

#[test]
fn missing_snapshot_is_an_error() {
    let mut profile = fixture_profile();
    profile.snapshot = None;
    assert!(resolve_profile(&profile).is_err());
}
