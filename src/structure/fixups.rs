//! Hand-maintained corrections applied after flattening.
//!
//! The published packages ship a handful of gaps: extension subtrees missing
//! from the snapshots, two resources without a narrative status, and one
//! entry that is not a resource profile at all. These paths are pinned here
//! verbatim until the upstream packages fix them.

use crate::types::{PathConstraint, ResourceTable, ScalarOrList};

const CONTACT_PERSON: &str = "KBV_PR_MIO_ULB_RelatedPerson_Contact_Person";
const NURSING_MEASURES: &str = "KBV_PR_MIO_ULB_Procedure_Nursing_Measures";
const PRACTITIONER: &str = "KBV_PR_MIO_ULB_Practitioner";

/// Missing official-gender extension for contact persons.
const CONTACT_PERSON_PATHS: &[(&str, &str, Option<&str>, Option<&str>)] = &[
    (
        ".gender.extension:other-amtlich.url",
        "StringPIO",
        None,
        Some("http://fhir.de/StructureDefinition/gender-amtlich-de"),
    ),
    (
        ".gender.extension:other-amtlich.valueCoding",
        "CodingPIO",
        Some("http://fhir.de/ValueSet/gender-other-de"),
        None,
    ),
    (".gender.extension:other-amtlich.valueCoding.system", "UriPIO", None, None),
    (".gender.extension:other-amtlich.valueCoding.version", "StringPIO", None, None),
    (".gender.extension:other-amtlich.valueCoding.code", "CodePIO", None, None),
    (".gender.extension:other-amtlich.valueCoding.display", "StringPIO", None, None),
];

/// Missing schedule extension subtree for nursing measures.
const NURSING_MEASURES_PATHS: &[(&str, &str, Option<&str>)] = &[
    (".extension:zeitplan.url", "StringPIO", None),
    (".extension:zeitplan.extension:codeSnomed.url", "StringPIO", None),
    (
        ".extension:zeitplan.extension:codeSnomed.valueCodeableConcept.coding.system",
        "UriPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:codeSnomed.valueCodeableConcept.coding.version",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:codeSnomed.valueCodeableConcept.coding.code",
        "CodePIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:codeSnomed.valueCodeableConcept.coding.display",
        "StringPIO",
        None,
    ),
    (".extension:zeitplan.extension:angabeStrukturiert", "UriPIO", None),
    (".extension:zeitplan.extension:angabeStrukturiert.url", "StringPIO", None),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt",
        "UriPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.url",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.valueTiming.code.coding",
        "CodingPIO",
        Some("https://fhir.kbv.de/ValueSet/KBV_VS_Base_Event_Timing"),
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.valueTiming.code.coding.system",
        "UriPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.valueTiming.code.coding.version",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.valueTiming.code.coding.code",
        "CodePIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:zeitpunkt.valueTiming.code.coding.display",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:frequenz",
        "UriPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:frequenz.url",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:frequenz.valueTiming.repeat.periodUnit",
        "CodePIO",
        Some("http://hl7.org/fhir/ValueSet/units-of-time"),
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:frequenz.valueTiming.repeat.period",
        "DecimalPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:frequenz.valueTiming.repeat.frequency",
        "UnsignedIntegerPIO",
        None,
    ),
    (".extension:zeitplan.extension:angabeStrukturiert.extension:dauer", "UriPIO", None),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:dauer.url",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:dauer.valueQuantity.unit",
        "StringPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:dauer.valueQuantity.value",
        "DecimalPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:dauer.valueQuantity.system",
        "UriPIO",
        None,
    ),
    (
        ".extension:zeitplan.extension:angabeStrukturiert.extension:dauer.valueQuantity.code",
        "CodePIO",
        None,
    ),
];

/// Birth-name family extensions missing from the practitioner snapshot.
const PRACTITIONER_PATHS: &[&str] = &[
    ".name:geburtsname.family.extension:namenszusatz.valueString",
    ".name:geburtsname.family.extension:nachname.valueString",
    ".name:geburtsname.family.extension:vorsatzwort.valueString",
];

/// Resources published without a narrative status.
const MISSING_STATUS: &[&str] = &["KBV_PR_MIO_ULB_Device", "KBV_PR_MIO_ULB_Observation_Wish"];

/// Identifier profile that is not a FHIR resource and must not appear in the
/// table.
const NOT_A_RESOURCE: &str = "KBV_PR_MIO_ULB_Identifier_PKV_KVID_10";

pub fn apply(table: &mut ResourceTable) {
    retag_paths(table);
    insert_contact_person_paths(table);
    insert_nursing_measures_paths(table);
    insert_practitioner_paths(table);
    for name in MISSING_STATUS {
        if let Some(entry) = table.get_mut(*name) {
            entry.resource.status = Some("extensions".to_string());
        }
    }
    table.remove(NOT_A_RESOURCE);
}

/// Extension columns carry their url, and references are stored as uuids.
fn retag_paths(table: &mut ResourceTable) {
    for entry in table.values_mut() {
        for (path, constraint) in entry.paths.iter_mut() {
            if constraint.type_tag == "ExtensionPIO" {
                constraint.type_tag = "UriPIO".to_string();
            }
            if path.ends_with(".reference") {
                constraint.type_tag = "UuidPIO".to_string();
            }
        }
    }
}

fn insert_contact_person_paths(table: &mut ResourceTable) {
    let Some(entry) = table.get_mut(CONTACT_PERSON) else {
        return;
    };
    for &(suffix, type_tag, value_set, fixed_value) in CONTACT_PERSON_PATHS {
        let mut constraint = PathConstraint::typed(type_tag);
        constraint.value_set = value_set.map(ScalarOrList::from);
        constraint.fixed_value = fixed_value.map(ScalarOrList::from);
        entry
            .paths
            .insert(format!("{CONTACT_PERSON}{suffix}"), constraint);
    }
}

fn insert_nursing_measures_paths(table: &mut ResourceTable) {
    let Some(entry) = table.get_mut(NURSING_MEASURES) else {
        return;
    };
    for &(suffix, type_tag, value_set) in NURSING_MEASURES_PATHS {
        let mut constraint = PathConstraint::typed(type_tag);
        constraint.value_set = value_set.map(ScalarOrList::from);
        entry
            .paths
            .insert(format!("{NURSING_MEASURES}{suffix}"), constraint);
    }
}

fn insert_practitioner_paths(table: &mut ResourceTable) {
    let Some(entry) = table.get_mut(PRACTITIONER) else {
        return;
    };
    for suffix in PRACTITIONER_PATHS {
        entry.paths.insert(
            format!("{PRACTITIONER}{suffix}"),
            PathConstraint::typed("StringPIO"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProfileEntry, ResourceMeta};

    fn entry_with(paths: &[(&str, &str)]) -> ProfileEntry {
        ProfileEntry {
            resource: ResourceMeta {
                status: None,
                profile: "https://example.org/p|1.0.0".to_string(),
                fhir_resource_type: "Observation".to_string(),
            },
            paths: paths
                .iter()
                .map(|&(path, tag)| (path.to_string(), PathConstraint::typed(tag)))
                .collect(),
        }
    }

    #[test]
    fn extensions_and_references_are_retagged() {
        let mut table = ResourceTable::new();
        table.insert(
            "Profile".to_string(),
            entry_with(&[
                ("Profile.extension:foo", "ExtensionPIO"),
                ("Profile.subject.reference", "StringPIO"),
                ("Profile.status", "CodePIO"),
            ]),
        );
        apply(&mut table);
        let paths = &table["Profile"].paths;
        assert_eq!(paths["Profile.extension:foo"].type_tag, "UriPIO");
        assert_eq!(paths["Profile.subject.reference"].type_tag, "UuidPIO");
        assert_eq!(paths["Profile.status"].type_tag, "CodePIO");
    }

    #[test]
    fn missing_status_and_phantom_resource_are_fixed() {
        let mut table = ResourceTable::new();
        table.insert("KBV_PR_MIO_ULB_Device".to_string(), entry_with(&[]));
        table.insert(NOT_A_RESOURCE.to_string(), entry_with(&[]));
        apply(&mut table);
        assert_eq!(
            table["KBV_PR_MIO_ULB_Device"].resource.status.as_deref(),
            Some("extensions")
        );
        assert!(!table.contains_key(NOT_A_RESOURCE));
    }

    #[test]
    fn injected_subtrees_only_touch_present_profiles() {
        let mut table = ResourceTable::new();
        table.insert(PRACTITIONER.to_string(), entry_with(&[]));
        apply(&mut table);
        assert_eq!(table[PRACTITIONER].paths.len(), PRACTITIONER_PATHS.len());
        assert!(table[PRACTITIONER]
            .paths
            .values()
            .all(|constraint| constraint.type_tag == "StringPIO"));
    }

    #[test]
    fn nursing_measures_paths_carry_their_value_sets() {
        let mut table = ResourceTable::new();
        table.insert(NURSING_MEASURES.to_string(), entry_with(&[]));
        apply(&mut table);
        let paths = &table[NURSING_MEASURES].paths;
        let period_unit = &paths[&format!(
            "{NURSING_MEASURES}.extension:zeitplan.extension:angabeStrukturiert.extension:frequenz.valueTiming.repeat.periodUnit"
        )];
        assert_eq!(period_unit.type_tag, "CodePIO");
        assert_eq!(
            period_unit.value_set,
            Some("http://hl7.org/fhir/ValueSet/units-of-time".into())
        );
    }
}
