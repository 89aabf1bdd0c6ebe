use std::path::Path;

use serde_json::Value;

use pio_lookup_tables::types::{
    PathConstraint, ProfileEntry, ResourceMeta, ResourceTable, ScalarOrList,
};

/// Write a definition document into a scanned package directory.
pub fn write_definition(directory: &Path, file_name: &str, document: &Value) {
    std::fs::write(
        directory.join(file_name),
        serde_json::to_vec(document).unwrap(),
    )
    .unwrap();
}

/// A one-profile table whose single path binds the given value sets.
pub fn table_with_value_sets(references: &[&str]) -> ResourceTable {
    let value_set = ScalarOrList::from_values(
        references.iter().map(|reference| reference.to_string()).collect(),
    );
    let mut constraint = PathConstraint::typed("CodePIO");
    constraint.value_set = value_set;

    let mut entry = ProfileEntry {
        resource: ResourceMeta {
            status: None,
            profile: "https://example.org/profile|1.0.0".to_string(),
            fhir_resource_type: "Observation".to_string(),
        },
        paths: Default::default(),
    };
    entry
        .paths
        .insert("Profile.code".to_string(), constraint);

    let mut table = ResourceTable::new();
    table.insert("Profile".to_string(), entry);
    table
}
