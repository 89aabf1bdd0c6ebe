use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureDefinition {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub name: String,
    pub status: Option<String>,

    #[serde(rename = "type")]
    pub type_name: String,

    pub snapshot: Option<StructureDefinitionSnapshot>,
    pub differential: Option<StructureDefinitionDifferential>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureDefinitionSnapshot {
    pub element: Vec<ElementDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureDefinitionDifferential {
    pub element: Vec<ElementDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinition {
    pub id: Option<String>,
    pub path: String,

    #[serde(rename = "sliceName", skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Vec<ElementDefinitionType>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementDefinitionBinding>,

    #[serde(flatten)]
    pub values: ElementValues,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionType {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,
    #[serde(rename = "targetProfile", skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionBinding {
    pub strength: String,
    #[serde(rename = "valueSet", skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

/// The fixed/pattern value columns of an ElementDefinition.
///
/// FHIR spells these as one field per wire type (`fixedUri`, `patternCoding`,
/// ...). The kinds the pipeline understands are enumerated here explicitly
/// and resolved through [`ElementValues::fixed_scalar`] and
/// [`ElementValues::pattern`] instead of scanning field names at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementValues {
    #[serde(rename = "fixedString", skip_serializing_if = "Option::is_none")]
    pub fixed_string: Option<String>,
    #[serde(rename = "fixedCode", skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
    #[serde(rename = "fixedUri", skip_serializing_if = "Option::is_none")]
    pub fixed_uri: Option<String>,
    #[serde(rename = "fixedUrl", skip_serializing_if = "Option::is_none")]
    pub fixed_url: Option<String>,
    #[serde(rename = "fixedCanonical", skip_serializing_if = "Option::is_none")]
    pub fixed_canonical: Option<String>,
    #[serde(rename = "fixedId", skip_serializing_if = "Option::is_none")]
    pub fixed_id: Option<String>,
    #[serde(rename = "fixedOid", skip_serializing_if = "Option::is_none")]
    pub fixed_oid: Option<String>,
    #[serde(rename = "fixedUuid", skip_serializing_if = "Option::is_none")]
    pub fixed_uuid: Option<String>,
    #[serde(rename = "fixedDate", skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<String>,
    #[serde(rename = "fixedDateTime", skip_serializing_if = "Option::is_none")]
    pub fixed_date_time: Option<String>,
    #[serde(rename = "fixedBoolean", skip_serializing_if = "Option::is_none")]
    pub fixed_boolean: Option<bool>,
    #[serde(rename = "fixedDecimal", skip_serializing_if = "Option::is_none")]
    pub fixed_decimal: Option<f64>,
    #[serde(rename = "fixedInteger", skip_serializing_if = "Option::is_none")]
    pub fixed_integer: Option<i64>,
    #[serde(rename = "fixedUnsignedInt", skip_serializing_if = "Option::is_none")]
    pub fixed_unsigned_int: Option<u64>,
    #[serde(rename = "fixedPositiveInt", skip_serializing_if = "Option::is_none")]
    pub fixed_positive_int: Option<u64>,

    #[serde(rename = "patternCode", skip_serializing_if = "Option::is_none")]
    pub pattern_code: Option<String>,
    #[serde(rename = "patternBoolean", skip_serializing_if = "Option::is_none")]
    pub pattern_boolean: Option<bool>,
    #[serde(rename = "patternCoding", skip_serializing_if = "Option::is_none")]
    pub pattern_coding: Option<serde_json::Map<String, Value>>,
    #[serde(
        rename = "patternCodeableConcept",
        skip_serializing_if = "Option::is_none"
    )]
    pub pattern_codeable_concept: Option<Value>,
    #[serde(rename = "patternIdentifier", skip_serializing_if = "Option::is_none")]
    pub pattern_identifier: Option<Value>,
    #[serde(rename = "patternQuantity", skip_serializing_if = "Option::is_none")]
    pub pattern_quantity: Option<Value>,
}

/// A resolved pattern value: either a scalar primitive or a partial
/// structured value whose leaves constrain descendant paths.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternValue {
    Scalar(String),
    Structured(Value),
}

impl ElementValues {
    /// First populated fixed primitive, rendered as its string form.
    pub fn fixed_scalar(&self) -> Option<String> {
        let string_fields = [
            &self.fixed_string,
            &self.fixed_code,
            &self.fixed_uri,
            &self.fixed_url,
            &self.fixed_canonical,
            &self.fixed_id,
            &self.fixed_oid,
            &self.fixed_uuid,
            &self.fixed_date,
            &self.fixed_date_time,
        ];
        for field in string_fields {
            if let Some(value) = field {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.fixed_boolean {
            return Some(value.to_string());
        }
        if let Some(value) = self.fixed_decimal {
            return Some(value.to_string());
        }
        if let Some(value) = self.fixed_integer {
            return Some(value.to_string());
        }
        if let Some(value) = self.fixed_unsigned_int {
            return Some(value.to_string());
        }
        self.fixed_positive_int.map(|value| value.to_string())
    }

    /// First populated pattern field, scalar kinds before structured kinds.
    pub fn pattern(&self) -> Option<PatternValue> {
        if let Some(code) = &self.pattern_code {
            return Some(PatternValue::Scalar(code.clone()));
        }
        if let Some(value) = self.pattern_boolean {
            return Some(PatternValue::Scalar(value.to_string()));
        }
        if let Some(coding) = &self.pattern_coding {
            return Some(PatternValue::Structured(Value::Object(coding.clone())));
        }
        let structured_fields = [
            &self.pattern_codeable_concept,
            &self.pattern_identifier,
            &self.pattern_quantity,
        ];
        for field in structured_fields {
            if let Some(value) = field {
                return Some(PatternValue::Structured((*value).clone()));
            }
        }
        None
    }

    /// A fully fixed coding pins down all four of system, version, code and
    /// display; set membership checks are moot for such a path.
    pub fn has_exhaustive_pattern_coding(&self) -> bool {
        self.pattern_coding
            .as_ref()
            .is_some_and(|coding| coding.len() == 4)
    }
}

impl ElementDefinition {
    /// Wire type code of the first declared type.
    pub fn primary_type(&self) -> Option<&str> {
        self.element_type
            .as_deref()
            .and_then(|types| types.first())
            .map(|element_type| element_type.code.as_str())
    }

    /// Profile URL of the first declared type.
    pub fn primary_profile(&self) -> Option<&str> {
        self.element_type
            .as_deref()
            .and_then(|types| types.first())
            .and_then(|element_type| element_type.profile.as_deref())
            .and_then(|profiles| profiles.first())
            .map(String::as_str)
    }
}
