/// Path and type-tag normalization helpers for element ids.

/// Rewrite an element id into its normalized dotted path.
///
/// Choice-type segments (`value[x]:valueString`) collapse to the concretely
/// sliced name; any other colon-qualified slice is cut at the colon unless it
/// denotes an extension slice. Ids without a `[x]` marker pass through
/// unchanged, which also makes the function idempotent.
pub fn normalize_path(path: &str) -> String {
    if !path.contains("[x]") {
        return path.to_string();
    }
    let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
    for segment in segments.iter_mut().rev() {
        if segment.contains("[x]")
            && let Some((_, slice)) = segment.split_once(':')
        {
            *segment = slice.to_string();
        }
        if segment.contains(':') && !segment.starts_with("extension:") {
            *segment = segment
                .split(':')
                .next()
                .unwrap_or(segment.as_str())
                .to_string();
        }
    }
    segments.join(".")
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Semantic datatype tag for a wire type code. URL-shaped codes reduce to
/// their trailing segment before capitalization.
pub fn type_tag(code: &str) -> String {
    let base = if code.starts_with("http") {
        code.rsplit('/')
            .next()
            .unwrap_or(code)
            .rsplit('.')
            .next()
            .unwrap_or(code)
    } else {
        code
    };
    format!("{}PIO", capitalize(base))
}

/// Replace the leading wire-format segment of a path with the profile name.
pub fn rename_root(path: &str, profile_name: &str) -> String {
    let boundary = path
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(path.len());
    format!("{profile_name}{}", &path[boundary..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_idempotent() {
        assert_eq!(normalize_path("extensionString"), "extensionString");
        assert_eq!(
            normalize_path("resource.extension:extensionString"),
            "resource.extension:extensionString"
        );
        let once = normalize_path("Observation.value[x]:valueString");
        assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn choice_segments_collapse_to_slice_name() {
        assert_eq!(
            normalize_path("Observation.value[x]:valueString"),
            "Observation.valueString"
        );
        assert_eq!(normalize_path("[x]"), "[x]");
        assert_eq!(normalize_path("Observation.value[x]"), "Observation.value[x]");
    }

    #[test]
    fn non_extension_slices_are_stripped_alongside_choices() {
        assert_eq!(
            normalize_path("Patient.name:slice.value[x]:valueString"),
            "Patient.name.valueString"
        );
        assert_eq!(
            normalize_path("Patient.extension:foo.value[x]:valueCoding"),
            "Patient.extension:foo.valueCoding"
        );
    }

    #[test]
    fn capitalize_edge_cases() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("hello"), "Hello");
        assert_eq!(capitalize("Hello"), "Hello");
    }

    #[test]
    fn type_tags_reduce_urls() {
        assert_eq!(type_tag("string"), "StringPIO");
        assert_eq!(
            type_tag("http://hl7.org/fhirpath/System.String"),
            "StringPIO"
        );
    }

    #[test]
    fn rename_root_replaces_leading_segment() {
        assert_eq!(
            rename_root("Observation.status", "KBV_PR_MIO_ULB_Observation"),
            "KBV_PR_MIO_ULB_Observation.status"
        );
        assert_eq!(rename_root("Patient", "MyProfile"), "MyProfile");
    }
}
