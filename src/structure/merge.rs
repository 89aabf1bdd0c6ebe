use crate::types::{PathConstraint, ScalarOrList};

/// Merge two constraints resolved to the same path.
///
/// Overlap happens when base and differential definitions constrain the same
/// normalized path. The later-processed side wins for any field it populates;
/// where both sides carry a value-set, fixed-value or profile reference, the
/// merged field becomes their deduplicated union (later side's items first),
/// demoted back to a scalar when the union has exactly one member.
pub fn merge_constraints(earlier: &PathConstraint, later: &PathConstraint) -> PathConstraint {
    PathConstraint {
        type_tag: if later.type_tag.is_empty() {
            earlier.type_tag.clone()
        } else {
            later.type_tag.clone()
        },
        value_set: merge_field(earlier.value_set.as_ref(), later.value_set.as_ref()),
        fixed_value: merge_field(earlier.fixed_value.as_ref(), later.fixed_value.as_ref()),
        profile_url: merge_field(earlier.profile_url.as_ref(), later.profile_url.as_ref()),
    }
}

fn merge_field(
    earlier: Option<&ScalarOrList>,
    later: Option<&ScalarOrList>,
) -> Option<ScalarOrList> {
    match (earlier, later) {
        (None, None) => None,
        (Some(value), None) | (None, Some(value)) => Some(value.clone()),
        (Some(earlier), Some(later)) => {
            let mut union: Vec<String> = Vec::new();
            for value in later.values().into_iter().chain(earlier.values()) {
                if !union.contains(&value) {
                    union.push(value);
                }
            }
            ScalarOrList::from_values(union)
        }
    }
}
