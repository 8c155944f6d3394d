/// Dietary eligibility gating
///
/// A dish is ineligible iff its dietary attributes are non-empty AND contain
/// a tag that contradicts one of the user's restrictions. An empty attribute
/// set means unknown/unchecked, never incompatible: such dishes always pass.
/// Ineligible dishes are excluded before scoring, so they cannot appear in
/// ranked output regardless of score magnitude.

/// Fixed contradiction table, maintained alongside the tag vocabulary:
/// restriction tag → dish attributes that disqualify it
pub fn contradicting_attrs(restriction: &str) -> &'static [&'static str] {
    match restriction {
        "vegetarian" => &["contains-meat", "contains-shellfish"],
        "vegan" => &[
            "contains-meat",
            "contains-dairy",
            "contains-egg",
            "contains-shellfish",
        ],
        "gluten-free" => &["contains-gluten"],
        "dairy-free" => &["contains-dairy"],
        "nut-allergy" => &["contains-nuts"],
        "shellfish-allergy" => &["contains-shellfish"],
        "halal" => &["contains-pork", "contains-alcohol"],
        _ => &[],
    }
}

/// Returns whether a dish may be scored for a user
pub fn is_eligible(dietary_restrictions: &[String], dietary_attrs: &[String]) -> bool {
    if dietary_attrs.is_empty() {
        // Absence of data is not disqualifying
        return true;
    }

    !dietary_restrictions.iter().any(|restriction| {
        contradicting_attrs(restriction)
            .iter()
            .any(|banned| dietary_attrs.iter().any(|attr| attr == banned))
    })
}
