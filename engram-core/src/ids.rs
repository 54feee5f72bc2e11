//! Identifier helpers: `<type>:<slug>` entity ids and NFC alias folding.

use unicode_normalization::UnicodeNormalization;

/// NFC-normalize and case-fold a string for alias storage and lookup.
///
/// Invariant: `alias_text` is always stored and compared in this form.
pub fn fold_alias(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase().trim().to_string()
}

/// Reduce a display name to an id slug: NFC-folded, lowercased,
/// non-alphanumeric runs collapsed to a single `_`.
pub fn slugify(name: &str) -> String {
    let folded = fold_alias(name);
    let mut slug = String::with_capacity(folded.len());
    let mut last_was_sep = true;
    for ch in folded.chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Compose an entity id in `<type>:<slug>` form.
pub fn entity_id(entity_type: &str, name: &str) -> String {
    format!("{}:{}", entity_type, slugify(name))
}

/// Split an entity id into `(type, slug)`. Returns `None` if malformed.
pub fn split_entity_id(id: &str) -> Option<(&str, &str)> {
    let (ty, slug) = id.split_once(':')?;
    if ty.is_empty() || slug.is_empty() {
        return None;
    }
    Some((ty, slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Kai Media"), "kai_media");
        assert_eq!(slugify("T.C. Boiler & Sons "), "t_c_boiler_sons");
    }

    #[test]
    fn fold_alias_is_idempotent() {
        let once = fold_alias("  Kaí MEDIA ");
        assert_eq!(once, fold_alias(&once));
    }

    #[test]
    fn entity_id_round_trips() {
        let id = entity_id("customer", "Kai Media");
        assert_eq!(id, "customer:kai_media");
        assert_eq!(split_entity_id(&id), Some(("customer", "kai_media")));
        assert_eq!(split_entity_id("no-colon"), None);
    }
}
