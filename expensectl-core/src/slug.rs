//! Category slugs, unique per user.

const MAX_SLUG_LEN: usize = 80;

/// Slug used when a name has no sluggable characters at all.
const FALLBACK_SLUG: &str = "category";

/// Fold the Latin diacritics that show up in category names.
fn fold_char(ch: char) -> Option<char> {
    let folded = match ch {
        'ą' | 'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ć' | 'ç' | 'č' => 'c',
        'ď' => 'd',
        'ę' | 'è' | 'é' | 'ê' | 'ë' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ł' => 'l',
        'ń' | 'ñ' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ř' => 'r',
        'ś' | 'š' => 's',
        'ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => return None,
    };
    Some(folded)
}

/// Convert a category name into its slug base.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        let ch = fold_char(ch).unwrap_or(ch);
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
            last_was_dash = false;
        } else if (ch.is_whitespace() || ch == '-' || ch.is_ascii_punctuation())
            && !slug.is_empty()
            && !last_was_dash
        {
            slug.push('-');
            last_was_dash = true;
        }
        // Remaining non-ASCII characters are skipped entirely.
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// A category that already uses the slug base being assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingSlug {
    pub id: i64,
    pub slug: String,
}

/// Result of slug assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugAssignment {
    pub slug: String,
    pub slugbase: String,
}

/// Pick the slug for a category being created or renamed.
///
/// * `current` - the category's current `(slug, slugbase)`, if it exists
/// * `same_base` - the user's categories whose slugbase equals `slugify(name)`
/// * `taken` - slugs of the user's other categories that could collide with
///   the base or a numbered variant of it
/// * `self_id` - id of the category being saved, if it exists
///
/// Returns `None` when the slug is unchanged.
pub fn assign_slug(
    name: &str,
    current: Option<(&str, &str)>,
    same_base: &[ExistingSlug],
    taken: &[String],
    self_id: Option<i64>,
) -> Option<SlugAssignment> {
    let slugbase = slugify(name);

    if let Some((_, current_base)) = current {
        if current_base == slugbase {
            return None;
        }
    }

    let is_taken = |slug: &str| taken.iter().any(|t| t == slug);
    let only_self = same_base.len() == 1 && self_id.is_some_and(|id| same_base[0].id == id);

    let slug = if (same_base.is_empty() || only_self) && !is_taken(&slugbase) {
        slugbase.clone()
    } else {
        let mut next = same_base
            .iter()
            .filter(|other| other.slug != slugbase)
            .map(|other| {
                other
                    .slug
                    .rsplit('-')
                    .next()
                    .and_then(|n| n.parse::<u32>().ok())
                    .unwrap_or(0)
            })
            .max()
            .map_or(1, |max| max + 1);
        // A differently named category may already own `base-N`.
        while is_taken(&format!("{slugbase}-{next}")) {
            next += 1;
        }
        format!("{slugbase}-{next}")
    };

    Some(SlugAssignment { slug, slugbase })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(id: i64, slug: &str) -> ExistingSlug {
        ExistingSlug {
            id,
            slug: slug.to_string(),
        }
    }

    fn taken(slugs: &[&str]) -> Vec<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Food"), "food");
        assert_eq!(slugify("Eating out!"), "eating-out");
        assert_eq!(slugify("  Bills & Fees  "), "bills-fees");
        assert_eq!(slugify("Żywność"), "zywnosc");
        assert_eq!(slugify("Opłaty"), "oplaty");
    }

    #[test]
    fn slugify_fallback() {
        assert_eq!(slugify("???"), "category");
        assert_eq!(slugify(""), "category");
    }

    #[test]
    fn fresh_base_is_used_verbatim() {
        let slug = assign_slug("Food", None, &[], &[], None).unwrap();
        assert_eq!(slug.slug, "food");
        assert_eq!(slug.slugbase, "food");
    }

    #[test]
    fn unchanged_base_keeps_slug() {
        assert!(assign_slug("FOOD", Some(("food-2", "food")), &[], &[], Some(3)).is_none());
    }

    #[test]
    fn second_category_gets_suffix_one() {
        let slug = assign_slug("food", None, &[existing(1, "food")], &taken(&["food"]), None).unwrap();
        assert_eq!(slug.slug, "food-1");
    }

    #[test]
    fn suffix_continues_from_max() {
        let others = [existing(1, "food"), existing(2, "food-1"), existing(3, "food-4")];
        let slug = assign_slug("Food", None, &others, &taken(&["food", "food-1", "food-4"]), None).unwrap();
        assert_eq!(slug.slug, "food-5");
    }

    #[test]
    fn only_self_keeps_bare_base() {
        let slug = assign_slug(
            "Food",
            Some(("groceries", "groceries")),
            &[existing(7, "food")],
            &[],
            Some(7),
        )
        .unwrap();
        assert_eq!(slug.slug, "food");
    }

    #[test]
    fn numbered_slug_skips_other_names() {
        // "Food 1" owns food-1, then "Food" twice
        let others = [existing(2, "food")];
        let slug = assign_slug("Food", None, &others, &taken(&["food-1", "food"]), None).unwrap();
        assert_eq!(slug.slug, "food-2");
        assert_eq!(slug.slugbase, "food");
    }

    #[test]
    fn bare_base_owned_by_other_name() {
        // "Food" became food-1 earlier; a new "Food 1" cannot reuse it
        let slug = assign_slug("Food 1", None, &[], &taken(&["food-1"]), None).unwrap();
        assert_eq!(slug.slug, "food-1-1");
        assert_eq!(slug.slugbase, "food-1");
    }
}
