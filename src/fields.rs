//! Ready-made `fields` strings for common queries.
//!
//! ```
//! use vndb_kana::fields;
//!
//! let wanted = fields::join(&[fields::vn::BASIC, "length_minutes, title"]);
//! assert!(wanted.ends_with("length_minutes"));
//! ```

/// Visual novel fields.
pub mod vn {
    pub const BASIC: &str = "id, title, alttitle, released, rating, votecount, image.url";
    pub const DETAILED: &str = "id, title, alttitle, titles.lang, titles.title, titles.official, \
        aliases, olang, devstatus, released, languages, platforms, length, length_minutes, \
        description, rating, votecount, image.url, image.sexual, image.violence, \
        developers.id, developers.name, tags.id, tags.name, tags.rating, tags.spoiler";
}

/// Release fields.
pub mod release {
    pub const BASIC: &str = "id, title, alttitle, released, languages.lang, platforms, minage, \
        patch, freeware, official";
}

/// Producer fields.
pub mod producer {
    pub const BASIC: &str = "id, name, original, aliases, lang, type, description";
}

/// Character fields.
pub mod character {
    pub const BASIC: &str = "id, name, original, aliases, description, image.url, blood_type, \
        height, weight, age, sex, vns.id, vns.role";
}

/// Staff fields.
pub mod staff {
    pub const BASIC: &str = "id, name, original, lang, gender, description, aliases.name";
}

/// Tag fields.
pub mod tag {
    pub const BASIC: &str = "id, name, aliases, description, category, searchable, applicable, vn_count";
}

/// Trait fields.
pub mod traits {
    pub const BASIC: &str = "id, name, aliases, description, searchable, applicable, group_id, \
        group_name, char_count";
}

/// Quote fields.
pub mod quote {
    pub const BASIC: &str = "id, quote, score, vn.id, vn.title, character.id, character.name";
}

/// User list fields.
pub mod ulist {
    pub const BASIC: &str = "id, added, voted, vote, started, finished, notes, labels.id, \
        labels.label, vn.title";
}

/// Merges field lists, dropping blanks and duplicates while keeping first
/// occurrences in order.
pub fn join(lists: &[&str]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for field in lists.iter().flat_map(|list| list.split(',')) {
        let field = field.trim();
        if !field.is_empty() && !seen.contains(&field) {
            seen.push(field);
        }
    }
    seen.join(", ")
}
