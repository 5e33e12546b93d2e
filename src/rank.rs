//! Canonical key order for serialized description tables.
//!
//! Keys are looked up in one flat table, grouped by the level where they
//! appear. A key's rank is its position in that table; anything not listed
//! ranks [`DEFAULT_RANK`] and falls back to case-insensitive alphabetical
//! order.

use crate::value::Key;
use std::cmp::Ordering;

/// Rank of keys not listed in [`KEY_RANKS`].
pub const DEFAULT_RANK: usize = 1000;

/// Ranked keys in output order, grouped by the level of the document where
/// they appear. No name appears in two groups, so a key's position in this
/// one table is also its rank within its own level.
pub const KEY_RANKS: &[&str] = &[
    // Top level
    "Classes",
    "ExtraPages",
    "IgnoreClasses",
    "IgnoreFunctions",
    "IgnoreConstants",
    "IgnoreVariables",
    // Class level
    "Desc",
    "Functions",
    "Constants",
    "ConstantGroups",
    "Variables",
    "AdditionalInfo",
    "Inherits",
    // Function level
    "Params",
    "Returns",
    "IsStatic",
    "Notes",
    // Param level
    "Name",
    "Type",
    "IsOptional",
    // AdditionalInfo level
    "Header",
    "Contents",
];

/// Rank of a named key.
pub fn rank_of(name: &str) -> usize {
    KEY_RANKS
        .iter()
        .position(|key| *key == name)
        .unwrap_or(DEFAULT_RANK)
}

/// Total order over serializable keys.
///
/// Integer keys come first in numeric order. Named keys follow, by rank,
/// then case-insensitively, then by exact bytes so that `a` and `A` still
/// have a stable order.
pub fn compare_keys(a: &Key, b: &Key) -> Ordering {
    match (a, b) {
        (Key::Index(x), Key::Index(y)) => x.cmp(y),
        (Key::Index(_), _) => Ordering::Less,
        (_, Key::Index(_)) => Ordering::Greater,
        (Key::Name(x), Key::Name(y)) => rank_of(x)
            .cmp(&rank_of(y))
            .then_with(|| x.to_lowercase().cmp(&y.to_lowercase()))
            .then_with(|| x.cmp(y)),
        // Float and boolean keys are rejected by the serializer before sorting.
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut keys: Vec<Key> = names.iter().map(|n| Key::from(*n)).collect();
        keys.sort_by(compare_keys);
        keys.into_iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn class_keys_follow_rank() {
        assert_eq!(
            sorted(&["Variables", "Desc", "Functions"]),
            ["Desc", "Functions", "Variables"]
        );
    }

    #[test]
    fn param_keys_follow_rank() {
        assert_eq!(
            sorted(&["IsOptional", "Type", "Name"]),
            ["Name", "Type", "IsOptional"]
        );
    }

    #[test]
    fn unknown_keys_sort_after_ranked_case_insensitively() {
        assert_eq!(
            sorted(&["zeta", "Alpha", "Notes", "beta"]),
            ["Notes", "Alpha", "beta", "zeta"]
        );
    }

    #[test]
    fn case_only_difference_is_still_ordered() {
        assert_eq!(sorted(&["a", "A"]), ["A", "a"]);
    }

    #[test]
    fn integer_keys_first_and_numeric() {
        let mut keys = vec![Key::from("Name"), Key::Index(10), Key::Index(2)];
        keys.sort_by(compare_keys);
        assert_eq!(keys, vec![Key::Index(2), Key::Index(10), Key::from("Name")]);
    }

    #[test]
    fn unranked_key_gets_default() {
        assert_eq!(rank_of("SomethingElse"), DEFAULT_RANK);
        assert_eq!(rank_of("Classes"), 0);
    }

    #[test]
    fn ranked_names_are_unique() {
        for (i, name) in KEY_RANKS.iter().enumerate() {
            assert_eq!(rank_of(name), i, "{} is listed twice", name);
        }
    }
}
