//! Result scoring weights.
//!
//! Scores are small integers that are only compared with each other:
//! - object name matches beat partial name matches
//! - title hits beat body hits
//! - exact term hits beat partial (substring) term hits

use serde::{Deserialize, Serialize};

/// Weights used to rank search results. Configurable via the `[scorer]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scorer {
    /// Query term equals the object's full name or its last component.
    pub obj_name_match: i32,
    /// Query term is a substring of the object's last name component.
    pub obj_partial_match: i32,
    /// Added for objects of priority 0.
    pub obj_prio_important: i32,
    /// Added for objects of priority 1.
    pub obj_prio_normal: i32,
    /// Added for objects of priority 2.
    pub obj_prio_unimportant: i32,
    /// Added for objects of any other priority.
    pub obj_prio_default: i32,
    /// Exact hit in a section title.
    pub title: i32,
    /// Substring hit in a section title.
    pub partial_title: i32,
    /// Exact hit in body text.
    pub term: i32,
    /// Substring hit in body text.
    pub partial_term: i32,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            obj_name_match: 11,
            obj_partial_match: 6,
            obj_prio_important: 15,
            obj_prio_normal: 5,
            obj_prio_unimportant: -5,
            obj_prio_default: 0,
            title: 15,
            partial_title: 7,
            term: 5,
            partial_term: 2,
        }
    }
}

impl Scorer {
    /// Score contribution of an object's priority.
    pub fn object_priority(&self, priority: i32) -> i32 {
        match priority {
            0 => self.obj_prio_important,
            1 => self.obj_prio_normal,
            2 => self.obj_prio_unimportant,
            _ => self.obj_prio_default,
        }
    }

    /// Score of an object whose name matched `term`, before the priority bonus.
    ///
    /// `fullname` and `term` must both be lowercase.
    pub fn object_name(&self, fullname: &str, term: &str) -> i32 {
        let last = fullname.rsplit('.').next().unwrap_or(fullname);
        if fullname == term || last == term {
            self.obj_name_match
        } else if last.contains(term) {
            self.obj_partial_match
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case(0, 15)]
    #[case(1, 5)]
    #[case(2, -5)]
    #[case(7, 0)]
    #[case(-1, 0)]
    fn priority_scores(#[case] priority: i32, #[case] expected: i32) {
        check!(Scorer::default().object_priority(priority) == expected);
    }

    #[rstest]
    #[case("kf.common.errors", "kf.common.errors", 11)]
    #[case("kf.common.errors", "errors", 11)]
    #[case("kf.common.errors", "err", 6)]
    #[case("kf.common.errors", "common", 0)]
    fn name_scores(#[case] fullname: &str, #[case] term: &str, #[case] expected: i32) {
        check!(Scorer::default().object_name(fullname, term) == expected);
    }

    #[test]
    fn title_hits_outrank_body_hits() {
        let scorer = Scorer::default();
        check!(scorer.title > scorer.partial_title);
        check!(scorer.partial_title > scorer.term);
        check!(scorer.term > scorer.partial_term);
    }
}
