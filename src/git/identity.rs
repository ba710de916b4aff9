//! Tracked identity matching.
//!
//! An email is tracked when it is listed verbatim as a member, or when it has
//! exactly one `@` and the part after it is a tracked domain. Comparisons are
//! case-sensitive; no normalization is applied.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFilter {
    members: HashSet<String>,
    domains: HashSet<String>,
}

impl IdentityFilter {
    pub fn new<M, D>(members: M, domains: D) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_tracked(&self, email: &str) -> bool {
        if email.is_empty() {
            return false;
        }
        self.members.contains(email)
            || email_domain(email).is_some_and(|domain| self.domains.contains(domain))
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.domains.is_empty()
    }
}

/// Domain part of `email`; undefined unless the address has exactly one `@`.
fn email_domain(email: &str) -> Option<&str> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) => Some(domain),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> IdentityFilter {
        IdentityFilter::new(["alice@example.com"], ["thalesesec.net", "corp.io"])
    }

    #[test]
    fn matches_exact_member() {
        assert!(filter().is_tracked("alice@example.com"));
        assert!(!filter().is_tracked("bob@example.com"));
    }

    #[test]
    fn matches_domain() {
        assert!(filter().is_tracked("anyone@corp.io"));
        assert!(filter().is_tracked("@corp.io"));
        assert!(!filter().is_tracked("anyone@sub.corp.io"));
    }

    #[test]
    fn is_case_sensitive() {
        assert!(!filter().is_tracked("Alice@example.com"));
        assert!(!filter().is_tracked("anyone@CORP.io"));
    }

    #[test]
    fn empty_email_never_matches() {
        assert!(!filter().is_tracked(""));
        assert!(!IdentityFilter::new([""], [""]).is_tracked(""));
    }

    #[test]
    fn multiple_at_signs_only_match_members() {
        assert!(!filter().is_tracked("a@b@corp.io"));
        assert!(!IdentityFilter::new(Vec::<String>::new(), ["b@corp.io", ""]).is_tracked("a@b@corp.io"));
        let members = IdentityFilter::new(["a@b@corp.io"], ["corp.io"]);
        assert!(members.is_tracked("a@b@corp.io"));
    }

    #[test]
    fn address_without_at_has_no_domain() {
        let f = IdentityFilter::new(Vec::<String>::new(), [""]);
        assert!(!f.is_tracked("nobody"));
        assert!(f.is_tracked("nobody@"));
    }
}
