//! Email address parsing for author display

use mailparse::{MailAddr, addrparse};
use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse the first address out of a header value such as
    /// `"Doe, John" <john@example.com>, other@example.com`.
    ///
    /// Returns `None` for empty input.
    pub fn parse_first(header: &str) -> Option<Self> {
        let header = header.trim();
        if header.is_empty() {
            return None;
        }

        if let Ok(list) = addrparse(header) {
            for addr in list.iter() {
                match addr {
                    MailAddr::Single(info) => {
                        return Some(Self {
                            name: info.display_name.clone().filter(|n| !n.trim().is_empty()),
                            email: info.addr.clone(),
                        });
                    }
                    MailAddr::Group(group) => {
                        if let Some(info) = group.addrs.first() {
                            return Some(Self {
                                name: info.display_name.clone().filter(|n| !n.trim().is_empty()),
                                email: info.addr.clone(),
                            });
                        }
                    }
                }
            }
        }

        Some(Self::parse_loose(header))
    }

    /// Lenient `Name <email>` split used when strict parsing fails
    fn parse_loose(s: &str) -> Self {
        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self::new(s)
    }

    /// Name shown in author lists: the display name with `Last, First`
    /// turned into `First Last` when that matches the address, else the
    /// bare address.
    pub fn author(&self) -> String {
        match &self.name {
            Some(name) => cleanup_author(name, &self.email),
            None => self.email.clone(),
        }
    }

    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Rewrite `Last, First [MI]` as `First [MI] Last` when the dotted form
/// (`first.mi.last`) appears in the address; otherwise keep the name.
fn cleanup_author(name: &str, email: &str) -> String {
    let Some((last, first)) = name.split_once(',') else {
        return name.to_string();
    };
    let first = first.trim();
    let last = last.trim();
    if first.is_empty() || last.is_empty() {
        return name.to_string();
    }

    let candidate = format!("{} {}", first, last);
    let dotted = candidate.replace(' ', ".").to_lowercase();
    if email.to_lowercase().contains(&dotted) {
        candidate
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_name() {
        let addr = EmailAddress::parse_first("John Doe <john@example.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("John Doe"));
        assert_eq!(addr.email, "john@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse_first("john@example.com").unwrap();
        assert_eq!(addr.name, None);
        assert_eq!(addr.email, "john@example.com");
        assert_eq!(addr.author(), "john@example.com");
    }

    #[test]
    fn test_parse_takes_first_of_list() {
        let addr = EmailAddress::parse_first("a@example.com, Bob <b@example.com>").unwrap();
        assert_eq!(addr.email, "a@example.com");
    }

    #[test]
    fn test_parse_empty() {
        assert!(EmailAddress::parse_first("   ").is_none());
    }

    #[test]
    fn test_author_cleanup_last_first() {
        let addr = EmailAddress::with_name("Doe, John", "john.doe@example.com");
        assert_eq!(addr.author(), "John Doe");
    }

    #[test]
    fn test_author_cleanup_keeps_unmatched_names() {
        let addr = EmailAddress::with_name("Doe, John", "jd@example.com");
        assert_eq!(addr.author(), "Doe, John");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            EmailAddress::with_name("John Doe", "john@example.com").display(),
            "John Doe <john@example.com>"
        );
        assert_eq!(EmailAddress::new("john@example.com").display(), "john@example.com");
    }
}
