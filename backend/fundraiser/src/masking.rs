//! Display-only obfuscation of investor emails in listings.

const MASK: &str = "***";

/// Keep the first two characters of the local part and the whole domain:
/// `alice@example.com` → `al***@example.com`.
///
/// Anything that isn't exactly `local@domain` is returned unchanged.
pub fn mask_email(email: &str) -> String {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            let head: String = local.chars().take(2).collect();
            format!("{head}{MASK}@{domain}")
        }
        _ => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_local_part() {
        assert_eq!(mask_email("alice@example.com"), "al***@example.com");
    }

    #[test]
    fn two_character_local_part() {
        assert_eq!(mask_email("ab@example.com"), "ab***@example.com");
    }

    #[test]
    fn short_local_part() {
        assert_eq!(mask_email("a@example.com"), "a***@example.com");
    }

    #[test]
    fn multibyte_local_part() {
        assert_eq!(mask_email("éèà@example.fr"), "éè***@example.fr");
    }

    #[test]
    fn without_at_sign_passes_through() {
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn with_two_at_signs_passes_through() {
        assert_eq!(mask_email("a@b@c"), "a@b@c");
    }
}
