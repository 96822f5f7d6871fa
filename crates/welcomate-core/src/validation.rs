//! Input validation for user-facing operations.

const USERNAME_MIN_LENGTH: usize = 1;
const USERNAME_MAX_LENGTH: usize = 20;
const PASSWORD_MIN_LENGTH: usize = 1;
const PASSWORD_MAX_LENGTH: usize = 20;

/// Username must be 1-20 characters after trimming.
pub fn is_valid_username(username: &str) -> bool {
    let length = username.trim().chars().count();
    (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length)
}

/// Password must be 1-20 characters; whitespace counts.
pub fn is_valid_password(password: &str) -> bool {
    let length = password.chars().count();
    (PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length)
}

/// Account must not be blank.
pub fn is_valid_account(account: &str) -> bool {
    !account.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_is_bounded() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username(" a "));
        assert!(!is_valid_username("   "));
        assert!(!is_valid_username(&"x".repeat(21)));
        assert!(is_valid_username(&"x".repeat(20)));
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(is_valid_password(" "));
        assert!(!is_valid_password(""));
        assert!(is_valid_password(&"密".repeat(20)));
        assert!(!is_valid_password(&"密".repeat(21)));
    }

    #[test]
    fn account_must_not_be_blank() {
        assert!(is_valid_account("a1"));
        assert!(!is_valid_account(" \t"));
    }
}
