use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

/// Symbols a temporary password is drawn from.
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

/// Single-use credential handed to a newly provisioned account.
/// `Debug` output is redacted.
#[derive(Debug)]
pub struct TemporaryPassword(SecretString);

impl TemporaryPassword {
    pub fn new(password: String) -> Self {
        Self(SecretString::new(password))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Sample each character uniformly from [`PASSWORD_ALPHABET`].
pub fn generate_temporary_password() -> TemporaryPassword {
    let mut rng = rand::thread_rng();
    let password: String = (0..TEMPORARY_PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect();
    TemporaryPassword::new(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabet_has_seventy_distinct_symbols() {
        let unique: HashSet<_> = PASSWORD_ALPHABET.iter().collect();
        assert_eq!(PASSWORD_ALPHABET.len(), 70);
        assert_eq!(unique.len(), 70);
    }

    #[test]
    fn generated_password_uses_alphabet() {
        for _ in 0..50 {
            let password = generate_temporary_password();
            assert_eq!(password.expose().len(), TEMPORARY_PASSWORD_LENGTH);
            assert!(password
                .expose()
                .bytes()
                .all(|b| PASSWORD_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn debug_output_is_redacted() {
        let password = TemporaryPassword::new("Secret123!ab".to_string());
        assert!(!format!("{:?}", password).contains("Secret123!ab"));
    }
}
