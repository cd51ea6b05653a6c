// Request-shape validation for the identity endpoints. Each failure carries
// the offending field in the message so the client can correct its input.

use ripple_error::AppError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), AppError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)?;
    Ok(())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AppError> {
    validate_email(email)?;
    validate_password(password)?;
    Ok(())
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(AppError::validation(format!(
            "username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::validation(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::validation("a valid email is required"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(AppError::validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_registration() {
        assert!(validate_registration("alice_01", "alice@example.com", "hunter22").is_ok());
    }

    #[test]
    fn rejects_short_username() {
        assert!(validate_registration("al", "alice@example.com", "hunter22").is_err());
    }

    #[test]
    fn rejects_username_with_spaces() {
        assert!(validate_registration("alice smith", "alice@example.com", "hunter22").is_err());
    }

    #[test]
    fn rejects_bad_emails() {
        for email in ["no-at-sign", "@example.com", "a@nodot", "a@.com", "a b@example.com"] {
            assert!(
                validate_registration("alice", email, "hunter22").is_err(),
                "accepted: {}",
                email
            );
        }
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_login("alice@example.com", "12345").is_err());
        assert!(validate_login("alice@example.com", "123456").is_ok());
    }
}
