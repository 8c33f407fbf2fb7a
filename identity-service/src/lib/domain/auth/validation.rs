use crate::domain::auth::errors::ValidationError;
use crate::domain::auth::models::CreateTokenCommand;
use crate::domain::auth::models::CreateTokenPayload;
use crate::domain::auth::models::PlaintextPassword;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::auth::models::RegisterUserPayload;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Username;

/// Validates onboarding and login input.
///
/// Constructed once at startup and handed to the services that need it.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationValidator {
    password_min: usize,
    password_max: usize,
}

impl RegistrationValidator {
    pub const PASSWORD_MIN: usize = 3;
    pub const PASSWORD_MAX: usize = 72;

    pub fn new() -> Self {
        Self {
            password_min: Self::PASSWORD_MIN,
            password_max: Self::PASSWORD_MAX,
        }
    }

    /// Validate a registration payload into a command.
    ///
    /// # Errors
    /// * `Username` - Username rules violated
    /// * `Email` - Email is malformed or too long
    /// * `PasswordLength` - Password outside 3-72 characters
    pub fn validate_registration(
        &self,
        payload: RegisterUserPayload,
    ) -> Result<RegisterUserCommand, ValidationError> {
        let username = Username::new(payload.username.trim().to_string())?;
        let email = EmailAddress::new(payload.email.trim().to_string())?;
        let password = self.with_valid_password(payload.password)?;

        Ok(RegisterUserCommand {
            username,
            email,
            password,
        })
    }

    /// Validate a login payload into a command.
    ///
    /// # Errors
    /// * `Email` - Email is malformed or too long
    /// * `PasswordLength` - Password outside 3-72 characters
    pub fn validate_login(
        &self,
        payload: CreateTokenPayload,
    ) -> Result<CreateTokenCommand, ValidationError> {
        let email = EmailAddress::new(payload.email.trim().to_string())?;
        let password = self.with_valid_password(payload.password)?;

        Ok(CreateTokenCommand { email, password })
    }

    fn with_valid_password(
        &self,
        password: PlaintextPassword,
    ) -> Result<PlaintextPassword, ValidationError> {
        let length = password.as_str().chars().count();
        if length < self.password_min || length > self.password_max {
            return Err(ValidationError::PasswordLength {
                min: self.password_min,
                max: self.password_max,
                actual: length,
            });
        }
        Ok(password)
    }
}

impl Default for RegistrationValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::errors::UsernameError;

    fn payload(username: &str, email: &str, password: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            username: username.to_string(),
            email: email.to_string(),
            password: PlaintextPassword::new(password),
        }
    }

    #[test]
    fn test_valid_registration() {
        let command = RegistrationValidator::new()
            .validate_registration(payload(
                "GendryBaratheon",
                "gendry@example.com",
                "forge123",
            ))
            .unwrap();

        assert_eq!(command.username.as_str(), "GendryBaratheon");
        assert_eq!(command.email.as_str(), "gendry@example.com");
        assert_eq!(command.password.as_str(), "forge123");
    }

    #[test]
    fn test_username_is_trimmed() {
        let command = RegistrationValidator::new()
            .validate_registration(payload("  gendry ", "gendry@example.com", "forge123"))
            .unwrap();

        assert_eq!(command.username.as_str(), "gendry");
    }

    #[test]
    fn test_password_bounds() {
        let validator = RegistrationValidator::new();

        assert_eq!(
            validator
                .validate_registration(payload("gendry", "gendry@example.com", "ab"))
                .unwrap_err(),
            ValidationError::PasswordLength {
                min: 3,
                max: 72,
                actual: 2
            }
        );
        assert!(validator
            .validate_registration(payload("gendry", "gendry@example.com", "abc"))
            .is_ok());
        assert!(validator
            .validate_registration(payload("gendry", "gendry@example.com", &"a".repeat(72)))
            .is_ok());
        assert!(matches!(
            validator.validate_registration(payload(
                "gendry",
                "gendry@example.com",
                &"a".repeat(73)
            )),
            Err(ValidationError::PasswordLength { actual: 73, .. })
        ));
    }

    #[test]
    fn test_invalid_username_and_email() {
        let validator = RegistrationValidator::new();

        assert_eq!(
            validator
                .validate_registration(payload("", "gendry@example.com", "forge123"))
                .unwrap_err(),
            ValidationError::Username(UsernameError::TooShort { min: 1, actual: 0 })
        );
        assert!(matches!(
            validator.validate_registration(payload("gendry", "gendry", "forge123")),
            Err(ValidationError::Email(_))
        ));
    }

    #[test]
    fn test_login_validation() {
        let validator = RegistrationValidator::new();

        let command = validator
            .validate_login(CreateTokenPayload {
                email: "gendry@example.com".to_string(),
                password: PlaintextPassword::new("forge123"),
            })
            .unwrap();
        assert_eq!(command.email.as_str(), "gendry@example.com");

        assert!(matches!(
            validator.validate_login(CreateTokenPayload {
                email: "gendry@example.com".to_string(),
                password: PlaintextPassword::new(""),
            }),
            Err(ValidationError::PasswordLength { actual: 0, .. })
        ));
    }

    #[test]
    fn test_payload_debug_hides_password() {
        let debug = format!(
            "{:?}",
            payload("gendry", "gendry@example.com", "forge123")
        );
        assert!(!debug.contains("forge123"));
    }
}
