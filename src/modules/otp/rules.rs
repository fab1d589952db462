//! `validator` rules shared by the OTP request bodies. Each rule carries the
//! message shown to the user.

use super::codec;
use std::borrow::Cow;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn valid_email(email: &str) -> Result<(), ValidationError> {
    if codec::is_valid_email(&codec::normalize_email(email)) {
        Ok(())
    } else {
        Err(invalid("email", "Email tidak valid."))
    }
}

pub fn valid_otp(otp: &str) -> Result<(), ValidationError> {
    if codec::is_valid_otp(otp.trim()) {
        Ok(())
    } else {
        Err(invalid("otp", "OTP harus 6 digit."))
    }
}

pub fn strong_password(password: &str) -> Result<(), ValidationError> {
    if codec::is_password_strong(password) {
        Ok(())
    } else {
        Err(invalid(
            "new_password",
            "Password baru tidak memenuhi syarat.",
        ))
    }
}

pub fn valid_channel(channel: &str) -> Result<(), ValidationError> {
    match channel.trim() {
        "email" | "whatsapp" => Ok(()),
        _ => Err(invalid("channel", "channel tidak valid")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_carry_user_messages() {
        assert!(valid_email("  A@Example.com ").is_ok());
        assert_eq!(
            valid_email("nope").unwrap_err().message.as_deref(),
            Some("Email tidak valid.")
        );
        assert!(valid_otp(" 012345 ").is_ok());
        assert!(valid_otp("12345").is_err());
        assert!(strong_password("Abc12!").is_ok());
        assert!(strong_password("abc123").is_err());
        assert!(valid_channel("whatsapp").is_ok());
        assert!(valid_channel("sms").is_err());
    }
}
