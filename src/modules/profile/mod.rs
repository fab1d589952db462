pub mod routes;

use crate::modules::{
    auth::repository::Contact,
    otp::{
        codec,
        repository::{OtpKey, Purpose},
    },
};
use std::borrow::Cow;
use validator::ValidationError;

pub fn parse_contact(purpose: &str) -> Option<Contact> {
    match purpose.trim() {
        "email" => Some(Contact::Email),
        "phone" => Some(Contact::Phone),
        _ => None,
    }
}

pub fn valid_purpose(purpose: &str) -> Result<(), ValidationError> {
    match parse_contact(purpose) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("purpose");
            err.message = Some(Cow::Borrowed("purpose tidak valid"));
            Err(err)
        }
    }
}

/// Records are keyed by `"<uid>:email"` or `"<uid>:phone"`.
pub fn verification_key(uid: &str, contact: Contact) -> OtpKey {
    let (purpose, tag) = match contact {
        Contact::Email => (Purpose::VerifyEmail, "email"),
        Contact::Phone => (Purpose::VerifyPhone, "phone"),
    };
    OtpKey::new(
        purpose,
        codec::encode_subject_key(&codec::composite_subject(uid, tag)),
    )
}
