pub mod repository;
pub mod routes;

use crate::modules::otp::{codec, repository::OtpKey};
use repository::ChangeAction;
use std::borrow::Cow;
use validator::ValidationError;

pub fn valid_action(action: &str) -> Result<(), ValidationError> {
    match action.trim().parse::<ChangeAction>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("action");
            err.message = Some(Cow::Borrowed("action tidak valid"));
            Err(err)
        }
    }
}

/// Records are keyed by `"<uid>:change_email"` or `"<uid>:change_phone"`.
pub fn change_key(uid: &str, action: ChangeAction) -> OtpKey {
    OtpKey::new(
        action.purpose(),
        codec::encode_subject_key(&codec::composite_subject(uid, action.as_str())),
    )
}
