use crate::modules::otp::repository::Purpose;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;

/// A company contact change that needs an OTP sent to the old contact first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    ChangeEmail,
    ChangePhone,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::ChangeEmail => "change_email",
            ChangeAction::ChangePhone => "change_phone",
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            ChangeAction::ChangeEmail => Purpose::ChangeEmail,
            ChangeAction::ChangePhone => Purpose::ChangePhone,
        }
    }
}

impl FromStr for ChangeAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "change_email" => Ok(ChangeAction::ChangeEmail),
            "change_phone" => Ok(ChangeAction::ChangePhone),
            _ => Err(format!("'{}' is not a valid ChangeAction", s)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct CompanyContacts {
    #[sqlx(rename = "company_email")]
    pub email: Option<String>,
    #[sqlx(rename = "company_phone")]
    pub phone: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    async fn find_contacts(&self, uid: &str) -> Result<Option<CompanyContacts>>;

    async fn mark_change_authorized(
        &self,
        uid: &str,
        action: ChangeAction,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

pub async fn find_contacts_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    uid: &str,
) -> Result<Option<CompanyContacts>> {
    sqlx::query_as::<_, CompanyContacts>(
        "SELECT company_email, company_phone FROM companies WHERE id = $1",
    )
    .bind(uid)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to fetch company {}: {}", uid, err);
        Error::UnexpectedError
    })
}

pub async fn authorize_change_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    uid: &str,
    action: ChangeAction,
    at: DateTime<Utc>,
) -> Result<()> {
    let query = match action {
        ChangeAction::ChangeEmail => {
            "UPDATE companies SET change_email_authorized_at = $2, updated_at = $2 WHERE id = $1"
        }
        ChangeAction::ChangePhone => {
            "UPDATE companies SET change_phone_authorized_at = $2, updated_at = $2 WHERE id = $1"
        }
    };

    sqlx::query(query)
        .bind(uid)
        .bind(at)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to authorize {} for company {}: {}",
                action.as_str(),
                uid,
                err
            );
            Error::UnexpectedError
        })
}

pub struct PgCompanyDirectory {
    pool: PgPool,
}

impl PgCompanyDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyDirectory for PgCompanyDirectory {
    async fn find_contacts(&self, uid: &str) -> Result<Option<CompanyContacts>> {
        find_contacts_by_id(&self.pool, uid).await
    }

    async fn mark_change_authorized(
        &self,
        uid: &str,
        action: ChangeAction,
        at: DateTime<Utc>,
    ) -> Result<()> {
        authorize_change_by_id(&self.pool, uid, action, at).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_wire_names() {
        assert_eq!("change_email".parse(), Ok(ChangeAction::ChangeEmail));
        assert_eq!("change_phone".parse(), Ok(ChangeAction::ChangePhone));
        assert!("change_name".parse::<ChangeAction>().is_err());
        assert_eq!(ChangeAction::ChangePhone.purpose(), Purpose::ChangePhone);
    }
}
