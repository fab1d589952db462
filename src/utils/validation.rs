use super::response::ApiError;
use validator::ValidationErrors;

/// Fields of a request body in the order their rules are checked. Only the
/// first failing field is reported, so this decides which message wins.
pub trait CheckOrder {
    const FIELDS: &'static [&'static str];
}

/// Collapses validator output into the single human readable message the API
/// returns. Fields missing from `order` come last, by name.
pub fn into_api_error(errors: ValidationErrors, order: &[&str]) -> ApiError {
    let mut fields = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let message = errors
                .iter()
                .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{} tidak valid", field));
            let rank = order
                .iter()
                .position(|name| *name == AsRef::<str>::as_ref(&field))
                .unwrap_or(usize::MAX);
            (rank, field.to_string(), message)
        })
        .collect::<Vec<_>>();

    fields.sort();

    match fields.into_iter().next() {
        Some((_, _, message)) => ApiError::validation(message),
        None => ApiError::validation("Body tidak valid."),
    }
}
