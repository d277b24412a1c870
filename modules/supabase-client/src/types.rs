use serde::Deserialize;

/// Error body PostgREST returns on a failed request.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestError {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl PostgrestError {
    /// Best human-readable message for a failed response body. Falls back to
    /// the raw body when it is not a PostgREST error object.
    pub fn describe(body: &str) -> String {
        let Ok(err) = serde_json::from_str::<PostgrestError>(body) else {
            return body.to_string();
        };

        let mut message = err.message;
        if let Some(code) = err.code {
            message.push_str(&format!(" [{code}]"));
        }
        if let Some(details) = err.details {
            message.push_str(&format!(" ({details})"));
        }
        if let Some(hint) = err.hint {
            message.push_str(&format!(" hint: {hint}"));
        }
        message
    }
}
