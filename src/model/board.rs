use serde::Deserialize;
use thiserror::Error;

/// One option of a single-select project field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

/// A single-select project field, the kind that backs a board's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusField {
    pub id: String,
    pub name: String,
    pub options: Vec<FieldOption>,
}

impl StatusField {
    /// Option lookup is an exact name match.
    pub fn option(&self, name: &str) -> Option<&FieldOption> {
        self.options.iter().find(|o| o.name == name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusFieldError {
    #[error("no single-select field{} on the project", .0.as_deref().map(|n| format!(" named {n:?}")).unwrap_or_default())]
    NotFound(Option<String>),
    #[error("project has several single-select fields ({}); set sync.status_field to pick one", .0.join(", "))]
    Ambiguous(Vec<String>),
}

const DEFAULT_FIELD_NAME: &str = "Status";

/// Pick the status field out of the project's single-select fields.
///
/// `candidates` must already be filtered to fields that carry options, in the
/// order the API returned them. A configured name wins; otherwise a lone
/// candidate is taken, then a lone field called "Status".
pub fn select_status_field(
    candidates: Vec<StatusField>,
    preferred: Option<&str>,
) -> Result<StatusField, StatusFieldError> {
    if let Some(name) = preferred {
        return candidates
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| StatusFieldError::NotFound(Some(name.to_string())));
    }

    if candidates.len() <= 1 {
        return candidates
            .into_iter()
            .next()
            .ok_or(StatusFieldError::NotFound(None));
    }

    let named: Vec<&StatusField> = candidates
        .iter()
        .filter(|f| f.name.eq_ignore_ascii_case(DEFAULT_FIELD_NAME))
        .collect();
    if let [only] = named.as_slice() {
        return Ok((*only).clone());
    }
    Err(StatusFieldError::Ambiguous(
        candidates.into_iter().map(|f| f.name).collect(),
    ))
}
