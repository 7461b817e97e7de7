use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadence_core::CadenceError;

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        let Some(e) = self.0.downcast_ref::<CadenceError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            CadenceError::RuleNotFound(_)
            | CadenceError::WorkflowNotFound(_)
            | CadenceError::AbTestNotFound(_)
            | CadenceError::RunNotFound(_)
            | CadenceError::ThreadNotFound(_)
            | CadenceError::TemplateNotFound(_)
            | CadenceError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            CadenceError::InvalidTrigger(_)
            | CadenceError::InvalidActionType(_)
            | CadenceError::InvalidOperator(_)
            | CadenceError::InvalidStepType(_)
            | CadenceError::InvalidStatus(_)
            | CadenceError::InvalidTestType(_)
            | CadenceError::InvalidCommand(_)
            | CadenceError::UnknownProvider(_)
            | CadenceError::InvalidActionParams { .. }
            | CadenceError::InvalidStepConfig { .. }
            | CadenceError::DanglingStep { .. }
            | CadenceError::DuplicatePosition(_)
            | CadenceError::CycleDetected(_)
            | CadenceError::UnsupportedCommand { .. }
            | CadenceError::UnsupportedCondition(_)
            | CadenceError::MissingVariables(_)
            | CadenceError::InvalidVariable(_)
            | CadenceError::Validation(_) => StatusCode::BAD_REQUEST,
            CadenceError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CadenceError::ChangePending(_) => StatusCode::CONFLICT,
            CadenceError::WizardClosed
            | CadenceError::SaveFailed(_)
            | CadenceError::HomeNotFound
            | CadenceError::Io(_)
            | CadenceError::Yaml(_)
            | CadenceError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.0.downcast_ref::<CadenceError>() {
            Some(CadenceError::Validation(fields)) => serde_json::json!({
                "error": self.0.to_string(),
                "fields": fields,
            }),
            _ => serde_json::json!({ "error": self.0.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::validation::ValidationErrors;

    #[test]
    fn rule_not_found_maps_to_404() {
        let err = AppError(CadenceError::RuleNotFound("r1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let mut fields = ValidationErrors::new();
        fields.add("name", "Name is required");
        let err = AppError(CadenceError::Validation(fields).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_transition_maps_to_422() {
        let err = AppError(
            CadenceError::InvalidTransition {
                command: "start".into(),
                entity: "a/b test".into(),
                state: "completed".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn cycle_maps_to_400() {
        let err = AppError(CadenceError::CycleDetected(vec![0, 1]).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_cadence_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(CadenceError::ThreadNotFound("t9".into()).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
