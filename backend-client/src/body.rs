use quotebook_protocol::FormField;
use quotebook_protocol::FormPayload;
use quotebook_protocol::FormValue;
use reqwest::RequestBuilder;
use reqwest::multipart::Form;
use reqwest::multipart::Part;

use crate::error::ApiError;

/// Request payload kept in a form that can be attached more than once, since
/// a 401 makes the executor rebuild and resend the request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormField>),
}

impl RequestBody {
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|err| ApiError::Encoding(err.to_string()))
    }

    pub fn form(payload: &dyn FormPayload) -> Self {
        RequestBody::Multipart(payload.form_fields())
    }

    pub(crate) fn attach(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self {
            RequestBody::Empty => Ok(request),
            RequestBody::Json(value) => Ok(request.json(value)),
            RequestBody::Multipart(fields) => Ok(request.multipart(encode_multipart(fields)?)),
        }
    }
}

fn encode_multipart(fields: &[FormField]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        form = match &field.value {
            FormValue::Text(text) => form.text(field.name, text.clone()),
            FormValue::Integer(number) => form.text(field.name, number.to_string()),
            FormValue::Boolean(flag) => form.text(field.name, flag.to_string()),
            FormValue::List(values) => values
                .iter()
                .fold(form, |form, value| form.text(field.name, value.clone())),
            FormValue::Image(image) => {
                let part = Part::bytes(image.bytes.to_vec())
                    .file_name(image.file_name.clone())
                    .mime_str(image.format.mime_type())
                    .map_err(|err| ApiError::Encoding(err.to_string()))?;
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}
