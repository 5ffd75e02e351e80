use validator::{Validate, ValidationErrors, ValidationErrorsKind};

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        _ => None,
    }
}

fn push_messages(out: &mut Vec<String>, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(str::to_string))
                        .unwrap_or_else(|| e.code.to_string());
                    out.push(format!("{path} {msg}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => push_messages(out, &path, nested),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    push_messages(out, &format!("{path}[{idx}]"), nested);
                }
            }
        }
    }
}

/// Field validation as flat, human readable messages (`"title has invalid length"`).
pub fn field_errors<T: Validate>(value: &T) -> Vec<String> {
    match value.validate() {
        Ok(()) => Vec::new(),
        Err(errs) => {
            let mut out = Vec::new();
            push_messages(&mut out, "", &errs);
            out.sort();
            out
        }
    }
}
