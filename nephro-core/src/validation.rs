//! Request body validation for the prediction and contact forms.
//!
//! Errors are collected per field rather than stopping at the first failure, and
//! serialize to a nested tree the web client already knows how to render:
//!
//! ```json
//! { "_errors": [], "age": { "_errors": ["Number must be less than or equal to 120"] } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{ContactFormData, PredictionInput};

/// Field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    form: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record an error that does not belong to a single field.
    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form.clone();
        for (field, messages) in &self.fields {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Node<'a> {
            _errors: &'a [String],
        }

        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("_errors", &self.form)?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, &Node { _errors: messages })?;
        }
        map.end()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads typed fields out of a JSON object, recording every violation.
struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn new(body: &'a Value) -> Result<Self, ValidationErrors> {
        match body {
            Value::Object(body) => Ok(Self {
                body,
                errors: ValidationErrors::new(),
            }),
            other => {
                let mut errors = ValidationErrors::new();
                errors.add_form(format!(
                    "Expected object, received {}",
                    json_type_name(other)
                ));
                Err(errors)
            }
        }
    }

    fn number(&mut self, field: &str) -> Option<f64> {
        let body: &'a Map<String, Value> = self.body;
        match body.get(field) {
            None => {
                self.errors.add(field, "Required");
                None
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(other) => {
                self.errors.add(
                    field,
                    format!("Expected number, received {}", json_type_name(other)),
                );
                None
            }
        }
    }

    fn string(&mut self, field: &str) -> Option<&'a str> {
        let body: &'a Map<String, Value> = self.body;
        match body.get(field) {
            None => {
                self.errors.add(field, "Required");
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                self.errors.add(
                    field,
                    format!("Expected string, received {}", json_type_name(other)),
                );
                None
            }
        }
    }

    fn positive(&mut self, field: &str) -> Option<f64> {
        let value = self.number(field)?;
        if value > 0.0 {
            Some(value)
        } else {
            self.errors.add(field, "Number must be greater than 0");
            None
        }
    }

    fn between(&mut self, field: &str, min: f64, max: f64, integer: bool) -> Option<f64> {
        let value = self.number(field)?;
        let mut ok = true;
        if integer && value.fract() != 0.0 {
            self.errors.add(field, "Expected integer, received float");
            ok = false;
        }
        if value < min {
            self.errors
                .add(field, format!("Number must be greater than or equal to {}", min));
            ok = false;
        }
        if value > max {
            self.errors
                .add(field, format!("Number must be less than or equal to {}", max));
            ok = false;
        }
        ok.then_some(value)
    }

    fn integer_between(&mut self, field: &str, min: u32, max: u32) -> Option<u32> {
        self.between(field, f64::from(min), f64::from(max), true)
            .map(|v| v as u32)
    }

    /// A 0/1 integer flag.
    fn flag(&mut self, field: &str) -> Option<u8> {
        self.integer_between(field, 0, 1).map(|v| v as u8)
    }

    fn min_chars(&mut self, field: &str, min: usize) -> Option<String> {
        let value = self.string(field)?;
        if value.chars().count() < min {
            self.errors.add(
                field,
                format!("String must contain at least {} character(s)", min),
            );
            return None;
        }
        Some(value.to_string())
    }

    fn email(&mut self, field: &str) -> Option<String> {
        let value = self.string(field)?;
        if !is_valid_email(value) {
            self.errors.add(field, "Invalid email");
            return None;
        }
        Some(value.to_string())
    }

    fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$";

pub fn is_valid_email(value: &str) -> bool {
    if value.starts_with('.') || value.contains("..") {
        return false;
    }
    Regex::new(EMAIL_PATTERN).map_or(false, |re| re.is_match(value))
}

/// Validate a raw prediction request body.
///
/// Constraints: creatinine, urea, sodium and bpSystolic strictly positive;
/// age an integer in 0..=120; glasgow in 3..=15; shock, sex, anemia, tobacco
/// and alcohol integers in {0, 1}.
pub fn validate_prediction(body: &Value) -> Result<PredictionInput, ValidationErrors> {
    let mut reader = FieldReader::new(body)?;

    let creatinine = reader.positive("creatinine");
    let urea = reader.positive("urea");
    let age = reader.integer_between("age", 0, 120);
    let sodium = reader.positive("sodium");
    let bp_systolic = reader.positive("bpSystolic");
    let shock = reader.flag("shock");
    let sex = reader.flag("sex");
    let anemia = reader.flag("anemia");
    let glasgow = reader.between("glasgow", 3.0, 15.0, false);
    let tobacco = reader.flag("tobacco");
    let alcohol = reader.flag("alcohol");

    match (
        creatinine,
        urea,
        age,
        sodium,
        bp_systolic,
        shock,
        sex,
        anemia,
        glasgow,
        tobacco,
        alcohol,
    ) {
        (
            Some(creatinine),
            Some(urea),
            Some(age),
            Some(sodium),
            Some(bp_systolic),
            Some(shock),
            Some(sex),
            Some(anemia),
            Some(glasgow),
            Some(tobacco),
            Some(alcohol),
        ) => Ok(PredictionInput {
            creatinine,
            urea,
            age,
            sodium,
            bp_systolic,
            shock,
            sex,
            anemia,
            glasgow,
            tobacco,
            alcohol,
        }),
        _ => Err(reader.into_errors()),
    }
}

/// Validate a raw contact form body.
pub fn validate_contact(body: &Value) -> Result<ContactFormData, ValidationErrors> {
    let mut reader = FieldReader::new(body)?;

    let name = reader.min_chars("name", 2);
    let email = reader.email("email");
    let subject = reader.min_chars("subject", 1);
    let message = reader.min_chars("message", 10);

    match (name, email, subject, message) {
        (Some(name), Some(email), Some(subject), Some(message)) => Ok(ContactFormData {
            name,
            email,
            subject,
            message,
        }),
        _ => Err(reader.into_errors()),
    }
}
