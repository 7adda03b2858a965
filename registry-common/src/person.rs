use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A registered student, as stored in the `people` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub parents_phone: Option<String>,
    pub viloyat: Option<String>,
    pub tuman: Option<String>,
    pub manzil: Option<String>,
    pub yonalish: Option<String>,
    pub about_me: Option<String>,
    pub oqigan_joyi: Option<String>,
    pub tugilgan_kun: Option<NaiveDate>,
    pub gender: Option<String>,
    pub tg_username: Option<String>,
    pub email: Option<String>,
}

/// A Person that passed validation and is waiting for an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub parents_phone: Option<String>,
    pub viloyat: Option<String>,
    pub tuman: Option<String>,
    pub manzil: Option<String>,
    pub yonalish: Option<String>,
    pub about_me: Option<String>,
    pub oqigan_joyi: Option<String>,
    pub tugilgan_kun: Option<NaiveDate>,
    pub gender: Option<String>,
    pub tg_username: Option<String>,
    pub email: Option<String>,
}

impl NewPerson {
    /// Attach the id assigned by a store.
    pub fn with_id(self, id: i64) -> Person {
        Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            parents_phone: self.parents_phone,
            viloyat: self.viloyat,
            tuman: self.tuman,
            manzil: self.manzil,
            yonalish: self.yonalish,
            about_me: self.about_me,
            oqigan_joyi: self.oqigan_joyi,
            tugilgan_kun: self.tugilgan_kun,
            gender: self.gender,
            tg_username: self.tg_username,
            email: self.email,
        }
    }
}

/// The body of a request made to register a student.
/// Every field is optional on the wire so that a missing name is reported
/// the same way as any other invalid field.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Validate)]
pub struct PersonPayload {
    #[validate(
        required(message = "field is required"),
        length(min = 1, max = 100, message = "must be between 1 and 100 characters")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "field is required"),
        length(min = 1, max = 100, message = "must be between 1 and 100 characters")
    )]
    pub last_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub middle_name: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub parents_phone: Option<String>,

    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub viloyat: Option<String>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub tuman: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub manzil: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub yonalish: Option<String>,
    pub about_me: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub oqigan_joyi: Option<String>,

    pub tugilgan_kun: Option<String>,
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub gender: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub tg_username: Option<String>,
    #[validate(
        email(message = "not a valid email address"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Every problem found in a PersonPayload, ordered by field name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid student payload: {}", describe(.0))]
pub struct InvalidPerson(pub Vec<FieldError>);

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl PersonPayload {
    /// Check the payload and map it field by field into a NewPerson.
    pub fn into_new_person(self) -> Result<NewPerson, InvalidPerson> {
        let mut errors = match Validate::validate(&self) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let tugilgan_kun = match self.tugilgan_kun.as_deref().map(parse_date).transpose() {
            Ok(date) => date,
            Err(error) => {
                errors.add("tugilgan_kun", error);
                None
            }
        };

        if !errors.errors().is_empty() {
            return Err(InvalidPerson::from(errors));
        }

        let (first_name, last_name) = required_names(self.first_name, self.last_name)?;

        Ok(NewPerson {
            first_name,
            last_name,
            middle_name: self.middle_name,
            parents_phone: self.parents_phone,
            viloyat: self.viloyat,
            tuman: self.tuman,
            manzil: self.manzil,
            yonalish: self.yonalish,
            about_me: self.about_me,
            oqigan_joyi: self.oqigan_joyi,
            tugilgan_kun,
            gender: self.gender,
            tg_username: self.tg_username,
            email: self.email,
        })
    }
}

fn required_names(
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<(String, String), InvalidPerson> {
    match (first_name, last_name) {
        (Some(first_name), Some(last_name)) => Ok((first_name, last_name)),
        (first_name, last_name) => Err(InvalidPerson(
            [("first_name", first_name), ("last_name", last_name)]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(field, _)| FieldError {
                    field: field.to_owned(),
                    reason: "field is required".to_owned(),
                })
                .collect(),
        )),
    }
}

/// Parse a `YYYY-MM-DD` date. chrono also takes unpadded, signed or
/// space-prefixed forms, so the value must format back to itself.
fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == value)
        .ok_or_else(|| {
            let mut error = ValidationError::new("date");
            error.message = Some("expected a date formatted as YYYY-MM-DD".into());
            error
        })
}

impl From<ValidationErrors> for InvalidPerson {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    reason: error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| error.code.to_string()),
                })
            })
            .collect();

        fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.reason.cmp(&b.reason)));
        InvalidPerson(fields)
    }
}
