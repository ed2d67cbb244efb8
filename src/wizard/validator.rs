//! Step validation.
//!
//! Pure functions over a schema and the current field values. A step is valid iff the
//! returned map is empty. List items report under `list[index].field`.

use crate::error::FieldErrors;
use crate::models::field::{FieldMap, FieldValue};
use crate::wizard::schema::{EntitySchema, FieldKind, FieldSpec, ListSpec, StepDefinition, StepField};

pub fn required_message(label: &str) -> String {
    format!("{} is required", label)
}

pub fn item_key(list: &str, index: usize, field: &str) -> String {
    format!("{}[{}].{}", list, index, field)
}

/// Errors for one step. Review/confirmation steps (no fields) are always valid.
pub fn validate_step(schema: &EntitySchema, step: usize, fields: &FieldMap) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Some(def) = schema.step(step) {
        check_step(def, fields, &mut errors);
    }
    errors
}

/// Re-run every data-entry step regardless of where the user is.
pub fn validate_all(schema: &EntitySchema, fields: &FieldMap) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for def in schema.data_steps() {
        check_step(def, fields, &mut errors);
    }
    errors
}

/// Lowest step index owning any of the error keys.
pub fn first_step_with_errors(schema: &EntitySchema, errors: &FieldErrors) -> Option<usize> {
    errors.keys().filter_map(|k| schema.step_of(k)).min()
}

fn check_step(def: &StepDefinition, fields: &FieldMap, errors: &mut FieldErrors) {
    for field in &def.fields {
        match field {
            StepField::Single(spec) => {
                if let Some(msg) = check_value(spec, fields.get(spec.name)) {
                    errors.insert(spec.name.to_string(), msg);
                }
            }
            StepField::List(spec) => check_list(spec, fields, errors),
        }
    }
}

fn check_list(spec: &ListSpec, fields: &FieldMap, errors: &mut FieldErrors) {
    let items = fields.list(spec.name);
    if items.len() < spec.min_items {
        errors.insert(
            spec.name.to_string(),
            format!("At least {} {} is required", spec.min_items, spec.item_label),
        );
    }
    for (i, item) in items.iter().enumerate() {
        for sub in &spec.fields {
            let value = FieldValue::Text(item.get(sub.name).to_string());
            if let Some(msg) = check_value(sub, Some(&value)) {
                errors.insert(item_key(spec.name, i, sub.name), msg);
            }
        }
    }
}

fn check_value(spec: &FieldSpec, value: Option<&FieldValue>) -> Option<String> {
    // Artifacts are produced by the engine, never by the user.
    if spec.kind == FieldKind::Artifact {
        return None;
    }
    let empty = value.map(FieldValue::is_empty).unwrap_or(true);
    if empty {
        return if spec.required {
            Some(required_message(spec.label))
        } else {
            None
        };
    }
    match (spec.rule, value.and_then(FieldValue::as_text)) {
        (Some(rule), Some(text)) => rule.check(spec.label, text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;
    use crate::error::WizardError;
    use crate::models::field::SubRecord;
    use crate::utils::validation::{EmailPolicy, IdPolicy, PhonePolicy, Rule};
    use crate::wizard::schema::{FailureRecovery, InsertAt};
    use chrono::NaiveDate;

    fn no_payload(_: &FieldMap) -> Result<serde_json::Value, WizardError> {
        Ok(serde_json::Value::Null)
    }

    fn schema() -> EntitySchema {
        EntitySchema::new(
            EntityKind::Incident,
            "Test",
            "test",
            "TST",
            FailureRecovery::StayOnReview,
            vec![
                StepDefinition::data_entry(
                    "One",
                    vec![
                        StepField::Single(FieldSpec::text("title", "Title").required()),
                        StepField::Single(FieldSpec::date("when", "Date").required()),
                        StepField::Single(FieldSpec::text("notes", "Notes")),
                    ],
                ),
                StepDefinition::data_entry(
                    "Two",
                    vec![
                        StepField::Single(
                            FieldSpec::text("email", "Email")
                                .required()
                                .rule(Rule::Email(EmailPolicy::Strict)),
                        ),
                        StepField::Single(
                            FieldSpec::text("phone", "Phone").rule(Rule::Phone(PhonePolicy::TenDigits)),
                        ),
                        StepField::List(
                            ListSpec::new("people", "People", "person")
                                .field(FieldSpec::text("name", "Name").required())
                                .field(
                                    FieldSpec::text("idNumber", "ID Number")
                                        .rule(Rule::NationalId(IdPolicy::MinLength(11))),
                                )
                                .field(FieldSpec::artifact("card", "Card"))
                                .min_items(1)
                                .insert_at(InsertAt::Front),
                        ),
                    ],
                ),
            ],
            no_payload,
        )
    }

    #[test]
    fn missing_required_fields_each_get_an_error() {
        let s = schema();
        let errors = validate_step(&s, 0, &s.defaults());
        assert_eq!(errors.get("title").map(String::as_str), Some("Title is required"));
        assert_eq!(errors.get("when").map(String::as_str), Some("Date is required"));
        assert!(!errors.contains_key("notes"), "optional field must not error");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn filled_step_is_valid() {
        let s = schema();
        let fields = s
            .defaults()
            .with("title", FieldValue::text("Rock fall at shaft 3"))
            .with("when", FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 2)));
        assert!(validate_step(&s, 0, &fields).is_empty());
    }

    #[test]
    fn optional_field_with_bad_format_still_errors() {
        let s = schema();
        let fields = s
            .defaults()
            .with("email", FieldValue::text("ops@mineops.co.zw"))
            .with("phone", FieldValue::text("12345"));
        let errors = validate_step(&s, 1, &fields);
        assert_eq!(
            errors.get("phone").map(String::as_str),
            Some("Phone number must be exactly 10 digits")
        );
    }

    #[test]
    fn list_items_report_positional_keys_and_skip_artifacts() {
        let s = schema();
        let errors = validate_step(&s, 1, &s.defaults());
        assert_eq!(
            errors.get("people[0].name").map(String::as_str),
            Some("Name is required")
        );
        assert!(!errors.contains_key("people[0].card"));
        assert!(!errors.contains_key("people[0].idNumber"));
    }

    #[test]
    fn list_below_minimum_reports_on_list_name() {
        let s = schema();
        let fields = s.defaults().with("people", FieldValue::List(Vec::new()));
        let errors = validate_step(&s, 1, &fields);
        assert_eq!(
            errors.get("people").map(String::as_str),
            Some("At least 1 person is required")
        );
    }

    #[test]
    fn validation_is_idempotent() {
        let s = schema();
        let mut item = SubRecord::blank("p", &["name", "idNumber", "card"]);
        item.set("idNumber", "123");
        let fields = s.defaults().with("people", FieldValue::List(vec![item]));
        let first = validate_step(&s, 1, &fields);
        let second = validate_step(&s, 1, &fields);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn validate_all_covers_every_data_step_and_finds_first() {
        let s = schema();
        let fields = s
            .defaults()
            .with("title", FieldValue::text("Rock fall"))
            .with("when", FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 2)));
        let errors = validate_all(&s, &fields);
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("people[0].name"));
        assert_eq!(first_step_with_errors(&s, &errors), Some(1));

        let all_missing = validate_all(&s, &s.defaults());
        assert_eq!(first_step_with_errors(&s, &all_missing), Some(0));
    }

    #[test]
    fn review_and_confirmation_steps_are_always_valid() {
        let s = schema();
        assert!(validate_step(&s, s.review_index(), &s.defaults()).is_empty());
        assert!(validate_step(&s, s.confirmation_index(), &s.defaults()).is_empty());
    }
}
