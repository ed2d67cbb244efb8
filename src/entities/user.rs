// User account wizard

use super::{to_payload, EntityKind};
use crate::error::{StoreError, WizardError};
use crate::models::field::FieldMap;
use crate::models::requests::CreateUserRequest;
use crate::utils::validation::{EmailPolicy, PhonePolicy, Rule};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::{EntitySchema, FailureRecovery, FieldSpec, StepDefinition, StepField};
use serde_json::Value;

pub fn schema() -> EntitySchema {
    EntitySchema::new(
        EntityKind::User,
        "Create User",
        "users",
        "USR",
        FailureRecovery::StayOnReview,
        vec![
            StepDefinition::data_entry(
                "Account",
                vec![
                    StepField::Single(FieldSpec::text("firstName", "First Name").required()),
                    StepField::Single(FieldSpec::text("lastName", "Last Name").required()),
                    StepField::Single(
                        FieldSpec::text("email", "Email")
                            .required()
                            .rule(Rule::Email(EmailPolicy::Strict)),
                    ),
                    StepField::Single(
                        FieldSpec::text("phone", "Phone Number")
                            .required()
                            .rule(Rule::Phone(PhonePolicy::International)),
                    ),
                ],
            ),
            StepDefinition::data_entry(
                "Access",
                vec![
                    StepField::Single(FieldSpec::text("role", "Role").required()),
                    StepField::Single(FieldSpec::text("department", "Department")),
                ],
            ),
        ],
        build_payload,
    )
}

fn build_payload(fields: &FieldMap) -> Result<Value, WizardError> {
    to_payload(&CreateUserRequest {
        name: fields.text("firstName"),
        last_name: fields.text("lastName"),
        email: fields.text("email"),
        cell_number: fields.text("phone"),
        role: fields.text("role"),
        department: fields.opt_text("department"),
    })
}

pub fn fill_sample(c: &mut WizardController) -> Result<(), StoreError> {
    c.set_text("firstName", "Nokuthula")?;
    c.set_text("lastName", "Dube")?;
    c.set_text("email", "n.dube@example.co.zw")?;
    c.set_text("phone", "+263772000111")?;
    c.set_text("role", "SAFETY_OFFICER")?;
    c.set_text("department", "Health & Safety")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_wizard_has_two_data_steps() {
        let s = schema();
        assert_eq!(s.step_count(), 4);
        assert_eq!(s.review_index(), 2);
        assert_eq!(s.steps[1].required_fields(), vec!["role"]);
    }

    #[test]
    fn payload_uses_backend_names() {
        let mut c = EntityKind::User.controller();
        fill_sample(&mut c).expect("sample");
        let payload = build_payload(c.state().fields()).expect("payload");
        assert_eq!(payload["name"], "Nokuthula");
        assert_eq!(payload["lastName"], "Dube");
        assert_eq!(payload["cellNumber"], "+263772000111");
        assert!(payload.get("firstName").is_none());
    }
}
