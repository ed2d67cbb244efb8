// Driver onboarding wizard

use super::{sample_document, to_payload, EntityKind};
use crate::error::{StoreError, WizardError};
use crate::models::field::FieldMap;
use crate::models::requests::{DriverPersonDto, DriverRegistrationRequest};
use crate::utils::validation::{EmailPolicy, IdPolicy, PhonePolicy, Rule};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::{
    EntitySchema, FailureRecovery, FieldSpec, InsertAt, ListSpec, StepDefinition, StepField,
};
use chrono::NaiveDate;
use serde_json::Value;

pub const PERSONS: &str = "persons";

pub fn schema() -> EntitySchema {
    let persons = ListSpec::new(PERSONS, "Drivers", "driver")
        .field(FieldSpec::text("firstName", "First Name").required())
        .field(FieldSpec::text("surname", "Surname").required())
        .field(
            FieldSpec::text("idNumber", "ID Number")
                .required()
                .rule(Rule::NationalId(IdPolicy::MinLength(11))),
        )
        .field(
            FieldSpec::text("phone", "Phone Number")
                .required()
                .rule(Rule::Phone(PhonePolicy::Lenient)),
        )
        .field(
            FieldSpec::text("email", "Email")
                .required()
                .rule(Rule::Email(EmailPolicy::Basic)),
        )
        .field(FieldSpec::text("address", "Address"))
        .min_items(1)
        .insert_at(InsertAt::Back);

    EntitySchema::new(
        EntityKind::Driver,
        "Driver Registration",
        "drivers/register",
        "DRV",
        FailureRecovery::StayOnReview,
        vec![
            StepDefinition::data_entry("Driver Details", vec![StepField::List(persons)]),
            StepDefinition::data_entry(
                "Licence & Vehicle",
                vec![
                    StepField::Single(FieldSpec::text("licenseNumber", "Licence Number").required()),
                    StepField::Single(FieldSpec::date("licenseExpiry", "Licence Expiry").required()),
                    StepField::Single(
                        FieldSpec::text("vehicleRegistration", "Vehicle Registration").required(),
                    ),
                    StepField::Single(FieldSpec::text("vehicleType", "Vehicle Type").required()),
                ],
            ),
            StepDefinition::data_entry(
                "Documents",
                vec![
                    StepField::Single(FieldSpec::document("licenseDocument", "Driver's Licence").required()),
                    StepField::Single(FieldSpec::document("idDocument", "ID Document").required()),
                    StepField::Single(FieldSpec::document("medicalCertificate", "Medical Certificate")),
                ],
            ),
        ],
        build_payload,
    )
}

fn build_payload(fields: &FieldMap) -> Result<Value, WizardError> {
    let drivers = fields
        .list(PERSONS)
        .iter()
        .map(|p| DriverPersonDto {
            name: p.get("firstName").trim().to_string(),
            surname: p.get("surname").trim().to_string(),
            id_number: p.get("idNumber").trim().to_string(),
            cell_number: p.get("phone").trim().to_string(),
            email: p.get("email").trim().to_string(),
            address: p.non_empty("address"),
        })
        .collect();

    to_payload(&DriverRegistrationRequest {
        drivers,
        license_number: fields.text("licenseNumber"),
        license_expiry: fields.date_string("licenseExpiry"),
        vehicle_registration: fields.text("vehicleRegistration"),
        vehicle_type: fields.text("vehicleType"),
        license_document: fields.text("licenseDocument"),
        id_document: fields.text("idDocument"),
        medical_certificate: fields.opt_text("medicalCertificate"),
    })
}

pub fn fill_sample(c: &mut WizardController) -> Result<(), StoreError> {
    for (field, value) in [
        ("firstName", "Tendai"),
        ("surname", "Mukanya"),
        ("idNumber", "63-123456F63"),
        ("phone", "+263 77 123 4567"),
        ("email", "tendai.mukanya@example.co.zw"),
        ("address", "14 Shaft Road, Kwekwe"),
    ] {
        c.set_item_field(PERSONS, 0, field, value)?;
    }
    c.set_text("licenseNumber", "DL-558210")?;
    c.set_date("licenseExpiry", NaiveDate::from_ymd_opt(2028, 6, 30))?;
    c.set_text("vehicleRegistration", "AEZ 4471")?;
    c.set_text("vehicleType", "Tipper truck")?;
    c.set_text("licenseDocument", sample_document("licence"))?;
    c.set_text("idDocument", sample_document("id"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::controller::NextOutcome;

    #[test]
    fn payload_renames_person_fields_and_formats_dates() {
        let mut c = EntityKind::Driver.controller();
        fill_sample(&mut c).expect("sample");
        let payload = build_payload(c.state().fields()).expect("payload");

        let driver = &payload["drivers"][0];
        assert_eq!(driver["name"], "Tendai");
        assert_eq!(driver["cellNumber"], "+263 77 123 4567");
        assert!(driver.get("firstName").is_none());
        assert_eq!(payload["licenseExpiry"], "2028-06-30");
        assert!(payload.get("medicalCertificate").is_none(), "optional doc omitted when blank");
    }

    #[test]
    fn first_step_reports_each_missing_person_field() {
        let mut c = EntityKind::Driver.controller();
        match c.next() {
            NextOutcome::Blocked { errors } => {
                assert_eq!(
                    errors.get("persons[0].firstName").map(String::as_str),
                    Some("First Name is required")
                );
                assert!(errors.contains_key("persons[0].email"));
                assert!(!errors.contains_key("persons[0].address"));
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn short_id_and_bad_email_are_rejected() {
        let mut c = EntityKind::Driver.controller();
        fill_sample(&mut c).expect("sample");
        c.set_item_field(PERSONS, 0, "idNumber", "12345").expect("id");
        c.set_item_field(PERSONS, 0, "email", "not-an-email").expect("email");
        match c.next() {
            NextOutcome::Blocked { errors } => {
                assert_eq!(
                    errors.get("persons[0].idNumber").map(String::as_str),
                    Some("ID Number must be at least 11 characters")
                );
                assert_eq!(
                    errors.get("persons[0].email").map(String::as_str),
                    Some("Please enter a valid email address")
                );
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn new_drivers_are_appended() {
        let mut c = EntityKind::Driver.controller();
        c.set_item_field(PERSONS, 0, "firstName", "First").expect("name");
        let idx = c.add_item(PERSONS).expect("add");
        assert_eq!(idx, 1);
        assert_eq!(c.state().fields().list(PERSONS)[0].get("firstName"), "First");
    }
}
