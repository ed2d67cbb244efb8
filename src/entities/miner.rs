// Miner / syndicate registration wizard

use super::{sample_document, to_payload, EntityKind};
use crate::error::{StoreError, WizardError};
use crate::models::field::FieldMap;
use crate::models::requests::{MinerRegistrationRequest, TeamMemberDto};
use crate::utils::validation::{IdPolicy, PhonePolicy, Rule, Transform};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::{
    EntitySchema, FailureRecovery, FieldSpec, InsertAt, ItemIdScheme, ListSpec, StepDefinition,
    StepField,
};
use chrono::NaiveDate;
use serde_json::Value;

pub const TEAM_MEMBERS: &str = "teamMembers";
pub const MEMBER_ID_PREFIX: &str = "TM";

fn national_id(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec::text(name, label)
        .required()
        .rule(Rule::NationalId(IdPolicy::Structured))
        .transform(Transform::StructuredId)
}

fn ten_digit_phone(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec::text(name, label)
        .required()
        .rule(Rule::Phone(PhonePolicy::TenDigits))
}

pub fn schema() -> EntitySchema {
    let team = ListSpec::new(TEAM_MEMBERS, "Team Members", "team member")
        .field(FieldSpec::text("name", "Name").required())
        .field(FieldSpec::text("surname", "Surname").required())
        .field(national_id("idNumber", "ID Number"))
        .field(ten_digit_phone("phone", "Phone Number"))
        .field(FieldSpec::text("position", "Position").required())
        .field(FieldSpec::artifact("idCard", "ID Card"))
        .min_items(1)
        .insert_at(InsertAt::Front)
        .id_scheme(ItemIdScheme::BusinessId(MEMBER_ID_PREFIX));

    EntitySchema::new(
        EntityKind::Miner,
        "Syndicate Registration",
        "miners/register",
        "MNR",
        FailureRecovery::RestartAtFirstStep,
        vec![
            StepDefinition::data_entry(
                "Syndicate Details",
                vec![
                    StepField::Single(FieldSpec::text("syndicateName", "Syndicate Name").required()),
                    StepField::Single(national_id("idNumber", "ID Number")),
                    StepField::Single(
                        FieldSpec::date("registrationDate", "Registration Date").required(),
                    ),
                    StepField::Single(FieldSpec::text("shaftNumber", "Shaft Number").required()),
                    StepField::Single(FieldSpec::text("address", "Address").required()),
                    StepField::Single(ten_digit_phone("phone", "Phone Number")),
                ],
            ),
            StepDefinition::data_entry("Team Members", vec![StepField::List(team)]),
            StepDefinition::data_entry(
                "Documents",
                vec![
                    StepField::Single(
                        FieldSpec::document("registrationCertificate", "Registration Certificate")
                            .required(),
                    ),
                    StepField::Single(
                        FieldSpec::document("proofOfResidence", "Proof of Residence").required(),
                    ),
                ],
            ),
        ],
        build_payload,
    )
}

fn build_payload(fields: &FieldMap) -> Result<Value, WizardError> {
    let team_members = fields
        .list(TEAM_MEMBERS)
        .iter()
        .map(|m| TeamMemberDto {
            member_id: m.id.clone(),
            name: m.get("name").trim().to_string(),
            surname: m.get("surname").trim().to_string(),
            id_number: m.get("idNumber").trim().to_string(),
            cell_number: m.get("phone").trim().to_string(),
            position: m.get("position").trim().to_string(),
            id_card: m.non_empty("idCard"),
        })
        .collect();

    to_payload(&MinerRegistrationRequest {
        syndicate_name: fields.text("syndicateName"),
        id_number: fields.text("idNumber"),
        registration_date: fields.date_string("registrationDate"),
        shaft_number: fields.text("shaftNumber"),
        address: fields.text("address"),
        cell_number: fields.text("phone"),
        team_members,
        registration_certificate: fields.text("registrationCertificate"),
        proof_of_residence: fields.text("proofOfResidence"),
    })
}

pub fn fill_sample(c: &mut WizardController) -> Result<(), StoreError> {
    c.set_text("syndicateName", "Gold Reef Syndicate")?;
    c.set_text("idNumber", "67657432d45")?;
    c.set_date("registrationDate", NaiveDate::from_ymd_opt(2024, 2, 14))?;
    c.set_text("shaftNumber", "SH-12")?;
    c.set_text("address", "Plot 7, Shurugwi")?;
    c.set_text("phone", "0771234567")?;
    for (field, value) in [
        ("name", "Farai"),
        ("surname", "Ncube"),
        ("idNumber", "08123456q07"),
        ("phone", "0712345678"),
        ("position", "Shift Supervisor"),
    ] {
        c.set_item_field(TEAM_MEMBERS, 0, field, value)?;
    }
    c.set_text("registrationCertificate", sample_document("certificate"))?;
    c.set_text("proofOfResidence", sample_document("residence"))?;
    Ok(())
}
