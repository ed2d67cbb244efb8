// Mill registration wizard

use super::{sample_document, to_payload, EntityKind};
use crate::error::{StoreError, WizardError};
use crate::models::field::FieldMap;
use crate::models::requests::{MillOperatorDto, MillRegistrationRequest};
use crate::utils::validation::{IdPolicy, PhonePolicy, Rule};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::{
    EntitySchema, FailureRecovery, FieldSpec, InsertAt, ListSpec, StepDefinition, StepField,
};
use serde_json::Value;

pub const OPERATORS: &str = "operators";

pub const INITIAL_STATUS: &str = "PENDING";
pub const INITIAL_HEALTH: &str = "HEALTHY";

pub fn schema() -> EntitySchema {
    let operators = ListSpec::new(OPERATORS, "Operators", "operator")
        .field(FieldSpec::text("fullName", "Full Name").required())
        .field(
            FieldSpec::text("idNumber", "ID Number")
                .required()
                .rule(Rule::NationalId(IdPolicy::MinLength(11))),
        )
        .field(FieldSpec::text("phone", "Phone Number").rule(Rule::Phone(PhonePolicy::Lenient)))
        .min_items(1)
        .insert_at(InsertAt::Back);

    EntitySchema::new(
        EntityKind::Mill,
        "Mill Registration",
        "mills",
        "MIL",
        FailureRecovery::RestartAtFirstStep,
        vec![
            StepDefinition::data_entry(
                "Mill Details",
                vec![
                    StepField::Single(FieldSpec::text("millName", "Mill Name").required()),
                    StepField::Single(FieldSpec::text("millType", "Mill Type").required()),
                    StepField::Single(FieldSpec::text("location", "Location").required()),
                    StepField::Single(FieldSpec::text("ownerName", "Owner Name").required()),
                    StepField::Single(
                        FieldSpec::text("companyIdNumber", "Company ID Number")
                            .required()
                            .rule(Rule::NationalId(IdPolicy::MinLength(11))),
                    ),
                ],
            ),
            StepDefinition::data_entry("Operators", vec![StepField::List(operators)]),
            StepDefinition::data_entry(
                "Compliance",
                vec![
                    StepField::Single(FieldSpec::document("millLicense", "Mill Licence").required()),
                    StepField::Single(
                        FieldSpec::document("environmentalCertificate", "Environmental Certificate")
                            .required(),
                    ),
                ],
            ),
        ],
        build_payload,
    )
    .with_fixed_default("status", INITIAL_STATUS)
    .with_fixed_default("statusHealth", INITIAL_HEALTH)
}

fn build_payload(fields: &FieldMap) -> Result<Value, WizardError> {
    let operators = fields
        .list(OPERATORS)
        .iter()
        .map(|o| MillOperatorDto {
            name: o.get("fullName").trim().to_string(),
            id_number: o.get("idNumber").trim().to_string(),
            cell_number: o.non_empty("phone"),
        })
        .collect();

    to_payload(&MillRegistrationRequest {
        mill_name: fields.text("millName"),
        mill_type: fields.text("millType"),
        location: fields.text("location"),
        owner_name: fields.text("ownerName"),
        company_id_number: fields.text("companyIdNumber"),
        status: fields.opt_text("status").unwrap_or_else(|| INITIAL_STATUS.to_string()),
        status_health: fields
            .opt_text("statusHealth")
            .unwrap_or_else(|| INITIAL_HEALTH.to_string()),
        operators,
        mill_license: fields.text("millLicense"),
        environmental_certificate: fields.text("environmentalCertificate"),
    })
}

pub fn fill_sample(c: &mut WizardController) -> Result<(), StoreError> {
    c.set_text("millName", "Kadoma Stamp Mill")?;
    c.set_text("millType", "Stamp mill")?;
    c.set_text("location", "Kadoma, Mashonaland West")?;
    c.set_text("ownerName", "Chiedza Marufu")?;
    c.set_text("companyIdNumber", "CR-2024-00981")?;
    c.set_item_field(OPERATORS, 0, "fullName", "Tawanda Gumbo")?;
    c.set_item_field(OPERATORS, 0, "idNumber", "59-876543K21")?;
    c.set_item_field(OPERATORS, 0, "phone", "+263 78 555 0199")?;
    c.set_text("millLicense", sample_document("mill-licence"))?;
    c.set_text("environmentalCertificate", sample_document("ema"))?;
    Ok(())
}
