// Incident report wizard

use super::{sample_document, to_payload, EntityKind};
use crate::error::{StoreError, WizardError};
use crate::models::field::FieldMap;
use crate::models::requests::{AttachmentDto, IncidentReportRequest, PersonInvolvedDto, ReporterDto};
use crate::utils::validation::{EmailPolicy, PhonePolicy, Rule};
use crate::wizard::controller::WizardController;
use crate::wizard::schema::{
    EntitySchema, FailureRecovery, FieldSpec, InsertAt, ListSpec, StepDefinition, StepField,
};
use chrono::NaiveDate;
use serde_json::Value;

pub const PERSONS_INVOLVED: &str = "personsInvolved";
pub const ATTACHMENTS: &str = "attachments";

pub fn schema() -> EntitySchema {
    let persons = ListSpec::new(PERSONS_INVOLVED, "Persons Involved", "person involved")
        .field(FieldSpec::text("fullName", "Full Name").required())
        .field(FieldSpec::text("role", "Role").required())
        .field(FieldSpec::text("injuryStatus", "Injury Status"))
        .min_items(1)
        .insert_at(InsertAt::Front);

    // Attachments are optional and the list may be emptied.
    let attachments = ListSpec::new(ATTACHMENTS, "Attachments", "attachment")
        .field(FieldSpec::text("fileName", "File Name"))
        .field(FieldSpec::document("file", "File"))
        .insert_at(InsertAt::Back);

    EntitySchema::new(
        EntityKind::Incident,
        "Incident Report",
        "incidents",
        "INC",
        FailureRecovery::StayOnReview,
        vec![
            StepDefinition::data_entry(
                "Incident Details",
                vec![
                    StepField::Single(FieldSpec::text("title", "Title").required()),
                    StepField::Single(FieldSpec::text("incidentType", "Incident Type").required()),
                    StepField::Single(FieldSpec::date("incidentDate", "Incident Date").required()),
                    StepField::Single(FieldSpec::text("location", "Location").required()),
                    StepField::Single(FieldSpec::text("severity", "Severity").required()),
                    StepField::Single(FieldSpec::text("description", "Description").required()),
                ],
            ),
            StepDefinition::data_entry(
                "Reporter",
                vec![
                    StepField::Single(FieldSpec::text("reporterName", "Reporter Name").required()),
                    StepField::Single(
                        FieldSpec::text("reporterEmail", "Reporter Email")
                            .required()
                            .rule(Rule::Email(EmailPolicy::Strict)),
                    ),
                    StepField::Single(
                        FieldSpec::text("reporterPhone", "Reporter Phone")
                            .required()
                            .rule(Rule::Phone(PhonePolicy::International)),
                    ),
                ],
            ),
            StepDefinition::data_entry("Persons Involved", vec![StepField::List(persons)]),
            StepDefinition::data_entry("Attachments", vec![StepField::List(attachments)]),
        ],
        build_payload,
    )
}

fn build_payload(fields: &FieldMap) -> Result<Value, WizardError> {
    let persons_involved = fields
        .list(PERSONS_INVOLVED)
        .iter()
        .map(|p| PersonInvolvedDto {
            name: p.get("fullName").trim().to_string(),
            role: p.get("role").trim().to_string(),
            injury_status: p.non_empty("injuryStatus"),
        })
        .collect();

    // Attachment rows the user added but never filled are dropped.
    let attachments = fields
        .list(ATTACHMENTS)
        .iter()
        .filter_map(|a| {
            let file = a.non_empty("file")?;
            Some(AttachmentDto {
                file_name: a.non_empty("fileName").unwrap_or_else(|| a.id.clone()),
                file,
            })
        })
        .collect();

    to_payload(&IncidentReportRequest {
        title: fields.text("title"),
        incident_type: fields.text("incidentType"),
        incident_date: fields.date_string("incidentDate"),
        location: fields.text("location"),
        severity: fields.text("severity"),
        description: fields.text("description"),
        reported_by: ReporterDto {
            name: fields.text("reporterName"),
            email: fields.text("reporterEmail"),
            cell_number: fields.text("reporterPhone"),
        },
        persons_involved,
        attachments,
    })
}

pub fn fill_sample(c: &mut WizardController) -> Result<(), StoreError> {
    c.set_text("title", "Rock fall at level 3")?;
    c.set_text("incidentType", "Ground failure")?;
    c.set_date("incidentDate", NaiveDate::from_ymd_opt(2025, 3, 18))?;
    c.set_text("location", "Shaft 2, level 3 east drive")?;
    c.set_text("severity", "HIGH")?;
    c.set_text("description", "Loose hanging wall collapsed during barring down.")?;
    c.set_text("reporterName", "Rudo Chikwanha")?;
    c.set_text("reporterEmail", "rudo.chikwanha@example.co.zw")?;
    c.set_text("reporterPhone", "+263 771 234 567")?;
    c.set_item_field(PERSONS_INVOLVED, 0, "fullName", "Blessing Sibanda")?;
    c.set_item_field(PERSONS_INVOLVED, 0, "role", "Machine operator")?;
    c.set_item_field(PERSONS_INVOLVED, 0, "injuryStatus", "Minor")?;
    let idx = c.add_item(ATTACHMENTS)?;
    c.set_item_field(ATTACHMENTS, idx, "fileName", "scene.pdf")?;
    c.set_item_field(ATTACHMENTS, idx, "file", sample_document("scene"))?;
    Ok(())
}
