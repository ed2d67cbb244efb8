// Backend request payloads (one per entity wizard)
//
// Field names follow the backend contract, not the form: `firstName` is sent as `name`,
// `phone` as `cellNumber`. Document fields carry `data:<mime>;base64,<payload>` strings as-is.

use serde::{Deserialize, Serialize};

// =========================
// Driver
// =========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPersonDto {
    pub name: String,
    pub surname: String,
    pub id_number: String,
    pub cell_number: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRegistrationRequest {
    pub drivers: Vec<DriverPersonDto>,
    pub license_number: String,
    /// `YYYY-MM-DD`
    pub license_expiry: String,
    pub vehicle_registration: String,
    pub vehicle_type: String,
    pub license_document: String,
    pub id_document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_certificate: Option<String>,
}

// =========================
// Miner / syndicate
// =========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberDto {
    pub member_id: String,
    pub name: String,
    pub surname: String,
    pub id_number: String,
    pub cell_number: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerRegistrationRequest {
    pub syndicate_name: String,
    pub id_number: String,
    /// `YYYY-MM-DD`
    pub registration_date: String,
    pub shaft_number: String,
    pub address: String,
    pub cell_number: String,
    pub team_members: Vec<TeamMemberDto>,
    pub registration_certificate: String,
    pub proof_of_residence: String,
}

// =========================
// Incident
// =========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterDto {
    pub name: String,
    pub email: String,
    pub cell_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInvolvedDto {
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    pub file_name: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReportRequest {
    pub title: String,
    pub incident_type: String,
    /// `YYYY-MM-DD`
    pub incident_date: String,
    pub location: String,
    pub severity: String,
    pub description: String,
    pub reported_by: ReporterDto,
    pub persons_involved: Vec<PersonInvolvedDto>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
}

// =========================
// Mill
// =========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MillOperatorDto {
    pub name: String,
    pub id_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MillRegistrationRequest {
    pub mill_name: String,
    pub mill_type: String,
    pub location: String,
    pub owner_name: String,
    pub company_id_number: String,
    /// "PENDING" until an administrator approves the mill.
    pub status: String,
    pub status_health: String,
    pub operators: Vec<MillOperatorDto>,
    pub mill_license: String,
    pub environmental_certificate: String,
}

// =========================
// User
// =========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub cell_number: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}
