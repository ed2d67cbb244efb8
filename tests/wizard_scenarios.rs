// End-to-end wizard scenarios against the public API.

use async_trait::async_trait;
use mineops_wizard::api::{interpret_response, Submitter};
use mineops_wizard::entities::driver::PERSONS;
use mineops_wizard::entities::mill::{INITIAL_HEALTH, INITIAL_STATUS};
use mineops_wizard::entities::EntityKind;
use mineops_wizard::error::WizardError;
use mineops_wizard::models::field::FieldValue;
use mineops_wizard::models::responses::SubmitReceipt;
use mineops_wizard::models::state::SubmissionStatus;
use mineops_wizard::wizard::schema::StepField;
use mineops_wizard::wizard::validator::{item_key, validate_step};
use mineops_wizard::wizard::{CompletionOutcome, NextOutcome, Progress, SubmitTicket, WizardController};
use std::sync::atomic::{AtomicU32, Ordering};

/// Replays a fixed HTTP reply through the real response normalization.
struct CannedSubmitter {
    status: u16,
    body: &'static str,
    calls: AtomicU32,
}

impl CannedSubmitter {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Submitter for CannedSubmitter {
    async fn submit(&self, _ticket: &SubmitTicket) -> Result<SubmitReceipt, WizardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        interpret_response(self.status, self.body)
    }
}

fn at_review(kind: EntityKind) -> WizardController {
    let mut c = kind.controller();
    kind.fill_sample(&mut c).expect("sample");
    while !c.is_review() {
        let step = c.current_step();
        assert_eq!(
            c.next(),
            NextOutcome::Advanced { to: step + 1 },
            "{} sample must pass step {}",
            kind,
            step
        );
    }
    c
}

#[test]
fn next_with_empty_required_fields_stays_and_reports_each_field() {
    for kind in EntityKind::ALL {
        let mut c = kind.controller();
        let outcome = c.next();
        assert!(matches!(outcome, NextOutcome::Blocked { .. }), "{}: {:?}", kind, outcome);
        assert_eq!(c.current_step(), 0);

        let step = c.schema().step(0).expect("step 0").clone();
        let mut expected: Vec<String> = step
            .required_fields()
            .into_iter()
            .map(str::to_string)
            .collect();
        // Lists start with `min_items` blank items; each required sub-field must be flagged.
        for field in &step.fields {
            if let StepField::List(list) = field {
                for index in 0..list.min_items {
                    expected.extend(
                        list.fields
                            .iter()
                            .filter(|f| f.required)
                            .map(|f| item_key(list.name, index, f.name)),
                    );
                }
            }
        }
        assert!(!expected.is_empty(), "{}: step 0 has nothing required", kind);
        for key in &expected {
            assert!(
                c.state().field_errors().contains_key(key.as_str()),
                "{}: missing error for {}",
                kind,
                key
            );
        }
    }
}

#[test]
fn valid_steps_advance_by_exactly_one_and_review_submits() {
    for kind in EntityKind::ALL {
        let mut c = at_review(kind);
        assert_eq!(c.current_step(), c.schema().review_index());
        assert!(matches!(c.next(), NextOutcome::Submit(_)), "{}", kind);
        assert_eq!(c.state().submission_status(), SubmissionStatus::Submitting);
    }
}

#[test]
fn validator_is_idempotent() {
    let mut c = EntityKind::User.controller();
    c.set_text("email", "not-an-email").expect("email");
    let first = validate_step(c.schema(), 0, c.state().fields());
    let second = validate_step(c.schema(), 0, c.state().fields());
    assert_eq!(first, second);
    assert!(first.contains_key("email"));
}

#[test]
fn reset_restores_documented_default_shape() {
    let mut c = at_review(EntityKind::Mill);
    c.reset();

    let fields = c.state().fields();
    assert_eq!(fields.text("status"), INITIAL_STATUS);
    assert_eq!(fields.text("statusHealth"), INITIAL_HEALTH);
    assert_eq!(c.current_step(), 0);
    assert!(c.state().field_errors().is_empty());

    let defaults = c.schema().defaults();
    for (name, value) in defaults.iter() {
        match value {
            // List items get fresh ids; compare shape only.
            FieldValue::List(items) => {
                let now = fields.list(name);
                assert_eq!(now.len(), items.len(), "{}", name);
                assert!(now.iter().all(|i| i.fields.values().all(|v| v.is_empty())));
            }
            other => assert_eq!(fields.get(name), Some(other), "{}", name),
        }
    }
}

#[test]
fn list_never_drops_below_minimum() {
    let mut c = EntityKind::Driver.controller();
    assert_eq!(c.remove_item(PERSONS, 0), Ok(false));
    assert_eq!(c.state().fields().list(PERSONS).len(), 1);
}

#[test]
fn miner_id_is_formatted_and_validated() {
    let mut c = EntityKind::Miner.controller();
    c.set_text("idNumber", "67657432d45").expect("id");
    assert_eq!(c.state().fields().text("idNumber"), "67-657432D45");
    let errors = validate_step(c.schema(), 0, c.state().fields());
    assert!(!errors.contains_key("idNumber"), "{:?}", errors.get("idNumber"));

    c.set_text("idNumber", "12345").expect("id");
    let errors = validate_step(c.schema(), 0, c.state().fields());
    assert_eq!(
        errors.get("idNumber").map(String::as_str),
        Some("ID number must be exactly 11 characters")
    );
}

#[tokio::test]
async fn backend_rejection_returns_miner_to_data_entry_with_banner() {
    let submitter = CannedSubmitter::new(200, r#"{"success":false,"error":"duplicate ID"}"#);
    let mut c = at_review(EntityKind::Miner);

    let progress = c.next_with(&submitter).await;
    assert!(
        matches!(progress, Progress::Completed(CompletionOutcome::Failed { .. })),
        "{:?}",
        progress
    );
    assert_eq!(c.state().submission_status(), SubmissionStatus::Failed);
    assert!(c.state().banner().unwrap_or_default().contains("duplicate ID"));
    assert!(c.current_step() < c.schema().review_index());
    assert!(!c.is_confirmation());
    assert_eq!(submitter.calls.load(Ordering::SeqCst), 1, "no retry");
}

#[tokio::test]
async fn backend_reference_reaches_confirmation() {
    let submitter = CannedSubmitter::new(
        201,
        r#"{"success":true,"data":{"referenceNumber":"DRV-1234"}}"#,
    );
    let mut c = at_review(EntityKind::Driver);

    let progress = c.next_with(&submitter).await;
    assert_eq!(
        progress,
        Progress::Completed(CompletionOutcome::Confirmed {
            reference_number: "DRV-1234".to_string()
        })
    );
    assert!(c.is_confirmation());
    assert_eq!(c.current_step(), c.schema().confirmation_index());
    assert_eq!(c.state().reference_number(), Some("DRV-1234"));
}

#[tokio::test]
async fn uploaded_document_is_stored_as_data_url_and_satisfies_required() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("certificate.pdf");
    std::fs::write(&path, b"%PDF-1.4 registration certificate").expect("write");

    let mut c = EntityKind::Miner.controller();
    let docs_step = 2;
    let before = validate_step(c.schema(), docs_step, c.state().fields());
    assert!(before.contains_key("registrationCertificate"));

    c.attach_document("registrationCertificate", &path)
        .await
        .expect("attach");
    let stored = c.state().fields().text("registrationCertificate");
    assert!(stored.starts_with("data:application/pdf;base64,"), "{}", stored);

    let after = validate_step(c.schema(), docs_step, c.state().fields());
    assert!(!after.contains_key("registrationCertificate"));
}

#[test]
fn response_after_reset_is_discarded() {
    let mut c = at_review(EntityKind::Incident);
    let NextOutcome::Submit(ticket) = c.next() else {
        panic!("expected a submit ticket");
    };
    c.reset();

    let outcome = c.complete_submission(
        &ticket,
        Ok(SubmitReceipt {
            reference_number: Some("INC-LATE".to_string()),
            data: None,
        }),
    );
    assert_eq!(outcome, CompletionOutcome::Discarded);
    assert_eq!(c.current_step(), 0);
    assert!(c.state().reference_number().is_none());
    assert_eq!(c.state().submission_status(), SubmissionStatus::Idle);
}
