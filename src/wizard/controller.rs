//! Submission controller.
//!
//! Owns one [`WizardState`] and moves it through the step sequence. Advancing validates the
//! current step; advancing from review re-validates everything and, when clean, hands out a
//! [`SubmitTicket`]. The host performs the network call and feeds the result back through
//! [`WizardController::complete_submission`]. Tickets carry a generation number so a
//! response that arrives after the wizard was closed or reset is discarded.

use crate::api::Submitter;
use crate::artifacts::id_card::{ArtifactRenderer, Branding, IdCardSubject};
use crate::artifacts::reference::fallback_reference;
use crate::entities::EntityKind;
use crate::error::{FieldErrors, StoreError, WizardError};
use crate::models::field::{FieldMap, FieldValue, SubRecord};
use crate::models::responses::SubmitReceipt;
use crate::models::state::{SubmissionStatus, WizardState};
use crate::utils::encoding;
use crate::utils::logging::{describe_value, mask_sensitive};
use crate::wizard::schema::{EntitySchema, FailureRecovery, FieldKind, StepKind};
use crate::wizard::store::FormStore;
use crate::wizard::validator::{first_step_with_errors, item_key, validate_all, validate_step};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Host callbacks fired after a confirmed submission.
#[derive(Clone, Default)]
pub struct WizardHooks {
    /// Ask the host to reload whatever list the new record belongs to.
    pub on_refresh: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Receives the fields exactly as submitted.
    pub on_submit: Option<Arc<dyn Fn(&FieldMap) + Send + Sync>>,
}

impl fmt::Debug for WizardHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardHooks")
            .field("on_refresh", &self.on_refresh.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .finish()
    }
}

/// One in-flight submission. Only the ticket from the latest generation is honored.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    pub generation: u64,
    pub entity: EntityKind,
    pub endpoint: &'static str,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    Advanced { to: usize },
    /// Current step has errors; the step did not change.
    Blocked { errors: FieldErrors },
    /// Review found errors on an earlier step and jumped there.
    ReviewRejected { to: usize },
    /// All steps valid; the host must submit this ticket.
    Submit(SubmitTicket),
    /// Payload could not be built; treated like a failed submission.
    SubmitAborted(WizardError),
    /// Nothing to do (in flight, or already confirmed).
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Confirmed { reference_number: String },
    Failed { error: WizardError, returned_to: usize },
    /// The ticket is stale; state untouched.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Step(NextOutcome),
    Completed(CompletionOutcome),
}

#[derive(Debug)]
pub struct WizardController {
    schema: Arc<EntitySchema>,
    state: WizardState,
    generation: u64,
    hooks: WizardHooks,
}

impl WizardController {
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        let form = FormStore::new(schema.defaults());
        Self {
            schema,
            state: WizardState::new(form),
            generation: 0,
            hooks: WizardHooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: WizardHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn current_step(&self) -> usize {
        self.state.active_step
    }

    pub fn is_review(&self) -> bool {
        self.state.active_step == self.schema.review_index()
    }

    pub fn is_confirmation(&self) -> bool {
        self.state.active_step == self.schema.confirmation_index()
    }

    /// Errors the host should paint: none until the first advance attempt.
    pub fn visible_errors(&self) -> Option<&FieldErrors> {
        if self.state.errors_visible {
            Some(self.state.form.errors())
        } else {
            None
        }
    }

    fn ensure_editable(&self) -> Result<(), StoreError> {
        if self.state.submission_status == SubmissionStatus::Submitting || self.is_confirmation() {
            return Err(StoreError::Locked);
        }
        Ok(())
    }

    // =========================
    // Field edits
    // =========================

    /// Set a top-level field. Applies the field's input transform and clears its error.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), StoreError> {
        self.ensure_editable()?;
        if self.schema.fixed_defaults.iter().any(|(n, _)| *n == name) {
            return Err(StoreError::ReadOnly(name.to_string()));
        }
        let spec = self
            .schema
            .find_field(name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))?;
        if !spec.is_editable() {
            return Err(StoreError::ReadOnly(name.to_string()));
        }
        let expected = match spec.kind {
            FieldKind::Date => "date",
            _ => "text",
        };
        let matches_kind = match (spec.kind, &value) {
            (FieldKind::Date, FieldValue::Date(_)) => true,
            (FieldKind::Text | FieldKind::Document, FieldValue::Text(_)) => true,
            _ => false,
        };
        if !matches_kind {
            return Err(StoreError::WrongKind {
                field: name.to_string(),
                expected,
            });
        }

        let value = match (spec.transform, value) {
            (Some(t), FieldValue::Text(raw)) => FieldValue::Text(t.apply(&raw)),
            (_, v) => v,
        };
        if let FieldValue::Text(text) = &value {
            // Transformed fields hold identifiers.
            let shown = if spec.transform.is_some() {
                mask_sensitive(text)
            } else {
                describe_value(text)
            };
            log::debug!(
                "[PHASE: wizard] [STEP: set_field] entity={} field={} value={}",
                self.schema.entity.as_id(),
                name,
                shown
            );
        }
        self.state.form.set_field(name, value)?;
        self.state.form.clear_error(name);
        Ok(())
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> Result<(), StoreError> {
        self.set_field(name, FieldValue::text(value))
    }

    pub fn set_date(&mut self, name: &str, value: Option<NaiveDate>) -> Result<(), StoreError> {
        self.set_field(name, FieldValue::Date(value))
    }

    /// Set one sub-field of one repeatable item.
    pub fn set_item_field(
        &mut self,
        list: &str,
        index: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.ensure_editable()?;
        let spec = self
            .schema
            .find_list(list)
            .ok_or_else(|| StoreError::UnknownField(list.to_string()))?;
        let sub = spec
            .find_field(field)
            .ok_or_else(|| StoreError::UnknownField(format!("{}.{}", list, field)))?;
        if !sub.is_editable() {
            return Err(StoreError::ReadOnly(format!("{}.{}", list, field)));
        }

        let raw = value.into();
        let value = match sub.transform {
            Some(t) => t.apply(&raw),
            None => raw,
        };
        let mut patch = BTreeMap::new();
        patch.insert(field.to_string(), value);
        self.state.form.set_repeatable_item(list, index, patch)?;
        self.state.form.clear_error(&item_key(list, index, field));
        Ok(())
    }

    /// Add a blank item where the list's schema says. Returns its index.
    pub fn add_item(&mut self, list: &str) -> Result<usize, StoreError> {
        self.add_item_with(list, |_| {})
    }

    fn add_item_with<F>(&mut self, list: &str, fill: F) -> Result<usize, StoreError>
    where
        F: FnOnce(&mut SubRecord),
    {
        self.ensure_editable()?;
        let spec = self
            .schema
            .find_list(list)
            .ok_or_else(|| StoreError::UnknownField(list.to_string()))?
            .clone();
        let index = self.state.form.add_repeatable_item(list, spec.insert_at, || {
            let mut item = spec.new_item();
            fill(&mut item);
            item
        })?;

        // Positional error keys no longer line up after a front insert.
        let prefix = format!("{}[", list);
        let stale: Vec<String> = self
            .state
            .form
            .errors()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in stale {
            self.state.form.clear_error(&key);
        }
        self.state.form.clear_error(list);
        log::debug!(
            "[PHASE: wizard] [STEP: add_item] entity={} list={} index={}",
            self.schema.entity.as_id(),
            list,
            index
        );
        Ok(index)
    }

    /// Remove an item unless that would break the list minimum. `Ok(false)` means no-op.
    pub fn remove_item(&mut self, list: &str, index: usize) -> Result<bool, StoreError> {
        self.ensure_editable()?;
        let min = self
            .schema
            .find_list(list)
            .ok_or_else(|| StoreError::UnknownField(list.to_string()))?
            .min_items;
        self.state.form.remove_repeatable_item(list, index, min)
    }

    /// Read a file from disk and store it as a data URL in a document field.
    pub async fn attach_document(&mut self, name: &str, path: &Path) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let spec = self
            .schema
            .find_field(name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))?;
        if spec.kind != FieldKind::Document {
            return Err(StoreError::ReadOnly(name.to_string()).into());
        }
        let url = encoding::file_to_data_url(path)
            .await
            .map_err(|e| WizardError::SubmissionFailed(e.user_message()))?;
        self.state.form.set_field(name, FieldValue::Text(url))?;
        self.state.form.clear_error(name);
        Ok(())
    }

    /// Attach several documents at once. Files are read concurrently; each result is
    /// applied to its own field. Returns the fields that could not be attached.
    pub async fn attach_documents(
        &mut self,
        files: Vec<(String, PathBuf)>,
    ) -> Result<BTreeMap<String, WizardError>, WizardError> {
        self.ensure_editable()?;
        for (name, _) in &files {
            let is_document = self
                .schema
                .find_field(name)
                .map(|f| f.kind == FieldKind::Document)
                .unwrap_or(false);
            if !is_document {
                return Err(StoreError::ReadOnly(name.clone()).into());
            }
        }

        let mut failed = BTreeMap::new();
        for (name, result) in encoding::files_to_data_urls(files).await {
            match result {
                Ok(url) => {
                    self.state.form.set_field(&name, FieldValue::Text(url))?;
                    self.state.form.clear_error(&name);
                }
                Err(e) => {
                    failed.insert(name, WizardError::SubmissionFailed(e.user_message()));
                }
            }
        }
        Ok(failed)
    }

    /// Same as [`attach_document`](Self::attach_document) for a document sub-field.
    pub async fn attach_item_document(
        &mut self,
        list: &str,
        index: usize,
        field: &str,
        path: &Path,
    ) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let is_document = self
            .schema
            .find_list(list)
            .and_then(|l| l.find_field(field))
            .map(|f| f.kind == FieldKind::Document)
            .unwrap_or(false);
        if !is_document {
            return Err(StoreError::ReadOnly(format!("{}.{}", list, field)).into());
        }
        let url = encoding::file_to_data_url(path)
            .await
            .map_err(|e| WizardError::SubmissionFailed(e.user_message()))?;
        self.set_item_field(list, index, field, url)?;
        Ok(())
    }

    /// Render the artifact (ID card) for one item and store it on that item.
    pub async fn render_item_artifact(
        &mut self,
        list: &str,
        index: usize,
        renderer: &dyn ArtifactRenderer,
        branding: &Branding,
    ) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let spec = self
            .schema
            .find_list(list)
            .ok_or_else(|| StoreError::UnknownField(list.to_string()))?;
        let artifact = spec
            .artifact_field()
            .ok_or_else(|| StoreError::ReadOnly(list.to_string()))?
            .name;
        let item = self
            .state
            .fields()
            .list(list)
            .get(index)
            .cloned()
            .ok_or(StoreError::IndexOutOfRange {
                list: list.to_string(),
                index,
                len: self.state.fields().list(list).len(),
            })?;

        let subject = IdCardSubject::from_item(&item, self.schema.title);
        let rendered = renderer.render(&subject, branding).await?;
        let mut patch = BTreeMap::new();
        patch.insert(artifact.to_string(), rendered.to_data_url());
        self.state.form.set_repeatable_item(list, index, patch)?;
        Ok(())
    }

    /// Add an item pre-filled from `values`, then render its artifact.
    pub async fn add_item_with_artifact(
        &mut self,
        list: &str,
        values: BTreeMap<String, String>,
        renderer: &dyn ArtifactRenderer,
        branding: &Branding,
    ) -> Result<usize, WizardError> {
        let transforms: Vec<_> = self
            .schema
            .find_list(list)
            .map(|l| l.fields.iter().map(|f| (f.name, f.transform)).collect())
            .unwrap_or_default();
        let index = self.add_item_with(list, move |item| {
            for (k, v) in values {
                let v = transforms
                    .iter()
                    .find(|(name, _)| *name == k)
                    .and_then(|(_, t)| *t)
                    .map(|t| t.apply(&v))
                    .unwrap_or(v);
                item.set(&k, v);
            }
        })?;
        self.render_item_artifact(list, index, renderer, branding).await?;
        Ok(index)
    }

    // =========================
    // Navigation
    // =========================

    pub fn next(&mut self) -> NextOutcome {
        if self.state.submission_status == SubmissionStatus::Submitting || self.is_confirmation() {
            return NextOutcome::Ignored;
        }
        self.state.errors_visible = true;

        let step = self.state.active_step;
        if step < self.schema.review_index() {
            let errors = validate_step(&self.schema, step, self.state.fields());
            if !errors.is_empty() {
                log::info!(
                    "[PHASE: wizard] [STEP: validate] entity={} step={} errors={}",
                    self.schema.entity.as_id(),
                    step,
                    errors.len()
                );
                self.state.form.replace_errors(errors.clone());
                return NextOutcome::Blocked { errors };
            }
            self.state.form.clear_errors();
            self.state.banner = None;
            self.state.active_step = step + 1;
            return NextOutcome::Advanced { to: step + 1 };
        }

        let errors = validate_all(&self.schema, self.state.fields());
        if let Some(to) = first_step_with_errors(&self.schema, &errors) {
            log::warn!(
                "[PHASE: wizard] [STEP: review] entity={} rejected, returning to step {}",
                self.schema.entity.as_id(),
                to
            );
            let rejection = WizardError::Validation(errors.clone());
            log::debug!(
                "[PHASE: wizard] [STEP: review] entity={} {}",
                self.schema.entity.as_id(),
                rejection
            );
            self.state.form.replace_errors(errors);
            self.state.active_step = to;
            self.state.banner = Some(rejection.user_message());
            return NextOutcome::ReviewRejected { to };
        }

        match (self.schema.build_payload)(self.state.fields()) {
            Ok(payload) => {
                self.generation += 1;
                self.state.submission_status = SubmissionStatus::Submitting;
                self.state.banner = None;
                log::info!(
                    "[PHASE: wizard] [STEP: submit] entity={} generation={}",
                    self.schema.entity.as_id(),
                    self.generation
                );
                NextOutcome::Submit(SubmitTicket {
                    generation: self.generation,
                    entity: self.schema.entity,
                    endpoint: self.schema.endpoint,
                    payload,
                })
            }
            Err(error) => {
                log::error!(
                    "[PHASE: wizard] [STEP: submit] entity={} payload build failed: {}",
                    self.schema.entity.as_id(),
                    error
                );
                self.fail(&error);
                NextOutcome::SubmitAborted(error)
            }
        }
    }

    pub fn back(&mut self) {
        if self.state.active_step == 0
            || self.is_confirmation()
            || self.state.submission_status == SubmissionStatus::Submitting
        {
            return;
        }
        self.state.active_step -= 1;
    }

    /// Apply the outcome of a submit call.
    pub fn complete_submission(
        &mut self,
        ticket: &SubmitTicket,
        result: Result<SubmitReceipt, WizardError>,
    ) -> CompletionOutcome {
        if ticket.generation != self.generation
            || self.state.submission_status != SubmissionStatus::Submitting
        {
            log::info!(
                "[PHASE: wizard] [STEP: complete] entity={} discarding stale response (generation {} != {}, status {})",
                ticket.entity.as_id(),
                ticket.generation,
                self.generation,
                self.state.submission_status.as_str()
            );
            return CompletionOutcome::Discarded;
        }

        match result {
            Ok(receipt) => {
                let reference_number = receipt
                    .reference_number
                    .unwrap_or_else(|| fallback_reference(self.schema.reference_prefix));
                self.state.reference_number = Some(reference_number.clone());
                self.state.submission_status = SubmissionStatus::Succeeded;
                self.state.active_step = self.schema.confirmation_index();
                self.state.banner = None;
                log::info!(
                    "[PHASE: wizard] [STEP: complete] entity={} confirmed reference={}",
                    self.schema.entity.as_id(),
                    reference_number
                );

                if let Some(on_submit) = &self.hooks.on_submit {
                    on_submit(self.state.fields());
                }
                if let Some(on_refresh) = &self.hooks.on_refresh {
                    on_refresh();
                }
                CompletionOutcome::Confirmed { reference_number }
            }
            Err(error) => {
                log::warn!(
                    "[PHASE: wizard] [STEP: complete] entity={} failed: {}",
                    self.schema.entity.as_id(),
                    error
                );
                let returned_to = self.fail(&error);
                CompletionOutcome::Failed { error, returned_to }
            }
        }
    }

    fn fail(&mut self, error: &WizardError) -> usize {
        self.state.submission_status = SubmissionStatus::Failed;
        self.state.banner = Some(error.user_message());
        self.state.active_step = match self.schema.failure_recovery {
            FailureRecovery::StayOnReview => self.schema.review_index(),
            FailureRecovery::RestartAtFirstStep => 0,
        };
        self.state.active_step
    }

    /// Advance and, if that yields a ticket, submit it and apply the result.
    pub async fn next_with(&mut self, submitter: &dyn Submitter) -> Progress {
        match self.next() {
            NextOutcome::Submit(ticket) => {
                let result = submitter.submit(&ticket).await;
                Progress::Completed(self.complete_submission(&ticket, result))
            }
            other => Progress::Step(other),
        }
    }

    /// Close the wizard. Refused while a submission is in flight; otherwise resets
    /// everything and invalidates any outstanding ticket.
    pub fn close(&mut self) -> bool {
        if self.state.submission_status == SubmissionStatus::Submitting {
            return false;
        }
        self.reset();
        true
    }

    /// Back to defaults at step 0. Outstanding tickets become stale.
    pub fn reset(&mut self) {
        self.state.reset();
        self.generation += 1;
    }

    pub fn dismiss_banner(&mut self) {
        self.state.banner = None;
    }

    /// Which kind the current step is; hosts use this to pick a layout.
    pub fn step_kind(&self) -> StepKind {
        self.schema
            .step(self.state.active_step)
            .map(|s| s.kind)
            .unwrap_or(StepKind::DataEntry)
    }
}
