//! Declarative wizard schemas.
//!
//! An [`EntitySchema`] is everything the generic engine needs to know about one entity:
//! its ordered steps, which fields live on which step, the validator preset for each
//! field, how repeatable lists behave, and how the collected fields turn into the
//! backend payload. The engine itself has no entity-specific code.

use crate::artifacts::reference::business_id;
use crate::entities::EntityKind;
use crate::error::WizardError;
use crate::models::field::{FieldMap, FieldValue, SubRecord};
use crate::utils::validation::{Rule, Transform};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    /// Base64 data URL of an uploaded file; only presence is validated.
    Document,
    /// Generated by the engine (e.g. an ID card image); not user-editable.
    Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub rule: Option<Rule>,
    pub transform: Option<Transform>,
}

impl FieldSpec {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            rule: None,
            transform: None,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn date(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn document(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Document)
    }

    pub fn artifact(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Artifact)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn is_editable(&self) -> bool {
        self.kind != FieldKind::Artifact
    }

    fn default_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Date => FieldValue::Date(None),
            _ => FieldValue::Text(String::new()),
        }
    }
}

/// Where new repeatable items go. Entities disagree (see DESIGN.md); each schema picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemIdScheme {
    Uuid,
    /// Human-readable business id, e.g. `TM-4K9Q2Z`.
    BusinessId(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub item_label: &'static str,
    pub fields: Vec<FieldSpec>,
    pub min_items: usize,
    pub insert_at: InsertAt,
    pub id_scheme: ItemIdScheme,
}

impl ListSpec {
    pub fn new(name: &'static str, label: &'static str, item_label: &'static str) -> Self {
        Self {
            name,
            label,
            item_label,
            fields: Vec::new(),
            min_items: 0,
            insert_at: InsertAt::Back,
            id_scheme: ItemIdScheme::Uuid,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }

    pub fn insert_at(mut self, at: InsertAt) -> Self {
        self.insert_at = at;
        self
    }

    pub fn id_scheme(mut self, scheme: ItemIdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The artifact sub-field, if items carry one.
    pub fn artifact_field(&self) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.kind == FieldKind::Artifact)
    }

    /// Default-shaped item with a fresh identifier.
    pub fn new_item(&self) -> SubRecord {
        let id = match self.id_scheme {
            ItemIdScheme::Uuid => Uuid::new_v4().to_string(),
            ItemIdScheme::BusinessId(prefix) => business_id(prefix),
        };
        let names: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
        SubRecord::blank(id, &names)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepField {
    Single(FieldSpec),
    List(ListSpec),
}

impl StepField {
    pub fn name(&self) -> &'static str {
        match self {
            StepField::Single(f) => f.name,
            StepField::List(l) => l.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    DataEntry,
    Review,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub index: usize,
    pub title: &'static str,
    pub kind: StepKind,
    pub fields: Vec<StepField>,
}

impl StepDefinition {
    pub fn data_entry(title: &'static str, fields: Vec<StepField>) -> Self {
        Self {
            index: 0,
            title,
            kind: StepKind::DataEntry,
            fields,
        }
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                StepField::Single(s) if s.required => Some(s.name),
                _ => None,
            })
            .collect()
    }
}

/// What the controller does with `activeStep` when the submit call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureRecovery {
    StayOnReview,
    RestartAtFirstStep,
}

pub type PayloadBuilder = fn(&FieldMap) -> Result<Value, WizardError>;

#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub entity: EntityKind,
    pub title: &'static str,
    /// Path relative to the API base URL.
    pub endpoint: &'static str,
    pub reference_prefix: &'static str,
    pub failure_recovery: FailureRecovery,
    pub steps: Vec<StepDefinition>,
    /// Non-editable fields carried into the payload with fixed defaults.
    pub fixed_defaults: Vec<(&'static str, &'static str)>,
    pub build_payload: PayloadBuilder,
}

impl EntitySchema {
    /// Assemble a schema from its data-entry steps; review and confirmation are appended
    /// and every step gets its ordinal index.
    pub fn new(
        entity: EntityKind,
        title: &'static str,
        endpoint: &'static str,
        reference_prefix: &'static str,
        failure_recovery: FailureRecovery,
        data_steps: Vec<StepDefinition>,
        build_payload: PayloadBuilder,
    ) -> Self {
        let mut steps = data_steps;
        steps.push(StepDefinition {
            index: 0,
            title: "Review",
            kind: StepKind::Review,
            fields: Vec::new(),
        });
        steps.push(StepDefinition {
            index: 0,
            title: "Confirmation",
            kind: StepKind::Confirmation,
            fields: Vec::new(),
        });
        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
        }

        Self {
            entity,
            title,
            endpoint,
            reference_prefix,
            failure_recovery,
            steps,
            fixed_defaults: Vec::new(),
            build_payload,
        }
    }

    pub fn with_fixed_default(mut self, name: &'static str, value: &'static str) -> Self {
        self.fixed_defaults.push((name, value));
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn review_index(&self) -> usize {
        self.steps.len() - 2
    }

    pub fn confirmation_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn data_steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter().filter(|s| s.kind == StepKind::DataEntry)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.steps.iter().flat_map(|s| s.fields.iter()).find_map(|f| match f {
            StepField::Single(spec) if spec.name == name => Some(spec),
            _ => None,
        })
    }

    pub fn find_list(&self, name: &str) -> Option<&ListSpec> {
        self.steps.iter().flat_map(|s| s.fields.iter()).find_map(|f| match f {
            StepField::List(spec) if spec.name == name => Some(spec),
            _ => None,
        })
    }

    /// Step that owns a field, list, or `list[i].field` error key.
    pub fn step_of(&self, key: &str) -> Option<usize> {
        let base = key.split('[').next().unwrap_or(key);
        self.steps
            .iter()
            .find(|s| s.fields.iter().any(|f| f.name() == base))
            .map(|s| s.index)
    }

    /// The documented default shape: empty text, null dates, lists holding `min_items`
    /// blank records, plus the fixed defaults.
    pub fn defaults(&self) -> FieldMap {
        let mut map = FieldMap::new();
        for field in self.steps.iter().flat_map(|s| s.fields.iter()) {
            match field {
                StepField::Single(spec) => map.insert(spec.name, spec.default_value()),
                StepField::List(spec) => {
                    let items = (0..spec.min_items).map(|_| spec.new_item()).collect();
                    map.insert(spec.name, FieldValue::List(items));
                }
            }
        }
        for (name, value) in &self.fixed_defaults {
            map.insert(name, FieldValue::text(*value));
        }
        map
    }

    /// Structural sanity check; every built-in schema must pass.
    pub fn check_structure(&self) -> Result<(), String> {
        if self.steps.len() < 3 {
            return Err(format!("{}: needs at least one data-entry step", self.title));
        }
        if self.steps[self.review_index()].kind != StepKind::Review
            || self.steps[self.confirmation_index()].kind != StepKind::Confirmation
        {
            return Err(format!("{}: last two steps must be review + confirmation", self.title));
        }
        let mut seen = std::collections::HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            if step.index != i {
                return Err(format!("{}: step '{}' has index {}", self.title, step.title, step.index));
            }
            if i < self.review_index() && step.kind != StepKind::DataEntry {
                return Err(format!("{}: step '{}' must be data entry", self.title, step.title));
            }
            for f in &step.fields {
                if !seen.insert(f.name()) {
                    return Err(format!("{}: duplicate field '{}'", self.title, f.name()));
                }
            }
        }
        for (name, _) in &self.fixed_defaults {
            if !seen.insert(*name) {
                return Err(format!("{}: fixed default '{}' shadows a field", self.title, name));
            }
        }
        Ok(())
    }
}
