// Form state store
//
// Holds field values and the per-field error map. Setting a value never validates;
// validation only runs when the controller is asked to move forward.

use crate::error::{FieldErrors, StoreError};
use crate::models::field::{FieldMap, FieldValue, SubRecord};
use crate::wizard::schema::InsertAt;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct FormStore {
    fields: FieldMap,
    errors: FieldErrors,
    defaults: FieldMap,
}

impl FormStore {
    pub fn new(defaults: FieldMap) -> Self {
        Self {
            fields: defaults.clone(),
            errors: FieldErrors::new(),
            defaults,
        }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn defaults(&self) -> &FieldMap {
        &self.defaults
    }

    /// Replace one field's value. The name must exist in the default shape.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), StoreError> {
        let slot = self
            .fields
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    /// Merge `patch` into the item at `index` of list `list`.
    pub fn set_repeatable_item(
        &mut self,
        list: &str,
        index: usize,
        patch: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let items = self.list_mut(list)?;
        let len = items.len();
        let item = items.get_mut(index).ok_or(StoreError::IndexOutOfRange {
            list: list.to_string(),
            index,
            len,
        })?;
        item.fields.extend(patch);
        Ok(())
    }

    /// Insert a factory-built item; returns the index it landed at.
    pub fn add_repeatable_item<F>(
        &mut self,
        list: &str,
        at: InsertAt,
        factory: F,
    ) -> Result<usize, StoreError>
    where
        F: FnOnce() -> SubRecord,
    {
        let items = self.list_mut(list)?;
        let item = factory();
        match at {
            InsertAt::Front => {
                items.insert(0, item);
                Ok(0)
            }
            InsertAt::Back => {
                items.push(item);
                Ok(items.len() - 1)
            }
        }
    }

    /// Remove the item at `index` unless that would take the list below `min_items`.
    /// Returns `Ok(false)` for the guarded no-op.
    pub fn remove_repeatable_item(
        &mut self,
        list: &str,
        index: usize,
        min_items: usize,
    ) -> Result<bool, StoreError> {
        let items = self.list_mut(list)?;
        let len = items.len();
        if index >= len {
            return Err(StoreError::IndexOutOfRange {
                list: list.to_string(),
                index,
                len,
            });
        }
        if len <= min_items {
            return Ok(false);
        }
        items.remove(index);

        // Item error keys are positional; drop this list's errors rather than shift them.
        let prefix = format!("{}[", list);
        self.errors.retain(|k, _| !k.starts_with(&prefix));
        Ok(true)
    }

    pub fn replace_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    pub fn clear_error(&mut self, key: &str) {
        self.errors.remove(key);
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Restore the entity defaults and forget all errors.
    pub fn reset(&mut self) {
        self.fields = self.defaults.clone();
        self.errors.clear();
    }

    fn list_mut(&mut self, list: &str) -> Result<&mut Vec<SubRecord>, StoreError> {
        match self.fields.get_mut(list) {
            Some(FieldValue::List(items)) => Ok(items),
            Some(_) => Err(StoreError::NotAList(list.to_string())),
            None => Err(StoreError::UnknownField(list.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FormStore {
        FormStore::new(
            FieldMap::new()
                .with("title", FieldValue::text(""))
                .with(
                    "persons",
                    FieldValue::List(vec![SubRecord::blank("p-0", &["fullName"])]),
                )
                .with("attachments", FieldValue::List(Vec::new())),
        )
    }

    fn ids(store: &FormStore, list: &str) -> Vec<String> {
        store.fields().list(list).iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn set_field_replaces_value_without_validating() {
        let mut s = store();
        s.set_field("title", FieldValue::text("x")).expect("known field");
        assert_eq!(s.fields().text("title"), "x");
        assert!(s.errors().is_empty());
    }

    #[test]
    fn set_field_rejects_unknown_name() {
        let mut s = store();
        let err = s.set_field("nope", FieldValue::text("x")).unwrap_err();
        assert_eq!(err, StoreError::UnknownField("nope".to_string()));
    }

    #[test]
    fn set_repeatable_item_merges_patch() {
        let mut s = store();
        let mut patch = BTreeMap::new();
        patch.insert("fullName".to_string(), "Rudo Chikwanha".to_string());
        patch.insert("role".to_string(), "Witness".to_string());
        s.set_repeatable_item("persons", 0, patch).expect("in range");

        let item = &s.fields().list("persons")[0];
        assert_eq!(item.get("fullName"), "Rudo Chikwanha");
        assert_eq!(item.get("role"), "Witness");
        assert_eq!(item.id, "p-0");
    }

    #[test]
    fn set_repeatable_item_out_of_range_is_an_error() {
        let mut s = store();
        let err = s
            .set_repeatable_item("persons", 3, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfRange { index: 3, len: 1, .. }));
    }

    #[test]
    fn add_respects_insertion_point() {
        let mut s = store();
        let front = s
            .add_repeatable_item("persons", InsertAt::Front, || SubRecord::blank("p-front", &[]))
            .expect("list");
        let back = s
            .add_repeatable_item("persons", InsertAt::Back, || SubRecord::blank("p-back", &[]))
            .expect("list");
        assert_eq!(front, 0);
        assert_eq!(back, 2);
        assert_eq!(ids(&s, "persons"), vec!["p-front", "p-0", "p-back"]);
    }

    #[test]
    fn add_to_non_list_field_fails() {
        let mut s = store();
        let err = s
            .add_repeatable_item("title", InsertAt::Back, || SubRecord::blank("x", &[]))
            .unwrap_err();
        assert_eq!(err, StoreError::NotAList("title".to_string()));
    }

    #[test]
    fn remove_never_goes_below_minimum() {
        let mut s = store();
        let removed = s.remove_repeatable_item("persons", 0, 1).expect("in range");
        assert!(!removed, "last person must be kept");
        assert_eq!(s.fields().list("persons").len(), 1);
    }

    #[test]
    fn remove_unguarded_list_can_empty_it() {
        let mut s = store();
        s.add_repeatable_item("attachments", InsertAt::Back, || SubRecord::blank("a-1", &[]))
            .expect("list");
        assert!(s.remove_repeatable_item("attachments", 0, 0).expect("in range"));
        assert!(s.fields().list("attachments").is_empty());
    }

    #[test]
    fn remove_drops_positional_item_errors() {
        let mut s = store();
        s.add_repeatable_item("persons", InsertAt::Back, || SubRecord::blank("p-1", &[]))
            .expect("list");
        let mut errors = FieldErrors::new();
        errors.insert("persons[1].fullName".to_string(), "Full Name is required".to_string());
        errors.insert("title".to_string(), "Title is required".to_string());
        s.replace_errors(errors);

        assert!(s.remove_repeatable_item("persons", 1, 1).expect("in range"));
        assert!(!s.errors().contains_key("persons[1].fullName"));
        assert!(s.errors().contains_key("title"));
    }

    #[test]
    fn reset_restores_defaults_exactly() {
        let mut s = store();
        s.set_field("title", FieldValue::text("Rock fall")).expect("known");
        s.add_repeatable_item("attachments", InsertAt::Back, || SubRecord::blank("a-1", &[]))
            .expect("list");
        s.replace_errors(FieldErrors::from([("title".to_string(), "x".to_string())]));

        s.reset();
        assert_eq!(s.fields(), s.defaults());
        assert!(s.errors().is_empty());
    }
}
