use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::controller::{FormResult, read_lock, write_lock};
use crate::value::{Errors, Valids, Values};

/// One form's denormalized state: the three parallel maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormEntry {
    pub values: Values,
    pub errors: Errors,
    pub valids: Valids,
}

/// Process-wide multi-form registry, keyed by form name. Owned by the
/// application and handed to every controller instance by reference, so
/// independently-mounted controllers for the same logical form share state.
/// The write lock serializes every read-modify-write.
#[derive(Clone, Default)]
pub struct FormStore {
    state: Arc<RwLock<BTreeMap<String, FormEntry>>>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, form_name: &str) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking form registration")?.contains_key(form_name))
    }

    /// Snapshot of a form's entry; a form with no state yet reads as empty.
    pub fn entry(&self, form_name: &str) -> FormResult<FormEntry> {
        Ok(read_lock(&self.state, "reading form entry")?
            .get(form_name)
            .cloned()
            .unwrap_or_default())
    }

    pub fn set_entry(&self, form_name: &str, entry: FormEntry) -> FormResult<()> {
        let mut state = write_lock(&self.state, "replacing form entry")?;
        state.insert(form_name.to_owned(), entry);
        Ok(())
    }

    /// Registers an empty entry for a form name. Returns true when the entry
    /// did not exist before.
    pub fn register(&self, form_name: &str) -> FormResult<bool> {
        let mut state = write_lock(&self.state, "registering form")?;
        let created = !state.contains_key(form_name);
        state.entry(form_name.to_owned()).or_default();
        if created {
            log::debug!("form registry entry created for {form_name:?}");
        }
        Ok(created)
    }

    /// Resets all three maps for a form name to empty.
    pub fn clear(&self, form_name: &str) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing form entry")?;
        state.insert(form_name.to_owned(), FormEntry::default());
        log::debug!("form registry entry cleared for {form_name:?}");
        Ok(())
    }

    pub(crate) fn update<R>(
        &self,
        form_name: &str,
        apply: impl FnOnce(&mut FormEntry) -> R,
    ) -> FormResult<R> {
        let mut state = write_lock(&self.state, "updating form entry")?;
        let entry = state.entry(form_name.to_owned()).or_default();
        Ok(apply(entry))
    }
}
