use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;

use crate::events::{BlurEvent, ChangeEvent, CheckboxEvent, KeyEvent, SubmitEvent, UploadEvent};
use crate::registry::{FormEntry, FormStore};
use crate::rules::{
    CONFIRM_PASSWORD_FIELD, CustomRules, DEFAULT_RULE_ERROR, MANDATORY_ERROR, PASSWORD_FIELD,
    Rules, resolve_rules,
};
use crate::upload::{Base64DataUrlReader, DataUrlReader};
use crate::value::{Errors, FieldValue, Valids, Validity, Values};

pub const UNNAMED_FORM: &str = "UnnamedForm";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    FileReadFailed(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::FileReadFailed(error) => write!(f, "failed to read file: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub type SubmitHandler = Arc<dyn Fn(&Values) + Send + Sync>;
pub type KeyHandler = Arc<dyn Fn(&KeyEvent) + Send + Sync>;
pub type RenderHook = Arc<dyn Fn() + Send + Sync>;

/// Static configuration for one controller. Field-name lists control when
/// validation runs and which fields opt out of refresh requests; callbacks
/// attach via the `with_*` builder methods on [`FormController`].
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub form_name: String,
    pub default_values: Values,
    pub requireds: BTreeSet<String>,
    pub bypass_validation: BTreeSet<String>,
    pub validate_on_change: BTreeSet<String>,
    pub validate_on_blur: BTreeSet<String>,
    pub validate_on_submit: Vec<String>,
    pub validate_default_values_on_mount: bool,
    pub disable_key_listener: bool,
    pub rerender_on_change: bool,
    pub rerender_on_validation: bool,
    pub rerender_on_submit: bool,
    pub disable_rerenders: BTreeSet<String>,
    pub reset_on_unmount: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            form_name: UNNAMED_FORM.to_owned(),
            default_values: Values::new(),
            requireds: BTreeSet::new(),
            bypass_validation: BTreeSet::new(),
            validate_on_change: BTreeSet::new(),
            validate_on_blur: BTreeSet::new(),
            validate_on_submit: Vec::new(),
            validate_default_values_on_mount: false,
            disable_key_listener: false,
            rerender_on_change: true,
            rerender_on_validation: true,
            rerender_on_submit: true,
            disable_rerenders: BTreeSet::new(),
            reset_on_unmount: false,
        }
    }
}

/// Form-state controller for one named form. Clones share the same registry
/// entry and render hook, so several mounted views of the same logical form
/// stay in sync through the [`FormStore`].
#[derive(Clone)]
pub struct FormController {
    options: Arc<FormOptions>,
    store: FormStore,
    on_submit: Option<SubmitHandler>,
    on_key_down: Option<KeyHandler>,
    custom_rules: Option<CustomRules>,
    reader: Arc<dyn DataUrlReader>,
    render_hook: Arc<RwLock<Option<RenderHook>>>,
}

impl FormController {
    pub fn new(store: FormStore, options: FormOptions) -> Self {
        Self {
            options: Arc::new(options),
            store,
            on_submit: None,
            on_key_down: None,
            custom_rules: None,
            reader: Arc::new(Base64DataUrlReader),
            render_hook: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_on_submit(mut self, on_submit: impl Fn(&Values) + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Arc::new(on_submit));
        self
    }

    /// Overrides global key handling entirely; without it, `Enter` submits.
    pub fn with_on_key_down(
        mut self,
        on_key_down: impl Fn(&KeyEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_key_down = Some(Arc::new(on_key_down));
        self
    }

    pub fn with_custom_rules(mut self, custom_rules: CustomRules) -> Self {
        self.custom_rules = Some(custom_rules);
        self
    }

    pub fn with_data_url_reader(mut self, reader: impl DataUrlReader + 'static) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn form_name(&self) -> &str {
        &self.options.form_name
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn key_listener_enabled(&self) -> bool {
        !self.options.disable_key_listener
    }

    // --- registry snapshots and raw setters ---

    pub fn entry(&self) -> FormResult<FormEntry> {
        self.store.entry(&self.options.form_name)
    }

    pub fn values(&self) -> FormResult<Values> {
        Ok(self.entry()?.values)
    }

    pub fn errors(&self) -> FormResult<Errors> {
        Ok(self.entry()?.errors)
    }

    pub fn valids(&self) -> FormResult<Valids> {
        Ok(self.entry()?.valids)
    }

    pub fn set_values(&self, values: Values) -> FormResult<()> {
        self.update(|entry| entry.values = values)
    }

    pub fn set_errors(&self, errors: Errors) -> FormResult<()> {
        self.update(|entry| entry.errors = errors)
    }

    pub fn set_valids(&self, valids: Valids) -> FormResult<()> {
        self.update(|entry| entry.valids = valids)
    }

    /// The resolved rule mapping: built-ins merged with custom rules against
    /// the current values.
    pub fn validation(&self) -> FormResult<Rules> {
        let values = self.values()?;
        Ok(resolve_rules(self.custom_rules.as_ref(), &values))
    }

    // --- rerender policy ---

    /// Installs the refresh callback; shared across controller clones, so a
    /// hook installed at mount time serves every instance.
    pub fn set_render_hook(&self, hook: impl Fn() + Send + Sync + 'static) -> FormResult<()> {
        let mut slot = write_lock(&self.render_hook, "installing render hook")?;
        *slot = Some(Arc::new(hook));
        Ok(())
    }

    /// Manual refresh request; bypasses all gating flags.
    pub fn rerender(&self) -> FormResult<()> {
        let hook = read_lock(&self.render_hook, "reading render hook")?.clone();
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    fn request_rerender(&self, gate: bool, field: Option<&str>) -> FormResult<()> {
        if !gate {
            return Ok(());
        }
        if let Some(field) = field {
            if self.options.disable_rerenders.contains(field) {
                return Ok(());
            }
        }
        self.rerender()
    }

    // --- validation ---

    /// Validates one field against the required list and the resolved rules.
    /// `silent` turns this into a dry run: the verdict is returned but
    /// errors/valids stay untouched. Non-silent validation of `password`
    /// resets any recorded `confirmPassword` validity, since its correctness
    /// depends on the new password.
    pub fn validate(
        &self,
        field: &str,
        value: Option<&FieldValue>,
        silent: bool,
    ) -> FormResult<bool> {
        let entry = self.entry()?;
        let empty = value.is_none_or(FieldValue::is_empty);

        if self.options.requireds.contains(field) && empty {
            if !silent {
                self.update(|entry| {
                    entry.errors.insert(field.to_owned(), MANDATORY_ERROR.to_owned());
                    entry.valids.insert(field.to_owned(), Validity::Invalid);
                    if field == PASSWORD_FIELD {
                        invalidate_confirm_password(entry);
                    }
                })?;
                self.request_rerender(self.options.rerender_on_validation, Some(field))?;
            }
            return Ok(false);
        }

        let rules = resolve_rules(self.custom_rules.as_ref(), &entry.values);
        let bypassed = self.options.bypass_validation.contains(field);
        match rules.get(field) {
            Some(rule) if !bypassed => {
                let passed = rule.test(value, &entry.values);
                if !silent {
                    let message = if rule.error().is_empty() {
                        DEFAULT_RULE_ERROR.to_owned()
                    } else {
                        rule.error().to_owned()
                    };
                    self.update(|entry| {
                        if passed {
                            entry.errors.remove(field);
                            entry.valids.insert(field.to_owned(), Validity::Valid);
                        } else {
                            entry.errors.insert(field.to_owned(), message);
                            entry.valids.insert(field.to_owned(), Validity::Invalid);
                        }
                        if field == PASSWORD_FIELD {
                            invalidate_confirm_password(entry);
                        }
                    })?;
                    self.request_rerender(self.options.rerender_on_validation, Some(field))?;
                }
                Ok(passed)
            }
            _ => {
                // No applicable rule and not a missing required value: the
                // field counts as valid, dropping any stale error, but no
                // validity is asserted.
                if !silent {
                    self.update(|entry| {
                        entry.errors.remove(field);
                        if field == PASSWORD_FIELD {
                            invalidate_confirm_password(entry);
                        }
                    })?;
                    self.request_rerender(self.options.rerender_on_validation, Some(field))?;
                }
                Ok(true)
            }
        }
    }

    /// Validates every custom-rule field and every field present in values,
    /// then enforces the required-non-empty check. `filter` (empty = no
    /// filtering) only gates which failures count toward the aggregate
    /// verdict; per-field side effects happen regardless. Returns true iff
    /// the error map is empty after merging this pass's failures, so an
    /// error recorded earlier and not cleared here keeps the verdict false.
    pub fn validate_all(&self, filter: &[String]) -> FormResult<bool> {
        let values = self.values()?;
        let rules = resolve_rules(self.custom_rules.as_ref(), &values);
        let in_scope =
            |field: &str| filter.is_empty() || filter.iter().any(|scoped| scoped == field);
        let rule_message = |field: &str| {
            rules
                .get(field)
                .map(|rule| rule.error().to_owned())
                .unwrap_or_else(|| DEFAULT_RULE_ERROR.to_owned())
        };

        let mut fresh = Errors::new();
        let custom_fields: Vec<String> = match &self.custom_rules {
            Some(custom) => custom.resolve(&values).keys().cloned().collect(),
            None => Vec::new(),
        };
        for field in &custom_fields {
            if !self.validate(field, values.get(field), false)? && in_scope(field) {
                fresh.insert(field.clone(), rule_message(field));
            }
        }
        for (field, value) in &values {
            if !self.validate(field, Some(value), false)? && in_scope(field) {
                fresh.insert(field.clone(), rule_message(field));
            }
        }
        for field in &self.options.requireds {
            if values.get(field).is_none_or(FieldValue::is_empty) {
                fresh.insert(field.clone(), MANDATORY_ERROR.to_owned());
            }
        }

        let clean = self.update(|entry| {
            entry.errors.extend(fresh);
            entry.errors.is_empty()
        })?;
        Ok(clean)
    }

    // --- event handlers ---

    pub fn handle_change(&self, event: &ChangeEvent) -> FormResult<()> {
        let ChangeEvent { name, value } = event;
        self.update(|entry| {
            entry.values.insert(name.clone(), value.clone());
        })?;
        self.validate_field_on_change(name, Some(value))?;
        if !self.options.validate_on_change.contains(name) {
            // Provisionally unknown rather than invalid until the next
            // validation pass.
            self.update(|entry| {
                entry.valids.insert(name.clone(), Validity::Unknown);
                if name == PASSWORD_FIELD {
                    invalidate_confirm_password(entry);
                }
            })?;
        }
        self.request_rerender(self.options.rerender_on_change, Some(name.as_str()))
    }

    pub fn handle_change_checkbox(&self, event: &CheckboxEvent) -> FormResult<()> {
        let value = FieldValue::Toggle(event.checked);
        self.update(|entry| {
            entry.values.insert(event.name.clone(), value.clone());
        })?;
        self.validate_field_on_change(&event.name, Some(&value))?;
        self.request_rerender(self.options.rerender_on_change, Some(event.name.as_str()))
    }

    pub fn handle_change_radio(&self, name: &str, value: FieldValue) -> FormResult<()> {
        let changed = self.update(|entry| {
            if entry.values.get(name) != Some(&value) {
                entry.values.insert(name.to_owned(), value.clone());
                true
            } else {
                false
            }
        })?;
        self.validate_field_on_change(name, Some(&value))?;
        if changed {
            self.request_rerender(self.options.rerender_on_change, Some(name))?;
        }
        Ok(())
    }

    /// Captures the final edit into values even for input types that never
    /// fired a change event, then validates unless a non-empty blur list
    /// excludes the field.
    pub fn handle_blur(&self, event: &BlurEvent) -> FormResult<()> {
        let BlurEvent { name, value } = event;
        self.update(|entry| {
            entry.values.insert(name.clone(), value.clone());
        })?;
        let enrolled = self.options.validate_on_blur.is_empty()
            || self.options.validate_on_blur.contains(name);
        if enrolled {
            let _ = self.validate(name, Some(value), false)?;
        }
        self.request_rerender(self.options.rerender_on_change, Some(name.as_str()))?;
        Ok(())
    }

    /// Decodes each selected file to a data URL through the injected reader
    /// and appends it to the array-valued field. Every completion re-reads
    /// the latest stored array before appending, so concurrent decodes in
    /// one upload cannot drop entries. Change-triggered validation runs once
    /// after all decodes settle; a failed decode skips that file.
    pub async fn handle_file_upload(&self, event: UploadEvent) -> FormResult<()> {
        let UploadEvent { name, files } = event;
        self.update(|entry| {
            if !matches!(entry.values.get(&name), Some(FieldValue::Files(_))) {
                entry.values.insert(name.clone(), FieldValue::Files(Vec::new()));
            }
        })?;

        if !files.is_empty() {
            let decodes = files
                .into_iter()
                .map(|file| self.reader.read_data_url(file));
            for result in join_all(decodes).await {
                match result {
                    Ok(url) => self.update(|entry| {
                        let slot = entry
                            .values
                            .entry(name.clone())
                            .or_insert_with(|| FieldValue::Files(Vec::new()));
                        if let FieldValue::Files(urls) = slot {
                            urls.push(url);
                        } else {
                            *slot = FieldValue::Files(vec![url]);
                        }
                    })?,
                    Err(error) => {
                        log::warn!("skipping file for field {name:?}: {error}");
                    }
                }
            }
            let current = self.values()?.get(&name).cloned();
            self.validate_field_on_change(&name, current.as_ref())?;
        }
        self.request_rerender(self.options.rerender_on_change, Some(name.as_str()))
    }

    /// Prevents default submission, validates over the submit subset, and
    /// invokes the submit callback with the current values only when
    /// validation succeeds. Returns whether the callback ran.
    pub fn handle_submit(&self, event: Option<&mut SubmitEvent>) -> FormResult<bool> {
        if let Some(event) = event {
            event.prevent_default();
        }
        let submitted = if self.validate_all(&self.options.validate_on_submit)? {
            let values = self.values()?;
            if let Some(on_submit) = &self.on_submit {
                on_submit(&values);
            }
            true
        } else {
            log::debug!(
                "submit blocked for form {:?}: validation failed",
                self.options.form_name
            );
            false
        };
        self.request_rerender(self.options.rerender_on_submit, None)?;
        Ok(submitted)
    }

    pub fn handle_key_down(&self, event: &KeyEvent) -> FormResult<()> {
        if let Some(on_key_down) = &self.on_key_down {
            on_key_down(event);
            return Ok(());
        }
        if event.is_enter() {
            let _ = self.handle_submit(None)?;
        }
        Ok(())
    }

    // --- lifecycle ---

    /// First mount for an unknown form name initializes the registry entry
    /// and requests a refresh. Supplied defaults hydrate empty values,
    /// optionally validated eagerly.
    pub fn mount(&self) -> FormResult<()> {
        let form_name = &self.options.form_name;
        if !self.store.contains(form_name)? {
            self.store.register(form_name)?;
            self.rerender()?;
        }
        let values = self.values()?;
        if values.is_empty() && !self.options.default_values.is_empty() {
            let defaults = self.options.default_values.clone();
            self.update(|entry| entry.values = defaults)?;
            if self.options.validate_default_values_on_mount {
                for (field, value) in &self.options.default_values {
                    let _ = self.validate(field, Some(value), false)?;
                }
            } else {
                self.update(|entry| entry.errors.clear())?;
            }
            self.rerender()?;
        }
        Ok(())
    }

    pub fn unmount(&self) -> FormResult<()> {
        if self.options.reset_on_unmount {
            self.store.clear(&self.options.form_name)?;
        }
        Ok(())
    }

    // --- internals ---

    fn validate_field_on_change(
        &self,
        field: &str,
        value: Option<&FieldValue>,
    ) -> FormResult<()> {
        if self.options.validate_on_change.contains(field) {
            let _ = self.validate(field, value, false)?;
        } else {
            self.update(|entry| {
                entry.errors.remove(field);
            })?;
        }
        Ok(())
    }

    fn update<R>(&self, apply: impl FnOnce(&mut FormEntry) -> R) -> FormResult<R> {
        self.store.update(&self.options.form_name, apply)
    }
}

fn invalidate_confirm_password(entry: &mut FormEntry) {
    if let Some(validity) = entry.valids.get_mut(CONFIRM_PASSWORD_FIELD) {
        *validity = Validity::Unknown;
    }
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
