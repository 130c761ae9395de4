//! Event carriers the hosting UI layer feeds into the controller. These
//! stand in for DOM events: the host copies `target.name`, `target.value`,
//! `target.checked`, and `target.files` into the matching struct.

use crate::upload::FileSource;
use crate::value::FieldValue;

#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub name: String,
    pub value: FieldValue,
}

impl ChangeEvent {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckboxEvent {
    pub name: String,
    pub checked: bool,
}

impl CheckboxEvent {
    pub fn new(name: impl Into<String>, checked: bool) -> Self {
        Self {
            name: name.into(),
            checked,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlurEvent {
    pub name: String,
    pub value: FieldValue,
}

impl BlurEvent {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug)]
pub struct UploadEvent {
    pub name: String,
    pub files: Vec<FileSource>,
}

impl UploadEvent {
    pub fn new(name: impl Into<String>, files: Vec<FileSource>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }
}

/// Prevent-default-capable submit notification.
#[derive(Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyEvent {
    pub key: String,
}

impl KeyEvent {
    pub const ENTER: &'static str = "Enter";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn is_enter(&self) -> bool {
        self.key == Self::ENTER
    }
}
