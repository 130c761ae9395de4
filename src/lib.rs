pub mod controller;
pub mod events;
pub mod registry;
pub mod rules;
pub mod upload;
pub mod value;


pub use controller::{
    FormController, FormError, FormOptions, FormResult, KeyHandler, RenderHook, SubmitHandler,
    UNNAMED_FORM,
};
pub use events::{BlurEvent, ChangeEvent, CheckboxEvent, KeyEvent, SubmitEvent, UploadEvent};
pub use registry::{FormEntry, FormStore};
pub use rules::{
    CONFIRM_PASSWORD_FIELD, CustomRules, DEFAULT_RULE_ERROR, MANDATORY_ERROR, PASSWORD_FIELD,
    RulePredicate, Rules, ValidationRule, resolve_rules, standard_rules,
};
pub use upload::{Base64DataUrlReader, BoxedDataUrlFuture, DataUrlReader, FileSource};
pub use value::{Errors, FieldValue, Valids, Validity, Values};
