pub mod public_forms;

pub use public_forms::PublicFormService;
