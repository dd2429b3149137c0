pub mod activity;
pub mod client;
pub mod form;
pub mod submission;

pub use activity::NewActivity;
pub use client::ClientMeta;
pub use form::{Field, Form, FormSnapshot, FormStatus, PublicField, PublicForm};
pub use submission::{
    NewSubmission, NewSubmissionValue, SubmissionMetadata, SubmitRequest, SubmitResponse,
    ValidatePasswordRequest, ValidatePasswordResponse,
};
