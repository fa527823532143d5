//! The in-progress application held by the active form session.

use thiserror::Error;

use crate::gateway::{ApplicationForm, CvPayload};
use crate::upload::FileCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    File,
    Text,
}

#[derive(Debug, Clone, Default)]
pub struct ContactFields {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Everything the candidate has entered so far. Mode switching keeps both
/// the contact fields and a previously accepted file; which payload source
/// counts is decided by `mode` alone when the form is sealed for submit.
#[derive(Debug, Clone)]
pub struct ApplicationDraft {
    pub mode: SubmissionMode,
    pub contact: ContactFields,
    pub cv_text: String,
    /// Always validated before it is stored; see `SubmissionMachine::attach_file`.
    pub attached_file: Option<FileCandidate>,
    pub consent_terms: bool,
}

impl Default for ApplicationDraft {
    fn default() -> Self {
        ApplicationDraft {
            mode: SubmissionMode::File,
            contact: ContactFields::default(),
            cv_text: String::new(),
            attached_file: None,
            consent_terms: false,
        }
    }
}

/// Guard failures, resolved locally and shown inline. None of these ever
/// reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("please accept the terms and privacy policy")]
    ConsentRequired,

    #[error("please attach your CV before submitting")]
    MissingFile,

    #[error("please tell us about yourself before submitting")]
    EmptyCvText,

    #[error("please fill in your {field}")]
    MissingContactField { field: &'static str },

    #[error(transparent)]
    File(#[from] crate::upload::FileRejection),
}

impl DraftError {
    /// Which form field the inline message belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            DraftError::ConsentRequired => "terms",
            DraftError::MissingFile | DraftError::File(_) => "cv",
            DraftError::EmptyCvText => "cvText",
            DraftError::MissingContactField { field } => field,
        }
    }
}

impl ApplicationDraft {
    /// Seals the draft into the wire form, or reports the first guard that
    /// fails. Consent is checked before anything else: without it no other
    /// field combination may trigger a network call.
    pub fn seal(&self) -> Result<ApplicationForm, DraftError> {
        if !self.consent_terms {
            return Err(DraftError::ConsentRequired);
        }

        let payload = match self.mode {
            SubmissionMode::File => {
                let file = self.attached_file.clone().ok_or(DraftError::MissingFile)?;
                CvPayload::File(file)
            }
            SubmissionMode::Text => {
                let text = self.cv_text.trim();
                if text.is_empty() {
                    return Err(DraftError::EmptyCvText);
                }
                CvPayload::Text(text.to_string())
            }
        };

        for (field, value) in [
            ("full name", &self.contact.full_name),
            ("email", &self.contact.email),
            ("phone number", &self.contact.phone_number),
        ] {
            if value.trim().is_empty() {
                return Err(DraftError::MissingContactField { field });
            }
        }

        Ok(ApplicationForm {
            payload,
            full_name: Some(self.contact.full_name.clone()),
            email: Some(self.contact.email.clone()),
            phone_number: Some(self.contact.phone_number.clone()),
            terms: self.consent_terms,
        })
    }
}
