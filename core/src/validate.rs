//! Payload validation run before any mutation is dispatched.

use uuid::Uuid;

use crate::error::{ApiError, ErrorEntry, Fault};
use crate::types::{ImagePatch, ImagePost, Name, NodePatch, NodePost};

const MAX_ATTRIBUTION_LEN: usize = 192;
const MAX_SPONSOR_LEN: usize = 128;
const NAME_CLASSES: &[&str] = &[
    "citation",
    "comment",
    "operator",
    "rank",
    "scientific",
    "vernacular",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFault {
    pub field: String,
    pub message: String,
}

impl ValidationFault {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structural checks on a request payload. An empty list means valid.
pub trait Validate {
    fn validate(&self) -> Vec<ValidationFault>;
}

/// Turn validation faults into a 400 error, one entry per fault, in order.
pub fn check(faults: Vec<ValidationFault>) -> Result<(), ApiError> {
    if faults.is_empty() {
        return Ok(());
    }
    let entries = faults
        .into_iter()
        .map(|fault| {
            ErrorEntry::new("BAD_REQUEST_BODY", fault.message, "Invalid value.")
                .with_field(fault.field)
        })
        .collect();
    Err(ApiError::LocalPrecondition(Fault::new(400, entries)))
}

fn check_license(faults: &mut Vec<ValidationFault>, license: &str) {
    match url::Url::parse(license) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => faults.push(ValidationFault::new(
            "license",
            "The license must be an absolute HTTP(S) URL.",
        )),
    }
}

fn check_text(faults: &mut Vec<ValidationFault>, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        faults.push(ValidationFault::new(field, format!("The {field} cannot be blank.")));
    } else if value.chars().count() > max_len {
        faults.push(ValidationFault::new(
            field,
            format!("The {field} cannot exceed {max_len} characters."),
        ));
    }
}

fn check_uuid(faults: &mut Vec<ValidationFault>, field: &str, value: &Uuid) {
    if value.is_nil() {
        faults.push(ValidationFault::new(field, format!("The {field} cannot be the nil UUID.")));
    }
}

fn check_names(faults: &mut Vec<ValidationFault>, names: &[Name]) {
    if names.is_empty() {
        faults.push(ValidationFault::new("names", "A node must have at least one name."));
    }
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            faults.push(ValidationFault::new(format!("names[{i}]"), "A name cannot be empty."));
        }
        for (j, component) in name.iter().enumerate() {
            if !NAME_CLASSES.contains(&component.class.as_str()) {
                faults.push(ValidationFault::new(
                    format!("names[{i}][{j}].class"),
                    format!("Unknown name class: \"{}\".", component.class),
                ));
            }
            if component.text.trim().is_empty() {
                faults.push(ValidationFault::new(
                    format!("names[{i}][{j}].text"),
                    "Name text cannot be blank.",
                ));
            }
        }
    }
}

impl Validate for ImagePost {
    fn validate(&self) -> Vec<ValidationFault> {
        let mut faults = Vec::new();
        if let Some(attribution) = &self.attribution {
            check_text(&mut faults, "attribution", attribution, MAX_ATTRIBUTION_LEN);
        }
        if let Some(general) = &self.general_node {
            check_uuid(&mut faults, "generalNode", general);
        }
        check_license(&mut faults, &self.license);
        if let Some(sponsor) = &self.sponsor {
            check_text(&mut faults, "sponsor", sponsor, MAX_SPONSOR_LEN);
        }
        check_uuid(&mut faults, "specificNode", &self.specific_node);
        faults
    }
}

impl Validate for ImagePatch {
    fn validate(&self) -> Vec<ValidationFault> {
        let mut faults = Vec::new();
        if let Some(attribution) = &self.attribution {
            check_text(&mut faults, "attribution", attribution, MAX_ATTRIBUTION_LEN);
        }
        if let Some(general) = &self.general_node {
            check_uuid(&mut faults, "generalNode", general);
        }
        if let Some(license) = &self.license {
            check_license(&mut faults, license);
        }
        if let Some(sponsor) = &self.sponsor {
            check_text(&mut faults, "sponsor", sponsor, MAX_SPONSOR_LEN);
        }
        if let Some(specific) = &self.specific_node {
            check_uuid(&mut faults, "specificNode", specific);
        }
        faults
    }
}

impl Validate for NodePost {
    fn validate(&self) -> Vec<ValidationFault> {
        let mut faults = Vec::new();
        check_names(&mut faults, &self.names);
        if let Some(parent) = &self.parent {
            check_uuid(&mut faults, "parent", parent);
        }
        faults
    }
}

impl Validate for NodePatch {
    fn validate(&self) -> Vec<ValidationFault> {
        let mut faults = Vec::new();
        if let Some(names) = &self.names {
            check_names(&mut faults, names);
        }
        if let Some(parent) = &self.parent {
            check_uuid(&mut faults, "parent", parent);
        }
        faults
    }
}
