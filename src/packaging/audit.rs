//! Automated check of the anonymization boundary

use super::{PackagingError, PackagingResult};
use crate::analysis::{Dimension, TenureBucket};
use crate::config::PrivacyConfig;
use crate::employee::{Employee, JobLevel, Rating};
use serde_json::Value;
use std::collections::HashSet;

/// Walk a serialized payload and fail on the first identifying key or value.
///
/// A key fails when it is on the deny list. A key or string value fails when
/// it equals the name, job title or email of any source record.
///
/// Names and titles that double as analysis vocabulary (level, rating and
/// tenure labels, dimension names, or any location or function in the
/// snapshot) are not identifying and pass. Emails always fail.
pub fn audit_payload(payload: &Value, employees: &[Employee], privacy: &PrivacyConfig) -> PackagingResult<()> {
    let identifying = identifying_values(employees);
    walk(payload, "$", &identifying, privacy)
}

fn identifying_values(employees: &[Employee]) -> HashSet<String> {
    let vocabulary = shared_vocabulary(employees);
    let mut values = HashSet::new();
    for employee in employees {
        for value in [employee.name.trim(), employee.job_title.trim()] {
            if !value.is_empty() && !vocabulary.contains(value) {
                values.insert(value.to_string());
            }
        }
        if let Some(email) = employee.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            values.insert(email.to_string());
        }
    }
    values
}

/// Strings the analyses emit as categories or labels
fn shared_vocabulary(employees: &[Employee]) -> HashSet<String> {
    let mut vocabulary = HashSet::new();
    let labels = JobLevel::ALL
        .iter()
        .map(JobLevel::label)
        .chain(Rating::ALL.iter().map(Rating::label))
        .chain(TenureBucket::ALL.iter().map(TenureBucket::label))
        .chain(Dimension::ALL.iter().map(Dimension::label));
    for label in labels {
        vocabulary.insert(label.to_string());
        vocabulary.insert(label.to_lowercase());
    }
    for employee in employees {
        vocabulary.extend(employee.location_key().map(str::to_string));
        vocabulary.extend(employee.function_key().map(str::to_string));
    }
    vocabulary
}

fn walk(value: &Value, path: &str, identifying: &HashSet<String>, privacy: &PrivacyConfig) -> PackagingResult<()> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{}.{}", path, key);
                if privacy.is_denied(key) {
                    return Err(PackagingError::IdentifyingField {
                        path: child_path,
                        key: key.clone(),
                    });
                }
                if identifying.contains(key.trim()) {
                    return Err(PackagingError::IdentifyingValue { path: child_path });
                }
                walk(child, &child_path, identifying, privacy)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{}[{}]", path, i), identifying, privacy)?;
            }
            Ok(())
        }
        Value::String(s) => {
            if identifying.contains(s.trim()) {
                Err(PackagingError::IdentifyingValue {
                    path: path.to_string(),
                })
            } else {
                Ok(())
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}
