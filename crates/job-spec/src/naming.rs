//! Resource naming: DNS-1123 job names and replica-type keys

use adapter_core::{Error, JobId, Result, TaskExecutionId};
use fnv::FnvHasher;
use regex::Regex;
use std::hash::Hasher;
use std::sync::OnceLock;

/// Longest DNS-1123 label
const MAX_LABEL_LEN: usize = 63;

/// Length of the hex execution suffix on every job name
const HASH_SUFFIX_LEN: usize = 8;

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS-1123 label pattern is valid")
    })
}

/// Validate a DNS-1123 label (role names, job names)
pub fn validate_label(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::configuration(format!("{} cannot be empty", what)));
    }
    if value.len() > MAX_LABEL_LEN {
        return Err(Error::configuration(format!(
            "{} '{}' exceeds {} characters",
            what, value, MAX_LABEL_LEN
        )));
    }
    if !label_pattern().is_match(value) {
        return Err(Error::configuration(format!(
            "{} '{}' must consist of lower case alphanumerics and '-'",
            what, value
        )));
    }
    Ok(())
}

pub(crate) fn fnv_hex(bytes: &[u8]) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    format!("{:016x}", hasher.finish())
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Job name derived from the originating task execution.
///
/// `<execution>-<node>-<attempt>-<hash>`, sanitized to a DNS-1123 label.
/// The suffix is a hash of the full execution identity (project and
/// domain included), so executions that only differ in project or domain
/// keep distinct names. Long prefixes are cut to fit 63 characters.
pub fn job_name(execution: &TaskExecutionId) -> Result<JobId> {
    if sanitize(&execution.name).is_empty() {
        return Err(Error::configuration(format!(
            "task execution '{}' has no usable name",
            execution
        )));
    }
    let base = sanitize(&format!(
        "{}-{}-{}",
        execution.name, execution.node_id, execution.retry_attempt
    ));
    let hash = fnv_hex(execution.to_string().as_bytes());

    let keep = (MAX_LABEL_LEN - HASH_SUFFIX_LEN - 1).min(base.len());
    let prefix = base[..keep].trim_end_matches('-');
    let name = format!("{}-{}", prefix, &hash[..HASH_SUFFIX_LEN]);

    validate_label(&name, "job name")?;
    Ok(name)
}

/// Replica-type key used by the operator ("master" -> "Master")
pub fn role_key(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
