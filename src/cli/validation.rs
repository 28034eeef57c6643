//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

/// Longest job group the stores accept
const MAX_GROUP_LEN: usize = 255;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate rollback steps is a positive number
pub fn validate_rollback_steps(steps_str: &str) -> Result<u32, String> {
    let steps: u32 = steps_str.parse().map_err(|_| {
        format!(
            "Rollback steps must be a valid positive number, got: '{}'",
            steps_str
        )
    })?;

    if steps == 0 {
        return Err("Rollback steps must be greater than 0".to_string());
    }

    if steps > 100 {
        return Err("Rollback steps cannot exceed 100 for safety reasons".to_string());
    }

    Ok(steps)
}

/// Validate a job group name
pub fn validate_job_group(group_str: &str) -> Result<String, String> {
    if group_str.trim().is_empty() {
        return Err("Job group cannot be empty".to_string());
    }

    if group_str.len() > MAX_GROUP_LEN {
        return Err(format!(
            "Job group is too long (maximum {} bytes)",
            MAX_GROUP_LEN
        ));
    }

    Ok(group_str.to_string())
}

/// Validate a job id as printed by `jobs list`
pub fn validate_job_id(id_str: &str) -> Result<String, String> {
    let id = id_str.trim();

    if id.is_empty() {
        return Err("Job id cannot be empty".to_string());
    }

    if id.contains(char::is_whitespace) {
        return Err(format!("Job id cannot contain whitespace: '{}'", id_str));
    }

    Ok(id.to_string())
}
