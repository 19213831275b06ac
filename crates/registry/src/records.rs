//! Record types shared by the three stores, plus the helpers for the
//! line-oriented log files.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use chain_stark::felt::{is_alias, parse_felt, to_hex};
use serde::{Deserialize, Serialize};
use starknet_ff::FieldElement;

use crate::error::RegistryError;

/// An account known to the registry, keyed by its public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub public_key: FieldElement,
    pub address: FieldElement,
    pub index: u64,
    pub alias: Option<String>,
}

/// A deployed contract instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub address: FieldElement,
    pub abi_path: String,
    pub alias: Option<String>,
}

/// A declared contract class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRecord {
    pub class_hash: FieldElement,
    pub alias: Option<String>,
}

/// How a lookup token is matched against records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A primary key (public key, address or class hash) in any numeric
    /// spelling.
    Key(FieldElement),
    Alias(String),
}

impl Identifier {
    /// Routes `token` through the classifier. Numeric tokens that do not fit
    /// in the field match nothing and yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        if is_alias(token) {
            Some(Identifier::Alias(token.to_string()))
        } else {
            parse_felt(token).ok().map(Identifier::Key)
        }
    }
}

/// Accounts document entry, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredAccount {
    pub address: String,
    pub index: u64,
    pub alias: Option<String>,
}

impl StoredAccount {
    pub(crate) fn from_record(record: &AccountRecord) -> Self {
        Self {
            address: to_hex(&record.address),
            index: record.index,
            alias: record.alias.clone(),
        }
    }
}

/// An alias must classify as an alias and must not break the line format.
pub fn validate_alias(alias: &str) -> Result<(), RegistryError> {
    if alias.is_empty() {
        return Err(RegistryError::InvalidAlias("alias is empty".into()));
    }
    if !is_alias(alias) {
        return Err(RegistryError::InvalidAlias(format!(
            "{alias} is a number, not an alias"
        )));
    }
    if has_separator(alias) {
        return Err(RegistryError::InvalidAlias(format!(
            "{alias:?} contains ':' or a line break"
        )));
    }
    if has_outer_whitespace(alias) {
        return Err(RegistryError::InvalidAlias(format!(
            "{alias:?} has leading or trailing whitespace"
        )));
    }
    Ok(())
}

pub(crate) fn validate_abi_path(abi_path: &str) -> Result<(), RegistryError> {
    if has_separator(abi_path) {
        return Err(RegistryError::InvalidAbiPath(format!(
            "{abi_path:?} contains ':' or a line break"
        )));
    }
    if has_outer_whitespace(abi_path) {
        return Err(RegistryError::InvalidAbiPath(format!(
            "{abi_path:?} has leading or trailing whitespace"
        )));
    }
    Ok(())
}

fn has_separator(value: &str) -> bool {
    value.contains(':') || value.contains('\n') || value.contains('\r')
}

// Log lines are trimmed on read, so such values would not survive a reload.
fn has_outer_whitespace(value: &str) -> bool {
    value.trim() != value
}

pub(crate) fn parse_key(file: &str, line: usize, token: &str) -> Result<FieldElement, RegistryError> {
    parse_felt(token).map_err(|e| RegistryError::MalformedRecord {
        file: file.to_string(),
        line,
        reason: e.to_string(),
    })
}

pub(crate) fn parse_alias(file: &str, line: usize, token: &str) -> Result<String, RegistryError> {
    validate_alias(token).map_err(|e| RegistryError::MalformedRecord {
        file: file.to_string(),
        line,
        reason: e.to_string(),
    })?;
    Ok(token.to_string())
}

/// Non-empty lines of a log file with their 1-based line numbers. A missing
/// file reads as empty.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, RegistryError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    Ok(content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim().to_string()))
        .filter(|(_, line)| !line.is_empty())
        .collect())
}

/// Appends one line and flushes it to disk.
pub(crate) fn append_line(path: &Path, line: &str) -> Result<(), RegistryError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_all()?;
    Ok(())
}

/// Bare file name of a store, as shown in error messages.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
