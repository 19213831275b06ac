use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_stark::felt::to_hex;
use starknet_ff::FieldElement;
use tracing::info;

use crate::error::RegistryError;
use crate::lock::RegistryLock;
use crate::records::{
    append_line, file_name, parse_alias, parse_key, read_lines, validate_alias, DeclarationRecord,
    Identifier,
};

/// Append-only declarations log: `<network>.declarations.txt`, one
/// `class_hash[:alias]` line per declared class.
#[derive(Debug)]
pub struct DeclarationLog {
    dir: PathBuf,
    network: String,
    path: PathBuf,
    lock_timeout: Duration,
    records: Vec<DeclarationRecord>,
    by_hash: HashMap<FieldElement, usize>,
    by_alias: HashMap<String, usize>,
}

impl DeclarationLog {
    pub fn file_path(dir: &Path, network: &str) -> PathBuf {
        dir.join(format!("{network}.declarations.txt"))
    }

    pub fn load(dir: &Path, network: &str, lock_timeout: Duration) -> Result<Self, RegistryError> {
        let mut log = Self {
            dir: dir.to_path_buf(),
            network: network.to_string(),
            path: Self::file_path(dir, network),
            lock_timeout,
            records: Vec::new(),
            by_hash: HashMap::new(),
            by_alias: HashMap::new(),
        };
        log.reload()?;
        Ok(log)
    }

    fn reload(&mut self) -> Result<(), RegistryError> {
        let file = file_name(&self.path);
        let records = read_lines(&self.path)?
            .into_iter()
            .map(|(line, text)| parse_line(&file, line, &text))
            .collect::<Result<Vec<_>, _>>()?;

        self.by_hash.clear();
        self.by_alias.clear();
        for (i, record) in records.iter().enumerate() {
            self.by_hash.entry(record.class_hash).or_insert(i);
            if let Some(alias) = &record.alias {
                self.by_alias.entry(alias.clone()).or_insert(i);
            }
        }
        self.records = records;
        Ok(())
    }

    /// Appends a declaration. Class hashes and aliases are unique per
    /// network.
    pub fn register(
        &mut self,
        class_hash: FieldElement,
        alias: Option<&str>,
    ) -> Result<DeclarationRecord, RegistryError> {
        if let Some(alias) = alias {
            validate_alias(alias)?;
        }

        let _lock = RegistryLock::acquire(&self.dir, &self.network, self.lock_timeout)?;
        self.reload()?;

        self.check_available(class_hash, alias)?;
        let file = file_name(&self.path);

        let record = DeclarationRecord {
            class_hash,
            alias: alias.map(str::to_string),
        };
        let line = match &record.alias {
            Some(alias) => format!("{}:{alias}", to_hex(&class_hash)),
            None => to_hex(&class_hash),
        };
        append_line(&self.path, &line)?;
        info!(
            network = %self.network,
            "registering {} in {file}",
            record.alias.clone().unwrap_or_else(|| to_hex(&class_hash))
        );

        let slot = self.records.len();
        self.by_hash.insert(class_hash, slot);
        if let Some(alias) = &record.alias {
            self.by_alias.insert(alias.clone(), slot);
        }
        self.records.push(record.clone());
        Ok(record)
    }

    /// Declaration whose class hash (any numeric spelling) or alias matches.
    /// Fails the way [`DeclarationLog::register`] would, without writing.
    pub fn check_available(
        &self,
        class_hash: FieldElement,
        alias: Option<&str>,
    ) -> Result<(), RegistryError> {
        let file = file_name(&self.path);
        if self.by_hash.contains_key(&class_hash) {
            return Err(RegistryError::DuplicateKey {
                key: abbreviate(&to_hex(&class_hash)),
                file,
            });
        }
        if let Some(alias) = alias {
            validate_alias(alias)?;
            if self.by_alias.contains_key(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.to_string(),
                    file,
                });
            }
        }
        Ok(())
    }

    pub fn resolve(&self, identifier: &str) -> Option<&DeclarationRecord> {
        let slot = match Identifier::parse(identifier)? {
            Identifier::Key(hash) => self.by_hash.get(&hash),
            Identifier::Alias(alias) => self.by_alias.get(&alias),
        };
        slot.map(|&i| &self.records[i])
    }

    pub fn exists(&self, identifier: &str) -> bool {
        self.resolve(identifier).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclarationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Shortens long hashes to their first and last six characters.
fn abbreviate(hash: &str) -> String {
    if hash.len() > 16 {
        format!("hash {}...{}", &hash[..6], &hash[hash.len() - 6..])
    } else {
        format!("hash {hash}")
    }
}

fn parse_line(file: &str, line: usize, text: &str) -> Result<DeclarationRecord, RegistryError> {
    let parts: Vec<&str> = text.split(':').collect();
    let (class_hash, alias) = match parts.as_slice() {
        [class_hash] => (*class_hash, None),
        [class_hash, alias] => (*class_hash, Some(*alias)),
        _ => {
            return Err(RegistryError::MalformedRecord {
                file: file.to_string(),
                line,
                reason: format!("expected class_hash[:alias], got {} fields", parts.len()),
            })
        }
    };

    Ok(DeclarationRecord {
        class_hash: parse_key(file, line, class_hash)?,
        alias: alias.map(|a| parse_alias(file, line, a)).transpose()?,
    })
}
