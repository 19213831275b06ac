use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_stark::felt::to_hex;
use starknet_ff::FieldElement;
use tracing::info;

use crate::error::RegistryError;
use crate::lock::RegistryLock;
use crate::records::{
    append_line, file_name, parse_alias, parse_key, read_lines, validate_abi_path, validate_alias,
    DeploymentRecord, Identifier,
};

/// Append-only deployments log: `<network>.deployments.txt`, one
/// `address:abi_path[:alias]` line per deployment.
///
/// The same address may appear more than once; lookups return the first
/// match.
#[derive(Debug)]
pub struct DeploymentLog {
    dir: PathBuf,
    network: String,
    path: PathBuf,
    lock_timeout: Duration,
    records: Vec<DeploymentRecord>,
    by_address: HashMap<FieldElement, usize>,
    by_alias: HashMap<String, usize>,
}

impl DeploymentLog {
    pub fn file_path(dir: &Path, network: &str) -> PathBuf {
        dir.join(format!("{network}.deployments.txt"))
    }

    pub fn load(dir: &Path, network: &str, lock_timeout: Duration) -> Result<Self, RegistryError> {
        let mut log = Self {
            dir: dir.to_path_buf(),
            network: network.to_string(),
            path: Self::file_path(dir, network),
            lock_timeout,
            records: Vec::new(),
            by_address: HashMap::new(),
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

        self.by_address.clear();
        self.by_alias.clear();
        for (i, record) in records.iter().enumerate() {
            self.by_address.entry(record.address).or_insert(i);
            if let Some(alias) = &record.alias {
                self.by_alias.entry(alias.clone()).or_insert(i);
            }
        }
        self.records = records;
        Ok(())
    }

    /// Appends a deployment. Fails with `DuplicateAlias` if the alias is
    /// already taken by another deployment on this network.
    pub fn register(
        &mut self,
        address: FieldElement,
        abi_path: &str,
        alias: Option<&str>,
    ) -> Result<DeploymentRecord, RegistryError> {
        validate_abi_path(abi_path)?;
        if let Some(alias) = alias {
            validate_alias(alias)?;
        }

        let _lock = RegistryLock::acquire(&self.dir, &self.network, self.lock_timeout)?;
        self.reload()?;

        self.check_available(abi_path, alias)?;
        let file = file_name(&self.path);

        let record = DeploymentRecord {
            address,
            abi_path: abi_path.to_string(),
            alias: alias.map(str::to_string),
        };
        append_line(&self.path, &format_line(&record))?;

        match &record.alias {
            Some(alias) => info!(network = %self.network, "registering deployment as {alias} in {file}"),
            None => info!(network = %self.network, "registering {} in {file}", to_hex(&address)),
        }

        let slot = self.records.len();
        self.by_address.entry(address).or_insert(slot);
        if let Some(alias) = &record.alias {
            self.by_alias.insert(alias.clone(), slot);
        }
        self.records.push(record.clone());
        Ok(record)
    }

    /// Fails the way [`DeploymentLog::register`] would, without writing.
    pub fn check_available(&self, abi_path: &str, alias: Option<&str>) -> Result<(), RegistryError> {
        validate_abi_path(abi_path)?;
        if let Some(alias) = alias {
            validate_alias(alias)?;
            if self.by_alias.contains_key(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.to_string(),
                    file: file_name(&self.path),
                });
            }
        }
        Ok(())
    }

    /// First deployment whose address (any numeric spelling) or alias matches.
    pub fn resolve(&self, identifier: &str) -> Option<&DeploymentRecord> {
        let slot = match Identifier::parse(identifier)? {
            Identifier::Key(address) => self.by_address.get(&address),
            Identifier::Alias(alias) => self.by_alias.get(&alias),
        };
        slot.map(|&i| &self.records[i])
    }

    pub fn exists(&self, identifier: &str) -> bool {
        self.resolve(identifier).is_some()
    }

    /// Deployments in log order.
    pub fn iter(&self) -> impl Iterator<Item = &DeploymentRecord> {
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

fn format_line(record: &DeploymentRecord) -> String {
    match &record.alias {
        Some(alias) => format!("{}:{}:{alias}", to_hex(&record.address), record.abi_path),
        None => format!("{}:{}", to_hex(&record.address), record.abi_path),
    }
}

fn parse_line(file: &str, line: usize, text: &str) -> Result<DeploymentRecord, RegistryError> {
    let parts: Vec<&str> = text.split(':').collect();
    let (address, abi_path, alias) = match parts.as_slice() {
        [address, abi_path] => (*address, *abi_path, None),
        [address, abi_path, alias] => (*address, *abi_path, Some(*alias)),
        _ => {
            return Err(RegistryError::MalformedRecord {
                file: file.to_string(),
                line,
                reason: format!("expected address:abi[:alias], got {} fields", parts.len()),
            })
        }
    };

    Ok(DeploymentRecord {
        address: parse_key(file, line, address)?,
        abi_path: abi_path.to_string(),
        alias: alias.map(|a| parse_alias(file, line, a)).transpose()?,
    })
}
