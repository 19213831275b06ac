use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_stark::felt::to_hex;
use starknet_ff::FieldElement;
use tracing::info;

use crate::error::RegistryError;
use crate::lock::RegistryLock;
use crate::records::{file_name, parse_alias, parse_key, validate_alias, AccountRecord, Identifier, StoredAccount};

/// Accounts document for one network: `<network>.accounts.json`, a JSON object
/// mapping public key to `{address, index, alias}`.
#[derive(Debug)]
pub struct AccountStore {
    dir: PathBuf,
    network: String,
    path: PathBuf,
    lock_timeout: Duration,
    records: Vec<AccountRecord>,
    by_key: HashMap<FieldElement, usize>,
    by_alias: HashMap<String, usize>,
}

impl AccountStore {
    pub fn file_path(dir: &Path, network: &str) -> PathBuf {
        dir.join(format!("{network}.accounts.json"))
    }

    /// Loads the document. A missing file is an empty store.
    pub fn load(dir: &Path, network: &str, lock_timeout: Duration) -> Result<Self, RegistryError> {
        let path = Self::file_path(dir, network);
        let mut store = Self {
            dir: dir.to_path_buf(),
            network: network.to_string(),
            path,
            lock_timeout,
            records: Vec::new(),
            by_key: HashMap::new(),
            by_alias: HashMap::new(),
        };
        store.reload()?;
        Ok(store)
    }

    fn reload(&mut self) -> Result<(), RegistryError> {
        let records = read_document(&self.path)?;
        self.set_records(records);
        Ok(())
    }

    fn set_records(&mut self, mut records: Vec<AccountRecord>) {
        records.sort_by_key(|r| r.index);
        self.by_key.clear();
        self.by_alias.clear();
        for (i, record) in records.iter().enumerate() {
            self.by_key.insert(record.public_key, i);
            if let Some(alias) = &record.alias {
                self.by_alias.entry(alias.clone()).or_insert(i);
            }
        }
        self.records = records;
    }

    /// Registers an account at an explicit index.
    pub fn register(
        &mut self,
        public_key: FieldElement,
        address: FieldElement,
        index: u64,
        alias: Option<&str>,
    ) -> Result<AccountRecord, RegistryError> {
        self.locked_insert(public_key, address, alias, |_| index)
    }

    /// Registers an account at the next free index, reading the count and
    /// writing the record under one lock.
    pub fn register_next(
        &mut self,
        public_key: FieldElement,
        address: FieldElement,
        alias: Option<&str>,
    ) -> Result<AccountRecord, RegistryError> {
        self.locked_insert(public_key, address, alias, |count| count as u64)
    }

    fn locked_insert(
        &mut self,
        public_key: FieldElement,
        address: FieldElement,
        alias: Option<&str>,
        index_for: impl FnOnce(usize) -> u64,
    ) -> Result<AccountRecord, RegistryError> {
        if let Some(alias) = alias {
            validate_alias(alias)?;
        }

        let _lock = RegistryLock::acquire(&self.dir, &self.network, self.lock_timeout)?;
        self.reload()?;

        self.check_available(&public_key, alias)?;
        let file = file_name(&self.path);

        let record = AccountRecord {
            public_key,
            address,
            index: index_for(self.records.len()),
            alias: alias.map(str::to_string),
        };

        let mut records = self.records.clone();
        records.push(record.clone());
        write_document(&self.path, &records)?;
        self.set_records(records);

        info!(
            network = %self.network,
            public_key = %to_hex(&record.public_key),
            address = %to_hex(&record.address),
            index = record.index,
            "account registered in {file}"
        );
        Ok(record)
    }

    /// Looks up an account by public key (any numeric spelling) or alias.
    /// Fails the way a registration of `public_key` would, without writing.
    pub fn check_available(
        &self,
        public_key: &FieldElement,
        alias: Option<&str>,
    ) -> Result<(), RegistryError> {
        let file = file_name(&self.path);
        if self.by_key.contains_key(public_key) {
            return Err(RegistryError::DuplicateKey {
                key: to_hex(public_key),
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

    pub fn resolve(&self, identifier: &str) -> Option<&AccountRecord> {
        let slot = match Identifier::parse(identifier)? {
            Identifier::Key(key) => self.by_key.get(&key),
            Identifier::Alias(alias) => self.by_alias.get(&alias),
        };
        slot.map(|&i| &self.records[i])
    }

    pub fn get(&self, public_key: &FieldElement) -> Option<&AccountRecord> {
        self.by_key.get(public_key).map(|&i| &self.records[i])
    }

    pub fn exists(&self, identifier: &str) -> bool {
        self.resolve(identifier).is_some()
    }

    /// Number of registered accounts, used as the next index.
    pub fn next_index(&self) -> u64 {
        self.records.len() as u64
    }

    /// Accounts ordered by index.
    pub fn iter(&self) -> impl Iterator<Item = &AccountRecord> {
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

fn read_document(path: &Path) -> Result<Vec<AccountRecord>, RegistryError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file = file_name(path);
    let document: BTreeMap<String, StoredAccount> = serde_json::from_str(&json)?;
    document
        .into_iter()
        .enumerate()
        .map(|(i, (public_key, stored))| {
            // JSON objects have no line structure; report the entry position.
            let entry = i + 1;
            let alias = match stored.alias {
                Some(alias) => Some(parse_alias(&file, entry, &alias)?),
                None => None,
            };
            Ok(AccountRecord {
                public_key: parse_key(&file, entry, &public_key)?,
                address: parse_key(&file, entry, &stored.address)?,
                index: stored.index,
                alias,
            })
        })
        .collect()
}

/// Rewrites the whole document through a temp file and a rename.
fn write_document(path: &Path, records: &[AccountRecord]) -> Result<(), RegistryError> {
    let document: BTreeMap<String, StoredAccount> = records
        .iter()
        .map(|r| (to_hex(&r.public_key), StoredAccount::from_record(r)))
        .collect();
    let json = serde_json::to_string_pretty(&document)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::DEFAULT_LOCK_TIMEOUT;

    fn felt(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn open(dir: &Path) -> AccountStore {
        AccountStore::load(dir, "localhost", DEFAULT_LOCK_TIMEOUT).unwrap()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.is_empty());
        assert_eq!(store.next_index(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn register_and_resolve_by_any_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.register(felt(0x1a), felt(0x99), 0, Some("alice")).unwrap();

        assert_eq!(store.resolve("0x1a").unwrap().address, felt(0x99));
        assert_eq!(store.resolve("26").unwrap().address, felt(0x99));
        assert_eq!(store.resolve("0x001A").unwrap().address, felt(0x99));
        assert_eq!(store.resolve("alice").unwrap().public_key, felt(0x1a));
        assert!(store.exists("alice"));
        assert!(!store.exists("bob"));
        assert_eq!(store.next_index(), 1);
    }

    #[test]
    fn duplicate_key_rejected_and_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.register(felt(1), felt(10), 0, None).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let err = store.register(felt(1), felt(11), 1, None).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_alias_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.register(felt(1), felt(10), 0, Some("alice")).unwrap();
        let err = store.register(felt(2), felt(20), 1, Some("alice")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAlias { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn numeric_alias_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let err = store.register(felt(1), felt(10), 0, Some("123")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAlias(_)));
    }

    #[test]
    fn register_next_assigns_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let a = store.register_next(felt(1), felt(10), None).unwrap();
        let b = store.register_next(felt(2), felt(20), Some("second")).unwrap();
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);

        let indices: Vec<_> = store.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn records_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = open(dir.path());
            store.register_next(felt(5), felt(50), Some("alice")).unwrap();
            store.register_next(felt(6), felt(60), None).unwrap();
        }
        let store = open(dir.path());
        assert_eq!(store.len(), 2);
        assert_eq!(store.resolve("alice").unwrap().address, felt(50));
        assert_eq!(store.resolve("0x6").unwrap().index, 1);
    }

    #[test]
    fn document_uses_hex_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.register(felt(0xabc), felt(0xdef), 0, Some("alice")).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json["0xabc"]["address"], "0xdef");
        assert_eq!(json["0xabc"]["index"], 0);
        assert_eq!(json["0xabc"]["alias"], "alice");
    }

    #[test]
    fn concurrent_writer_is_seen_under_lock() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = open(dir.path());
        let mut second = open(dir.path());

        first.register_next(felt(1), felt(10), None).unwrap();
        let record = second.register_next(felt(2), felt(20), None).unwrap();
        assert_eq!(record.index, 1);

        let err = second.register_next(felt(1), felt(11), None).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey { .. }));
    }

    #[test]
    fn malformed_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = AccountStore::file_path(dir.path(), "localhost");
        fs::write(&path, r#"{"not-a-key": {"address": "0x1", "index": 0, "alias": null}}"#).unwrap();
        let err = AccountStore::load(dir.path(), "localhost", DEFAULT_LOCK_TIMEOUT).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedRecord { .. }));
    }
}
