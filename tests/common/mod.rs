//! In-memory hub and spoke fakes that record every call.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use managed_serviceaccount_agent::constants::{
    LABEL_IS_MANAGED_SERVICEACCOUNT, LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE,
};
use managed_serviceaccount_agent::controller::reconciler::{RefreshScheduler, TokenReconciler};
use managed_serviceaccount_agent::crd::{
    ManagedServiceAccount, ManagedServiceAccountSpec, ManagedServiceAccountStatus, Rotation,
    SecretRef,
};
use managed_serviceaccount_agent::provider::{
    ClientError, Credential, CredentialRecord, CredentialRecordStore, DeclarationStore,
    IdentityKey, Principal, SpokeIdentityApi,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CLUSTER: &str = "cluster1";
pub const MSA: &str = "msa1";
pub const SPOKE_NS: &str = "open-cluster-management-managed-serviceaccount";
pub const CA1: &[u8] = b"ca1";
pub const CA2: &[u8] = b"ca2";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
}

pub fn key() -> IdentityKey {
    IdentityKey::new(CLUSTER, MSA)
}

/// Shared, ordered log of collaborator calls
pub type ActionLog = Arc<Mutex<Vec<String>>>;

fn record(log: &ActionLog, action: &str) {
    log.lock().unwrap().push(action.to_string());
}

/// Builder for hub ManagedServiceAccounts
pub struct MsaBuilder {
    msa: ManagedServiceAccount,
}

impl MsaBuilder {
    pub fn new() -> Self {
        let mut msa = ManagedServiceAccount::new(MSA, ManagedServiceAccountSpec::default());
        msa.metadata.namespace = Some(CLUSTER.to_string());
        msa.metadata.uid = Some("uid-msa1".to_string());
        msa.metadata.resource_version = Some("1".to_string());
        Self { msa }
    }

    pub fn validity(mut self, validity: &str) -> Self {
        self.msa.spec.rotation = Rotation {
            validity: validity.to_string(),
        };
        self
    }

    pub fn token_secret_ref(mut self, expiration: DateTime<Utc>, last_refresh: DateTime<Utc>) -> Self {
        let status = self.msa.status.get_or_insert_with(ManagedServiceAccountStatus::default);
        status.token_secret_ref = Some(SecretRef {
            name: MSA.to_string(),
            last_refresh_timestamp: last_refresh.to_rfc3339(),
        });
        status.expiration_timestamp = Some(expiration.to_rfc3339());
        self
    }

    pub fn status(mut self, status: ManagedServiceAccountStatus) -> Self {
        self.msa.status = Some(status);
        self
    }

    pub fn build(self) -> ManagedServiceAccount {
        self.msa
    }
}

#[derive(Default)]
pub struct FakeDeclarations {
    pub msa: Mutex<Option<ManagedServiceAccount>>,
    pub get_error: Mutex<Option<String>>,
    /// Makes every status write fail with this message
    pub status_error: Mutex<Option<String>>,
    pub status_writes: Mutex<Vec<ManagedServiceAccountStatus>>,
    pub log: ActionLog,
}

impl FakeDeclarations {
    /// Last status the reconciler tried to write, whether or not it was stored
    pub fn last_written(&self) -> Option<ManagedServiceAccountStatus> {
        self.status_writes.lock().unwrap().last().cloned()
    }

    pub fn current_status(&self) -> ManagedServiceAccountStatus {
        self.msa
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|m| m.status.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeclarationStore for FakeDeclarations {
    async fn get(&self, key: &IdentityKey) -> Result<Option<ManagedServiceAccount>, ClientError> {
        record(&self.log, "hub:get");
        if let Some(message) = self.get_error.lock().unwrap().clone() {
            return Err(ClientError::Remote(message));
        }
        Ok(self
            .msa
            .lock()
            .unwrap()
            .clone()
            .filter(|m| m.metadata.name.as_deref() == Some(key.name.as_str())))
    }

    async fn update_status(
        &self,
        _declaration: &ManagedServiceAccount,
        status: &ManagedServiceAccountStatus,
    ) -> Result<(), ClientError> {
        record(&self.log, "hub:update_status");
        self.status_writes.lock().unwrap().push(status.clone());
        if let Some(message) = self.status_error.lock().unwrap().clone() {
            return Err(ClientError::Remote(message));
        }
        if let Some(msa) = self.msa.lock().unwrap().as_mut() {
            msa.status = Some(status.clone());
        }
        Ok(())
    }
}

pub struct FakeSpoke {
    pub principals: Mutex<BTreeMap<(String, String), Principal>>,
    /// Result of TokenReview: `Ok(accepted)` or an error message
    pub review: Mutex<Result<bool, String>>,
    /// Token handed out by TokenRequest, or an error message
    pub issue: Mutex<Result<String, String>>,
    /// Lifetime of issued tokens, counted from `now()`
    pub token_lifetime: Duration,
    pub issued_validity: Mutex<Vec<Duration>>,
    /// Makes ServiceAccount creation fail with this message
    pub create_error: Mutex<Option<String>>,
    pub trust_anchor: Vec<u8>,
    pub log: ActionLog,
}

impl FakeSpoke {
    pub fn new(log: ActionLog) -> Self {
        Self {
            principals: Mutex::new(BTreeMap::new()),
            review: Mutex::new(Ok(true)),
            issue: Mutex::new(Ok("token1".to_string())),
            token_lifetime: Duration::from_secs(500),
            issued_validity: Mutex::new(Vec::new()),
            create_error: Mutex::new(None),
            trust_anchor: CA1.to_vec(),
            log,
        }
    }

    pub fn with_principal(self, namespace: &str, managed: bool) -> Self {
        self.principals.lock().unwrap().insert(
            (namespace.to_string(), MSA.to_string()),
            Principal {
                namespace: namespace.to_string(),
                name: MSA.to_string(),
                managed,
            },
        );
        self
    }

    pub fn principal(&self, namespace: &str) -> Option<Principal> {
        self.principals
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), MSA.to_string()))
            .cloned()
    }
}

#[async_trait]
impl SpokeIdentityApi for FakeSpoke {
    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Principal>, ClientError> {
        record(&self.log, "spoke:get_principal");
        Ok(self
            .principals
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_principal(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        record(&self.log, "spoke:create_principal");
        if let Some(message) = self.create_error.lock().unwrap().clone() {
            return Err(ClientError::Remote(message));
        }
        let managed = labels
            .get(LABEL_IS_MANAGED_SERVICEACCOUNT)
            .is_some_and(|v| v == "true");
        self.principals.lock().unwrap().insert(
            (namespace.to_string(), name.to_string()),
            Principal {
                namespace: namespace.to_string(),
                name: name.to_string(),
                managed,
            },
        );
        Ok(())
    }

    async fn delete_principal(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        record(&self.log, "spoke:delete_principal");
        self.principals
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn issue_token(
        &self,
        _principal: &Principal,
        validity: Duration,
    ) -> Result<Credential, ClientError> {
        record(&self.log, "spoke:issue_token");
        self.issued_validity.lock().unwrap().push(validity);
        let token = self
            .issue
            .lock()
            .unwrap()
            .clone()
            .map_err(ClientError::Remote)?;
        Ok(Credential {
            token,
            expires_at: now() + TimeDelta::from_std(self.token_lifetime).unwrap(),
        })
    }

    async fn validate_token(&self, _token: &str) -> Result<bool, ClientError> {
        record(&self.log, "spoke:validate_token");
        self.review.lock().unwrap().clone().map_err(ClientError::Remote)
    }

    fn trust_anchor(&self) -> Vec<u8> {
        self.trust_anchor.clone()
    }
}

#[derive(Default)]
pub struct FakeRecords {
    pub records: Mutex<BTreeMap<IdentityKey, CredentialRecord>>,
    pub conflict_on_upsert: Mutex<bool>,
    /// Makes every read fail with this message
    pub get_error: Mutex<Option<String>>,
    pub log: ActionLog,
}

impl FakeRecords {
    pub fn insert(&self, record: CredentialRecord) {
        let key = IdentityKey::new(record.namespace.clone(), record.name.clone());
        self.records.lock().unwrap().insert(key, record);
    }

    pub fn get_record(&self) -> Option<CredentialRecord> {
        self.records.lock().unwrap().get(&key()).cloned()
    }
}

#[async_trait]
impl CredentialRecordStore for FakeRecords {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CredentialRecord>, ClientError> {
        record(&self.log, "records:get");
        if let Some(message) = self.get_error.lock().unwrap().clone() {
            return Err(ClientError::Remote(message));
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn upsert(&self, new: &CredentialRecord) -> Result<(), ClientError> {
        record(&self.log, "records:upsert");
        if *self.conflict_on_upsert.lock().unwrap() {
            return Err(ClientError::Conflict(
                "the object has been modified".to_string(),
            ));
        }
        let mut stored = new.clone();
        let version = stored
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        stored.resource_version = Some((version + 1).to_string());
        let key = IdentityKey::new(stored.namespace.clone(), stored.name.clone());
        self.records.lock().unwrap().insert(key, stored);
        Ok(())
    }
}

/// Hub Secret as another actor would have left it
pub fn existing_record(token: &str, ca: &[u8]) -> CredentialRecord {
    let mut record = CredentialRecord::new(&key());
    record.data.insert("token".to_string(), token.as_bytes().to_vec());
    record.data.insert("ca.crt".to_string(), ca.to_vec());
    record.resource_version = Some("10".to_string());
    record
}

pub fn existing_record_for_namespace(token: &str, ca: &[u8], namespace: &str) -> CredentialRecord {
    let mut record = existing_record(token, ca);
    record.labels.insert(
        LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE.to_string(),
        namespace.to_string(),
    );
    record
}

/// A reconciler over fresh fakes sharing one action log
pub struct Harness {
    pub declarations: Arc<FakeDeclarations>,
    pub spoke: Arc<FakeSpoke>,
    pub records: Arc<FakeRecords>,
    pub log: ActionLog,
    pub spoke_namespace: String,
}

impl Harness {
    pub fn new(msa: Option<ManagedServiceAccount>) -> Self {
        Self::with_spoke(msa, |spoke| spoke)
    }

    /// Customize the spoke fake before it is shared
    pub fn with_spoke(
        msa: Option<ManagedServiceAccount>,
        configure: impl FnOnce(FakeSpoke) -> FakeSpoke,
    ) -> Self {
        let log = ActionLog::default();
        let declarations = FakeDeclarations {
            msa: Mutex::new(msa),
            log: log.clone(),
            ..Default::default()
        };
        let records = FakeRecords {
            log: log.clone(),
            ..Default::default()
        };
        Self {
            declarations: Arc::new(declarations),
            spoke: Arc::new(configure(FakeSpoke::new(log.clone()))),
            records: Arc::new(records),
            log,
            spoke_namespace: SPOKE_NS.to_string(),
        }
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.spoke_namespace = namespace.to_string();
        self
    }

    pub fn reconciler(&self) -> TokenReconciler {
        TokenReconciler::new(
            Arc::clone(&self.declarations) as _,
            Arc::clone(&self.spoke) as _,
            Arc::clone(&self.records) as _,
            self.spoke_namespace.clone(),
            RefreshScheduler::default(),
        )
    }

    pub fn actions(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.actions().iter().filter(|a| *a == action).count()
    }

    pub fn clear_actions(&self) {
        self.log.lock().unwrap().clear();
    }
}
