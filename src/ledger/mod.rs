//! Accounts and operations
//!
//! Business data served behind the gateway. Callers reach it only with an
//! authenticated identity; this module does no authentication of its own.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ServiceError;

/// Maximum operation description length
pub const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub account: String,
    pub description: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// Form-bound input for a new operation
#[derive(Debug, Clone, Deserialize)]
pub struct NewOperation {
    pub account: String,
    pub description: String,
    pub amount: f64,
}

impl NewOperation {
    /// Field-level checks, run before anything touches the ledger
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.account.trim().is_empty() {
            return Err(ServiceError::BadRequest("account is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(ServiceError::BadRequest("description is required".into()));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ServiceError::BadRequest(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if !self.amount.is_finite() || self.amount == 0.0 {
            return Err(ServiceError::BadRequest("amount must be a non-zero number".into()));
        }
        Ok(())
    }
}

/// Account and operation storage behind the authenticated routes
#[async_trait::async_trait]
pub trait OperationService: Send + Sync {
    async fn operations_for_account(&self, account: &str) -> Result<Vec<Operation>, ServiceError>;
    async fn accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>, ServiceError>;
    async fn save_operation(&self, operation: NewOperation) -> Result<Operation, ServiceError>;
}

/// In-memory ledger
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: DashMap<String, Account>,
    operations: DashMap<String, Vec<Operation>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_account(&self, id: &str, user_id: &str, name: &str) -> Account {
        let account = Account {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.accounts.insert(account.id.clone(), account.clone());
        account
    }
}

#[async_trait::async_trait]
impl OperationService for InMemoryLedger {
    async fn operations_for_account(&self, account: &str) -> Result<Vec<Operation>, ServiceError> {
        let mut ops = self
            .operations
            .get(account)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        ops.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(ops)
    }

    async fn accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>, ServiceError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn save_operation(&self, operation: NewOperation) -> Result<Operation, ServiceError> {
        operation.validate()?;

        let saved = Operation {
            id: Uuid::new_v4(),
            account: operation.account,
            description: operation.description,
            amount: operation.amount,
            date: Utc::now(),
        };

        self.operations
            .entry(saved.account.clone())
            .or_default()
            .push(saved.clone());

        Ok(saved)
    }
}
