//! Debt record persistence
//!
//! The calculators only need `lookup_debt`; the rest backs the CRUD
//! endpoints. Backend is chosen once at startup.

use crate::error::NavigatorError;
use crate::models::{DebtRecord, DebtTerms, NewDebt};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub mod postgres;

pub use postgres::PgDebtStore;

#[async_trait]
pub trait DebtStore: Send + Sync {
    async fn create_debt(&self, debt: NewDebt) -> Result<DebtRecord>;

    async fn list_debts(&self, user_id: i64) -> Result<Vec<DebtRecord>>;

    async fn lookup_debt(&self, debt_id: i64) -> Result<Option<DebtTerms>>;

    /// Remove every debt owned by `user_id`. False when there was nothing to remove.
    async fn delete_user(&self, user_id: i64) -> Result<bool>;
}

/// Reject records the calculators could not use
pub fn validate_new_debt(debt: &NewDebt) -> Result<()> {
    if debt.name.trim().is_empty() {
        return Err(NavigatorError::InvalidInput("Debt name must not be empty.".into()));
    }
    if !(debt.amount > 0.0) {
        return Err(NavigatorError::InvalidInput(
            "Debt amount must be greater than zero.".into(),
        ));
    }
    if !(0.0..100.0).contains(&debt.interest_rate) {
        return Err(NavigatorError::InvalidInput(
            "Interest rate must be a percentage between 0 and 100.".into(),
        ));
    }
    Ok(())
}

#[derive(Default)]
struct InMemoryState {
    next_id: i64,
    debts: BTreeMap<i64, DebtRecord>,
}

/// Process-local store, used when no database is configured
#[derive(Default)]
pub struct InMemoryDebtStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryDebtStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DebtStore for InMemoryDebtStore {
    async fn create_debt(&self, debt: NewDebt) -> Result<DebtRecord> {
        validate_new_debt(&debt)?;

        let mut state = self.state.write().await;
        state.next_id += 1;

        let record = DebtRecord {
            id: state.next_id,
            user_id: debt.user_id,
            name: debt.name,
            amount: debt.amount,
            interest_rate: debt.interest_rate,
        };
        state.debts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn list_debts(&self, user_id: i64) -> Result<Vec<DebtRecord>> {
        let state = self.state.read().await;
        Ok(state
            .debts
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn lookup_debt(&self, debt_id: i64) -> Result<Option<DebtTerms>> {
        let state = self.state.read().await;
        Ok(state.debts.get(&debt_id).map(DebtTerms::from))
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.debts.len();
        state.debts.retain(|_, d| d.user_id != user_id);
        Ok(state.debts.len() < before)
    }
}

/// Postgres when a URL is given and the pool can be created, otherwise in-memory
pub fn build_store(database_url: Option<&str>) -> Arc<dyn DebtStore> {
    if let Some(url) = database_url {
        match PgDebtStore::connect_lazy(url) {
            Ok(store) => {
                info!("Debt store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres debt store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Debt store backend: in-memory");
    Arc::new(InMemoryDebtStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn debt(user_id: i64, name: &str, amount: f64, rate: f64) -> NewDebt {
        NewDebt {
            user_id,
            name: name.to_string(),
            amount,
            interest_rate: rate,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = InMemoryDebtStore::new();

        let card = assert_ok!(store.create_debt(debt(1, "Credit card", 5000.0, 18.0)).await);
        let car = assert_ok!(store.create_debt(debt(1, "Car loan", 20000.0, 6.0)).await);
        store.create_debt(debt(2, "Mortgage", 250000.0, 7.0)).await.unwrap();

        assert_eq!(card.id, 1);
        assert_eq!(car.id, 2);

        let listed = store.list_debts(1).await.unwrap();
        assert_eq!(listed, vec![card, car]);
        assert!(store.list_debts(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_debt() {
        let store = InMemoryDebtStore::new();
        let record = store.create_debt(debt(1, "Student loan", 23980.0, 13.0)).await.unwrap();

        let terms = store.lookup_debt(record.id).await.unwrap().unwrap();
        assert_eq!(
            terms,
            DebtTerms {
                amount: 23980.0,
                interest_rate: 13.0
            }
        );
        assert!(store.lookup_debt(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = InMemoryDebtStore::new();
        store.create_debt(debt(1, "A", 100.0, 5.0)).await.unwrap();
        store.create_debt(debt(1, "B", 200.0, 5.0)).await.unwrap();
        let kept = store.create_debt(debt(2, "C", 300.0, 5.0)).await.unwrap();

        assert!(store.delete_user(1).await.unwrap());
        assert!(store.list_debts(1).await.unwrap().is_empty());
        assert_eq!(store.list_debts(2).await.unwrap(), vec![kept]);
        assert!(!store.delete_user(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_debts_rejected() {
        let store = InMemoryDebtStore::new();

        for bad in [
            debt(1, "", 100.0, 5.0),
            debt(1, "Zero", 0.0, 5.0),
            debt(1, "NaN", f64::NAN, 5.0),
            debt(1, "Rate", 100.0, 100.0),
            debt(1, "Negative rate", 100.0, -1.0),
        ] {
            let err = assert_err!(store.create_debt(bad).await);
            assert!(matches!(err, NavigatorError::InvalidInput(_)));
        }
        assert!(store.list_debts(1).await.unwrap().is_empty());
    }

    #[test]
    fn test_build_store_defaults_to_memory() {
        // No URL: must not touch the network
        let _store = build_store(None);
    }
}
