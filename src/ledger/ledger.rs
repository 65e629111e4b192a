use std::collections::BTreeMap;

use crate::{
    errors::{LedgerError, Operation, StorageError},
    storage::AccountStore,
};

use super::{Account, AccountId};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of a write-through save triggered by a mutation.
#[derive(Debug)]
pub enum PersistenceEvent {
    Saved,
    SaveFailed(StorageError),
}

/// What [`Ledger::load`] found in the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { accounts: usize },
    NothingStored,
}

/// Balances after a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferReceipt {
    pub sender_balance: f64,
    pub receiver_balance: f64,
}

/// In-memory account set that rewrites its backing store after every mutation.
///
/// Save failures never undo a mutation; they are queued as
/// [`PersistenceEvent::SaveFailed`] so the caller can report them.
pub struct Ledger {
    accounts: BTreeMap<AccountId, Account>,
    /// `None` once the highest representable ID has been handed out.
    next_id: Option<AccountId>,
    store: Box<dyn AccountStore>,
    events: Vec<PersistenceEvent>,
}

impl Ledger {
    pub fn new(store: Box<dyn AccountStore>) -> Self {
        Self {
            accounts: BTreeMap::new(),
            next_id: Some(0),
            store,
            events: Vec::new(),
        }
    }

    /// Creates an account with the next free ID. Any finite opening balance is
    /// accepted, negative ones included.
    pub fn add_account(
        &mut self,
        name: impl Into<String>,
        balance: f64,
    ) -> LedgerResult<AccountId> {
        if !balance.is_finite() {
            return Err(LedgerError::InvalidAmount {
                operation: Operation::Open,
                amount: balance,
            });
        }
        let id = self.next_id.ok_or(LedgerError::IdSpaceExhausted)?;
        self.accounts.insert(id, Account::new(name, balance));
        self.next_id = id.checked_add(1);
        tracing::debug!(id, balance, "account added");
        self.persist();
        Ok(id)
    }

    pub fn delete_account(&mut self, id: AccountId) -> LedgerResult<Account> {
        let removed = self
            .accounts
            .remove(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        tracing::debug!(id, "account deleted");
        self.persist();
        Ok(removed)
    }

    /// Accounts in ascending ID order.
    pub fn list_accounts(&self) -> impl Iterator<Item = (AccountId, &Account)> + '_ {
        self.accounts.iter().map(|(id, account)| (*id, account))
    }

    /// Returns the new balance.
    pub fn deposit(&mut self, id: AccountId, amount: f64) -> LedgerResult<f64> {
        ensure_positive(Operation::Deposit, amount)?;
        let account = self.account_mut(id)?;
        let balance = account.balance() + amount;
        account.set_balance(balance);
        tracing::debug!(id, amount, balance, "deposit applied");
        self.persist();
        Ok(balance)
    }

    /// Returns the new balance. Rejects withdrawals that would go below zero.
    pub fn withdraw(&mut self, id: AccountId, amount: f64) -> LedgerResult<f64> {
        ensure_positive(Operation::Withdraw, amount)?;
        let account = self.account_mut(id)?;
        let balance = account.balance() - amount;
        if balance < 0.0 {
            return Err(LedgerError::InsufficientFunds {
                id,
                balance: account.balance(),
                requested: amount,
            });
        }
        account.set_balance(balance);
        tracing::debug!(id, amount, balance, "withdrawal applied");
        self.persist();
        Ok(balance)
    }

    /// Withdraws from `sender` then deposits into `receiver`, refunding the
    /// sender when the deposit is rejected.
    pub fn transfer(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        amount: f64,
    ) -> LedgerResult<TransferReceipt> {
        let previous = self.balance(sender);
        let withdrawn = self
            .withdraw(sender, amount)
            .map_err(|source| LedgerError::TransferFailed {
                source: Box::new(source),
            })?;

        match self.deposit(receiver, amount) {
            Ok(receiver_balance) => Ok(TransferReceipt {
                sender_balance: self.balance(sender).unwrap_or(withdrawn),
                receiver_balance,
            }),
            Err(source) => {
                tracing::warn!(sender, receiver, amount, "receiver rejected transfer, refunding sender");
                match self.refund(sender, amount, previous.unwrap_or(withdrawn + amount)) {
                    Ok(_) => Err(LedgerError::TransferRefunded {
                        sender,
                        source: Box::new(source),
                    }),
                    Err(refund) => {
                        tracing::error!(sender, amount, error = %refund, "refund failed, ledger inconsistent");
                        Err(LedgerError::RefundFailed {
                            sender,
                            source: Box::new(refund),
                        })
                    }
                }
            }
        }
    }

    /// Replaces the in-memory accounts with the stored ones and recomputes the
    /// ID counter. On error the ledger is left untouched.
    pub fn load(&mut self) -> Result<LoadOutcome, StorageError> {
        match self.store.load()? {
            Some(accounts) => {
                self.next_id = match accounts.keys().next_back() {
                    Some(max) => max.checked_add(1),
                    None => Some(0),
                };
                self.accounts = accounts;
                tracing::info!(
                    source = %self.store.describe(),
                    count = self.accounts.len(),
                    next_id = ?self.next_id,
                    "accounts loaded"
                );
                Ok(LoadOutcome::Loaded {
                    accounts: self.accounts.len(),
                })
            }
            None => {
                tracing::info!(source = %self.store.describe(), "no stored accounts, starting empty");
                Ok(LoadOutcome::NothingStored)
            }
        }
    }

    /// Writes the full account set, returning the failure instead of queueing it.
    pub fn save(&self) -> Result<(), StorageError> {
        self.store.save(&self.accounts)?;
        tracing::info!(destination = %self.store.describe(), "accounts saved");
        Ok(())
    }

    /// Drains the outcomes of write-through saves since the last call.
    pub fn take_persistence_events(&mut self) -> Vec<PersistenceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn balance(&self, id: AccountId) -> Option<f64> {
        self.account(id).map(Account::balance)
    }

    pub fn accounts(&self) -> &BTreeMap<AccountId, Account> {
        &self.accounts
    }

    /// Where the backing store keeps its data, for user-facing messages.
    pub fn store_location(&self) -> String {
        self.store.describe()
    }

    /// ID the next `add_account` call will assign, if any is left.
    pub fn next_id(&self) -> Option<AccountId> {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn account_mut(&mut self, id: AccountId) -> LedgerResult<&mut Account> {
        self.accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Compensating credit for a transfer whose deposit leg failed. Restores the
    /// exact pre-withdrawal balance so float rounding cannot leak value.
    fn refund(&mut self, id: AccountId, amount: f64, previous: f64) -> LedgerResult<f64> {
        ensure_positive(Operation::Deposit, amount)?;
        self.account_mut(id)?.set_balance(previous);
        tracing::debug!(id, amount, balance = previous, "transfer refunded");
        self.persist();
        Ok(previous)
    }

    fn persist(&mut self) {
        match self.save() {
            Ok(()) => self.events.push(PersistenceEvent::Saved),
            Err(err) => {
                tracing::warn!(error = %err, "write-through save failed, keeping in-memory state");
                self.events.push(PersistenceEvent::SaveFailed(err));
            }
        }
    }
}

fn ensure_positive(operation: Operation, amount: f64) -> LedgerResult<()> {
    // NaN fails this comparison as well.
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount { operation, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, io, rc::Rc};

    /// Keeps the last saved map in memory and can be told to fail.
    #[derive(Clone, Default)]
    struct RecordingStore {
        saved: Rc<RefCell<Option<BTreeMap<AccountId, Account>>>>,
        saves: Rc<RefCell<usize>>,
        fail: Rc<RefCell<bool>>,
    }

    impl AccountStore for RecordingStore {
        fn save(&self, accounts: &BTreeMap<AccountId, Account>) -> Result<(), StorageError> {
            if *self.fail.borrow() {
                return Err(StorageError::io(
                    "accounts.json",
                    io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            *self.saves.borrow_mut() += 1;
            *self.saved.borrow_mut() = Some(accounts.clone());
            Ok(())
        }

        fn load(&self) -> Result<Option<BTreeMap<AccountId, Account>>, StorageError> {
            Ok(self.saved.borrow().clone())
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    fn ledger() -> (Ledger, RecordingStore) {
        let store = RecordingStore::default();
        (Ledger::new(Box::new(store.clone())), store)
    }

    #[test]
    fn ids_start_at_zero_and_increase() {
        let (mut ledger, _) = ledger();
        assert_eq!(ledger.add_account("Alice", 100.0).expect("add account"), 0);
        assert_eq!(ledger.add_account("Bob", 50.0).expect("add account"), 1);
        assert_eq!(ledger.add_account("Carol", 0.0).expect("add account"), 2);
        assert_eq!(ledger.next_id(), Some(3));
    }

    #[test]
    fn add_account_accepts_negative_opening_balance() {
        let (mut ledger, store) = ledger();
        let id = ledger.add_account("Overdrawn", -20.0).expect("add account");
        assert_eq!(ledger.balance(id), Some(-20.0));
        assert_eq!(*store.saves.borrow(), 1);
    }

    #[test]
    fn add_account_rejects_non_finite_opening_balance() {
        let (mut ledger, store) = ledger();
        for balance in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = ledger.add_account("Broken", balance).expect_err("not finite");
            assert!(matches!(
                err,
                LedgerError::InvalidAmount {
                    operation: Operation::Open,
                    ..
                }
            ));
        }
        assert!(ledger.is_empty());
        assert_eq!(ledger.next_id(), Some(0));
        assert_eq!(*store.saves.borrow(), 0);
    }

    #[test]
    fn highest_id_is_assigned_once_and_never_reused() {
        let store = RecordingStore::default();
        let mut stored = BTreeMap::new();
        stored.insert(0, Account::new("low", 1.0));
        stored.insert(AccountId::MAX - 1, Account::new("high", 2.0));
        *store.saved.borrow_mut() = Some(stored);

        let mut ledger = Ledger::new(Box::new(store.clone()));
        ledger.load().expect("load");
        assert_eq!(ledger.next_id(), Some(AccountId::MAX));
        assert_eq!(
            ledger.add_account("last", 3.0).expect("add account"),
            AccountId::MAX
        );
        assert_eq!(ledger.next_id(), None);

        let saves = *store.saves.borrow();
        assert_eq!(
            ledger.add_account("overflow", 4.0),
            Err(LedgerError::IdSpaceExhausted)
        );
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.account(0).map(Account::name), Some("low"));
        assert_eq!(*store.saves.borrow(), saves);
    }

    #[test]
    fn deleted_ids_are_not_reused_within_a_session() {
        let (mut ledger, _) = ledger();
        ledger.add_account("Alice", 1.0).expect("add account");
        let last = ledger.add_account("Bob", 1.0).expect("add account");
        ledger.delete_account(last).expect("delete bob");
        assert_eq!(ledger.add_account("Carol", 1.0).expect("add account"), 2);
    }

    #[test]
    fn delete_missing_account_does_not_persist() {
        let (mut ledger, store) = ledger();
        ledger.add_account("Alice", 10.0).expect("add account");
        let err = ledger.delete_account(7).expect_err("no such account");
        assert_eq!(err, LedgerError::AccountNotFound(7));
        assert_eq!(ledger.len(), 1);
        assert_eq!(*store.saves.borrow(), 1);
    }

    #[test]
    fn non_positive_and_nan_amounts_are_rejected() {
        let (mut ledger, store) = ledger();
        let id = ledger.add_account("Alice", 10.0).expect("add account");
        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ledger.deposit(id, amount),
                Err(LedgerError::InvalidAmount { operation: Operation::Deposit, .. })
            ));
            assert!(matches!(
                ledger.withdraw(id, amount),
                Err(LedgerError::InvalidAmount { operation: Operation::Withdraw, .. })
            ));
        }
        assert_eq!(ledger.balance(id), Some(10.0));
        assert_eq!(*store.saves.borrow(), 1);
    }

    #[test]
    fn amount_is_validated_before_account_lookup() {
        let (mut ledger, _) = ledger();
        assert!(matches!(
            ledger.deposit(42, -1.0),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert_eq!(ledger.deposit(42, 1.0), Err(LedgerError::AccountNotFound(42)));
    }

    #[test]
    fn deposit_into_negative_account_succeeds() {
        let (mut ledger, _) = ledger();
        let id = ledger.add_account("Overdrawn", -100.0).expect("add account");
        assert_eq!(ledger.deposit(id, 40.0), Ok(-60.0));
        assert!(matches!(
            ledger.withdraw(id, 1.0),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn refund_restores_the_exact_previous_balance() {
        let (mut ledger, _) = ledger();
        let alice = ledger.add_account("Alice", 0.3).expect("add account");
        assert!(ledger.transfer(alice, 5, 0.1).is_err());
        assert_eq!(ledger.balance(alice), Some(0.3));
    }

    #[test]
    fn withdraw_can_empty_an_account_but_not_overdraw_it() {
        let (mut ledger, _) = ledger();
        let id = ledger.add_account("Alice", 25.0).expect("add account");
        assert_eq!(
            ledger.withdraw(id, 30.0),
            Err(LedgerError::InsufficientFunds {
                id,
                balance: 25.0,
                requested: 30.0
            })
        );
        assert_eq!(ledger.withdraw(id, 25.0), Ok(0.0));
    }

    #[test]
    fn transfer_moves_funds_between_accounts() {
        let (mut ledger, store) = ledger();
        let alice = ledger.add_account("Alice", 100.0).expect("add account");
        let bob = ledger.add_account("Bob", 50.0).expect("add account");
        let receipt = ledger.transfer(alice, bob, 30.0).expect("transfer");
        assert_eq!(
            receipt,
            TransferReceipt {
                sender_balance: 70.0,
                receiver_balance: 80.0
            }
        );
        let saved = store.saved.borrow().clone().expect("saved");
        assert_eq!(saved[&alice].balance(), 70.0);
        assert_eq!(saved[&bob].balance(), 80.0);
    }

    #[test]
    fn transfer_to_missing_receiver_refunds_sender() {
        let (mut ledger, store) = ledger();
        let alice = ledger.add_account("Alice", 100.0).expect("add account");
        let err = ledger.transfer(alice, 99, 40.0).expect_err("receiver missing");
        assert_eq!(
            err,
            LedgerError::TransferRefunded {
                sender: alice,
                source: Box::new(LedgerError::AccountNotFound(99)),
            }
        );
        assert_eq!(ledger.balance(alice), Some(100.0));
        // add, withdraw, refund
        assert_eq!(*store.saves.borrow(), 3);
    }

    #[test]
    fn transfer_with_insufficient_funds_changes_nothing() {
        let (mut ledger, _) = ledger();
        let alice = ledger.add_account("Alice", 10.0).expect("add account");
        let bob = ledger.add_account("Bob", 5.0).expect("add account");
        let err = ledger.transfer(alice, bob, 11.0).expect_err("not enough funds");
        assert!(matches!(err, LedgerError::TransferFailed { .. }));
        assert_eq!(ledger.balance(alice), Some(10.0));
        assert_eq!(ledger.balance(bob), Some(5.0));
    }

    #[test]
    fn self_transfer_nets_to_zero() {
        let (mut ledger, _) = ledger();
        let alice = ledger.add_account("Alice", 10.0).expect("add account");
        let receipt = ledger.transfer(alice, alice, 4.0).expect("self transfer");
        assert_eq!(receipt.sender_balance, 10.0);
        assert_eq!(receipt.receiver_balance, 10.0);
    }

    #[test]
    fn failed_saves_keep_memory_state_and_are_reported() {
        let (mut ledger, store) = ledger();
        let id = ledger.add_account("Alice", 10.0).expect("add account");
        ledger.take_persistence_events();

        *store.fail.borrow_mut() = true;
        assert_eq!(ledger.deposit(id, 5.0), Ok(15.0));
        let events = ledger.take_persistence_events();
        assert!(matches!(
            events.as_slice(),
            [PersistenceEvent::SaveFailed(StorageError::PermissionDenied { .. })]
        ));
        assert_eq!(ledger.balance(id), Some(15.0));
        assert_eq!(store.saved.borrow().as_ref().unwrap()[&id].balance(), 10.0);
    }

    #[test]
    fn load_recomputes_next_id_from_max_key() {
        let store = RecordingStore::default();
        let mut stored = BTreeMap::new();
        for id in [0, 1, 3] {
            stored.insert(id, Account::new(format!("acct-{id}"), 1.0));
        }
        *store.saved.borrow_mut() = Some(stored);

        let mut ledger = Ledger::new(Box::new(store));
        assert!(matches!(
            ledger.load(),
            Ok(LoadOutcome::Loaded { accounts: 3 })
        ));
        assert_eq!(ledger.add_account("Dave", 0.0).expect("add account"), 4);
    }

    #[test]
    fn load_with_nothing_stored_keeps_ledger_empty() {
        let (mut ledger, _) = ledger();
        assert!(matches!(ledger.load(), Ok(LoadOutcome::NothingStored)));
        assert!(ledger.is_empty());
        assert_eq!(ledger.next_id(), Some(0));
    }

    #[test]
    fn listing_is_in_ascending_id_order() {
        let (mut ledger, _) = ledger();
        ledger.add_account("Alice", 1.0).expect("add account");
        ledger.add_account("Bob", 2.0).expect("add account");
        let listed: Vec<_> = ledger
            .list_accounts()
            .map(|(id, account)| (id, account.name().to_string(), account.balance()))
            .collect();
        assert_eq!(
            listed,
            vec![(0, "Alice".to_string(), 1.0), (1, "Bob".to_string(), 2.0)]
        );
    }
}
