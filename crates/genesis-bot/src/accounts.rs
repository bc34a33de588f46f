//! Accounts the runtime signs in with.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Profile of a signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AccountInfo {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: Option<String>,
}

impl AccountInfo {
    /// First and last name joined by a space.
    pub(crate) fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// One account and its session file.
#[derive(Debug)]
pub(crate) struct Account {
    session: PathBuf,
    info: OnceLock<AccountInfo>,
}

impl Account {
    pub(crate) fn new(session: PathBuf) -> Self {
        Self {
            session,
            info: OnceLock::new(),
        }
    }

    pub(crate) fn session(&self) -> &Path {
        &self.session
    }

    /// Record the profile once it is known. Later calls are ignored.
    pub(crate) fn resolve_info(&self, info: AccountInfo) -> &AccountInfo {
        self.info.get_or_init(|| info)
    }

    /// The profile, if resolved.
    pub(crate) fn info(&self) -> Option<&AccountInfo> {
        self.info.get()
    }
}

/// Session file name for the 1-based account `index`.
pub(crate) fn session_name(index: usize) -> String {
    if index > 1 {
        format!("account-{index}")
    } else {
        "account".to_string()
    }
}

/// Ordered set of accounts.
#[derive(Debug, Default)]
pub(crate) struct AccountManager {
    accounts: RwLock<Vec<Arc<Account>>>,
}

impl AccountManager {
    /// `count` accounts with sessions under `sessions_root`.
    pub(crate) fn with_sessions(sessions_root: &Path, count: usize) -> Self {
        let manager = Self::default();
        for index in 1..=count {
            manager.add(Account::new(sessions_root.join(session_name(index))));
        }
        manager
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Account>>> {
        self.accounts.read().unwrap_or_else(|e| {
            warn!("Account list lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Account>>> {
        self.accounts.write().unwrap_or_else(|e| {
            warn!("Account list lock poisoned, recovering");
            e.into_inner()
        })
    }

    pub(crate) fn add(&self, account: Account) -> Arc<Account> {
        let account = Arc::new(account);
        self.write().push(Arc::clone(&account));
        account
    }

    pub(crate) fn accounts(&self) -> Vec<Arc<Account>> {
        self.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: i64) -> AccountInfo {
        AccountInfo {
            id,
            username: format!("user{id}"),
            first_name: "Kuyu".to_string(),
            last_name: None,
        }
    }

    #[test]
    fn test_session_names() {
        let manager = AccountManager::with_sessions(Path::new("sessions"), 3);
        let sessions: Vec<_> = manager
            .accounts()
            .iter()
            .map(|a| a.session().to_path_buf())
            .collect();
        assert_eq!(
            sessions,
            vec![
                PathBuf::from("sessions/account"),
                PathBuf::from("sessions/account-2"),
                PathBuf::from("sessions/account-3"),
            ]
        );
    }

    #[test]
    fn test_info_resolves_once() {
        let account = Account::new(PathBuf::from("s"));
        assert!(account.info().is_none());
        account.resolve_info(info(1));
        account.resolve_info(info(2));
        assert_eq!(account.info().unwrap().id, 1);
    }

    #[test]
    fn test_full_name() {
        let mut profile = info(1);
        assert_eq!(profile.full_name(), "Kuyu");
        profile.last_name = Some("Genesis".to_string());
        assert_eq!(profile.full_name(), "Kuyu Genesis");
    }

    #[test]
    fn test_add_appends() {
        let manager = AccountManager::with_sessions(Path::new("s"), 1);
        let extra = manager.add(Account::new(PathBuf::from("s/extra")));
        assert_eq!(manager.len(), 2);
        assert!(Arc::ptr_eq(&manager.accounts()[1], &extra));
    }
}
