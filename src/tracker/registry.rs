//! Tracker-side source of truth for membership, username ownership and
//! file catalogs.
//!
//! The three collections are locked independently. Operations that touch more
//! than one of them always acquire the locks in the order
//! `sessions -> usernames -> catalogs`, and no lock is ever held across I/O.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use tokio::sync::RwLock;

use crate::utils::{Result, ShareError};

/// One connected peer, keyed in the registry by its tracker connection address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub transfer_addr: String,
}

impl Session {
    fn is_listed(&self) -> bool {
        !self.username.is_empty() && !self.transfer_addr.is_empty()
    }
}

#[derive(Default)]
pub struct Registry {
    sessions: RwLock<HashMap<SocketAddr, Session>>,
    usernames: RwLock<HashMap<String, SocketAddr>>,
    catalogs: RwLock<HashMap<String, HashSet<String>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_connection(&self, addr: SocketAddr) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(addr, Session::default());
        debug!("Session created for {} ({} active)", addr, sessions.len());
    }

    /// Binds `user` to the session at `addr`.
    ///
    /// Fails with `UsernameTaken` when another address holds the name and with
    /// `AlreadyRegisteredAs` when this session already owns a different name.
    /// Re-claiming the name the session already owns succeeds. The ownership
    /// check and both updates happen under the sessions and usernames write
    /// locks, so concurrent claims for one name have exactly one winner.
    pub async fn claim_username(&self, addr: SocketAddr, user: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let mut usernames = self.usernames.write().await;

        let session = sessions
            .get_mut(&addr)
            .ok_or(ShareError::UnknownSession(addr))?;

        if let Some(owner) = usernames.get(user) {
            if *owner != addr {
                return Err(ShareError::UsernameTaken(user.to_string()));
            }
        }

        if !session.username.is_empty() && session.username != user {
            return Err(ShareError::AlreadyRegisteredAs(session.username.clone()));
        }

        if session.username.is_empty() {
            info!("{} registered as {}", addr, user);
        }
        usernames.insert(user.to_string(), addr);
        session.username = user.to_string();
        Ok(())
    }

    /// Adds `paths` to the catalog of `user`; `addr` must own `user`.
    pub async fn register_files(&self, addr: SocketAddr, user: &str, paths: &[String]) -> Result<()> {
        let usernames = self.usernames.read().await;
        Self::ensure_owner(&usernames, addr, user)?;

        let mut catalogs = self.catalogs.write().await;
        let catalog = catalogs.entry(user.to_string()).or_default();
        for path in paths {
            catalog.insert(path.clone());
        }

        debug!("{} now shares {} files", user, catalog.len());
        Ok(())
    }

    /// Removes `paths` from the catalog of `user`. Absent paths are ignored.
    pub async fn unregister_files(&self, addr: SocketAddr, user: &str, paths: &[String]) -> Result<()> {
        let usernames = self.usernames.read().await;
        Self::ensure_owner(&usernames, addr, user)?;

        let mut catalogs = self.catalogs.write().await;
        if let Some(catalog) = catalogs.get_mut(user) {
            for path in paths {
                catalog.remove(path);
            }
            debug!("{} now shares {} files", user, catalog.len());
        }
        Ok(())
    }

    pub async fn set_transfer_address(&self, addr: SocketAddr, transfer_addr: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&addr)
            .ok_or(ShareError::UnknownSession(addr))?;

        session.transfer_addr = transfer_addr.to_string();
        debug!("{} serves transfers on {}", addr, transfer_addr);
        Ok(())
    }

    /// (username, transfer address) for every session that has both set.
    pub async fn list_members(&self) -> Vec<(String, String)> {
        let sessions = self.sessions.read().await;
        let mut members: Vec<(String, String)> = sessions
            .values()
            .filter(|session| session.is_listed())
            .map(|session| (session.username.clone(), session.transfer_addr.clone()))
            .collect();
        drop(sessions);

        members.sort();
        members
    }

    /// (username, path) across all catalogs.
    pub async fn list_catalog(&self) -> Vec<(String, String)> {
        let catalogs = self.catalogs.read().await;
        let mut entries: Vec<(String, String)> = catalogs
            .iter()
            .flat_map(|(user, paths)| paths.iter().map(move |path| (user.clone(), path.clone())))
            .collect();
        drop(catalogs);

        entries.sort();
        entries
    }

    /// Drops the session at `addr`, releases its username and deletes that
    /// username's whole catalog. A session that never claimed a name only
    /// loses its session record. Returns the removed session, if any.
    pub async fn disconnect(&self, addr: SocketAddr) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let mut usernames = self.usernames.write().await;
        let mut catalogs = self.catalogs.write().await;

        let session = sessions.remove(&addr)?;

        if !session.username.is_empty() && usernames.get(&session.username) == Some(&addr) {
            usernames.remove(&session.username);
            catalogs.remove(&session.username);
        }

        info!(
            "Session {} closed ({} active)",
            if session.username.is_empty() {
                addr.to_string()
            } else {
                format!("{} ({})", session.username, addr)
            },
            sessions.len()
        );
        Some(session)
    }

    pub async fn session(&self, addr: SocketAddr) -> Option<Session> {
        self.sessions.read().await.get(&addr).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn ensure_owner(usernames: &HashMap<String, SocketAddr>, addr: SocketAddr, user: &str) -> Result<()> {
        match usernames.get(user) {
            Some(owner) if *owner == addr => Ok(()),
            _ => Err(ShareError::NotOwner(user.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let registry = Arc::new(Registry::new());
        for port in 0..32 {
            registry.register_connection(addr(5000 + port)).await;
        }

        let mut tasks = Vec::new();
        for port in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let me = addr(5000 + port);
                let claimed = registry.claim_username(me, "alice").await;
                if claimed.is_ok() {
                    registry.register_files(me, "alice", &paths(&["mine.txt"])).await?;
                } else {
                    let loser = registry.register_files(me, "alice", &paths(&["loser.txt"])).await;
                    assert!(matches!(loser, Err(ShareError::NotOwner(_))));
                }
                claimed
            }));
        }

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => winners += 1,
                Err(ShareError::UsernameTaken(name)) => assert_eq!(name, "alice"),
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(
            registry.list_catalog().await,
            vec![("alice".to_string(), "mine.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_claim_is_idempotent_and_single_name() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;

        registry.claim_username(addr(1), "alice").await.unwrap();
        registry.claim_username(addr(1), "alice").await.unwrap();

        match registry.claim_username(addr(1), "bob").await {
            Err(ShareError::AlreadyRegisteredAs(name)) => assert_eq!(name, "alice"),
            other => panic!("expected AlreadyRegisteredAs, got {:?}", other),
        }
        assert_eq!(registry.session(addr(1)).await.unwrap().username, "alice");

        // the rejected name stays free
        registry.register_connection(addr(2)).await;
        registry.claim_username(addr(2), "bob").await.unwrap();
    }

    #[tokio::test]
    async fn test_claim_for_unknown_session() {
        let registry = Registry::new();
        assert!(matches!(
            registry.claim_username(addr(9), "alice").await,
            Err(ShareError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn test_register_same_file_twice() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.claim_username(addr(1), "u").await.unwrap();

        registry.register_files(addr(1), "u", &paths(&["a.txt"])).await.unwrap();
        registry.register_files(addr(1), "u", &paths(&["a.txt"])).await.unwrap();

        assert_eq!(
            registry.list_catalog().await,
            vec![("u".to_string(), "a.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unregister_missing_file_is_noop() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.register_connection(addr(2)).await;
        registry.claim_username(addr(1), "u").await.unwrap();
        registry.claim_username(addr(2), "v").await.unwrap();
        registry.register_files(addr(1), "u", &paths(&["a.txt"])).await.unwrap();
        registry.register_files(addr(2), "v", &paths(&["missing.txt"])).await.unwrap();

        registry
            .unregister_files(addr(1), "u", &paths(&["missing.txt"]))
            .await
            .unwrap();

        assert_eq!(
            registry.list_catalog().await,
            vec![
                ("u".to_string(), "a.txt".to_string()),
                ("v".to_string(), "missing.txt".to_string()),
            ]
        );

        registry.unregister_files(addr(1), "u", &paths(&["a.txt"])).await.unwrap();
        assert_eq!(
            registry.list_catalog().await,
            vec![("v".to_string(), "missing.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_files_require_ownership() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.register_connection(addr(2)).await;
        registry.claim_username(addr(1), "u").await.unwrap();

        assert!(matches!(
            registry.register_files(addr(2), "u", &paths(&["x"])).await,
            Err(ShareError::NotOwner(_))
        ));
        assert!(matches!(
            registry.unregister_files(addr(2), "u", &paths(&["x"])).await,
            Err(ShareError::NotOwner(_))
        ));
        assert!(registry.list_catalog().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.claim_username(addr(1), "u").await.unwrap();
        registry.set_transfer_address(addr(1), "127.0.0.1:9001").await.unwrap();
        registry.register_files(addr(1), "u", &paths(&["a", "b"])).await.unwrap();

        let removed = registry.disconnect(addr(1)).await.unwrap();
        assert_eq!(removed.username, "u");

        assert!(registry.list_catalog().await.is_empty());
        assert!(registry.list_members().await.is_empty());
        assert_eq!(registry.session_count().await, 0);

        registry.register_connection(addr(2)).await;
        registry.claim_username(addr(2), "u").await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_without_username() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.register_connection(addr(2)).await;
        registry.claim_username(addr(2), "v").await.unwrap();
        registry.register_files(addr(2), "v", &paths(&["keep"])).await.unwrap();

        let removed = registry.disconnect(addr(1)).await.unwrap();
        assert!(removed.username.is_empty());
        assert!(registry.disconnect(addr(1)).await.is_none());

        assert_eq!(
            registry.list_catalog().await,
            vec![("v".to_string(), "keep".to_string())]
        );
    }

    #[tokio::test]
    async fn test_members_need_username_and_transfer_address() {
        let registry = Registry::new();
        registry.register_connection(addr(1)).await;
        registry.register_connection(addr(2)).await;
        registry.register_connection(addr(3)).await;

        registry.claim_username(addr(1), "alice").await.unwrap();
        registry.set_transfer_address(addr(1), "127.0.0.1:9001").await.unwrap();
        registry.claim_username(addr(2), "bob").await.unwrap();
        registry.set_transfer_address(addr(3), "127.0.0.1:9003").await.unwrap();

        assert_eq!(
            registry.list_members().await,
            vec![("alice".to_string(), "127.0.0.1:9001".to_string())]
        );
    }
}
