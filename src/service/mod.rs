pub mod user_service;
pub mod referral_service;
pub mod access_code_service;
pub mod catalog_service;
pub mod price_service;
pub mod chain_service;
pub mod payment_service;
pub mod ad_service;
pub mod adblock_service;
pub mod moderation_service;
pub mod parental_service;
pub mod terms_service;
pub mod recording_service;
pub mod analytics_service;
pub mod risk_service;

#[cfg(test)]
pub(crate) mod tests {
    use crate::model::config::tests::test_config;
    use crate::model::config::Config;
    use crate::model::User;
    use crate::repository::Repositories;
    use crate::utils::file::file_lock_manager::FileLockManager;

    pub(crate) struct TestEnv {
        pub cfg: Config,
        pub repos: Repositories,
        _dir: tempfile::TempDir,
    }

    pub(crate) fn test_env() -> TestEnv {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(&dir.path().join("data"));
        let repos = Repositories::new(&cfg, &FileLockManager::new());
        TestEnv { cfg, repos, _dir: dir }
    }

    impl TestEnv {
        /// Hands out the parts, the directory must outlive the repositories.
        pub(crate) fn into_parts(self) -> (Config, Repositories, tempfile::TempDir) {
            (self.cfg, self.repos, self._dir)
        }
    }

    pub(crate) async fn store_user(env: &TestEnv, user: User) {
        env.repos.users.update(|users| {
            users.push(user);
            Ok(())
        }).await.unwrap();
    }

    pub(crate) async fn load_user(env: &TestEnv, id: &str) -> User {
        env.repos.users.find(|u| u.id == id).await.unwrap()
    }
}
