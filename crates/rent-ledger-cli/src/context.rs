use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::debug;

use rent_ledger_core::config::Settings;
use rent_ledger_core::ledger::RentLedger;
use rent_ledger_core::provider::{HttpIndexProvider, IndexProvider, StaticIndexProvider};
use rent_ledger_core::session::SessionStore;
use rent_ledger_core::store::JsonContractStore;
use rent_ledger_core::users::UserStore;
use rent_ledger_core::{RentLedgerError, RentLedgerResult};

/// Settings resolved from the config file, environment and flags.
pub struct AppContext {
    pub settings: Settings,
}

impl AppContext {
    /// Flags and environment variables override the settings file.
    pub fn from_args(
        config: Option<&Path>,
        data_dir: Option<PathBuf>,
        index_url: Option<String>,
        index_token: Option<String>,
    ) -> RentLedgerResult<Self> {
        let mut settings = Settings::load(config)?;
        if let Some(dir) = data_dir {
            settings.data_dir = dir;
        }
        if let Some(url) = index_url {
            settings.index_provider.base_url = url;
        }
        if let Some(token) = index_token {
            settings.index_provider.token = Some(token);
        }
        debug!(
            data_dir = %settings.data_dir.display(),
            index_url = %settings.index_provider.base_url,
            "settings resolved"
        );
        Ok(Self { settings })
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn ledger(&self) -> RentLedger<JsonContractStore> {
        RentLedger::new(JsonContractStore::new(self.settings.contracts_path()))
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.settings.users_path())
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.settings.session_path())
    }

    /// Username of the logged-in user.
    pub fn owner(&self) -> RentLedgerResult<String> {
        self.sessions().require()
    }

    /// Series file when given, otherwise the configured HTTP provider.
    pub fn index_provider(
        &self,
        series_file: Option<&str>,
    ) -> RentLedgerResult<Box<dyn IndexProvider>> {
        match series_file {
            Some(path) => {
                let file = crate::input::existing_file(path).map_err(RentLedgerError::Config)?;
                Ok(Box::new(StaticIndexProvider::from_json_file(&file)?))
            }
            None => Ok(Box::new(HttpIndexProvider::new(self.settings.index_provider.clone())?)),
        }
    }
}
