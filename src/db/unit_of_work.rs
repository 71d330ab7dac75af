// src/db/unit_of_work.rs
// One transactional scope shared by all stores

use sqlx::{Sqlite, Transaction};

use crate::error::Result;
use crate::project::ProjectStore;
use crate::role::RoleStore;
use crate::task::TaskStore;
use crate::user::UserStore;

/// Commit persists every store's writes; dropping without commit rolls them back
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(super) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub fn users(&mut self) -> UserStore<'_> {
        UserStore::new(&mut self.tx)
    }

    pub fn projects(&mut self) -> ProjectStore<'_> {
        ProjectStore::new(&mut self.tx)
    }

    pub fn tasks(&mut self) -> TaskStore<'_> {
        TaskStore::new(&mut self.tx)
    }

    pub fn roles(&mut self) -> RoleStore<'_> {
        RoleStore::new(&mut self.tx)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
