// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use patchset::{Config, DbType, Resource};
use uuid::Uuid;

mod settings {
    use patchset::{Config, DbType};

    pub fn accounts() -> Config {
        Config::new(DbType::Postgres).with_change_tracking_table("AccountEvents")
    }
}

#[derive(Debug, Default)]
pub struct Handle;

#[derive(Debug, Default, Resource)]
#[resource(dialect = "postgres", rename_all = "snake_case", config = "settings::accounts")]
pub struct Account {
    pub account_id: Uuid,

    pub opened_at: DateTime<Utc>,

    #[column("Tags")]
    pub tags: Vec<String>,

    #[column(ignore)]
    pub handle: Handle
}

fn main() {
    assert_eq!(Account::resource_name(), "Account");
    assert_eq!(Account::fields().len(), 3);
    assert_eq!(Account::fields()[0].column, Some("account_id"));
    assert_eq!(Account::default_config(), Config::new(DbType::Postgres));
    assert_eq!(Account::config().change_tracking_table, "AccountEvents");
    assert!(Account::default().field_value("handle").is_none());
}
