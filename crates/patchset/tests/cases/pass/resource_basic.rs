// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use patchset::{DbType, FieldDescriptor, Resource, Value};

#[derive(Debug, Default, Resource)]
#[resource(name = "Users", audit_table = "DataChangeEvents", track_changes)]
pub struct User {
    #[column("Id")]
    pub id: i64,

    #[column("Name")]
    pub name: String,

    #[column("Email")]
    pub email: Option<String>,

    #[column(skip)]
    pub display: String
}

fn main() {
    assert_eq!(User::resource_name(), "Users");
    assert_eq!(User::fields()[0], FieldDescriptor::new("id", Some("Id")));
    assert_eq!(User::fields()[3].column, None);

    let config = User::config();
    assert_eq!(config.db_type, DbType::Spanner);
    assert_eq!(config.change_tracking_table, "DataChangeEvents");
    assert!(config.track_changes);

    let user = User {
        id: 7,
        ..User::default()
    };
    assert_eq!(user.field_value("id"), Some(Value::from(7_i64)));
    assert_eq!(user.field_value("email"), Some(Value::from(None::<String>)));
    assert_eq!(user.field_value("missing"), None);
}
