// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use patchset::{DbType, Permission, Request, Resource, ResourceSet, SearchKeys, SearchType};

#[derive(Debug, Default, Resource)]
#[resource(name = "Users")]
pub struct User {
    #[column("Id")]
    pub id: i64,

    #[column("Name")]
    pub name: String,

    #[column("Ssn")]
    pub ssn: String
}

#[derive(Request)]
pub struct UserView {
    #[request(json = "id")]
    pub id: i64,

    #[request(json = "name,omitempty", perm = "Read", substring = "NameTokens")]
    pub name: String,

    #[request(json = "-")]
    pub internal: bool
}

#[derive(Request)]
pub struct UserUpdate {
    #[request(json = "id")]
    pub id: i64,

    #[request(json = "name", perm = "Create,Update")]
    pub name: String,

    #[request(json = "ssn", perm = "Immutable")]
    pub ssn: String
}

fn main() {
    assert_eq!(UserView::request_fields().len(), 3);

    let view = ResourceSet::<User, UserView>::new(&[]).unwrap();
    assert_eq!(view.permission(), Permission::READ);

    let update = ResourceSet::<User, UserUpdate>::new(&[]).unwrap();
    assert!(update.is_immutable("ssn"));

    let keys = SearchKeys::new::<UserView>(DbType::Spanner);
    assert_eq!(keys.get("NameTokens"), Some(SearchType::Substring));
}
