pub mod json;
pub mod markdown;
pub mod text;

use rolemap_core::types::Role;

/// Plural heading for a role collection.
pub(crate) fn role_heading(role: Role) -> &'static str {
    match role {
        Role::Controller => "Controllers",
        Role::BaseController => "Base controllers",
        Role::Page => "Pages",
        Role::Model => "Models",
        Role::Entity => "Entities",
        Role::DbContext => "Data contexts",
        Role::Migration => "Migrations",
        Role::Config => "Config files",
        Role::Service => "Services",
        Role::Program => "Entry points",
        Role::Unknown => "Unclassified",
    }
}
