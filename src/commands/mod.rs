// ABOUTME: Command implementations for each maintenance utility
// ABOUTME: Exports export, patch-schema, set-admin, and inspect commands

pub mod export;
pub mod inspect;
pub mod patch_schema;
pub mod set_admin;

pub use export::export;
pub use inspect::inspect;
pub use patch_schema::patch_schema;
pub use set_admin::set_authorization;
