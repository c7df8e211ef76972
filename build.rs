//! Build script emitting rebuild triggers for the embedded migrations.
//!
//! `embed_migrations!` reads the migration SQL at compile time, but Cargo
//! does not watch those files on its own. Emitting `rerun-if-changed` keeps
//! incremental builds in sync with schema changes.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
