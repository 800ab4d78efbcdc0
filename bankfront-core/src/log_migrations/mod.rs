//! Event log migrations, embedded at build time
//!
//! Applied in order by name. Add new files as `NNN_description.sql` and
//! list them here.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
