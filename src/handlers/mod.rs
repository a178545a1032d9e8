// handlers/mod.rs - route handlers, one file per route group
//
// Access rules are attached where routes are assembled (lib.rs), not here:
// handlers only see an identity through the CurrentUser / MaybeUser extractors.

pub mod auth;
pub mod external;
pub mod root;
pub mod stream;
pub mod users;
