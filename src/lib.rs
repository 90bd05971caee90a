// Library root
// -----------
// The `fizzy` binary is a thin shell over this library.
//
// Module responsibilities:
// - `api`: the Fizzy API client. Builds authenticated requests, normalizes
//   responses and errors, and implements the multi-request card operations.
// - `config`: persisted token/account settings and credential resolution.
// - `transport`: the HTTP seam the client sends requests through.
// - `models`: typed request bodies, filters and column lookup.
// - `error`: the error type shared by all of the above.
// - `cli` and `ui`: command definitions and terminal output.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod transport;
pub mod ui;

pub use api::{FizzyClient, RequestOptions, BASE_URL};
pub use config::{ConfigStore, ResolvedConfig};
pub use error::{FizzyError, FizzyResult};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
