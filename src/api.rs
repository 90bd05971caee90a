// API client module: turns typed resource calls into authenticated
// requests against the Fizzy API and normalizes every failure into
// `FizzyError`. Resources are passed through as raw JSON values.
//
// Paths are either user-scoped (`/my/...`) or account-scoped
// (`/{account}/...`). Account-scoped methods run the account guard before
// building their path, so a missing account never produces a request.

use reqwest::Method;
use serde_json::Value;
use urlencoding::encode;

use crate::config::{ConfigStore, ResolvedConfig};
use crate::error::{FizzyError, FizzyResult};
use crate::models::{
    card_board_id, resolve_column, BoardPayload, CardFilters, CardPayload, CardStatus, Column,
    ColumnMatch, CommentPayload, JsonBody, TaggingPayload, TriagePayload,
};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Fixed origin every path is appended to.
pub const BASE_URL: &str = "https://app.fizzy.do";

/// Per-request knobs for [`FizzyClient::request`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Method,
    /// Already-serialized JSON.
    pub body: Option<String>,
    /// Merged over the default headers; these win on conflict.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outcome of a sub-step whose failure is deliberately not surfaced.
#[derive(Debug)]
pub enum BestEffort {
    Applied,
    Ignored(FizzyError),
}

impl BestEffort {
    fn from_result(result: FizzyResult<Value>) -> Self {
        match result {
            Ok(_) => BestEffort::Applied,
            Err(e) => BestEffort::Ignored(e),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied)
    }
}

/// What a status change did.
#[derive(Debug)]
pub enum StatusChange {
    Closed(Value),
    NotNow(Value),
    /// Both lifecycle sub-resources are retracted; either may already have
    /// been absent, which the server reports as an error we ignore.
    Published {
        reopen: BestEffort,
        unset_not_now: BestEffort,
    },
}

/// Result of moving a card by column id or name.
#[derive(Debug)]
pub struct ColumnMove {
    pub column_match: ColumnMatch,
    pub response: Value,
}

/// API client holding the transport and the credentials resolved at
/// construction. Credentials are never re-read afterwards.
pub struct FizzyClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: ResolvedConfig,
}

impl FizzyClient<ReqwestTransport> {
    /// Create a client resolving credentials from the explicit values, the
    /// environment and the default config file, in that order.
    ///
    /// Missing credentials do not fail here; they fail on first use.
    pub fn new(token: Option<String>, account_slug: Option<String>) -> FizzyResult<Self> {
        Self::from_store(token, account_slug, &ConfigStore::default_location())
    }

    pub fn from_store(
        token: Option<String>,
        account_slug: Option<String>,
        store: &ConfigStore,
    ) -> FizzyResult<Self> {
        let config = ResolvedConfig::load(token, account_slug, store)?;
        Ok(Self::with_transport(ReqwestTransport::new()?, config))
    }
}

impl<T: Transport> FizzyClient<T> {
    pub fn with_transport(transport: T, config: ResolvedConfig) -> Self {
        Self { transport, config }
    }

    /// Send one request to `BASE_URL` + `path`.
    ///
    /// Returns `Value::Null` for 204 responses and for empty bodies;
    /// otherwise the parsed JSON body. Non-2xx responses become
    /// `FizzyError::Request` with the body text untouched.
    pub fn request(&self, path: &str, options: RequestOptions) -> FizzyResult<Value> {
        // Every request needs a token, including the user-scoped ones
        let token = self.config.require_token()?;

        let request = HttpRequest {
            method: options.method,
            url: format!("{}{}", BASE_URL, path),
            headers: merge_headers(token, options.headers),
            body: options.body,
        };
        let res = self.transport.execute(request)?;

        // Error bodies are passed through untouched, even when empty
        if !(200..300).contains(&res.status) {
            return Err(FizzyError::request(res.status, res.body));
        }
        if res.status == 204 || res.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&res.body).map_err(FizzyError::InvalidResponse)
    }

    /// Fails with a configuration error when no account slug is resolved.
    pub fn require_account(&self) -> FizzyResult<&str> {
        self.config.require_account()
    }

    fn account_path(&self, suffix: &str) -> FizzyResult<String> {
        let account = self.require_account()?;
        Ok(format!("/{}{}", encode(account), suffix))
    }

    fn get(&self, path: &str) -> FizzyResult<Value> {
        self.request(path, RequestOptions::default())
    }

    fn send(&self, method: Method, path: &str) -> FizzyResult<Value> {
        self.request(path, RequestOptions::new(method))
    }

    fn send_json(&self, method: Method, path: &str, body: &impl JsonBody) -> FizzyResult<Value> {
        self.request(path, RequestOptions::new(method).with_body(body.to_json()?))
    }

    // Identity and notifications are user-scoped.

    pub fn get_identity(&self) -> FizzyResult<Value> {
        self.get("/my/identity")
    }

    pub fn list_notifications(&self) -> FizzyResult<Value> {
        self.get("/my/notifications")
    }

    // Boards

    pub fn list_boards(&self) -> FizzyResult<Value> {
        let path = self.account_path("/boards")?;
        self.get(&path)
    }

    pub fn get_board(&self, board_id: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/boards/{}", encode(board_id)))?;
        self.get(&path)
    }

    pub fn create_board(&self, data: &BoardPayload) -> FizzyResult<Value> {
        let path = self.account_path("/boards")?;
        self.send_json(Method::POST, &path, data)
    }

    pub fn update_board(&self, board_id: &str, data: &BoardPayload) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/boards/{}", encode(board_id)))?;
        self.send_json(Method::PUT, &path, data)
    }

    pub fn delete_board(&self, board_id: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/boards/{}", encode(board_id)))?;
        self.send(Method::DELETE, &path)
    }

    pub fn list_columns(&self, board_id: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/boards/{}/columns", encode(board_id)))?;
        self.get(&path)
    }

    // Cards

    pub fn list_cards(&self, filters: &CardFilters) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards{}", filters.query_string()))?;
        self.get(&path)
    }

    pub fn get_card(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}", number))?;
        self.get(&path)
    }

    pub fn create_card(&self, board_id: &str, data: &CardPayload) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/boards/{}/cards", encode(board_id)))?;
        self.send_json(Method::POST, &path, data)
    }

    pub fn update_card(&self, number: u64, data: &CardPayload) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}", number))?;
        self.send_json(Method::PUT, &path, data)
    }

    pub fn delete_card(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}", number))?;
        self.send(Method::DELETE, &path)
    }

    // Card lifecycle: POST asserts a state, DELETE retracts it.

    pub fn close_card(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/closure", number))?;
        self.send(Method::POST, &path)
    }

    pub fn reopen_card(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/closure", number))?;
        self.send(Method::DELETE, &path)
    }

    pub fn set_card_not_now(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/not_now", number))?;
        self.send(Method::POST, &path)
    }

    pub fn unset_card_not_now(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/not_now", number))?;
        self.send(Method::DELETE, &path)
    }

    /// Move a card to the column with the given id.
    pub fn triage_card(&self, number: u64, column_id: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/triage", number))?;
        let body = TriagePayload {
            column_id: column_id.to_string(),
        };
        self.send_json(Method::POST, &path, &body)
    }

    /// Add the tag if the card lacks it, remove it otherwise. The server
    /// decides which; nothing is tracked here.
    pub fn toggle_tag(&self, number: u64, tag_title: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/taggings", number))?;
        let body = TaggingPayload {
            tag_title: tag_title.to_string(),
        };
        self.send_json(Method::POST, &path, &body)
    }

    // Comments

    pub fn list_comments(&self, number: u64) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/comments", number))?;
        self.get(&path)
    }

    pub fn create_comment(&self, number: u64, content: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!("/cards/{}/comments", number))?;
        let body = CommentPayload {
            content: content.to_string(),
        };
        self.send_json(Method::POST, &path, &body)
    }

    pub fn delete_comment(&self, number: u64, comment_id: &str) -> FizzyResult<Value> {
        let path = self.account_path(&format!(
            "/cards/{}/comments/{}",
            number,
            encode(comment_id)
        ))?;
        self.send(Method::DELETE, &path)
    }

    // Tags and users

    pub fn list_tags(&self) -> FizzyResult<Value> {
        let path = self.account_path("/tags")?;
        self.get(&path)
    }

    pub fn list_users(&self) -> FizzyResult<Value> {
        let path = self.account_path("/users")?;
        self.get(&path)
    }

    /// Set a card's status from its keyword (`published`, `closed`,
    /// `not_now`). Unknown keywords fail before any request is made.
    pub fn set_card_status(&self, number: u64, status: &str) -> FizzyResult<StatusChange> {
        let status: CardStatus = status.parse()?;
        self.apply_card_status(number, status)
    }

    /// `Published` retracts both closure and not_now. Failures of those two
    /// calls are returned as `BestEffort::Ignored`, never as an error.
    pub fn apply_card_status(&self, number: u64, status: CardStatus) -> FizzyResult<StatusChange> {
        // Credentials are required even though the published pair ignores failures
        self.config.require_token()?;
        self.require_account()?;
        match status {
            CardStatus::Closed => self.close_card(number).map(StatusChange::Closed),
            CardStatus::NotNow => self.set_card_not_now(number).map(StatusChange::NotNow),
            CardStatus::Published => {
                let reopen = BestEffort::from_result(self.reopen_card(number));
                let unset_not_now = BestEffort::from_result(self.unset_card_not_now(number));
                Ok(StatusChange::Published {
                    reopen,
                    unset_not_now,
                })
            }
        }
    }

    /// Move a card to a column given by id or by name.
    ///
    /// Looks up the card's board, lists its columns, resolves the target
    /// (id first, then case-insensitive name) and triages the card there.
    pub fn move_card_to_column(&self, number: u64, column: &str) -> FizzyResult<ColumnMove> {
        let card = self.get_card(number)?;
        let board_id = card_board_id(&card).ok_or_else(|| {
            FizzyError::not_found(format!("Card #{} is not on a board", number))
        })?;

        // Resolve against the card's own board, never a global column list
        let columns = Column::list_from(&self.list_columns(&board_id)?);
        let column_match = resolve_column(&columns, column);
        let Some(target) = column_match.column() else {
            return Err(column_not_found(column, &board_id, &columns));
        };

        let response = self.triage_card(number, &target.id)?;
        Ok(ColumnMove {
            column_match,
            response,
        })
    }
}

fn column_not_found(target: &str, board_id: &str, columns: &[Column]) -> FizzyError {
    if columns.is_empty() {
        return FizzyError::not_found(format!(
            "Column \"{}\" not found: board {} has no columns",
            target, board_id
        ));
    }
    let names = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    FizzyError::not_found(format!(
        "Column \"{}\" not found. Available columns: {}",
        target, names
    ))
}

/// Default headers with caller overrides applied by case-insensitive name.
fn merge_headers(token: &str, overrides: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Authorization".to_string(), format!("Bearer {}", token)),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ];
    for (name, value) in overrides {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => headers.push((name, value)),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_defaults_by_name() {
        let headers = merge_headers(
            "tok",
            vec![
                ("accept".into(), "text/plain".into()),
                ("X-Trace".into(), "1".into()),
            ],
        );
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0], ("Authorization".into(), "Bearer tok".into()));
        assert_eq!(headers[2], ("Accept".into(), "text/plain".into()));
        assert_eq!(headers[3], ("X-Trace".into(), "1".into()));
    }

    #[test]
    fn column_not_found_lists_names() {
        let columns = vec![
            Column {
                id: "1".into(),
                name: "Todo".into(),
            },
            Column {
                id: "2".into(),
                name: "Done".into(),
            },
        ];
        let err = column_not_found("Doing", "b1", &columns);
        assert!(matches!(err, FizzyError::NotFound(_)));
        assert_eq!(
            err.to_string(),
            "Column \"Doing\" not found. Available columns: Todo, Done"
        );

        let empty = column_not_found("Doing", "b1", &[]);
        assert!(empty.to_string().contains("board b1 has no columns"));
    }
}
