// Drives `FizzyClient` through a recording transport: every request the
// client would send is captured, and responses are scripted per test.

use std::cell::RefCell;
use std::collections::VecDeque;

use fizzy_cli::api::{BestEffort, StatusChange};
use fizzy_cli::models::{BoardPayload, CardFilters, CardPayload, ColumnMatch};
use fizzy_cli::{
    FizzyClient, FizzyError, FizzyResult, HttpRequest, HttpResponse, RequestOptions,
    ResolvedConfig, Transport,
};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Default)]
struct RecordingTransport {
    requests: RefCell<Vec<HttpRequest>>,
    responses: RefCell<VecDeque<HttpResponse>>,
}

impl RecordingTransport {
    fn respond(&self, status: u16, body: &str) -> &Self {
        self.responses.borrow_mut().push_back(HttpResponse {
            status,
            body: body.to_string(),
        });
        self
    }

    fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    fn request(&self, index: usize) -> HttpRequest {
        self.requests.borrow()[index].clone()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: HttpRequest) -> FizzyResult<HttpResponse> {
        self.requests.borrow_mut().push(request);
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(HttpResponse {
                status: 200,
                body: String::new(),
            }))
    }
}

fn client(transport: &RecordingTransport) -> FizzyClient<&RecordingTransport> {
    let config = ResolvedConfig::explicit(Some("test-token".into()), Some("test-account".into()));
    FizzyClient::with_transport(transport, config)
}

fn client_with<'a>(
    transport: &'a RecordingTransport,
    token: Option<&str>,
    account: Option<&str>,
) -> FizzyClient<&'a RecordingTransport> {
    let config = ResolvedConfig::explicit(token.map(String::from), account.map(String::from));
    FizzyClient::with_transport(transport, config)
}

type Call = Box<dyn Fn(&FizzyClient<&RecordingTransport>) -> FizzyResult<()>>;

fn call<T: 'static>(
    f: impl Fn(&FizzyClient<&RecordingTransport>) -> FizzyResult<T> + 'static,
) -> Call {
    Box::new(move |c| f(c).map(|_| ()))
}

fn account_scoped_calls() -> Vec<(&'static str, Call)> {
    vec![
        ("list_boards", call(|c| c.list_boards())),
        ("get_board", call(|c| c.get_board("b1"))),
        ("create_board", call(|c| c.create_board(&BoardPayload::default()))),
        ("update_board", call(|c| c.update_board("b1", &BoardPayload::default()))),
        ("delete_board", call(|c| c.delete_board("b1"))),
        ("list_columns", call(|c| c.list_columns("b1"))),
        ("list_cards", call(|c| c.list_cards(&CardFilters::default()))),
        ("get_card", call(|c| c.get_card(1))),
        ("create_card", call(|c| c.create_card("b1", &CardPayload::titled("x")))),
        ("update_card", call(|c| c.update_card(1, &CardPayload::titled("x")))),
        ("delete_card", call(|c| c.delete_card(1))),
        ("close_card", call(|c| c.close_card(1))),
        ("reopen_card", call(|c| c.reopen_card(1))),
        ("set_card_not_now", call(|c| c.set_card_not_now(1))),
        ("unset_card_not_now", call(|c| c.unset_card_not_now(1))),
        ("triage_card", call(|c| c.triage_card(1, "c1"))),
        ("toggle_tag", call(|c| c.toggle_tag(1, "bug"))),
        ("list_comments", call(|c| c.list_comments(1))),
        ("create_comment", call(|c| c.create_comment(1, "hi"))),
        ("delete_comment", call(|c| c.delete_comment(1, "9"))),
        ("list_tags", call(|c| c.list_tags())),
        ("list_users", call(|c| c.list_users())),
        ("set_card_status", call(|c| c.set_card_status(1, "published"))),
        ("move_card_to_column", call(|c| c.move_card_to_column(1, "Done"))),
    ]
}

#[test]
fn request_sends_auth_and_json_headers() {
    let transport = RecordingTransport::default();
    transport.respond(200, r#"{"data":"test"}"#);

    let value = client(&transport)
        .request("/test", RequestOptions::default())
        .unwrap();

    assert_eq!(value, json!({"data": "test"}));
    let sent = transport.request(0);
    assert_eq!(sent.method, Method::GET);
    assert_eq!(sent.url, "https://app.fizzy.do/test");
    assert_eq!(sent.header("Authorization"), Some("Bearer test-token"));
    assert_eq!(sent.header("Content-Type"), Some("application/json"));
    assert_eq!(sent.header("Accept"), Some("application/json"));
    assert_eq!(sent.body, None);
}

#[test]
fn caller_headers_override_defaults() {
    let transport = RecordingTransport::default();

    client(&transport)
        .request(
            "/test",
            RequestOptions::new(Method::POST)
                .with_body("{}")
                .with_header("accept", "text/plain"),
        )
        .unwrap();

    let sent = transport.request(0);
    assert_eq!(sent.header("Accept"), Some("text/plain"));
    assert_eq!(sent.headers.len(), 3);
    assert_eq!(sent.body.as_deref(), Some("{}"));
}

#[test]
fn missing_token_fails_every_call_before_the_network() {
    let transport = RecordingTransport::default();
    let client = client_with(&transport, None, Some("test-account"));

    let mut calls = account_scoped_calls();
    calls.push(("get_identity", call(|c| c.get_identity())));
    calls.push(("list_notifications", call(|c| c.list_notifications())));
    calls.push((
        "request",
        call(|c| c.request("/anything", RequestOptions::default())),
    ));

    for (name, call) in calls {
        let err = call(&client).unwrap_err();
        assert!(
            matches!(err, FizzyError::Configuration(_)),
            "{} returned {:?}",
            name,
            err
        );
        assert!(err.to_string().contains("No API token configured"), "{}", name);
    }
    assert_eq!(transport.calls(), 0);
}

#[test]
fn missing_account_fails_account_scoped_calls_without_a_request() {
    let transport = RecordingTransport::default();
    let client = client_with(&transport, Some("test-token"), None);

    for (name, call) in account_scoped_calls() {
        let err = call(&client).unwrap_err();
        assert!(
            matches!(err, FizzyError::Configuration(_)),
            "{} returned {:?}",
            name,
            err
        );
        assert!(err.to_string().contains("No account configured"), "{}", name);
    }
    assert_eq!(transport.calls(), 0);
}

#[test]
fn user_scoped_calls_do_not_need_an_account() {
    let transport = RecordingTransport::default();
    transport
        .respond(200, r#"{"accounts":[]}"#)
        .respond(200, "[]");
    let client = client_with(&transport, Some("test-token"), None);

    assert_eq!(client.get_identity().unwrap(), json!({"accounts": []}));
    assert_eq!(client.list_notifications().unwrap(), json!([]));
    assert_eq!(transport.request(0).url, "https://app.fizzy.do/my/identity");
    assert_eq!(transport.request(1).url, "https://app.fizzy.do/my/notifications");
}

#[test]
fn no_content_is_null_even_with_a_body() {
    let transport = RecordingTransport::default();
    transport.respond(204, r#"{"ignored":true}"#);

    let value = client(&transport).delete_card(5).unwrap();
    assert_eq!(value, Value::Null);
}

#[test]
fn empty_success_body_is_null() {
    let transport = RecordingTransport::default();
    transport.respond(200, "").respond(201, "");

    let client = client(&transport);
    assert_eq!(client.close_card(5).unwrap(), Value::Null);
    assert_eq!(client.set_card_not_now(5).unwrap(), Value::Null);
}

#[test]
fn error_status_keeps_the_raw_body() {
    let transport = RecordingTransport::default();
    transport
        .respond(404, "Not found")
        .respond(422, r#"{"errors":["title can't be blank"]}"#);
    let client = client(&transport);

    let err = client.request("/test", RequestOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "API Error 404: Not found");
    assert_eq!(err.status(), Some(404));

    let err = client.create_card("b1", &CardPayload::default()).unwrap_err();
    match err {
        FizzyError::Request { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, r#"{"errors":["title can't be blank"]}"#);
        }
        other => panic!("expected request error, got {:?}", other),
    }
}

#[test]
fn unparsable_success_body_is_an_invalid_response() {
    let transport = RecordingTransport::default();
    transport.respond(200, "<html>oops</html>");

    let err = client(&transport).list_boards().unwrap_err();
    assert!(matches!(err, FizzyError::InvalidResponse(_)));
}

#[test]
fn board_endpoints_send_unwrapped_bodies() {
    let transport = RecordingTransport::default();
    let client = client(&transport);
    let payload = BoardPayload {
        name: Some("Roadmap".into()),
        description: Some("Q3".into()),
    };

    client.list_boards().unwrap();
    client.get_board("b1").unwrap();
    client.create_board(&payload).unwrap();
    client.update_board("b1", &payload).unwrap();
    client.delete_board("b1").unwrap();

    let expected = [
        (Method::GET, "/test-account/boards"),
        (Method::GET, "/test-account/boards/b1"),
        (Method::POST, "/test-account/boards"),
        (Method::PUT, "/test-account/boards/b1"),
        (Method::DELETE, "/test-account/boards/b1"),
    ];
    for (i, (method, path)) in expected.iter().enumerate() {
        let sent = transport.request(i);
        assert_eq!(&sent.method, method);
        assert_eq!(sent.url, format!("https://app.fizzy.do{}", path));
    }
    assert_eq!(
        transport.request(2).body.as_deref(),
        Some(r#"{"name":"Roadmap","description":"Q3"}"#)
    );
    assert_eq!(transport.request(4).body, None);
}

#[test]
fn list_cards_appends_filters_in_fixed_order() {
    let transport = RecordingTransport::default();
    transport.respond(200, "[]").respond(200, "[]");
    let client = client(&transport);

    client
        .list_cards(&CardFilters {
            status: Some("open".into()),
            board_id: Some("123".into()),
            ..CardFilters::default()
        })
        .unwrap();
    client.list_cards(&CardFilters::default()).unwrap();

    assert_eq!(
        transport.request(0).url,
        "https://app.fizzy.do/test-account/cards?board_id=123&status=open"
    );
    assert_eq!(transport.request(1).url, "https://app.fizzy.do/test-account/cards");
}

#[test]
fn get_card_returns_the_parsed_card() {
    let transport = RecordingTransport::default();
    transport.respond(200, r#"{"number":1,"title":"Test"}"#);

    let card = client(&transport).get_card(1).unwrap();

    assert_eq!(card["number"], 1);
    assert_eq!(transport.request(0).url, "https://app.fizzy.do/test-account/cards/1");
}

#[test]
fn card_bodies_are_wrapped_under_card() {
    let transport = RecordingTransport::default();
    let client = client(&transport);

    client
        .create_card("b1", &CardPayload::titled("New Card"))
        .unwrap();
    client
        .update_card(
            7,
            &CardPayload {
                column_id: Some("c2".into()),
                ..CardPayload::default()
            },
        )
        .unwrap();

    let created = transport.request(0);
    assert_eq!(created.method, Method::POST);
    assert_eq!(created.url, "https://app.fizzy.do/test-account/boards/b1/cards");
    assert_eq!(created.body.as_deref(), Some(r#"{"card":{"title":"New Card"}}"#));

    let updated = transport.request(1);
    assert_eq!(updated.method, Method::PUT);
    assert_eq!(updated.url, "https://app.fizzy.do/test-account/cards/7");
    assert_eq!(updated.body.as_deref(), Some(r#"{"card":{"column_id":"c2"}}"#));
}

#[test]
fn lifecycle_sub_resources_use_post_and_delete() {
    let transport = RecordingTransport::default();
    let client = client(&transport);

    client.close_card(3).unwrap();
    client.reopen_card(3).unwrap();
    client.set_card_not_now(3).unwrap();
    client.unset_card_not_now(3).unwrap();

    let expected = [
        (Method::POST, "closure"),
        (Method::DELETE, "closure"),
        (Method::POST, "not_now"),
        (Method::DELETE, "not_now"),
    ];
    for (i, (method, resource)) in expected.iter().enumerate() {
        let sent = transport.request(i);
        assert_eq!(&sent.method, method);
        assert_eq!(
            sent.url,
            format!("https://app.fizzy.do/test-account/cards/3/{}", resource)
        );
        assert_eq!(sent.body, None);
    }
}

#[test]
fn tagging_and_comment_bodies() {
    let transport = RecordingTransport::default();
    let client = client(&transport);

    client.toggle_tag(4, "bug").unwrap();
    client.toggle_tag(4, "bug").unwrap();
    client.list_comments(4).unwrap();
    client.create_comment(4, "Looks good").unwrap();
    client.delete_comment(4, "88").unwrap();

    let tagging = transport.request(0);
    assert_eq!(tagging.method, Method::POST);
    assert_eq!(tagging.url, "https://app.fizzy.do/test-account/cards/4/taggings");
    assert_eq!(tagging.body.as_deref(), Some(r#"{"tag_title":"bug"}"#));
    // Toggling is the server's job: the second call is identical.
    assert_eq!(transport.request(1), tagging);

    assert_eq!(transport.request(2).method, Method::GET);
    assert_eq!(
        transport.request(3).body.as_deref(),
        Some(r#"{"content":"Looks good"}"#)
    );
    let deleted = transport.request(4);
    assert_eq!(deleted.method, Method::DELETE);
    assert_eq!(
        deleted.url,
        "https://app.fizzy.do/test-account/cards/4/comments/88"
    );
}

#[test]
fn tags_and_users_are_account_scoped() {
    let transport = RecordingTransport::default();
    let client = client(&transport);

    client.list_tags().unwrap();
    client.list_users().unwrap();

    assert_eq!(transport.request(0).url, "https://app.fizzy.do/test-account/tags");
    assert_eq!(transport.request(1).url, "https://app.fizzy.do/test-account/users");
}

#[test]
fn publishing_retracts_closure_and_not_now() {
    let transport = RecordingTransport::default();
    transport.respond(204, "").respond(204, "");

    let change = client(&transport).set_card_status(12, "published").unwrap();

    assert!(matches!(
        change,
        StatusChange::Published {
            reopen: BestEffort::Applied,
            unset_not_now: BestEffort::Applied,
        }
    ));
    assert_eq!(transport.calls(), 2);
    let first = transport.request(0);
    assert_eq!(first.method, Method::DELETE);
    assert!(first.url.ends_with("/test-account/cards/12/closure"));
    let second = transport.request(1);
    assert_eq!(second.method, Method::DELETE);
    assert!(second.url.ends_with("/test-account/cards/12/not_now"));
}

#[test]
fn publishing_swallows_sub_step_failures() {
    let transport = RecordingTransport::default();
    transport
        .respond(404, "Card is not closed")
        .respond(204, "");

    let change = client(&transport).set_card_status(12, "published").unwrap();

    match change {
        StatusChange::Published {
            reopen,
            unset_not_now,
        } => {
            match reopen {
                BestEffort::Ignored(e) => assert_eq!(e.status(), Some(404)),
                BestEffort::Applied => panic!("reopen should have been ignored"),
            }
            assert!(unset_not_now.is_applied());
        }
        other => panic!("unexpected change: {:?}", other),
    }
    assert_eq!(transport.calls(), 2);
}

#[test]
fn publishing_succeeds_even_when_both_steps_fail() {
    let transport = RecordingTransport::default();
    transport.respond(404, "nope").respond(500, "boom");

    let change = client(&transport).set_card_status(12, "published");

    assert!(change.is_ok());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn closed_and_not_now_map_to_their_sub_resources() {
    let transport = RecordingTransport::default();
    let client = client(&transport);

    assert!(matches!(
        client.set_card_status(2, "closed").unwrap(),
        StatusChange::Closed(_)
    ));
    assert!(matches!(
        client.set_card_status(2, "not_now").unwrap(),
        StatusChange::NotNow(_)
    ));

    assert_eq!(transport.request(0).method, Method::POST);
    assert!(transport.request(0).url.ends_with("/cards/2/closure"));
    assert_eq!(transport.request(1).method, Method::POST);
    assert!(transport.request(1).url.ends_with("/cards/2/not_now"));
}

#[test]
fn unknown_status_fails_without_a_request() {
    let transport = RecordingTransport::default();

    let err = client(&transport).set_card_status(12, "archived").unwrap_err();

    assert!(matches!(err, FizzyError::Validation(_)));
    assert_eq!(transport.calls(), 0);
}

fn script_board(transport: &RecordingTransport) {
    transport
        .respond(200, r#"{"number":5,"board":{"id":"b1","name":"Roadmap"}}"#)
        .respond(
            200,
            &json!([
                {"id": "c1", "name": "Todo"},
                {"id": "c2", "name": "In Progress"},
                {"id": "c3", "name": "Done"},
            ])
            .to_string(),
        );
}

#[test]
fn move_resolves_column_by_name_and_triages() {
    let transport = RecordingTransport::default();
    script_board(&transport);
    transport.respond(200, r#"{"number":5}"#);

    let moved = client(&transport).move_card_to_column(5, "in progress").unwrap();

    assert!(matches!(moved.column_match, ColumnMatch::ByName(ref c) if c.id == "c2"));
    assert_eq!(moved.response, json!({"number": 5}));
    assert_eq!(transport.calls(), 3);
    assert_eq!(transport.request(0).url, "https://app.fizzy.do/test-account/cards/5");
    assert_eq!(
        transport.request(1).url,
        "https://app.fizzy.do/test-account/boards/b1/columns"
    );
    let triage = transport.request(2);
    assert_eq!(triage.method, Method::POST);
    assert_eq!(triage.url, "https://app.fizzy.do/test-account/cards/5/triage");
    assert_eq!(triage.body.as_deref(), Some(r#"{"column_id":"c2"}"#));
}

#[test]
fn move_prefers_an_exact_id_match() {
    let transport = RecordingTransport::default();
    script_board(&transport);

    let moved = client(&transport).move_card_to_column(5, "c3").unwrap();

    assert!(matches!(moved.column_match, ColumnMatch::ById(ref c) if c.name == "Done"));
    assert_eq!(
        transport.request(2).body.as_deref(),
        Some(r#"{"column_id":"c3"}"#)
    );
}

#[test]
fn move_to_unknown_column_lists_the_board_columns() {
    let transport = RecordingTransport::default();
    script_board(&transport);

    let err = client(&transport).move_card_to_column(5, "Blocked").unwrap_err();

    assert!(matches!(err, FizzyError::NotFound(_)));
    let message = err.to_string();
    assert!(message.contains("Blocked"));
    assert!(message.contains("Todo, In Progress, Done"));
    // No triage request once the column is unresolved.
    assert_eq!(transport.calls(), 2);
}

#[test]
fn move_with_blank_column_never_picks_a_nameless_column() {
    let transport = RecordingTransport::default();
    transport
        .respond(200, r#"{"number":5,"board":{"id":"b1"}}"#)
        .respond(200, r#"[{"id":"c1"},{"id":"c2","name":"Done"}]"#);

    let err = client(&transport).move_card_to_column(5, "").unwrap_err();

    assert!(matches!(err, FizzyError::NotFound(_)));
    assert_eq!(transport.calls(), 2);
}

#[test]
fn move_card_without_board_is_not_found() {
    let transport = RecordingTransport::default();
    transport.respond(200, r#"{"number":5}"#);

    let err = client(&transport).move_card_to_column(5, "Done").unwrap_err();

    assert!(matches!(err, FizzyError::NotFound(_)));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn move_on_board_without_columns_says_so() {
    let transport = RecordingTransport::default();
    transport
        .respond(200, r#"{"number":5,"board_id":9}"#)
        .respond(200, "[]");

    let err = client(&transport).move_card_to_column(5, "Done").unwrap_err();

    assert!(matches!(err, FizzyError::NotFound(_)));
    assert!(err.to_string().contains("board 9 has no columns"));
    assert_eq!(
        transport.request(1).url,
        "https://app.fizzy.do/test-account/boards/9/columns"
    );
}

#[test]
fn move_surfaces_request_errors_unchanged() {
    let transport = RecordingTransport::default();
    transport.respond(404, "Card not found");

    let err = client(&transport).move_card_to_column(5, "Done").unwrap_err();

    assert_eq!(err.to_string(), "API Error 404: Card not found");
    assert_eq!(transport.calls(), 1);
}
