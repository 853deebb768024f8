//! Synchronous adapter driven end to end with real executors.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use sluice_core::fixtures::{RecordingSender, ScriptedReceiver};
use sluice_core::{Application, Executor, HttpScope, Scope, SendEvent, WebsocketScope};
use sluice_server::{
    response_iter, BlockingExecutor, Environ, StartResponse, SyncAdapter, SyncFn, WorkerPool,
};

fn counted<F>(calls: &Arc<AtomicUsize>, handler: F) -> SyncAdapter<impl sluice_server::SyncApplication>
where
    F: Fn(&mut Environ, &mut StartResponse) -> sluice_core::SluiceResult<sluice_server::ResponseBody>
        + Send
        + Sync
        + 'static,
{
    let calls = Arc::clone(calls);
    SyncAdapter::new(
        SyncFn::new(move |environ: &mut Environ, start: &mut StartResponse| {
            calls.fetch_add(1, Ordering::SeqCst);
            handler(environ, start)
        }),
        1024,
    )
}

async fn drive(
    app: &impl Application,
    scope: Scope,
    receive: Arc<ScriptedReceiver>,
    executor: Arc<dyn Executor>,
) -> Vec<SendEvent> {
    let send = Arc::new(RecordingSender::new());
    app.call(scope, receive, send.clone(), executor)
        .await
        .unwrap();
    send.events()
}

#[tokio::test]
async fn test_hello_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |_, start| {
        start.start("200 OK", [("X-Test", "1")])?;
        Ok(response_iter(["hi"]))
    });

    let events = drive(
        &adapter,
        HttpScope::new("GET", "/").into(),
        Arc::new(ScriptedReceiver::body("")),
        Arc::new(BlockingExecutor),
    )
    .await;

    assert_eq!(
        events,
        vec![
            SendEvent::response_start(
                200,
                vec![(Bytes::from_static(b"x-test"), Bytes::from_static(b"1"))]
            ),
            SendEvent::response_body("hi"),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chunked_body_and_environ() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |environ, start| {
        let mut body = String::new();
        environ
            .input
            .read_to_string(&mut body)
            .map_err(|e| sluice_core::Error::application(e.to_string()))?;
        let summary = format!(
            "{} {}|{}?{} {}",
            environ.request_method,
            environ.script_name,
            environ.path_info,
            environ.query_string,
            body
        );
        start.start("201 Created", [("content-type", "text/plain")])?;
        Ok(response_iter([summary]))
    });

    let scope = HttpScope::new("POST", "/api/items")
        .with_root_path("/api")
        .with_query_string("page=2");
    let events = drive(
        &adapter,
        scope.into(),
        Arc::new(ScriptedReceiver::chunks(["one ", "two"])),
        Arc::new(WorkerPool::new(2)),
    )
    .await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        SendEvent::response_body("POST /api|/items?page=2 one two")
    );
}

#[tokio::test]
async fn test_oversize_body_is_rejected_unread() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_inner = Arc::clone(&calls);
    let adapter = SyncAdapter::new(
        SyncFn::new(move |_: &mut Environ, start: &mut StartResponse| {
            calls_inner.fetch_add(1, Ordering::SeqCst);
            start.start("200 OK", Vec::<(&str, &str)>::new())?;
            Ok(response_iter(Vec::<Bytes>::new()))
        }),
        4,
    );
    let receive = Arc::new(ScriptedReceiver::chunks(["abc", "de", "f"]));

    let events = drive(
        &adapter,
        HttpScope::new("POST", "/").into(),
        Arc::clone(&receive),
        Arc::new(BlockingExecutor),
    )
    .await;

    assert_eq!(
        events,
        vec![
            SendEvent::response_start(400, Vec::new()),
            SendEvent::response_body(""),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(receive.remaining(), 1);
}

#[tokio::test]
async fn test_path_outside_root_is_not_found() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |_, start| {
        start.start("200 OK", Vec::<(&str, &str)>::new())?;
        Ok(response_iter(["unreachable"]))
    });

    let events = drive(
        &adapter,
        HttpScope::new("GET", "/other").with_root_path("/api").into(),
        Arc::new(ScriptedReceiver::body("")),
        Arc::new(BlockingExecutor),
    )
    .await;

    assert_eq!(events[0], SendEvent::response_start(404, Vec::new()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_body_sends_exactly_two_events() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |_, start| {
        start.start("204", Vec::<(&str, &str)>::new())?;
        Ok(response_iter(Vec::<Bytes>::new()))
    });

    let events = drive(
        &adapter,
        HttpScope::new("DELETE", "/thing").into(),
        Arc::new(ScriptedReceiver::empty()),
        Arc::new(BlockingExecutor),
    )
    .await;

    assert_eq!(
        events,
        vec![
            SendEvent::response_start(204, Vec::new()),
            SendEvent::response_body(""),
        ]
    );
}

#[tokio::test]
async fn test_websocket_refused_without_calling_app() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |_, _| Ok(response_iter(Vec::<Bytes>::new())));

    let events = drive(
        &adapter,
        WebsocketScope::new("/ws").into(),
        Arc::new(ScriptedReceiver::empty()),
        Arc::new(BlockingExecutor),
    )
    .await;

    assert_eq!(events, vec![SendEvent::WebsocketClose { code: 1000 }]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_start_response_is_an_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = counted(&calls, |_, _| Ok(response_iter(["no status"])));
    let send = Arc::new(RecordingSender::new());

    let result = adapter
        .call(
            HttpScope::new("GET", "/").into(),
            Arc::new(ScriptedReceiver::body("")),
            send.clone(),
            Arc::new(BlockingExecutor),
        )
        .await;

    assert!(matches!(result, Err(sluice_core::Error::InvalidResponse(_))));
    assert!(send.events().is_empty());
}
