//! End-to-end remote calls against a real server.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tower::BoxError;

use common::{rpc_mux, spawn_server, spawn_server_with, MOUNT_PATH};
use rpc_mux::config::ServerConfig;
use rpc_mux::middleware::AuthContext;
use rpc_mux::routing::handler_fn;
use rpc_mux::wire::encode::encode_call_with_boundary;
use rpc_mux::wire::{FUNC_NAME_HEADER, PARAM_TYPES_HEADER};
use rpc_mux::{Blob, Call, ClientError, Mux, RemoteFunctionTable, RemoteFunctions, Request, Response, Value};

fn functions() -> RemoteFunctionTable {
    RemoteFunctionTable::new()
        .register_fn("add_numbers", |call: Call| async move {
            let a = call.arg(0).as_f64().ok_or("a must be a number")?;
            let b = call.arg(1).as_f64().ok_or("b must be a number")?;
            Ok::<_, BoxError>(Value::from(a + b))
        })
        .register_fn("echo", |mut call: Call| async move { Ok::<_, BoxError>(call.take_arg(0)) })
        .register_fn("inspect", |call: Call| async move {
            let file = call.arg(1).as_blob().ok_or("second argument must be a file")?;
            Ok::<_, BoxError>(Value::object([
                ("body", call.arg(0).clone()),
                ("filename", Value::from(file.filename.as_str())),
                ("size", Value::from(file.data.len() as f64)),
            ]))
        })
        .register_fn("nothing", |_: Call| async { Ok::<_, BoxError>(Value::Undefined) })
        .register_fn("explode", |_: Call| async {
            Err::<Value, BoxError>("database unavailable".into())
        })
}

#[tokio::test]
async fn test_add_numbers() {
    let server = spawn_server(rpc_mux(functions())).await;

    let result = server.client().call("add_numbers", &[2.into(), 40.into()]).await.unwrap();
    assert_eq!(result, Value::Number(42.0));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_containers_and_files_round_trip() {
    let server = spawn_server(rpc_mux(functions())).await;
    let client = server.client();

    let body = Value::object([
        ("name", Value::from("ice")),
        ("age", Value::from(25)),
        ("seen", Value::Date(1_700_000_000_000)),
        ("tags", Value::Set(vec!["a".into(), "b".into()])),
        (
            "lookup",
            Value::Map(vec![(Value::from("x"), Value::object([("deep", Value::Array(vec![1.into()]))]))]),
        ),
        (
            "pattern",
            Value::RegExp {
                source: "^a+$".to_string(),
                flags: "i".to_string(),
            },
        ),
    ]);
    let file = Value::Bytes(Blob::new("hello_world.txt", "sefsfse").with_content_type("text/plain"));

    let result = client.call("inspect", &[body.clone(), file]).await.unwrap();
    assert_eq!(result.get("body"), Some(&body));
    assert_eq!(result.get("filename"), Some(&Value::from("hello_world.txt")));
    assert_eq!(result.get("size"), Some(&Value::Number(7.0)));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_scalars_keep_their_types() {
    let server = spawn_server(rpc_mux(functions())).await;
    let client = server.client();

    assert_eq!(client.call("echo", &["42".into()]).await.unwrap(), Value::from("42"));
    assert_eq!(client.call("echo", &[true.into()]).await.unwrap(), Value::Bool(true));
    assert_eq!(client.call("echo", &[Value::Null]).await.unwrap(), Value::Null);
    assert_eq!(client.call("echo", &[1.5.into()]).await.unwrap(), Value::Number(1.5));

    let blob = client
        .call("echo", &[Value::Bytes(Blob::new("raw.bin", vec![0u8, 159, 146, 150]))])
        .await
        .unwrap();
    assert_eq!(blob.as_blob().map(|b| b.data.as_ref()), Some(&[0u8, 159, 146, 150][..]));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_undefined_result_is_no_content() {
    let server = spawn_server(rpc_mux(functions())).await;

    assert_eq!(server.client().call("nothing", &[]).await.unwrap(), Value::Undefined);

    let encoded = encode_call_with_boundary(&[], "b").unwrap();
    let response = reqwest::Client::new()
        .post(server.url(MOUNT_PATH))
        .header(FUNC_NAME_HEADER, "nothing")
        .header(PARAM_TYPES_HEADER, encoded.manifest.to_header())
        .header("content-type", encoded.content_type())
        .body(encoded.body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_function_is_404() {
    let server = spawn_server(rpc_mux(functions())).await;

    let err = server.client().call("does_not_exist", &[]).await.unwrap_err();
    match err {
        ClientError::Remote { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Function \"does_not_exist\" not found");
        }
        other => panic!("unexpected error: {other}"),
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_call_does_not_poison_server() {
    let server = spawn_server(rpc_mux(functions())).await;
    let client = server.client();

    let err = client.call("explode", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 500, ref body } if body == "database unavailable"));

    let result = client.call("add_numbers", &[1.into(), 1.into()]).await.unwrap();
    assert_eq!(result, Value::Number(2.0));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_manifest_mismatch_is_400() {
    let server = spawn_server(rpc_mux(functions())).await;

    let encoded = encode_call_with_boundary(&[1.into(), 2.into()], "b").unwrap();
    let response = reqwest::Client::new()
        .post(server.url(MOUNT_PATH))
        .header(FUNC_NAME_HEADER, "add_numbers")
        .header(PARAM_TYPES_HEADER, r#"["number"]"#)
        .header("content-type", encoded.content_type())
        .body(encoded.body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_oversized_request_is_rejected_before_invocation() {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = invoked.clone();
    let table = RemoteFunctionTable::new().register_fn("store", move |_: Call| {
        let flag = flag.clone();
        async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, BoxError>(Value::Null)
        }
    });

    let mut config = ServerConfig::default();
    config.limits.max_request_bytes = 1024;
    config.limits.max_field_bytes = 512;
    let server = spawn_server_with(config, rpc_mux(table)).await;

    let err = server.client().call("store", &["x".repeat(4096).into()]).await.unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 413, .. }));
    assert!(!invoked.load(Ordering::SeqCst));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_auth_context_reaches_function() {
    #[derive(Clone)]
    struct User(String);

    let table = RemoteFunctionTable::new().register_fn("whoami", |call: Call| async move {
        Ok::<_, BoxError>(Value::from(call.extension::<User>().map(|user| user.0.clone())))
    });
    let mux = Mux::new()
        .handle(
            MOUNT_PATH,
            AuthContext::new(|req: &Request| req.header("x-user").map(|name| User(name.to_string()))),
        )
        .handle(MOUNT_PATH, RemoteFunctions::new(table));
    let server = spawn_server(mux).await;

    let anonymous = server.client().call("whoami", &[]).await.unwrap();
    assert_eq!(anonymous, Value::Null);

    let client = server.client().with_header("x-user", "ada").unwrap();
    assert_eq!(client.call("whoami", &[]).await.unwrap(), Value::from("ada"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_mounted_routes_and_not_found() {
    let api = Mux::new()
        .handle_func(
            "GET /users/:id",
            handler_fn(|req: &mut Request, res: &mut Response| {
                let id = req.path_param("id").unwrap_or_default().to_string();
                let _ = res.end(id);
            }),
        )
        .unwrap();
    let mux = Mux::new().handle("/v1", api.strip_prefix("/v1"));
    let server = spawn_server(mux).await;
    let http = reqwest::Client::new();

    let response = http.get(server.url("/v1/users/7?full=1")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "7");

    let response = http.get(server.url("/elsewhere")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "Page Not found");

    server.stop().await.unwrap();
}
