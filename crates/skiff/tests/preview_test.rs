//! Preview tests: port discipline, visibility, tokens.

use skiff::test_utils::mock_client;
use skiff::{Error, ExecSpec, PreviewSpec, PreviewVisibility, Sandbox, Skiff, WaitPolicy};
use std::time::Duration;

async fn sandbox(client: &Skiff, name: &str) -> Sandbox {
    client
        .sandbox(name)
        .port(3000)
        .create()
        .await
        .expect("Failed to create sandbox")
}

fn public_spec(name: &str, port: u16) -> PreviewSpec {
    PreviewSpec {
        name: name.to_string(),
        port,
        visibility: PreviewVisibility::Public,
        prefix: None,
    }
}

#[tokio::test]
async fn test_preview_port_must_be_declared() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    let err = sb
        .previews()
        .create_if_not_exists(public_spec("api", 4000))
        .await
        .expect_err("undeclared port must be rejected");
    match err {
        Error::InvalidPort { port, .. } => assert_eq!(port, 4000),
        other => panic!("expected InvalidPort, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reserved_port_rejected_before_declaration_check() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    let err = sb
        .previews()
        .create_if_not_exists(public_spec("bad", 443))
        .await
        .expect_err("reserved port must be rejected");
    assert!(matches!(err, Error::InvalidPort { port: 443, .. }));
}

#[tokio::test]
async fn test_create_if_not_exists_returns_existing_preview() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    let first = sb
        .previews()
        .create_if_not_exists(public_spec("site", 3000))
        .await
        .expect("Failed to create preview");
    let second = sb
        .previews()
        .create_if_not_exists(public_spec("site", 3000))
        .await
        .expect("Failed to get existing preview");

    assert_eq!(first.url(), second.url());
    assert!(!first.url().is_empty());
    assert!(format!("{first:?}").contains("site"));
}

#[tokio::test]
async fn test_visibility_controls_token_requirement() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    let public = sb
        .previews()
        .create_if_not_exists(public_spec("open", 3000))
        .await
        .expect("Failed to create preview");
    assert!(!public.requires_token());

    let private = sb
        .previews()
        .create_if_not_exists(PreviewSpec {
            name: "gated".to_string(),
            port: 3000,
            visibility: PreviewVisibility::Private,
            prefix: None,
        })
        .await
        .expect("Failed to create preview");
    assert!(private.requires_token());
}

#[tokio::test]
async fn test_token_lifecycle() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    let preview = sb
        .previews()
        .create_if_not_exists(PreviewSpec {
            name: "gated".to_string(),
            port: 3000,
            visibility: PreviewVisibility::Private,
            prefix: None,
        })
        .await
        .expect("Failed to create preview");

    let token = preview
        .tokens()
        .create(Duration::from_secs(3600))
        .await
        .expect("Failed to mint token");
    assert!(!token.value.is_empty());
    assert!(token.expires_at.is_some());

    let listed = preview.tokens().list().await.expect("Failed to list tokens");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].value, token.value);

    preview
        .tokens()
        .delete(&token.value)
        .await
        .expect("Failed to revoke token");
    // Revoke-of-absent is success.
    preview
        .tokens()
        .delete(&token.value)
        .await
        .expect("revoking a revoked token must succeed");
    assert!(preview.tokens().list().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_delete_preview_is_idempotent() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "web").await;

    sb.previews()
        .create_if_not_exists(public_spec("site", 3000))
        .await
        .expect("Failed to create preview");

    sb.previews().delete("site").await.expect("Failed to delete");
    sb.previews()
        .delete("site")
        .await
        .expect("delete of absent preview must succeed");
    assert!(sb.previews().list().await.expect("list").is_empty());
}

// The whole flow: provision, launch a server, wait for its port, expose it.
#[tokio::test(start_paused = true)]
async fn test_dev_server_preview_flow() {
    let (api, client) = mock_client();
    api.set_long_running("npm run dev");

    let mut urls = Vec::new();
    for name in ["web-a", "web-b"] {
        api.set_listening_after(name, 3000, 2);
        let sb = sandbox(&client, name).await;
        sb.exec(
            ExecSpec::new("npm run dev")
                .name("dev-server")
                .wait(WaitPolicy::ports([3000], Duration::from_secs(60))),
        )
        .await
        .expect("Failed to start dev server");

        let preview = sb
            .previews()
            .create_if_not_exists(public_spec("web", 3000))
            .await
            .expect("Failed to create preview");
        assert!(!preview.url().is_empty());
        urls.push(preview.url().to_string());
    }

    // Same preview name on different sandboxes yields different URLs.
    assert_ne!(urls[0], urls[1]);
}
