use infrasentinel::api::{parse_base_url, ApiClient, DEFAULT_PROCESS_LIMIT};
use infrasentinel::session::SessionStore;
use infrasentinel::types::SortKey;

// Integration probe: only runs when INFRASENTINEL_URL (and credentials) point at a live backend.
// Example: INFRASENTINEL_URL=http://127.0.0.1:8000 INFRASENTINEL_USER=admin INFRASENTINEL_PASSWORD=... \
//   cargo test -p infrasentinel --test api_probe -- --nocapture
#[tokio::test]
async fn probe_backend_endpoints() {
    let (url, user, pass) = match (
        std::env::var("INFRASENTINEL_URL"),
        std::env::var("INFRASENTINEL_USER"),
        std::env::var("INFRASENTINEL_PASSWORD"),
    ) {
        (Ok(u), Ok(n), Ok(p)) if !u.is_empty() => (u, n, p),
        _ => {
            eprintln!(
                "skipping api_probe: set INFRASENTINEL_URL, INFRASENTINEL_USER and INFRASENTINEL_PASSWORD to run this integration test"
            );
            return;
        }
    };

    let session = SessionStore::in_memory();
    let api = ApiClient::new(parse_base_url(&url).expect("url"), session.clone(), None).expect("client");
    let token = api.login(&user, &pass).await.expect("login");
    session.set_credential(token).unwrap();
    assert!(session.is_valid(), "fresh token should not be expired");

    let history = api.metrics_history(20).await.expect("history");
    assert!(history.len() <= 20);
    assert!(history.windows(2).all(|w| w[0].at <= w[1].at), "history not oldest-first");

    let procs = api.processes(SortKey::Memory, DEFAULT_PROCESS_LIMIT).await.expect("processes");
    assert_eq!(procs.sort_by, Some(SortKey::Memory));
}
