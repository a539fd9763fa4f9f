mod support;

#[tokio::test]
async fn status_reports_awaiting_bots_on_a_fresh_server() {
    let addr = support::ensure_server();

    let res = reqwest::get(format!("http://{addr}/status"))
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["state"], "AwaitingBots");
}
