//! End-to-end flows through a live listener.

use dexmail::blockchain::Wallet;
use dexmail::ipfs::{cid_hash, CidRegistry};
use dexmail_sdk::{Credentials, DexmailClient};
use reqwest::StatusCode;
use serde_json::json;

mod common;

use common::{test_config, MemoryMailer, TestServer};

// Anvil's first account.
const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[tokio::test]
async fn test_password_auth_flow() {
    let server = TestServer::start(test_config()).await;
    let mut client = DexmailClient::new(&server.url);

    let session = client
        .register(&Credentials::password("Alice@DexMail.app", "hunter22"))
        .await
        .unwrap();
    assert_eq!(session.user["email"], "alice@dexmail.app");

    let err = DexmailClient::new(&server.url)
        .register(&Credentials::password("alice@dexmail.app", "other"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(err.to_string().contains("User already exists"));

    let mut other = DexmailClient::new(&server.url);
    let err = other
        .login(&Credentials::password("alice@dexmail.app", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    other
        .login(&Credentials::password("alice@dexmail.app", "hunter22"))
        .await
        .unwrap();
    let profile = other.profile().await.unwrap();
    assert!(profile["lastLogin"].is_string());

    let token = client.token().unwrap().to_string();
    client.logout().await.unwrap();
    let err = DexmailClient::new(&server.url)
        .with_token(token)
        .profile()
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    server.stop().await;
}

#[tokio::test]
async fn test_wallet_login_consumes_challenge() {
    let server = TestServer::start(test_config()).await;
    let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 31337).unwrap();
    let address = wallet.address().to_string();

    let mut client = DexmailClient::new(&server.url);
    client
        .register(&Credentials::wallet("bob@dexmail.app", &address, None))
        .await
        .unwrap();

    let challenge = client.challenge("bob@dexmail.app").await.unwrap();
    assert!(challenge.nonce.starts_with("Sign this message to authenticate with DexMail: "));
    let signature = wallet.sign_message(challenge.nonce.as_bytes()).await.unwrap();
    let signature = format!("0x{}", alloy::hex::encode(signature.as_bytes()));

    let credentials = Credentials::wallet("bob@dexmail.app", &address, Some(signature));
    let session = DexmailClient::new(&server.url).login(&credentials).await.unwrap();
    assert_eq!(session.user["authType"], "wallet");

    // The nonce is single-use.
    let err = DexmailClient::new(&server.url).login(&credentials).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    server.stop().await;
}

#[tokio::test]
async fn test_send_read_reply_and_flags() {
    let server = TestServer::start(test_config()).await;
    let mut alice = DexmailClient::new(&server.url);
    alice
        .register(&Credentials::password("alice@dexmail.app", "pw-alice"))
        .await
        .unwrap();
    let mut bob = DexmailClient::new(&server.url);
    bob.register(&Credentials::password("bob@dexmail.app", "pw-bob"))
        .await
        .unwrap();

    let sent = alice
        .send_email(&json!({
            "to": ["bob@dexmail.app"],
            "subject": "Lunch",
            "body": "Tomorrow at noon?"
        }))
        .await
        .unwrap();
    assert!(sent["cid"].as_str().unwrap().starts_with("bafytest"));
    assert!(sent.get("claim").is_none());

    let inbox = bob.inbox().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["subject"], "Lunch");
    assert_eq!(inbox[0]["from"], "alice@dexmail.app");
    assert_eq!(inbox[0]["read"], false);
    let id: u64 = inbox[0]["messageId"].as_str().unwrap().parse().unwrap();

    // Alice cannot read Bob's message.
    let err = alice.message(id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let flags = bob.flag(id, &json!({ "action": "star" })).await.unwrap();
    assert_eq!(flags["starred"], true);
    assert_eq!(bob.folder("starred").await.unwrap().len(), 1);

    bob.reply(id, "Sounds good").await.unwrap();
    let alice_inbox = alice.inbox().await.unwrap();
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0]["subject"], "Re: Lunch");

    let reply_id: u64 = alice_inbox[0]["messageId"].as_str().unwrap().parse().unwrap();
    let detail = alice.message(reply_id).await.unwrap();
    let segments = detail["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["type"], "quote");
    assert_eq!(segments[1]["content"], "Sounds good");

    let sent_log = bob.sent().await.unwrap();
    assert_eq!(sent_log.len(), 1);
    assert_eq!(sent_log[0]["to"][0], "alice@dexmail.app");

    // Spoofed sender is refused.
    let err = alice
        .send_email(&json!({ "from": "bob@dexmail.app", "to": ["carol@dexmail.app"], "subject": "x", "body": "y" }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

    server.stop().await;
}

#[tokio::test]
async fn test_send_with_assets_then_claim() {
    let server = TestServer::start(test_config()).await;
    let mut alice = DexmailClient::new(&server.url);
    alice
        .register(&Credentials::password("alice@dexmail.app", "pw-alice"))
        .await
        .unwrap();
    let mut carol = DexmailClient::new(&server.url);
    carol
        .register(&Credentials::password("carol@dexmail.app", "pw-carol"))
        .await
        .unwrap();

    let sent = alice
        .send_email(&json!({
            "to": ["carol@dexmail.app"],
            "subject": "A gift",
            "body": "Enjoy",
            "cryptoTransfer": {
                "enabled": true,
                "assets": [{ "type": "eth", "symbol": "ETH", "amount": "0.1" }]
            }
        }))
        .await
        .unwrap();
    let token = sent["claim"]["token"].as_str().unwrap().to_string();
    let code = sent["claim"]["code"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert_eq!(
        sent["claim"]["claimUrl"],
        format!("https://dexmail.test/dashboard/claim?token={token}")
    );

    let inbox = carol.inbox().await.unwrap();
    let id: u64 = inbox[0]["messageId"].as_str().unwrap().parse().unwrap();
    let detail = carol.message(id).await.unwrap();
    assert_eq!(detail["attachmentNotice"]["kind"], "claimable");
    assert_eq!(detail["attachmentNotice"]["code"], code);

    let public = DexmailClient::new(&server.url);
    assert_eq!(public.claim(&token).await.unwrap()["valid"], true);

    let owner = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    let err = public.deploy_claim(&token, owner).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let wrong = if code == "111111" { "222222" } else { "111111" };
    let err = public.verify_claim_code(&token, wrong).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    let status = public.verify_claim_code(&token, &code).await.unwrap();
    assert_eq!(status["status"], "verified");

    let deployed = public.deploy_claim(&token, owner).await.unwrap();
    assert_eq!(deployed["success"], true);
    assert_eq!(
        deployed["walletAddress"].as_str().unwrap().to_lowercase(),
        MemoryMailer::wallet_for("carol@dexmail.app").to_string().to_lowercase()
    );

    let err = public.deploy_claim(&token, owner).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));

    let status = public.claim_status(&token).await.unwrap();
    assert_eq!(status["status"], "claimed");
    assert_eq!(public.claim(&token).await.unwrap()["valid"], false);

    server.stop().await;
}

#[tokio::test]
async fn test_stores_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.storage.data_dir = Some(dir.path().to_string_lossy().into_owned());

    let server = TestServer::start(config.clone()).await;
    let mut client = DexmailClient::new(&server.url);
    client
        .register(&Credentials::password("dave@dexmail.app", "pw-dave"))
        .await
        .unwrap();
    server.state.persist().unwrap();
    server.stop().await;

    let server = TestServer::start(config).await;
    let session = DexmailClient::new(&server.url)
        .login(&Credentials::password("dave@dexmail.app", "pw-dave"))
        .await
        .unwrap();
    assert_eq!(session.user["email"], "dave@dexmail.app");
    // Sessions persist too.
    let profile = client.profile().await;
    assert!(profile.is_ok());
    server.stop().await;
}

#[tokio::test]
async fn test_claims_and_cids_survive_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_string_lossy().into_owned();
    let mut config = test_config();
    config.storage.data_dir = Some(data_dir.clone());

    let server = TestServer::start(config.clone()).await;
    let mut alice = DexmailClient::new(&server.url);
    alice
        .register(&Credentials::password("alice@dexmail.app", "pw-alice"))
        .await
        .unwrap();
    let sent = alice
        .send_email(&json!({
            "to": ["erin@dexmail.app"],
            "subject": "Tip",
            "body": "For you",
            "cryptoTransfer": {
                "enabled": true,
                "assets": [{ "type": "eth", "symbol": "ETH", "amount": "0.01" }]
            }
        }))
        .await
        .unwrap();
    let token = sent["claim"]["token"].as_str().unwrap().to_string();
    let cid = sent["cid"].as_str().unwrap().to_string();
    // No persist(): the process dies here.
    server.stop().await;

    let registry = CidRegistry::open(Some(&data_dir)).unwrap();
    assert_eq!(registry.resolve(&cid_hash(&cid)), Some(cid));

    let server = TestServer::start(config).await;
    let status = DexmailClient::new(&server.url).claim_status(&token).await.unwrap();
    assert_eq!(status["status"], "pending");
    server.stop().await;
}
