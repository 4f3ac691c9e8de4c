use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::testing::ScriptedBoundary;
use bridge_traits::{args, Command, CommandBoundary, CommandRequest};
use core_runtime::config::{CoreConfig, UploadCommand};
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
use core_service::{CoreError, VaultService};
use core_sync::ResolveOutcome;
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;

mock! {
    Boundary {}

    #[async_trait]
    impl CommandBoundary for Boundary {
        async fn invoke(&self, request: CommandRequest) -> BridgeResult<Value>;
    }
}

fn scripted() -> Arc<ScriptedBoundary> {
    let boundary = Arc::new(ScriptedBoundary::new());
    boundary
        .respond(Command::OpenCollection, Value::Null)
        .respond(
            Command::List,
            json!([
                { "label": "mail", "has_conflict": false },
                { "label": "bank", "has_conflict": true }
            ]),
        )
        .respond_for(
            Command::GetConfPair,
            "bank",
            json!({ "local_pw": "mine", "remote_pw": "theirs" }),
        )
        .respond(Command::ResolveConflict, Value::Null)
        .respond(Command::Push, Value::Null);
    boundary
}

#[tokio::test]
async fn session_lifecycle_is_published() {
    let boundary = scripted();
    let config = CoreConfig::builder()
        .command_boundary(boundary as Arc<dyn CommandBoundary>)
        .build()
        .unwrap();
    let events = EventBus::new(16);
    let mut sessions = EventStream::new(events.subscribe())
        .filter(|event| matches!(event, CoreEvent::Session(_)));

    let service = VaultService::open_with_events(config, "master", events)
        .await
        .unwrap();
    let session_id = service.session_id().to_string();

    assert_eq!(
        sessions.recv().await.unwrap(),
        CoreEvent::Session(SessionEvent::Opened {
            session_id: session_id.clone(),
            ledger_name: "First password ledger".to_string(),
        })
    );

    service.close().unwrap();
    assert_eq!(
        sessions.recv().await.unwrap(),
        CoreEvent::Session(SessionEvent::Closed { session_id })
    );
}

#[tokio::test]
async fn components_share_one_session() {
    let boundary = scripted();
    let config = CoreConfig::builder()
        .command_boundary(boundary.clone())
        .upload_command(UploadCommand::PushFiles)
        .build()
        .unwrap();
    let service = VaultService::open(config, "master").await.unwrap();

    service.cache().unwrap().load();
    service.cache().unwrap().settled().await;
    assert_eq!(service.registry().unwrap().conflicted_labels(), vec!["bank"]);

    service.resolution().unwrap().reveal("bank").await.unwrap();
    service.resolution().unwrap().select("theirs").unwrap();
    assert_eq!(
        service.resolution().unwrap().resolve().await.unwrap(),
        ResolveOutcome::Resolved
    );
    assert_eq!(boundary.call_count(Command::List), 2);

    let receipt = service.sync().unwrap().upload("temp").await.unwrap();
    assert_eq!(receipt.pin, None);
    assert_eq!(boundary.call_count(Command::PushS), 0);
    assert_eq!(service.errors().latest(), None);
}

#[tokio::test]
async fn refused_open_sends_nothing_else() {
    let mut boundary = MockBoundary::new();
    boundary
        .expect_invoke()
        .withf(|request| {
            request.command == Command::OpenCollection
                && request.arg_str(args::LEDGER_NAME) == Some("Work")
                && request.arg_str(args::MASTER_PASSWORD) == Some("wrong")
        })
        .times(1)
        .returning(|_| Err(BridgeError::from_payload(json!({ "kind": "auth" }))));
    let config = CoreConfig::builder()
        .command_boundary(Arc::new(boundary))
        .ledger_name("Work")
        .build()
        .unwrap();

    let err = VaultService::open(config, "wrong").await.unwrap_err();

    assert!(matches!(err, CoreError::Vault(_)));
    assert!(err.to_string().starts_with("An unknown error occurred: "));
}
