use std::io::Write;

use data_server::{AppState, Settings};
use scentra_cli::{execute, Cli, Command, UreqTransport};
use scentra_core::{AuthMode, CreateListing, HttpRepository, Repository};
use tokio::net::TcpListener;

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(data_server::run(listener, AppState::new(Settings::default())));
    format!("http://{addr}")
}

async fn session_token(endpoint: &str) -> String {
    let url = format!("{endpoint}/auth/users");
    tokio::task::spawn_blocking(move || {
        let mut response = ureq::post(&url)
            .header("content-type", "application/json")
            .send(
                r#"{"email":"sam@scentra.test","password":"bergamot-77",
                    "attributes":{"given_name":"Sam","family_name":"Vale"}}"#
                    .as_bytes(),
            )
            .unwrap();
        let session: serde_json::Value =
            serde_json::from_str(&response.body_mut().read_to_string().unwrap()).unwrap();
        session["token"].as_str().unwrap().to_string()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn credentials_in_dotenv_feed_the_flags() {
    let endpoint = start_server().await;
    let token = session_token(&endpoint).await;

    let mut dotenv = tempfile::NamedTempFile::new().unwrap();
    writeln!(dotenv, "SCENTRA_ENDPOINT={endpoint}").unwrap();
    writeln!(dotenv, "SCENTRA_USER_TOKEN={token}").unwrap();

    let cli = Cli::load_from(dotenv.path(), ["scentra", "list-order-items", "L1"]).unwrap();
    assert_eq!(cli.endpoint, endpoint);
    assert_eq!(cli.user_token.as_deref(), Some(token.as_str()));

    let config = cli.backend_config().unwrap();
    let repo = HttpRepository::new(&config, UreqTransport::new());
    let listing = repo
        .create_listing(
            &CreateListing {
                seller_id: "S9".to_string(),
                name: "Tobacco Vanille".to_string(),
                brand: "Tom Ford".to_string(),
                description: None,
                price_cents: 31_000,
                size_ml: Some(50),
                image_key: None,
                status: None,
            },
            AuthMode::UserPool,
        )
        .await
        .unwrap();

    let command = Command::GetListing {
        listing_id: listing.id.clone(),
    };
    let output = execute(&repo, &command, AuthMode::UserPool).await.unwrap();
    assert_eq!(output["name"], "Tobacco Vanille");

    scentra_cli::run(cli).await.unwrap();
}
