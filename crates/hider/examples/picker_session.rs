//! Walk through one picking session against a DevTools-style snapshot.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p hider --example picker_session
//! ```

use std::sync::Arc;

use dom::DomService;
use hider::{
    page_channel, serve, Command, EngineConfig, InputEvent, MemoryStorage, PageConfig,
    PageSession, SiteController,
};
use serde_json::json;
use tokio::sync::RwLock;

fn snapshot() -> serde_json::Value {
    let text = |value: &str| json!({ "nodeType": 3, "nodeName": "#text", "nodeValue": value });
    let card = |id: &str, children: serde_json::Value| {
        json!({
            "nodeType": 1,
            "nodeName": "DIV",
            "attributes": ["class", "card", "data-id", id],
            "children": children
        })
    };
    json!({
        "root": {
            "nodeType": 9,
            "nodeName": "#document",
            "children": [{
                "nodeType": 1,
                "nodeName": "HTML",
                "children": [
                    { "nodeType": 1, "nodeName": "HEAD" },
                    {
                        "nodeType": 1,
                        "nodeName": "BODY",
                        "children": [
                            {
                                "nodeType": 1,
                                "nodeName": "DIV",
                                "attributes": ["id", "cookie-banner"],
                                "children": [text("We use cookies")]
                            },
                            card("1", json!([text("Weather today")])),
                            card("2", json!([
                                {
                                    "nodeType": 1,
                                    "nodeName": "SPAN",
                                    "attributes": ["class", "sponsor-badge"],
                                    "children": [text("Sponsored")]
                                },
                                text(" buy now")
                            ])),
                            card("3", json!([text("Local news")]))
                        ]
                    }
                ]
            }]
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut service = DomService::new();
    service.parse_cdp_dom_tree(&snapshot())?;
    let arena = service.into_arena();
    let banner = arena
        .get_element_by_id("cookie-banner")
        .ok_or("snapshot has no banner")?;
    let sponsored = arena
        .query_selector("div.card[data-id=\"2\"]")?
        .ok_or("snapshot has no sponsored card")?;

    let config = EngineConfig::default();
    let storage = Arc::new(MemoryStorage::new());
    let doc = Arc::new(RwLock::new(arena));

    let mut session = PageSession::new(
        doc.clone(),
        PageConfig::for_url("https://news.example.com/"),
        config.clone(),
        storage.clone(),
    );
    session.initialize().await?;
    let mut events = session.events().subscribe();

    let (page, rx) = page_channel(32, config.request_timeout);
    let served = tokio::spawn(serve(session, rx));
    let mut panel = SiteController::load("news.example.com", storage.clone(), page.clone()).await?;

    page.send_quiet(Command::StartPicker { multi_select: true }).await;
    for target in [banner, sponsored] {
        page.input(InputEvent::MouseMove { target }).await?;
        page.input(InputEvent::Click { target }).await?;
    }
    page.input(InputEvent::KeyDown {
        key: "Escape".to_string(),
    })
    .await?;

    while let Ok(event) = events.try_recv() {
        println!("event: {}", serde_json::to_string(&event)?);
        panel.element_hidden(&event);
    }

    for element in panel.elements() {
        println!("managed: {:<28} {:?}", element.selector, element.label);
    }

    panel.toggle("#cookie-banner").await?;
    {
        let arena = doc.read().await;
        println!(
            "banner: {:?}, sponsored card: {:?}",
            arena.computed_visibility(banner),
            arena.computed_visibility(sponsored)
        );
    }

    println!("stored record:\n{}", panel.export_json()?);

    drop(panel);
    drop(page);
    served.await?;
    Ok(())
}
