use std::sync::Arc;
use std::time::Duration;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use piece_core::model::{Piece, PieceId};
use piece_core::time::fixed_clock;
use services::stream::ChannelStreamClient;
use services::{Clock, Credentials, RevealConfig, RevealService};
use storage::InMemoryRepository;

use crate::context::{UiApp, build_app_context};
use crate::views::PieceView;

struct TestApp {
    piece_id: PieceId,
    reveal_service: Arc<RevealService>,
}

impl UiApp for TestApp {
    fn piece_id(&self) -> PieceId {
        self.piece_id.clone()
    }

    fn clock(&self) -> Clock {
        fixed_clock()
    }

    fn reveal_service(&self) -> Arc<RevealService> {
        Arc::clone(&self.reveal_service)
    }
}

#[derive(Props, Clone)]
struct PieceHarnessProps {
    app: Arc<TestApp>,
}

impl PartialEq for PieceHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn PieceHarnessRoot(props: PieceHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    let ctx = use_context_provider(|| build_app_context(&app));
    rsx! { PieceView { piece_id: ctx.piece_id() } }
}

pub struct PieceHarness {
    pub dom: VirtualDom,
    pub client: ChannelStreamClient,
}

impl PieceHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        self.dom.render_immediate(&mut NoOpMutations);
    }

    /// Let the controller task and the view's update loop make progress.
    pub async fn drive(&mut self) {
        for _ in 0..4 {
            let _ = tokio::time::timeout(Duration::from_millis(50), self.dom.wait_for_work()).await;
            self.dom.process_events();
            self.dom.render_immediate(&mut NoOpMutations);
        }
    }

    /// Drive until the rendered page contains `needle`, giving up after `rounds`.
    pub async fn drive_until(&mut self, needle: &str, rounds: usize) -> String {
        let mut html = self.render();
        for _ in 0..rounds {
            if html.contains(needle) {
                break;
            }
            self.drive().await;
            html = self.render();
        }
        html
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn piece_id() -> PieceId {
    PieceId::new("piece-1").expect("valid id")
}

/// Piece view over an in-memory store, scripted stream and fast pacer.
pub fn setup_piece_harness(stored: Option<Piece>) -> PieceHarness {
    let repo = InMemoryRepository::new();
    if let Some(piece) = stored {
        repo.upsert_piece(piece).expect("store piece");
    }
    let client = ChannelStreamClient::new();
    let config = RevealConfig {
        tick_interval: Duration::from_millis(5),
        ..RevealConfig::default()
    };
    let reveal_service = RevealService::new(Arc::new(client.clone()), Arc::new(repo))
        .with_config(config)
        .with_credentials(Credentials::bearer("test-token"));

    let app = Arc::new(TestApp {
        piece_id: piece_id(),
        reveal_service: Arc::new(reveal_service),
    });
    let dom = VirtualDom::new_with_props(PieceHarnessRoot, PieceHarnessProps { app });

    PieceHarness { dom, client }
}
