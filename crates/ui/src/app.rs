use dioxus::prelude::*;

use crate::context::AppContext;
use crate::views::PieceView;

const STYLE: &str = r"
body { font-family: system-ui, sans-serif; margin: 0; background: #faf9f7; color: #222; }
.app-root { max-width: 760px; margin: 0 auto; padding: 24px; }
.piece-header { display: flex; gap: 16px; align-items: center; }
.badge { min-width: 44px; padding: 10px 6px; border-radius: 8px; text-align: center; font-weight: 700; background: #ddd; }
.badge-pdf { background: #f4c7c3; }
.badge-ytb { background: #f8b4b4; }
.badge-wx { background: #c6ecc6; }
.piece-meta span + span::before { content: ' · '; }
.piece-tags { display: flex; gap: 8px; list-style: none; padding: 0; }
.piece-error { color: #b00020; }
.takeaway { margin-bottom: 18px; }
.takeaway.fresh { animation: grow 0.4s ease-out; }
@keyframes grow { from { opacity: 0.3; } to { opacity: 1; } }
";

#[component]
pub fn App() -> Element {
    let ctx = use_context::<AppContext>();
    let piece_id = ctx.piece_id();

    rsx! {
        document::Title { "Piece" }
        style { "{STYLE}" }

        div { class: "app-root",
            ErrorBoundary {
                handle_error: |errors: ErrorContext| rsx! {
                    div { class: "fatal",
                        h1 { "Something went wrong" }
                        pre { "{errors:?}" }
                    }
                },
                PieceView { piece_id }
            }
        }
    }
}
