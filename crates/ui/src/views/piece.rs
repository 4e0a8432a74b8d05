use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use piece_core::model::PieceId;
use services::{ChannelSink, MarkdownRenderer, RevealHandle, RevealUpdate};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::context::AppContext;
use crate::vm::{PieceVm, TakeawayCardVm};

/// The view's end of a running reveal controller.
#[derive(Clone)]
struct RevealLink {
    handle: Rc<RevealHandle>,
    updates: Rc<RefCell<Option<UnboundedReceiver<RevealUpdate>>>>,
}

#[component]
pub fn PieceView(piece_id: PieceId) -> Element {
    let ctx = use_context::<AppContext>();
    let clock = ctx.clock();
    let mut vm = use_signal({
        let piece_id = piece_id.clone();
        move || PieceVm::new(piece_id)
    });

    let link = use_hook({
        let piece_id = piece_id.clone();
        let service = ctx.reveal_service();
        move || {
            let (sink, updates) = ChannelSink::new();
            let handle = service.spawn(Arc::new(sink));
            handle.open(piece_id);
            RevealLink {
                handle: Rc::new(handle),
                updates: Rc::new(RefCell::new(Some(updates))),
            }
        }
    });

    use_future({
        let updates = Rc::clone(&link.updates);
        move || {
            let updates = Rc::clone(&updates);
            async move {
                let Some(mut updates) = updates.borrow_mut().take() else {
                    return;
                };
                while let Some(update) = updates.recv().await {
                    vm.write().apply(update, &MarkdownRenderer, clock.now());
                }
                debug!("reveal updates closed");
            }
        }
    });

    use_drop({
        let handle = Rc::clone(&link.handle);
        move || handle.view_torn_down()
    });

    let regenerate = {
        let handle = Rc::clone(&link.handle);
        let piece_id = piece_id.clone();
        move |_| handle.request_regeneration(piece_id.clone())
    };

    let state = vm.read().clone();
    let badge_class = state.badge_class();
    let action_label = if state.has_takeaways() {
        "Regenerate"
    } else {
        "Generate takeaways"
    };

    rsx! {
        div { class: "page piece",
            header { class: "piece-header",
                span { class: "{badge_class}", "{state.badge}" }
                div { class: "piece-heading",
                    h1 { class: "piece-title", "{state.title}" }
                    p { class: "piece-meta",
                        span { class: "piece-source", "{state.source}" }
                        if !state.author.is_empty() {
                            span { class: "piece-author", "{state.author}" }
                        }
                        span { class: "piece-time", title: "{state.age_text}", "{state.time_text}" }
                    }
                }
            }

            if !state.tags.is_empty() {
                ul { class: "piece-tags",
                    for tag in state.tags.iter() {
                        li { key: "{tag}", "#{tag}" }
                    }
                }
            }

            if let Some(error) = state.error.as_ref() {
                p { class: "piece-error", role: "alert", "{error}" }
            }

            if state.has_takeaways() {
                ol { class: "takeaways",
                    for card in state.cards.iter() {
                        TakeawayCard { key: "{card.index}", card: card.clone() }
                    }
                }
            } else if state.loaded && !state.streaming {
                p { class: "piece-empty", "No takeaways yet." }
            }

            if state.streaming {
                p { class: "piece-status", "Generating takeaways…" }
            } else if state.closed_without_complete {
                p { class: "piece-status", "The stream ended early. Showing what arrived." }
            }

            footer { class: "piece-actions",
                button {
                    class: "btn",
                    disabled: state.streaming,
                    onclick: regenerate,
                    "{action_label}"
                }
            }
        }
    }
}

#[component]
fn TakeawayCard(card: TakeawayCardVm) -> Element {
    let class = if card.fresh { "takeaway fresh" } else { "takeaway" };
    rsx! {
        li { class,
            h3 { class: "takeaway-question", "{card.question}" }
            div { class: "takeaway-answer", dangerous_inner_html: "{card.answer_html}" }
        }
    }
}
