use piece_core::model::{Piece, Takeaway};

use super::test_harness::{piece_id, setup_piece_harness};

#[tokio::test(flavor = "current_thread")]
async fn piece_view_renders_stored_takeaways() {
    let mut piece = Piece::new(piece_id())
        .with_title("Deep Work")
        .with_takeaways(vec![Takeaway::new("Main idea?", "Protect **focus** time")]);
    piece.source_type = Some("youtube".into());
    piece.ai_extracted_tags = Some(vec!["focus".into()]);

    let mut harness = setup_piece_harness(Some(piece));
    harness.rebuild();
    let html = harness.drive_until("Main idea?", 10).await;

    assert!(html.contains("Deep Work"), "missing title in {html}");
    assert!(html.contains("badge-ytb"), "missing badge in {html}");
    assert!(html.contains("#focus"), "missing tag in {html}");
    assert!(html.contains("<strong>focus</strong>"), "missing answer html in {html}");
    assert!(html.contains("Regenerate"), "missing action in {html}");
    assert_eq!(harness.client.open_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn piece_view_reports_load_failure() {
    let mut harness = setup_piece_harness(None);
    harness.rebuild();
    let html = harness.drive_until("piece load failed", 10).await;

    assert!(html.contains("piece load failed: not found"), "missing error in {html}");
    assert!(html.contains("Generate takeaways"), "missing action in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn piece_view_streams_takeaways_for_an_empty_piece() {
    let mut harness = setup_piece_harness(Some(Piece::new(piece_id()).with_title("Draft")));
    harness.rebuild();
    let html = harness.drive_until("Generating takeaways", 10).await;
    assert!(html.contains("Generating takeaways"), "missing status in {html}");

    let stream = harness.client.latest().expect("stream opened");
    stream.partial(vec![Takeaway::new("First question", "A streamed answer")]);
    let html = harness.drive_until("A streamed answer", 20).await;
    assert!(html.contains("First question"), "missing revealed card in {html}");
}
