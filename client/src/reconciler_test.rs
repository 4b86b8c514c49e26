use super::*;
use protocol::Participant;

/// Records render calls instead of painting pixels.
#[derive(Default)]
struct RecordingRenderer {
    clears: usize,
    drawn: Vec<Uuid>,
}

impl Renderer for RecordingRenderer {
    fn clear(&mut self) {
        self.clears += 1;
        self.drawn.clear();
    }

    fn draw(&mut self, op: &Operation) {
        self.drawn.push(op.id);
    }
}

fn stroke() -> Operation {
    Operation {
        id: Uuid::new_v4(),
        author_id: "peer".to_owned(),
        kind: OpKind::Stroke,
        color: "#ff0000".to_owned(),
        stroke_width: 2.0,
        points: vec![Point { x: 0.0, y: 0.0, t: 0 }, Point { x: 5.0, y: 5.0, t: 10 }],
        created_at: 0,
        undone: false,
    }
}

#[test]
fn sync_state_replaces_the_mirror_and_replays_visible_entries_in_order() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());
    reconciler.apply(&ServerMessage::Operation(stroke()));

    let kept = stroke();
    let mut hidden = stroke();
    hidden.undone = true;
    let tail = stroke();
    reconciler.apply(&ServerMessage::SyncState {
        ops: vec![kept.clone(), hidden.clone(), tail.clone()],
    });

    assert_eq!(reconciler.ops().len(), 3);
    assert_eq!(reconciler.visible_count(), 2);
    assert_eq!(reconciler.renderer.clears, 1);
    assert_eq!(reconciler.renderer.drawn, vec![kept.id, tail.id]);
}

#[test]
fn operation_appends_and_draws_incrementally() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());

    let op = stroke();
    reconciler.apply(&ServerMessage::Operation(op.clone()));

    assert_eq!(reconciler.ops().len(), 1);
    assert_eq!(reconciler.renderer.clears, 0, "appends must not force a full replay");
    assert_eq!(reconciler.renderer.drawn, vec![op.id]);
}

#[test]
fn undo_flips_the_matching_entry_and_forces_a_full_replay() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());
    let first = stroke();
    let second = stroke();
    reconciler.apply(&ServerMessage::Operation(first.clone()));
    reconciler.apply(&ServerMessage::Operation(second.clone()));

    let mut undone = second.clone();
    undone.undone = true;
    reconciler.apply(&ServerMessage::Undo(undone));

    assert_eq!(reconciler.visible_count(), 1);
    assert!(reconciler.ops()[1].undone);
    assert!(!reconciler.ops()[0].undone);
    assert_eq!(reconciler.renderer.clears, 1);
    assert_eq!(reconciler.renderer.drawn, vec![first.id]);
}

#[test]
fn redo_restores_the_entry_and_forces_a_full_replay() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());
    let op = stroke();
    reconciler.apply(&ServerMessage::Operation(op.clone()));

    let mut undone = op.clone();
    undone.undone = true;
    reconciler.apply(&ServerMessage::Undo(undone));
    assert_eq!(reconciler.visible_count(), 0);

    let mut redone = op.clone();
    redone.undone = false;
    reconciler.apply(&ServerMessage::Redo(redone));

    assert_eq!(reconciler.visible_count(), 1);
    assert!(!reconciler.ops()[0].undone);
    assert_eq!(reconciler.renderer.clears, 2);
    assert_eq!(reconciler.renderer.drawn, vec![op.id]);
}

#[test]
fn toggles_for_unknown_ids_are_ignored() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());
    reconciler.apply(&ServerMessage::Operation(stroke()));

    reconciler.apply(&ServerMessage::Undo(stroke()));

    assert_eq!(reconciler.visible_count(), 1);
    assert_eq!(reconciler.renderer.clears, 0, "unknown toggles must not redraw");
}

#[test]
fn presence_events_do_not_touch_the_mirror_or_the_surface() {
    let mut reconciler = Reconciler::new(RecordingRenderer::default());

    reconciler.apply(&ServerMessage::UserList {
        users: vec![Participant {
            participant_id: Uuid::new_v4(),
            name: "peer".to_owned(),
            color: "#22c55e".to_owned(),
        }],
    });
    reconciler.apply(&ServerMessage::CursorMove {
        participant_id: Uuid::new_v4(),
        x: 1.0,
        y: 2.0,
    });

    assert!(reconciler.ops().is_empty());
    assert_eq!(reconciler.renderer.clears, 0);
    assert!(reconciler.renderer.drawn.is_empty());
}

// =============================================================================
// PENDING STROKE
// =============================================================================

#[test]
fn pending_stroke_preserves_capture_order_and_clears_on_finish() {
    let mut pending = PendingStroke::new();
    pending.begin(0.0, 0.0, 100);
    pending.push(1.0, 2.0, 110);
    pending.push(3.0, 4.0, 120);

    let op = pending
        .finish(OpKind::Stroke, "#000000", 4.0, "me", 1_000)
        .expect("non-empty path should submit");

    assert_eq!(op.points.len(), 3);
    assert!((op.points[1].x - 1.0).abs() < f64::EPSILON);
    assert_eq!(op.points[2].t, 120);
    assert_eq!(op.kind, OpKind::Stroke);
    assert!(!op.undone);
    assert!(pending.is_empty(), "finish must clear the buffer");
}

#[test]
fn pending_stroke_empty_finish_returns_none() {
    let mut pending = PendingStroke::new();
    assert!(pending.finish(OpKind::Erase, "#000000", 8.0, "me", 0).is_none());
}

#[test]
fn begin_discards_a_previous_unfinished_path() {
    let mut pending = PendingStroke::new();
    pending.begin(0.0, 0.0, 0);
    pending.push(1.0, 1.0, 5);

    pending.begin(9.0, 9.0, 50);

    assert_eq!(pending.points().len(), 1);
    assert!((pending.points()[0].x - 9.0).abs() < f64::EPSILON);
}

#[test]
fn successive_finishes_mint_distinct_operation_ids() {
    let mut pending = PendingStroke::new();
    pending.begin(0.0, 0.0, 0);
    let first = pending.finish(OpKind::Stroke, "#000000", 4.0, "me", 0).expect("op");

    pending.begin(1.0, 1.0, 10);
    let second = pending.finish(OpKind::Stroke, "#000000", 4.0, "me", 10).expect("op");

    assert_ne!(first.id, second.id);
}
