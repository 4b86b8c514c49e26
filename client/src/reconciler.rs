//! Reconciler — keeps a local operation list in agreement with the server.
//!
//! DESIGN
//! ======
//! The reconciler owns the ordered mirror of the server's log and decides
//! when the raster surface must be redrawn. Appends are cheap: a confirmed
//! operation only ever composites on top of existing pixels, so it is drawn
//! incrementally. Undo and redo force a full replay, because a composited
//! erase is destructive and cannot be un-painted.
//!
//! Rendering itself is someone else's job: [`Renderer`] is the seam to the
//! pixel surface, and implementations stay stateless with respect to the
//! log. The reconciler does the undone-skipping, so a renderer only ever
//! sees operations it should actually paint.

use protocol::{OpKind, Operation, Point, ServerMessage};
use uuid::Uuid;

/// The raster surface the reconciler paints through.
pub trait Renderer {
    /// Wipe the surface ahead of a full replay.
    fn clear(&mut self);
    /// Composite one operation onto the surface.
    fn draw(&mut self, op: &Operation);
}

// =============================================================================
// RECONCILER
// =============================================================================

pub struct Reconciler<R> {
    ops: Vec<Operation>,
    renderer: R,
}

impl<R: Renderer> Reconciler<R> {
    pub fn new(renderer: R) -> Self {
        Self { ops: Vec::new(), renderer }
    }

    /// Apply one server-confirmed event to the mirror.
    ///
    /// `USER_LIST` and `CURSOR_MOVE` are presence signals, not log state;
    /// they pass through untouched for the embedding UI to handle.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::SyncState { ops } => {
                self.ops = ops.clone();
                self.rerender();
            }
            ServerMessage::Operation(op) => {
                self.ops.push(op.clone());
                self.renderer.draw(op);
            }
            ServerMessage::Undo(op) => self.set_undone(op.id, true),
            ServerMessage::Redo(op) => self.set_undone(op.id, false),
            ServerMessage::UserList { .. } | ServerMessage::CursorMove { .. } => {}
        }
    }

    /// The local mirror, in server log order.
    #[must_use]
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Number of operations that would currently be painted.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.ops.iter().filter(|op| !op.undone).count()
    }

    fn set_undone(&mut self, id: Uuid, undone: bool) {
        // An unknown id means the toggle raced a SYNC_STATE we have not
        // applied yet; there is nothing local to flip.
        let Some(entry) = self.ops.iter_mut().find(|op| op.id == id) else {
            return;
        };
        entry.undone = undone;
        self.rerender();
    }

    fn rerender(&mut self) {
        self.renderer.clear();
        for op in &self.ops {
            if !op.undone {
                self.renderer.draw(op);
            }
        }
    }
}

// =============================================================================
// IN-PROGRESS STROKE
// =============================================================================

/// The local not-yet-submitted stroke. Never part of the mirror: callers
/// paint it on a separate ephemeral surface and it is cleared on pointer
/// release whether or not the release produced a submission.
#[derive(Default)]
pub struct PendingStroke {
    points: Vec<Point>,
}

impl PendingStroke {
    #[must_use]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Start a new path, discarding any previous one.
    pub fn begin(&mut self, x: f64, y: f64, t: i64) {
        self.points.clear();
        self.points.push(Point { x, y, t });
    }

    /// Extend the path; capture order defines the geometry.
    pub fn push(&mut self, x: f64, y: f64, t: i64) {
        self.points.push(Point { x, y, t });
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close the path and build the operation to submit. Always clears the
    /// buffer; an empty path yields `None` and nothing to send.
    pub fn finish(
        &mut self,
        kind: OpKind,
        color: &str,
        stroke_width: f64,
        author_id: &str,
        created_at: i64,
    ) -> Option<Operation> {
        let points = std::mem::take(&mut self.points);
        if points.is_empty() {
            return None;
        }

        Some(Operation {
            id: Uuid::new_v4(),
            author_id: author_id.to_owned(),
            kind,
            color: color.to_owned(),
            stroke_width,
            points,
            created_at,
            undone: false,
        })
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
